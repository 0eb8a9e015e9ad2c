//! Inventory lot (`stockIn`) offered by the stock search sub-flow during
//! approval.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLot {
    pub id: String,
    pub item_name: String,
    /// Units still available in this lot. Approving more than this is never
    /// allowed.
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}
