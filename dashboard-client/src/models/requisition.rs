//! Requisition aggregate as served by the backend REST API.
//!
//! All persisted state is owned and mutated server-side; the client holds
//! transient copies plus pending-edit drafts and reconciles by re-fetching
//! after each mutation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate requisition status. A function of the item states; the client
/// displays it but never sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequisitionStatus {
    Pending,
    Reviewed,
    Approved,
    Rejected,
    PartiallyFulfilled,
    Fulfilled,
    Completed,
    Cancelled,
}

impl RequisitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequisitionStatus::Pending => "PENDING",
            RequisitionStatus::Reviewed => "REVIEWED",
            RequisitionStatus::Approved => "APPROVED",
            RequisitionStatus::Rejected => "REJECTED",
            RequisitionStatus::PartiallyFulfilled => "PARTIALLY_FULFILLED",
            RequisitionStatus::Fulfilled => "FULFILLED",
            RequisitionStatus::Completed => "COMPLETED",
            RequisitionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "REVIEWED" => RequisitionStatus::Reviewed,
            "APPROVED" => RequisitionStatus::Approved,
            "REJECTED" => RequisitionStatus::Rejected,
            "PARTIALLY_FULFILLED" => RequisitionStatus::PartiallyFulfilled,
            "FULFILLED" => RequisitionStatus::Fulfilled,
            "COMPLETED" => RequisitionStatus::Completed,
            "CANCELLED" => RequisitionStatus::Cancelled,
            _ => RequisitionStatus::Pending,
        }
    }
}

/// Per-line-item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
    PartiallyFulfilled,
    Fulfilled,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Approved => "APPROVED",
            ItemStatus::Rejected => "REJECTED",
            ItemStatus::PartiallyFulfilled => "PARTIALLY_FULFILLED",
            ItemStatus::Fulfilled => "FULFILLED",
        }
    }
}

/// A partner's request for items, tracked through the approval/delivery
/// lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requisition {
    pub id: String,
    pub requisition_number: String,
    pub status: RequisitionStatus,
    pub partner_id: String,
    #[serde(default)]
    pub partner_note: Option<String>,
    #[serde(default)]
    pub approval_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<RequisitionItem>,
}

impl Requisition {
    pub fn item(&self, item_id: &str) -> Option<&RequisitionItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut RequisitionItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }
}

/// One line within a requisition, independently approved/rejected/delivered.
///
/// Invariant maintained by every client-side draft:
/// `qty_delivered <= qty_approved <= qty_requested`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionItem {
    pub id: String,
    pub item_name: String,
    #[serde(default)]
    pub note: Option<String>,
    pub qty_requested: u32,
    #[serde(default)]
    pub qty_approved: u32,
    #[serde(default)]
    pub qty_delivered: u32,
    pub status: ItemStatus,
    #[serde(default)]
    pub stock_in_id: Option<String>,
    /// Unit price captured at approval time; zero until the item is approved.
    #[serde(default)]
    pub unit_price_at_approval: Decimal,
    #[serde(default)]
    pub price_override: Option<Decimal>,
    #[serde(default)]
    pub approval_note: Option<String>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approver: Option<String>,
    #[serde(default)]
    pub deliveries: Vec<Delivery>,
}

impl RequisitionItem {
    /// Approved quantity not yet delivered.
    pub fn remaining_gap(&self) -> u32 {
        self.qty_approved.saturating_sub(self.qty_delivered)
    }

    /// Persisted effective unit price: override when present, otherwise the
    /// price captured at approval.
    pub fn effective_price(&self) -> Decimal {
        self.price_override.unwrap_or(self.unit_price_at_approval)
    }

    /// Price can only be overridden before any shipment exists. A price
    /// change must never retroactively affect already-shipped value.
    pub fn price_editable(&self) -> bool {
        self.qty_approved > 0 && self.qty_delivered == 0
    }
}

/// One shipment event against an approved item; may be partial. Confirmed
/// exactly once, by the partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    pub qty_delivered: u32,
    #[serde(default)]
    pub delivery_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confirmed_by: Option<String>,
    #[serde(default)]
    pub partner_note: Option<String>,
}

impl Delivery {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

/// Read model for `GET /requisition/:id/delivery-summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummary {
    pub requisition_id: String,
    #[serde(default)]
    pub items: Vec<DeliverySummaryItem>,
    #[serde(default)]
    pub pending_deliveries: u32,
    #[serde(default)]
    pub confirmed_deliveries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummaryItem {
    pub item_id: String,
    pub item_name: String,
    pub qty_requested: u32,
    pub qty_approved: u32,
    pub qty_delivered: u32,
    pub remaining: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> RequisitionItem {
        RequisitionItem {
            id: "item-1".to_string(),
            item_name: "Chair".to_string(),
            note: None,
            qty_requested: 10,
            qty_approved: 8,
            qty_delivered: 5,
            status: ItemStatus::PartiallyFulfilled,
            stock_in_id: Some("lot-1".to_string()),
            unit_price_at_approval: Decimal::new(2500, 2),
            price_override: None,
            approval_note: None,
            approved_at: None,
            approver: None,
            deliveries: vec![],
        }
    }

    #[test]
    fn remaining_gap_is_approved_minus_delivered() {
        assert_eq!(item().remaining_gap(), 3);
    }

    #[test]
    fn price_not_editable_once_delivery_started() {
        let mut it = item();
        assert!(!it.price_editable());
        it.qty_delivered = 0;
        assert!(it.price_editable());
        it.qty_approved = 0;
        assert!(!it.price_editable());
    }

    #[test]
    fn effective_price_prefers_override() {
        let mut it = item();
        assert_eq!(it.effective_price(), Decimal::new(2500, 2));
        it.price_override = Some(Decimal::new(2000, 2));
        assert_eq!(it.effective_price(), Decimal::new(2000, 2));
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        assert_eq!(
            RequisitionStatus::from_string("PARTIALLY_FULFILLED"),
            RequisitionStatus::PartiallyFulfilled
        );
        assert_eq!(
            RequisitionStatus::PartiallyFulfilled.as_str(),
            "PARTIALLY_FULFILLED"
        );
        // Unknown statuses degrade to PENDING rather than failing the page
        assert_eq!(
            RequisitionStatus::from_string("SOMETHING_NEW"),
            RequisitionStatus::Pending
        );
    }

    #[test]
    fn requisition_deserializes_from_camel_case() {
        let json = r#"{
            "id": "req-1",
            "requisitionNumber": "RQ-2024-001",
            "status": "PENDING",
            "partnerId": "partner-1",
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z",
            "items": [{
                "id": "item-1",
                "itemName": "Chair",
                "qtyRequested": 10,
                "status": "PENDING"
            }]
        }"#;
        let req: Requisition = serde_json::from_str(json).unwrap();
        assert_eq!(req.requisition_number, "RQ-2024-001");
        assert_eq!(req.items[0].qty_requested, 10);
        assert_eq!(req.items[0].qty_approved, 0);
        assert!(req.items[0].deliveries.is_empty());
    }
}
