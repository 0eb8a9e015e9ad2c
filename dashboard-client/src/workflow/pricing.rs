//! Per-item price override ahead of delivery.
//!
//! An item is eligible while it has an approved quantity and no recorded
//! delivery. Once anything has shipped the price is frozen: a change must
//! not retroactively alter already-shipped value.

use crate::models::requisition::{Requisition, RequisitionItem};
use crate::services::requisition_client::{
    PriceOverrideItemPayload, PriceOverridePayload, RequisitionClient,
};
use requisition_core::error::AppError;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Live, purely derived numbers shown while editing one item's price.
/// Recomputed on every input change; nothing persists until `apply`.
#[derive(Debug, Clone)]
pub struct PriceEditor {
    pub item_id: String,
    pub item_name: String,
    pub qty_approved: u32,
    pub original_price: Decimal,
    pub current_price: Decimal,
}

impl PriceEditor {
    pub fn set_price(&mut self, price: Decimal) {
        self.current_price = price;
    }

    /// Per-unit difference versus the price captured at approval.
    pub fn unit_delta(&self) -> Decimal {
        self.current_price - self.original_price
    }

    /// Percentage change versus the original price; `None` when the original
    /// price is zero.
    pub fn percent_change(&self) -> Option<Decimal> {
        if self.original_price.is_zero() {
            return None;
        }
        Some(self.unit_delta() * Decimal::from(100) / self.original_price)
    }

    /// Total-value difference versus `qty_approved × original price`.
    pub fn total_delta(&self) -> Decimal {
        self.unit_delta() * Decimal::from(self.qty_approved)
    }
}

/// Aggregate totals across all eligible items, edited or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingSummary {
    pub original_total: Decimal,
    pub current_total: Decimal,
}

impl PricingSummary {
    pub fn delta(&self) -> Decimal {
        self.current_total - self.original_total
    }
}

pub struct PricingSession {
    requisition: Requisition,
    /// Pending local edits, keyed by item id. BTreeMap keeps the batch
    /// payload order deterministic.
    pending: BTreeMap<String, Decimal>,
    inline_error: Option<String>,
    submitting: bool,
}

impl PricingSession {
    pub fn new(requisition: Requisition) -> Self {
        Self {
            requisition,
            pending: BTreeMap::new(),
            inline_error: None,
            submitting: false,
        }
    }

    pub fn requisition(&self) -> &Requisition {
        &self.requisition
    }

    pub fn is_eligible(item: &RequisitionItem) -> bool {
        item.price_editable()
    }

    pub fn eligible_items(&self) -> Vec<&RequisitionItem> {
        self.requisition
            .items
            .iter()
            .filter(|item| Self::is_eligible(item))
            .collect()
    }

    /// Displayed price priority: pending local edit, then persisted
    /// override, then the price at approval.
    pub fn effective_price(&self, item: &RequisitionItem) -> Decimal {
        match self.pending.get(&item.id) {
            Some(price) => *price,
            None => item.effective_price(),
        }
    }

    pub fn has_pending_edit(&self, item_id: &str) -> bool {
        self.pending.contains_key(item_id)
    }

    /// Open the edit dialog for an item. Refused with a transient inline
    /// error for ineligible items; no session state changes in that case.
    pub fn open_editor(&mut self, item_id: &str) -> Result<PriceEditor, AppError> {
        let item = match self.requisition.item(item_id) {
            Some(item) => item,
            None => return Err(AppError::NotFound(format!("no item {}", item_id))),
        };

        if !Self::is_eligible(item) {
            let message = if item.qty_delivered > 0 {
                format!(
                    "{}: price cannot be changed after delivery has started",
                    item.item_name
                )
            } else {
                format!("{}: price requires an approved quantity", item.item_name)
            };
            self.inline_error = Some(message.clone());
            return Err(AppError::validation(message));
        }

        Ok(PriceEditor {
            item_id: item.id.clone(),
            item_name: item.item_name.clone(),
            qty_approved: item.qty_approved,
            original_price: item.unit_price_at_approval,
            current_price: self.effective_price(item),
        })
    }

    /// Take the transient inline error for display (cleared on read).
    pub fn take_inline_error(&mut self) -> Option<String> {
        self.inline_error.take()
    }

    /// Commit the dialog's price into the pending edit set.
    pub fn apply(&mut self, editor: &PriceEditor) -> Result<(), AppError> {
        if editor.current_price < Decimal::ZERO {
            return Err(AppError::validation("Price cannot be negative"));
        }
        self.pending
            .insert(editor.item_id.clone(), editor.current_price);
        Ok(())
    }

    pub fn clear_edit(&mut self, item_id: &str) {
        self.pending.remove(item_id);
    }

    /// Original vs current totals across all eligible items, recomputed as
    /// edits accumulate.
    pub fn summary(&self) -> PricingSummary {
        let mut original_total = Decimal::ZERO;
        let mut current_total = Decimal::ZERO;

        for item in self.eligible_items() {
            let qty = Decimal::from(item.qty_approved);
            original_total += qty * item.unit_price_at_approval;
            current_total += qty * self.effective_price(item);
        }

        PricingSummary {
            original_total,
            current_total,
        }
    }

    /// Batch every pending edit into one submission. A successful response
    /// carries the updated requisition (overrides applied, status advanced).
    pub async fn save_all(
        &mut self,
        client: &RequisitionClient,
        token: &str,
    ) -> Result<Requisition, AppError> {
        if self.submitting {
            return Err(AppError::SubmissionInFlight);
        }
        if self.pending.is_empty() {
            return Err(AppError::validation("No price changes to save"));
        }

        let items: Vec<PriceOverrideItemPayload> = self
            .pending
            .iter()
            .map(|(id, price)| PriceOverrideItemPayload {
                id: id.clone(),
                overridden_price: *price,
            })
            .collect();
        // The endpoint is item-scoped; anchor it on the first edited item.
        let anchor = items[0].id.clone();
        let payload = PriceOverridePayload { items };

        self.submitting = true;
        let result = client.override_prices(token, &anchor, &payload).await;
        self.submitting = false;

        match result {
            Ok(updated) => {
                tracing::info!(
                    requisition_id = %updated.id,
                    overrides = payload.items.len(),
                    "price overrides saved"
                );
                self.pending.clear();
                self.requisition = updated.clone();
                Ok(updated)
            }
            Err(err) => {
                tracing::error!(error = %err, "saving price overrides failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requisition::{ItemStatus, RequisitionStatus};
    use chrono::Utc;

    fn item(id: &str, approved: u32, delivered: u32, price: Decimal) -> RequisitionItem {
        RequisitionItem {
            id: id.to_string(),
            item_name: format!("Item {}", id),
            note: None,
            qty_requested: approved.max(1) * 2,
            qty_approved: approved,
            qty_delivered: delivered,
            status: ItemStatus::Approved,
            stock_in_id: Some("lot-1".to_string()),
            unit_price_at_approval: price,
            price_override: None,
            approval_note: None,
            approved_at: None,
            approver: None,
            deliveries: vec![],
        }
    }

    fn requisition(items: Vec<RequisitionItem>) -> Requisition {
        Requisition {
            id: "req-1".to_string(),
            requisition_number: "RQ-001".to_string(),
            status: RequisitionStatus::Reviewed,
            partner_id: "partner-1".to_string(),
            partner_note: None,
            approval_summary: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            reviewed_at: Some(Utc::now()),
            items,
        }
    }

    #[test]
    fn eligibility_requires_approval_and_no_delivery() {
        assert!(PricingSession::is_eligible(&item(
            "a",
            5,
            0,
            Decimal::from(10)
        )));
        assert!(!PricingSession::is_eligible(&item(
            "a",
            5,
            1,
            Decimal::from(10)
        )));
        assert!(!PricingSession::is_eligible(&item(
            "a",
            0,
            0,
            Decimal::from(10)
        )));
    }

    #[test]
    fn opening_editor_for_delivered_item_is_refused_without_mutation() {
        let mut session = PricingSession::new(requisition(vec![
            item("a", 5, 0, Decimal::from(10)),
            item("b", 5, 2, Decimal::from(10)),
        ]));

        let before = session.summary();
        let err = session.open_editor("b").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.summary(), before);
        assert!(!session.has_pending_edit("b"));

        let inline = session.take_inline_error().unwrap();
        assert!(inline.contains("after delivery has started"));
        // transient: cleared on read
        assert!(session.take_inline_error().is_none());
    }

    #[test]
    fn editor_derives_deltas_live() {
        let mut session =
            PricingSession::new(requisition(vec![item("a", 8, 0, Decimal::from(100))]));
        let mut editor = session.open_editor("a").unwrap();

        editor.set_price(Decimal::from(90));
        assert_eq!(editor.unit_delta(), Decimal::from(-10));
        assert_eq!(editor.percent_change(), Some(Decimal::from(-10)));
        assert_eq!(editor.total_delta(), Decimal::from(-80));

        // Nothing persisted until apply
        assert!(!session.has_pending_edit("a"));
        session.apply(&editor).unwrap();
        assert!(session.has_pending_edit("a"));
    }

    #[test]
    fn percent_change_is_undefined_for_zero_original() {
        let mut session = PricingSession::new(requisition(vec![item("a", 8, 0, Decimal::ZERO)]));
        let mut editor = session.open_editor("a").unwrap();
        editor.set_price(Decimal::from(5));
        assert_eq!(editor.percent_change(), None);
    }

    #[test]
    fn effective_price_prefers_pending_edit_over_override() {
        let mut base = item("a", 5, 0, Decimal::from(100));
        base.price_override = Some(Decimal::from(95));
        let mut session = PricingSession::new(requisition(vec![base]));

        let item_ref = session.requisition().items[0].clone();
        assert_eq!(session.effective_price(&item_ref), Decimal::from(95));

        let mut editor = session.open_editor("a").unwrap();
        assert_eq!(editor.current_price, Decimal::from(95));
        editor.set_price(Decimal::from(90));
        session.apply(&editor).unwrap();
        assert_eq!(session.effective_price(&item_ref), Decimal::from(90));
    }

    #[test]
    fn summary_tracks_accumulating_edits() {
        let mut session = PricingSession::new(requisition(vec![
            item("a", 2, 0, Decimal::from(100)),
            item("b", 3, 0, Decimal::from(50)),
        ]));

        let summary = session.summary();
        assert_eq!(summary.original_total, Decimal::from(350));
        assert_eq!(summary.current_total, Decimal::from(350));
        assert_eq!(summary.delta(), Decimal::ZERO);

        let mut editor = session.open_editor("a").unwrap();
        editor.set_price(Decimal::from(80));
        session.apply(&editor).unwrap();

        let summary = session.summary();
        assert_eq!(summary.original_total, Decimal::from(350));
        assert_eq!(summary.current_total, Decimal::from(310));
        assert_eq!(summary.delta(), Decimal::from(-40));
    }

    #[test]
    fn negative_price_is_rejected_on_apply() {
        let mut session =
            PricingSession::new(requisition(vec![item("a", 2, 0, Decimal::from(100))]));
        let mut editor = session.open_editor("a").unwrap();
        editor.set_price(Decimal::from(-1));
        assert!(session.apply(&editor).is_err());
        assert!(!session.has_pending_edit("a"));
    }
}
