//! Per-item review of a pending requisition.
//!
//! Drafts exist only for items fetched as PENDING; items already reviewed
//! are read-only in this session. Partial review is allowed: items left
//! undecided are excluded from the submission payload.

use crate::models::requisition::{ItemStatus, Requisition, RequisitionItem};
use crate::models::stock::StockLot;
use crate::services::requisition_client::{
    ApprovalItemPayload, ApprovalPayload, RequisitionClient,
};
use requisition_core::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pending,
    Approve,
    Reject,
}

#[derive(Debug, Clone)]
pub struct ApprovalDraft {
    pub item_id: String,
    pub item_name: String,
    pub qty_requested: u32,
    pub decision: Decision,
    pub qty_approved: u32,
    /// Assigned lot plus its full record, so availability is checked without
    /// another fetch.
    pub stock: Option<StockLot>,
    pub approval_note: String,
}

impl ApprovalDraft {
    /// Upper bound for the approved quantity given the current stock
    /// assignment.
    fn qty_ceiling(&self) -> u32 {
        match &self.stock {
            Some(lot) => self.qty_requested.min(lot.quantity),
            None => self.qty_requested,
        }
    }
}

pub struct ApprovalSession {
    requisition: Requisition,
    drafts: Vec<ApprovalDraft>,
    awaiting_confirmation: bool,
    submitting: bool,
}

impl ApprovalSession {
    pub fn new(requisition: Requisition) -> Self {
        let drafts = requisition
            .items
            .iter()
            .filter(|item| item.status == ItemStatus::Pending)
            .map(|item| ApprovalDraft {
                item_id: item.id.clone(),
                item_name: item.item_name.clone(),
                qty_requested: item.qty_requested,
                decision: Decision::Pending,
                qty_approved: 0,
                stock: None,
                approval_note: String::new(),
            })
            .collect();

        Self {
            requisition,
            drafts,
            awaiting_confirmation: false,
            submitting: false,
        }
    }

    pub fn requisition(&self) -> &Requisition {
        &self.requisition
    }

    pub fn drafts(&self) -> &[ApprovalDraft] {
        &self.drafts
    }

    /// Items already reviewed before this session; rendered read-only.
    pub fn reviewed_items(&self) -> Vec<&RequisitionItem> {
        self.requisition
            .items
            .iter()
            .filter(|item| item.status != ItemStatus::Pending)
            .collect()
    }

    fn draft_mut(&mut self, item_id: &str) -> Result<&mut ApprovalDraft, AppError> {
        self.drafts
            .iter_mut()
            .find(|draft| draft.item_id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("no pending item {}", item_id)))
    }

    pub fn draft(&self, item_id: &str) -> Option<&ApprovalDraft> {
        self.drafts.iter().find(|draft| draft.item_id == item_id)
    }

    /// Mark an item approved, defaulting to the full requested quantity
    /// (clamped if a lot is already assigned).
    pub fn approve(&mut self, item_id: &str) -> Result<(), AppError> {
        let draft = self.draft_mut(item_id)?;
        draft.decision = Decision::Approve;
        draft.qty_approved = draft.qty_ceiling();
        Ok(())
    }

    /// Mark an item rejected: quantity zeroed, stock assignment cleared.
    pub fn reject(&mut self, item_id: &str) -> Result<(), AppError> {
        let draft = self.draft_mut(item_id)?;
        draft.decision = Decision::Reject;
        draft.qty_approved = 0;
        draft.stock = None;
        Ok(())
    }

    /// Assign a stock lot. The draft quantity is clamped down to the lot's
    /// availability; over-subscription is never representable.
    pub fn assign_stock(&mut self, item_id: &str, lot: StockLot) -> Result<(), AppError> {
        let draft = self.draft_mut(item_id)?;
        if draft.qty_approved > lot.quantity {
            draft.qty_approved = lot.quantity;
        }
        draft.stock = Some(lot);
        Ok(())
    }

    pub fn set_qty_approved(&mut self, item_id: &str, qty: u32) -> Result<(), AppError> {
        let draft = self.draft_mut(item_id)?;
        draft.qty_approved = qty;
        Ok(())
    }

    pub fn set_approval_note(&mut self, item_id: &str, note: &str) -> Result<(), AppError> {
        let draft = self.draft_mut(item_id)?;
        draft.approval_note = note.to_string();
        Ok(())
    }

    /// Single source of truth for submission readiness. The submit button
    /// state derives from this; there is no second copy of these checks.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let decided = self
            .drafts
            .iter()
            .filter(|draft| draft.decision != Decision::Pending)
            .count();
        if decided == 0 {
            errors.push("Review at least one item before submitting".to_string());
        }

        for draft in &self.drafts {
            if draft.decision != Decision::Approve {
                continue;
            }
            if draft.qty_approved == 0 {
                errors.push(format!(
                    "{}: approved quantity must be greater than zero",
                    draft.item_name
                ));
            }
            if draft.qty_approved > draft.qty_requested {
                errors.push(format!(
                    "{}: approved quantity cannot exceed the requested {}",
                    draft.item_name, draft.qty_requested
                ));
            }
            match &draft.stock {
                None => errors.push(format!("{}: select a stock lot", draft.item_name)),
                Some(lot) if draft.qty_approved > lot.quantity => errors.push(format!(
                    "{}: only {} available in the selected lot",
                    draft.item_name, lot.quantity
                )),
                Some(_) => {}
            }
        }

        errors
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && self.validation_errors().is_empty()
    }

    /// Items left pending are silently excluded: partial review is allowed.
    pub fn payload(&self) -> ApprovalPayload {
        let items = self
            .drafts
            .iter()
            .filter_map(|draft| match draft.decision {
                Decision::Pending => None,
                Decision::Approve => Some(ApprovalItemPayload {
                    item_id: draft.item_id.clone(),
                    qty_approved: draft.qty_approved,
                    stock_in_id: draft.stock.as_ref().map(|lot| lot.id.clone()),
                    approval_note: non_empty(&draft.approval_note),
                }),
                Decision::Reject => Some(ApprovalItemPayload {
                    item_id: draft.item_id.clone(),
                    qty_approved: 0,
                    stock_in_id: None,
                    approval_note: non_empty(&draft.approval_note),
                }),
            })
            .collect();

        ApprovalPayload { items }
    }

    /// First step of the gated submit: validate and arm the confirmation
    /// prompt.
    pub fn request_submit(&mut self) -> Result<(), AppError> {
        let errors = self.validation_errors();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        self.awaiting_confirmation = true;
        Ok(())
    }

    pub fn awaiting_confirmation(&self) -> bool {
        self.awaiting_confirmation
    }

    pub fn cancel_submit(&mut self) {
        self.awaiting_confirmation = false;
    }

    /// Second step: the operator confirmed the prompt; post atomically.
    pub async fn confirm_submit(
        &mut self,
        client: &RequisitionClient,
        token: &str,
    ) -> Result<Requisition, AppError> {
        if !self.awaiting_confirmation {
            return Err(AppError::validation(
                "Submission has not been requested yet",
            ));
        }
        if self.submitting {
            return Err(AppError::SubmissionInFlight);
        }
        let errors = self.validation_errors();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        self.submitting = true;
        let result = client
            .approve(token, &self.requisition.id, &self.payload())
            .await;
        self.submitting = false;
        self.awaiting_confirmation = false;

        match &result {
            Ok(updated) => {
                tracing::info!(
                    requisition_id = %updated.id,
                    status = updated.status.as_str(),
                    "review submitted"
                );
            }
            Err(err) => tracing::error!(error = %err, "review submission failed"),
        }
        result
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requisition::RequisitionStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn lot(id: &str, quantity: u32) -> StockLot {
        StockLot {
            id: id.to_string(),
            item_name: "Chair".to_string(),
            quantity,
            unit_price: Decimal::new(1999, 2),
            received_at: None,
        }
    }

    fn pending_item(id: &str, qty: u32) -> RequisitionItem {
        RequisitionItem {
            id: id.to_string(),
            item_name: format!("Item {}", id),
            note: None,
            qty_requested: qty,
            qty_approved: 0,
            qty_delivered: 0,
            status: ItemStatus::Pending,
            stock_in_id: None,
            unit_price_at_approval: Decimal::ZERO,
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
            status: RequisitionStatus::Pending,
            partner_id: "partner-1".to_string(),
            partner_note: None,
            approval_summary: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            reviewed_at: None,
            items,
        }
    }

    #[test]
    fn drafts_exist_only_for_pending_items() {
        let mut reviewed = pending_item("item-2", 5);
        reviewed.status = ItemStatus::Approved;
        let session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10), reviewed]));

        assert_eq!(session.drafts().len(), 1);
        assert_eq!(session.drafts()[0].item_id, "item-1");
        assert_eq!(session.reviewed_items().len(), 1);
    }

    #[test]
    fn approve_defaults_to_full_requested_quantity() {
        let mut session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        session.approve("item-1").unwrap();
        let draft = session.draft("item-1").unwrap();
        assert_eq!(draft.decision, Decision::Approve);
        assert_eq!(draft.qty_approved, 10);
    }

    #[test]
    fn reject_zeroes_quantity_and_clears_stock() {
        let mut session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        session.approve("item-1").unwrap();
        session.assign_stock("item-1", lot("lot-1", 20)).unwrap();
        session.reject("item-1").unwrap();

        let draft = session.draft("item-1").unwrap();
        assert_eq!(draft.decision, Decision::Reject);
        assert_eq!(draft.qty_approved, 0);
        assert!(draft.stock.is_none());
    }

    #[test]
    fn assigning_short_lot_clamps_quantity() {
        let mut session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        session.approve("item-1").unwrap();
        assert_eq!(session.draft("item-1").unwrap().qty_approved, 10);

        session.assign_stock("item-1", lot("lot-1", 8)).unwrap();
        assert_eq!(session.draft("item-1").unwrap().qty_approved, 8);
    }

    #[test]
    fn approve_after_stock_assignment_respects_lot_ceiling() {
        let mut session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        session.assign_stock("item-1", lot("lot-1", 6)).unwrap();
        session.approve("item-1").unwrap();
        assert_eq!(session.draft("item-1").unwrap().qty_approved, 6);
    }

    #[test]
    fn untouched_session_requires_at_least_one_decision() {
        let session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        assert_eq!(
            session.validation_errors(),
            vec!["Review at least one item before submitting"]
        );
        assert!(!session.can_submit());
    }

    #[test]
    fn approved_item_without_stock_is_invalid() {
        let mut session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        session.approve("item-1").unwrap();
        let errors = session.validation_errors();
        assert!(errors.iter().any(|e| e.contains("select a stock lot")));
    }

    #[test]
    fn quantity_raised_above_lot_availability_is_invalid() {
        let mut session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        session.approve("item-1").unwrap();
        session.assign_stock("item-1", lot("lot-1", 8)).unwrap();
        session.set_qty_approved("item-1", 9).unwrap();
        let errors = session.validation_errors();
        assert!(errors.iter().any(|e| e.contains("only 8 available")));
    }

    #[test]
    fn undecided_items_are_excluded_from_payload() {
        let mut session = ApprovalSession::new(requisition(vec![
            pending_item("item-1", 10),
            pending_item("item-2", 4),
        ]));
        session.approve("item-1").unwrap();
        session.assign_stock("item-1", lot("lot-1", 10)).unwrap();

        let payload = session.payload();
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].item_id, "item-1");
        assert_eq!(payload.items[0].stock_in_id.as_deref(), Some("lot-1"));
    }

    #[test]
    fn rejected_item_submits_zero_quantity_without_stock() {
        let mut session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        session.reject("item-1").unwrap();

        let payload = session.payload();
        assert_eq!(payload.items[0].qty_approved, 0);
        assert_eq!(payload.items[0].stock_in_id, None);
    }

    #[test]
    fn submit_is_gated_by_confirmation() {
        let mut session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        session.reject("item-1").unwrap();

        assert!(!session.awaiting_confirmation());
        session.request_submit().unwrap();
        assert!(session.awaiting_confirmation());
        session.cancel_submit();
        assert!(!session.awaiting_confirmation());
    }

    #[test]
    fn request_submit_surfaces_validation_errors() {
        let mut session = ApprovalSession::new(requisition(vec![pending_item("item-1", 10)]));
        let err = session.request_submit().unwrap_err();
        assert!(err.is_validation());
        assert!(!session.awaiting_confirmation());
    }
}
