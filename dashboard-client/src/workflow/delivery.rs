//! Partial-delivery recording against approved quantities.
//!
//! Eligible items still have an approved-but-undelivered remainder. The
//! operator selects a subset (checkbox semantics) and gives each selected
//! item a quantity no greater than its remaining gap.

use crate::models::requisition::{Delivery, Requisition};
use crate::models::user::Role;
use crate::services::requisition_client::{
    DeliveryItemPayload, DeliveryPayload, RequisitionClient,
};
use requisition_core::error::AppError;

#[derive(Debug, Clone)]
pub struct DeliveryDraft {
    pub item_id: String,
    pub item_name: String,
    /// Approved minus already delivered, fixed at session build time.
    pub remaining: u32,
    pub selected: bool,
    pub qty_delivered: u32,
    pub delivery_note: String,
    /// Expanded state of this item's delivery history; independent per item.
    pub history_open: bool,
}

/// Result of a successful submission: the updated requisition plus the
/// role-parameterized route the operator is sent back to.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub requisition: Requisition,
    pub redirect_to: String,
}

pub struct DeliverySession {
    requisition: Requisition,
    drafts: Vec<DeliveryDraft>,
    submitting: bool,
}

impl DeliverySession {
    pub fn new(requisition: Requisition) -> Self {
        let drafts = requisition
            .items
            .iter()
            .filter(|item| item.remaining_gap() > 0)
            .map(|item| DeliveryDraft {
                item_id: item.id.clone(),
                item_name: item.item_name.clone(),
                remaining: item.remaining_gap(),
                selected: false,
                qty_delivered: 0,
                delivery_note: String::new(),
                history_open: false,
            })
            .collect();

        Self {
            requisition,
            drafts,
            submitting: false,
        }
    }

    pub fn requisition(&self) -> &Requisition {
        &self.requisition
    }

    pub fn drafts(&self) -> &[DeliveryDraft] {
        &self.drafts
    }

    pub fn draft(&self, item_id: &str) -> Option<&DeliveryDraft> {
        self.drafts.iter().find(|draft| draft.item_id == item_id)
    }

    fn draft_mut(&mut self, item_id: &str) -> Result<&mut DeliveryDraft, AppError> {
        self.drafts
            .iter_mut()
            .find(|draft| draft.item_id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("no deliverable item {}", item_id)))
    }

    pub fn select(&mut self, item_id: &str) -> Result<(), AppError> {
        self.draft_mut(item_id)?.selected = true;
        Ok(())
    }

    /// Deselecting clears the item's contribution to the submission but
    /// keeps its drafted quantity.
    pub fn deselect(&mut self, item_id: &str) -> Result<(), AppError> {
        self.draft_mut(item_id)?.selected = false;
        Ok(())
    }

    pub fn set_qty_delivered(&mut self, item_id: &str, qty: u32) -> Result<(), AppError> {
        self.draft_mut(item_id)?.qty_delivered = qty;
        Ok(())
    }

    pub fn set_delivery_note(&mut self, item_id: &str, note: &str) -> Result<(), AppError> {
        self.draft_mut(item_id)?.delivery_note = note.to_string();
        Ok(())
    }

    /// Toggle one item's delivery history; other items are unaffected.
    pub fn toggle_history(&mut self, item_id: &str) -> Result<(), AppError> {
        let draft = self.draft_mut(item_id)?;
        draft.history_open = !draft.history_open;
        Ok(())
    }

    /// Delivery history for one item, a read affordance.
    pub fn history(&self, item_id: &str) -> Vec<&Delivery> {
        self.requisition
            .item(item_id)
            .map(|item| item.deliveries.iter().collect())
            .unwrap_or_default()
    }

    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let selected: Vec<&DeliveryDraft> =
            self.drafts.iter().filter(|draft| draft.selected).collect();
        if selected.is_empty() {
            errors.push("Select at least one item to deliver".to_string());
        }

        for draft in selected {
            if draft.qty_delivered == 0 {
                errors.push(format!(
                    "{}: enter a quantity to deliver",
                    draft.item_name
                ));
            } else if draft.qty_delivered > draft.remaining {
                errors.push(format!(
                    "{}: Cannot deliver more than {}",
                    draft.item_name, draft.remaining
                ));
            }
        }

        errors
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && self.validation_errors().is_empty()
    }

    /// Selected items only.
    pub fn payload(&self) -> DeliveryPayload {
        let deliveries = self
            .drafts
            .iter()
            .filter(|draft| draft.selected)
            .map(|draft| DeliveryItemPayload {
                item_id: draft.item_id.clone(),
                qty_delivered: draft.qty_delivered,
                delivery_note: {
                    let trimmed = draft.delivery_note.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed.to_string())
                    }
                },
            })
            .collect();

        DeliveryPayload { deliveries }
    }

    /// Validate and submit; no network call is made while errors are
    /// outstanding.
    pub async fn submit(
        &mut self,
        client: &RequisitionClient,
        token: &str,
        role: Role,
    ) -> Result<DeliveryOutcome, AppError> {
        if self.submitting {
            return Err(AppError::SubmissionInFlight);
        }
        let errors = self.validation_errors();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        self.submitting = true;
        let result = client
            .deliver(token, &self.requisition.id, &self.payload())
            .await;
        self.submitting = false;

        match result {
            Ok(updated) => {
                tracing::info!(
                    requisition_id = %updated.id,
                    status = updated.status.as_str(),
                    "deliveries recorded"
                );
                Ok(DeliveryOutcome {
                    requisition: updated,
                    redirect_to: role.requisition_list_route(),
                })
            }
            Err(err) => {
                tracing::error!(error = %err, "recording deliveries failed");
                Err(err)
            }
        }
    }
}
