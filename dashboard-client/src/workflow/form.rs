//! Requisition create/update form.
//!
//! Draft rows are a tagged variant: persisted rows are soft-removed with a
//! tombstone flag (kept visible so the user can undo), rows that never hit
//! the server are spliced out immediately. Edit mode keeps a deep snapshot
//! of the original requisition for diff highlighting; the diff is a display
//! affordance only and is never sent to the server.

use crate::models::requisition::Requisition;
use crate::services::requisition_client::{
    RequisitionClient, RequisitionItemPayload, RequisitionPayload,
};
use requisition_core::error::AppError;
use uuid::Uuid;

/// Identity of a draft row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowId {
    /// Persisted on the server; removal is a tombstone.
    Existing { id: String, remove: bool },
    /// Local-only; the temp id is never sent to the server.
    New { temp_id: Uuid },
}

impl RowId {
    pub fn is_removed(&self) -> bool {
        matches!(self, RowId::Existing { remove: true, .. })
    }

    fn server_id(&self) -> Option<&str> {
        match self {
            RowId::Existing { id, .. } => Some(id),
            RowId::New { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DraftItem {
    pub row: RowId,
    pub item_name: String,
    pub qty_requested: u32,
    pub note: String,
}

impl DraftItem {
    fn field_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.item_name.trim().is_empty() {
            errors.push("Item name is required".to_string());
        }
        if self.qty_requested == 0 {
            errors.push("Quantity must be greater than zero".to_string());
        }
        errors
    }
}

/// How a draft row differs from the loaded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    Added { temp_id: Uuid },
    Removed { id: String },
    Modified { id: String },
}

/// Explicit diff against the edit-mode snapshot.
#[derive(Debug, Clone, Default)]
pub struct FormDiff {
    pub note_changed: bool,
    pub changed_rows: Vec<RowChange>,
}

impl FormDiff {
    pub fn is_empty(&self) -> bool {
        !self.note_changed && self.changed_rows.is_empty()
    }
}

enum Mode {
    Create,
    Edit { requisition_id: String },
}

pub struct RequisitionForm {
    mode: Mode,
    /// Deep snapshot of the server state, retained in edit mode for diff
    /// highlighting.
    original: Option<Requisition>,
    partner_note: String,
    items: Vec<DraftItem>,
    submitting: bool,
}

impl RequisitionForm {
    /// Blank create-mode form with one empty row.
    pub fn create() -> Self {
        let mut form = Self {
            mode: Mode::Create,
            original: None,
            partner_note: String::new(),
            items: Vec::new(),
            submitting: false,
        };
        form.add_item();
        form
    }

    /// Edit-mode form seeded from a fetched requisition.
    pub fn edit(requisition: Requisition) -> Self {
        let items = requisition
            .items
            .iter()
            .map(|item| DraftItem {
                row: RowId::Existing {
                    id: item.id.clone(),
                    remove: false,
                },
                item_name: item.item_name.clone(),
                qty_requested: item.qty_requested,
                note: item.note.clone().unwrap_or_default(),
            })
            .collect();

        Self {
            mode: Mode::Edit {
                requisition_id: requisition.id.clone(),
            },
            partner_note: requisition.partner_note.clone().unwrap_or_default(),
            original: Some(requisition),
            items,
            submitting: false,
        }
    }

    pub fn items(&self) -> &[DraftItem] {
        &self.items
    }

    pub fn partner_note(&self) -> &str {
        &self.partner_note
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Append a blank draft row with a client-generated temp id.
    pub fn add_item(&mut self) -> Uuid {
        let temp_id = Uuid::new_v4();
        self.items.push(DraftItem {
            row: RowId::New { temp_id },
            item_name: String::new(),
            qty_requested: 0,
            note: String::new(),
        });
        temp_id
    }

    /// Remove a row: tombstone for persisted rows, splice for local ones.
    pub fn remove_item(&mut self, index: usize) -> Result<(), AppError> {
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("no draft row at index {}", index)))?;

        match &mut item.row {
            RowId::Existing { remove, .. } => *remove = true,
            RowId::New { .. } => {
                self.items.remove(index);
            }
        }
        Ok(())
    }

    /// Undo a tombstone. A no-op for local rows (they are already gone).
    pub fn restore_item(&mut self, index: usize) -> Result<(), AppError> {
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("no draft row at index {}", index)))?;

        if let RowId::Existing { remove, .. } = &mut item.row {
            *remove = false;
        }
        Ok(())
    }

    pub fn set_item_name(&mut self, index: usize, value: &str) -> Result<(), AppError> {
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("no draft row at index {}", index)))?;
        item.item_name = value.to_string();
        Ok(())
    }

    pub fn set_qty_requested(&mut self, index: usize, value: u32) -> Result<(), AppError> {
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("no draft row at index {}", index)))?;
        item.qty_requested = value;
        Ok(())
    }

    pub fn set_item_note(&mut self, index: usize, value: &str) -> Result<(), AppError> {
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("no draft row at index {}", index)))?;
        item.note = value.to_string();
        Ok(())
    }

    pub fn set_partner_note(&mut self, value: &str) {
        self.partner_note = value.to_string();
    }

    /// Field-level errors for one row, recomputed on every keystroke.
    /// Tombstoned rows are exempt.
    pub fn row_errors(&self, index: usize) -> Vec<String> {
        match self.items.get(index) {
            Some(item) if !item.row.is_removed() => item.field_errors(),
            _ => Vec::new(),
        }
    }

    /// Full-form validation over all active rows, aggregating messages.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let active: Vec<&DraftItem> = self
            .items
            .iter()
            .filter(|item| !item.row.is_removed())
            .collect();

        if active.is_empty() {
            errors.push("Add at least one item".to_string());
        }

        for (position, item) in active.iter().enumerate() {
            for message in item.field_errors() {
                errors.push(format!("Item {}: {}", position + 1, message));
            }
        }

        errors
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && self.validation_errors().is_empty()
    }

    /// Diff against the edit-mode snapshot. Empty in create mode until rows
    /// are added; a no-change edit session yields an empty diff.
    pub fn diff(&self) -> FormDiff {
        let original = match &self.original {
            Some(original) => original,
            None => {
                return FormDiff {
                    note_changed: !self.partner_note.is_empty(),
                    changed_rows: self
                        .items
                        .iter()
                        .filter_map(|item| match &item.row {
                            RowId::New { temp_id } => Some(RowChange::Added { temp_id: *temp_id }),
                            RowId::Existing { .. } => None,
                        })
                        .collect(),
                }
            }
        };

        let original_note = original.partner_note.clone().unwrap_or_default();
        let mut changed_rows = Vec::new();

        for item in &self.items {
            match &item.row {
                RowId::New { temp_id } => changed_rows.push(RowChange::Added { temp_id: *temp_id }),
                RowId::Existing { id, remove } => {
                    if *remove {
                        changed_rows.push(RowChange::Removed { id: id.clone() });
                        continue;
                    }
                    if let Some(snapshot) = original.item(id) {
                        let note = snapshot.note.clone().unwrap_or_default();
                        if snapshot.item_name != item.item_name
                            || snapshot.qty_requested != item.qty_requested
                            || note != item.note
                        {
                            changed_rows.push(RowChange::Modified { id: id.clone() });
                        }
                    }
                }
            }
        }

        FormDiff {
            note_changed: self.partner_note != original_note,
            changed_rows,
        }
    }

    /// Whether a row should be highlighted as edited.
    pub fn is_row_edited(&self, index: usize) -> bool {
        let item = match self.items.get(index) {
            Some(item) => item,
            None => return false,
        };
        let id = match item.row.server_id() {
            Some(id) => id,
            // New rows are always "edited"
            None => return true,
        };

        self.diff().changed_rows.iter().any(|change| match change {
            RowChange::Modified { id: changed } | RowChange::Removed { id: changed } => {
                changed == id
            }
            RowChange::Added { .. } => false,
        })
    }

    /// Build the submission payload. Tombstoned rows ride along with
    /// `remove: true`; everything else is sent as-is.
    pub fn payload(&self) -> RequisitionPayload {
        let items = self
            .items
            .iter()
            .map(|item| RequisitionItemPayload {
                id: item.row.server_id().map(|id| id.to_string()),
                item_name: item.item_name.trim().to_string(),
                qty_requested: item.qty_requested,
                note: if item.note.trim().is_empty() {
                    None
                } else {
                    Some(item.note.trim().to_string())
                },
                remove: if item.row.is_removed() {
                    Some(true)
                } else {
                    None
                },
            })
            .collect();

        RequisitionPayload {
            partner_note: if self.partner_note.trim().is_empty() {
                None
            } else {
                Some(self.partner_note.trim().to_string())
            },
            items,
        }
    }

    /// Validate and submit. Create mode posts; edit mode puts against the
    /// loaded requisition id.
    pub async fn submit(
        &mut self,
        client: &RequisitionClient,
        token: &str,
    ) -> Result<Requisition, AppError> {
        if self.submitting {
            return Err(AppError::SubmissionInFlight);
        }
        let errors = self.validation_errors();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        self.submitting = true;
        let payload = self.payload();
        let result = match &self.mode {
            Mode::Create => client.create(token, &payload).await,
            Mode::Edit { requisition_id } => client.update(token, requisition_id, &payload).await,
        };
        self.submitting = false;

        if let Err(err) = &result {
            tracing::error!(error = %err, "requisition submission failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requisition::{ItemStatus, RequisitionItem, RequisitionStatus};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn persisted_requisition() -> Requisition {
        Requisition {
            id: "req-1".to_string(),
            requisition_number: "RQ-001".to_string(),
            status: RequisitionStatus::Pending,
            partner_id: "partner-1".to_string(),
            partner_note: Some("Urgent".to_string()),
            approval_summary: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            reviewed_at: None,
            items: vec![
                RequisitionItem {
                    id: "item-1".to_string(),
                    item_name: "Chair".to_string(),
                    note: Some("black".to_string()),
                    qty_requested: 10,
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
                },
                RequisitionItem {
                    id: "item-2".to_string(),
                    item_name: "Desk".to_string(),
                    note: None,
                    qty_requested: 4,
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
                },
            ],
        }
    }

    #[test]
    fn create_mode_starts_with_one_blank_row() {
        let form = RequisitionForm::create();
        assert_eq!(form.items().len(), 1);
        assert!(!form.can_submit());
        assert!(form
            .row_errors(0)
            .iter()
            .any(|e| e.contains("Item name is required")));
    }

    #[test]
    fn removing_new_row_splices_it_out() {
        let mut form = RequisitionForm::create();
        form.add_item();
        assert_eq!(form.items().len(), 2);
        form.remove_item(1).unwrap();
        assert_eq!(form.items().len(), 1);
    }

    #[test]
    fn removing_persisted_row_sets_tombstone_and_is_undoable() {
        let mut form = RequisitionForm::edit(persisted_requisition());
        form.remove_item(0).unwrap();
        // Row stays visible so the user can undo
        assert_eq!(form.items().len(), 2);
        assert!(form.items()[0].row.is_removed());

        let payload = form.payload();
        assert_eq!(payload.items[0].remove, Some(true));

        form.restore_item(0).unwrap();
        assert!(!form.items()[0].row.is_removed());
        assert_eq!(form.payload().items[0].remove, None);
    }

    #[test]
    fn tombstoned_rows_are_excluded_from_validation() {
        let mut form = RequisitionForm::edit(persisted_requisition());
        // Make row 0 invalid, then tombstone it
        form.set_item_name(0, "").unwrap();
        assert!(!form.validation_errors().is_empty());
        form.remove_item(0).unwrap();
        assert!(form.validation_errors().is_empty());
    }

    #[test]
    fn no_change_edit_session_is_a_noop_diff_and_payload() {
        let original = persisted_requisition();
        let form = RequisitionForm::edit(original.clone());

        assert!(form.diff().is_empty());

        let payload = form.payload();
        assert_eq!(payload.partner_note.as_deref(), Some("Urgent"));
        assert_eq!(payload.items.len(), 2);
        for (payload_item, item) in payload.items.iter().zip(&original.items) {
            assert_eq!(payload_item.id.as_deref(), Some(item.id.as_str()));
            assert_eq!(payload_item.item_name, item.item_name);
            assert_eq!(payload_item.qty_requested, item.qty_requested);
            assert_eq!(payload_item.remove, None);
        }
    }

    #[test]
    fn diff_flags_modified_rows_and_note() {
        let mut form = RequisitionForm::edit(persisted_requisition());
        form.set_qty_requested(0, 12).unwrap();
        form.set_partner_note("Less urgent");

        let diff = form.diff();
        assert!(diff.note_changed);
        assert_eq!(
            diff.changed_rows,
            vec![RowChange::Modified {
                id: "item-1".to_string()
            }]
        );
        assert!(form.is_row_edited(0));
        assert!(!form.is_row_edited(1));
    }

    #[test]
    fn validation_blocks_empty_form() {
        let mut form = RequisitionForm::create();
        form.remove_item(0).unwrap();
        assert_eq!(form.validation_errors(), vec!["Add at least one item"]);
    }

    #[test]
    fn validation_aggregates_row_messages() {
        let mut form = RequisitionForm::create();
        form.add_item();
        form.set_item_name(0, "Chair").unwrap();
        form.set_qty_requested(0, 5).unwrap();
        // Row 2 left blank entirely
        let errors = form.validation_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Item 2:"));
    }

    #[test]
    fn new_row_payload_carries_no_id() {
        let mut form = RequisitionForm::create();
        form.set_item_name(0, "  Chair  ").unwrap();
        form.set_qty_requested(0, 3).unwrap();

        let payload = form.payload();
        assert_eq!(payload.items[0].id, None);
        assert_eq!(payload.items[0].item_name, "Chair");
        assert_eq!(payload.partner_note, None);
    }
}
