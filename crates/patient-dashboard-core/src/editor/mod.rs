//! Record editor.
//!
//! One editor drives the create, edit and delete flows. It owns the
//! [`Draft`] while open and talks to storage only on [`submit`] and
//! [`delete_record`].
//!
//! ```text
//!            open_new                     submit (valid) / discard
//!   Closed ───────────► EditingNew ─────────────────────────────► Closed
//!     │                                                             ▲
//!     │ open_existing                submit (valid) / discard       │
//!     └────────────► EditingExisting(id) ──────────────────────────┤
//!                              │            delete_record           │
//!                              └────────────────────────────────────┘
//! ```
//!
//! An invalid submit writes nothing and leaves the editor open with the
//! draft's `validating` flag set.
//!
//! [`submit`]: RecordEditor::submit
//! [`delete_record`]: RecordEditor::delete_record

mod address;
mod validation;

pub use validation::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    AddressField, AddressSlot, CustomFieldDefinition, CustomFieldValue, CustomFields, Draft,
    PatientRecord, PatientStatus,
};
use crate::store::{DocumentStore, StoreError};

/// Editor errors.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Editor is closed")]
    NotEditing,

    #[error("Only a stored record can be deleted")]
    NotExisting,

    #[error("No address at index {0}")]
    AddressIndex(usize),

    #[error("Address {0} is not open for editing")]
    AddressNotOpen(usize),

    #[error("The primary address cannot be removed")]
    PrimaryAddressLocked,

    #[error("Unknown custom field: {0}")]
    UnknownField(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EditorResult<T> = Result<T, EditorError>;

/// Where the editor is in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditorState {
    #[default]
    Closed,
    EditingNew,
    /// Editing the stored record with this id
    EditingExisting(String),
}

/// Result of a submit that reached validation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing was written; the editor stays open
    Invalid(ValidationReport),
    /// Written under this record id; the editor is closed
    Saved(String),
}

/// Draft editor for a single patient record.
#[derive(Debug, Default)]
pub struct RecordEditor {
    state: EditorState,
    draft: Option<Draft>,
    /// Stored values of the record being edited, for re-joining after a
    /// registry change
    stored_values: Option<CustomFields>,
}

impl RecordEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != EditorState::Closed
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Open on an empty record.
    pub fn open_new(&mut self, definitions: &[CustomFieldDefinition]) {
        self.state = EditorState::EditingNew;
        self.draft = Some(Draft::initial(definitions));
        self.stored_values = None;
    }

    /// Open on a stored record.
    pub fn open_existing(
        &mut self,
        record: &PatientRecord,
        definitions: &[CustomFieldDefinition],
    ) {
        tracing::debug!(record_id = %record.id, "opening record for edit");
        self.state = EditorState::EditingExisting(record.id.clone());
        self.draft = Some(Draft::from_record(record, definitions));
        self.stored_values = record.document.custom_fields.clone();
    }

    pub fn set_first_name(&mut self, value: &str) -> EditorResult<()> {
        self.draft_mut()?.first_name = value.to_string();
        Ok(())
    }

    pub fn set_middle_name(&mut self, value: &str) -> EditorResult<()> {
        self.draft_mut()?.middle_name = value.to_string();
        Ok(())
    }

    pub fn set_last_name(&mut self, value: &str) -> EditorResult<()> {
        self.draft_mut()?.last_name = value.to_string();
        Ok(())
    }

    pub fn set_status(&mut self, status: PatientStatus) -> EditorResult<()> {
        self.draft_mut()?.status = status;
        Ok(())
    }

    pub fn set_date_of_birth(&mut self, date: Option<NaiveDate>) -> EditorResult<()> {
        self.draft_mut()?.date_of_birth = date;
        Ok(())
    }

    /// Set or clear the value of the custom field with storage key `key`.
    pub fn set_custom_field(
        &mut self,
        key: &str,
        value: Option<CustomFieldValue>,
    ) -> EditorResult<()> {
        let entry = self
            .draft_mut()?
            .custom_fields
            .iter_mut()
            .find(|entry| entry.definition.key == key)
            .ok_or_else(|| EditorError::UnknownField(key.to_string()))?;
        entry.value = value;
        Ok(())
    }

    /// Append an empty address card, already open. Returns its index.
    pub fn add_address(&mut self) -> EditorResult<usize> {
        let draft = self.draft_mut()?;
        draft.addresses.push(AddressSlot::blank_editing());
        Ok(draft.addresses.len() - 1)
    }

    pub fn begin_address_edit(&mut self, index: usize) -> EditorResult<()> {
        self.slot_mut(index)?.begin_edit();
        Ok(())
    }

    pub fn update_address_field(
        &mut self,
        index: usize,
        field: AddressField,
        value: &str,
    ) -> EditorResult<()> {
        if self.slot_mut(index)?.update_field(field, value.to_string()) {
            Ok(())
        } else {
            Err(EditorError::AddressNotOpen(index))
        }
    }

    /// Commit an open address card. Returns `false` when required lines are
    /// missing; the card then stays open and flags them.
    pub fn finish_address_edit(&mut self, index: usize) -> EditorResult<bool> {
        let slot = self.slot_mut(index)?;
        if !slot.editing {
            return Err(EditorError::AddressNotOpen(index));
        }
        Ok(slot.finish_edit())
    }

    pub fn cancel_address_edit(&mut self, index: usize) -> EditorResult<()> {
        self.slot_mut(index)?.cancel_edit();
        Ok(())
    }

    /// Remove a secondary address. Address 0 is the primary and stays.
    pub fn remove_address(&mut self, index: usize) -> EditorResult<()> {
        let draft = self.draft_mut()?;
        if index >= draft.addresses.len() {
            return Err(EditorError::AddressIndex(index));
        }
        if index == 0 {
            return Err(EditorError::PrimaryAddressLocked);
        }
        draft.addresses.remove(index);
        Ok(())
    }

    /// Re-join the draft's custom fields against a new registry.
    ///
    /// Does nothing while closed.
    pub fn refresh_definitions(&mut self, definitions: &[CustomFieldDefinition]) {
        if let Some(draft) = self.draft.as_mut() {
            draft.rejoin_custom_fields(definitions, self.stored_values.as_ref());
        }
    }

    /// Check required fields without submitting.
    pub fn validate(&self) -> EditorResult<ValidationReport> {
        let draft = self.draft.as_ref().ok_or(EditorError::NotEditing)?;
        Ok(ValidationReport::for_draft(draft))
    }

    /// Validate and persist the draft.
    ///
    /// A new record is created under a store-assigned id; an existing one is
    /// overwritten in full. On a store error the editor stays open and the
    /// error is returned.
    pub fn submit<S>(&mut self, store: &S, owner_id: &str) -> EditorResult<SubmitOutcome>
    where
        S: DocumentStore + ?Sized,
    {
        let draft = self.draft_mut()?;
        draft.validating = true;

        let report = ValidationReport::for_draft(draft);
        if !report.is_valid() {
            tracing::debug!(
                missing = report.missing.len(),
                invalid = report.invalid_numbers.len(),
                "submit blocked by validation"
            );
            return Ok(SubmitOutcome::Invalid(report));
        }

        let document = draft.to_document(owner_id);
        let written = match &self.state {
            EditorState::EditingNew => store.create_record(document),
            EditorState::EditingExisting(record_id) => store.overwrite_record(record_id, document),
            EditorState::Closed => return Err(EditorError::NotEditing),
        };

        match written {
            Ok(record) => {
                self.close();
                Ok(SubmitOutcome::Saved(record.id))
            }
            Err(e) => {
                tracing::error!(owner_id, error = %e, "failed to save record");
                Err(e.into())
            }
        }
    }

    /// Close without saving.
    pub fn discard(&mut self) {
        self.close();
    }

    /// Delete the record being edited and close. There is no undo.
    pub fn delete_record<S>(&mut self, store: &S, owner_id: &str) -> EditorResult<bool>
    where
        S: DocumentStore + ?Sized,
    {
        let record_id = match &self.state {
            EditorState::EditingExisting(record_id) => record_id.clone(),
            EditorState::EditingNew => return Err(EditorError::NotExisting),
            EditorState::Closed => return Err(EditorError::NotEditing),
        };

        match store.delete_record(owner_id, &record_id) {
            Ok(deleted) => {
                self.close();
                Ok(deleted)
            }
            Err(e) => {
                tracing::error!(record_id = %record_id, error = %e, "failed to delete record");
                Err(e.into())
            }
        }
    }

    fn close(&mut self) {
        self.state = EditorState::Closed;
        self.draft = None;
        self.stored_values = None;
    }

    fn draft_mut(&mut self) -> EditorResult<&mut Draft> {
        self.draft.as_mut().ok_or(EditorError::NotEditing)
    }

    fn slot_mut(&mut self, index: usize) -> EditorResult<&mut AddressSlot> {
        self.draft_mut()?
            .addresses
            .get_mut(index)
            .ok_or(EditorError::AddressIndex(index))
    }
}
