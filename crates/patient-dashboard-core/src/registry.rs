//! Custom field registry editing.
//!
//! The registry is one ordered list of [`CustomFieldDefinition`]s per
//! account. [`RegistryEditor`] is the working buffer behind the column
//! management screen: rows are edited locally and the whole list is written
//! back in a single overwrite on submit.
//!
//! Deleting or renaming a definition never touches stored records. Values
//! saved under an old name simply stop being shown.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{storage_key, CustomFieldDefinition, ValueType};
use crate::store::{DocumentStore, StoreError};

/// Registry errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Row {0} has no name")]
    BlankName(usize),

    #[error("Row {0} has an empty key")]
    BlankKey(usize),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("No row at index {0}")]
    RowIndex(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// A definition row in the editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EditableField {
    pub definition: CustomFieldDefinition,
    /// Whether the row's name and type inputs are unlocked
    pub allow_edit: bool,
}

/// Working copy of an account's custom field registry.
#[derive(Debug, Clone, Default)]
pub struct RegistryEditor {
    rows: Vec<EditableField>,
}

impl RegistryEditor {
    /// Start from the saved definitions, all rows locked.
    pub fn new(definitions: &[CustomFieldDefinition]) -> Self {
        let mut editor = Self::default();
        editor.reset(definitions);
        editor
    }

    pub fn rows(&self) -> &[EditableField] {
        &self.rows
    }

    /// Discard local edits and reload from `definitions`.
    pub fn reset(&mut self, definitions: &[CustomFieldDefinition]) {
        self.rows = definitions
            .iter()
            .cloned()
            .map(|definition| EditableField {
                definition,
                allow_edit: false,
            })
            .collect();
    }

    /// Append an empty, unlocked row. Returns its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(EditableField {
            definition: CustomFieldDefinition::default(),
            allow_edit: true,
        });
        self.rows.len() - 1
    }

    /// Unlock a saved row for editing.
    pub fn allow_edit(&mut self, index: usize) -> RegistryResult<()> {
        self.row_mut(index)?.allow_edit = true;
        Ok(())
    }

    /// Change a row's display name. The key follows the name.
    pub fn rename(&mut self, index: usize, name: &str) -> RegistryResult<()> {
        let row = self.row_mut(index)?;
        row.definition.key = storage_key(name);
        row.definition.name = name.to_string();
        Ok(())
    }

    pub fn set_value_type(&mut self, index: usize, value_type: ValueType) -> RegistryResult<()> {
        self.row_mut(index)?.definition.value_type = value_type;
        Ok(())
    }

    /// Drop a row from the buffer. Nothing is written until submit.
    pub fn remove(&mut self, index: usize) -> RegistryResult<CustomFieldDefinition> {
        if index >= self.rows.len() {
            return Err(RegistryError::RowIndex(index));
        }
        Ok(self.rows.remove(index).definition)
    }

    /// The definitions as they would be saved.
    pub fn definitions(&self) -> Vec<CustomFieldDefinition> {
        self.rows.iter().map(|row| row.definition.clone()).collect()
    }

    /// Check that every row has a name, a non-empty key and a unique key.
    pub fn validate(&self) -> RegistryResult<()> {
        let mut seen = HashSet::new();
        for (index, row) in self.rows.iter().enumerate() {
            let definition = &row.definition;
            if definition.name.trim().is_empty() {
                return Err(RegistryError::BlankName(index));
            }
            if definition.key.is_empty() {
                return Err(RegistryError::BlankKey(index));
            }
            if !seen.insert(definition.key.as_str()) {
                return Err(RegistryError::DuplicateKey(definition.key.clone()));
            }
        }
        Ok(())
    }

    /// Validate, then overwrite the account's registry document.
    ///
    /// On success every row is locked again. On failure the buffer is left
    /// as it was so the user can fix it.
    pub fn submit<S>(
        &mut self,
        store: &S,
        owner_id: &str,
    ) -> RegistryResult<Vec<CustomFieldDefinition>>
    where
        S: DocumentStore + ?Sized,
    {
        self.validate()?;

        let definitions = self.definitions();
        if let Err(e) = store.save_registry(owner_id, &definitions) {
            tracing::error!(owner_id, error = %e, "failed to save custom field registry");
            return Err(e.into());
        }

        for row in &mut self.rows {
            row.allow_edit = false;
        }
        Ok(definitions)
    }

    fn row_mut(&mut self, index: usize) -> RegistryResult<&mut EditableField> {
        self.rows.get_mut(index).ok_or(RegistryError::RowIndex(index))
    }
}
