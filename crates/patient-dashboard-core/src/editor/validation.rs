//! Required-field checks for a record draft.

use serde::{Deserialize, Serialize};

use crate::models::{AddressField, Draft};

/// A required part of the record that is not filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingField {
    FirstName,
    LastName,
    DateOfBirth,
    /// The committed primary address lacks these lines
    PrimaryAddress(Vec<AddressField>),
}

/// Result of checking a draft before submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub missing: Vec<MissingField>,
    /// Keys of number fields holding text that is not a number
    #[serde(default)]
    pub invalid_numbers: Vec<String>,
}

impl ValidationReport {
    /// Check first name, last name, date of birth and the primary address.
    ///
    /// Only the committed value of address 0 counts; an address card still
    /// open for editing has not been accepted yet. Middle name, secondary
    /// addresses and custom fields are optional, but a custom field that is
    /// filled in must hold a value of its type.
    pub fn for_draft(draft: &Draft) -> Self {
        let mut missing = Vec::new();

        if draft.first_name.is_empty() {
            missing.push(MissingField::FirstName);
        }
        if draft.last_name.is_empty() {
            missing.push(MissingField::LastName);
        }
        if draft.date_of_birth.is_none() {
            missing.push(MissingField::DateOfBirth);
        }

        let address_gaps = match draft.addresses.first() {
            Some(slot) => slot.address.missing_fields(),
            None => vec![
                AddressField::Line1,
                AddressField::City,
                AddressField::State,
                AddressField::Zipcode,
            ],
        };
        if !address_gaps.is_empty() {
            missing.push(MissingField::PrimaryAddress(address_gaps));
        }

        let invalid_numbers = draft
            .custom_fields
            .iter()
            .filter(|entry| {
                entry
                    .value
                    .as_ref()
                    .is_some_and(|value| !entry.definition.accepts(value))
            })
            .map(|entry| entry.definition.key.clone())
            .collect();

        Self {
            missing,
            invalid_numbers,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.invalid_numbers.is_empty()
    }

    pub fn is_missing(&self, field: &MissingField) -> bool {
        self.missing.contains(field)
    }

    /// Whether any line of the primary address is flagged.
    pub fn primary_address_incomplete(&self) -> bool {
        self.missing
            .iter()
            .any(|field| matches!(field, MissingField::PrimaryAddress(_)))
    }
}
