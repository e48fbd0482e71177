//! Editable draft of a patient record.
//!
//! A draft is the working copy the record editor mutates. It is built from a
//! stored record (or from an empty template), joined with the account's
//! custom field definitions, and converted back into a [`PatientDocument`]
//! on submit.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::address::Address;
use super::custom_field::CustomFieldDefinition;
use super::patient::{CustomFieldValue, CustomFields, PatientDocument, PatientRecord, PatientStatus};

/// An address inside a draft, with its own edit state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AddressSlot {
    /// Last committed value (what gets persisted)
    pub address: Address,
    /// Whether the address card is open for editing
    pub editing: bool,
    /// Local copy being edited, present while `editing`
    pub pending: Option<Address>,
    /// Whether missing lines of the pending copy should be flagged
    pub validating: bool,
}

impl AddressSlot {
    /// A committed, closed slot.
    pub fn committed(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// An empty slot already open for editing.
    pub fn blank_editing() -> Self {
        Self {
            address: Address::default(),
            editing: true,
            pending: Some(Address::default()),
            validating: false,
        }
    }
}

/// A custom field definition paired with the value being edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomFieldEntry {
    pub definition: CustomFieldDefinition,
    /// `None` means the field was never set
    pub value: Option<CustomFieldValue>,
}

/// Mutable working copy of a patient record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    pub status: PatientStatus,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub addresses: Vec<AddressSlot>,
    pub custom_fields: Vec<CustomFieldEntry>,
    /// Set by the first submit attempt; turns on inline error display
    pub validating: bool,
}

impl Draft {
    /// Empty template for a new record: one open address, status Inquiry.
    pub fn initial(definitions: &[CustomFieldDefinition]) -> Self {
        Self {
            status: PatientStatus::Inquiry,
            addresses: vec![AddressSlot::blank_editing()],
            custom_fields: join_custom_fields(definitions, None),
            ..Self::default()
        }
    }

    /// Build a draft from a stored record.
    ///
    /// Custom field entries take their value from
    /// `record.custom_fields[definition.name]` when present.
    pub fn from_record(record: &PatientRecord, definitions: &[CustomFieldDefinition]) -> Self {
        Self::from_document(&record.document, definitions)
    }

    /// Build a draft from persisted content.
    pub fn from_document(doc: &PatientDocument, definitions: &[CustomFieldDefinition]) -> Self {
        Self {
            status: doc.status,
            first_name: doc.first_name.clone(),
            middle_name: doc.middle_name.clone(),
            last_name: doc.last_name.clone(),
            date_of_birth: doc.date_of_birth.map(|dob| dob.date_naive()),
            addresses: doc
                .addresses
                .iter()
                .cloned()
                .map(AddressSlot::committed)
                .collect(),
            custom_fields: join_custom_fields(definitions, doc.custom_fields.as_ref()),
            validating: false,
        }
    }

    /// Committed addresses, in order.
    pub fn committed_addresses(&self) -> Vec<Address> {
        self.addresses.iter().map(|slot| slot.address.clone()).collect()
    }

    /// Values for every entry with a defined value, coerced to the
    /// definition's type. `None` when nothing is defined.
    pub fn custom_field_values(&self) -> Option<CustomFields> {
        let values: CustomFields = self
            .custom_fields
            .iter()
            .filter_map(|entry| {
                let value = entry.value.as_ref()?;
                let coerced = entry.definition.coerce(value)?;
                Some((entry.definition.name.clone(), coerced))
            })
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }

    /// Convert into the document that gets written to the store.
    pub fn to_document(&self, owner_id: &str) -> PatientDocument {
        PatientDocument {
            owner_id: owner_id.to_string(),
            status: self.status,
            first_name: self.first_name.clone(),
            middle_name: self.middle_name.clone(),
            last_name: self.last_name.clone(),
            date_of_birth: self
                .date_of_birth
                .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))),
            addresses: self.committed_addresses(),
            custom_fields: self.custom_field_values(),
        }
    }

    /// Re-run the custom field join against a new registry.
    ///
    /// Values already entered for keys that still exist are kept; new
    /// definitions fall back to `fallback` (the stored record's values).
    pub fn rejoin_custom_fields(
        &mut self,
        definitions: &[CustomFieldDefinition],
        fallback: Option<&CustomFields>,
    ) {
        let mut joined = join_custom_fields(definitions, fallback);
        for entry in &mut joined {
            if let Some(existing) = self
                .custom_fields
                .iter()
                .find(|old| old.definition.key == entry.definition.key)
            {
                entry.value = existing.value.clone();
            }
        }
        self.custom_fields = joined;
    }
}

fn join_custom_fields(
    definitions: &[CustomFieldDefinition],
    values: Option<&CustomFields>,
) -> Vec<CustomFieldEntry> {
    definitions
        .iter()
        .map(|definition| CustomFieldEntry {
            definition: definition.clone(),
            value: values.and_then(|v| v.get(&definition.name)).cloned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValueType;

    fn definitions() -> Vec<CustomFieldDefinition> {
        vec![
            CustomFieldDefinition::new("Insurer", ValueType::String),
            CustomFieldDefinition::new("Visit Count", ValueType::Number),
        ]
    }

    #[test]
    fn test_initial_draft() {
        let draft = Draft::initial(&definitions());
        assert_eq!(draft.status, PatientStatus::Inquiry);
        assert_eq!(draft.addresses.len(), 1);
        assert!(draft.addresses[0].editing);
        assert!(draft.date_of_birth.is_none());
        assert!(!draft.validating);
        assert_eq!(draft.custom_fields.len(), 2);
        assert!(draft.custom_fields.iter().all(|e| e.value.is_none()));
    }

    #[test]
    fn test_from_record_zero_values() {
        let record = PatientRecord::new(PatientDocument::new("user-1"));
        let draft = Draft::from_record(&record, &[]);
        assert_eq!(draft.first_name, "");
        assert!(draft.date_of_birth.is_none());
        assert!(draft.addresses.is_empty());
        assert!(draft.custom_fields.is_empty());
    }

    #[test]
    fn test_from_record_joins_by_display_name() {
        let mut doc = PatientDocument::new("user-1");
        let mut values = CustomFields::new();
        values.insert("Visit Count".into(), CustomFieldValue::Number(4.0));
        values.insert("Retired Field".into(), CustomFieldValue::Text("x".into()));
        doc.custom_fields = Some(values);

        let draft = Draft::from_document(&doc, &definitions());
        assert_eq!(draft.custom_fields[0].value, None);
        assert_eq!(
            draft.custom_fields[1].value,
            Some(CustomFieldValue::Number(4.0))
        );
    }

    #[test]
    fn test_to_document_only_defined_values() {
        let mut draft = Draft::initial(&definitions());
        draft.custom_fields[1].value = Some(CustomFieldValue::Text("7".into()));

        let doc = draft.to_document("user-1");
        let values = doc.custom_fields.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["Visit Count"], CustomFieldValue::Number(7.0));
    }

    #[test]
    fn test_to_document_without_values_omits_custom_fields() {
        let draft = Draft::initial(&definitions());
        assert!(draft.to_document("user-1").custom_fields.is_none());
    }

    #[test]
    fn test_date_of_birth_midnight_utc() {
        let mut draft = Draft::initial(&[]);
        draft.date_of_birth = NaiveDate::from_ymd_opt(1990, 4, 12);
        let doc = draft.to_document("user-1");
        assert_eq!(
            doc.date_of_birth.unwrap().to_rfc3339(),
            "1990-04-12T00:00:00+00:00"
        );
        let back = Draft::from_document(&doc, &[]);
        assert_eq!(back.date_of_birth, draft.date_of_birth);
    }

    #[test]
    fn test_rejoin_keeps_typed_values() {
        let mut draft = Draft::initial(&definitions());
        draft.custom_fields[0].value = Some(CustomFieldValue::Text("Acme".into()));

        let mut updated = definitions();
        updated.remove(1);
        updated.push(CustomFieldDefinition::new("Referral", ValueType::String));
        draft.rejoin_custom_fields(&updated, None);

        assert_eq!(draft.custom_fields.len(), 2);
        assert_eq!(draft.custom_fields[0].definition.key, "Insurer");
        assert_eq!(
            draft.custom_fields[0].value,
            Some(CustomFieldValue::Text("Acme".into()))
        );
        assert_eq!(draft.custom_fields[1].definition.key, "Referral");
        assert_eq!(draft.custom_fields[1].value, None);
    }
}
