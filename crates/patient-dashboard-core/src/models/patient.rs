//! Patient record models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::Address;

/// Where a patient sits in the intake pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PatientStatus {
    /// First contact, nothing scheduled yet
    #[default]
    Inquiry,
    /// Paperwork and scheduling in progress
    Onboarding,
    /// Receiving care
    Active,
    /// No longer a patient
    Churned,
}

impl PatientStatus {
    /// All statuses in pipeline order.
    pub const ALL: [PatientStatus; 4] = [
        PatientStatus::Inquiry,
        PatientStatus::Onboarding,
        PatientStatus::Active,
        PatientStatus::Churned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Inquiry => "Inquiry",
            PatientStatus::Onboarding => "Onboarding",
            PatientStatus::Active => "Active",
            PatientStatus::Churned => "Churned",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatientStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown patient status: {}", s))
    }
}

/// Value stored for a custom field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CustomFieldValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for CustomFieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomFieldValue::Number(n) => write!(f, "{}", n),
            CustomFieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Custom field values keyed by field name.
pub type CustomFields = BTreeMap<String, CustomFieldValue>;

/// Persisted content of a patient record (everything except the store id).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientDocument {
    /// Account that owns the record
    pub owner_id: String,
    /// Intake status
    pub status: PatientStatus,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub last_name: String,
    /// Date of birth, stored as midnight UTC
    pub date_of_birth: Option<DateTime<Utc>>,
    /// Addresses, index 0 is the primary address
    #[serde(default)]
    pub addresses: Vec<Address>,
    /// Values for user-defined fields, absent when none are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<CustomFields>,
}

/// A patient record as held by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    /// Store-assigned id
    pub id: String,
    #[serde(flatten)]
    pub document: PatientDocument,
}

impl PatientDocument {
    /// Create an empty document owned by `owner_id`.
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            ..Self::default()
        }
    }

    /// `first middle last`, skipping empty parts.
    pub fn full_name(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The primary (first) address, if any.
    pub fn primary_address(&self) -> Option<&Address> {
        self.addresses.first()
    }
}

impl PatientRecord {
    /// Wrap a document under a fresh id.
    pub fn new(document: PatientDocument) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in PatientStatus::ALL {
            assert_eq!(status.to_string().parse::<PatientStatus>().unwrap(), status);
        }
        assert!("Pending".parse::<PatientStatus>().is_err());
        assert_eq!(PatientStatus::default(), PatientStatus::Inquiry);
    }

    #[test]
    fn test_full_name_skips_blank_middle() {
        let mut doc = PatientDocument::new("user-1");
        doc.first_name = "Ada".into();
        doc.last_name = "Lovelace".into();
        assert_eq!(doc.full_name(), "Ada Lovelace");

        doc.middle_name = "King".into();
        assert_eq!(doc.full_name(), "Ada King Lovelace");
    }

    #[test]
    fn test_custom_fields_omitted_when_absent() {
        let record = PatientRecord::new(PatientDocument::new("user-1"));
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("custom_fields").is_none());
        assert_eq!(json["owner_id"], "user-1");
        assert_eq!(record.id.len(), 36);
    }

    #[test]
    fn test_custom_field_value_untagged() {
        let values: CustomFields =
            serde_json::from_str(r#"{"Insurer": "Acme", "Visits": 3}"#).unwrap();
        assert_eq!(values["Insurer"], CustomFieldValue::Text("Acme".into()));
        assert_eq!(values["Visits"], CustomFieldValue::Number(3.0));
        assert_eq!(values["Visits"].to_string(), "3");
    }
}
