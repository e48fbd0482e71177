//! User-defined custom field definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::patient::CustomFieldValue;

/// Type a custom field value is stored as.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Number,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => f.write_str("string"),
            ValueType::Number => f.write_str("number"),
        }
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(ValueType::String),
            "number" => Ok(ValueType::Number),
            _ => Err(format!("Unknown value type: {}", s)),
        }
    }
}

/// One entry of an account's custom field registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomFieldDefinition {
    /// Storage key: `name` with whitespace removed
    pub key: String,
    /// Display name, also the key into a record's custom field values
    pub name: String,
    /// How values are coerced on save
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

impl CustomFieldDefinition {
    /// Create a definition, deriving its key from the name.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        Self {
            key: storage_key(&name),
            name,
            value_type,
        }
    }

    /// Whether `value` can be saved under this definition.
    ///
    /// Blank input is accepted and simply not stored. Text in a number
    /// field must parse as a finite number.
    pub fn accepts(&self, value: &CustomFieldValue) -> bool {
        match (self.value_type, value) {
            (ValueType::String, _) => true,
            (ValueType::Number, CustomFieldValue::Number(n)) => n.is_finite(),
            (ValueType::Number, CustomFieldValue::Text(s)) => {
                let trimmed = s.trim();
                trimmed.is_empty() || trimmed.parse::<f64>().is_ok_and(f64::is_finite)
            }
        }
    }

    /// Coerce a raw value to this definition's type.
    ///
    /// Returns `None` for blank input and for numbers that do not parse.
    pub fn coerce(&self, value: &CustomFieldValue) -> Option<CustomFieldValue> {
        match (self.value_type, value) {
            (ValueType::String, CustomFieldValue::Text(s)) => {
                Some(CustomFieldValue::Text(s.clone()))
            }
            (ValueType::String, CustomFieldValue::Number(n)) => {
                Some(CustomFieldValue::Text(n.to_string()))
            }
            (ValueType::Number, CustomFieldValue::Number(n)) => {
                n.is_finite().then_some(CustomFieldValue::Number(*n))
            }
            (ValueType::Number, CustomFieldValue::Text(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => Some(CustomFieldValue::Number(n)),
                    _ => {
                        tracing::warn!(field = %self.name, value = %s, "dropping non-numeric custom field value");
                        None
                    }
                }
            }
        }
    }
}

/// Derive a storage key by removing every whitespace character.
pub fn storage_key(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}
