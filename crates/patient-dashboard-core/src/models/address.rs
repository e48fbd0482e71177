//! Postal address model and formatting helpers.

use serde::{Deserialize, Serialize};

/// A postal address attached to a patient record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// Street line (required on submit)
    pub line1: String,
    /// Apartment, suite, unit (optional)
    #[serde(default)]
    pub line2: String,
    /// City (required on submit)
    pub city: String,
    /// State or territory, usually the full name (required on submit)
    pub state: String,
    /// Postal code (required on submit)
    pub zipcode: String,
}

/// One of the editable lines of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressField {
    Line1,
    Line2,
    City,
    State,
    Zipcode,
}

impl AddressField {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressField::Line1 => "line1",
            AddressField::Line2 => "line2",
            AddressField::City => "city",
            AddressField::State => "state",
            AddressField::Zipcode => "zipcode",
        }
    }
}

impl std::str::FromStr for AddressField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line1" => Ok(AddressField::Line1),
            "line2" => Ok(AddressField::Line2),
            "city" => Ok(AddressField::City),
            "state" => Ok(AddressField::State),
            "zipcode" => Ok(AddressField::Zipcode),
            _ => Err(format!("Unknown address field: {}", s)),
        }
    }
}

impl Address {
    /// Create an address with every line set.
    pub fn new(
        line1: impl Into<String>,
        line2: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zipcode: impl Into<String>,
    ) -> Self {
        Self {
            line1: line1.into(),
            line2: line2.into(),
            city: city.into(),
            state: state.into(),
            zipcode: zipcode.into(),
        }
    }

    /// Check that the four required lines are filled in.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Required lines that are still empty, in display order.
    pub fn missing_fields(&self) -> Vec<AddressField> {
        let mut missing = Vec::new();
        if self.line1.is_empty() {
            missing.push(AddressField::Line1);
        }
        if self.city.is_empty() {
            missing.push(AddressField::City);
        }
        if self.state.is_empty() {
            missing.push(AddressField::State);
        }
        if self.zipcode.is_empty() {
            missing.push(AddressField::Zipcode);
        }
        missing
    }

    /// Read a single line.
    pub fn get(&self, field: AddressField) -> &str {
        match field {
            AddressField::Line1 => &self.line1,
            AddressField::Line2 => &self.line2,
            AddressField::City => &self.city,
            AddressField::State => &self.state,
            AddressField::Zipcode => &self.zipcode,
        }
    }

    /// Replace a single line.
    pub fn set(&mut self, field: AddressField, value: String) {
        match field {
            AddressField::Line1 => self.line1 = value,
            AddressField::Line2 => self.line2 = value,
            AddressField::City => self.city = value,
            AddressField::State => self.state = value,
            AddressField::Zipcode => self.zipcode = value,
        }
    }

    /// First five characters of the zipcode (ZIP+4 codes are shortened).
    pub fn short_zip(&self) -> &str {
        match self.zipcode.char_indices().nth(5) {
            Some((idx, _)) => &self.zipcode[..idx],
            None => &self.zipcode,
        }
    }

    /// Render as display lines: street, optional unit, then `City, ST zip`.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = vec![self.line1.clone()];
        if !self.line2.trim().is_empty() {
            lines.push(self.line2.clone());
        }
        lines.push(format!(
            "{}, {} {}",
            self.city,
            state_abbreviation(&self.state),
            self.zipcode
        ));
        lines
    }
}

/// Render an address as a newline-separated block.
pub fn stringify_address(address: &Address) -> String {
    address.to_lines().join("\n")
}

/// Parse a generated address string.
///
/// Expected shape: `line1, line2, zipcode, city, state, country`.
/// Anything with a different component count is rejected.
pub fn parse_address(raw: &str) -> Option<Address> {
    let components: Vec<&str> = raw.split(',').map(str::trim).collect();
    if components.len() != 6 {
        tracing::warn!(address = raw, "address in wrong format");
        return None;
    }

    Some(Address {
        line1: components[0].to_string(),
        line2: components[1].to_string(),
        city: components[3].to_string(),
        state: components[4].to_string(),
        zipcode: components[2].to_string(),
    })
}

/// US states, DC and inhabited territories.
const STATE_CODES: &[(&str, &str)] = &[
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("District of Columbia", "DC"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
    ("American Samoa", "AS"),
    ("Guam", "GU"),
    ("Northern Mariana Islands", "MP"),
    ("Puerto Rico", "PR"),
    ("U.S. Virgin Islands", "VI"),
];

/// Abbreviate a state name (`"Ohio"` -> `"OH"`).
///
/// Matching ignores case and surrounding whitespace. Unknown names are
/// returned unchanged.
pub fn state_abbreviation(state: &str) -> String {
    let trimmed = state.trim();
    STATE_CODES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        .map(|(_, code)| (*code).to_string())
        .unwrap_or_else(|| state.to_string())
}
