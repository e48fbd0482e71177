//! Grid projection of patient records.
//!
//! Turns stored records into display rows and describes the grid's columns.
//! Rendering, sorting, paging and quick filtering belong to the UI layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{state_abbreviation, stringify_address, PatientRecord, PatientStatus};

/// Page sizes offered by the grid footer.
pub const PAGE_SIZE_OPTIONS: [u32; 4] = [10, 25, 50, 100];

/// Rows per page before the user picks another size.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

pub fn is_page_size_option(size: u32) -> bool {
    PAGE_SIZE_OPTIONS.contains(&size)
}

/// Format a date of birth as `MM/DD/YYYY`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// One grid row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRow {
    pub id: String,
    pub full_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    /// `MM/DD/YYYY`, empty when unknown
    pub date_of_birth: String,
    pub status: PatientStatus,
    /// City of the primary address
    pub city: Option<String>,
    /// Two-letter code of the primary address's state
    pub state: Option<String>,
    pub zipcode: Option<String>,
    /// Compact primary address cell: city, then `ST 12345`
    pub address_preview: Option<String>,
    /// Every address as a multi-line block, primary first
    pub addresses: Vec<String>,
    /// Custom field name and display value pairs
    pub custom_fields: Vec<(String, String)>,
}

impl From<&PatientRecord> for PatientRow {
    fn from(record: &PatientRecord) -> Self {
        let doc = &record.document;
        let primary = doc.primary_address();

        Self {
            id: record.id.clone(),
            full_name: doc.full_name(),
            first_name: doc.first_name.clone(),
            middle_name: doc.middle_name.clone(),
            last_name: doc.last_name.clone(),
            date_of_birth: doc.date_of_birth.as_ref().map(format_date).unwrap_or_default(),
            status: doc.status,
            city: primary.map(|a| a.city.clone()),
            state: primary.map(|a| state_abbreviation(&a.state)),
            zipcode: primary.map(|a| a.zipcode.clone()),
            address_preview: primary.map(|a| {
                format!("{}\n{} {}", a.city, state_abbreviation(&a.state), a.short_zip())
            }),
            addresses: doc.addresses.iter().map(stringify_address).collect(),
            custom_fields: doc
                .custom_fields
                .iter()
                .flatten()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect(),
        }
    }
}

/// Project records into rows, keeping their order.
pub fn project_rows(records: &[PatientRecord]) -> Vec<PatientRow> {
    records.iter().map(PatientRow::from).collect()
}

/// Sizing of a grid column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnWidth {
    Fixed(u32),
    /// Share of the free space, never narrower than `min`
    Flex { weight: u32, min: u32 },
}

/// A grid column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub field: &'static str,
    pub header: &'static str,
    pub width: ColumnWidth,
    /// Hidden until the user shows it from the columns menu
    pub hidden_by_default: bool,
}

impl ColumnDef {
    const fn new(field: &'static str, header: &'static str, width: ColumnWidth) -> Self {
        Self {
            field,
            header,
            width,
            hidden_by_default: false,
        }
    }

    const fn hidden(mut self) -> Self {
        self.hidden_by_default = true;
        self
    }
}

/// Grid columns in display order.
pub fn columns() -> Vec<ColumnDef> {
    use ColumnWidth::{Fixed, Flex};

    vec![
        ColumnDef::new("actions", "", Fixed(100)),
        ColumnDef::new("fullName", "Full Name", Fixed(200)),
        ColumnDef::new("firstName", "First Name", Fixed(130)).hidden(),
        ColumnDef::new("middleName", "Middle Name", Fixed(130)).hidden(),
        ColumnDef::new("lastName", "Last Name", Fixed(130)).hidden(),
        ColumnDef::new("dob", "Date of Birth", Fixed(200)),
        ColumnDef::new("status", "Status", Flex { weight: 1, min: 200 }),
        ColumnDef::new("addresses", "Address", Flex { weight: 2, min: 200 }),
        ColumnDef::new("city", "City", Fixed(130)).hidden(),
        ColumnDef::new("state", "State", Fixed(130)).hidden(),
        ColumnDef::new("zipcode", "Zip Code", Fixed(130)).hidden(),
        ColumnDef::new("customFields", "Custom Fields", Fixed(140)),
    ]
}

/// Maximum width of the dashboard container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableWidth {
    Sm,
    Md,
    #[default]
    Lg,
    Xl,
}

impl TableWidth {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableWidth::Sm => "sm",
            TableWidth::Md => "md",
            TableWidth::Lg => "lg",
            TableWidth::Xl => "xl",
        }
    }

    /// Label shown in the width picker.
    pub fn label(&self) -> &'static str {
        match self {
            TableWidth::Sm => "small",
            TableWidth::Md => "medium",
            TableWidth::Lg => "large",
            TableWidth::Xl => "extra large",
        }
    }
}

impl fmt::Display for TableWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sm" => Ok(TableWidth::Sm),
            "md" => Ok(TableWidth::Md),
            "lg" => Ok(TableWidth::Lg),
            "xl" => Ok(TableWidth::Xl),
            _ => Err(format!("Unknown table width: {}", s)),
        }
    }
}

/// Colour of the status chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusColor {
    Secondary,
    Primary,
    Success,
    Error,
}

impl StatusColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Secondary => "secondary",
            StatusColor::Primary => "primary",
            StatusColor::Success => "success",
            StatusColor::Error => "error",
        }
    }
}

pub fn status_color(status: PatientStatus) -> StatusColor {
    match status {
        PatientStatus::Inquiry => StatusColor::Secondary,
        PatientStatus::Onboarding => StatusColor::Primary,
        PatientStatus::Active => StatusColor::Success,
        PatientStatus::Churned => StatusColor::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, CustomFieldValue, CustomFields, PatientDocument};
    use chrono::TimeZone;

    fn record() -> PatientRecord {
        let mut doc = PatientDocument::new("user-1");
        doc.first_name = "Ada".into();
        doc.last_name = "Lovelace".into();
        doc.status = PatientStatus::Active;
        doc.date_of_birth = Some(Utc.with_ymd_and_hms(1985, 6, 1, 0, 0, 0).unwrap());
        doc.addresses = vec![
            Address::new("1 Main St", "Apt 4", "Columbus", "Ohio", "43004-1234"),
            Address::new("9 Side Rd", "", "Austin", "Texas", "73301"),
        ];
        let mut values = CustomFields::new();
        values.insert("Visit Count".into(), CustomFieldValue::Number(3.0));
        doc.custom_fields = Some(values);
        PatientRecord {
            id: "rec-1".into(),
            document: doc,
        }
    }

    #[test]
    fn test_row_projection() {
        let row = PatientRow::from(&record());
        assert_eq!(row.full_name, "Ada Lovelace");
        assert_eq!(row.date_of_birth, "06/01/1985");
        assert_eq!(row.city.as_deref(), Some("Columbus"));
        assert_eq!(row.state.as_deref(), Some("OH"));
        assert_eq!(row.zipcode.as_deref(), Some("43004-1234"));
        assert_eq!(row.address_preview.as_deref(), Some("Columbus\nOH 43004"));
        assert_eq!(
            row.addresses[0],
            "1 Main St\nApt 4\nColumbus, OH 43004-1234"
        );
        assert_eq!(row.addresses[1], "9 Side Rd\nAustin, TX 73301");
        assert_eq!(
            row.custom_fields,
            vec![("Visit Count".to_string(), "3".to_string())]
        );
    }

    #[test]
    fn test_row_without_optional_data() {
        let record = PatientRecord {
            id: "rec-2".into(),
            document: PatientDocument::new("user-1"),
        };
        let row = PatientRow::from(&record);
        assert_eq!(row.date_of_birth, "");
        assert!(row.city.is_none());
        assert!(row.address_preview.is_none());
        assert!(row.addresses.is_empty());
        assert!(row.custom_fields.is_empty());
    }

    #[test]
    fn test_hidden_columns() {
        let hidden: Vec<_> = columns()
            .into_iter()
            .filter(|c| c.hidden_by_default)
            .map(|c| c.field)
            .collect();
        assert_eq!(
            hidden,
            vec!["firstName", "middleName", "lastName", "city", "state", "zipcode"]
        );
    }

    #[test]
    fn test_page_sizes() {
        assert!(is_page_size_option(DEFAULT_PAGE_SIZE));
        assert!(is_page_size_option(100));
        assert!(!is_page_size_option(20));
    }

    #[test]
    fn test_table_width() {
        assert_eq!(TableWidth::default(), TableWidth::Lg);
        assert_eq!("xl".parse::<TableWidth>().unwrap(), TableWidth::Xl);
        assert!("huge".parse::<TableWidth>().is_err());
        assert_eq!(TableWidth::Md.label(), "medium");
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color(PatientStatus::Inquiry), StatusColor::Secondary);
        assert_eq!(status_color(PatientStatus::Churned).as_str(), "error");
    }
}
