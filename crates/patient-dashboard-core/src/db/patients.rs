//! Patient record database operations.

use chrono::DateTime;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Address, CustomFields, PatientDocument, PatientRecord, PatientStatus};

const SELECT_COLUMNS: &str = r#"
    SELECT record_id, owner_id, status, first_name, middle_name, last_name,
           date_of_birth, addresses, custom_fields
    FROM patients
"#;

const UPSERT_SQL: &str = r#"
    INSERT INTO patients (
        record_id, owner_id, status, first_name, middle_name, last_name,
        date_of_birth, addresses, custom_fields
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(record_id) DO UPDATE SET
        owner_id = excluded.owner_id,
        status = excluded.status,
        first_name = excluded.first_name,
        middle_name = excluded.middle_name,
        last_name = excluded.last_name,
        date_of_birth = excluded.date_of_birth,
        addresses = excluded.addresses,
        custom_fields = excluded.custom_fields,
        updated_at = datetime('now')
"#;

impl Database {
    /// Insert a new patient record.
    pub fn insert_patient(&self, record: &PatientRecord) -> DbResult<()> {
        let encoded = EncodedDocument::encode(&record.document)?;

        self.conn.execute(
            r#"
            INSERT INTO patients (
                record_id, owner_id, status, first_name, middle_name, last_name,
                date_of_birth, addresses, custom_fields
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.id,
                record.document.owner_id,
                encoded.status,
                record.document.first_name,
                record.document.middle_name,
                record.document.last_name,
                encoded.date_of_birth,
                encoded.addresses,
                encoded.custom_fields,
            ],
        )?;
        Ok(())
    }

    /// Write a record, replacing every field of any existing row with the same id.
    ///
    /// Returns `true` when the row was newly created.
    pub fn upsert_patient(&self, record: &PatientRecord) -> DbResult<bool> {
        let existed = self.patient_exists(&record.id)?;
        let encoded = EncodedDocument::encode(&record.document)?;

        self.conn.execute(
            UPSERT_SQL,
            params![
                record.id,
                record.document.owner_id,
                encoded.status,
                record.document.first_name,
                record.document.middle_name,
                record.document.last_name,
                encoded.date_of_birth,
                encoded.addresses,
                encoded.custom_fields,
            ],
        )?;
        Ok(!existed)
    }

    /// Insert several records in one transaction. Either all land or none do.
    pub fn insert_patients_batch(&self, records: &[PatientRecord]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for record in records {
                let encoded = EncodedDocument::encode(&record.document)?;
                stmt.execute(params![
                    record.id,
                    record.document.owner_id,
                    encoded.status,
                    record.document.first_name,
                    record.document.middle_name,
                    record.document.last_name,
                    encoded.date_of_birth,
                    encoded.addresses,
                    encoded.custom_fields,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Get a patient record by id.
    pub fn get_patient(&self, record_id: &str) -> DbResult<Option<PatientRecord>> {
        self.conn
            .query_row(
                &format!("{} WHERE record_id = ?", SELECT_COLUMNS),
                [record_id],
                RecordRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List every record owned by `owner_id`, in insertion order.
    pub fn list_patients_for_owner(&self, owner_id: &str) -> DbResult<Vec<PatientRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE owner_id = ? ORDER BY rowid", SELECT_COLUMNS))?;

        let rows = stmt.query_map([owner_id], RecordRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// Delete a patient record.
    pub fn delete_patient(&self, record_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE record_id = ?", [record_id])?;
        Ok(rows_affected > 0)
    }

    fn patient_exists(&self, record_id: &str) -> DbResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM patients WHERE record_id = ?",
                [record_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Column values that need encoding before they reach SQLite.
struct EncodedDocument {
    status: &'static str,
    date_of_birth: Option<i64>,
    addresses: String,
    custom_fields: Option<String>,
}

impl EncodedDocument {
    fn encode(doc: &PatientDocument) -> DbResult<Self> {
        Ok(Self {
            status: doc.status.as_str(),
            date_of_birth: doc.date_of_birth.map(|dob| dob.timestamp()),
            addresses: serde_json::to_string(&doc.addresses)?,
            custom_fields: doc
                .custom_fields
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        })
    }
}

/// Intermediate row struct for database mapping.
struct RecordRow {
    record_id: String,
    owner_id: String,
    status: String,
    first_name: String,
    middle_name: String,
    last_name: String,
    date_of_birth: Option<i64>,
    addresses: String,
    custom_fields: Option<String>,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record_id: row.get(0)?,
            owner_id: row.get(1)?,
            status: row.get(2)?,
            first_name: row.get(3)?,
            middle_name: row.get(4)?,
            last_name: row.get(5)?,
            date_of_birth: row.get(6)?,
            addresses: row.get(7)?,
            custom_fields: row.get(8)?,
        })
    }
}

impl TryFrom<RecordRow> for PatientRecord {
    type Error = DbError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let status: PatientStatus = row.status.parse().map_err(DbError::Constraint)?;
        let addresses: Vec<Address> = serde_json::from_str(&row.addresses)?;
        let custom_fields: Option<CustomFields> = row
            .custom_fields
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let date_of_birth = row
            .date_of_birth
            .map(|secs| {
                DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                    DbError::Constraint(format!("Invalid date of birth timestamp: {}", secs))
                })
            })
            .transpose()?;

        Ok(PatientRecord {
            id: row.record_id,
            document: PatientDocument {
                owner_id: row.owner_id,
                status,
                first_name: row.first_name,
                middle_name: row.middle_name,
                last_name: row.last_name,
                date_of_birth,
                addresses,
                custom_fields,
            },
        })
    }
}
