//! SQLite schema definition.

/// Complete database schema for the patient dashboard.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients (one row per record document)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    record_id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Inquiry'
        CHECK (status IN ('Inquiry', 'Onboarding', 'Active', 'Churned')),
    first_name TEXT NOT NULL DEFAULT '',
    middle_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    date_of_birth INTEGER,                       -- unix seconds, midnight UTC
    addresses TEXT NOT NULL DEFAULT '[]',        -- JSON array of Address
    custom_fields TEXT,                          -- JSON object, NULL when absent
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_owner ON patients(owner_id);

-- ============================================================================
-- Custom Field Registries (one document per account, overwritten whole)
-- ============================================================================

CREATE TABLE IF NOT EXISTS custom_field_registries (
    owner_id TEXT PRIMARY KEY,
    definitions TEXT NOT NULL DEFAULT '[]',      -- JSON array of CustomFieldDefinition
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_status_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO patients (record_id, owner_id, status) VALUES ('r1', 'u1', 'Pending')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO patients (record_id, owner_id, status) VALUES ('r1', 'u1', 'Active')",
            [],
        );
        assert!(result.is_ok());
    }
}
