//! Custom field registry database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::CustomFieldDefinition;

impl Database {
    /// Load an account's custom field definitions.
    ///
    /// Returns `None` when no registry document has been written yet.
    pub fn get_registry(&self, owner_id: &str) -> DbResult<Option<Vec<CustomFieldDefinition>>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT definitions FROM custom_field_registries WHERE owner_id = ?",
                [owner_id],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(Into::into)
    }

    /// Replace an account's registry document.
    pub fn put_registry(
        &self,
        owner_id: &str,
        definitions: &[CustomFieldDefinition],
    ) -> DbResult<()> {
        let json = serde_json::to_string(definitions)?;
        self.conn.execute(
            r#"
            INSERT INTO custom_field_registries (owner_id, definitions)
            VALUES (?1, ?2)
            ON CONFLICT(owner_id) DO UPDATE SET
                definitions = excluded.definitions,
                updated_at = datetime('now')
            "#,
            params![owner_id, json],
        )?;
        Ok(())
    }
}
