//! Document store seam.
//!
//! The editor, registry and collection view talk to storage only through
//! [`DocumentStore`] and [`LiveFeeds`]. [`LiveStore`] implements both on top
//! of the SQLite [`Database`](crate::db::Database).
//!
//! Every write replaces whole documents. There is no partial patching and
//! no cross-document transaction between records and registries; the last
//! write wins.

mod feed;
mod live;

pub use feed::*;
pub use live::*;

use thiserror::Error;

use crate::db::DbError;
use crate::models::{CustomFieldDefinition, PatientDocument, PatientRecord};

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Record and registry persistence.
pub trait DocumentStore: Send + Sync {
    /// Create a record under a new store-assigned id.
    fn create_record(&self, document: PatientDocument) -> StoreResult<PatientRecord>;

    /// Create or fully replace the record with `record_id`.
    fn overwrite_record(
        &self,
        record_id: &str,
        document: PatientDocument,
    ) -> StoreResult<PatientRecord>;

    /// Remove a record. Returns `false` when it did not exist.
    fn delete_record(&self, owner_id: &str, record_id: &str) -> StoreResult<bool>;

    /// All records owned by `owner_id`.
    fn list_records(&self, owner_id: &str) -> StoreResult<Vec<PatientRecord>>;

    /// The account's custom field definitions, empty when none were saved.
    fn load_registry(&self, owner_id: &str) -> StoreResult<Vec<CustomFieldDefinition>>;

    /// Replace the account's registry document.
    fn save_registry(
        &self,
        owner_id: &str,
        definitions: &[CustomFieldDefinition],
    ) -> StoreResult<()>;

    /// Create several records in one batch.
    fn create_records_batch(
        &self,
        documents: Vec<PatientDocument>,
    ) -> StoreResult<Vec<PatientRecord>>;
}

/// Callback for record snapshots.
pub type RecordsCallback = Box<dyn Fn(&Vec<PatientRecord>) + Send + Sync>;

/// Callback for registry snapshots.
pub type RegistryCallback = Box<dyn Fn(&Vec<CustomFieldDefinition>) + Send + Sync>;

/// Live queries over a [`DocumentStore`].
///
/// Both subscriptions deliver the current snapshot right away and then a
/// full snapshot after every change to the account's documents.
pub trait LiveFeeds: DocumentStore {
    fn subscribe_records(
        &self,
        owner_id: &str,
        callback: RecordsCallback,
    ) -> StoreResult<Subscription>;

    fn subscribe_registry(
        &self,
        owner_id: &str,
        callback: RegistryCallback,
    ) -> StoreResult<Subscription>;
}
