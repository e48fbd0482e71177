//! SQLite-backed store with live feeds.
//!
//! Every write runs in one database lock scope together with its ownership
//! check, the bump of the store revision and the read of the snapshot to
//! publish. Snapshots are therefore versioned in commit order and the feed
//! hub can drop any that arrive late.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    DocumentStore, FeedHub, LiveFeeds, RecordsCallback, RegistryCallback, StoreError,
    StoreResult, Subscription,
};
use crate::db::{Database, DbResult};
use crate::models::{CustomFieldDefinition, PatientDocument, PatientRecord};

/// Document store that pushes snapshots to subscribers after every write.
pub struct LiveStore {
    db: Mutex<Database>,
    /// Bumped under the database lock on every write
    revision: AtomicU64,
    records: FeedHub<Vec<PatientRecord>>,
    registries: FeedHub<Vec<CustomFieldDefinition>>,
}

/// Record snapshots captured by a write, one per affected owner.
type RecordSnapshots = Vec<(String, Vec<PatientRecord>)>;

impl LiveStore {
    /// Wrap an open database.
    pub fn new(db: Database) -> Self {
        Self {
            db: Mutex::new(db),
            revision: AtomicU64::new(0),
            records: FeedHub::new(),
            registries: FeedHub::new(),
        }
    }

    /// Open a store backed by a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open a store backed by an in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn lock_db(&self) -> StoreResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> DbResult<T>) -> StoreResult<T> {
        let db = self.lock_db()?;
        Ok(f(&db)?)
    }

    /// Run a record write, then publish fresh snapshots for `owners`.
    ///
    /// The snapshots are read before the database lock is released. A
    /// failed snapshot read is logged, since the write itself succeeded.
    fn commit_records<T>(
        &self,
        owners: &[&str],
        write: impl FnOnce(&Database) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let (result, version, snapshots) = {
            let db = self.lock_db()?;
            let result = write(&db)?;
            let version = self.revision.fetch_add(1, Ordering::SeqCst) + 1;

            let mut snapshots: RecordSnapshots = Vec::new();
            for &owner_id in owners {
                if self.records.listener_count(owner_id) == 0 {
                    continue;
                }
                match db.list_patients_for_owner(owner_id) {
                    Ok(snapshot) => snapshots.push((owner_id.to_string(), snapshot)),
                    Err(e) => {
                        tracing::error!(owner_id, error = %e, "failed to read record snapshot")
                    }
                }
            }
            (result, version, snapshots)
        };

        for (owner_id, snapshot) in snapshots {
            self.records.publish(&owner_id, version, snapshot);
        }
        Ok(result)
    }

    /// Read a value together with the revision it belongs to.
    fn read_versioned<T>(
        &self,
        read: impl FnOnce(&Database) -> StoreResult<T>,
    ) -> StoreResult<(u64, T)> {
        let db = self.lock_db()?;
        let value = read(&db)?;
        Ok((self.revision.load(Ordering::SeqCst), value))
    }
}

/// Check that `record_id`, if it exists, belongs to `owner_id`.
///
/// Returns whether the record exists.
fn ensure_owner(db: &Database, record_id: &str, owner_id: &str) -> StoreResult<bool> {
    match db.get_patient(record_id)? {
        Some(existing) if existing.document.owner_id != owner_id => {
            Err(StoreError::PermissionDenied(format!(
                "record {} belongs to another account",
                record_id
            )))
        }
        Some(_) => Ok(true),
        None => Ok(false),
    }
}

impl DocumentStore for LiveStore {
    fn create_record(&self, document: PatientDocument) -> StoreResult<PatientRecord> {
        let record = PatientRecord::new(document);
        self.commit_records(&[record.document.owner_id.as_str()], |db| {
            Ok(db.insert_patient(&record)?)
        })?;
        tracing::info!(record_id = %record.id, owner_id = %record.document.owner_id, "record created");
        Ok(record)
    }

    fn overwrite_record(
        &self,
        record_id: &str,
        document: PatientDocument,
    ) -> StoreResult<PatientRecord> {
        let record = PatientRecord {
            id: record_id.to_string(),
            document,
        };
        let created = self.commit_records(&[record.document.owner_id.as_str()], |db| {
            ensure_owner(db, record_id, &record.document.owner_id)?;
            Ok(db.upsert_patient(&record)?)
        })?;
        tracing::info!(record_id, created, "record written");
        Ok(record)
    }

    fn delete_record(&self, owner_id: &str, record_id: &str) -> StoreResult<bool> {
        let deleted = self.commit_records(&[owner_id], |db| {
            if !ensure_owner(db, record_id, owner_id)? {
                return Ok(false);
            }
            Ok(db.delete_patient(record_id)?)
        })?;

        if deleted {
            tracing::info!(record_id, owner_id, "record deleted");
        } else {
            tracing::warn!(record_id, "delete of missing record");
        }
        Ok(deleted)
    }

    fn list_records(&self, owner_id: &str) -> StoreResult<Vec<PatientRecord>> {
        self.with_db(|db| db.list_patients_for_owner(owner_id))
    }

    fn load_registry(&self, owner_id: &str) -> StoreResult<Vec<CustomFieldDefinition>> {
        Ok(self
            .with_db(|db| db.get_registry(owner_id))?
            .unwrap_or_default())
    }

    fn save_registry(
        &self,
        owner_id: &str,
        definitions: &[CustomFieldDefinition],
    ) -> StoreResult<()> {
        let version = {
            let db = self.lock_db()?;
            db.put_registry(owner_id, definitions)?;
            self.revision.fetch_add(1, Ordering::SeqCst) + 1
        };
        tracing::info!(owner_id, fields = definitions.len(), "custom field registry saved");

        self.registries.publish(owner_id, version, definitions.to_vec());
        Ok(())
    }

    fn create_records_batch(
        &self,
        documents: Vec<PatientDocument>,
    ) -> StoreResult<Vec<PatientRecord>> {
        let records: Vec<PatientRecord> = documents.into_iter().map(PatientRecord::new).collect();

        let mut owners: Vec<&str> = records
            .iter()
            .map(|record| record.document.owner_id.as_str())
            .collect();
        owners.sort_unstable();
        owners.dedup();

        self.commit_records(&owners, |db| Ok(db.insert_patients_batch(&records)?))?;
        tracing::info!(count = records.len(), "record batch committed");
        Ok(records)
    }
}

impl LiveFeeds for LiveStore {
    fn subscribe_records(
        &self,
        owner_id: &str,
        callback: RecordsCallback,
    ) -> StoreResult<Subscription> {
        self.records.subscribe_with(owner_id, callback, || {
            self.read_versioned(|db| Ok(db.list_patients_for_owner(owner_id)?))
        })
    }

    fn subscribe_registry(
        &self,
        owner_id: &str,
        callback: RegistryCallback,
    ) -> StoreResult<Subscription> {
        self.registries.subscribe_with(owner_id, callback, || {
            self.read_versioned(|db| Ok(db.get_registry(owner_id)?.unwrap_or_default()))
        })
    }
}
