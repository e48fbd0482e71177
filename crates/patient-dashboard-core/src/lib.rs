//! Patient Dashboard Core Library
//!
//! Per-account patient record management: a live grid of records, a draft
//! editor with field-level validation, and user-defined custom fields.
//!
//! # Architecture
//!
//! ```text
//!   IdentityProvider ── sign in ──► uid
//!                                    │
//!          ┌─────────────────────────┼──────────────────────────┐
//!          │                         │                          │
//!          ▼                         ▼                          ▼
//!   LiveCollectionView         RecordEditor               RegistryEditor
//!   (records + registry   (Closed / EditingNew /      (custom field rows,
//!    feeds, grid rows)      EditingExisting(id))        whole-list save)
//!          ▲                         │                          │
//!          │ snapshots               │ create / overwrite /     │ save
//!          │                         │ delete                   │
//!          │                         ▼                          ▼
//!          └──────────────── LiveStore (DocumentStore + LiveFeeds)
//!                                    │
//!                                    ▼
//!                              SQLite Database
//! ```
//!
//! # Core Principle
//!
//! **The store is the single source of truth.** Every write goes through
//! [`store::DocumentStore`] and every view is rebuilt from the snapshot the
//! store pushes back; nothing is patched locally.
//!
//! # Modules
//!
//! - [`models`]: Domain types (PatientRecord, Address, CustomFieldDefinition, Draft)
//! - [`db`]: SQLite database layer
//! - [`store`]: Document store trait and live feeds
//! - [`auth`]: Identity provider seam
//! - [`editor`]: Record editor state machine and validation
//! - [`registry`]: Custom field registry editing
//! - [`collection`]: Live collection view and grid projection
//! - [`sample_data`]: Sample patient generation
//! - [`config`]: Runtime configuration
//! - [`logging`]: Tracing subscriber setup

pub mod auth;
pub mod collection;
pub mod config;
pub mod db;
pub mod editor;
pub mod logging;
pub mod models;
pub mod registry;
pub mod sample_data;
pub mod store;

// Re-export commonly used types
pub use auth::{Identity, IdentityProvider, LocalIdentityProvider};
pub use collection::{LiveCollectionView, PatientRow, TableWidth};
pub use config::DashboardConfig;
pub use db::Database;
pub use editor::{EditorState, RecordEditor, SubmitOutcome, ValidationReport};
pub use models::{
    Address, AddressField, CustomFieldDefinition, CustomFieldValue, Draft, PatientDocument,
    PatientRecord, PatientStatus, ValueType,
};
pub use registry::RegistryEditor;
pub use sample_data::{BuiltinSource, DemographicSource, SampleDataGenerator};
pub use store::{DocumentStore, LiveFeeds, LiveStore, Subscription};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;

use editor::MissingField;
use models::{AddressSlot, CustomFieldEntry};
use registry::EditableField;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DashboardError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Editor error: {0}")]
    EditorError(String),

    #[error("Sample data error: {0}")]
    SampleDataError(String),
}

impl From<db::DbError> for DashboardError {
    fn from(e: db::DbError) -> Self {
        DashboardError::DatabaseError(e.to_string())
    }
}

impl From<store::StoreError> for DashboardError {
    fn from(e: store::StoreError) -> Self {
        match e {
            store::StoreError::PermissionDenied(msg) => DashboardError::PermissionDenied(msg),
            other => DashboardError::DatabaseError(other.to_string()),
        }
    }
}

impl From<auth::AuthError> for DashboardError {
    fn from(e: auth::AuthError) -> Self {
        match e {
            auth::AuthError::NotSignedIn => DashboardError::NotSignedIn,
            other => DashboardError::AuthError(other.to_string()),
        }
    }
}

impl From<editor::EditorError> for DashboardError {
    fn from(e: editor::EditorError) -> Self {
        match e {
            editor::EditorError::Store(inner) => inner.into(),
            other => DashboardError::EditorError(other.to_string()),
        }
    }
}

impl From<registry::RegistryError> for DashboardError {
    fn from(e: registry::RegistryError) -> Self {
        match e {
            registry::RegistryError::Store(inner) => inner.into(),
            other => DashboardError::InvalidInput(other.to_string()),
        }
    }
}

impl From<sample_data::SampleDataError> for DashboardError {
    fn from(e: sample_data::SampleDataError) -> Self {
        match e {
            sample_data::SampleDataError::Store(inner) => inner.into(),
            other => DashboardError::SampleDataError(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for DashboardError {
    fn from(e: config::ConfigError) -> Self {
        DashboardError::InvalidInput(e.to_string())
    }
}

impl<T> From<PoisonError<T>> for DashboardError {
    fn from(e: PoisonError<T>) -> Self {
        DashboardError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a dashboard backed by a database file.
///
/// Unset config values fall back to the defaults.
#[uniffi::export]
pub fn open_dashboard(
    config: FfiDashboardConfig,
    account: FfiIdentity,
) -> Result<Arc<PatientDashboard>, DashboardError> {
    let config = config.resolve()?;
    logging::init_logging(config.log_filter());

    let store = LiveStore::open(config.database_path())?;
    tracing::info!(path = %config.database_path().display(), "dashboard opened");
    Ok(Arc::new(PatientDashboard::new(
        config,
        Arc::new(LocalIdentityProvider::new(account.into())),
        Arc::new(store),
    )))
}

/// Open a dashboard configured from the process environment.
#[uniffi::export]
pub fn open_dashboard_from_env(
    account: FfiIdentity,
) -> Result<Arc<PatientDashboard>, DashboardError> {
    let config = DashboardConfig::from_env()?;
    logging::init_logging(config.log_filter());

    let store = LiveStore::open(config.database_path())?;
    Ok(Arc::new(PatientDashboard::new(
        config,
        Arc::new(LocalIdentityProvider::new(account.into())),
        Arc::new(store),
    )))
}

/// Create an in-memory dashboard (for testing).
#[uniffi::export]
pub fn open_dashboard_in_memory(
    uid: String,
    display_name: String,
) -> Result<Arc<PatientDashboard>, DashboardError> {
    let store = LiveStore::open_in_memory()?;
    Ok(Arc::new(PatientDashboard::new(
        DashboardConfig::default(),
        Arc::new(LocalIdentityProvider::new(Identity::new(uid, display_name))),
        Arc::new(store),
    )))
}

/// Two-letter code for a US state or territory name; unknown names pass
/// through unchanged.
#[uniffi::export]
pub fn state_abbreviation(state: String) -> String {
    models::state_abbreviation(&state)
}

/// Multi-line display form of an address.
#[uniffi::export]
pub fn format_address(address: FfiAddress) -> String {
    models::stringify_address(&address.into())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe dashboard session for FFI.
#[derive(uniffi::Object)]
pub struct PatientDashboard {
    config: DashboardConfig,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<LiveStore>,
    source: Arc<dyn DemographicSource>,
    view: Mutex<Option<LiveCollectionView>>,
    /// Keeps the open record editor in step with the registry
    registry_feed: Mutex<Option<Subscription>>,
    editor: Arc<Mutex<RecordEditor>>,
    registry_editor: Mutex<RegistryEditor>,
    page_size: Mutex<u32>,
    table_width: Mutex<TableWidth>,
}

impl PatientDashboard {
    /// Assemble a dashboard from injected services.
    pub fn new(
        config: DashboardConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<LiveStore>,
    ) -> Self {
        let page_size = config.default_page_size();
        Self {
            config,
            identity,
            store,
            source: Arc::new(BuiltinSource),
            view: Mutex::new(None),
            registry_feed: Mutex::new(None),
            editor: Arc::new(Mutex::new(RecordEditor::new())),
            registry_editor: Mutex::new(RegistryEditor::default()),
            page_size: Mutex::new(page_size),
            table_width: Mutex::new(TableWidth::default()),
        }
    }

    /// Replace the demographic source used for sample data.
    pub fn with_source(mut self, source: Arc<dyn DemographicSource>) -> Self {
        self.source = source;
        self
    }

    fn owner_id(&self) -> Result<String, DashboardError> {
        self.identity
            .current()
            .map(|identity| identity.uid)
            .ok_or(DashboardError::NotSignedIn)
    }

    fn definitions(&self) -> Result<Vec<CustomFieldDefinition>, DashboardError> {
        let view = self.view.lock()?;
        Ok(view
            .as_ref()
            .map(LiveCollectionView::definitions)
            .unwrap_or_default())
    }

    fn draft_snapshot(&self) -> Result<FfiDraft, DashboardError> {
        let editor = self.editor.lock()?;
        Ok(FfiDraft::from_editor(&editor))
    }

    fn edit<F>(&self, f: F) -> Result<FfiDraft, DashboardError>
    where
        F: FnOnce(&mut RecordEditor) -> Result<(), editor::EditorError>,
    {
        let mut editor = self.editor.lock()?;
        f(&mut editor)?;
        Ok(FfiDraft::from_editor(&editor))
    }
}

#[uniffi::export]
impl PatientDashboard {
    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Sign in and start following the account's records.
    pub fn sign_in(&self) -> Result<FfiIdentity, DashboardError> {
        let identity = self.identity.sign_in()?;

        let view = LiveCollectionView::mount(self.store.as_ref(), &identity.uid)?;
        *self.view.lock()? = Some(view);

        let editor = Arc::clone(&self.editor);
        let feed = self.store.subscribe_registry(
            &identity.uid,
            Box::new(move |definitions: &Vec<CustomFieldDefinition>| {
                editor
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .refresh_definitions(definitions);
            }),
        )?;
        *self.registry_feed.lock()? = Some(feed);

        Ok(identity.into())
    }

    /// Sign out, closing the editor and both feeds.
    pub fn sign_out(&self) -> Result<(), DashboardError> {
        self.editor.lock()?.discard();
        if let Some(view) = self.view.lock()?.take() {
            view.unmount();
        }
        self.registry_feed.lock()?.take();
        self.identity.sign_out()?;
        Ok(())
    }

    pub fn current_identity(&self) -> Option<FfiIdentity> {
        self.identity.current().map(Into::into)
    }

    // =========================================================================
    // Grid Operations
    // =========================================================================

    /// True until the first records snapshot arrives.
    pub fn loading(&self) -> Result<bool, DashboardError> {
        let view = self.view.lock()?;
        Ok(view.as_ref().map_or(true, LiveCollectionView::loading))
    }

    pub fn rows(&self) -> Result<Vec<FfiPatientRow>, DashboardError> {
        let view = self.view.lock()?;
        let view = view.as_ref().ok_or(DashboardError::NotSignedIn)?;
        Ok(view.rows().into_iter().map(Into::into).collect())
    }

    pub fn columns(&self) -> Vec<FfiColumn> {
        collection::columns().into_iter().map(Into::into).collect()
    }

    pub fn page_size_options(&self) -> Vec<u32> {
        collection::PAGE_SIZE_OPTIONS.to_vec()
    }

    pub fn page_size(&self) -> Result<u32, DashboardError> {
        Ok(*self.page_size.lock()?)
    }

    pub fn set_page_size(&self, size: u32) -> Result<(), DashboardError> {
        if !collection::is_page_size_option(size) {
            return Err(DashboardError::InvalidInput(format!(
                "Unsupported page size: {}",
                size
            )));
        }
        *self.page_size.lock()? = size;
        Ok(())
    }

    /// Widths offered by the width picker, narrowest first.
    pub fn table_width_options(&self) -> Vec<FfiTableWidth> {
        [TableWidth::Sm, TableWidth::Md, TableWidth::Lg, TableWidth::Xl]
            .into_iter()
            .map(Into::into)
            .collect()
    }

    pub fn table_width(&self) -> Result<String, DashboardError> {
        Ok(self.table_width.lock()?.to_string())
    }

    pub fn set_table_width(&self, width: String) -> Result<(), DashboardError> {
        let width: TableWidth = width.parse().map_err(DashboardError::InvalidInput)?;
        *self.table_width.lock()? = width;
        Ok(())
    }

    /// Chip colour for a status name.
    pub fn status_color(&self, status: String) -> Result<String, DashboardError> {
        let status: PatientStatus = status.parse().map_err(DashboardError::InvalidInput)?;
        Ok(collection::status_color(status).as_str().to_string())
    }

    // =========================================================================
    // Custom Field Registry Operations
    // =========================================================================

    pub fn custom_fields(&self) -> Result<Vec<FfiCustomFieldDefinition>, DashboardError> {
        Ok(self.definitions()?.into_iter().map(Into::into).collect())
    }

    /// Load the saved registry into the registry editor.
    pub fn open_registry_editor(&self) -> Result<Vec<FfiEditableField>, DashboardError> {
        let definitions = self.definitions()?;
        let mut registry_editor = self.registry_editor.lock()?;
        registry_editor.reset(&definitions);
        Ok(registry_rows(&registry_editor))
    }

    pub fn registry_rows(&self) -> Result<Vec<FfiEditableField>, DashboardError> {
        let registry_editor = self.registry_editor.lock()?;
        Ok(registry_rows(&registry_editor))
    }

    pub fn registry_add_row(&self) -> Result<u32, DashboardError> {
        Ok(self.registry_editor.lock()?.add_row() as u32)
    }

    pub fn registry_allow_edit(&self, index: u32) -> Result<(), DashboardError> {
        self.registry_editor.lock()?.allow_edit(index as usize)?;
        Ok(())
    }

    pub fn registry_rename(&self, index: u32, name: String) -> Result<(), DashboardError> {
        self.registry_editor.lock()?.rename(index as usize, &name)?;
        Ok(())
    }

    pub fn registry_set_value_type(
        &self,
        index: u32,
        value_type: String,
    ) -> Result<(), DashboardError> {
        let value_type: ValueType = value_type.parse().map_err(DashboardError::InvalidInput)?;
        self.registry_editor
            .lock()?
            .set_value_type(index as usize, value_type)?;
        Ok(())
    }

    pub fn registry_remove(&self, index: u32) -> Result<(), DashboardError> {
        self.registry_editor.lock()?.remove(index as usize)?;
        Ok(())
    }

    /// Overwrite the account's registry with the editor's rows.
    pub fn save_registry(&self) -> Result<Vec<FfiCustomFieldDefinition>, DashboardError> {
        let owner_id = self.owner_id()?;
        let saved = self
            .registry_editor
            .lock()?
            .submit(self.store.as_ref(), &owner_id)?;
        Ok(saved.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Record Editor Operations
    // =========================================================================

    pub fn editor_draft(&self) -> Result<FfiDraft, DashboardError> {
        self.draft_snapshot()
    }

    pub fn open_new_record(&self) -> Result<FfiDraft, DashboardError> {
        self.owner_id()?;
        let definitions = self.definitions()?;
        self.edit(|editor| {
            editor.open_new(&definitions);
            Ok(())
        })
    }

    pub fn open_record(&self, record_id: String) -> Result<FfiDraft, DashboardError> {
        let (record, definitions) = {
            let view = self.view.lock()?;
            let view = view.as_ref().ok_or(DashboardError::NotSignedIn)?;
            let record = view
                .record(&record_id)
                .ok_or_else(|| DashboardError::NotFound(record_id.clone()))?;
            (record, view.definitions())
        };
        self.edit(|editor| {
            editor.open_existing(&record, &definitions);
            Ok(())
        })
    }

    pub fn set_first_name(&self, value: String) -> Result<FfiDraft, DashboardError> {
        self.edit(|editor| editor.set_first_name(&value))
    }

    pub fn set_middle_name(&self, value: String) -> Result<FfiDraft, DashboardError> {
        self.edit(|editor| editor.set_middle_name(&value))
    }

    pub fn set_last_name(&self, value: String) -> Result<FfiDraft, DashboardError> {
        self.edit(|editor| editor.set_last_name(&value))
    }

    pub fn set_status(&self, status: String) -> Result<FfiDraft, DashboardError> {
        let status: PatientStatus = status.parse().map_err(DashboardError::InvalidInput)?;
        self.edit(|editor| editor.set_status(status))
    }

    /// Set the date of birth from `YYYY-MM-DD`, or clear it with `None`.
    pub fn set_date_of_birth(&self, date: Option<String>) -> Result<FfiDraft, DashboardError> {
        let date = date.as_deref().map(parse_date).transpose()?;
        self.edit(|editor| editor.set_date_of_birth(date))
    }

    /// Set a custom field by key. The value is coerced to the field's type
    /// on submit.
    pub fn set_custom_field(
        &self,
        key: String,
        value: Option<String>,
    ) -> Result<FfiDraft, DashboardError> {
        self.edit(|editor| editor.set_custom_field(&key, value.map(CustomFieldValue::Text)))
    }

    pub fn add_address(&self) -> Result<FfiDraft, DashboardError> {
        self.edit(|editor| editor.add_address().map(|_| ()))
    }

    pub fn begin_address_edit(&self, index: u32) -> Result<FfiDraft, DashboardError> {
        self.edit(|editor| editor.begin_address_edit(index as usize))
    }

    pub fn update_address_field(
        &self,
        index: u32,
        field: String,
        value: String,
    ) -> Result<FfiDraft, DashboardError> {
        let field: AddressField = field.parse().map_err(DashboardError::InvalidInput)?;
        self.edit(|editor| editor.update_address_field(index as usize, field, &value))
    }

    /// Commit an address card. Check the slot's `editing` flag in the
    /// returned draft to see whether it was accepted.
    pub fn finish_address_edit(&self, index: u32) -> Result<FfiDraft, DashboardError> {
        self.edit(|editor| editor.finish_address_edit(index as usize).map(|_| ()))
    }

    pub fn cancel_address_edit(&self, index: u32) -> Result<FfiDraft, DashboardError> {
        self.edit(|editor| editor.cancel_address_edit(index as usize))
    }

    pub fn remove_address(&self, index: u32) -> Result<FfiDraft, DashboardError> {
        self.edit(|editor| editor.remove_address(index as usize))
    }

    /// Validate and save the open record.
    pub fn submit_record(&self) -> Result<FfiSubmitOutcome, DashboardError> {
        let owner_id = self.owner_id()?;
        let outcome = self
            .editor
            .lock()?
            .submit(self.store.as_ref(), &owner_id)?;
        Ok(outcome.into())
    }

    pub fn discard_record(&self) -> Result<(), DashboardError> {
        self.editor.lock()?.discard();
        Ok(())
    }

    /// Delete the record open in the editor. There is no confirmation step.
    pub fn delete_record(&self) -> Result<bool, DashboardError> {
        let owner_id = self.owner_id()?;
        let deleted = self
            .editor
            .lock()?
            .delete_record(self.store.as_ref(), &owner_id)?;
        Ok(deleted)
    }

    // =========================================================================
    // Sample Data Operations
    // =========================================================================

    /// Write a batch of generated patients. Returns how many were created.
    pub fn populate_sample_data(&self) -> Result<u32, DashboardError> {
        let owner_id = self.owner_id()?;
        let generator = SampleDataGenerator::new(self.config.sample_batch_size());
        let records = generator.populate(self.store.as_ref(), self.source.as_ref(), &owner_id)?;
        Ok(records.len() as u32)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, DashboardError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| DashboardError::InvalidInput(format!("Invalid date {:?}: {}", value, e)))
}

fn registry_rows(registry_editor: &RegistryEditor) -> Vec<FfiEditableField> {
    registry_editor.rows().iter().map(Into::into).collect()
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe dashboard configuration. Unset values use the defaults.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiDashboardConfig {
    pub database_path: Option<String>,
    pub sample_batch_size: Option<u32>,
    pub default_page_size: Option<u32>,
    pub log_filter: Option<String>,
}

impl FfiDashboardConfig {
    fn resolve(self) -> Result<DashboardConfig, DashboardError> {
        let defaults = DashboardConfig::default();
        Ok(DashboardConfig::new(
            self.database_path
                .map(PathBuf::from)
                .unwrap_or_else(|| defaults.database_path().to_path_buf()),
            self.sample_batch_size
                .map(|n| n as usize)
                .unwrap_or(defaults.sample_batch_size()),
            self.default_page_size
                .unwrap_or(defaults.default_page_size()),
            self.log_filter
                .unwrap_or_else(|| defaults.log_filter().to_string()),
        )?)
    }
}

/// FFI-safe identity.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIdentity {
    pub uid: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<Identity> for FfiIdentity {
    fn from(identity: Identity) -> Self {
        Self {
            uid: identity.uid,
            display_name: identity.display_name,
            avatar_url: identity.avatar_url,
        }
    }
}

impl From<FfiIdentity> for Identity {
    fn from(identity: FfiIdentity) -> Self {
        Identity {
            uid: identity.uid,
            display_name: identity.display_name,
            avatar_url: identity.avatar_url,
        }
    }
}

/// FFI-safe grid row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientRow {
    pub id: String,
    pub full_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub status: String,
    pub status_color: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub address_preview: Option<String>,
    pub addresses: Vec<String>,
    pub custom_fields: Vec<FfiCustomFieldCell>,
}

impl From<PatientRow> for FfiPatientRow {
    fn from(row: PatientRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            first_name: row.first_name,
            middle_name: row.middle_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            status: row.status.to_string(),
            status_color: collection::status_color(row.status).as_str().to_string(),
            city: row.city,
            state: row.state,
            zipcode: row.zipcode,
            address_preview: row.address_preview,
            addresses: row.addresses,
            custom_fields: row
                .custom_fields
                .into_iter()
                .map(|(name, value)| FfiCustomFieldCell { name, value })
                .collect(),
        }
    }
}

/// FFI-safe custom field value as shown in the grid.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCustomFieldCell {
    pub name: String,
    pub value: String,
}

/// FFI-safe column definition.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiColumn {
    pub field: String,
    pub header: String,
    pub width: Option<u32>,
    pub flex: Option<u32>,
    pub min_width: Option<u32>,
    pub hidden_by_default: bool,
}

impl From<collection::ColumnDef> for FfiColumn {
    fn from(column: collection::ColumnDef) -> Self {
        let (width, flex, min_width) = match column.width {
            collection::ColumnWidth::Fixed(width) => (Some(width), None, None),
            collection::ColumnWidth::Flex { weight, min } => (None, Some(weight), Some(min)),
        };
        Self {
            field: column.field.to_string(),
            header: column.header.to_string(),
            width,
            flex,
            min_width,
            hidden_by_default: column.hidden_by_default,
        }
    }
}

/// FFI-safe table width choice.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTableWidth {
    pub value: String,
    pub label: String,
}

impl From<TableWidth> for FfiTableWidth {
    fn from(width: TableWidth) -> Self {
        Self {
            value: width.as_str().to_string(),
            label: width.label().to_string(),
        }
    }
}

/// FFI-safe custom field definition.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCustomFieldDefinition {
    pub key: String,
    pub name: String,
    pub value_type: String,
}

impl From<CustomFieldDefinition> for FfiCustomFieldDefinition {
    fn from(definition: CustomFieldDefinition) -> Self {
        Self {
            key: definition.key,
            name: definition.name,
            value_type: definition.value_type.to_string(),
        }
    }
}

/// FFI-safe registry editor row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEditableField {
    pub definition: FfiCustomFieldDefinition,
    pub allow_edit: bool,
}

impl From<&EditableField> for FfiEditableField {
    fn from(row: &EditableField) -> Self {
        Self {
            definition: row.definition.clone().into(),
            allow_edit: row.allow_edit,
        }
    }
}

/// FFI-safe address.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAddress {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
}

impl From<Address> for FfiAddress {
    fn from(address: Address) -> Self {
        Self {
            line1: address.line1,
            line2: address.line2,
            city: address.city,
            state: address.state,
            zipcode: address.zipcode,
        }
    }
}

impl From<FfiAddress> for Address {
    fn from(address: FfiAddress) -> Self {
        Address {
            line1: address.line1,
            line2: address.line2,
            city: address.city,
            state: address.state,
            zipcode: address.zipcode,
        }
    }
}

/// FFI-safe address card.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAddressSlot {
    pub address: FfiAddress,
    pub editing: bool,
    pub pending: Option<FfiAddress>,
    pub validating: bool,
    /// Lines to mark as missing
    pub flagged_fields: Vec<String>,
}

impl From<&AddressSlot> for FfiAddressSlot {
    fn from(slot: &AddressSlot) -> Self {
        Self {
            address: slot.address.clone().into(),
            editing: slot.editing,
            pending: slot.pending.clone().map(Into::into),
            validating: slot.validating,
            flagged_fields: slot
                .flagged_fields()
                .iter()
                .map(|field| field.as_str().to_string())
                .collect(),
        }
    }
}

/// FFI-safe custom field entry in a draft.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCustomFieldEntry {
    pub key: String,
    pub name: String,
    pub value_type: String,
    pub value: Option<String>,
}

impl From<&CustomFieldEntry> for FfiCustomFieldEntry {
    fn from(entry: &CustomFieldEntry) -> Self {
        Self {
            key: entry.definition.key.clone(),
            name: entry.definition.name.clone(),
            value_type: entry.definition.value_type.to_string(),
            value: entry.value.as_ref().map(ToString::to_string),
        }
    }
}

/// FFI-safe editor state and draft.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDraft {
    /// `closed`, `new` or `existing`
    pub state: String,
    pub record_id: Option<String>,
    pub status: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
    pub addresses: Vec<FfiAddressSlot>,
    pub custom_fields: Vec<FfiCustomFieldEntry>,
    pub validating: bool,
    /// Required fields still missing, shown once `validating` is set
    pub missing_fields: Vec<String>,
    /// Custom fields whose value does not fit their type, as `customFields.<key>`
    pub invalid_fields: Vec<String>,
}

impl FfiDraft {
    fn from_editor(editor: &RecordEditor) -> Self {
        let (state, record_id) = match editor.state() {
            EditorState::Closed => ("closed", None),
            EditorState::EditingNew => ("new", None),
            EditorState::EditingExisting(id) => ("existing", Some(id.clone())),
        };

        let Some(draft) = editor.draft() else {
            return Self {
                state: state.to_string(),
                record_id,
                status: PatientStatus::default().to_string(),
                first_name: String::new(),
                middle_name: String::new(),
                last_name: String::new(),
                date_of_birth: None,
                addresses: Vec::new(),
                custom_fields: Vec::new(),
                validating: false,
                missing_fields: Vec::new(),
                invalid_fields: Vec::new(),
            };
        };

        let (missing_fields, invalid_fields) = if draft.validating {
            let report = ValidationReport::for_draft(draft);
            (missing_field_names(&report), invalid_field_names(&report))
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            state: state.to_string(),
            record_id,
            status: draft.status.to_string(),
            first_name: draft.first_name.clone(),
            middle_name: draft.middle_name.clone(),
            last_name: draft.last_name.clone(),
            date_of_birth: draft
                .date_of_birth
                .map(|date| date.format("%Y-%m-%d").to_string()),
            addresses: draft.addresses.iter().map(Into::into).collect(),
            custom_fields: draft.custom_fields.iter().map(Into::into).collect(),
            validating: draft.validating,
            missing_fields,
            invalid_fields,
        }
    }
}

/// FFI-safe submit result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSubmitOutcome {
    pub saved: bool,
    pub record_id: Option<String>,
    pub missing_fields: Vec<String>,
    pub invalid_fields: Vec<String>,
}

impl From<SubmitOutcome> for FfiSubmitOutcome {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Saved(id) => Self {
                saved: true,
                record_id: Some(id),
                missing_fields: Vec::new(),
                invalid_fields: Vec::new(),
            },
            SubmitOutcome::Invalid(report) => Self {
                saved: false,
                record_id: None,
                missing_fields: missing_field_names(&report),
                invalid_fields: invalid_field_names(&report),
            },
        }
    }
}

/// Flatten a report into names like `firstName` or `primaryAddress.city`.
fn missing_field_names(report: &ValidationReport) -> Vec<String> {
    report
        .missing
        .iter()
        .flat_map(|field| match field {
            MissingField::FirstName => vec!["firstName".to_string()],
            MissingField::LastName => vec!["lastName".to_string()],
            MissingField::DateOfBirth => vec!["dateOfBirth".to_string()],
            MissingField::PrimaryAddress(lines) => lines
                .iter()
                .map(|line| format!("primaryAddress.{}", line.as_str()))
                .collect(),
        })
        .collect()
}

fn invalid_field_names(report: &ValidationReport) -> Vec<String> {
    report
        .invalid_numbers
        .iter()
        .map(|key| format!("customFields.{}", key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in() -> Arc<PatientDashboard> {
        let dashboard = open_dashboard_in_memory("user-1".into(), "Ada".into()).unwrap();
        dashboard.sign_in().unwrap();
        dashboard
    }

    fn fill_required(dashboard: &PatientDashboard) {
        dashboard.set_first_name("Ada".into()).unwrap();
        dashboard.set_last_name("Lovelace".into()).unwrap();
        dashboard
            .set_date_of_birth(Some("1985-06-01".into()))
            .unwrap();
        for (field, value) in [
            ("line1", "1 Main St"),
            ("city", "Columbus"),
            ("state", "Ohio"),
            ("zipcode", "43004"),
        ] {
            dashboard
                .update_address_field(0, field.into(), value.into())
                .unwrap();
        }
        let draft = dashboard.finish_address_edit(0).unwrap();
        assert!(!draft.addresses[0].editing);
    }

    #[test]
    fn test_requires_sign_in() {
        let dashboard = open_dashboard_in_memory("user-1".into(), "Ada".into()).unwrap();
        assert!(matches!(dashboard.rows(), Err(DashboardError::NotSignedIn)));
        assert!(matches!(
            dashboard.populate_sample_data(),
            Err(DashboardError::NotSignedIn)
        ));
        assert!(dashboard.loading().unwrap());
    }

    #[test]
    fn test_create_record_through_ffi() {
        let dashboard = signed_in();
        assert!(dashboard.rows().unwrap().is_empty());

        dashboard.open_new_record().unwrap();
        let outcome = dashboard.submit_record().unwrap();
        assert!(!outcome.saved);
        assert!(outcome.missing_fields.contains(&"firstName".to_string()));
        assert!(outcome
            .missing_fields
            .contains(&"primaryAddress.zipcode".to_string()));

        fill_required(&dashboard);
        let outcome = dashboard.submit_record().unwrap();
        assert!(outcome.saved);

        let rows = dashboard.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].full_name, "Ada Lovelace");
        assert_eq!(rows[0].date_of_birth, "06/01/1985");
        assert_eq!(rows[0].state.as_deref(), Some("OH"));
        assert_eq!(rows[0].status_color, "secondary");
        assert_eq!(dashboard.editor_draft().unwrap().state, "closed");
    }

    #[test]
    fn test_registry_change_reaches_open_editor() {
        let dashboard = signed_in();
        dashboard.open_new_record().unwrap();

        dashboard.open_registry_editor().unwrap();
        let index = dashboard.registry_add_row().unwrap();
        dashboard
            .registry_rename(index, "Insurance Provider".into())
            .unwrap();
        dashboard.save_registry().unwrap();

        let draft = dashboard.editor_draft().unwrap();
        assert_eq!(draft.custom_fields.len(), 1);
        assert_eq!(draft.custom_fields[0].key, "InsuranceProvider");
        assert_eq!(dashboard.custom_fields().unwrap().len(), 1);
    }

    #[test]
    fn test_registry_rows_track_edits() {
        let dashboard = signed_in();
        assert!(dashboard.open_registry_editor().unwrap().is_empty());

        let index = dashboard.registry_add_row().unwrap();
        dashboard.registry_rename(index, "Visit Count".into()).unwrap();

        let rows = dashboard.registry_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].definition.name, "Visit Count");
    }

    #[test]
    fn test_registry_change_reaches_poisoned_editor() {
        let dashboard = signed_in();
        dashboard.open_new_record().unwrap();

        let editor = Arc::clone(&dashboard.editor);
        let _ = std::thread::spawn(move || {
            let _guard = editor.lock().unwrap();
            panic!("editor lock poisoned on purpose");
        })
        .join();
        assert!(dashboard.editor.is_poisoned());

        dashboard.open_registry_editor().unwrap();
        let index = dashboard.registry_add_row().unwrap();
        dashboard.registry_rename(index, "Insurer".into()).unwrap();
        dashboard.save_registry().unwrap();

        let editor = dashboard.editor.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(editor.draft().unwrap().custom_fields.len(), 1);
    }

    #[test]
    fn test_edit_and_delete_existing() {
        let dashboard = signed_in();
        dashboard.open_new_record().unwrap();
        fill_required(&dashboard);
        let record_id = dashboard.submit_record().unwrap().record_id.unwrap();

        let draft = dashboard.open_record(record_id.clone()).unwrap();
        assert_eq!(draft.state, "existing");
        assert_eq!(draft.date_of_birth.as_deref(), Some("1985-06-01"));

        dashboard.set_status("Active".into()).unwrap();
        dashboard.submit_record().unwrap();
        assert_eq!(dashboard.rows().unwrap()[0].status, "Active");

        dashboard.open_record(record_id).unwrap();
        assert!(dashboard.delete_record().unwrap());
        assert!(dashboard.rows().unwrap().is_empty());
    }

    #[test]
    fn test_non_numeric_custom_field_blocks_submit() {
        let dashboard = signed_in();
        dashboard.open_registry_editor().unwrap();
        let index = dashboard.registry_add_row().unwrap();
        dashboard.registry_rename(index, "Visit Count".into()).unwrap();
        dashboard
            .registry_set_value_type(index, "number".into())
            .unwrap();
        dashboard.save_registry().unwrap();

        dashboard.open_new_record().unwrap();
        fill_required(&dashboard);
        dashboard
            .set_custom_field("VisitCount".into(), Some("a few".into()))
            .unwrap();

        let outcome = dashboard.submit_record().unwrap();
        assert!(!outcome.saved);
        assert!(outcome.missing_fields.is_empty());
        assert_eq!(outcome.invalid_fields, vec!["customFields.VisitCount".to_string()]);
        assert_eq!(
            dashboard.editor_draft().unwrap().invalid_fields,
            vec!["customFields.VisitCount".to_string()]
        );
        assert!(dashboard.rows().unwrap().is_empty());

        dashboard
            .set_custom_field("VisitCount".into(), Some("3".into()))
            .unwrap();
        assert!(dashboard.submit_record().unwrap().saved);
        assert_eq!(dashboard.rows().unwrap().len(), 1);
    }

    #[test]
    fn test_open_unknown_record_is_not_found() {
        let dashboard = signed_in();
        assert!(matches!(
            dashboard.open_record("missing".into()),
            Err(DashboardError::NotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_grid_settings() {
        let dashboard = signed_in();
        assert_eq!(dashboard.page_size().unwrap(), 10);
        dashboard.set_page_size(50).unwrap();
        assert!(dashboard.set_page_size(7).is_err());

        let widths = dashboard.table_width_options();
        assert_eq!(widths.len(), 4);
        assert_eq!(widths[3].label, "extra large");

        assert_eq!(dashboard.table_width().unwrap(), "lg");
        dashboard.set_table_width("sm".into()).unwrap();
        assert!(dashboard.set_table_width("tiny".into()).is_err());
        assert_eq!(dashboard.table_width().unwrap(), "sm");
    }

    #[test]
    fn test_sample_data_and_sign_out() {
        let dashboard = signed_in();
        assert_eq!(dashboard.populate_sample_data().unwrap(), 10);
        assert_eq!(dashboard.rows().unwrap().len(), 10);

        dashboard.sign_out().unwrap();
        assert!(dashboard.current_identity().is_none());
        assert!(matches!(dashboard.rows(), Err(DashboardError::NotSignedIn)));
    }

    #[test]
    fn test_state_abbreviation_export() {
        assert_eq!(state_abbreviation("Ohio".into()), "OH");
        assert_eq!(state_abbreviation("Unknown Place".into()), "Unknown Place");
    }
}
