//! Live collection view.
//!
//! Mounting a [`LiveCollectionView`] opens two feeds for one account: its
//! patient records and its custom field registry. Each notification
//! replaces the matching part of the view wholesale; nothing is merged.
//! Dropping the view (or calling [`LiveCollectionView::unmount`]) closes
//! both feeds.

pub mod grid;

pub use grid::{
    columns, format_date, is_page_size_option, project_rows, status_color, ColumnDef,
    ColumnWidth, PatientRow, StatusColor, TableWidth, DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS,
};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{CustomFieldDefinition, PatientRecord};
use crate::store::{LiveFeeds, StoreResult, Subscription};

#[derive(Default)]
struct ViewState {
    records: Vec<PatientRecord>,
    rows: Vec<PatientRow>,
    definitions: Vec<CustomFieldDefinition>,
    loaded: bool,
}

/// In-memory projection of one account's records and registry.
pub struct LiveCollectionView {
    owner_id: String,
    state: Arc<Mutex<ViewState>>,
    subscriptions: Vec<Subscription>,
}

impl LiveCollectionView {
    /// Subscribe to the account's records and registry.
    pub fn mount<S>(store: &S, owner_id: &str) -> StoreResult<Self>
    where
        S: LiveFeeds + ?Sized,
    {
        let state = Arc::new(Mutex::new(ViewState::default()));

        let records_state = Arc::clone(&state);
        let records = store.subscribe_records(
            owner_id,
            Box::new(move |records: &Vec<PatientRecord>| {
                let mut view = lock(&records_state);
                view.rows = project_rows(records);
                view.records = records.clone();
                view.loaded = true;
            }),
        )?;

        let registry_state = Arc::clone(&state);
        let registry = store.subscribe_registry(
            owner_id,
            Box::new(move |definitions: &Vec<CustomFieldDefinition>| {
                lock(&registry_state).definitions = definitions.clone();
            }),
        )?;

        tracing::debug!(owner_id, "collection view mounted");
        Ok(Self {
            owner_id: owner_id.to_string(),
            state,
            subscriptions: vec![records, registry],
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// True until the first records snapshot has arrived.
    pub fn loading(&self) -> bool {
        !lock(&self.state).loaded
    }

    pub fn rows(&self) -> Vec<PatientRow> {
        lock(&self.state).rows.clone()
    }

    pub fn records(&self) -> Vec<PatientRecord> {
        lock(&self.state).records.clone()
    }

    pub fn record(&self, record_id: &str) -> Option<PatientRecord> {
        lock(&self.state)
            .records
            .iter()
            .find(|record| record.id == record_id)
            .cloned()
    }

    pub fn definitions(&self) -> Vec<CustomFieldDefinition> {
        lock(&self.state).definitions.clone()
    }

    /// Close both feeds now.
    pub fn unmount(self) {
        tracing::debug!(owner_id = %self.owner_id, "collection view unmounted");
        for subscription in self.subscriptions {
            subscription.cancel();
        }
    }
}

fn lock(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
