//! End-to-end editor flow tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use patient_dashboard_core::models::{
    AddressField, CustomFieldDefinition, CustomFieldValue, PatientDocument, PatientRecord,
    PatientStatus, ValueType,
};
use patient_dashboard_core::store::{DocumentStore, LiveStore, StoreResult};
use patient_dashboard_core::{
    open_dashboard, open_dashboard_in_memory, EditorState, FfiDashboardConfig, FfiIdentity,
    LiveCollectionView, RecordEditor, SubmitOutcome,
};

/// Counts every write that reaches the wrapped store.
struct CountingStore {
    inner: LiveStore,
    writes: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: LiveStore::open_in_memory().unwrap(),
            writes: AtomicUsize::new(0),
        }
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl DocumentStore for CountingStore {
    fn create_record(&self, document: PatientDocument) -> StoreResult<PatientRecord> {
        self.count();
        self.inner.create_record(document)
    }

    fn overwrite_record(
        &self,
        record_id: &str,
        document: PatientDocument,
    ) -> StoreResult<PatientRecord> {
        self.count();
        self.inner.overwrite_record(record_id, document)
    }

    fn delete_record(&self, owner_id: &str, record_id: &str) -> StoreResult<bool> {
        self.count();
        self.inner.delete_record(owner_id, record_id)
    }

    fn list_records(&self, owner_id: &str) -> StoreResult<Vec<PatientRecord>> {
        self.inner.list_records(owner_id)
    }

    fn load_registry(&self, owner_id: &str) -> StoreResult<Vec<CustomFieldDefinition>> {
        self.inner.load_registry(owner_id)
    }

    fn save_registry(
        &self,
        owner_id: &str,
        definitions: &[CustomFieldDefinition],
    ) -> StoreResult<()> {
        self.count();
        self.inner.save_registry(owner_id, definitions)
    }

    fn create_records_batch(
        &self,
        documents: Vec<PatientDocument>,
    ) -> StoreResult<Vec<PatientRecord>> {
        self.count();
        self.inner.create_records_batch(documents)
    }
}

fn fill_primary_address(editor: &mut RecordEditor) {
    editor.update_address_field(0, AddressField::Line1, "1 Main St").unwrap();
    editor.update_address_field(0, AddressField::City, "Columbus").unwrap();
    editor.update_address_field(0, AddressField::State, "Ohio").unwrap();
    editor.update_address_field(0, AddressField::Zipcode, "43004").unwrap();
    assert!(editor.finish_address_edit(0).unwrap());
}

fn fill_required(editor: &mut RecordEditor) {
    editor.set_first_name("Ada").unwrap();
    editor.set_last_name("Lovelace").unwrap();
    editor
        .set_date_of_birth(NaiveDate::from_ymd_opt(1985, 6, 1))
        .unwrap();
    fill_primary_address(editor);
}

#[test]
fn test_new_record_appears_in_view() {
    let store = LiveStore::open_in_memory().unwrap();
    let view = LiveCollectionView::mount(&store, "user-1").unwrap();
    assert!(!view.loading());
    assert!(view.definitions().is_empty());
    assert!(view.rows().is_empty());

    let mut editor = RecordEditor::new();
    editor.open_new(&view.definitions());
    fill_required(&mut editor);

    let outcome = editor.submit(&store, "user-1").unwrap();
    let SubmitOutcome::Saved(record_id) = outcome else {
        panic!("expected the record to save");
    };
    assert_eq!(editor.state(), &EditorState::Closed);

    let rows = view.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, record_id);
    assert_eq!(rows[0].full_name, "Ada Lovelace");
    assert_eq!(rows[0].status, PatientStatus::Inquiry);
    assert!(rows[0].custom_fields.is_empty());

    let record = view.record(&record_id).unwrap();
    assert!(record.document.custom_fields.is_none());
    assert_eq!(record.document.owner_id, "user-1");
}

#[test]
fn test_invalid_submit_writes_nothing() {
    let store = CountingStore::new();
    let mut editor = RecordEditor::new();
    editor.open_new(&[]);
    editor.set_first_name("Ada").unwrap();

    let outcome = editor.submit(&store, "user-1").unwrap();
    let SubmitOutcome::Invalid(report) = outcome else {
        panic!("expected validation to fail");
    };
    assert!(!report.is_valid());
    assert!(report.primary_address_incomplete());
    assert_eq!(store.writes(), 0);
    assert!(editor.is_open());
    assert!(editor.draft().unwrap().validating);

    editor.set_last_name("Lovelace").unwrap();
    editor
        .set_date_of_birth(NaiveDate::from_ymd_opt(1985, 6, 1))
        .unwrap();
    fill_primary_address(&mut editor);
    assert!(matches!(
        editor.submit(&store, "user-1").unwrap(),
        SubmitOutcome::Saved(_)
    ));
    assert_eq!(store.writes(), 1);
}

#[test]
fn test_edit_existing_overwrites_whole_document() {
    let store = CountingStore::new();
    let definitions = vec![CustomFieldDefinition::new("Visit Count", ValueType::Number)];

    let mut editor = RecordEditor::new();
    editor.open_new(&definitions);
    fill_required(&mut editor);
    editor.add_address().unwrap();
    editor
        .set_custom_field("VisitCount", Some(CustomFieldValue::Text("3".into())))
        .unwrap();
    let SubmitOutcome::Saved(record_id) = editor.submit(&store, "user-1").unwrap() else {
        panic!("expected the record to save");
    };

    let record = store.list_records("user-1").unwrap().remove(0);
    assert_eq!(record.document.addresses.len(), 2);
    assert_eq!(
        record.document.custom_fields.as_ref().unwrap()["Visit Count"],
        CustomFieldValue::Number(3.0)
    );

    editor.open_existing(&record, &definitions);
    assert_eq!(editor.state(), &EditorState::EditingExisting(record_id.clone()));
    editor.remove_address(1).unwrap();
    editor.set_middle_name("King").unwrap();
    editor.set_status(PatientStatus::Onboarding).unwrap();
    assert!(matches!(
        editor.submit(&store, "user-1").unwrap(),
        SubmitOutcome::Saved(id) if id == record_id
    ));

    let records = store.list_records("user-1").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].document.addresses.len(), 1);
    assert_eq!(records[0].document.full_name(), "Ada King Lovelace");
    assert_eq!(records[0].document.status, PatientStatus::Onboarding);
    assert_eq!(store.writes(), 2);
}

#[test]
fn test_delete_from_editor() {
    let store = LiveStore::open_in_memory().unwrap();
    let view = LiveCollectionView::mount(&store, "user-1").unwrap();

    let mut editor = RecordEditor::new();
    editor.open_new(&[]);
    fill_required(&mut editor);
    let SubmitOutcome::Saved(record_id) = editor.submit(&store, "user-1").unwrap() else {
        panic!("expected the record to save");
    };
    assert_eq!(view.rows().len(), 1);

    let record = view.record(&record_id).unwrap();
    editor.open_existing(&record, &[]);
    assert!(editor.delete_record(&store, "user-1").unwrap());
    assert!(!editor.is_open());
    assert!(view.rows().is_empty());
}

#[test]
fn test_dashboard_session_flow() {
    let dashboard = open_dashboard_in_memory("user-1".into(), "Ada".into()).unwrap();
    let identity = dashboard.sign_in().unwrap();
    assert_eq!(identity.uid, "user-1");
    assert!(!dashboard.loading().unwrap());
    assert!(dashboard.custom_fields().unwrap().is_empty());

    let draft = dashboard.open_new_record().unwrap();
    assert_eq!(draft.state, "new");
    assert_eq!(draft.status, "Inquiry");
    assert_eq!(draft.addresses.len(), 1);
    assert!(draft.addresses[0].editing);

    let outcome = dashboard.submit_record().unwrap();
    assert!(!outcome.saved);
    assert_eq!(dashboard.editor_draft().unwrap().state, "new");
    assert!(dashboard.rows().unwrap().is_empty());

    dashboard.set_first_name("Grace".into()).unwrap();
    dashboard.set_last_name("Hopper".into()).unwrap();
    dashboard
        .set_date_of_birth(Some("1906-12-09".into()))
        .unwrap();
    for (field, value) in [
        ("line1", "200 Larkin St"),
        ("city", "San Francisco"),
        ("state", "California"),
        ("zipcode", "94102-4733"),
    ] {
        dashboard
            .update_address_field(0, field.into(), value.into())
            .unwrap();
    }
    dashboard.finish_address_edit(0).unwrap();

    let outcome = dashboard.submit_record().unwrap();
    assert!(outcome.saved);
    assert!(outcome.missing_fields.is_empty());

    let rows = dashboard.rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date_of_birth, "12/09/1906");
    assert_eq!(
        rows[0].address_preview.as_deref(),
        Some("San Francisco\nCA 94102")
    );
    assert!(rows[0].custom_fields.is_empty());
}

#[test]
fn test_dashboard_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = FfiDashboardConfig {
        database_path: Some(dir.path().join("patients.db").to_string_lossy().into_owned()),
        ..FfiDashboardConfig::default()
    };
    let account = FfiIdentity {
        uid: "user-1".into(),
        display_name: "Ada".into(),
        avatar_url: None,
    };

    {
        let dashboard = open_dashboard(config.clone(), account.clone()).unwrap();
        dashboard.sign_in().unwrap();
        assert_eq!(dashboard.populate_sample_data().unwrap(), 10);
        dashboard.sign_out().unwrap();
    }

    let dashboard = open_dashboard(config, account).unwrap();
    dashboard.sign_in().unwrap();
    assert_eq!(dashboard.rows().unwrap().len(), 10);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = FfiDashboardConfig {
        default_page_size: Some(7),
        ..FfiDashboardConfig::default()
    };
    let account = FfiIdentity {
        uid: "user-1".into(),
        display_name: "Ada".into(),
        avatar_url: None,
    };
    assert!(open_dashboard(config, account).is_err());
}
