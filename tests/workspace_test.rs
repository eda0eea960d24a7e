use sheetviz::chart::{ChartConfig, ChartKind};
use sheetviz::dataset::{DatasetError, FieldUpdate, RawRecord};
use sheetviz::field::{FieldType, FieldValue, RawValue};
use sheetviz::login::{DEMO_PASSWORD, DEMO_USERNAME};
use sheetviz::storage::{FileStore, KeyValueStore, MemoryStore};
use sheetviz::workspace::{AUTH_KEY, FIELDS_KEY, ROWS_KEY, Workspace, WorkspaceError};

fn logged_in() -> Workspace {
    let mut workspace = Workspace::open(Box::new(MemoryStore::new()));
    workspace.login(DEMO_USERNAME, DEMO_PASSWORD).unwrap();
    workspace
}

fn record(pairs: &[(&str, RawValue)]) -> RawRecord {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[test]
fn mutations_require_login() {
    let mut workspace = Workspace::open(Box::new(MemoryStore::new()));
    assert!(!workspace.is_authenticated());

    let result = workspace.add_field("Name", FieldType::Text, false);
    assert!(matches!(result, Err(WorkspaceError::NotAuthenticated)));

    let result = workspace.login(DEMO_USERNAME, "wrong");
    assert!(matches!(result, Err(WorkspaceError::InvalidCredentials)));
    assert!(!workspace.is_authenticated());
}

#[test]
fn manual_editing_round() {
    let mut workspace = logged_in();
    let name = workspace.add_field("Name", FieldType::Text, true).unwrap();
    let age = workspace.add_field("Age", FieldType::Number, false).unwrap();

    let row = workspace
        .add_row(&record(&[
            ("Name", RawValue::from("Ann")),
            ("Age", RawValue::from("41")),
        ]))
        .unwrap();
    assert_eq!(row.get("Age"), Some(&FieldValue::Number(41.0)));

    let missing = workspace.add_row(&record(&[("Age", RawValue::Number(3.0))]));
    assert!(matches!(
        missing,
        Err(WorkspaceError::Dataset(DatasetError::MissingRequiredValue(_)))
    ));

    let renamed = workspace
        .update_field(
            &age.id,
            FieldUpdate {
                name: Some("Years".to_string()),
                ..FieldUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Years");
    assert_eq!(
        workspace.dataset().rows[0].get("Years"),
        Some(&FieldValue::Number(41.0))
    );

    workspace.move_field(&renamed.id, 0).unwrap();
    assert_eq!(workspace.dataset().fields[0].name, "Years");

    workspace.delete_field(&name.id).unwrap();
    assert_eq!(workspace.dataset().rows[0].get("Name"), None);

    workspace.delete_row(&row.id).unwrap();
    assert!(workspace.dataset().rows.is_empty());
}

#[test]
fn import_preview_waits_for_confirmation() {
    let mut workspace = logged_in();
    workspace.add_field("Existing", FieldType::Text, false).unwrap();

    let csv = "Name,Age\nBob,25\nCara,31\n";
    let preview = workspace.import_bytes("people.csv", csv.as_bytes()).unwrap();
    assert_eq!(preview.rows.len(), 2);
    assert_eq!(workspace.dataset().fields[0].name, "Existing");

    let dataset = workspace.confirm_import().unwrap();
    let names: Vec<&str> = dataset.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Name", "Age"]);
    assert!(workspace.preview().is_none());
    assert!(matches!(
        workspace.confirm_import(),
        Err(WorkspaceError::NoPendingImport)
    ));
}

#[test]
fn cancelled_import_leaves_dataset_alone() {
    let mut workspace = logged_in();
    workspace.add_field("Existing", FieldType::Text, false).unwrap();

    workspace
        .import_bytes("people.csv", b"Name\nBob\n")
        .unwrap();
    assert!(workspace.cancel_import());
    assert!(!workspace.cancel_import());
    assert_eq!(workspace.dataset().fields.len(), 1);
    assert_eq!(workspace.dataset().fields[0].name, "Existing");
}

#[test]
fn second_import_is_rejected_while_processing() {
    let mut workspace = logged_in();
    workspace.begin_import().unwrap();
    assert!(workspace.is_processing());
    assert!(matches!(
        workspace.begin_import(),
        Err(WorkspaceError::ImportInProgress)
    ));

    let failed = workspace.finish_import("notes.txt", b"x");
    assert!(failed.is_err());
    assert!(!workspace.is_processing());
    workspace.begin_import().unwrap();
}

#[test]
fn state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut workspace = Workspace::open(Box::new(FileStore::open(dir.path()).unwrap()));
        workspace.login(DEMO_USERNAME, DEMO_PASSWORD).unwrap();
        workspace
            .import_bytes("events.csv", b"When,Count\n2024-01-15,3\n")
            .unwrap();
        workspace.confirm_import().unwrap();
    }

    let store = FileStore::open(dir.path()).unwrap();
    assert_eq!(store.get(AUTH_KEY).unwrap().as_deref(), Some("true"));
    assert!(store.get(FIELDS_KEY).unwrap().is_some());
    assert!(store.get(ROWS_KEY).unwrap().is_some());

    let workspace = Workspace::open(Box::new(store));
    assert!(workspace.is_authenticated());
    let dataset = workspace.dataset();
    assert_eq!(dataset.fields[0].field_type, FieldType::Date);
    assert_eq!(
        dataset.rows[0].get("When").map(|v| v.to_string()),
        Some("2024-01-15".to_string())
    );
    assert_eq!(dataset.rows[0].get("Count"), Some(&FieldValue::Number(3.0)));
}

#[test]
fn logout_keeps_the_dataset() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut workspace = Workspace::open(Box::new(FileStore::open(dir.path()).unwrap()));
        workspace.login(DEMO_USERNAME, DEMO_PASSWORD).unwrap();
        workspace.add_field("Name", FieldType::Text, false).unwrap();
        workspace.logout().unwrap();
    }

    let workspace = Workspace::open(Box::new(FileStore::open(dir.path()).unwrap()));
    assert!(!workspace.is_authenticated());
    assert_eq!(workspace.dataset().fields.len(), 1);
}

#[test]
fn malformed_entries_are_ignored() {
    let mut store = MemoryStore::new();
    store.set(FIELDS_KEY, "not json".to_string()).unwrap();
    store.set(ROWS_KEY, "[]".to_string()).unwrap();

    let workspace = Workspace::open(Box::new(store));
    assert!(workspace.dataset().is_empty());
}

#[test]
fn charts_project_the_live_dataset() {
    let mut workspace = logged_in();
    workspace
        .import_bytes("sales.csv", b"Region,Q1,Q2\nNorth,10,20\nSouth,5,15\n")
        .unwrap();
    workspace.confirm_import().unwrap();

    let config = ChartConfig::new(ChartKind::Pie)
        .with_y_axis("Q1")
        .with_y_axis("Q2");
    let data = workspace.chart(&config);
    let slices: Vec<(&str, f64)> = data
        .slices
        .iter()
        .map(|s| (s.label.as_str(), s.value))
        .collect();
    assert_eq!(slices, vec![("Q1", 15.0), ("Q2", 35.0)]);
}

#[test]
fn renaming_an_imported_duplicate_keeps_both_values() {
    let mut workspace = logged_in();
    workspace.import_bytes("scores.csv", b"Score,Score\n1,2\n").unwrap();
    workspace.confirm_import().unwrap();

    let first = workspace.dataset().fields[0].id.clone();
    workspace
        .update_field(
            &first,
            FieldUpdate {
                name: Some("A".to_string()),
                ..FieldUpdate::default()
            },
        )
        .unwrap();

    let row = &workspace.dataset().rows[0];
    assert_eq!(row.get("A"), Some(&FieldValue::Number(1.0)));
    assert_eq!(row.get("Score (2)"), Some(&FieldValue::Number(2.0)));
}

#[test]
fn damaged_store_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(sheetviz::storage::STORE_FILE),
        r#"{"sheetviz.fields": "[{\"id\""#,
    )
    .unwrap();

    let workspace = Workspace::open(Box::new(FileStore::open(dir.path()).unwrap()));
    assert!(!workspace.is_authenticated());
    assert!(workspace.dataset().is_empty());
}
