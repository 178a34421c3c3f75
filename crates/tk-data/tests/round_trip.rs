use std::sync::Arc;

use tk_core::{CellValue, Row, SortDirection, SortSpec, TableState, TableStore};
use tk_data::{export_csv, import_csv, ImportConfig, ImportError, JsonFileStore, SnapshotStore, SnapshotWriter};

fn person(i: usize, role: &str) -> Row {
    let mut row = Row::new();
    row.insert("name", format!("Person {i}"));
    row.insert("email", format!("p{i}@example.com"));
    row.insert("age", (20 + i % 15) as i64);
    row.insert("role", role);
    row
}

#[test]
fn export_then_import_reproduces_visible_values() {
    let store = TableStore::new(TableState::seeded());
    store.add_column("note", "Note");
    let mut rows: Vec<Row> = store.snapshot().rows().to_vec();
    rows[0].insert("note", "likes \"quotes\", commas\nand newlines");
    rows[1].insert("note", "007");
    rows[2].insert("age", 22.5);
    store.set_rows(rows.clone());

    let text = export_csv(&store).unwrap();
    import_csv(&store, &text, &ImportConfig::default()).unwrap();

    let state = store.snapshot();
    assert_eq!(state.rows().len(), rows.len());
    for (original, imported) in rows.iter().zip(state.rows()) {
        for column in state.visible_columns() {
            assert_eq!(
                original.value(&column.id),
                imported.value(&column.id),
                "column {}",
                column.id
            );
        }
    }
}

#[test]
fn numeric_text_comes_back_as_number() {
    let store = TableStore::new(TableState::new());
    let mut row = person(1, "User");
    row.insert("age", "30");
    row.insert("email", "007");
    store.set_rows(vec![row]);

    let text = export_csv(&store).unwrap();
    import_csv(&store, &text, &ImportConfig::default()).unwrap();

    let state = store.snapshot();
    let imported = &state.rows()[0];
    assert_eq!(imported.value("age"), Some(&CellValue::Number(30.0)));
    assert_eq!(imported.value("email"), Some(&CellValue::from("007")));
    assert_eq!(imported.value("age").unwrap().to_string(), "30");
}

#[test]
fn import_scenario_adds_department() {
    let store = TableStore::new(TableState::new());
    store.set_page(4);
    let text = "Name,Email,Age,Role,Department\n\
        Ann,ann@example.com,30,Admin,Ops\n\
        Ben,ben@example.com,25,User,Sales\n\
        Cy,cy@example.com,41,Owner,Ops\n";

    let summary = import_csv(&store, text, &ImportConfig::default()).unwrap();
    assert_eq!(summary.added_columns, vec!["department".to_string()]);

    let state = store.snapshot();
    let ids: Vec<&str> = state.columns().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["name", "email", "age", "role", "department"]);
    assert_eq!(state.rows().len(), 3);
    assert_eq!(state.pagination().page, 0);
}

#[test]
fn required_columns_in_any_casing() {
    let store = TableStore::new(TableState::seeded());
    let ok = import_csv(&store, " nAmE ,EMAIL,Age,rOlE\nAnn,a@x.io,30,User\n", &ImportConfig::default());
    assert!(ok.is_ok());

    let before = store.snapshot();
    let err = import_csv(&store, "Email,Phone\na@x.io,555\n", &ImportConfig::default()).unwrap_err();
    assert_eq!(err, ImportError::MissingColumns(vec!["name".into(), "age".into(), "role".into()]));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn search_admin_over_seeded_rows() {
    let store = TableStore::new(TableState::seeded());
    store.set_search("admin");
    let state = store.snapshot();
    let result = state.query();
    assert_eq!(result.total_matched, 5);
    assert!(result.page_rows.iter().all(|r| r.value("role") == Some(&CellValue::from("Admin"))));
}

#[test]
fn pagination_of_twenty_three_rows() {
    let rows: Vec<Row> = (0..23).map(|i| person(i, "User")).collect();
    let store = TableStore::new(TableState::new());
    store.set_rows(rows);

    let sizes: Vec<usize> = (0..4)
        .map(|page| {
            store.set_page(page);
            let state = store.snapshot();
            let result = state.query();
            assert_eq!(result.total_matched, 23);
            result.page_rows.len()
        })
        .collect();
    assert_eq!(sizes, vec![10, 10, 3, 0]);
}

#[test]
fn sort_is_stable_in_both_directions() {
    let roles = ["User", "Admin", "User", "Owner", "Admin", "User"];
    let rows: Vec<Row> = roles.iter().enumerate().map(|(i, r)| person(i, r)).collect();
    let store = TableStore::new(TableState::new());
    store.set_rows(rows);

    for direction in [SortDirection::Asc, SortDirection::Desc] {
        store.set_sorting(SortSpec::new("role", Some(direction)));
        let state = store.snapshot();
        let result = state.query();
        let admins: Vec<String> = result
            .page_rows
            .iter()
            .filter(|r| r.value("role") == Some(&CellValue::from("Admin")))
            .map(|r| r.value("name").unwrap().to_string())
            .collect();
        assert_eq!(admins, vec!["Person 1", "Person 4"]);
    }
}

#[tokio::test]
async fn persisted_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.json");

    let store = TableStore::new(TableState::seeded());
    let writer = SnapshotWriter::spawn(Arc::new(JsonFileStore::new(&path)), None);
    writer.attach(&store);
    store.set_sorting(SortSpec::new("age", Some(SortDirection::Desc)));
    store.toggle_column_visibility("email");
    writer.close().await.unwrap();

    let restored = JsonFileStore::new(&path).load().await.unwrap().unwrap();
    assert_eq!(restored.sorting(), store.snapshot().sorting());
    assert_eq!(restored.visible_columns().len(), 3);
    assert_eq!(restored.rows(), store.snapshot().rows());
}
