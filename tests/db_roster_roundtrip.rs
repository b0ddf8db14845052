use coursebook::db::{self, StoredRoster};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn row(v: Value) -> Map<String, Value> {
    v.as_object().cloned().expect("row object")
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn save_then_load_is_stable() {
    let conn = db::open_db(&temp_dir("coursebook-db-save")).expect("open db");
    let rows = vec![
        row(json!({ "Roll": "1", "Name": "Asha" })),
        row(json!({ "Roll": "2", "Name": "Ravi" })),
    ];
    let cols = headers(&["Roll", "Name"]);
    let meta = json!({ "courseCode": "CS301" });

    let summary = db::save_roster(&conn, "CS301", &rows, Some(&cols), Some(&meta)).expect("save");
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.rows_replaced, 0);

    let expected = StoredRoster::Structured {
        headers: cols.clone(),
        rows: rows.clone(),
        metadata: Some(meta.clone()),
    };
    assert_eq!(db::load_roster(&conn, "CS301").expect("load"), expected);

    // Saving the same payload again replaces rather than appends.
    let summary = db::save_roster(&conn, "CS301", &rows, Some(&cols), Some(&meta)).expect("save");
    assert_eq!(summary.rows_replaced, 2);
    assert_eq!(db::load_roster(&conn, "CS301").expect("load"), expected);
}

#[test]
fn rows_are_laid_out_in_header_order() {
    let conn = db::open_db(&temp_dir("coursebook-db-conform")).expect("open db");
    let rows = vec![row(json!({ "Name": "Asha", "Extra": "x" }))];
    db::save_roster(&conn, "C1", &rows, Some(&headers(&["Roll", "Name"])), None).expect("save");

    let (_, loaded, _) = db::load_roster(&conn, "C1").expect("load").into_parts();
    let keys: Vec<&String> = loaded[0].keys().collect();
    assert_eq!(keys, vec!["Roll", "Name", "Extra"]);
    assert_eq!(loaded[0]["Roll"], json!(""));
}

#[test]
fn headers_default_to_first_row_keys() {
    let conn = db::open_db(&temp_dir("coursebook-db-derive")).expect("open db");
    let rows = vec![row(json!({ "PRN": "7", "Student": "Meera" }))];
    db::save_roster(&conn, "C2", &rows, None, None).expect("save");
    let (cols, _, _) = db::load_roster(&conn, "C2").expect("load").into_parts();
    assert_eq!(cols, vec!["PRN", "Student"]);
}

#[test]
fn absent_metadata_keeps_previous_metadata() {
    let conn = db::open_db(&temp_dir("coursebook-db-meta")).expect("open db");
    let rows = vec![row(json!({ "Roll": "1" }))];
    let cols = headers(&["Roll"]);
    let meta = json!({ "semester": "5" });
    db::save_roster(&conn, "C3", &rows, Some(&cols), Some(&meta)).expect("save");
    db::save_roster(&conn, "C3", &rows, Some(&cols), None).expect("save without metadata");

    let (_, _, stored) = db::load_roster(&conn, "C3").expect("load").into_parts();
    assert_eq!(stored, Some(meta));
}

#[test]
fn rows_without_course_record_load_as_legacy() {
    let conn = db::open_db(&temp_dir("coursebook-db-legacy")).expect("open db");
    conn.execute(
        "INSERT INTO students(course_id, position, data) VALUES('OLD', 0, ?)",
        [r#"{"Roll":"9","Name":"Old Timer"}"#],
    )
    .expect("insert object row");
    conn.execute(
        "INSERT INTO students(course_id, position, data) VALUES('OLD', 1, ?)",
        [r#"["10","Array Row"]"#],
    )
    .expect("insert array row");

    let loaded = db::load_roster(&conn, "OLD").expect("load");
    let StoredRoster::Legacy(rows) = &loaded else {
        panic!("expected legacy roster, got {:?}", loaded);
    };
    assert_eq!(rows[1]["Column 2"], json!("Array Row"));

    let (cols, rows, meta) = loaded.into_parts();
    assert_eq!(cols, vec!["Roll", "Name"]);
    assert_eq!(rows.len(), 2);
    assert!(meta.is_none());
    assert_eq!(db::list_courses(&conn).expect("list"), vec!["OLD"]);
}

#[test]
fn delete_removes_course_everywhere() {
    let conn = db::open_db(&temp_dir("coursebook-db-delete")).expect("open db");
    let rows = vec![row(json!({ "Roll": "1" }))];
    db::save_roster(&conn, "B", &rows, None, None).expect("save B");
    db::save_roster(&conn, "A", &rows, None, None).expect("save A");
    assert_eq!(db::list_courses(&conn).expect("list"), vec!["A", "B"]);

    assert_eq!(db::delete_course(&conn, "A").expect("delete"), 1);
    assert_eq!(db::list_courses(&conn).expect("list"), vec!["B"]);
    assert_eq!(db::load_roster(&conn, "A").expect("load"), StoredRoster::Missing);
    assert_eq!(db::delete_course(&conn, "A").expect("delete again"), 0);
}

#[test]
fn unknown_course_is_missing() {
    let conn = db::open_db(&temp_dir("coursebook-db-missing")).expect("open db");
    assert_eq!(db::load_roster(&conn, "nope").expect("load"), StoredRoster::Missing);
    assert!(db::list_courses(&conn).expect("list").is_empty());
}

#[test]
fn named_tables_insert_update_and_list() {
    let conn = db::open_db(&temp_dir("coursebook-db-tables")).expect("open db");
    let first = db::save_table(&conn, None, None, &json!({ "cells": [[1, 2]] })).expect("insert");
    assert_eq!(first.name, "Untitled Table");

    let second =
        db::save_table(&conn, None, Some("Attainment"), &json!({ "cells": [] })).expect("insert");
    assert!(second.id > first.id);

    let updated =
        db::save_table(&conn, Some(first.id), Some("  "), &json!({ "cells": [[3]] })).expect("update");
    assert_eq!(updated.id, first.id);
    assert_eq!(updated.name, "Untitled Table");
    assert_eq!(updated.data, json!({ "cells": [[3]] }));
    assert_eq!(updated.created_at, first.created_at);

    // An id that does not exist yet creates a fresh table.
    let created = db::save_table(&conn, Some(999), Some("New"), &json!([])).expect("upsert");
    assert_ne!(created.id, 999);

    let names: Vec<String> = db::list_tables(&conn)
        .expect("list")
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["Untitled Table", "Attainment", "New"]);
    assert!(db::get_table(&conn, 12345).expect("get").is_none());
}

#[test]
fn settings_round_trip_and_overwrite() {
    let conn = db::open_db(&temp_dir("coursebook-db-settings")).expect("open db");
    assert!(db::settings_get_json(&conn, "k").expect("get").is_none());
    db::settings_set_json(&conn, "k", &json!({ "a": 1 })).expect("set");
    db::settings_set_json(&conn, "k", &json!({ "a": 2 })).expect("overwrite");
    assert_eq!(db::settings_get_json(&conn, "k").expect("get"), Some(json!({ "a": 2 })));
}

#[test]
fn invalid_header_lists_are_refused_before_writing() {
    let conn = db::open_db(&temp_dir("coursebook-db-badheaders")).expect("open db");
    let rows = vec![row(json!({ "Roll": "1", "Name": "A" }))];
    let bad = headers(&["Roll", "Roll", "", " Name "]);
    assert!(db::header_problem(&bad).is_some());
    assert!(db::header_problem(&headers(&["Roll", "Name"])).is_none());

    db::save_roster(&conn, "C", &rows, Some(&bad), None).expect_err("duplicate headers");
    assert_eq!(db::load_roster(&conn, "C").expect("load"), StoredRoster::Missing);
}
