//! Workspace running against the SQLite server

use notetree::{HierarchyType, NoteApi, OpError, Placement, SqliteApi, Workspace};
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn edits_persist_across_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("notes.db");

    let snapshot = {
        let mut ws = Workspace::open(Arc::new(SqliteApi::open(&db).unwrap())).unwrap();
        let work = ws.create_tag("Work", None).unwrap();
        let meetings = ws.create_tag("Meetings", Some(work)).unwrap();
        let report = ws.create_note("Report", "draft", Placement::UnderTag(work)).unwrap();
        ws.create_note("Figures", "", Placement::UnderNote(report)).unwrap();
        let agenda = ws.create_note("Agenda", "", Placement::UnderTag(meetings)).unwrap();
        ws.create_note("Groceries", "", Placement::Root).unwrap();
        ws.rename(agenda.into(), "Minutes").unwrap();
        ws.tree().snapshot(ws.cache())
    };

    let ws = Workspace::open(Arc::new(SqliteApi::open(&db).unwrap())).unwrap();
    assert_eq!(ws.tree().snapshot(ws.cache()), snapshot);
    assert_eq!(ws.cache().note_count(), 4);
}

#[test]
fn server_side_cycle_check_backs_up_the_local_one() {
    let mut ws = Workspace::open(Arc::new(SqliteApi::open_in_memory().unwrap())).unwrap();
    let a = ws.create_note("A", "", Placement::Root).unwrap();
    let b = ws.create_note("B", "", Placement::UnderNote(a)).unwrap();

    assert!(matches!(ws.move_note(a, Some(b)), Err(OpError::CyclicMove { .. })));
    // bypass the local check: the server refuses as well
    assert!(ws
        .api()
        .attach_note_to_parent(a, b, HierarchyType::Block)
        .is_err());
}

#[test]
fn deletes_cascade_locally_and_remotely() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("notes.db");
    let api = Arc::new(SqliteApi::open(&db).unwrap());
    let mut ws = Workspace::open(api.clone()).unwrap();

    let work = ws.create_tag("Work", None).unwrap();
    let meetings = ws.create_tag("Meetings", Some(work)).unwrap();
    let agenda = ws.create_note("Agenda", "", Placement::UnderTag(meetings)).unwrap();
    let parent = ws.create_note("Parent", "", Placement::Root).unwrap();
    ws.create_note("Child", "", Placement::UnderNote(parent)).unwrap();

    ws.delete(work.into()).unwrap();
    ws.delete(parent.into()).unwrap();

    let local = ws.tree().snapshot(ws.cache());
    let fresh = Workspace::open(api).unwrap();
    assert_eq!(fresh.tree().snapshot(fresh.cache()), local);
    assert_eq!(fresh.cache().note_count(), 1);
    assert!(fresh.cache().note(agenda).unwrap().tags.is_empty());
}
