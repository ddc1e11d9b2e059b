//! Promote and demote

mod common;

use common::{assert_consistent, instance_paths, node, notebook};
use notetree::{ApiCall, MemoryApi, Workspace};
use std::sync::Arc;

#[test]
fn demote_then_promote_restores_placement() {
    let mut nb = notebook();
    let before = instance_paths(&nb.ws, nb.groceries);

    // All Notes: Agenda, Groceries, Ideas, Report
    let groceries = node(&nb.ws, "all/n4");
    assert!(nb.ws.can_demote(groceries));
    assert!(nb.ws.demote(groceries).unwrap());
    assert_eq!(
        instance_paths(&nb.ws, nb.groceries),
        vec!["t1/t2/n3/n4", "all/n3/n4"]
    );
    assert_consistent(&nb.ws, &nb.api);

    assert!(nb.ws.promote(node(&nb.ws, "all/n3/n4")).unwrap());
    assert_eq!(instance_paths(&nb.ws, nb.groceries), before);
    assert_consistent(&nb.ws, &nb.api);
}

#[test]
fn first_of_its_kind_cannot_be_demoted() {
    let mut nb = notebook();
    let agenda = node(&nb.ws, "all/n3");
    assert!(!nb.ws.can_demote(agenda));
    assert!(!nb.ws.demote(agenda).unwrap());

    // Meetings is the only tag under Work; the notes after it do not count
    assert!(!nb.ws.can_demote(node(&nb.ws, "t1/t2")));
    assert!(nb.api.calls().is_empty());
}

#[test]
fn own_subpage_is_not_a_demote_target() {
    let api = Arc::new(MemoryApi::new());
    let work = api.seed_tag("Work", None);
    let beta = api.seed_note("Beta", None, &[work]);
    api.seed_note("Alpha", Some(beta), &[work]);
    let mut ws = Workspace::open(api.clone()).unwrap();
    api.clear_calls();

    // Work: Alpha, Beta; Alpha is a subpage of Beta
    let key = node(&ws, &format!("t{}/n{}", work, beta));
    assert!(!ws.can_demote(key));
    assert!(!ws.demote(key).unwrap());
    assert!(api.calls().is_empty());
}

#[test]
fn demote_skips_a_sibling_that_is_already_the_parent() {
    let api = Arc::new(MemoryApi::new());
    let work = api.seed_tag("Work", None);
    let beta = api.seed_note("Beta", None, &[work]);
    let cell = api.seed_note("Cell", Some(beta), &[work]);
    let mut ws = Workspace::open(api.clone()).unwrap();
    api.clear_calls();

    let key = node(&ws, &format!("t{}/n{}", work, cell));
    assert!(!ws.can_demote(key));
    assert!(!ws.demote(key).unwrap());
    assert!(api.calls().is_empty());

    // an earlier sibling further up is used instead
    let archive = api.seed_note("Archive", None, &[work]);
    ws.refresh().unwrap();
    api.clear_calls();
    let key = node(&ws, &format!("t{}/n{}", work, cell));
    assert!(ws.can_demote(key));
    assert!(ws.demote(key).unwrap());
    assert_eq!(ws.cache().note(cell).unwrap().parent, Some(archive));
    assert_eq!(api.calls(), vec![ApiCall::AttachNoteToParent]);
    assert_consistent(&ws, &api);
}

#[test]
fn demoting_a_tag_nests_it_under_the_previous_tag() {
    let mut nb = notebook();
    assert!(nb.ws.demote(node(&nb.ws, "t1")).unwrap());
    assert_eq!(instance_paths(&nb.ws, nb.work), vec!["t3/t1"]);
    assert_eq!(instance_paths(&nb.ws, nb.meetings), vec!["t3/t1/t2"]);
    assert_consistent(&nb.ws, &nb.api);
}

#[test]
fn promoting_a_nested_tag_moves_it_up_a_level() {
    let mut nb = notebook();
    assert!(nb.ws.can_promote(node(&nb.ws, "t1/t2")));
    assert!(nb.ws.promote(node(&nb.ws, "t1/t2")).unwrap());
    assert_eq!(instance_paths(&nb.ws, nb.meetings), vec!["t2"]);
    assert_eq!(nb.api.calls(), vec![ApiCall::DetachTagFromParent]);
    assert_consistent(&nb.ws, &nb.api);
}

#[test]
fn root_tags_and_group_members_cannot_be_promoted() {
    let mut nb = notebook();
    for path in ["t3", "all/n4", "untagged/n4", "all"] {
        let key = node(&nb.ws, path);
        assert!(!nb.ws.can_promote(key), "{}", path);
        assert!(!nb.ws.promote(key).unwrap(), "{}", path);
    }
    assert!(nb.api.calls().is_empty());
}

#[test]
fn promoting_a_subpage_makes_it_a_root_note() {
    let mut nb = notebook();
    assert!(nb.ws.promote(node(&nb.ws, "t1/n1/n2")).unwrap());
    assert_eq!(instance_paths(&nb.ws, nb.figures), vec!["all/n2", "untagged/n2"]);
    assert_consistent(&nb.ws, &nb.api);
}

#[test]
fn promoting_a_note_under_a_nested_tag_retags_it() {
    let mut nb = notebook();
    assert!(nb.ws.promote(node(&nb.ws, "t1/t2/n3")).unwrap());
    assert_eq!(
        nb.api.calls(),
        vec![ApiCall::AttachTagToNote, ApiCall::DetachTagFromNote]
    );
    let tags = &nb.ws.cache().note(nb.agenda).unwrap().tags;
    assert!(tags.contains(&nb.work) && !tags.contains(&nb.meetings));
    assert_eq!(instance_paths(&nb.ws, nb.agenda), vec!["t1/n3", "all/n3"]);
    assert_consistent(&nb.ws, &nb.api);
}

#[test]
fn promoting_a_note_under_a_root_tag_drops_the_tag() {
    let mut nb = notebook();
    assert!(nb.ws.promote(node(&nb.ws, "t3/n5")).unwrap());
    assert_eq!(instance_paths(&nb.ws, nb.ideas), vec!["t1/n5", "all/n5"]);

    // last tag gone: the note lands in Untagged Notes
    assert!(nb.ws.promote(node(&nb.ws, "t1/n5")).unwrap());
    assert_eq!(instance_paths(&nb.ws, nb.ideas), vec!["all/n5", "untagged/n5"]);
    assert_consistent(&nb.ws, &nb.api);
}

#[test]
fn failed_retag_is_undone() {
    let mut nb = notebook();
    let before = nb.ws.tree().snapshot(nb.ws.cache());
    nb.api.fail_next(ApiCall::DetachTagFromNote);

    assert!(nb.ws.promote(node(&nb.ws, "t1/t2/n3")).is_err());
    assert_eq!(
        nb.api.calls(),
        vec![
            ApiCall::AttachTagToNote,
            ApiCall::DetachTagFromNote,
            ApiCall::DetachTagFromNote
        ]
    );
    assert_eq!(nb.ws.tree().snapshot(nb.ws.cache()), before);
    assert_consistent(&nb.ws, &nb.api);
}

#[test]
fn failed_retag_undo_mirrors_the_server() {
    let mut nb = notebook();
    nb.api.fail_on(ApiCall::DetachTagFromNote);

    assert!(nb.ws.promote(node(&nb.ws, "t1/t2/n3")).is_err());
    // the server kept both tags, and so does the workspace
    assert_eq!(instance_paths(&nb.ws, nb.agenda), vec!["t1/t2/n3", "t1/n3", "all/n3"]);
    nb.api.clear_failures();
    assert_consistent(&nb.ws, &nb.api);
}
