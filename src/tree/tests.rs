//! Structural tests for the display tree

use super::*;
use crate::entity::{EntityCache, EntityId, Note, NoteId, Tag, TagId};
use rand::seq::SliceRandom;
use std::collections::HashMap;

fn n(id: i64) -> NoteId {
    NoteId::new(id)
}

fn t(id: i64) -> TagId {
    TagId::new(id)
}

/// Home(3) and Work(1) > Meetings(2); Report(10) > Figures(11) tagged Work,
/// Agenda(12) tagged Meetings, Groceries(20) untagged, Ideas(30) tagged
/// Work and Home.
fn fixture() -> EntityCache {
    let mut cache = EntityCache::new();
    cache.insert_tag(Tag::new(t(1), "Work"));
    cache.insert_tag(Tag::new(t(2), "Meetings").with_parent(t(1)));
    cache.insert_tag(Tag::new(t(3), "Home"));
    cache.insert_note(Note::new(n(10), "Report").with_tag(t(1)));
    cache.insert_note(Note::new(n(11), "Figures").with_parent(n(10)));
    cache.insert_note(Note::new(n(12), "Agenda").with_tag(t(2)));
    cache.insert_note(Note::new(n(20), "Groceries"));
    cache.insert_note(Note::new(n(30), "Ideas").with_tag(t(1)).with_tag(t(3)));
    cache
}

fn labels(tree: &HierarchyTree, parent: NodeKey, cache: &EntityCache) -> Vec<String> {
    tree.children(parent).iter().map(|k| tree.label(*k, cache)).collect()
}

fn expansion(tree: &HierarchyTree) -> HashMap<NodeKey, bool> {
    tree.depth_first().into_iter().map(|k| (k, tree.is_expanded(k))).collect()
}

#[test]
fn build_places_tags_before_groups() {
    let cache = fixture();
    let tree = HierarchyTree::build(&cache).unwrap();
    assert_eq!(
        labels(&tree, tree.root(), &cache),
        vec!["Home", "Work", "All Notes", "Untagged Notes"]
    );
    let work = tree.tag_node(t(1)).unwrap();
    assert_eq!(labels(&tree, work, &cache), vec!["Meetings", "Ideas", "Report"]);
    let untagged = tree.group(GroupKind::UntaggedNotes);
    assert_eq!(labels(&tree, untagged, &cache), vec!["Groceries"]);
}

#[test]
fn build_journals_a_single_reset() {
    let cache = fixture();
    let tree = HierarchyTree::build(&cache).unwrap();
    assert_eq!(tree.events(), &[TreeEvent::ModelReset]);
}

#[test]
fn tagged_note_has_one_instance_per_tag_plus_all_notes() {
    let cache = fixture();
    let tree = HierarchyTree::build(&cache).unwrap();
    let untagged = tree.group(GroupKind::UntaggedNotes);

    for note in cache.root_notes() {
        let instances = tree.find_all_instances(EntityId::Note(note.id));
        let under_untagged = instances.iter().filter(|k| tree.parent(**k) == Some(untagged)).count();
        if note.tags.is_empty() {
            assert_eq!(instances.len(), 2, "{}", note.title);
            assert_eq!(under_untagged, 1);
        } else {
            assert_eq!(instances.len(), note.tags.len() + 1, "{}", note.title);
            assert_eq!(under_untagged, 0);
        }
    }
}

#[test]
fn subpages_follow_every_instance_of_their_parent() {
    let cache = fixture();
    let tree = HierarchyTree::build(&cache).unwrap();
    let parents: Vec<_> = tree
        .find_all_instances(EntityId::Note(n(11)))
        .into_iter()
        .map(|k| tree.parent(k).unwrap())
        .collect();
    assert_eq!(parents, tree.find_all_instances(EntityId::Note(n(10))));
}

#[test]
fn tags_are_never_duplicated() {
    let cache = fixture();
    let tree = HierarchyTree::build(&cache).unwrap();
    for tag in cache.tags() {
        assert_eq!(tree.find_all_instances(EntityId::Tag(tag.id)).len(), 1);
    }
}

#[test]
fn instances_come_back_in_document_order() {
    let cache = fixture();
    let tree = HierarchyTree::build(&cache).unwrap();
    let paths: Vec<_> = tree
        .find_all_instances(EntityId::Note(n(30)))
        .into_iter()
        .map(|k| tree.path_string(k))
        .collect();
    assert_eq!(paths, vec!["t3/n30", "t1/n30", "all/n30"]);
}

#[test]
fn insertion_in_any_order_yields_sorted_children() {
    let mut cache = EntityCache::new();
    cache.insert_tag(Tag::new(t(1), "Inbox"));
    let names = ["delta", "Alpha", "charlie", "bravo", "Echo", "alpha two", "foxtrot", "golf"];
    for (i, name) in names.iter().enumerate() {
        cache.insert_note(Note::new(n(100 + i as i64), *name));
    }

    let mut rng = rand::thread_rng();
    for _ in 0..10 {
        let mut tree = HierarchyTree::new();
        let (inbox, _) = tree.insert(NodeContent::Tag(t(1)), tree.root(), &cache).unwrap();
        let mut order: Vec<NoteId> = cache.notes().map(|n| n.id).collect();
        order.shuffle(&mut rng);
        for note in order {
            tree.insert(NodeContent::Note(note), inbox, &cache).unwrap();
        }
        let keys: Vec<SortKey> = tree
            .children(inbox)
            .iter()
            .map(|k| SortKey::of(&tree.content(*k).unwrap(), &cache))
            .collect();
        assert!(is_sorted(&keys));
    }
}

#[test]
fn resorting_a_sorted_list_changes_nothing() {
    let cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    tree.drain_events();
    let work = tree.tag_node(t(1)).unwrap();
    let before = tree.children(work).to_vec();
    for key in before.clone() {
        tree.reposition(key, &cache).unwrap();
    }
    assert_eq!(tree.children(work), before.as_slice());
    assert!(tree.events().is_empty());
}

#[test]
fn insert_reports_sorted_position() {
    let mut cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    tree.drain_events();
    cache.insert_note(Note::new(n(40), "Minutes").with_tag(t(1)));
    let work = tree.tag_node(t(1)).unwrap();
    let (key, position) = tree.insert(NodeContent::Note(n(40)), work, &cache).unwrap();
    // Meetings, Ideas, Minutes, Report
    assert_eq!(position, 2);
    assert_eq!(
        tree.drain_events(),
        vec![TreeEvent::RowsInserted { parent: work, position: 2, node: key }]
    );
}

#[test]
fn placement_rules_are_enforced() {
    let cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    let report = tree.find_all_instances(EntityId::Note(n(10)))[0];
    let err = tree.insert(NodeContent::Tag(t(3)), report, &cache).unwrap_err();
    assert_eq!(err, TreeError::InvalidParent { child: NodeKind::Tag, parent: NodeKind::Note });

    let all = tree.group(GroupKind::AllNotes);
    assert_eq!(tree.remove(all), Err(TreeError::Synthetic(all)));
}

#[test]
fn moving_a_node_under_its_descendant_is_rejected() {
    let cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    let before = tree.snapshot(&cache);
    let work = tree.tag_node(t(1)).unwrap();
    let meetings = tree.tag_node(t(2)).unwrap();

    assert_eq!(
        tree.move_node(work, meetings, &cache),
        Err(TreeError::CyclicMove { moved: work, target: meetings })
    );
    assert_eq!(tree.move_node(work, work, &cache), Err(TreeError::CyclicMove { moved: work, target: work }));
    assert_eq!(tree.snapshot(&cache), before);
}

#[test]
fn move_node_keeps_subtree_expansion() {
    let cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    let meetings = tree.tag_node(t(2)).unwrap();
    let agenda = tree.child_instance(meetings, EntityId::Note(n(12))).unwrap();
    tree.set_expanded(meetings, true).unwrap();

    let home = tree.tag_node(t(3)).unwrap();
    tree.move_node(meetings, home, &cache).unwrap();
    assert_eq!(tree.parent(meetings), Some(home));
    assert!(tree.is_expanded(meetings));
    assert_eq!(tree.parent(agenda), Some(meetings));
}

#[test]
fn removing_a_subtree_drops_index_entries_and_selection() {
    let cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    let work_report = tree.child_instance(tree.tag_node(t(1)).unwrap(), EntityId::Note(n(10))).unwrap();
    let figures = tree.children(work_report)[0];
    tree.select(Some(figures)).unwrap();

    tree.remove(work_report).unwrap();
    assert!(!tree.contains(figures));
    assert_eq!(tree.selected(), None);
    assert_eq!(tree.find_all_instances(EntityId::Note(n(10))).len(), 1);
    assert_eq!(tree.find_all_instances(EntityId::Note(n(11))).len(), 1);
}

#[test]
fn paths_resolve_back_to_their_node() {
    let cache = fixture();
    let tree = HierarchyTree::build(&cache).unwrap();
    for key in tree.depth_first() {
        let path = tree.path_string(key);
        assert_eq!(tree.resolve_path(&path), Ok(key), "{}", path);
    }
    assert!(tree.resolve_path("t1/n99").is_err());
    assert!(tree.resolve_path("bogus").is_err());
}

#[test]
fn previous_sibling_skips_other_kinds() {
    let cache = fixture();
    let tree = HierarchyTree::build(&cache).unwrap();
    let work = tree.tag_node(t(1)).unwrap();
    let ideas = tree.child_instance(work, EntityId::Note(n(30))).unwrap();
    let report = tree.child_instance(work, EntityId::Note(n(10))).unwrap();
    assert_eq!(tree.previous_sibling(report), Some(ideas));
    // Meetings precedes Ideas but is a tag
    assert_eq!(tree.previous_sibling(ideas), None);
}

#[test]
fn save_then_restore_is_idempotent() {
    let cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    for path in ["t1", "t1/n10", "all", "all/n10", "t1/t2"] {
        let key = tree.resolve_path(path).unwrap();
        tree.set_expanded(key, true).unwrap();
    }
    tree.select(Some(tree.resolve_path("t1/n10/n11").unwrap())).unwrap();

    let before = expansion(&tree);
    let selected = tree.selected();
    let state = save_state(&tree);
    restore_state(&mut tree, &state).unwrap();

    assert_eq!(expansion(&tree), before);
    assert_eq!(tree.selected(), selected);
}

#[test]
fn state_survives_a_rebuild() {
    let cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    tree.expand_to(tree.resolve_path("t1/t2").unwrap()).unwrap();
    tree.set_expanded(tree.group(GroupKind::UntaggedNotes), true).unwrap();
    tree.select(Some(tree.resolve_path("all/n30").unwrap())).unwrap();
    let state = tree.save_state();

    let mut rebuilt = HierarchyTree::build(&cache).unwrap();
    rebuilt.restore_state(&state).unwrap();

    assert_eq!(rebuilt.save_state(), state);
    assert!(rebuilt.is_expanded(rebuilt.resolve_path("t1").unwrap()));
    assert!(rebuilt.is_expanded(rebuilt.group(GroupKind::UntaggedNotes)));
    assert_eq!(rebuilt.selected(), Some(rebuilt.resolve_path("all/n30").unwrap()));
}

#[test]
fn stale_paths_fall_back_to_every_instance() {
    let mut cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    tree.set_expanded(tree.resolve_path("t1/n10").unwrap(), true).unwrap();
    tree.select(Some(tree.resolve_path("t1/n10/n11").unwrap())).unwrap();
    let state = tree.save_state();

    // Report moves under Groceries; its old paths no longer resolve
    cache.set_note_parent(n(10), Some(n(20)), Default::default());
    let mut rebuilt = HierarchyTree::build(&cache).unwrap();
    rebuilt.restore_state(&state).unwrap();

    for key in rebuilt.find_all_instances(EntityId::Note(n(10))) {
        assert!(rebuilt.is_expanded(key), "{}", rebuilt.path_string(key));
    }
    let first = rebuilt.find_all_instances(EntityId::Note(n(11)))[0];
    assert_eq!(rebuilt.selected(), Some(first));
}

#[test]
fn sync_note_placement_matches_a_rebuild() {
    let mut cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();

    cache.remove_note_tag(n(10), t(1));
    tree.sync_note_placement(n(10), &cache).unwrap();
    assert_eq!(tree.snapshot(&cache), HierarchyTree::build(&cache).unwrap().snapshot(&cache));

    cache.set_note_parent(n(20), Some(n(30)), Default::default());
    tree.sync_note_placement(n(20), &cache).unwrap();
    assert_eq!(tree.snapshot(&cache), HierarchyTree::build(&cache).unwrap().snapshot(&cache));
}

#[test]
fn new_instances_copy_expansion_of_existing_ones() {
    let mut cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    let report = tree.resolve_path("all/n10").unwrap();
    tree.set_expanded(report, true).unwrap();

    cache.add_note_tag(n(10), t(3));
    tree.sync_note_placement(n(10), &cache).unwrap();
    let copy = tree.resolve_path("t3/n10").unwrap();
    assert!(tree.is_expanded(copy));
}

#[test]
fn rename_repositions_every_instance() {
    let mut cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    tree.drain_events();

    cache.rename(EntityId::Note(n(30)), "Zettel");
    tree.refresh_entity(EntityId::Note(n(30)), &cache).unwrap();

    let work = tree.tag_node(t(1)).unwrap();
    assert_eq!(labels(&tree, work, &cache), vec!["Meetings", "Report", "Zettel"]);
    let changed = tree
        .events()
        .iter()
        .filter(|e| matches!(e, TreeEvent::DataChanged { .. }))
        .count();
    assert_eq!(changed, 3);
}

#[test]
fn inserted_rows_are_in_place_when_journaled() {
    let mut cache = fixture();
    let mut tree = HierarchyTree::build(&cache).unwrap();
    tree.drain_events();

    cache.insert_note(Note::new(n(40), "Zed").with_tag(t(3)));
    tree.sync_note_placement(n(40), &cache).unwrap();

    let events = tree.drain_events();
    assert!(!events.is_empty());
    for event in events {
        if let TreeEvent::RowsInserted { parent, position, node } = event {
            assert_eq!(tree.children(parent)[position], node);
            assert_eq!(tree.content(node), Some(NodeContent::Note(n(40))));
        }
    }
}
