//! Projection of the entity cache onto the display tree
//!
//! Where a node must appear is a function of the cache alone:
//!
//! - root: root tags, then "All Notes" and "Untagged Notes"
//! - tag: child tags, then every note carrying the tag
//! - "All Notes": root notes
//! - "Untagged Notes": root notes carrying no tag
//! - note: its subpages
//!
//! A note instance always brings its full subpage subtree along. Full builds
//! and incremental edits both go through the helpers here, so an edited tree
//! matches a fresh build of the edited cache.

use super::events::TreeEvent;
use super::hierarchy::{HierarchyTree, TreeError, TreeResult};
use super::node::{GroupKind, NodeContent, NodeKey};
use crate::entity::{EntityCache, EntityId, NoteId, TagId};
use std::collections::HashSet;

impl HierarchyTree {
    /// Build the full display tree from the cache
    pub fn build(cache: &EntityCache) -> TreeResult<Self> {
        let mut tree = Self::new();
        let root = tree.root();
        let all_notes = tree.group(GroupKind::AllNotes);
        let untagged = tree.group(GroupKind::UntaggedNotes);
        let none = HashSet::new();

        let root_tags: Vec<TagId> = cache.root_tags().map(|t| t.id).collect();
        for tag in root_tags {
            tree.materialize_tag(tag, root, cache)?;
        }

        let root_notes: Vec<(NoteId, bool)> = cache.root_notes().map(|n| (n.id, n.is_untagged())).collect();
        for (note, is_untagged) in root_notes {
            tree.materialize_note(note, all_notes, cache, &none)?;
            if is_untagged {
                tree.materialize_note(note, untagged, cache, &none)?;
            }
        }

        tree.clear_events();
        tree.push_event(TreeEvent::ModelReset);
        tracing::info!(
            nodes = tree.len(),
            notes = cache.note_count(),
            tags = cache.tag_count(),
            "built hierarchy tree"
        );
        Ok(tree)
    }

    /// Insert a note instance under `parent` together with its subpages.
    /// Nodes whose entity is in `expanded` start expanded.
    pub fn materialize_note(
        &mut self,
        note: NoteId,
        parent: NodeKey,
        cache: &EntityCache,
        expanded: &HashSet<EntityId>,
    ) -> TreeResult<NodeKey> {
        let (key, _) = self.insert(NodeContent::Note(note), parent, cache)?;
        if expanded.contains(&EntityId::Note(note)) {
            self.mark_expanded(key);
        }
        for sub in cache.subpages(note).to_vec() {
            if self.path(key).contains(&NodeContent::Note(sub)) {
                tracing::warn!(note = %note, subpage = %sub, "subpage cycle in cache, skipping");
                continue;
            }
            self.materialize_note(sub, key, cache, expanded)?;
        }
        Ok(key)
    }

    /// Insert the node of a tag under `parent` with its child tags and the
    /// notes carrying it
    pub fn materialize_tag(&mut self, tag: TagId, parent: NodeKey, cache: &EntityCache) -> TreeResult<NodeKey> {
        let (key, _) = self.insert(NodeContent::Tag(tag), parent, cache)?;
        for child in cache.child_tags(tag).to_vec() {
            if self.tag_node(child).is_some() {
                tracing::warn!(tag = %tag, child = %child, "tag already displayed, skipping");
                continue;
            }
            self.materialize_tag(child, key, cache)?;
        }
        let tagged: Vec<NoteId> = cache.notes_tagged(tag).collect();
        let none = HashSet::new();
        for note in tagged {
            self.materialize_note(note, key, cache, &none)?;
        }
        Ok(key)
    }

    /// Set the expanded flag directly, for nodes the view has not seen yet
    fn mark_expanded(&mut self, key: NodeKey) {
        if self.set_expanded(key, true).is_err() {
            tracing::warn!(node = %key, "cannot expand missing node");
        }
    }

    /// Entities expanded anywhere in the subtree of `key`
    pub fn expanded_within(&self, key: NodeKey) -> HashSet<EntityId> {
        self.subtree(key)
            .into_iter()
            .filter(|k| self.is_expanded(*k))
            .filter_map(|k| self.content(k).and_then(|c| c.entity()))
            .collect()
    }

    /// Nodes under which `note` must have a direct instance
    pub fn note_anchors(&self, note: NoteId, cache: &EntityCache) -> Vec<NodeKey> {
        let Some(entry) = cache.note(note) else {
            return Vec::new();
        };
        let mut anchors: Vec<NodeKey> = entry.tags.iter().filter_map(|t| self.tag_node(*t)).collect();
        match entry.parent {
            Some(parent) => anchors.extend(self.find_all_instances(EntityId::Note(parent))),
            None => {
                anchors.push(self.group(GroupKind::AllNotes));
                if entry.is_untagged() {
                    anchors.push(self.group(GroupKind::UntaggedNotes));
                }
            }
        }
        anchors
    }

    /// Bring the instances of a note in line with the cache: drop instances
    /// under anchors that no longer apply, add instances under new ones.
    /// New instances start expanded wherever an existing instance was.
    pub fn sync_note_placement(&mut self, note: NoteId, cache: &EntityCache) -> TreeResult<()> {
        let entity = EntityId::Note(note);
        if cache.note(note).is_none() {
            self.remove_entity(entity)?;
            return Ok(());
        }

        let anchors = self.note_anchors(note, cache);
        let wanted: HashSet<NodeKey> = anchors.iter().copied().collect();
        let instances = self.find_all_instances(entity);
        let template: HashSet<EntityId> = instances
            .iter()
            .flat_map(|k| self.expanded_within(*k))
            .collect();

        let mut kept: HashSet<NodeKey> = HashSet::new();
        for instance in instances {
            let Some(parent) = self.parent(instance) else {
                continue;
            };
            // one instance per anchor
            if wanted.contains(&parent) && kept.insert(parent) {
                continue;
            }
            self.remove(instance)?;
        }

        for anchor in anchors {
            if self.contains(anchor) && !kept.contains(&anchor) {
                self.materialize_note(note, anchor, cache, &template)?;
                kept.insert(anchor);
            }
        }
        Ok(())
    }

    /// Move or create the node of a tag so it sits under its cached parent
    pub fn sync_tag_placement(&mut self, tag: TagId, cache: &EntityCache) -> TreeResult<()> {
        let Some(entry) = cache.tag(tag) else {
            self.remove_entity(EntityId::Tag(tag))?;
            return Ok(());
        };
        let anchor = match entry.parent {
            Some(parent) => self
                .tag_node(parent)
                .ok_or(TreeError::NotDisplayed(EntityId::Tag(parent)))?,
            None => self.root(),
        };
        match self.tag_node(tag) {
            Some(key) if self.parent(key) == Some(anchor) => {}
            Some(key) => {
                self.move_node(key, anchor, cache)?;
            }
            None => {
                self.materialize_tag(tag, anchor, cache)?;
            }
        }
        Ok(())
    }

    /// Remove every instance of an entity; returns how many were removed
    pub fn remove_entity(&mut self, entity: EntityId) -> TreeResult<usize> {
        let mut removed = 0;
        for key in self.find_all_instances(entity) {
            // an earlier removal may already have taken this one along
            if self.contains(key) {
                self.remove(key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Announce a data change on every instance of an entity and re-sort
    /// each among its siblings
    pub fn refresh_entity(&mut self, entity: EntityId, cache: &EntityCache) -> TreeResult<()> {
        for key in self.find_all_instances(entity) {
            self.touch(key);
            self.reposition(key, cache)?;
        }
        Ok(())
    }
}
