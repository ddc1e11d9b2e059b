//! EntityCache: in-memory projection of the remote notes and tags

use super::types::{EntityId, HierarchyType, Note, NoteId, Tag, TagId};
use crate::api::{NoteTreeRecord, TagTreeRecord};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Canonical note and tag records, keyed by id
///
/// Tree nodes store ids into this cache rather than copies, so an edit here
/// is seen through every displayed instance of the entity.
#[derive(Debug, Clone, Default)]
pub struct EntityCache {
    notes: BTreeMap<NoteId, Note>,
    tags: BTreeMap<TagId, Tag>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the cache from a full notes fetch and a full tags fetch
    pub fn from_records(notes: &[NoteTreeRecord], tags: &[TagTreeRecord]) -> Self {
        let mut cache = Self::new();
        for record in notes {
            cache.load_note_record(record, None);
        }
        for record in tags {
            cache.load_tag_record(record, None);
        }
        cache
    }

    fn load_note_record(&mut self, record: &NoteTreeRecord, parent: Option<NoteId>) {
        let note = Note {
            id: record.id,
            title: record.title.clone(),
            content: record.content.clone(),
            tags: record.tags.iter().map(|t| t.id).collect(),
            parent,
            hierarchy_type: record.hierarchy_type,
            children: record.children.iter().map(|c| c.id).collect(),
        };
        self.notes.insert(note.id, note);
        for child in &record.children {
            self.load_note_record(child, Some(record.id));
        }
    }

    fn load_tag_record(&mut self, record: &TagTreeRecord, parent: Option<TagId>) {
        let tag = Tag {
            id: record.id,
            name: record.name.clone(),
            parent,
            children: record.children.iter().map(|c| c.id).collect(),
        };
        self.tags.insert(tag.id, tag);
        for note_ref in &record.notes {
            match self.notes.get_mut(&note_ref.id) {
                Some(note) => {
                    note.tags.insert(record.id);
                }
                None => tracing::warn!(
                    tag = %record.id,
                    note = %note_ref.id,
                    "tag references a note missing from the notes tree, skipping"
                ),
            }
        }
        for child in &record.children {
            self.load_tag_record(child, Some(record.id));
        }
    }

    // === Lookups ===

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }

    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(&id)
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        match id {
            EntityId::Note(n) => self.notes.contains_key(&n),
            EntityId::Tag(t) => self.tags.contains_key(&t),
        }
    }

    /// Display name of an entity (note title or tag name)
    pub fn label(&self, id: EntityId) -> Option<&str> {
        match id {
            EntityId::Note(n) => self.notes.get(&n).map(|n| n.title.as_str()),
            EntityId::Tag(t) => self.tags.get(&t).map(|t| t.name.as_str()),
        }
    }

    /// Notes that are not a subpage of another note
    pub fn root_notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values().filter(|n| n.parent.is_none())
    }

    /// Tags without a parent tag
    pub fn root_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values().filter(|t| t.parent.is_none())
    }

    pub fn subpages(&self, id: NoteId) -> &[NoteId] {
        self.notes.get(&id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_tags(&self, id: TagId) -> &[TagId] {
        self.tags.get(&id).map(|t| t.children.as_slice()).unwrap_or(&[])
    }

    /// Notes directly carrying the given tag, in id order
    pub fn notes_tagged(&self, tag: TagId) -> impl Iterator<Item = NoteId> + '_ {
        self.notes
            .values()
            .filter(move |n| n.tags.contains(&tag))
            .map(|n| n.id)
    }

    /// True if `candidate` is `ancestor` or sits anywhere below it in the
    /// subpage hierarchy
    pub fn is_note_within(&self, candidate: NoteId, ancestor: NoteId) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.notes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// True if `candidate` is `ancestor` or one of its descendant tags
    pub fn is_tag_within(&self, candidate: TagId, ancestor: TagId) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.tags.get(&id).and_then(|t| t.parent);
        }
        false
    }

    /// The note and all of its subpages, pre-order
    pub fn note_subtree(&self, id: NoteId) -> Vec<NoteId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.notes.contains_key(&current) || out.contains(&current) {
                continue;
            }
            out.push(current);
            stack.extend(self.subpages(current).iter().rev().copied());
        }
        out
    }

    /// The tag and all of its descendant tags, pre-order
    pub fn tag_subtree(&self, id: TagId) -> Vec<TagId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.tags.contains_key(&current) || out.contains(&current) {
                continue;
            }
            out.push(current);
            stack.extend(self.child_tags(current).iter().rev().copied());
        }
        out
    }

    // === Mutations (applied after the remote call succeeded) ===

    /// Insert a note, linking it into its parent's subpage list
    pub fn insert_note(&mut self, note: Note) {
        if let Some(parent) = note.parent.and_then(|p| self.notes.get_mut(&p)) {
            if !parent.children.contains(&note.id) {
                parent.children.push(note.id);
            }
        }
        self.notes.insert(note.id, note);
    }

    /// Insert a tag, linking it into its parent's child list
    pub fn insert_tag(&mut self, tag: Tag) {
        if let Some(parent) = tag.parent.and_then(|p| self.tags.get_mut(&p)) {
            if !parent.children.contains(&tag.id) {
                parent.children.push(tag.id);
            }
        }
        self.tags.insert(tag.id, tag);
    }

    /// Reparent a note; returns false if the note is unknown
    pub fn set_note_parent(&mut self, id: NoteId, parent: Option<NoteId>, hierarchy_type: HierarchyType) -> bool {
        let Some(old_parent) = self.notes.get(&id).map(|n| n.parent) else {
            return false;
        };
        if let Some(old) = old_parent.and_then(|p| self.notes.get_mut(&p)) {
            old.children.retain(|c| *c != id);
        }
        if let Some(new) = parent.and_then(|p| self.notes.get_mut(&p)) {
            new.children.push(id);
        }
        if let Some(note) = self.notes.get_mut(&id) {
            note.parent = parent;
            note.hierarchy_type = hierarchy_type;
        }
        true
    }

    /// Reparent a tag; returns false if the tag is unknown
    pub fn set_tag_parent(&mut self, id: TagId, parent: Option<TagId>) -> bool {
        let Some(old_parent) = self.tags.get(&id).map(|t| t.parent) else {
            return false;
        };
        if let Some(old) = old_parent.and_then(|p| self.tags.get_mut(&p)) {
            old.children.retain(|c| *c != id);
        }
        if let Some(new) = parent.and_then(|p| self.tags.get_mut(&p)) {
            new.children.push(id);
        }
        if let Some(tag) = self.tags.get_mut(&id) {
            tag.parent = parent;
        }
        true
    }

    /// Add a tag to a note's tag set; returns true if it was newly added
    pub fn add_note_tag(&mut self, note: NoteId, tag: TagId) -> bool {
        self.notes.get_mut(&note).map(|n| n.tags.insert(tag)).unwrap_or(false)
    }

    /// Remove a tag from a note's tag set; returns true if it was present
    pub fn remove_note_tag(&mut self, note: NoteId, tag: TagId) -> bool {
        self.notes.get_mut(&note).map(|n| n.tags.remove(&tag)).unwrap_or(false)
    }

    /// Set the title or name of an entity; returns false if unknown
    pub fn rename(&mut self, id: EntityId, name: impl Into<String>) -> bool {
        match id {
            EntityId::Note(n) => self.notes.get_mut(&n).map(|n| n.title = name.into()).is_some(),
            EntityId::Tag(t) => self.tags.get_mut(&t).map(|t| t.name = name.into()).is_some(),
        }
    }

    pub fn set_note_content(&mut self, id: NoteId, content: Option<String>) -> bool {
        self.notes.get_mut(&id).map(|n| n.content = content).is_some()
    }

    /// Remove a note together with its subpages (the server cascades the
    /// delete). Returns the removed ids, pre-order.
    pub fn remove_note_cascade(&mut self, id: NoteId) -> Vec<NoteId> {
        let removed = self.note_subtree(id);
        if let Some(parent) = self.notes.get(&id).and_then(|n| n.parent) {
            if let Some(parent) = self.notes.get_mut(&parent) {
                parent.children.retain(|c| *c != id);
            }
        }
        for note in &removed {
            self.notes.remove(note);
        }
        removed
    }

    /// Remove a tag together with its descendant tags, stripping them from
    /// every note. Returns the removed tags and the notes that lost a tag.
    pub fn remove_tag_cascade(&mut self, id: TagId) -> (Vec<TagId>, Vec<NoteId>) {
        let removed = self.tag_subtree(id);
        if let Some(parent) = self.tags.get(&id).and_then(|t| t.parent) {
            if let Some(parent) = self.tags.get_mut(&parent) {
                parent.children.retain(|c| *c != id);
            }
        }
        let gone: BTreeSet<TagId> = removed.iter().copied().collect();
        let mut affected = Vec::new();
        for note in self.notes.values_mut() {
            let before = note.tags.len();
            note.tags.retain(|t| !gone.contains(t));
            if note.tags.len() != before {
                affected.push(note.id);
            }
        }
        for tag in &removed {
            self.tags.remove(tag);
        }
        (removed, affected)
    }
}
