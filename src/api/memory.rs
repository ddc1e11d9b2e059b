//! In-process notes server
//!
//! Behaves like the remote server (id allocation, validation, cascading
//! deletes) while keeping everything in memory. Every call is logged, and
//! calls can be made to fail on demand, which is what the tests use to
//! exercise the failure paths of the mutation operations.

use super::traits::{ApiCall, NoteApi};
use super::types::{
    assemble_note_forest, assemble_tag_forest, ApiError, ApiResult, FlatNote, FlatTag, NoteRecord, NoteRef,
    NoteTreeRecord, NoteUpdate, TagRecord, TagRef, TagTreeRecord,
};
use crate::entity::{HierarchyType, NoteId, TagId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct StoredNote {
    title: String,
    content: String,
    parent: Option<NoteId>,
    hierarchy_type: HierarchyType,
    tags: BTreeSet<TagId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredTag {
    name: String,
    parent: Option<TagId>,
}

#[derive(Debug, Default)]
struct MemoryState {
    notes: BTreeMap<NoteId, StoredNote>,
    tags: BTreeMap<TagId, StoredTag>,
    next_note: i64,
    next_tag: i64,
    /// Calls that fail until cleared
    failing: HashSet<ApiCall>,
    /// Calls that fail once
    fail_once: HashSet<ApiCall>,
    calls: Vec<ApiCall>,
}

impl MemoryState {
    fn tag_refs(&self, tags: &BTreeSet<TagId>) -> Vec<TagRef> {
        tags.iter()
            .filter_map(|id| {
                self.tags.get(id).map(|t| TagRef {
                    id: *id,
                    name: t.name.clone(),
                })
            })
            .collect()
    }

    fn note_record(&self, id: NoteId) -> ApiResult<NoteRecord> {
        let note = self.notes.get(&id).ok_or_else(|| not_found_note(id))?;
        Ok(NoteRecord {
            id,
            title: note.title.clone(),
            content: Some(note.content.clone()),
            tags: self.tag_refs(&note.tags),
            parent_id: note.parent,
            hierarchy_type: note.hierarchy_type,
            created_at: Some(note.created_at),
            updated_at: Some(note.updated_at),
        })
    }

    fn tag_record(&self, id: TagId) -> ApiResult<TagRecord> {
        let tag = self.tags.get(&id).ok_or_else(|| not_found_tag(id))?;
        Ok(TagRecord {
            id,
            name: tag.name.clone(),
            parent_id: tag.parent,
        })
    }

    /// True if `candidate` is `ancestor` or below it
    fn note_within(&self, candidate: NoteId, ancestor: NoteId) -> bool {
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

    fn tag_within(&self, candidate: TagId, ancestor: TagId) -> bool {
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

    fn insert_note(&mut self, title: &str, content: &str) -> NoteId {
        self.next_note += 1;
        let id = NoteId::new(self.next_note);
        let now = Utc::now();
        self.notes.insert(
            id,
            StoredNote {
                title: title.to_string(),
                content: content.to_string(),
                parent: None,
                hierarchy_type: HierarchyType::default(),
                tags: BTreeSet::new(),
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    fn insert_tag(&mut self, name: &str) -> TagId {
        self.next_tag += 1;
        let id = TagId::new(self.next_tag);
        self.tags.insert(
            id,
            StoredTag {
                name: name.to_string(),
                parent: None,
            },
        );
        id
    }
}

fn not_found_note(id: NoteId) -> ApiError {
    ApiError::NotFound(format!("note {}", id))
}

fn not_found_tag(id: TagId) -> ApiError {
    ApiError::NotFound(format!("tag {}", id))
}

/// In-memory implementation of [`NoteApi`]
#[derive(Debug, Default)]
pub struct MemoryApi {
    state: Mutex<MemoryState>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log the call and apply failure injection
    fn begin(&self, call: ApiCall) -> ApiResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.failing.contains(&call) || state.fail_once.remove(&call) {
            tracing::debug!(%call, "injected failure");
            return Err(ApiError::Unavailable(format!("{} failed", call)));
        }
        Ok(state)
    }

    // === Test controls ===

    /// Make every `call` fail until [`clear_failures`](Self::clear_failures)
    pub fn fail_on(&self, call: ApiCall) {
        self.lock().failing.insert(call);
    }

    /// Make the next `call` fail
    pub fn fail_next(&self, call: ApiCall) {
        self.lock().fail_once.insert(call);
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.failing.clear();
        state.fail_once.clear();
    }

    /// Calls made so far, oldest first
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    // === Seeding (bypasses the call log) ===

    pub fn seed_tag(&self, name: &str, parent: Option<TagId>) -> TagId {
        let mut state = self.lock();
        let id = state.insert_tag(name);
        if let Some(tag) = state.tags.get_mut(&id) {
            tag.parent = parent;
        }
        id
    }

    pub fn seed_note(&self, title: &str, parent: Option<NoteId>, tags: &[TagId]) -> NoteId {
        let mut state = self.lock();
        let id = state.insert_note(title, "");
        if let Some(note) = state.notes.get_mut(&id) {
            note.parent = parent;
            note.tags = tags.iter().copied().collect();
        }
        id
    }
}

impl NoteApi for MemoryApi {
    fn get_notes_tree(&self, exclude_content: bool) -> ApiResult<Vec<NoteTreeRecord>> {
        let state = self.begin(ApiCall::GetNotesTree)?;
        let rows = state
            .notes
            .iter()
            .map(|(id, note)| FlatNote {
                id: *id,
                title: note.title.clone(),
                content: Some(note.content.clone()),
                parent: note.parent,
                hierarchy_type: note.hierarchy_type,
                tags: state.tag_refs(&note.tags),
            })
            .collect();
        Ok(assemble_note_forest(rows, exclude_content))
    }

    fn get_tags_tree(&self) -> ApiResult<Vec<TagTreeRecord>> {
        let state = self.begin(ApiCall::GetTagsTree)?;
        let rows = state
            .tags
            .iter()
            .map(|(id, tag)| FlatTag {
                id: *id,
                name: tag.name.clone(),
                parent: tag.parent,
                notes: state
                    .notes
                    .iter()
                    .filter(|(_, n)| n.tags.contains(id))
                    .map(|(nid, n)| NoteRef {
                        id: *nid,
                        title: n.title.clone(),
                    })
                    .collect(),
            })
            .collect();
        Ok(assemble_tag_forest(rows))
    }

    fn note_create(&self, title: &str, content: &str) -> ApiResult<NoteRecord> {
        let mut state = self.begin(ApiCall::NoteCreate)?;
        let id = state.insert_note(title, content);
        state.note_record(id)
    }

    fn update_note(&self, id: NoteId, update: &NoteUpdate) -> ApiResult<NoteRecord> {
        let mut state = self.begin(ApiCall::UpdateNote)?;
        let note = state.notes.get_mut(&id).ok_or_else(|| not_found_note(id))?;
        if let Some(title) = &update.title {
            note.title = title.clone();
        }
        if let Some(content) = &update.content {
            note.content = content.clone();
        }
        note.updated_at = Utc::now();
        state.note_record(id)
    }

    fn delete_note(&self, id: NoteId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::DeleteNote)?;
        if !state.notes.contains_key(&id) {
            return Err(not_found_note(id));
        }
        let doomed: Vec<NoteId> = state
            .notes
            .keys()
            .copied()
            .filter(|n| state.note_within(*n, id))
            .collect();
        for note in doomed {
            state.notes.remove(&note);
        }
        Ok(())
    }

    fn attach_note_to_parent(
        &self,
        note_id: NoteId,
        parent_id: NoteId,
        hierarchy_type: HierarchyType,
    ) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::AttachNoteToParent)?;
        if !state.notes.contains_key(&parent_id) {
            return Err(not_found_note(parent_id));
        }
        if state.note_within(parent_id, note_id) {
            return Err(ApiError::Rejected(format!(
                "note {} cannot become a subpage of its own subpage {}",
                note_id, parent_id
            )));
        }
        let note = state.notes.get_mut(&note_id).ok_or_else(|| not_found_note(note_id))?;
        note.parent = Some(parent_id);
        note.hierarchy_type = hierarchy_type;
        Ok(())
    }

    fn detach_note_from_parent(&self, note_id: NoteId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::DetachNoteFromParent)?;
        let note = state.notes.get_mut(&note_id).ok_or_else(|| not_found_note(note_id))?;
        note.parent = None;
        Ok(())
    }

    fn create_tag(&self, name: &str) -> ApiResult<TagRecord> {
        let mut state = self.begin(ApiCall::CreateTag)?;
        let id = state.insert_tag(name);
        state.tag_record(id)
    }

    fn update_tag(&self, id: TagId, name: &str) -> ApiResult<TagRecord> {
        let mut state = self.begin(ApiCall::UpdateTag)?;
        let tag = state.tags.get_mut(&id).ok_or_else(|| not_found_tag(id))?;
        tag.name = name.to_string();
        state.tag_record(id)
    }

    fn delete_tag(&self, id: TagId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::DeleteTag)?;
        if !state.tags.contains_key(&id) {
            return Err(not_found_tag(id));
        }
        let doomed: BTreeSet<TagId> = state
            .tags
            .keys()
            .copied()
            .filter(|t| state.tag_within(*t, id))
            .collect();
        for tag in &doomed {
            state.tags.remove(tag);
        }
        for note in state.notes.values_mut() {
            note.tags.retain(|t| !doomed.contains(t));
        }
        Ok(())
    }

    fn attach_tag_to_parent(&self, tag_id: TagId, parent_id: TagId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::AttachTagToParent)?;
        if !state.tags.contains_key(&parent_id) {
            return Err(not_found_tag(parent_id));
        }
        if state.tag_within(parent_id, tag_id) {
            return Err(ApiError::Rejected(format!(
                "tag {} cannot be nested under its own descendant {}",
                tag_id, parent_id
            )));
        }
        let tag = state.tags.get_mut(&tag_id).ok_or_else(|| not_found_tag(tag_id))?;
        tag.parent = Some(parent_id);
        Ok(())
    }

    fn detach_tag_from_parent(&self, tag_id: TagId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::DetachTagFromParent)?;
        let tag = state.tags.get_mut(&tag_id).ok_or_else(|| not_found_tag(tag_id))?;
        tag.parent = None;
        Ok(())
    }

    fn attach_tag_to_note(&self, note_id: NoteId, tag_id: TagId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::AttachTagToNote)?;
        if !state.tags.contains_key(&tag_id) {
            return Err(not_found_tag(tag_id));
        }
        let note = state.notes.get_mut(&note_id).ok_or_else(|| not_found_note(note_id))?;
        note.tags.insert(tag_id);
        Ok(())
    }

    fn detach_tag_from_note(&self, note_id: NoteId, tag_id: TagId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::DetachTagFromNote)?;
        let note = state.notes.get_mut(&note_id).ok_or_else(|| not_found_note(note_id))?;
        note.tags.remove(&tag_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_tree_nests_subpages() {
        let api = MemoryApi::new();
        let parent = api.seed_note("Parent", None, &[]);
        api.seed_note("Child", Some(parent), &[]);
        let tree = api.get_notes_tree(true).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].title, "Child");
    }

    #[test]
    fn tags_tree_lists_tagged_notes() {
        let api = MemoryApi::new();
        let work = api.seed_tag("Work", None);
        api.seed_tag("Meetings", Some(work));
        api.seed_note("Report", None, &[work]);
        let tree = api.get_tags_tree().unwrap();
        assert_eq!(tree[0].notes[0].title, "Report");
        assert_eq!(tree[0].children[0].name, "Meetings");
    }

    #[test]
    fn cyclic_reparenting_is_rejected() {
        let api = MemoryApi::new();
        let a = api.seed_note("A", None, &[]);
        let b = api.seed_note("B", Some(a), &[]);
        assert!(matches!(
            api.attach_note_to_parent(a, b, HierarchyType::Block),
            Err(ApiError::Rejected(_))
        ));
    }

    #[test]
    fn deleting_a_note_cascades_to_subpages() {
        let api = MemoryApi::new();
        let a = api.seed_note("A", None, &[]);
        api.seed_note("B", Some(a), &[]);
        api.delete_note(a).unwrap();
        assert!(api.get_notes_tree(true).unwrap().is_empty());
    }

    #[test]
    fn deleting_a_tag_cascades_to_child_tags_and_membership() {
        let api = MemoryApi::new();
        let work = api.seed_tag("Work", None);
        let meetings = api.seed_tag("Meetings", Some(work));
        api.seed_note("Agenda", None, &[meetings]);
        api.delete_tag(work).unwrap();
        assert!(api.get_tags_tree().unwrap().is_empty());
        assert!(api.get_notes_tree(true).unwrap()[0].tags.is_empty());
    }

    #[test]
    fn injected_failures_are_logged_and_returned() {
        let api = MemoryApi::new();
        api.fail_next(ApiCall::CreateTag);
        assert!(matches!(api.create_tag("x"), Err(ApiError::Unavailable(_))));
        assert!(api.create_tag("x").is_ok());
        assert_eq!(api.calls(), vec![ApiCall::CreateTag, ApiCall::CreateTag]);
    }
}
