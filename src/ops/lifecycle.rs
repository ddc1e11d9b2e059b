//! Create, rename, edit and delete

use super::{OpResult, Workspace};
use crate::api::{ApiCall, NoteUpdate};
use crate::entity::{EntityId, HierarchyType, Note, NoteId, Tag, TagId};
use serde::{Deserialize, Serialize};

/// Where a new note goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// A root note, untagged
    #[default]
    Root,
    /// A root note carrying the tag
    UnderTag(TagId),
    /// A subpage of the note
    UnderNote(NoteId),
}

impl Workspace {
    /// Create a note and place it. Placement takes a second remote call; if
    /// that fails the created note is deleted again.
    pub fn create_note(&mut self, title: &str, content: &str, placement: Placement) -> OpResult<NoteId> {
        match placement {
            Placement::Root => {}
            Placement::UnderTag(tag) => {
                self.require_tag(tag)?;
            }
            Placement::UnderNote(parent) => {
                self.require_note(parent)?;
            }
        }

        let record = self.remote(ApiCall::NoteCreate, |api| api.note_create(title, content))?;
        let id = record.id;
        let mut note = Note::new(id, record.title);
        note.content = record.content;

        let placed = match placement {
            Placement::Root => Ok(()),
            Placement::UnderTag(tag) => {
                note = note.with_tag(tag);
                self.remote(ApiCall::AttachTagToNote, |api| api.attach_tag_to_note(id, tag))
            }
            Placement::UnderNote(parent) => {
                note = note.with_parent(parent);
                self.remote(ApiCall::AttachNoteToParent, |api| {
                    api.attach_note_to_parent(id, parent, HierarchyType::default())
                })
            }
        };

        if let Err(err) = placed {
            if self.remote(ApiCall::DeleteNote, |api| api.delete_note(id)).is_err() {
                // the server keeps an unplaced root note; show it
                tracing::warn!(note = %id, "could not remove half-created note");
                self.cache.insert_note(Note {
                    tags: Default::default(),
                    parent: None,
                    ..note
                });
                self.reconcile(|tree, cache| tree.sync_note_placement(id, cache))?;
            }
            return Err(err);
        }

        self.cache.insert_note(note);
        self.reconcile(|tree, cache| tree.sync_note_placement(id, cache))?;
        tracing::info!(note = %id, ?placement, "created note");
        Ok(id)
    }

    /// Create a tag, at the top level or under `parent`
    pub fn create_tag(&mut self, name: &str, parent: Option<TagId>) -> OpResult<TagId> {
        if let Some(parent) = parent {
            self.require_tag(parent)?;
        }

        let record = self.remote(ApiCall::CreateTag, |api| api.create_tag(name))?;
        let id = record.id;
        let mut tag = Tag::new(id, record.name);

        if let Some(parent) = parent {
            if let Err(err) = self.remote(ApiCall::AttachTagToParent, |api| api.attach_tag_to_parent(id, parent)) {
                if self.remote(ApiCall::DeleteTag, |api| api.delete_tag(id)).is_err() {
                    tracing::warn!(tag = %id, "could not remove half-created tag");
                    self.cache.insert_tag(tag);
                    self.reconcile(|tree, cache| tree.sync_tag_placement(id, cache))?;
                }
                return Err(err);
            }
            tag = tag.with_parent(parent);
        }

        self.cache.insert_tag(tag);
        self.reconcile(|tree, cache| tree.sync_tag_placement(id, cache))?;
        tracing::info!(tag = %id, parent = ?parent, "created tag");
        Ok(id)
    }

    /// Rename a note or tag. Every instance shows the new name and is
    /// re-sorted among its siblings.
    pub fn rename(&mut self, entity: EntityId, name: &str) -> OpResult<()> {
        match entity {
            EntityId::Note(id) => {
                self.require_note(id)?;
                self.remote(ApiCall::UpdateNote, |api| api.update_note(id, &NoteUpdate::title(name)))?;
            }
            EntityId::Tag(id) => {
                self.require_tag(id)?;
                self.remote(ApiCall::UpdateTag, |api| api.update_tag(id, name))?;
            }
        }

        self.cache.rename(entity, name);
        self.reconcile(|tree, cache| tree.refresh_entity(entity, cache))?;
        tracing::info!(%entity, name, "renamed");
        Ok(())
    }

    /// Replace the body of a note
    pub fn update_note_content(&mut self, note: NoteId, content: &str) -> OpResult<()> {
        self.require_note(note)?;
        self.remote(ApiCall::UpdateNote, |api| api.update_note(note, &NoteUpdate::content(content)))?;

        self.cache.set_note_content(note, Some(content.to_string()));
        for key in self.tree.find_all_instances(note.into()) {
            self.tree.touch(key);
        }
        tracing::info!(%note, "updated note content");
        Ok(())
    }

    /// Delete a note with its subpages, or a tag with its descendant tags
    pub fn delete(&mut self, entity: EntityId) -> OpResult<()> {
        match entity {
            EntityId::Note(id) => self.delete_note(id)?,
            EntityId::Tag(id) => self.delete_tag(id)?,
        }
        self.forget_missing();
        Ok(())
    }

    fn delete_note(&mut self, id: NoteId) -> OpResult<()> {
        self.require_note(id)?;
        self.remote(ApiCall::DeleteNote, |api| api.delete_note(id))?;

        let removed = self.cache.remove_note_cascade(id);
        self.reconcile(|tree, _| {
            // subpages may also sit under their own tags
            for note in &removed {
                tree.remove_entity(EntityId::Note(*note))?;
            }
            Ok(())
        })?;
        tracing::info!(note = %id, removed = removed.len(), "deleted note");
        Ok(())
    }

    fn delete_tag(&mut self, id: TagId) -> OpResult<()> {
        self.require_tag(id)?;
        self.remote(ApiCall::DeleteTag, |api| api.delete_tag(id))?;

        let (removed, affected) = self.cache.remove_tag_cascade(id);
        self.reconcile(|tree, cache| {
            tree.remove_entity(EntityId::Tag(id))?;
            for note in &affected {
                tree.sync_note_placement(*note, cache)?;
            }
            Ok(())
        })?;
        tracing::info!(tag = %id, removed = removed.len(), affected = affected.len(), "deleted tag");
        Ok(())
    }
}
