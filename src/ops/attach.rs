//! Attach, detach and move

use super::{OpError, OpResult, Workspace};
use crate::api::ApiCall;
use crate::entity::{EntityId, NoteId, TagId};
use crate::tree::{NodeContent, NodeKind};

pub(super) fn kind_of(entity: EntityId) -> NodeKind {
    NodeContent::from(entity).kind()
}

impl Workspace {
    /// Attach `item` to `target`, picking the operation from the kind pair:
    /// note to tag adds a tag, note to note makes a subpage, tag to tag
    /// nests the tag. Anything else is refused.
    pub fn attach(&mut self, item: EntityId, target: EntityId) -> OpResult<()> {
        match (item, target) {
            (EntityId::Note(note), EntityId::Tag(tag)) => self.attach_note_to_tag(note, tag),
            (EntityId::Note(note), EntityId::Note(parent)) => self.move_note(note, Some(parent)),
            (EntityId::Tag(tag), EntityId::Tag(parent)) => self.move_tag(tag, Some(parent)),
            (EntityId::Tag(_), EntityId::Note(_)) => Err(OpError::IncompatibleAttach {
                item: kind_of(item),
                target: kind_of(target),
            }),
        }
    }

    /// Give a note one more tag
    pub fn attach_note_to_tag(&mut self, note: NoteId, tag: TagId) -> OpResult<()> {
        self.require_tag(tag)?;
        if self.require_note(note)?.tags.contains(&tag) {
            return Err(OpError::AlreadyAttached { note, tag });
        }

        self.remote(ApiCall::AttachTagToNote, |api| api.attach_tag_to_note(note, tag))?;

        self.cache.add_note_tag(note, tag);
        self.reconcile(|tree, cache| tree.sync_note_placement(note, cache))?;
        tracing::info!(%note, %tag, "attached note to tag");
        Ok(())
    }

    /// Take a tag off a note
    pub fn detach_note_from_tag(&mut self, note: NoteId, tag: TagId) -> OpResult<()> {
        if !self.require_note(note)?.tags.contains(&tag) {
            return Err(OpError::NotAttached {
                item: note.into(),
                parent: Some(tag.into()),
            });
        }

        self.remote(ApiCall::DetachTagFromNote, |api| api.detach_tag_from_note(note, tag))?;

        self.cache.remove_note_tag(note, tag);
        self.reconcile(|tree, cache| tree.sync_note_placement(note, cache))?;
        tracing::info!(%note, %tag, "detached note from tag");
        Ok(())
    }

    /// Make a note a subpage of `parent`, or a root note with `None`. The
    /// note's subpages travel with it.
    pub fn move_note(&mut self, note: NoteId, parent: Option<NoteId>) -> OpResult<()> {
        let entry = self.require_note(note)?;
        let (current, hierarchy_type) = (entry.parent, entry.hierarchy_type);
        if let Some(parent) = parent {
            self.require_note(parent)?;
            if self.cache.is_note_within(parent, note) {
                return Err(OpError::CyclicMove {
                    moved: note.into(),
                    target: parent.into(),
                });
            }
        }
        if current == parent {
            tracing::debug!(%note, "note already in place");
            return Ok(());
        }

        match parent {
            Some(parent) => self.remote(ApiCall::AttachNoteToParent, |api| {
                api.attach_note_to_parent(note, parent, hierarchy_type)
            })?,
            None => self.remote(ApiCall::DetachNoteFromParent, |api| api.detach_note_from_parent(note))?,
        }

        self.cache.set_note_parent(note, parent, hierarchy_type);
        self.reconcile(|tree, cache| tree.sync_note_placement(note, cache))?;
        tracing::info!(%note, parent = ?parent, "moved note");
        Ok(())
    }

    /// Nest a tag under `parent`, or make it a root tag with `None`. The tag
    /// node is moved, not rebuilt, so everything below it keeps its
    /// expansion.
    pub fn move_tag(&mut self, tag: TagId, parent: Option<TagId>) -> OpResult<()> {
        let current = self.require_tag(tag)?.parent;
        if let Some(parent) = parent {
            self.require_tag(parent)?;
            if self.cache.is_tag_within(parent, tag) {
                return Err(OpError::CyclicMove {
                    moved: tag.into(),
                    target: parent.into(),
                });
            }
        }
        if current == parent {
            tracing::debug!(%tag, "tag already in place");
            return Ok(());
        }

        match parent {
            Some(parent) => self.remote(ApiCall::AttachTagToParent, |api| api.attach_tag_to_parent(tag, parent))?,
            None => self.remote(ApiCall::DetachTagFromParent, |api| api.detach_tag_from_parent(tag))?,
        }

        self.cache.set_tag_parent(tag, parent);
        self.reconcile(|tree, cache| tree.sync_tag_placement(tag, cache))?;
        tracing::info!(%tag, parent = ?parent, "moved tag");
        Ok(())
    }

    /// Move a nested tag to the top level
    pub fn detach_tag(&mut self, tag: TagId) -> OpResult<()> {
        if self.require_tag(tag)?.parent.is_none() {
            return Err(OpError::NotAttached {
                item: tag.into(),
                parent: None,
            });
        }
        self.move_tag(tag, None)
    }
}
