//! Promote and demote
//!
//! Both work on a displayed node rather than an entity: what "parent" and
//! "previous sibling" mean depends on which instance the user acts on.

use super::{OpError, OpResult, Workspace};
use crate::api::ApiCall;
use crate::entity::{NoteId, TagId};
use crate::tree::{NodeContent, NodeKey};

/// What promoting a node amounts to
enum Promotion {
    Tag { tag: TagId, to: Option<TagId> },
    Subpage { note: NoteId, to: Option<NoteId> },
    /// Retag a note from the tag it sits under to that tag's parent
    Retag { note: NoteId, from: TagId, to: Option<TagId> },
}

/// What demoting a node amounts to
enum Demotion {
    Tag { tag: TagId, under: TagId },
    Note { note: NoteId, under: NoteId },
}

impl Workspace {
    fn promotion(&self, node: NodeKey) -> OpResult<Option<Promotion>> {
        let content = self.node_content(node)?;
        let Some(parent) = self.tree.parent(node).and_then(|p| self.tree.content(p)) else {
            return Ok(None);
        };
        let promotion = match (content, parent) {
            (NodeContent::Tag(tag), NodeContent::Tag(parent)) => Some(Promotion::Tag {
                tag,
                to: self.require_tag(parent)?.parent,
            }),
            (NodeContent::Note(note), NodeContent::Note(parent)) => Some(Promotion::Subpage {
                note,
                to: self.require_note(parent)?.parent,
            }),
            (NodeContent::Note(note), NodeContent::Tag(from)) => Some(Promotion::Retag {
                note,
                from,
                to: self.require_tag(from)?.parent,
            }),
            // root tags and notes under the groups have nowhere to go
            _ => None,
        };
        Ok(promotion)
    }

    /// The closest preceding sibling the node can be moved under. A
    /// sibling that is already the parent, or sits inside the node's own
    /// subtree, is passed over.
    fn demotion(&self, node: NodeKey) -> OpResult<Option<Demotion>> {
        let content = self.node_content(node)?;
        let mut current = node;
        while let Some(sibling) = self.tree.previous_sibling(current) {
            current = sibling;
            let demotion = match (content, self.tree.content(sibling)) {
                (NodeContent::Tag(tag), Some(NodeContent::Tag(under))) => {
                    let parent = self.require_tag(tag)?.parent;
                    if parent == Some(under) || self.cache.is_tag_within(under, tag) {
                        continue;
                    }
                    Demotion::Tag { tag, under }
                }
                (NodeContent::Note(note), Some(NodeContent::Note(under))) => {
                    let parent = self.require_note(note)?.parent;
                    if parent == Some(under) || self.cache.is_note_within(under, note) {
                        continue;
                    }
                    Demotion::Note { note, under }
                }
                _ => return Ok(None),
            };
            return Ok(Some(demotion));
        }
        Ok(None)
    }

    /// True if [`promote`](Self::promote) would do something
    pub fn can_promote(&self, node: NodeKey) -> bool {
        matches!(self.promotion(node), Ok(Some(_)))
    }

    /// True if [`demote`](Self::demote) would do something
    pub fn can_demote(&self, node: NodeKey) -> bool {
        matches!(self.demotion(node), Ok(Some(_)))
    }

    /// Move a node up to its grandparent's level.
    ///
    /// A nested tag moves to its parent's parent. A subpage moves to its
    /// parent note's parent, or becomes a root note. A note shown under a
    /// tag trades that tag for the tag's parent, or simply loses it at the
    /// top level, after which it lands wherever its remaining tags put it.
    /// Returns `Ok(false)` when the node cannot be promoted.
    pub fn promote(&mut self, node: NodeKey) -> OpResult<bool> {
        let Some(promotion) = self.promotion(node)? else {
            tracing::debug!(%node, "promote not available");
            return Ok(false);
        };
        match promotion {
            Promotion::Tag { tag, to } => self.move_tag(tag, to)?,
            Promotion::Subpage { note, to } => self.move_note(note, to)?,
            Promotion::Retag { note, from, to } => self.retag(note, from, to)?,
        }
        Ok(true)
    }

    /// Make a node a child of the closest preceding sibling of its own
    /// kind that is not already its parent or one of its subpages. Returns
    /// `Ok(false)` when there is none.
    pub fn demote(&mut self, node: NodeKey) -> OpResult<bool> {
        let Some(demotion) = self.demotion(node)? else {
            tracing::debug!(%node, "demote not available");
            return Ok(false);
        };
        match demotion {
            Demotion::Tag { tag, under } => self.move_tag(tag, Some(under))?,
            Demotion::Note { note, under } => self.move_note(note, Some(under))?,
        }
        Ok(true)
    }

    /// Replace tag `from` on a note with `to`. Adding `to` comes first; if
    /// removing `from` then fails the added tag is taken off again.
    fn retag(&mut self, note: NoteId, from: TagId, to: Option<TagId>) -> OpResult<()> {
        let Some(to) = to else {
            return self.detach_note_from_tag(note, from);
        };
        if self.require_note(note)?.tags.contains(&to) {
            return self.detach_note_from_tag(note, from);
        }
        if !self.require_note(note)?.tags.contains(&from) {
            return Err(OpError::NotAttached {
                item: note.into(),
                parent: Some(from.into()),
            });
        }

        self.remote(ApiCall::AttachTagToNote, |api| api.attach_tag_to_note(note, to))?;
        if let Err(err) = self.remote(ApiCall::DetachTagFromNote, |api| api.detach_tag_from_note(note, from)) {
            if self
                .remote(ApiCall::DetachTagFromNote, |api| api.detach_tag_from_note(note, to))
                .is_err()
            {
                // the server now has both tags
                tracing::warn!(%note, tag = %to, "could not undo tag attach");
                self.cache.add_note_tag(note, to);
                self.reconcile(|tree, cache| tree.sync_note_placement(note, cache))?;
            }
            return Err(err);
        }

        self.cache.add_note_tag(note, to);
        self.cache.remove_note_tag(note, from);
        self.reconcile(|tree, cache| tree.sync_note_placement(note, cache))?;
        tracing::info!(%note, %from, %to, "retagged note");
        Ok(())
    }
}
