//! Mark/cut and paste

use super::attach::kind_of;
use super::{OpError, OpResult, Workspace};
use crate::entity::{EntityId, NoteId};
use crate::tree::{NodeContent, NodeKey, NodeKind, TreeError};

/// What the paste slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardEntry {
    /// Attach to the paste target by the usual kind rules
    Marked(EntityId),
    /// Move as a subpage of the paste target
    Cut(NoteId),
}

impl ClipboardEntry {
    pub fn entity(&self) -> EntityId {
        match self {
            Self::Marked(entity) => *entity,
            Self::Cut(note) => EntityId::Note(*note),
        }
    }
}

impl Workspace {
    pub fn clipboard(&self) -> Option<ClipboardEntry> {
        self.clipboard
    }

    pub fn clear_clipboard(&mut self) {
        self.clipboard = None;
    }

    /// Remember the entity behind `node` for a later paste
    pub fn mark(&mut self, node: NodeKey) -> OpResult<EntityId> {
        let entity = self.entity_at(node)?.ok_or(TreeError::Synthetic(node))?;
        self.clipboard = Some(ClipboardEntry::Marked(entity));
        tracing::debug!(%entity, "marked");
        Ok(entity)
    }

    /// Remember the note behind `node` for a later paste as a subpage
    pub fn cut(&mut self, node: NodeKey) -> OpResult<NoteId> {
        match self.node_content(node)? {
            NodeContent::Note(note) => {
                self.clipboard = Some(ClipboardEntry::Cut(note));
                tracing::debug!(%note, "cut");
                Ok(note)
            }
            other => Err(OpError::IncompatibleAttach {
                item: other.kind(),
                target: NodeKind::Note,
            }),
        }
    }

    /// Attach the marked or cut entity to the entity behind `target`. The
    /// slot is emptied whether or not the paste succeeds.
    pub fn paste(&mut self, target: NodeKey) -> OpResult<()> {
        let entry = self.clipboard.take().ok_or(OpError::NothingMarked)?;
        let content = self.node_content(target)?;
        let Some(target_entity) = content.entity() else {
            return Err(OpError::IncompatibleAttach {
                item: kind_of(entry.entity()),
                target: content.kind(),
            });
        };
        match (entry, target_entity) {
            (ClipboardEntry::Marked(item), _) => self.attach(item, target_entity),
            (ClipboardEntry::Cut(note), EntityId::Note(parent)) => self.move_note(note, Some(parent)),
            (ClipboardEntry::Cut(_), EntityId::Tag(_)) => Err(OpError::IncompatibleAttach {
                item: NodeKind::Note,
                target: NodeKind::Tag,
            }),
        }
    }
}
