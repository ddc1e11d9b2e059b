//! Errors from mutation operations

use crate::api::ApiError;
use crate::entity::{EntityId, NoteId, TagId};
use crate::tree::{NodeKey, NodeKind, TreeError};
use thiserror::Error;

/// Why a mutation was refused or failed
///
/// `CyclicMove`, `IncompatibleAttach`, `EntityNotFound`, `NodeNotFound`,
/// `AlreadyAttached`, `NotAttached` and `NothingMarked` are raised before any
/// remote call is made.
#[derive(Debug, Error)]
pub enum OpError {
    #[error("moving {moved} under {target} would make it its own ancestor")]
    CyclicMove { moved: EntityId, target: EntityId },

    #[error("a {item:?} cannot be attached to a {target:?}")]
    IncompatibleAttach { item: NodeKind, target: NodeKind },

    #[error("remote call failed: {0}")]
    RemoteCallFailed(#[from] ApiError),

    #[error("{0} not found")]
    EntityNotFound(EntityId),

    #[error("tree node not found: {0}")]
    NodeNotFound(NodeKey),

    #[error("note {note} already carries tag {tag}")]
    AlreadyAttached { note: NoteId, tag: TagId },

    #[error("{item} is not attached to {}", .parent.map(|p| p.to_string()).unwrap_or_else(|| "a parent".to_string()))]
    NotAttached { item: EntityId, parent: Option<EntityId> },

    #[error("nothing is marked for paste")]
    NothingMarked,

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Result type for mutation operations
pub type OpResult<T> = Result<T, OpError>;
