//! notetree: a synchronized note and tag hierarchy
//!
//! Keeps a display tree of notes and tags consistent with a remote server
//! that owns the data, through local edits and full refreshes alike.
//!
//! # Core Concepts
//!
//! - **Entities**: notes and tags as held by the server, cached by id in an
//!   [`EntityCache`]
//! - **Instances**: tree nodes displaying an entity; a note tagged twice
//!   shows up under both tags and under "All Notes"
//! - **View state**: expansion and selection keyed by entity id, so it
//!   survives a rebuild
//!
//! # Example
//!
//! ```
//! use notetree::{MemoryApi, Placement, Workspace};
//! use std::sync::Arc;
//!
//! let mut ws = Workspace::open(Arc::new(MemoryApi::new())).unwrap();
//! let work = ws.create_tag("Work", None).unwrap();
//! let report = ws.create_note("Report", "", Placement::UnderTag(work)).unwrap();
//! assert_eq!(ws.instances(report.into()).len(), 2);
//! ```

pub mod api;
pub mod entity;
pub mod ops;
pub mod tree;

pub use api::{ApiCall, ApiError, ApiResult, MemoryApi, NoteApi, SqliteApi};
pub use entity::{EntityCache, EntityId, EntityKind, HierarchyType, Note, NoteId, Tag, TagId};
pub use ops::{ClipboardEntry, OpError, OpResult, Placement, Workspace};
pub use tree::{GroupKind, HierarchyTree, NodeContent, NodeKey, NodeKind, TreeError, TreeEvent, TreeResult, ViewState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
