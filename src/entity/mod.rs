//! Notes, tags and the cache that owns them

mod cache;
mod types;

pub use cache::EntityCache;
pub use types::{EntityId, EntityKind, HierarchyType, Note, NoteId, ParseEntityIdError, Tag, TagId};
