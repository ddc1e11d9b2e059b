//! Access to the server that owns notes and tags

mod memory;
mod sqlite;
mod traits;
mod types;

pub use memory::MemoryApi;
pub use sqlite::SqliteApi;
pub use traits::{ApiCall, NoteApi};
pub use types::{
    ApiError, ApiResult, NoteRecord, NoteRef, NoteTreeRecord, NoteUpdate, TagRecord, TagRef, TagTreeRecord,
};
