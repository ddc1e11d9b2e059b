//! The notes API boundary

use super::types::{ApiResult, NoteRecord, NoteTreeRecord, NoteUpdate, TagRecord, TagTreeRecord};
use crate::entity::{HierarchyType, NoteId, TagId};

/// Names of the API calls, for logging and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCall {
    GetNotesTree,
    GetTagsTree,
    NoteCreate,
    UpdateNote,
    DeleteNote,
    AttachNoteToParent,
    DetachNoteFromParent,
    CreateTag,
    UpdateTag,
    DeleteTag,
    AttachTagToParent,
    DetachTagFromParent,
    AttachTagToNote,
    DetachTagFromNote,
}

impl std::fmt::Display for ApiCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::GetNotesTree => "get_notes_tree",
            Self::GetTagsTree => "get_tags_tree",
            Self::NoteCreate => "note_create",
            Self::UpdateNote => "update_note",
            Self::DeleteNote => "delete_note",
            Self::AttachNoteToParent => "attach_note_to_parent",
            Self::DetachNoteFromParent => "detach_note_from_parent",
            Self::CreateTag => "create_tag",
            Self::UpdateTag => "update_tag",
            Self::DeleteTag => "delete_tag",
            Self::AttachTagToParent => "attach_tag_to_parent",
            Self::DetachTagFromParent => "detach_tag_from_parent",
            Self::AttachTagToNote => "attach_tag_to_note",
            Self::DetachTagFromNote => "detach_tag_from_note",
        };
        f.write_str(name)
    }
}

/// Synchronous request/response access to the server that owns notes and
/// tags
///
/// Every mutating call either succeeds as a whole or fails with an
/// [`ApiError`](super::ApiError); callers never assume partial success.
/// Deleting a note removes its subpages; deleting a tag removes its
/// descendant tags and all their note memberships.
pub trait NoteApi: Send + Sync {
    // === Reads ===

    /// Every note, subpages nested under their parent
    fn get_notes_tree(&self, exclude_content: bool) -> ApiResult<Vec<NoteTreeRecord>>;

    /// Every tag, child tags nested, with the notes tagged directly
    fn get_tags_tree(&self) -> ApiResult<Vec<TagTreeRecord>>;

    // === Notes ===

    fn note_create(&self, title: &str, content: &str) -> ApiResult<NoteRecord>;

    fn update_note(&self, id: NoteId, update: &NoteUpdate) -> ApiResult<NoteRecord>;

    fn delete_note(&self, id: NoteId) -> ApiResult<()>;

    /// Make `note_id` a subpage of `parent_id`, replacing any previous parent
    fn attach_note_to_parent(&self, note_id: NoteId, parent_id: NoteId, hierarchy_type: HierarchyType)
        -> ApiResult<()>;

    fn detach_note_from_parent(&self, note_id: NoteId) -> ApiResult<()>;

    // === Tags ===

    fn create_tag(&self, name: &str) -> ApiResult<TagRecord>;

    fn update_tag(&self, id: TagId, name: &str) -> ApiResult<TagRecord>;

    fn delete_tag(&self, id: TagId) -> ApiResult<()>;

    /// Nest `tag_id` under `parent_id`, replacing any previous parent
    fn attach_tag_to_parent(&self, tag_id: TagId, parent_id: TagId) -> ApiResult<()>;

    fn detach_tag_from_parent(&self, tag_id: TagId) -> ApiResult<()>;

    // === Membership ===

    fn attach_tag_to_note(&self, note_id: NoteId, tag_id: TagId) -> ApiResult<()>;

    fn detach_tag_from_note(&self, note_id: NoteId, tag_id: TagId) -> ApiResult<()>;
}
