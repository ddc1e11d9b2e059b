//! Request/response records exchanged with the notes API

use crate::entity::{HierarchyType, NoteId, TagId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Errors reported by an API server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Short tag reference embedded in note records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: TagId,
    pub name: String,
}

/// Short note reference embedded in tag records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRef {
    pub id: NoteId,
    pub title: String,
}

/// One note of the full notes tree, with its subpages nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteTreeRecord {
    pub id: NoteId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
    #[serde(default)]
    pub children: Vec<NoteTreeRecord>,
    #[serde(default)]
    pub hierarchy_type: HierarchyType,
}

/// One tag of the tags tree, with child tags and directly-tagged notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagTreeRecord {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub children: Vec<TagTreeRecord>,
    #[serde(default)]
    pub notes: Vec<NoteRef>,
}

/// A single note as returned by create/update calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
    #[serde(default)]
    pub parent_id: Option<NoteId>,
    #[serde(default)]
    pub hierarchy_type: HierarchyType,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A single tag as returned by create/update calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<TagId>,
}

/// Partial note update; `None` fields are left as they are
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NoteUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }
}

/// Flat note row used by the servers to assemble [`NoteTreeRecord`]s
#[derive(Debug, Clone)]
pub(crate) struct FlatNote {
    pub id: NoteId,
    pub title: String,
    pub content: Option<String>,
    pub parent: Option<NoteId>,
    pub hierarchy_type: HierarchyType,
    pub tags: Vec<TagRef>,
}

/// Flat tag row used by the servers to assemble [`TagTreeRecord`]s
#[derive(Debug, Clone)]
pub(crate) struct FlatTag {
    pub id: TagId,
    pub name: String,
    pub parent: Option<TagId>,
    pub notes: Vec<NoteRef>,
}

/// Nest flat note rows by parent. Rows whose parent is unknown surface at
/// the root; rows caught in a parent cycle are unreachable and dropped.
pub(crate) fn assemble_note_forest(rows: Vec<FlatNote>, exclude_content: bool) -> Vec<NoteTreeRecord> {
    let known: HashSet<NoteId> = rows.iter().map(|r| r.id).collect();
    let mut by_parent: BTreeMap<Option<NoteId>, Vec<FlatNote>> = BTreeMap::new();
    for row in rows {
        let parent = row.parent.filter(|p| known.contains(p));
        by_parent.entry(parent).or_default().push(row);
    }

    fn build(
        parent: Option<NoteId>,
        by_parent: &mut BTreeMap<Option<NoteId>, Vec<FlatNote>>,
        exclude_content: bool,
    ) -> Vec<NoteTreeRecord> {
        let Some(rows) = by_parent.remove(&parent) else {
            return Vec::new();
        };
        rows.into_iter()
            .map(|row| NoteTreeRecord {
                children: build(Some(row.id), by_parent, exclude_content),
                id: row.id,
                title: row.title,
                content: if exclude_content { None } else { row.content },
                tags: row.tags,
                hierarchy_type: row.hierarchy_type,
            })
            .collect()
    }

    build(None, &mut by_parent, exclude_content)
}

/// Nest flat tag rows by parent, same rules as [`assemble_note_forest`]
pub(crate) fn assemble_tag_forest(rows: Vec<FlatTag>) -> Vec<TagTreeRecord> {
    let known: HashSet<TagId> = rows.iter().map(|r| r.id).collect();
    let mut by_parent: BTreeMap<Option<TagId>, Vec<FlatTag>> = BTreeMap::new();
    for row in rows {
        let parent = row.parent.filter(|p| known.contains(p));
        by_parent.entry(parent).or_default().push(row);
    }

    fn build(parent: Option<TagId>, by_parent: &mut BTreeMap<Option<TagId>, Vec<FlatTag>>) -> Vec<TagTreeRecord> {
        let Some(rows) = by_parent.remove(&parent) else {
            return Vec::new();
        };
        rows.into_iter()
            .map(|row| TagTreeRecord {
                children: build(Some(row.id), by_parent),
                id: row.id,
                name: row.name,
                notes: row.notes,
            })
            .collect()
    }

    build(None, &mut by_parent)
}
