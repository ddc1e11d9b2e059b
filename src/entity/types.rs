//! Entity identifiers and records as known to the remote system

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Stable identifier of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(i64);

impl TagId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Note,
    Tag,
}

/// A note or tag id, tagged with its kind
///
/// Note and tag ids are only unique per kind, so anything that mixes both
/// (view state, the instance index, the clipboard) keys on this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EntityId {
    Note(NoteId),
    Tag(TagId),
}

impl EntityId {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Note(_) => EntityKind::Note,
            Self::Tag(_) => EntityKind::Tag,
        }
    }

    pub fn as_note(&self) -> Option<NoteId> {
        match self {
            Self::Note(id) => Some(*id),
            Self::Tag(_) => None,
        }
    }

    pub fn as_tag(&self) -> Option<TagId> {
        match self {
            Self::Tag(id) => Some(*id),
            Self::Note(_) => None,
        }
    }
}

impl From<NoteId> for EntityId {
    fn from(id: NoteId) -> Self {
        Self::Note(id)
    }
}

impl From<TagId> for EntityId {
    fn from(id: TagId) -> Self {
        Self::Tag(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note(id) => write!(f, "note:{}", id),
            Self::Tag(id) => write!(f, "tag:{}", id),
        }
    }
}

/// Error returned when parsing an [`EntityId`] from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entity id '{0}' (expected note:<id>, tag:<id>, n<id> or t<id>)")]
pub struct ParseEntityIdError(pub String);

impl FromStr for EntityId {
    type Err = ParseEntityIdError;

    /// Accepts `note:10`, `tag:1`, and the short forms `n10`, `t1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseEntityIdError(s.to_string());
        let (kind, raw) = if let Some(rest) = s.strip_prefix("note:") {
            (EntityKind::Note, rest)
        } else if let Some(rest) = s.strip_prefix("tag:") {
            (EntityKind::Tag, rest)
        } else if let Some(rest) = s.strip_prefix('n') {
            (EntityKind::Note, rest)
        } else if let Some(rest) = s.strip_prefix('t') {
            (EntityKind::Tag, rest)
        } else {
            return Err(err());
        };
        let raw: i64 = raw.parse().map_err(|_| err())?;
        Ok(match kind {
            EntityKind::Note => Self::Note(NoteId::new(raw)),
            EntityKind::Tag => Self::Tag(TagId::new(raw)),
        })
    }
}

/// How a subpage hangs off its parent note
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyType {
    /// Block-level child embedded in the parent's outline
    #[default]
    Block,
    /// Standalone page filed under the parent
    Page,
}

impl HierarchyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Page => "page",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "block" => Some(Self::Block),
            "page" => Some(Self::Page),
            _ => None,
        }
    }
}

/// A note as held by the entity cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Body text, absent when fetched with content excluded
    pub content: Option<String>,
    pub tags: BTreeSet<TagId>,
    /// Block-hierarchy parent note
    pub parent: Option<NoteId>,
    pub hierarchy_type: HierarchyType,
    /// Subpages in server order
    pub children: Vec<NoteId>,
}

impl Note {
    pub fn new(id: NoteId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: None,
            tags: BTreeSet::new(),
            parent: None,
            hierarchy_type: HierarchyType::default(),
            children: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: TagId) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn with_parent(mut self, parent: NoteId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}

/// A tag as held by the entity cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub parent: Option<TagId>,
    pub children: Vec<TagId>,
}

impl Tag {
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: TagId) -> Self {
        self.parent = Some(parent);
        self
    }
}
