//! Tree node representation

use crate::entity::{EntityId, NoteId, TagId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identity of a node in the display tree
///
/// Keys are never reused within one tree, but a rebuilt tree hands out new
/// keys; anything that must survive a rebuild keys on [`EntityId`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(u64);

impl NodeKey {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Synthetic grouping nodes hung off the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Every note, nested by its subpage hierarchy
    AllNotes,
    /// Root-level notes carrying no tag
    UntaggedNotes,
}

impl GroupKind {
    pub const ALL: [GroupKind; 2] = [GroupKind::AllNotes, GroupKind::UntaggedNotes];

    pub fn label(&self) -> &'static str {
        match self {
            Self::AllNotes => "All Notes",
            Self::UntaggedNotes => "Untagged Notes",
        }
    }

    fn path_segment(&self) -> &'static str {
        match self {
            Self::AllNotes => "all",
            Self::UntaggedNotes => "untagged",
        }
    }
}

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Tag,
    Note,
    Group,
}

/// What a node displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeContent {
    Root,
    Tag(TagId),
    Note(NoteId),
    Group(GroupKind),
}

impl NodeContent {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Root => NodeKind::Root,
            Self::Tag(_) => NodeKind::Tag,
            Self::Note(_) => NodeKind::Note,
            Self::Group(_) => NodeKind::Group,
        }
    }

    /// Backing entity; `None` for the root and synthetic groups
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::Tag(id) => Some(EntityId::Tag(*id)),
            Self::Note(id) => Some(EntityId::Note(*id)),
            Self::Root | Self::Group(_) => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Root | Self::Group(_))
    }
}

impl From<EntityId> for NodeContent {
    fn from(id: EntityId) -> Self {
        match id {
            EntityId::Note(n) => Self::Note(n),
            EntityId::Tag(t) => Self::Tag(t),
        }
    }
}

/// Path segment form: `t<id>`, `n<id>`, `all`, `untagged`
impl std::fmt::Display for NodeContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "/"),
            Self::Tag(id) => write!(f, "t{}", id),
            Self::Note(id) => write!(f, "n{}", id),
            Self::Group(g) => write!(f, "{}", g.path_segment()),
        }
    }
}

impl FromStr for NodeContent {
    type Err = crate::entity::ParseEntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for group in GroupKind::ALL {
            if s == group.path_segment() {
                return Ok(Self::Group(group));
            }
        }
        s.parse::<EntityId>().map(Self::from)
    }
}

/// A node of the display hierarchy
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub(crate) key: NodeKey,
    pub(crate) content: NodeContent,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) expanded: bool,
}

impl TreeNode {
    pub(crate) fn new(key: NodeKey, content: NodeContent, parent: Option<NodeKey>) -> Self {
        Self {
            key,
            content,
            parent,
            children: Vec::new(),
            expanded: false,
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn content(&self) -> NodeContent {
        self.content
    }

    pub fn kind(&self) -> NodeKind {
        self.content.kind()
    }

    pub fn entity(&self) -> Option<EntityId> {
        self.content.entity()
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
}
