//! Sibling ordering
//!
//! Siblings sort by `(rank, lowercase name)`: tags first, then notes, then
//! synthetic groups. A new node goes after every sibling whose key is not
//! greater than its own, so equal keys keep first-seen-first-placed order.

use super::node::NodeContent;
use crate::entity::EntityCache;

/// Sort key of a node among its siblings
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    rank: u8,
    name: String,
}

impl SortKey {
    pub fn new(rank: u8, name: &str) -> Self {
        Self {
            rank,
            name: normalize(name),
        }
    }

    /// Key for a node's content, reading names from the cache.
    /// Entities missing from the cache sort with an empty name.
    pub fn of(content: &NodeContent, cache: &EntityCache) -> Self {
        match content {
            NodeContent::Tag(id) => Self::new(0, cache.tag(*id).map(|t| t.name.as_str()).unwrap_or("")),
            NodeContent::Note(id) => Self::new(1, cache.note(*id).map(|n| n.title.as_str()).unwrap_or("")),
            NodeContent::Group(group) => Self::new(2, group.label()),
            NodeContent::Root => Self::new(3, ""),
        }
    }
}

/// Normalized form of a name for ordering
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// Index at which a node with key `new` is inserted into sorted `siblings`
pub fn insertion_index(siblings: &[SortKey], new: &SortKey) -> usize {
    siblings.partition_point(|existing| existing <= new)
}

/// True if the keys are in non-decreasing order
pub fn is_sorted(keys: &[SortKey]) -> bool {
    keys.windows(2).all(|w| w[0] <= w[1])
}
