//! Change notifications for the view layer
//!
//! The tree journals one event per change, pushed only once the arena and
//! the instance index are consistent again. A view drains the journal after
//! each operation and applies the events in order.

use super::node::NodeKey;

/// A change to the display tree
///
/// Events are never bracketed: each one is pushed after its change is
/// complete, so a view reading the tree on receipt sees it consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    /// `node` now sits at `position` among `parent`'s children
    RowsInserted {
        parent: NodeKey,
        position: usize,
        node: NodeKey,
    },
    /// `node` (with its subtree) left `position` among `parent`'s children
    RowsRemoved {
        parent: NodeKey,
        position: usize,
        node: NodeKey,
    },
    /// The entity behind `node` changed (e.g. renamed)
    DataChanged { node: NodeKey },
    ExpansionChanged { node: NodeKey, expanded: bool },
    SelectionChanged { node: Option<NodeKey> },
    /// The whole tree was rebuilt; every previously seen key is stale
    ModelReset,
}

impl TreeEvent {
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::RowsInserted { .. } | Self::RowsRemoved { .. } | Self::ModelReset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_changes_are_not_structural() {
        assert!(!TreeEvent::DataChanged { node: NodeKey::new(1) }.is_structural());
        assert!(TreeEvent::ModelReset.is_structural());
    }
}
