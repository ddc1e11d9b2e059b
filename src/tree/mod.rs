//! The display hierarchy of tags and notes

mod events;
mod hierarchy;
mod node;
mod placement;
mod snapshot;
mod sort;
mod state;

#[cfg(test)]
mod tests;

pub use events::TreeEvent;
pub use hierarchy::{HierarchyTree, TreeError, TreeResult};
pub use node::{GroupKind, NodeContent, NodeKey, NodeKind, TreeNode};
pub use snapshot::NodeSnapshot;
pub use sort::{insertion_index, is_sorted, normalize, SortKey};
pub use state::{restore_state, save_state, ViewState};
