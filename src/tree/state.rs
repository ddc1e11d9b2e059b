//! Expansion and selection state keyed by entity id
//!
//! Node keys do not survive a rebuild, so view state is captured as entity
//! paths such as `t1/n5` (and by group kind for the synthetic groups). A
//! path pins one instance; when it no longer resolves the entity id is used
//! instead and applies to whichever nodes the new tree has for it.

use super::hierarchy::{HierarchyTree, TreeResult};
use super::node::{GroupKind, NodeContent, NodeKey};
use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What the user was looking at
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// Entities with at least one expanded instance
    #[serde(default)]
    pub expanded: BTreeSet<EntityId>,
    /// Path of every expanded instance
    #[serde(default)]
    pub expanded_paths: BTreeSet<String>,
    /// Expanded synthetic groups
    #[serde(default)]
    pub expanded_groups: BTreeSet<GroupKind>,
    #[serde(default)]
    pub selected: Option<EntityId>,
    #[serde(default)]
    pub selected_path: Option<String>,
}

/// The entity named by the last segment of a path
fn path_entity(path: &str) -> Option<EntityId> {
    path.rsplit('/')
        .next()?
        .parse::<NodeContent>()
        .ok()?
        .entity()
}

/// Capture expansion and selection from a tree
pub fn save_state(tree: &HierarchyTree) -> ViewState {
    let mut state = ViewState::default();
    for key in tree.depth_first() {
        if !tree.is_expanded(key) {
            continue;
        }
        match tree.content(key) {
            Some(NodeContent::Group(group)) => {
                state.expanded_groups.insert(group);
            }
            Some(content) => {
                if let Some(entity) = content.entity() {
                    state.expanded.insert(entity);
                    state.expanded_paths.insert(tree.path_string(key));
                }
            }
            None => {}
        }
    }
    if let Some(key) = tree.selected() {
        state.selected = tree.content(key).and_then(|c| c.entity());
        state.selected_path = state.selected.map(|_| tree.path_string(key));
    }
    state
}

/// Re-apply captured state.
///
/// An expanded entity whose saved paths all still resolve gets exactly
/// those instances expanded. Otherwise every instance of it is expanded
/// together with its ancestors. The selection goes to the saved path, or
/// failing that to the first instance of the selected entity in document
/// order. Nodes not named in the state are left as they are.
pub fn restore_state(tree: &mut HierarchyTree, state: &ViewState) -> TreeResult<()> {
    for group in &state.expanded_groups {
        let key = tree.group(*group);
        tree.set_expanded(key, true)?;
    }

    let mut pinned: BTreeMap<EntityId, Vec<NodeKey>> = BTreeMap::new();
    let mut stale = BTreeSet::new();
    for path in &state.expanded_paths {
        let Some(entity) = path_entity(path) else {
            continue;
        };
        match tree.resolve_path(path) {
            Ok(key) => pinned.entry(entity).or_default().push(key),
            Err(_) => {
                stale.insert(entity);
            }
        }
    }
    for entity in &state.expanded {
        match pinned.get(entity) {
            Some(keys) if !stale.contains(entity) => {
                for key in keys {
                    tree.set_expanded(*key, true)?;
                }
            }
            _ => {
                for key in tree.find_all_instances(*entity) {
                    tree.expand_to(key)?;
                }
            }
        }
    }

    let selection = state
        .selected_path
        .as_deref()
        .and_then(|path| tree.resolve_path(path).ok())
        .filter(|key| tree.content(*key).and_then(|c| c.entity()) == state.selected)
        .or_else(|| {
            state
                .selected
                .and_then(|entity| tree.find_all_instances(entity).first().copied())
        });
    tree.select(selection)?;
    tracing::debug!(
        expanded = state.expanded.len(),
        stale = stale.len(),
        selected = ?state.selected,
        "restored view state"
    );
    Ok(())
}

impl HierarchyTree {
    pub fn save_state(&self) -> ViewState {
        save_state(self)
    }

    pub fn restore_state(&mut self, state: &ViewState) -> TreeResult<()> {
        restore_state(self, state)
    }
}
