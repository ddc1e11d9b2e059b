//! Read-only views of the tree: structural snapshots and text outlines

use super::hierarchy::HierarchyTree;
use super::node::{NodeContent, NodeKey, NodeKind};
use crate::entity::{EntityCache, EntityId};
use serde::Serialize;
use std::fmt::Write as _;

/// Structure of a subtree, independent of node keys and expansion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityId>,
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl HierarchyTree {
    /// Display label of a node
    pub fn label(&self, key: NodeKey, cache: &EntityCache) -> String {
        match self.content(key) {
            Some(NodeContent::Group(group)) => group.label().to_string(),
            Some(NodeContent::Root) => String::new(),
            Some(content) => content
                .entity()
                .and_then(|e| cache.label(e))
                .unwrap_or("<missing>")
                .to_string(),
            None => String::new(),
        }
    }

    /// Snapshot of a single node and everything below it
    pub fn snapshot_of(&self, key: NodeKey, cache: &EntityCache) -> NodeSnapshot {
        let content = self.content(key).unwrap_or(NodeContent::Root);
        NodeSnapshot {
            kind: content.kind(),
            entity: content.entity(),
            label: self.label(key, cache),
            children: self
                .children(key)
                .iter()
                .map(|k| self.snapshot_of(*k, cache))
                .collect(),
        }
    }

    /// Snapshot of the root's children
    pub fn snapshot(&self, cache: &EntityCache) -> Vec<NodeSnapshot> {
        self.children(self.root())
            .iter()
            .map(|k| self.snapshot_of(*k, cache))
            .collect()
    }

    /// Indented outline, one node per line. With `only_expanded`, children
    /// of collapsed nodes are hidden the way a tree widget would hide them.
    pub fn render_outline(&self, cache: &EntityCache, only_expanded: bool) -> String {
        let mut out = String::new();
        for key in self.children(self.root()) {
            self.render_into(&mut out, *key, 0, cache, only_expanded);
        }
        out
    }

    fn render_into(&self, out: &mut String, key: NodeKey, depth: usize, cache: &EntityCache, only_expanded: bool) {
        let has_children = !self.children(key).is_empty();
        let expanded = self.is_expanded(key);
        let marker = match (has_children, expanded) {
            (false, _) => '·',
            (true, true) => '▾',
            (true, false) => '▸',
        };
        let segment = self.content(key).map(|c| c.to_string()).unwrap_or_default();
        let selected = if self.selected() == Some(key) { "  <" } else { "" };
        let _ = writeln!(
            out,
            "{}{} {} [{}]{}",
            "  ".repeat(depth),
            marker,
            self.label(key, cache),
            segment,
            selected
        );
        if has_children && (expanded || !only_expanded) {
            for child in self.children(key) {
                self.render_into(out, *child, depth + 1, cache, only_expanded);
            }
        }
    }
}
