//! HierarchyTree: the display hierarchy as an arena of nodes

use super::events::TreeEvent;
use super::node::{GroupKind, NodeContent, NodeKey, NodeKind, TreeNode};
use super::sort::{insertion_index, SortKey};
use crate::entity::{EntityCache, EntityId, TagId};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from structural tree edits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("moving {moved} under {target} would make it its own ancestor")]
    CyclicMove { moved: NodeKey, target: NodeKey },

    #[error("tree node not found: {0}")]
    NodeNotFound(NodeKey),

    #[error("a {child:?} node cannot be placed under a {parent:?} node")]
    InvalidParent { child: NodeKind, parent: NodeKind },

    #[error("synthetic node {0} cannot be removed or moved")]
    Synthetic(NodeKey),

    #[error("{0} has no node in the tree")]
    NotDisplayed(EntityId),

    #[error("no node at path '{0}'")]
    UnknownPath(String),
}

/// Result type for tree edits
pub type TreeResult<T> = Result<T, TreeError>;

/// Which node kinds may hold which
fn check_placement(child: NodeKind, parent: NodeKind) -> TreeResult<()> {
    let allowed = match child {
        NodeKind::Root => false,
        NodeKind::Tag => matches!(parent, NodeKind::Root | NodeKind::Tag),
        NodeKind::Note => matches!(parent, NodeKind::Tag | NodeKind::Note | NodeKind::Group),
        NodeKind::Group => parent == NodeKind::Root,
    };
    if allowed {
        Ok(())
    } else {
        Err(TreeError::InvalidParent { child, parent })
    }
}

/// The display hierarchy
///
/// Nodes live in an arena keyed by [`NodeKey`]; ownership runs parent to
/// child through the `children` lists and the `parent` field is a plain
/// back-reference. One entity may back several nodes, so an index from
/// entity id to node keys is kept up to date on every insert and remove.
///
/// The tree is confined to a single owner and is not `Sync`-shared.
#[derive(Debug)]
pub struct HierarchyTree {
    nodes: HashMap<NodeKey, TreeNode>,
    root: NodeKey,
    all_notes: NodeKey,
    untagged: NodeKey,
    index: HashMap<EntityId, Vec<NodeKey>>,
    selected: Option<NodeKey>,
    next_key: u64,
    events: Vec<TreeEvent>,
}

impl Default for HierarchyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyTree {
    /// Create a tree holding only the root and the two synthetic groups
    pub fn new() -> Self {
        let root = NodeKey::new(0);
        let all_notes = NodeKey::new(1);
        let untagged = NodeKey::new(2);

        let mut root_node = TreeNode::new(root, NodeContent::Root, None);
        root_node.expanded = true;
        // "All Notes" < "Untagged Notes", already in sort order
        root_node.children = vec![all_notes, untagged];

        let mut nodes = HashMap::new();
        nodes.insert(root, root_node);
        nodes.insert(
            all_notes,
            TreeNode::new(all_notes, NodeContent::Group(GroupKind::AllNotes), Some(root)),
        );
        nodes.insert(
            untagged,
            TreeNode::new(untagged, NodeContent::Group(GroupKind::UntaggedNotes), Some(root)),
        );

        Self {
            nodes,
            root,
            all_notes,
            untagged,
            index: HashMap::new(),
            selected: None,
            next_key: 3,
            events: Vec::new(),
        }
    }

    // === Lookups ===

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn group(&self, kind: GroupKind) -> NodeKey {
        match kind {
            GroupKind::AllNotes => self.all_notes,
            GroupKind::UntaggedNotes => self.untagged,
        }
    }

    pub fn node(&self, key: NodeKey) -> Option<&TreeNode> {
        self.nodes.get(&key)
    }

    pub fn get(&self, key: NodeKey) -> TreeResult<&TreeNode> {
        self.nodes.get(&key).ok_or(TreeError::NodeNotFound(key))
    }

    fn node_mut(&mut self, key: NodeKey) -> TreeResult<&mut TreeNode> {
        self.nodes.get_mut(&key).ok_or(TreeError::NodeNotFound(key))
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Number of nodes, root excluded
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(&key).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(&key).and_then(|n| n.parent)
    }

    pub fn content(&self, key: NodeKey) -> Option<NodeContent> {
        self.nodes.get(&key).map(|n| n.content)
    }

    /// Index of a node among its siblings
    pub fn position(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|k| *k == key)
    }

    /// Child of `parent` backed by `entity`, if any
    pub fn child_instance(&self, parent: NodeKey, entity: EntityId) -> Option<NodeKey> {
        self.children(parent)
            .iter()
            .copied()
            .find(|k| self.content(*k).and_then(|c| c.entity()) == Some(entity))
    }

    /// The single node of a tag, if displayed
    pub fn tag_node(&self, tag: TagId) -> Option<NodeKey> {
        self.index
            .get(&EntityId::Tag(tag))
            .and_then(|keys| keys.first().copied())
    }

    /// True if `ancestor` lies on the parent chain of `node`
    pub fn is_ancestor(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let mut current = self.parent(node);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = self.parent(key);
        }
        false
    }

    /// Parent chain from the immediate parent up to the root
    pub fn ancestors(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut current = self.parent(key);
        while let Some(k) = current {
            out.push(k);
            current = self.parent(k);
        }
        out
    }

    /// The node and everything below it, depth-first pre-order
    pub fn subtree(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Every node except the root, in document order
    pub fn depth_first(&self) -> Vec<NodeKey> {
        let mut all = self.subtree(self.root);
        all.remove(0);
        all
    }

    /// Sibling positions from the root down to `key`; orders nodes by
    /// depth-first pre-order when compared lexicographically
    fn document_path(&self, key: NodeKey) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = key;
        while let Some(pos) = self.position(current) {
            path.push(pos);
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Every node backed by `entity`, in document order
    pub fn find_all_instances(&self, entity: EntityId) -> Vec<NodeKey> {
        let Some(keys) = self.index.get(&entity) else {
            return Vec::new();
        };
        let mut ordered: Vec<(Vec<usize>, NodeKey)> =
            keys.iter().map(|k| (self.document_path(*k), *k)).collect();
        ordered.sort();
        ordered.into_iter().map(|(_, k)| k).collect()
    }

    /// Closest preceding sibling of the same kind
    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let kind = self.node(key)?.kind();
        let parent = self.parent(key)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|k| *k == key)?;
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .find(|k| self.node(*k).map(|n| n.kind()) == Some(kind))
    }

    // === Paths ===

    /// Contents from the root's child down to `key`
    pub fn path(&self, key: NodeKey) -> Vec<NodeContent> {
        let mut out: Vec<NodeContent> = std::iter::once(key)
            .chain(self.ancestors(key))
            .filter_map(|k| self.content(k))
            .filter(|c| *c != NodeContent::Root)
            .collect();
        out.reverse();
        out
    }

    /// Textual path such as `t1/n10/n11`
    pub fn path_string(&self, key: NodeKey) -> String {
        self.path(key)
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Resolve a textual path produced by [`path_string`](Self::path_string)
    pub fn resolve_path(&self, path: &str) -> TreeResult<NodeKey> {
        let unknown = || TreeError::UnknownPath(path.to_string());
        let mut current = self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let content: NodeContent = segment.parse().map_err(|_| unknown())?;
            current = self
                .children(current)
                .iter()
                .copied()
                .find(|k| self.content(*k) == Some(content))
                .ok_or_else(unknown)?;
        }
        Ok(current)
    }

    // === Structural edits ===

    fn allocate(&mut self) -> NodeKey {
        let key = NodeKey::new(self.next_key);
        self.next_key += 1;
        key
    }

    fn sorted_position(&self, parent: NodeKey, new: &SortKey, cache: &EntityCache) -> usize {
        let siblings: Vec<SortKey> = self
            .children(parent)
            .iter()
            .filter_map(|k| self.content(*k))
            .map(|c| SortKey::of(&c, cache))
            .collect();
        insertion_index(&siblings, new)
    }

    /// Insert a new node under `parent` at its sorted position
    pub fn insert(
        &mut self,
        content: NodeContent,
        parent: NodeKey,
        cache: &EntityCache,
    ) -> TreeResult<(NodeKey, usize)> {
        check_placement(content.kind(), self.get(parent)?.kind())?;

        let position = self.sorted_position(parent, &SortKey::of(&content, cache), cache);
        let key = self.allocate();
        self.nodes.insert(key, TreeNode::new(key, content, Some(parent)));
        self.node_mut(parent)?.children.insert(position, key);
        if let Some(entity) = content.entity() {
            self.index.entry(entity).or_default().push(key);
        }

        tracing::debug!(node = %key, parent = %parent, position, "inserted tree node");
        self.events.push(TreeEvent::RowsInserted { parent, position, node: key });
        Ok((key, position))
    }

    /// Detach a node and drop its whole subtree. The entity cache is not
    /// touched.
    pub fn remove(&mut self, key: NodeKey) -> TreeResult<()> {
        let node = self.get(key)?;
        if node.content.is_synthetic() {
            return Err(TreeError::Synthetic(key));
        }
        let parent = node.parent.ok_or(TreeError::Synthetic(key))?;
        let position = self.position(key).ok_or(TreeError::NodeNotFound(key))?;

        let doomed = self.subtree(key);
        self.node_mut(parent)?.children.remove(position);
        for k in &doomed {
            if let Some(entity) = self.nodes.remove(k).and_then(|n| n.entity()) {
                if let Some(keys) = self.index.get_mut(&entity) {
                    keys.retain(|other| other != k);
                    if keys.is_empty() {
                        self.index.remove(&entity);
                    }
                }
            }
        }

        tracing::debug!(node = %key, parent = %parent, position, removed = doomed.len(), "removed tree node");
        self.events.push(TreeEvent::RowsRemoved { parent, position, node: key });

        if self.selected.is_some_and(|s| doomed.contains(&s)) {
            self.selected = None;
            self.events.push(TreeEvent::SelectionChanged { node: None });
        }
        Ok(())
    }

    /// Reparent a node, keeping the node objects of its subtree (and so their
    /// expansion state). Returns the new position.
    pub fn move_node(&mut self, key: NodeKey, new_parent: NodeKey, cache: &EntityCache) -> TreeResult<usize> {
        let node = self.get(key)?;
        if node.content.is_synthetic() {
            return Err(TreeError::Synthetic(key));
        }
        let content = node.content;
        let old_parent = node.parent.ok_or(TreeError::Synthetic(key))?;
        let target_kind = self.get(new_parent)?.kind();

        if new_parent == key || self.is_ancestor(key, new_parent) {
            return Err(TreeError::CyclicMove { moved: key, target: new_parent });
        }
        check_placement(content.kind(), target_kind)?;

        let old_position = self.position(key).ok_or(TreeError::NodeNotFound(key))?;
        self.node_mut(old_parent)?.children.remove(old_position);
        let position = self.sorted_position(new_parent, &SortKey::of(&content, cache), cache);
        self.node_mut(new_parent)?.children.insert(position, key);
        self.node_mut(key)?.parent = Some(new_parent);

        tracing::debug!(node = %key, from = %old_parent, to = %new_parent, "moved tree node");
        self.events.push(TreeEvent::RowsRemoved {
            parent: old_parent,
            position: old_position,
            node: key,
        });
        self.events.push(TreeEvent::RowsInserted {
            parent: new_parent,
            position,
            node: key,
        });
        Ok(position)
    }

    /// Put a node back at its sorted position after its name changed
    pub fn reposition(&mut self, key: NodeKey, cache: &EntityCache) -> TreeResult<usize> {
        let content = self.get(key)?.content;
        let parent = self.parent(key).ok_or(TreeError::Synthetic(key))?;
        let old_position = self.position(key).ok_or(TreeError::NodeNotFound(key))?;

        self.node_mut(parent)?.children.remove(old_position);
        let position = self.sorted_position(parent, &SortKey::of(&content, cache), cache);
        self.node_mut(parent)?.children.insert(position, key);

        if position != old_position {
            self.events.push(TreeEvent::RowsRemoved {
                parent,
                position: old_position,
                node: key,
            });
            self.events.push(TreeEvent::RowsInserted { parent, position, node: key });
        }
        Ok(position)
    }

    /// Report a data change on a node without touching structure
    pub fn touch(&mut self, key: NodeKey) {
        if self.nodes.contains_key(&key) {
            self.events.push(TreeEvent::DataChanged { node: key });
        }
    }

    // === Expansion and selection ===

    pub fn is_expanded(&self, key: NodeKey) -> bool {
        self.nodes.get(&key).is_some_and(|n| n.expanded)
    }

    pub fn set_expanded(&mut self, key: NodeKey, expanded: bool) -> TreeResult<()> {
        let node = self.node_mut(key)?;
        if node.expanded != expanded {
            node.expanded = expanded;
            self.events.push(TreeEvent::ExpansionChanged { node: key, expanded });
        }
        Ok(())
    }

    /// Expand a node and every ancestor, outermost first
    pub fn expand_to(&mut self, key: NodeKey) -> TreeResult<()> {
        self.get(key)?;
        let root = self.root;
        let mut chain = self.ancestors(key);
        chain.reverse();
        for k in chain.into_iter().filter(|k| *k != root) {
            self.set_expanded(k, true)?;
        }
        self.set_expanded(key, true)
    }

    pub fn selected(&self) -> Option<NodeKey> {
        self.selected
    }

    pub fn select(&mut self, key: Option<NodeKey>) -> TreeResult<()> {
        if let Some(k) = key {
            self.get(k)?;
        }
        if self.selected != key {
            self.selected = key;
            self.events.push(TreeEvent::SelectionChanged { node: key });
        }
        Ok(())
    }

    // === Events ===

    pub(crate) fn push_event(&mut self, event: TreeEvent) {
        self.events.push(event);
    }

    pub(crate) fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Pending change notifications, oldest first
    pub fn events(&self) -> &[TreeEvent] {
        &self.events
    }

    /// Take the pending change notifications
    pub fn drain_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }
}
