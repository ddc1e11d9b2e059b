//! Mutation operations and the workspace that runs them
//!
//! Every operation follows the same contract: validate against the cache,
//! make the remote call, and only once it has succeeded edit the cache and
//! bring every affected tree instance in line. A failed remote call leaves
//! cache and tree exactly as they were.

mod attach;
mod clipboard;
mod error;
mod lifecycle;
mod restructure;

pub use clipboard::ClipboardEntry;
pub use error::{OpError, OpResult};
pub use lifecycle::Placement;

use crate::api::{ApiCall, ApiResult, NoteApi};
use crate::entity::{EntityCache, EntityId, Note, NoteId, Tag, TagId};
use crate::tree::{HierarchyTree, NodeContent, NodeKey, TreeEvent, TreeResult, ViewState};
use std::sync::Arc;

/// The API handle, the entity cache, the display tree and the paste slot
///
/// A workspace is the single owner of its tree; operations run one after
/// another, each blocking on its remote calls.
pub struct Workspace {
    api: Arc<dyn NoteApi>,
    cache: EntityCache,
    tree: HierarchyTree,
    clipboard: Option<ClipboardEntry>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("notes", &self.cache.note_count())
            .field("tags", &self.cache.tag_count())
            .field("nodes", &self.tree.len())
            .field("clipboard", &self.clipboard)
            .finish()
    }
}

impl Workspace {
    /// Fetch everything from the server and build the tree
    pub fn open(api: Arc<dyn NoteApi>) -> OpResult<Self> {
        let cache = Self::fetch(api.as_ref())?;
        let tree = HierarchyTree::build(&cache)?;
        Ok(Self {
            api,
            cache,
            tree,
            clipboard: None,
        })
    }

    fn fetch(api: &dyn NoteApi) -> OpResult<EntityCache> {
        tracing::debug!(call = %ApiCall::GetNotesTree, "remote call");
        let notes = api.get_notes_tree(true)?;
        tracing::debug!(call = %ApiCall::GetTagsTree, "remote call");
        let tags = api.get_tags_tree()?;
        Ok(EntityCache::from_records(&notes, &tags))
    }

    /// Refetch and rebuild, keeping expansion and selection. On a failed
    /// fetch the current tree is left untouched.
    pub fn refresh(&mut self) -> OpResult<()> {
        let cache = Self::fetch(self.api.as_ref())?;
        let state = self.tree.save_state();
        let mut tree = HierarchyTree::build(&cache)?;
        tree.restore_state(&state)?;
        tree.clear_events();
        tree.push_event(TreeEvent::ModelReset);

        self.cache = cache;
        self.tree = tree;
        self.forget_missing();
        tracing::info!(nodes = self.tree.len(), "refreshed workspace");
        Ok(())
    }

    // === Accessors ===

    pub fn api(&self) -> &dyn NoteApi {
        self.api.as_ref()
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    /// Mutable access for view-only changes (expansion, selection, events)
    pub fn tree_mut(&mut self) -> &mut HierarchyTree {
        &mut self.tree
    }

    pub fn view_state(&self) -> ViewState {
        self.tree.save_state()
    }

    pub fn apply_view_state(&mut self, state: &ViewState) -> OpResult<()> {
        self.tree.restore_state(state)?;
        Ok(())
    }

    /// Every displayed instance of an entity, in document order
    pub fn instances(&self, entity: EntityId) -> Vec<NodeKey> {
        self.tree.find_all_instances(entity)
    }

    /// The entity displayed by a node, or `None` for synthetic nodes
    pub fn entity_at(&self, node: NodeKey) -> OpResult<Option<EntityId>> {
        let content = self.node_content(node)?;
        Ok(content.entity())
    }

    // === Internal helpers ===

    fn node_content(&self, node: NodeKey) -> OpResult<NodeContent> {
        self.tree.content(node).ok_or(OpError::NodeNotFound(node))
    }

    fn require_note(&self, id: NoteId) -> OpResult<&Note> {
        self.cache
            .note(id)
            .ok_or(OpError::EntityNotFound(EntityId::Note(id)))
    }

    fn require_tag(&self, id: TagId) -> OpResult<&Tag> {
        self.cache.tag(id).ok_or(OpError::EntityNotFound(EntityId::Tag(id)))
    }

    /// Run one remote call with logging
    fn remote<T>(&self, call: ApiCall, f: impl FnOnce(&dyn NoteApi) -> ApiResult<T>) -> OpResult<T> {
        tracing::debug!(%call, "remote call");
        f(self.api.as_ref()).map_err(|err| {
            tracing::warn!(%call, error = %err, "remote call failed");
            OpError::RemoteCallFailed(err)
        })
    }

    /// Apply a tree edit that follows a cache edit. Should the edit fail
    /// half way, the tree is rebuilt from the cache with the view state
    /// carried over, so it never stays half-edited.
    fn reconcile(&mut self, edit: impl FnOnce(&mut HierarchyTree, &EntityCache) -> TreeResult<()>) -> OpResult<()> {
        let state = self.tree.save_state();
        match edit(&mut self.tree, &self.cache) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "incremental tree edit failed, rebuilding");
                self.rebuild_from_cache(&state)
            }
        }
    }

    fn rebuild_from_cache(&mut self, state: &ViewState) -> OpResult<()> {
        let mut tree = HierarchyTree::build(&self.cache)?;
        tree.restore_state(state)?;
        tree.clear_events();
        tree.push_event(TreeEvent::ModelReset);
        self.tree = tree;
        Ok(())
    }

    /// Drop the paste slot if it refers to an entity that no longer exists
    fn forget_missing(&mut self) {
        if let Some(entry) = self.clipboard {
            if !self.cache.contains(entry.entity()) {
                tracing::debug!(entity = %entry.entity(), "clipboard entry deleted");
                self.clipboard = None;
            }
        }
    }
}
