//! Structural checks shared by the integration tests

use notetree::{EntityId, HierarchyTree, MemoryApi, NodeKey, Workspace};
use std::sync::Arc;

/// Paths of every instance of an entity, in document order
pub fn instance_paths(ws: &Workspace, entity: impl Into<EntityId>) -> Vec<String> {
    ws.instances(entity.into())
        .into_iter()
        .map(|k| ws.tree().path_string(k))
        .collect()
}

pub fn node(ws: &Workspace, path: &str) -> NodeKey {
    ws.tree()
        .resolve_path(path)
        .unwrap_or_else(|e| panic!("{}: {}", path, e))
}

/// The workspace tree equals a fresh build of its cache, and a fresh
/// workspace opened on the server shows the same tree
pub fn assert_consistent(ws: &Workspace, api: &Arc<MemoryApi>) {
    let rebuilt = HierarchyTree::build(ws.cache()).expect("rebuild");
    assert_eq!(
        ws.tree().snapshot(ws.cache()),
        rebuilt.snapshot(ws.cache()),
        "incremental tree differs from rebuild:\n{}\nvs\n{}",
        ws.tree().render_outline(ws.cache(), false),
        rebuilt.render_outline(ws.cache(), false),
    );

    let fresh = Workspace::open(api.clone()).expect("reopen");
    assert_eq!(
        ws.tree().snapshot(ws.cache()),
        fresh.tree().snapshot(fresh.cache()),
        "local tree differs from server:\n{}\nvs\n{}",
        ws.tree().render_outline(ws.cache(), false),
        fresh.tree().render_outline(fresh.cache(), false),
    );
}
