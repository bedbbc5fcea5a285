//! Live scene tree
//!
//! The in-memory counterpart of a loaded document. Nodes live in an arena
//! keyed by [`EntityId`], which doubles as the side index for O(1) lookup
//! during attachment; parent links are plain ids used for traversal, never
//! for ownership, and each parent exclusively owns its ordered child list.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::document::Component;
use crate::id::EntityId;

/// Kind-specific state carried by a live node.
///
/// Implemented by each node kind's state type; the tree itself only needs
/// the component list back for re-serialization and a hook to recompute
/// derived state once parent linkage is final.
pub trait NodeState: fmt::Debug + Send + Sync {
    /// Components to persist for this node.
    fn components(&self) -> Vec<Component>;

    /// Called once after the node is attached and its parent linkage is
    /// final. Default: nothing to recompute.
    fn parent_attached(&mut self) {}

    /// Typed access for callers that know the concrete state.
    fn as_any(&self) -> &dyn Any;
}

/// One attached node.
#[derive(Debug)]
pub struct SceneNode {
    pub id: EntityId,
    /// Display name carried over from the entity record.
    pub name: String,
    /// Discriminant of the kind that claimed the record.
    pub kind: String,
    /// Containing node; `None` only for the root.
    pub parent: Option<EntityId>,
    /// Ordered child ids. The parent owns its children exclusively.
    pub children: Vec<EntityId>,
    /// Entity fields this build does not interpret, carried so a
    /// load/save round trip writes them back untouched.
    pub extra: Map<String, Value>,
    /// Kind-specific live state.
    pub state: Box<dyn NodeState>,
}

/// The live tree produced by a build.
#[derive(Debug)]
pub struct SceneTree {
    nodes: IndexMap<EntityId, SceneNode>,
    root: EntityId,
    /// Opaque editor metadata carried by the root.
    pub metadata: Map<String, Value>,
}

impl SceneTree {
    pub(crate) fn new(
        nodes: IndexMap<EntityId, SceneNode>,
        root: EntityId,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            nodes,
            root,
            metadata,
        }
    }

    pub fn root_id(&self) -> &EntityId {
        &self.root
    }

    /// The root node.
    ///
    /// # Panics
    /// Never for trees produced by the builder; the root is inserted before
    /// the tree is handed out and `detach` refuses to remove it.
    pub fn root(&self) -> &SceneNode {
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: &EntityId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in parent-before-child order, siblings in child-list order.
    pub fn preorder(&self) -> Vec<EntityId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root.clone()];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                for child in node.children.iter().rev() {
                    stack.push(child.clone());
                }
                out.push(id);
            }
        }
        out
    }

    /// Detach a non-root subtree, unlinking it from its parent.
    ///
    /// Returns the removed nodes in parent-before-child order, or `None` if
    /// the id is the root or unknown. Sibling order of the remaining
    /// children is preserved.
    pub fn detach(&mut self, id: &EntityId) -> Option<Vec<SceneNode>> {
        if *id == self.root || !self.nodes.contains_key(id) {
            return None;
        }

        let parent = self.nodes.get(id).and_then(|node| node.parent.clone());
        if let Some(parent) = parent {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                parent.children.retain(|child| child != id);
            }
        }

        // Collect the subtree before removing anything so child lists are
        // still intact while walking.
        let mut subtree = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                for child in node.children.iter().rev() {
                    stack.push(child.clone());
                }
                subtree.push(next);
            }
        }

        let mut removed = Vec::with_capacity(subtree.len());
        for entry in subtree {
            if let Some(node) = self.nodes.shift_remove(&entry) {
                removed.push(node);
            }
        }
        Some(removed)
    }

    /// Merge new entries into the root metadata.
    pub fn set_metadata(&mut self, new_metadata: Map<String, Value>) {
        for (key, value) in new_metadata {
            self.metadata.insert(key, value);
        }
    }

    pub fn clear_metadata(&mut self) {
        self.metadata.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::RawState;

    fn node(id: &str, parent: Option<&str>, children: &[&str]) -> SceneNode {
        SceneNode {
            id: EntityId::new(id),
            name: id.to_owned(),
            kind: "raw".to_owned(),
            parent: parent.map(EntityId::new),
            children: children.iter().copied().map(EntityId::new).collect(),
            extra: Map::new(),
            state: Box::new(RawState::new(Vec::new())),
        }
    }

    fn sample_tree() -> SceneTree {
        let mut nodes = IndexMap::new();
        nodes.insert(EntityId::new("root"), node("root", None, &["a", "b"]));
        nodes.insert(EntityId::new("a"), node("a", Some("root"), &["a1"]));
        nodes.insert(EntityId::new("a1"), node("a1", Some("a"), &[]));
        nodes.insert(EntityId::new("b"), node("b", Some("root"), &[]));
        SceneTree::new(nodes, EntityId::new("root"), Map::new())
    }

    #[test]
    fn test_preorder_visits_parents_first() {
        let tree = sample_tree();
        let order = tree.preorder();
        let names: Vec<&str> = order.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, ["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_detach_removes_subtree_and_keeps_sibling_order() {
        let mut tree = sample_tree();
        let removed = tree.detach(&EntityId::new("a")).unwrap();

        let removed: Vec<&str> = removed.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(removed, ["a", "a1"]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root().children, vec![EntityId::new("b")]);
    }

    #[test]
    fn test_root_cannot_be_detached() {
        let mut tree = sample_tree();
        assert!(tree.detach(&EntityId::new("root")).is_none());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_metadata_merge_and_clear() {
        let mut tree = sample_tree();
        let mut first = Map::new();
        first.insert("name".to_owned(), serde_json::json!("Lobby"));
        tree.set_metadata(first);

        let mut second = Map::new();
        second.insert("author".to_owned(), serde_json::json!("ada"));
        tree.set_metadata(second);

        assert_eq!(tree.metadata.len(), 2);
        tree.clear_metadata();
        assert!(tree.metadata.is_empty());
    }
}
