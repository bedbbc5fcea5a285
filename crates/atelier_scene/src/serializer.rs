//! Flattening a live tree back to the persisted form
//!
//! The definitional inverse of attachment: every non-root node records its
//! parent id and its sibling index, computed by counting the siblings that
//! precede it in the parent's child list. Output is always tagged with the
//! current format version; there is no downgrade path.

use indexmap::IndexMap;

use crate::document::{Entity, SceneDocument, SCENE_VERSION};
use crate::node::SceneTree;

/// Flatten a tree into a current-version scene document.
pub fn serialize_scene(tree: &SceneTree) -> SceneDocument {
    let root_id = tree.root_id().clone();
    let root = tree.root();

    let mut entities: IndexMap<_, _> = IndexMap::with_capacity(tree.len());
    entities.insert(
        root_id.clone(),
        Entity {
            name: root.name.clone(),
            components: root.state.components(),
            extra: root.extra.clone(),
            ..Default::default()
        },
    );

    for id in tree.preorder() {
        if id == root_id {
            continue;
        }
        let Some(node) = tree.get(&id) else {
            continue;
        };
        let Some(parent_id) = node.parent.clone() else {
            continue;
        };

        // Sibling position under the parent; only tree nodes count.
        let mut index = 0;
        if let Some(parent) = tree.get(&parent_id) {
            for sibling in &parent.children {
                if *sibling == id {
                    break;
                }
                index += 1;
            }
        }

        entities.insert(
            id.clone(),
            Entity {
                name: node.name.clone(),
                parent: Some(parent_id),
                index: Some(index),
                components: node.state.components(),
                extra: node.extra.clone(),
            },
        );
    }

    SceneDocument {
        version: SCENE_VERSION,
        root: root_id,
        metadata: tree.metadata.clone(),
        entities,
    }
}
