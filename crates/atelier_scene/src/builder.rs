//! Tree building from a migrated document
//!
//! For each entity in sequencer order the builder resolves a node kind from
//! the catalog, materializes its state, and attaches it to its already-built
//! parent at the record's sibling index. Attachment is strictly sequential;
//! the background tasks kinds enqueue are joined as one batch after the loop,
//! so the build is only complete once every dependency has settled.
//!
//! Structural faults and unresolved kinds abort the build. Per-node failures
//! reported by kinds (or by their dependency tasks) are collected and
//! returned next to a usable tree.

use indexmap::IndexMap;
use log::debug;

use crate::catalog::{DependencyQueue, ErrorReporter, NodeCatalog};
use crate::document::SceneDocument;
use crate::error::{NodeError, Result, SceneError, StructuralFault};
use crate::id::EntityId;
use crate::node::{SceneNode, SceneTree};
use crate::sequence::sequence;

/// Outcome of a successful build: a usable tree plus whatever non-fatal
/// errors were collected along the way.
#[derive(Debug)]
pub struct SceneBuild {
    pub tree: SceneTree,
    pub errors: Vec<NodeError>,
}

/// Build the live tree for a document already at the current version.
///
/// `ctx` is the caller's rendering/runtime context, handed through to each
/// kind's `deserialize` untouched.
pub async fn build_scene<C: Send + Sync>(
    ctx: &C,
    doc: &SceneDocument,
    catalog: &NodeCatalog<C>,
) -> Result<SceneBuild> {
    // Eager structural validation: missing parents and cycles fail here,
    // before any node work starts.
    let order = sequence(&doc.entities)?;

    let mut nodes: IndexMap<EntityId, SceneNode> = IndexMap::with_capacity(order.len());
    let mut root: Option<EntityId> = None;
    let mut deps = DependencyQueue::new();
    let mut errors = ErrorReporter::new();

    for id in &order {
        let Some(entity) = doc.entities.get(id) else {
            continue;
        };

        let kind = catalog
            .resolve(entity)
            .ok_or_else(|| SceneError::UnresolvedKind {
                id: id.clone(),
                name: entity.name.clone(),
            })?;
        debug!("entity {} ({:?}) resolved to kind {}", id, entity.name, kind.kind_name());

        deps.current = id.clone();
        errors.current = id.clone();
        let state = kind.deserialize(ctx, entity, &mut deps, &mut errors).await?;

        let node = SceneNode {
            id: id.clone(),
            name: entity.name.clone(),
            kind: kind.kind_name().to_owned(),
            parent: entity.parent.clone(),
            children: Vec::new(),
            extra: entity.extra.clone(),
            state,
        };

        if let Some(parent_id) = &entity.parent {
            // Guaranteed built already by sequencing order.
            let parent = nodes
                .get_mut(parent_id)
                .ok_or_else(|| StructuralFault::MissingParent {
                    entity: id.clone(),
                    parent: parent_id.clone(),
                })?;
            let at = entity.index.unwrap_or(parent.children.len());
            let at = at.min(parent.children.len());
            parent.children.insert(at, id.clone());
        } else if *id == doc.root {
            root = Some(id.clone());
        } else {
            return Err(StructuralFault::OrphanEntity { entity: id.clone() }.into());
        }

        nodes.insert(id.clone(), node);
        if let Some(node) = nodes.get_mut(id) {
            node.state.parent_attached();
        }
    }

    let root = root.ok_or_else(|| StructuralFault::RootNotFound(doc.root.clone()))?;

    // Join barrier: the build is not done until every registered dependency
    // across all nodes has settled.
    let mut collected = errors.into_errors();
    collected.extend(deps.join().await);

    Ok(SceneBuild {
        tree: SceneTree::new(nodes, root, doc.metadata.clone()),
        errors: collected,
    })
}
