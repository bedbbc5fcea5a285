//! Topological entity sequencing
//!
//! Entity maps arrive in arbitrary order, but the builder must attach every
//! parent before any of its children. The sequencer computes each entity's
//! depth by walking parent links (memoized, so shared ancestor chains are
//! only walked once) and sorts by ascending depth, keeping the map's
//! insertion order as the stable tie-break within a depth.
//!
//! Both structural faults the walk can hit are detected here, before any
//! node construction starts: a parent id missing from the map, and a parent
//! cycle that never reaches a rootless entity.

use std::collections::HashMap;

use crate::document::EntityMap;
use crate::error::StructuralFault;
use crate::id::EntityId;

/// Order entity ids so that every entity's parent appears before it.
pub fn sequence(entities: &EntityMap) -> Result<Vec<EntityId>, StructuralFault> {
    let mut depths: HashMap<EntityId, u32> = HashMap::with_capacity(entities.len());

    for id in entities.keys() {
        if depths.contains_key(id) {
            continue;
        }

        // Walk towards the root, collecting the unvisited chain.
        let mut chain: Vec<EntityId> = Vec::new();
        let mut cursor = id.clone();
        let base = loop {
            if let Some(&depth) = depths.get(&cursor) {
                break depth + 1;
            }
            if chain.contains(&cursor) {
                return Err(StructuralFault::ParentCycle(cursor));
            }
            chain.push(cursor.clone());

            let Some(entity) = entities.get(&cursor) else {
                // Unreachable: cursor always came from the map or a verified
                // parent link.
                break 0;
            };
            match &entity.parent {
                None => break 0,
                Some(parent) => {
                    if !entities.contains_key(parent) {
                        return Err(StructuralFault::MissingParent {
                            entity: cursor,
                            parent: parent.clone(),
                        });
                    }
                    cursor = parent.clone();
                }
            }
        };

        // The chain runs child -> ancestor; the last element is the closest
        // to the root and sits at `base`.
        let mut depth = base;
        for entry in chain.iter().rev() {
            depths.insert(entry.clone(), depth);
            depth += 1;
        }
    }

    let mut order: Vec<EntityId> = entities.keys().cloned().collect();
    order.sort_by_key(|id| depths.get(id).copied().unwrap_or(0));
    Ok(order)
}
