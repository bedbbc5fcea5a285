//! Scene document version migration
//!
//! A loaded document may be at any format version from 1 (legacy, name-keyed)
//! through the current [`SCENE_VERSION`]. Each step is a pure transform from
//! version N to N+1 that only rewrites component lists and the version tag;
//! tree shape (`parent`/`index`) and entity identity are never changed past
//! the legacy re-keying step.
//!
//! Steps are looked up in a dispatch table keyed by the version they start
//! at and applied until the document reaches the current version, so
//! migration is resumable from any intermediate version and a no-op at the
//! current one. Component shapes a step does not account for are left
//! untouched rather than guessed at.

use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Value};

use crate::document::{Component, Entity, SceneDocument, SCENE_VERSION};
use crate::error::{Result, SceneError};
use crate::id::EntityId;

type MigrationStep = fn(SceneDocument) -> SceneDocument;

/// The step that raises a document from `version` to `version + 1`.
fn step_for(version: u32) -> Option<MigrationStep> {
    match version {
        1 => Some(legacy_names_to_ids),
        2 => Some(normalize_visibility),
        3 => Some(rename_visible_prop),
        4 => Some(pluralize_animation_indices),
        _ => None,
    }
}

/// Raise a document to the current format version.
///
/// Monotonic: the version never decreases and never skips backward. A
/// document already at the current version passes through unchanged; one
/// tagged with a version newer than this build fails with
/// [`SceneError::UnsupportedVersion`].
pub fn migrate(mut doc: SceneDocument) -> Result<SceneDocument> {
    if doc.version > SCENE_VERSION {
        return Err(SceneError::UnsupportedVersion(doc.version));
    }

    while doc.version < SCENE_VERSION {
        let from = doc.version;
        let step = step_for(from).ok_or(SceneError::UnsupportedVersion(from))?;
        doc = step(doc);
        debug!("migrated scene document v{} -> v{}", from, doc.version);
    }

    Ok(doc)
}

/// v1 -> v2: legacy documents key entities by human-readable names.
///
/// Generates a stable opaque id per name, re-keys the map, records the old
/// key as the entity's `name`, and rewrites every `parent` reference from
/// name to id. When the root name is itself a key in the map, its generated
/// id becomes the document root; otherwise a bare root record is
/// synthesized.
fn legacy_names_to_ids(doc: SceneDocument) -> SceneDocument {
    let SceneDocument {
        root,
        metadata,
        entities,
        ..
    } = doc;

    let mut ids: IndexMap<EntityId, EntityId> = IndexMap::with_capacity(entities.len() + 1);
    ids.insert(root.clone(), EntityId::generate());
    for name in entities.keys() {
        ids.entry(name.clone()).or_insert_with(EntityId::generate);
    }
    let root_id = ids[&root].clone();

    let mut new_entities = IndexMap::with_capacity(entities.len() + 1);
    if !entities.contains_key(&root) {
        new_entities.insert(
            root_id.clone(),
            Entity {
                name: root.as_str().to_owned(),
                ..Default::default()
            },
        );
    }

    for (name, mut entity) in entities {
        entity.name = name.as_str().to_owned();
        // A parent name absent from the map is dropped here and surfaces as
        // an orphan fault at build time.
        if let Some(parent) = entity.parent.take() {
            entity.parent = ids.get(&parent).cloned();
        }
        new_entities.insert(ids[&name].clone(), entity);
    }

    SceneDocument {
        version: 2,
        root: root_id,
        metadata,
        entities: new_entities,
    }
}

/// Legacy flags were written by hand and show up as booleans, numbers, or
/// strings; anything other than `false`, `null`, `0`, and `""` counts as set.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// v2 -> v3: explicit visibility plus derived floor/walkable components.
///
/// Every entity with at least one component gains a `visible` component. A
/// `gltf-model` flagged for the floor plan (and no `nav-mesh` sibling)
/// derives `collidable` and `walkable`; a `ground-plane` derives `walkable`.
/// When a model and a nav-mesh coexist on one entity its whole component
/// list is replaced by a single `floor-plan` component with fixed defaults,
/// discarding the other components.
fn normalize_visibility(mut doc: SceneDocument) -> SceneDocument {
    doc.version = 3;

    for entity in doc.entities.values_mut() {
        if entity.components.is_empty() {
            continue;
        }

        entity
            .components
            .push(Component::new("visible", json!({ "value": true })));

        let has_model = entity.has_component("gltf-model");
        let has_nav_mesh = entity.has_component("nav-mesh");
        let in_floor_plan = entity
            .component("gltf-model")
            .and_then(|c| c.props.get("includeInFloorPlan"))
            .map_or(false, truthy);

        if !has_nav_mesh && in_floor_plan {
            entity.components.push(Component::empty("collidable"));
            entity.components.push(Component::empty("walkable"));
        }

        if entity.has_component("ground-plane") {
            entity.components.push(Component::empty("walkable"));
        }

        if has_model && has_nav_mesh {
            entity.components = vec![Component::new(
                "floor-plan",
                json!({
                    "autoCellSize": true,
                    "cellSize": 1,
                    "cellHeight": 0.1,
                    "agentHeight": 1.0,
                    "agentRadius": 0.0001,
                    "agentMaxClimb": 0.5,
                    "agentMaxSlope": 45,
                    "regionMinSize": 4
                }),
            )];
        }
    }

    doc
}

/// v3 -> v4: the `visible` component's generic `value` prop becomes a
/// semantically named `visible` boolean, defaulting to true when neither key
/// is present. A no-op when `visible` already exists.
fn rename_visible_prop(mut doc: SceneDocument) -> SceneDocument {
    doc.version = 4;

    for entity in doc.entities.values_mut() {
        let Some(component) = entity.component_mut("visible") else {
            continue;
        };
        if component.props.contains_key("visible") {
            continue;
        }

        let visible = component.props.remove("value").unwrap_or(Value::Bool(true));
        component.props = serde_json::Map::new();
        component.props.insert("visible".to_owned(), visible);
    }

    doc
}

/// Component names whose presence marks an entity as mesh-combinable.
const COMBINABLE_COMPONENTS: [&str; 2] = ["gltf-model", "kit-piece"];

/// v4 -> v5: `loop-animation` stores a list of active clip indices instead
/// of a single index; the prior value is wrapped in a one-element list, or
/// an empty list when absent. Entities carrying a combinable component gain
/// an empty `combine` component.
fn pluralize_animation_indices(mut doc: SceneDocument) -> SceneDocument {
    doc.version = 5;

    for entity in doc.entities.values_mut() {
        if entity.components.is_empty() {
            continue;
        }

        if let Some(animation) = entity.component_mut("loop-animation") {
            let indices = match animation.props.remove("activeClipIndex") {
                Some(index) => Value::Array(vec![index]),
                None => Value::Array(Vec::new()),
            };
            animation
                .props
                .insert("activeClipIndices".to_owned(), indices);
        }

        let combinable = entity
            .components
            .iter()
            .any(|c| COMBINABLE_COMPONENTS.contains(&c.name.as_str()));
        if combinable {
            entity.components.push(Component::empty("combine"));
        }
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_from(value: Value) -> SceneDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_legacy_names_become_ids() {
        let doc = doc_from(json!({
            "root": "Scene",
            "entities": {
                "Scene": {},
                "Box": { "parent": "Scene" }
            }
        }));

        let migrated = migrate(doc).unwrap();
        assert_eq!(migrated.version, SCENE_VERSION);
        assert_eq!(migrated.entities.len(), 2);

        // The root record kept its generated id and its original key as name.
        let root = &migrated.entities[&migrated.root];
        assert_eq!(root.name, "Scene");
        assert!(root.parent.is_none());
        assert_ne!(migrated.root, EntityId::new("Scene"));

        let child = migrated
            .entities
            .values()
            .find(|e| e.name == "Box")
            .unwrap();
        assert_eq!(child.parent.as_ref(), Some(&migrated.root));
    }

    #[test]
    fn test_legacy_root_absent_from_map_is_synthesized() {
        let doc = doc_from(json!({
            "root": "Scene",
            "entities": {
                "Box": { "parent": "Scene" }
            }
        }));

        let migrated = migrate(doc).unwrap();
        assert_eq!(migrated.entities.len(), 2);
        let root = &migrated.entities[&migrated.root];
        assert_eq!(root.name, "Scene");
    }

    #[test]
    fn test_floor_plan_model_derives_walkable() {
        let doc = doc_from(json!({
            "version": 2,
            "root": "a",
            "entities": {
                "a": {},
                "b": {
                    "parent": "a",
                    "components": [
                        { "name": "gltf-model", "props": { "includeInFloorPlan": true } }
                    ]
                }
            }
        }));

        let migrated = migrate(doc).unwrap();
        let entity = &migrated.entities[&EntityId::new("b")];
        assert!(entity.has_component("visible"));
        assert!(entity.has_component("collidable"));
        assert!(entity.has_component("walkable"));
    }

    #[test]
    fn test_floor_plan_flag_accepts_truthy_non_booleans() {
        let doc = doc_from(json!({
            "version": 2,
            "root": "a",
            "entities": {
                "a": {},
                "numeric": {
                    "parent": "a",
                    "components": [
                        { "name": "gltf-model", "props": { "includeInFloorPlan": 1 } }
                    ]
                },
                "empty": {
                    "parent": "a",
                    "components": [
                        { "name": "gltf-model", "props": { "includeInFloorPlan": "" } }
                    ]
                }
            }
        }));

        let migrated = migrate(doc).unwrap();

        let numeric = &migrated.entities[&EntityId::new("numeric")];
        assert!(numeric.has_component("collidable"));
        assert!(numeric.has_component("walkable"));

        // Falsy non-booleans stay excluded.
        let empty = &migrated.entities[&EntityId::new("empty")];
        assert!(!empty.has_component("collidable"));
        assert!(!empty.has_component("walkable"));
    }

    #[test]
    fn test_model_with_nav_mesh_collapses_to_floor_plan() {
        let doc = doc_from(json!({
            "version": 2,
            "root": "a",
            "entities": {
                "a": {},
                "b": {
                    "parent": "a",
                    "components": [
                        { "name": "gltf-model", "props": { "src": "x.glb" } },
                        { "name": "nav-mesh", "props": {} },
                        { "name": "shadow", "props": {} }
                    ]
                }
            }
        }));

        let migrated = migrate(doc).unwrap();
        let entity = &migrated.entities[&EntityId::new("b")];
        // Destructive replacement: everything else is discarded.
        assert_eq!(entity.components.len(), 1);
        let floor_plan = &entity.components[0];
        assert_eq!(floor_plan.name, "floor-plan");
        assert_eq!(floor_plan.props["cellSize"], json!(1));
        assert_eq!(floor_plan.props["agentMaxSlope"], json!(45));
    }

    #[test]
    fn test_visible_prop_renamed() {
        let doc = doc_from(json!({
            "version": 3,
            "root": "a",
            "entities": {
                "a": {},
                "b": {
                    "parent": "a",
                    "components": [{ "name": "visible", "props": { "value": false } }]
                },
                "c": {
                    "parent": "a",
                    "components": [{ "name": "visible", "props": {} }]
                }
            }
        }));

        let migrated = migrate(doc).unwrap();
        let hidden = &migrated.entities[&EntityId::new("b")];
        assert_eq!(
            hidden.component("visible").unwrap().props["visible"],
            json!(false)
        );
        let defaulted = &migrated.entities[&EntityId::new("c")];
        assert_eq!(
            defaulted.component("visible").unwrap().props["visible"],
            json!(true)
        );
    }

    #[test]
    fn test_visible_rename_is_idempotent() {
        let doc = doc_from(json!({
            "version": 3,
            "root": "a",
            "entities": {
                "a": {},
                "b": {
                    "parent": "a",
                    "components": [
                        { "name": "visible", "props": { "visible": false, "value": true } }
                    ]
                }
            }
        }));

        let migrated = migrate(doc).unwrap();
        let props = &migrated.entities[&EntityId::new("b")]
            .component("visible")
            .unwrap()
            .props;
        // Already-renamed props are left alone, including the stale key.
        assert_eq!(props["visible"], json!(false));
        assert_eq!(props["value"], json!(true));
    }

    #[test]
    fn test_animation_index_pluralized() {
        let doc = doc_from(json!({
            "version": 4,
            "root": "a",
            "entities": {
                "a": {},
                "b": {
                    "parent": "a",
                    "components": [
                        { "name": "loop-animation", "props": { "activeClipIndex": 2 } }
                    ]
                },
                "c": {
                    "parent": "a",
                    "components": [{ "name": "loop-animation", "props": {} }]
                }
            }
        }));

        let migrated = migrate(doc).unwrap();
        let wrapped = &migrated.entities[&EntityId::new("b")]
            .component("loop-animation")
            .unwrap()
            .props;
        assert_eq!(wrapped["activeClipIndices"], json!([2]));
        assert!(!wrapped.contains_key("activeClipIndex"));

        let empty = &migrated.entities[&EntityId::new("c")]
            .component("loop-animation")
            .unwrap()
            .props;
        assert_eq!(empty["activeClipIndices"], json!([]));
    }

    #[test]
    fn test_combinable_entities_gain_combine() {
        let doc = doc_from(json!({
            "version": 4,
            "root": "a",
            "entities": {
                "a": {},
                "b": {
                    "parent": "a",
                    "components": [{ "name": "kit-piece", "props": {} }]
                }
            }
        }));

        let migrated = migrate(doc).unwrap();
        assert!(migrated.entities[&EntityId::new("b")].has_component("combine"));
    }

    #[test]
    fn test_migration_is_idempotent_at_current_version() {
        let doc = doc_from(json!({
            "version": 2,
            "root": "a",
            "entities": {
                "a": {},
                "b": {
                    "parent": "a",
                    "components": [
                        { "name": "gltf-model", "props": { "includeInFloorPlan": true } },
                        { "name": "loop-animation", "props": { "activeClipIndex": 0 } }
                    ]
                }
            }
        }));

        let once = migrate(doc).unwrap();
        let twice = migrate(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_resuming_matches_full_chain() {
        // v3 content expressed directly must equal the v2 document pushed
        // through the v2 -> v3 step first.
        let v2 = doc_from(json!({
            "version": 2,
            "root": "a",
            "entities": {
                "a": {},
                "b": {
                    "parent": "a",
                    "components": [{ "name": "ground-plane", "props": {} }]
                }
            }
        }));

        let via_chain = migrate(v2.clone()).unwrap();
        let intermediate = normalize_visibility(v2);
        assert_eq!(intermediate.version, 3);
        let via_resume = migrate(intermediate).unwrap();
        assert_eq!(via_chain, via_resume);
    }

    #[test]
    fn test_future_version_is_rejected() {
        let doc = doc_from(json!({
            "version": 6,
            "root": "a",
            "entities": { "a": {} }
        }));

        assert!(matches!(
            migrate(doc),
            Err(SceneError::UnsupportedVersion(6))
        ));
    }
}
