//! Persisted scene document model
//!
//! A scene file is a flat, id-keyed entity map plus a version tag, a root id,
//! and opaque metadata. Entities reference their parent by id and carry an
//! ordered component list; tree shape is reconstructed at load time by the
//! sequencer and builder.
//!
//! Parsing is deliberately permissive: fields the current version does not
//! know are preserved in `Entity::extra` and written back untouched, and a
//! missing `version` tag means the legacy (name-keyed) shape understood by
//! the first migration step.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::EntityId;

/// Current scene file format version.
///
/// The migrator raises every loaded document to this version and the
/// serializer always tags its output with it. There is no downgrade path.
pub const SCENE_VERSION: u32 = 5;

/// Flat mapping from entity id to entity record.
///
/// Insertion order is preserved end to end; the sequencer uses it as the
/// stable tie-break between entities of equal depth.
pub type EntityMap = IndexMap<EntityId, Entity>;

/// Named bundle of configuration attached to an entity.
///
/// `name` is the stable vocabulary migrations rewrite ("gltf-model",
/// "visible", "loop-animation", ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub props: Map<String, Value>,
}

impl Component {
    /// Component with the given props object. Non-object values are treated
    /// as an empty props map.
    pub fn new(name: impl Into<String>, props: Value) -> Self {
        let props = match props {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            props,
        }
    }

    /// Component with no props.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Map::new(),
        }
    }
}

/// Flat persisted description of one node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Display name. Legacy documents store it as the map key instead;
    /// the v1 -> v2 migration moves it here.
    #[serde(default)]
    pub name: String,

    /// Containing entity, absent only for the document root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityId>,

    /// Sibling position under the parent. Records without an index append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    /// Ordered component list; the entity's full configuration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,

    /// Version-specific fields this build does not interpret. Preserved
    /// verbatim across a load/save round trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    /// First component with the given name.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Mutable access to the first component with the given name.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.name == name)
    }

    /// Whether any component with the given name is present.
    pub fn has_component(&self, name: &str) -> bool {
        self.component(name).is_some()
    }
}

/// The whole persisted scene file.
///
/// Invariant: exactly one entity has no `parent` and its id equals `root`;
/// every other `parent` must resolve within `entities`. Violations are
/// structural faults, never silently dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Format version. Absent in legacy files, which the first migration
    /// step interprets as version 1.
    #[serde(default = "legacy_version")]
    pub version: u32,

    /// Id of the root entity.
    pub root: EntityId,

    /// Opaque editor metadata, attached to the root node at build time.
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// The flat entity map.
    #[serde(default)]
    pub entities: EntityMap,
}

fn legacy_version() -> u32 {
    1
}
