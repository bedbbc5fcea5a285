//! Foreign interchange format import/export
//!
//! The external format is a flat object list tagged by content type, not a
//! version/root/entities triple: the first object is the scene header
//! (root id, scene name, skybox id, scene-level components) and every
//! following object is a placed model or an `application/light` entry.
//!
//! The importer translates that list into an id-keyed scene document with
//! the standard default components and hands it to the migrator unchanged,
//! so no migration logic is ever duplicated here. The records it emits are
//! already id-keyed and normalized, hence the document is tagged with the
//! current version rather than the legacy name-keyed one.

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::document::{Component, Entity, SceneDocument, SCENE_VERSION};
use crate::error::{Result, SceneError};
use crate::id::EntityId;
use crate::node::SceneTree;

#[derive(Debug, Deserialize)]
struct InterchangeFile {
    #[serde(default)]
    objects: Vec<InterchangeObject>,
}

#[derive(Debug, Deserialize)]
struct InterchangeObject {
    #[serde(rename = "type", default)]
    content_type: Option<String>,
    #[serde(default)]
    position: Option<[f64; 3]>,
    #[serde(default)]
    start_url: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    content: InterchangeContent,
}

#[derive(Debug, Default, Deserialize)]
struct InterchangeContent {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    root: Option<EntityId>,
    #[serde(default, rename = "skyboxId")]
    skybox_id: Option<String>,
    #[serde(default)]
    components: Vec<Component>,
    #[serde(default)]
    position: Option<[f64; 3]>,
}

fn transform_component(position: [f64; 3]) -> Component {
    Component::new(
        "transform",
        json!({
            "position": { "x": position[0], "y": position[1], "z": position[2] },
            "rotation": { "x": 0, "y": 0, "z": 0 },
            "scale": { "x": 1, "y": 1, "z": 1 }
        }),
    )
}

fn visible_component() -> Component {
    Component::new("visible", json!({ "visible": true }))
}

fn editor_settings_component() -> Component {
    Component::new("editor-settings", json!({ "enabled": true }))
}

/// Translate an interchange file into an id-keyed scene document and raise
/// it through the migration chain.
pub fn import_scene_objects(value: &Value) -> Result<SceneDocument> {
    let file: InterchangeFile = serde_json::from_value(value.clone())?;
    let Some(header) = file.objects.first() else {
        return Err(SceneError::Malformed(
            "interchange document has no objects".to_owned(),
        ));
    };

    let root = header
        .content
        .root
        .clone()
        .ok_or_else(|| SceneError::Malformed("interchange header has no root id".to_owned()))?;
    let scene_name = header.content.name.clone().unwrap_or_default();

    let mut entities: IndexMap<EntityId, Entity> = IndexMap::with_capacity(file.objects.len() + 1);
    entities.insert(
        root.clone(),
        Entity {
            name: scene_name.clone(),
            components: header.content.components.clone(),
            ..Default::default()
        },
    );

    if let Some(skybox_id) = header.content.skybox_id.as_deref().filter(|id| !id.is_empty()) {
        entities.insert(
            EntityId::new(skybox_id),
            Entity {
                name: "Skybox".to_owned(),
                parent: Some(root.clone()),
                index: Some(0),
                components: vec![
                    transform_component([0.0, 0.0, 0.0]),
                    visible_component(),
                    editor_settings_component(),
                    Component::new(
                        "skybox",
                        json!({
                            "turbidity": 6.09,
                            "rayleigh": 0.82,
                            "luminance": 1.055,
                            "mieCoefficient": 0.043,
                            "mieDirectionalG": 0.8,
                            "inclination": 0.10471975511965978,
                            "azimuth": 0.2333333333333333,
                            "distance": 8000
                        }),
                    ),
                ],
                ..Default::default()
            },
        );
    }

    for (position_in_file, object) in file.objects.iter().enumerate() {
        let Some(uuid) = object.content.uuid.as_deref() else {
            continue;
        };
        let name = object.content.name.clone().unwrap_or_default();

        let entity = if object.content_type.as_deref() == Some("application/light") {
            let at = object.content.position.unwrap_or_default();
            Entity {
                name: name.clone(),
                parent: Some(root.clone()),
                index: Some(position_in_file),
                components: vec![
                    transform_component(at),
                    visible_component(),
                    editor_settings_component(),
                    Component::new(
                        &to_kebab_case(&name),
                        json!({
                            "color": object.color.as_deref().unwrap_or("#ffffff"),
                            "intensity": 1,
                            "range": 0,
                            "castShadow": true,
                            "shadowMapResolution": [512, 512],
                            "shadowBias": 0,
                            "shadowRadius": 1
                        }),
                    ),
                ],
                ..Default::default()
            }
        } else {
            let at = object.position.unwrap_or_default();
            Entity {
                name,
                parent: Some(root.clone()),
                index: Some(position_in_file),
                components: vec![
                    transform_component(at),
                    visible_component(),
                    editor_settings_component(),
                    Component::new(
                        "gltf-model",
                        json!({
                            "src": object.start_url.as_deref(),
                            "attribution": null
                        }),
                    ),
                    Component::new("shadow", json!({ "cast": false, "receive": true })),
                    Component::empty("collidable"),
                    Component::empty("walkable"),
                    Component::empty("combine"),
                ],
                ..Default::default()
            }
        };

        entities.insert(EntityId::new(uuid), entity);
    }

    debug!(
        "imported interchange scene {:?} with {} entities",
        scene_name,
        entities.len()
    );

    let doc = SceneDocument {
        version: SCENE_VERSION,
        root,
        metadata: match json!({ "name": scene_name }) {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
        entities,
    };

    // Importer output always funnels through the migration chain; at the
    // current version this is a no-op, for future versions it is not.
    crate::migrate::migrate(doc)
}

/// Export a live tree back to the interchange object list.
///
/// The inverse of [`import_scene_objects`] for the object families the
/// format knows: the scene header from the root node, a model object per
/// root child carrying a `gltf-model` component, and a light object per root
/// child carrying a light-type component.
pub fn export_scene_objects(tree: &SceneTree) -> Value {
    let root = tree.root();
    let mut header = json!({
        "position": [0, 0, 0],
        "content": {
            "root": root.id,
            "name": root.name,
            "skyboxId": "",
            "components": root.state.components(),
        }
    });

    let mut objects = Vec::with_capacity(root.children.len() + 1);
    for child_id in &root.children {
        let Some(node) = tree.get(child_id) else {
            continue;
        };
        let components = node.state.components();
        let position = components
            .iter()
            .find(|c| c.name == "transform")
            .and_then(|c| c.props.get("position").cloned())
            .map(|p| {
                json!([
                    p.get("x").cloned().unwrap_or(json!(0)),
                    p.get("y").cloned().unwrap_or(json!(0)),
                    p.get("z").cloned().unwrap_or(json!(0)),
                ])
            })
            .unwrap_or_else(|| json!([0, 0, 0]));

        if node.name == "Skybox" {
            header["content"]["skyboxId"] = json!(node.id);
        } else if let Some(model) = components.iter().find(|c| c.name == "gltf-model") {
            objects.push(json!({
                "position": position,
                "start_url": model.props.get("src").cloned().unwrap_or(Value::Null),
                "dynamic": true,
                "content": { "name": node.name, "uuid": node.id }
            }));
        } else if let Some(light) = components.iter().find(|c| c.name.ends_with("light")) {
            let light_type = node
                .name
                .split(' ')
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            objects.push(json!({
                "type": "application/light",
                "content": {
                    "name": node.name,
                    "lightType": light_type,
                    "args": [[255, 255, 255], 5],
                    "position": position,
                    "color": light.props.get("color").cloned().unwrap_or(Value::Null),
                    "uuid": node.id
                }
            }));
        }
    }

    objects.insert(0, header);
    json!({ "objects": objects })
}

/// Kebab-case a display name for use as a component discriminant, splitting
/// on whitespace and camel-case boundaries ("DirectionalLight" and
/// "Directional Light" both map to "directional-light").
fn to_kebab_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let boundary = ch.is_uppercase()
            && !current.is_empty()
            && (!chars[i - 1].is_uppercase()
                || chars.get(i + 1).is_some_and(|next| next.is_lowercase()));
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_scene;
    use crate::kinds::default_catalog;

    fn sample_interchange() -> Value {
        json!({
            "objects": [
                {
                    "position": [0, 0, 0],
                    "content": {
                        "root": "root-id",
                        "name": "Gallery",
                        "skyboxId": "sky-id",
                        "components": [
                            { "name": "background", "props": { "color": "#aaaaaa" } }
                        ]
                    }
                },
                {
                    "type": "application/light",
                    "color": "#ffddaa",
                    "content": {
                        "uuid": "light-id",
                        "name": "DirectionalLight",
                        "position": [1.0, 2.0, 3.0]
                    }
                },
                {
                    "position": [4.0, 5.0, 6.0],
                    "start_url": "https://assets.example/chair.glb",
                    "content": { "uuid": "model-id", "name": "Chair" }
                }
            ]
        })
    }

    #[test]
    fn test_import_builds_flat_entity_map() {
        let doc = import_scene_objects(&sample_interchange()).unwrap();

        assert_eq!(doc.version, SCENE_VERSION);
        assert_eq!(doc.root, EntityId::new("root-id"));
        assert_eq!(doc.metadata["name"], json!("Gallery"));
        assert_eq!(doc.entities.len(), 4);

        let root = &doc.entities[&doc.root];
        assert!(root.parent.is_none());
        assert!(root.has_component("background"));

        let skybox = &doc.entities[&EntityId::new("sky-id")];
        assert_eq!(skybox.index, Some(0));
        assert_eq!(skybox.parent, Some(doc.root.clone()));
        assert!(skybox.has_component("skybox"));

        let light = &doc.entities[&EntityId::new("light-id")];
        assert_eq!(light.index, Some(1));
        let light_component = light.component("directional-light").unwrap();
        assert_eq!(light_component.props["color"], json!("#ffddaa"));
        assert_eq!(
            light.component("transform").unwrap().props["position"],
            json!({ "x": 1.0, "y": 2.0, "z": 3.0 })
        );

        let model = &doc.entities[&EntityId::new("model-id")];
        assert_eq!(model.index, Some(2));
        assert_eq!(
            model.component("gltf-model").unwrap().props["src"],
            json!("https://assets.example/chair.glb")
        );
        for derived in ["shadow", "collidable", "walkable", "combine", "visible"] {
            assert!(model.has_component(derived), "missing {derived}");
        }
    }

    #[test]
    fn test_import_rejects_empty_object_list() {
        let err = import_scene_objects(&json!({ "objects": [] })).unwrap_err();
        assert!(matches!(err, SceneError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_imported_document_builds_and_exports() {
        let doc = import_scene_objects(&sample_interchange()).unwrap();
        let build = build_scene(&(), &doc, &default_catalog()).await.unwrap();
        assert!(build.errors.is_empty());

        let exported = export_scene_objects(&build.tree);
        let objects = exported["objects"].as_array().unwrap();
        assert_eq!(objects[0]["content"]["root"], json!("root-id"));
        assert_eq!(objects[0]["content"]["skyboxId"], json!("sky-id"));

        let light = objects
            .iter()
            .find(|o| o["type"] == json!("application/light"))
            .unwrap();
        assert_eq!(light["content"]["uuid"], json!("light-id"));
        assert_eq!(light["content"]["lightType"], json!("directionallight"));

        let model = objects
            .iter()
            .find(|o| o["content"]["uuid"] == json!("model-id"))
            .unwrap();
        assert_eq!(model["start_url"], json!("https://assets.example/chair.glb"));
        assert_eq!(model["position"], json!([4.0, 5.0, 6.0]));
    }

    #[test]
    fn test_kebab_case_boundaries() {
        assert_eq!(to_kebab_case("DirectionalLight"), "directional-light");
        assert_eq!(to_kebab_case("Directional Light"), "directional-light");
        assert_eq!(to_kebab_case("GLTFModel"), "gltf-model");
        assert_eq!(to_kebab_case("spot"), "spot");
        assert_eq!(to_kebab_case(""), "");
    }
}
