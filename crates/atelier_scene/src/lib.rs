//! Scene serialization and schema migration
//!
//! Persistence layer for an entity/component scene editor. A scene file is a
//! flat, id-keyed entity map with a format version tag; loading raises the
//! document to the current version through a chain of pure migrations,
//! sequences entities parent-before-child, and asks an ordered catalog of
//! node kinds to materialize each record into a live tree. Saving flattens
//! the tree back, always at the current version.
//!
//! Typical load path:
//!
//! ```no_run
//! # async fn load(raw: serde_json::Value) -> atelier_scene::Result<()> {
//! let catalog = atelier_scene::default_catalog::<()>();
//! let build = atelier_scene::load_scene(&(), raw, &catalog).await?;
//! for err in &build.errors {
//!     log::warn!("{err}");
//! }
//! let saved = atelier_scene::save_scene(&build.tree)?;
//! # let _ = saved;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod catalog;
pub mod document;
pub mod error;
pub mod id;
pub mod interchange;
pub mod kinds;
pub mod migrate;
pub mod node;
pub mod sequence;
pub mod serializer;

pub use builder::{build_scene, SceneBuild};
pub use catalog::{DependencyQueue, ErrorReporter, NodeCatalog, NodeKind};
pub use document::{Component, Entity, EntityMap, SceneDocument, SCENE_VERSION};
pub use error::{NodeError, Result, SceneError, StructuralFault};
pub use id::EntityId;
pub use interchange::{export_scene_objects, import_scene_objects};
pub use kinds::{default_catalog, RawEntityKind, RawState, SceneRootKind};
pub use migrate::migrate;
pub use node::{NodeState, SceneNode, SceneTree};
pub use sequence::sequence;
pub use serializer::serialize_scene;

use serde_json::Value;

/// Parse a raw scene file and raise it to the current format version.
pub fn load_document(raw: Value) -> Result<SceneDocument> {
    let doc: SceneDocument = serde_json::from_value(raw)?;
    migrate::migrate(doc)
}

/// Parse, migrate, and build a scene in one call.
pub async fn load_scene<C: Send + Sync>(
    ctx: &C,
    raw: Value,
    catalog: &NodeCatalog<C>,
) -> Result<SceneBuild> {
    let doc = load_document(raw)?;
    build_scene(ctx, &doc, catalog).await
}

/// Flatten a live tree to a current-version scene file.
pub fn save_scene(tree: &SceneTree) -> Result<Value> {
    Ok(serde_json::to_value(serialize_scene(tree))?)
}

/// Parse a foreign interchange file into a current-version scene document.
pub fn load_interchange_document(raw: &Value) -> Result<SceneDocument> {
    import_scene_objects(raw)
}
