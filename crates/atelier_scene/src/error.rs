//! Error types for scene loading and serialization
//!
//! Two severities exist. Structural faults and unresolved kinds are fatal:
//! they abort a build and surface as `Err`. Per-node construction failures
//! are non-fatal: they are collected into the build output so a best-effort
//! tree is still returned.

use std::fmt;

use thiserror::Error;

use crate::id::EntityId;

/// Tree-shape inconsistencies that make a document unloadable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralFault {
    /// An entity references a parent id that is not in the entity map
    #[error("entity {entity} references parent {parent}, which is not in the entity map")]
    MissingParent { entity: EntityId, parent: EntityId },

    /// Following parent links from this entity never reaches a root
    #[error("cyclic parent chain detected at entity {0}")]
    ParentCycle(EntityId),

    /// An entity has no parent but is not the declared document root
    #[error("entity {entity} has no parent and is not the document root")]
    OrphanEntity { entity: EntityId },

    /// The declared root id never resolved to a node
    #[error("document root {0} was never resolved to a node")]
    RootNotFound(EntityId),
}

/// Fatal errors from the load/save pipeline.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Structural(#[from] StructuralFault),

    /// No catalog entry claimed an entity record
    #[error("no registered node kind claims entity {name:?} ({id})")]
    UnresolvedKind { id: EntityId, name: String },

    /// The document is tagged with a version this build does not know
    #[error("unsupported scene document version {0}")]
    UnsupportedVersion(u32),

    /// The document violates the expected file shape
    #[error("malformed scene document: {0}")]
    Malformed(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;

/// Non-fatal failure attached to a single node during a build.
///
/// These accumulate in [`crate::builder::SceneBuild::errors`] and never abort
/// the remaining build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeError {
    /// The entity whose construction failed
    pub entity: EntityId,
    /// Human-readable failure description
    pub message: String,
}

impl NodeError {
    pub fn new(entity: EntityId, message: impl Into<String>) -> Self {
        Self {
            entity,
            message: message.into(),
        }
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}: {}", self.entity, self.message)
    }
}

impl std::error::Error for NodeError {}
