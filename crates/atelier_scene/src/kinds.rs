//! Built-in minimal node kinds
//!
//! The editor supplies the real node catalog; these two kinds are the
//! smallest catalog that can load and re-save any well-formed document. The
//! scene root kind claims parentless records, and the raw kind claims
//! everything else, preserving each record's component list verbatim.

use std::any::Any;

use async_trait::async_trait;

use crate::catalog::{DependencyQueue, ErrorReporter, NodeCatalog, NodeKind};
use crate::document::{Component, Entity};
use crate::error::Result;
use crate::node::NodeState;

/// State that carries a record's components through untouched.
#[derive(Debug, Clone)]
pub struct RawState {
    components: Vec<Component>,
}

impl RawState {
    pub fn new(components: Vec<Component>) -> Self {
        Self { components }
    }
}

impl NodeState for RawState {
    fn components(&self) -> Vec<Component> {
        self.components.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Claims the document root: the one record without a parent.
pub struct SceneRootKind;

#[async_trait]
impl<C: Send + Sync> NodeKind<C> for SceneRootKind {
    fn kind_name(&self) -> &str {
        "scene"
    }

    fn should_deserialize(&self, entity: &Entity) -> bool {
        entity.parent.is_none()
    }

    async fn deserialize(
        &self,
        _ctx: &C,
        entity: &Entity,
        _deps: &mut DependencyQueue,
        _errors: &mut ErrorReporter,
    ) -> Result<Box<dyn NodeState>> {
        Ok(Box::new(RawState::new(entity.components.clone())))
    }
}

/// Fallback kind claiming any record.
pub struct RawEntityKind;

#[async_trait]
impl<C: Send + Sync> NodeKind<C> for RawEntityKind {
    fn kind_name(&self) -> &str {
        "raw"
    }

    fn should_deserialize(&self, _entity: &Entity) -> bool {
        true
    }

    async fn deserialize(
        &self,
        _ctx: &C,
        entity: &Entity,
        _deps: &mut DependencyQueue,
        _errors: &mut ErrorReporter,
    ) -> Result<Box<dyn NodeState>> {
        Ok(Box::new(RawState::new(entity.components.clone())))
    }
}

/// Catalog with the built-in kinds, root kind first.
pub fn default_catalog<C: Send + Sync>() -> NodeCatalog<C> {
    let mut catalog = NodeCatalog::new();
    catalog.register(SceneRootKind);
    catalog.register(RawEntityKind);
    catalog
}
