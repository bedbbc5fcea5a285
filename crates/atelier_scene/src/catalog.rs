//! Node kind catalog and the capability contract
//!
//! The set of concrete node kinds lives outside this crate; the builder only
//! sees each kind through two entry points: a predicate deciding whether the
//! kind claims an entity record, and an async constructor producing the
//! node's live state. Kinds are held in an ordered catalog and resolution is
//! a linear first-match scan, so the catalog's own ordering is the tie-break
//! when several kinds could claim a record.
//!
//! Construction threads two explicit output channels instead of ambient
//! callbacks: a [`DependencyQueue`] of background tasks the builder joins in
//! one batch after attachment, and an [`ErrorReporter`] collecting non-fatal
//! per-node failures.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use log::warn;

use crate::document::Entity;
use crate::error::{NodeError, Result};
use crate::id::EntityId;
use crate::node::NodeState;

/// Capability contract one node kind exposes to the builder.
///
/// `C` is the caller's rendering/runtime context, passed through to
/// `deserialize` untouched; the builder never inspects it.
#[async_trait]
pub trait NodeKind<C: Send + Sync>: Send + Sync {
    /// Discriminant stored on built nodes and used for re-serialization.
    fn kind_name(&self) -> &str;

    /// Whether this kind claims the given entity record.
    fn should_deserialize(&self, entity: &Entity) -> bool;

    /// Materialize the node state for a claimed record.
    ///
    /// Long-running work (fetching referenced data, decoding payloads) goes
    /// through `deps` so unrelated records keep loading; recoverable
    /// failures go through `errors` so the rest of the build proceeds.
    /// Returning `Err` aborts the whole build.
    async fn deserialize(
        &self,
        ctx: &C,
        entity: &Entity,
        deps: &mut DependencyQueue,
        errors: &mut ErrorReporter,
    ) -> Result<Box<dyn NodeState>>;
}

/// Ordered list of node kind descriptors.
pub struct NodeCatalog<C> {
    kinds: Vec<Arc<dyn NodeKind<C>>>,
}

impl<C: Send + Sync> NodeCatalog<C> {
    pub fn new() -> Self {
        Self { kinds: Vec::new() }
    }

    /// Append a kind. Registration order is resolution priority.
    pub fn register(&mut self, kind: impl NodeKind<C> + 'static) {
        self.kinds.push(Arc::new(kind));
    }

    /// First registered kind claiming the record, if any.
    pub fn resolve(&self, entity: &Entity) -> Option<&dyn NodeKind<C>> {
        self.kinds
            .iter()
            .find(|kind| kind.should_deserialize(entity))
            .map(|kind| kind.as_ref())
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl<C: Send + Sync> Default for NodeCatalog<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Background tasks registered during node construction.
///
/// Tasks are not awaited inline; the builder joins the whole queue once the
/// attachment phase is done, so unrelated I/O overlaps. A task failure
/// becomes a [`NodeError`] attributed to the entity that enqueued it.
pub struct DependencyQueue {
    tasks: Vec<(EntityId, BoxFuture<'static, std::result::Result<(), String>>)>,
    pub(crate) current: EntityId,
}

impl DependencyQueue {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            current: EntityId::default(),
        }
    }

    /// Enqueue a background task for the entity currently being built.
    pub fn enqueue(
        &mut self,
        task: impl Future<Output = std::result::Result<(), String>> + Send + 'static,
    ) {
        self.tasks.push((self.current.clone(), task.boxed()));
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Await every queued task as a single batch, collecting failures.
    pub(crate) async fn join(self) -> Vec<NodeError> {
        let settled = join_all(
            self.tasks
                .into_iter()
                .map(|(entity, task)| async move { (entity, task.await) }),
        )
        .await;

        settled
            .into_iter()
            .filter_map(|(entity, result)| {
                result.err().map(|message| {
                    warn!("dependency for node {} failed: {}", entity, message);
                    NodeError::new(entity, message)
                })
            })
            .collect()
    }
}

impl Default for DependencyQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Collector for non-fatal per-node construction errors.
pub struct ErrorReporter {
    errors: Vec<NodeError>,
    pub(crate) current: EntityId,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            current: EntityId::default(),
        }
    }

    /// Attach a non-fatal error to the entity currently being built.
    pub fn report(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("node {} reported: {}", self.current, message);
        self.errors.push(NodeError::new(self.current.clone(), message));
    }

    /// Errors collected so far.
    pub fn errors(&self) -> &[NodeError] {
        &self.errors
    }

    pub(crate) fn into_errors(self) -> Vec<NodeError> {
        self.errors
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
