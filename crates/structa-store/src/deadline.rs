//! Per-call deadlines over any [`StoreClient`].

use std::time::{Duration, Instant};

use structa_types::{NodeId, ResolvedValue};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::object::{Attribute, LiveNode, NodeType};
use crate::traits::StoreClient;

/// Wraps a store and reports any call that outlives `deadline` as
/// [`StoreError::DeadlineExceeded`].
///
/// Store calls are blocking round trips, so the wrapper cannot interrupt
/// them. It measures each call instead. A late read is reported as transient
/// and the caller may retry it. A late mutation has already taken effect by
/// the time it is reported, so callers must not retry it.
#[derive(Debug)]
pub struct DeadlineStore<S> {
    inner: S,
    deadline: Duration,
}

impl<S: StoreClient> DeadlineStore<S> {
    pub fn new(inner: S, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn timed<T>(&self, operation: &'static str, call: impl FnOnce(&S) -> StoreResult<T>) -> StoreResult<T> {
        let started = Instant::now();
        let result = call(&self.inner);
        let elapsed = started.elapsed();
        if elapsed > self.deadline {
            warn!(operation, ?elapsed, deadline = ?self.deadline, "store call exceeded deadline");
            return Err(StoreError::DeadlineExceeded { operation, elapsed });
        }
        result
    }
}

impl<S: StoreClient> StoreClient for DeadlineStore<S> {
    fn get_type(&self, name: &str) -> StoreResult<Option<NodeType>> {
        self.timed("get_type", |s| s.get_type(name))
    }

    fn get_node(&self, id: NodeId) -> StoreResult<Option<LiveNode>> {
        self.timed("get_node", |s| s.get_node(id))
    }

    fn list_nodes(&self, type_name: &str) -> StoreResult<Vec<LiveNode>> {
        self.timed("list_nodes", |s| s.list_nodes(type_name))
    }

    fn create_child(&self, parent: NodeId, type_name: &str, name: &str) -> StoreResult<LiveNode> {
        self.timed("create_child", |s| s.create_child(parent, type_name, name))
    }

    fn delete_node(&self, id: NodeId) -> StoreResult<()> {
        self.timed("delete_node", |s| s.delete_node(id))
    }

    fn rename_node(&self, id: NodeId, new_name: &str) -> StoreResult<LiveNode> {
        self.timed("rename_node", |s| s.rename_node(id, new_name))
    }

    fn get_node_children(&self, id: NodeId) -> StoreResult<Vec<LiveNode>> {
        self.timed("get_node_children", |s| s.get_node_children(id))
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> StoreResult<Option<Attribute>> {
        self.timed("get_attribute", |s| s.get_attribute(node, name))
    }

    fn write_attribute_value(
        &self,
        node: NodeId,
        name: &str,
        value: &ResolvedValue,
    ) -> StoreResult<()> {
        self.timed("write_attribute_value", |s| {
            s.write_attribute_value(node, name, value)
        })
    }

    fn is_connection_live(&self) -> bool {
        self.inner.is_connection_live()
    }
}
