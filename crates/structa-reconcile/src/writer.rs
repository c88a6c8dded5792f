//! Attribute writes, layered over the store client.

use structa_store::{StoreClient, StoreError};
use structa_types::{NodeId, ResolvedValue};

use crate::error::{ReconcileError, ReconcileResult};
use crate::retry::read_with_retry;

/// Commits resolved values to node attributes.
pub struct AttributeWriter<'s, S: StoreClient + ?Sized> {
    store: &'s S,
    read_retries: u32,
}

impl<'s, S: StoreClient + ?Sized> AttributeWriter<'s, S> {
    pub fn new(store: &'s S, read_retries: u32) -> Self {
        Self {
            store,
            read_retries,
        }
    }

    /// Write `value` to attribute `name` of `node`.
    ///
    /// The node and attribute are looked up first, so a vanished node or
    /// misspelt attribute surface as [`ReconcileError::NodeNotFound`] and
    /// [`ReconcileError::AttributeNotFound`] rather than as store rejections.
    pub fn write(&self, node: NodeId, name: &str, value: &ResolvedValue) -> ReconcileResult<()> {
        if !self.store.is_connection_live() {
            return Err(ReconcileError::ConnectionLost);
        }
        read_with_retry(self.read_retries, || self.store.get_node(node))?
            .ok_or_else(|| ReconcileError::NodeNotFound(format!("node {node}")))?;
        read_with_retry(self.read_retries, || self.store.get_attribute(node, name))?.ok_or_else(
            || ReconcileError::AttributeNotFound {
                node,
                name: name.to_string(),
            },
        )?;

        self.store
            .write_attribute_value(node, name, value)
            .map_err(|err| match err {
                StoreError::ConnectionLost | StoreError::DeadlineExceeded { .. } => err.into(),
                StoreError::NodeNotFound(id) => ReconcileError::NodeNotFound(format!("node {id}")),
                StoreError::AttributeNotFound { node, name } => {
                    ReconcileError::AttributeNotFound { node, name }
                }
                source => ReconcileError::SampleCommitFailed {
                    node,
                    attribute: name.to_string(),
                    source,
                },
            })?;
        Ok(())
    }
}
