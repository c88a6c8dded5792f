use std::time::Duration;

use structa_types::NodeId;

use crate::object::AttributeKind;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No node with this id exists.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// The type system has no type with this name.
    #[error("type not found: {0:?}")]
    TypeNotFound(String),

    /// The node's type declares no attribute with this name.
    #[error("node {node} has no attribute {name:?}")]
    AttributeNotFound { node: NodeId, name: String },

    /// The child type may not be created under the parent's type.
    #[error("type {type_name:?} is not allowed under {parent_type:?}")]
    NotAllowedUnder {
        type_name: String,
        parent_type: String,
    },

    /// A unique type already has an instance under this parent.
    #[error("unique type {type_name:?} already present under node {parent}")]
    UniqueViolation { type_name: String, parent: NodeId },

    /// Non-recursive delete of a node that still has children.
    #[error("node {id} still has {children} children")]
    HasChildren { id: NodeId, children: usize },

    /// The value does not fit the attribute (text vs file).
    #[error("attribute {attribute:?} expects a {expected} value")]
    ValueKindMismatch {
        attribute: String,
        expected: AttributeKind,
    },

    /// The connection to the store is gone.
    #[error("connection to the store is not alive")]
    ConnectionLost,

    /// The call finished after its deadline. Safe to retry for reads.
    #[error("{operation} exceeded its deadline after {elapsed:?}")]
    DeadlineExceeded {
        operation: &'static str,
        elapsed: Duration,
    },

    /// The backend does not implement this operation.
    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),

    /// A snapshot contradicts itself (dangling parent, unknown type, ...).
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Transient errors may succeed when the same call is issued again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
