//! Error types for reconciliation.

use std::path::PathBuf;
use std::time::Duration;

use structa_document::DocumentError;
use structa_store::StoreError;
use structa_types::{LogicalId, NodeId};

/// Everything that can go wrong while reconciling a document.
///
/// Whether an error ends the run is decided by [`ReconcileError::is_run_fatal`].
/// Errors that are not run-fatal are recorded in the run report and only
/// affect the subtree or attribute they occurred in.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// No live node matches the document's root name and type.
    #[error("root {name:?} of type {type_name:?} not found")]
    RootNotFound { name: String, type_name: String },

    /// The root id exists but names a different node.
    #[error("root id {id} is {found}, document expects {expected}")]
    RootMismatch {
        id: NodeId,
        expected: String,
        found: String,
    },

    /// The document's root type is not part of the store's type system.
    #[error("type {0:?} not found")]
    TypeNotFound(String),

    /// The store refused to create a node.
    #[error("cannot create {name:?} of type {type_name:?}: {source}")]
    CreateRejected {
        name: String,
        type_name: String,
        #[source]
        source: StoreError,
    },

    /// The store refused to delete a node.
    #[error("cannot delete node {node}: {source}")]
    DeleteRejected {
        node: NodeId,
        #[source]
        source: StoreError,
    },

    /// A `$(REF)` value names a logical id no processed node has bound.
    #[error("reference to {0} cannot be resolved: no node with that id has been applied")]
    UnresolvedReference(LogicalId),

    /// A `$(FILE)` value names a file that cannot be read.
    #[error("cannot read file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The node's type has no attribute of this name.
    #[error("node {node} has no attribute {name:?}")]
    AttributeNotFound { node: NodeId, name: String },

    /// A node that should exist does not.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// The store rejected an attribute value.
    #[error("writing {attribute:?} on node {node} failed: {source}")]
    SampleCommitFailed {
        node: NodeId,
        attribute: String,
        #[source]
        source: StoreError,
    },

    /// The store cannot carry out the requested operation.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The store connection is gone.
    #[error("connection to the store lost")]
    ConnectionLost,

    /// A store call outlived its deadline.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// The document could not be loaded.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

/// Fieldless mirror of [`ReconcileError`], handy for matching and counting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RootNotFound,
    RootMismatch,
    TypeNotFound,
    CreateRejected,
    DeleteRejected,
    UnresolvedReference,
    FileReadError,
    AttributeNotFound,
    NodeNotFound,
    SampleCommitFailed,
    NotImplemented,
    ConnectionLost,
    Timeout,
    Document,
    Store,
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RootNotFound { .. } => ErrorKind::RootNotFound,
            Self::RootMismatch { .. } => ErrorKind::RootMismatch,
            Self::TypeNotFound(_) => ErrorKind::TypeNotFound,
            Self::CreateRejected { .. } => ErrorKind::CreateRejected,
            Self::DeleteRejected { .. } => ErrorKind::DeleteRejected,
            Self::UnresolvedReference(_) => ErrorKind::UnresolvedReference,
            Self::FileReadError { .. } => ErrorKind::FileReadError,
            Self::AttributeNotFound { .. } => ErrorKind::AttributeNotFound,
            Self::NodeNotFound(_) => ErrorKind::NodeNotFound,
            Self::SampleCommitFailed { .. } => ErrorKind::SampleCommitFailed,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
            Self::ConnectionLost => ErrorKind::ConnectionLost,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Document(_) => ErrorKind::Document,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    /// Run-fatal errors abort the whole document.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConnectionLost
                | ErrorKind::RootNotFound
                | ErrorKind::RootMismatch
                | ErrorKind::TypeNotFound
                | ErrorKind::Document
                | ErrorKind::NotImplemented
        )
    }
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConnectionLost => Self::ConnectionLost,
            StoreError::DeadlineExceeded { operation, elapsed } => Self::Timeout { operation, elapsed },
            StoreError::Unsupported(op) => Self::NotImplemented(op.to_string()),
            other => Self::Store(other),
        }
    }
}

/// Convenience alias for reconciliation results.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_fatal() {
        let err: ReconcileError = StoreError::ConnectionLost.into();
        assert_eq!(err.kind(), ErrorKind::ConnectionLost);
        assert!(err.is_run_fatal());
    }

    #[test]
    fn deadline_becomes_timeout() {
        let err: ReconcileError = StoreError::DeadlineExceeded {
            operation: "create_child",
            elapsed: Duration::from_millis(5),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!err.is_run_fatal());
    }

    #[test]
    fn unsupported_becomes_not_implemented() {
        let err: ReconcileError = StoreError::Unsupported("rename_node").into();
        assert!(matches!(&err, ReconcileError::NotImplemented(op) if op == "rename_node"));
        assert!(err.is_run_fatal());
    }

    #[test]
    fn attribute_failures_are_local() {
        let id = LogicalId::new(4).unwrap();
        assert!(!ReconcileError::UnresolvedReference(id).is_run_fatal());
        assert!(!ReconcileError::NodeNotFound("x".into()).is_run_fatal());
        assert!(!ReconcileError::CreateRejected {
            name: "M".into(),
            type_name: "Meter".into(),
            source: StoreError::TypeNotFound("Meter".into()),
        }
        .is_run_fatal());
    }

    #[test]
    fn unresolved_reference_message_names_id() {
        let err = ReconcileError::UnresolvedReference(LogicalId::new(7).unwrap());
        assert!(err.to_string().contains("#7"));
    }
}
