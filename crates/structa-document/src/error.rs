//! Error types for document loading.

use std::path::PathBuf;

use structa_types::{LogicalId, TypeError};

/// Errors that can occur while loading a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The document file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or has the wrong shape.
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A node carries an invalid operation or attribute value.
    #[error("invalid node at {node}: {source}")]
    InvalidNode {
        node: String,
        #[source]
        source: TypeError,
    },

    /// Two nodes declare the same logical id.
    #[error("logical id {id} declared at {first} and again at {second}")]
    DuplicateLogicalId {
        id: LogicalId,
        first: String,
        second: String,
    },
}

/// Convenience alias for document results.
pub type DocumentResult<T> = Result<T, DocumentError>;
