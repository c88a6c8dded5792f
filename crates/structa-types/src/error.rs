use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid id {0}: ids must be positive")]
    NonPositiveId(i64),

    #[error("invalid reference {raw:?}: {reason}")]
    InvalidReference { raw: String, reason: String },

    #[error("file marker without a file name")]
    EmptyFileReference,

    #[error("file marker {0:?} is absolute; file names are relative to the document")]
    AbsoluteFileReference(String),

    #[error("rename requested without a new name")]
    MissingRenameTarget,
}
