//! Attribute values before and after resolution.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::LogicalId;

/// Prefix selecting reference resolution: `$(REF)<logical id>`.
pub const REFERENCE_MARKER: &str = "$(REF)";
/// Prefix selecting a file payload: `$(FILE)<relative file name>`.
pub const FILE_MARKER: &str = "$(FILE)";

/// An attribute value as declared in a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclaredValue {
    /// No value; the attribute is not written.
    Empty,
    /// Written verbatim.
    Literal(String),
    /// Replaced by the store id bound to this logical id earlier in the run.
    Reference(LogicalId),
    /// Replaced by the contents of a file next to the document. Always a
    /// relative path.
    File(PathBuf),
}

impl DeclaredValue {
    /// Parse a raw document string, recognising the reserved markers.
    ///
    /// File markers must name a path relative to the document directory.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if raw.is_empty() {
            return Ok(Self::Empty);
        }
        if let Some(rest) = raw.strip_prefix(REFERENCE_MARKER) {
            return rest.parse().map(Self::Reference);
        }
        if let Some(rest) = raw.strip_prefix(FILE_MARKER) {
            if rest.trim().is_empty() {
                return Err(TypeError::EmptyFileReference);
            }
            if Path::new(rest).has_root() {
                return Err(TypeError::AbsoluteFileReference(rest.to_string()));
            }
            return Ok(Self::File(PathBuf::from(rest)));
        }
        Ok(Self::Literal(raw.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for DeclaredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Literal(s) => write!(f, "{s}"),
            Self::Reference(id) => write!(f, "{REFERENCE_MARKER}{}", id.get()),
            Self::File(path) => write!(f, "{FILE_MARKER}{}", path.display()),
        }
    }
}

/// File contents attached to an attribute.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    /// File name without directories.
    pub name: String,
    #[serde(with = "hex::serde")]
    pub bytes: Vec<u8>,
}

impl FilePayload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for FilePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePayload")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A concrete value ready to be committed to an attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResolvedValue {
    Literal(String),
    File(FilePayload),
}

impl ResolvedValue {
    /// Short human-readable form for trace lines.
    pub fn summary(&self) -> String {
        match self {
            Self::Literal(s) => format!("{s:?}"),
            Self::File(p) => format!("file {} ({} bytes)", p.name, p.len()),
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(s) => Some(s),
            Self::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FilePayload> {
        match self {
            Self::File(p) => Some(p),
            Self::Literal(_) => None,
        }
    }
}
