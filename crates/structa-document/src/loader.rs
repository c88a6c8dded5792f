//! JSON document loading.
//!
//! The on-disk format is one root object with nested `children`:
//!
//! ```json
//! { "id": 0, "name": "Site", "jevisClass": "Organization",
//!   "children": [
//!     { "id": 1, "name": "Bldg", "jevisClass": "Building",
//!       "attributes": [ { "name": "logo", "lastvalue": "$(FILE)logo.png" } ] } ] }
//! ```
//!
//! Operation codes and attribute markers are decoded here, once. The
//! reconciler only ever sees [`Operation`] and [`DeclaredValue`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use structa_types::{DeclaredValue, LogicalId, Operation};
use tracing::{debug, warn};

use crate::error::{DocumentError, DocumentResult};
use crate::node::{DesiredAttribute, DesiredNode};

/// What to do when two nodes declare the same positive logical id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail loading with [`DocumentError::DuplicateLogicalId`].
    #[default]
    Reject,
    /// Accept; the node processed last owns the id.
    LastWriteWins,
}

/// Options controlling document validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub duplicates: DuplicatePolicy,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "jevisClass", alias = "jevisclass", alias = "type")]
    type_name: Option<String>,
    #[serde(default, alias = "newName")]
    rename_to: Option<String>,
    #[serde(default)]
    attributes: Option<Vec<RawAttribute>>,
    #[serde(default)]
    children: Option<Vec<RawNode>>,
}

#[derive(Deserialize)]
struct RawAttribute {
    #[serde(alias = "type")]
    name: String,
    #[serde(default, alias = "lastValue", alias = "value")]
    lastvalue: Option<Value>,
}

fn value_text(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

fn decode(raw: RawNode, parent_path: &str) -> DocumentResult<DesiredNode> {
    let mut node = DesiredNode::new(
        raw.name.unwrap_or_default(),
        raw.type_name.unwrap_or_default(),
    );
    let path = format!("{parent_path}/{}", node.segment());
    let invalid = |source| DocumentError::InvalidNode {
        node: path.clone(),
        source,
    };

    node.raw_id = raw.id;
    node.operation = Operation::decode(raw.id, raw.rename_to.as_deref()).map_err(invalid)?;

    for attribute in raw.attributes.unwrap_or_default() {
        let text = value_text(attribute.lastvalue);
        let value = DeclaredValue::parse(&text).map_err(invalid)?;
        node.attributes.push(DesiredAttribute::new(attribute.name, value));
    }
    for child in raw.children.unwrap_or_default() {
        node.children.push(decode(child, &path)?);
    }
    Ok(node)
}

fn check_duplicates(
    node: &DesiredNode,
    parent_path: &str,
    policy: DuplicatePolicy,
    seen: &mut HashMap<LogicalId, String>,
) -> DocumentResult<()> {
    let path = format!("{parent_path}/{}", node.segment());
    if let Some(id) = node.operation.logical_id() {
        if let Some(first) = seen.insert(id, path.clone()) {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(DocumentError::DuplicateLogicalId {
                        id,
                        first,
                        second: path,
                    })
                }
                DuplicatePolicy::LastWriteWins => {
                    warn!(%id, %first, second = %path, "duplicate logical id; later node wins");
                }
            }
        }
    }
    if !node.operation.visits_children() {
        return Ok(());
    }
    for child in &node.children {
        check_duplicates(child, &path, policy, seen)?;
    }
    Ok(())
}

/// A loaded desired-state document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// Root descriptor. Its `raw_id`, when positive, is a store id.
    pub root: DesiredNode,
    /// Where the document was read from.
    pub path: PathBuf,
    /// Directory that `$(FILE)` markers resolve against.
    pub base_dir: PathBuf,
}

impl Document {
    /// Read and validate a document file.
    pub fn load(path: &Path, options: LoadOptions) -> DocumentResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path, options)
    }

    /// Parse document text as if it had been read from `path`.
    pub fn parse(text: &str, path: &Path, options: LoadOptions) -> DocumentResult<Self> {
        let raw: RawNode = serde_json::from_str(text).map_err(|source| DocumentError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let root = decode(raw, "")?;

        // The root's own id addresses the store, so only its subtree binds logical ids.
        let mut seen = HashMap::new();
        let root_path = format!("/{}", root.segment());
        for child in &root.children {
            check_duplicates(child, &root_path, options.duplicates, &mut seen)?;
        }

        debug!(
            path = %path.display(),
            nodes = root.len(),
            logical_ids = seen.len(),
            "document loaded"
        );
        Ok(Self {
            root,
            path: path.to_path_buf(),
            base_dir: base_dir_of(path),
        })
    }

    /// Build a document from an already constructed tree.
    pub fn from_root(root: DesiredNode, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let base_dir = base_dir_of(&path);
        Self {
            root,
            path,
            base_dir,
        }
    }
}

fn base_dir_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
