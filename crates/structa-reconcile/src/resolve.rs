//! Turns declared attribute values into values the store can commit.

use std::fs;
use std::path::{Path, PathBuf};

use structa_types::{DeclaredValue, FilePayload, ResolvedValue};

use crate::error::{ReconcileError, ReconcileResult};
use crate::refs::ReferenceTable;

/// Resolves `$(REF)` and `$(FILE)` values for one document.
///
/// File names resolve against the directory holding the document, never the
/// process working directory.
#[derive(Clone, Debug)]
pub struct ValueResolver {
    base_dir: PathBuf,
}

impl ValueResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve one declared value. `Ok(None)` means there is nothing to write.
    pub fn resolve(
        &self,
        value: &DeclaredValue,
        refs: &ReferenceTable,
    ) -> ReconcileResult<Option<ResolvedValue>> {
        match value {
            DeclaredValue::Empty => Ok(None),
            DeclaredValue::Literal(s) => Ok(Some(ResolvedValue::Literal(s.clone()))),
            DeclaredValue::Reference(id) => {
                let node = refs.get(*id).ok_or(ReconcileError::UnresolvedReference(*id))?;
                Ok(Some(ResolvedValue::Literal(node.to_string())))
            }
            DeclaredValue::File(rel) => self.read_file(rel).map(Some),
        }
    }

    fn read_file(&self, rel: &Path) -> ReconcileResult<ResolvedValue> {
        let path = self.base_dir.join(rel);
        let bytes = fs::read(&path).map_err(|source| ReconcileError::FileReadError {
            path: path.clone(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel.display().to_string());
        Ok(ResolvedValue::File(FilePayload::new(name, bytes)))
    }
}
