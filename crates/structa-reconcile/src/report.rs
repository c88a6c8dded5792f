//! Per-run outcome accounting.

use std::fmt;
use std::path::PathBuf;

use structa_store::LiveNode;
use structa_types::NodeId;

use crate::error::{ErrorKind, ReconcileError};

/// What happened to one desired node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeOutcome {
    /// The node exists in the store after this step.
    Applied { node: LiveNode, created: bool },
    /// Ignore and delete operations: nothing to continue with.
    Skipped,
    /// A subtree-local failure. Details are in the run report.
    Failed(ErrorKind),
}

/// A recorded, non-fatal failure.
#[derive(Debug)]
pub struct Failure {
    /// Slash-joined path of the desired node, e.g. `/Site/Bldg/Meter`.
    pub path: String,
    pub error: ReconcileError,
}

impl Failure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Accumulated result of reconciling one document.
#[derive(Debug, Default)]
pub struct RunReport {
    pub document: PathBuf,
    pub root: Option<NodeId>,
    pub created: usize,
    pub matched: usize,
    pub renamed: usize,
    pub deleted: usize,
    pub ignored: usize,
    pub attributes_written: usize,
    pub attributes_skipped: usize,
    pub failures: Vec<Failure>,
}

impl RunReport {
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
            ..Self::default()
        }
    }

    /// `true` when nothing was recorded as failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// `true` when the run mutated the store.
    pub fn has_changes(&self) -> bool {
        self.created + self.renamed + self.deleted + self.attributes_written > 0
    }

    /// Failures of one kind.
    pub fn failures_of(&self, kind: ErrorKind) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(move |f| f.kind() == kind)
    }

    pub(crate) fn record(&mut self, path: &str, error: ReconcileError) -> ErrorKind {
        let kind = error.kind();
        self.failures.push(Failure {
            path: path.to_string(),
            error,
        });
        kind
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} matched, {} renamed, {} deleted, {} ignored, \
             {} attributes written, {} skipped, {} failures",
            self.created,
            self.matched,
            self.renamed,
            self.deleted,
            self.ignored,
            self.attributes_written,
            self.attributes_skipped,
            self.failures.len()
        )
    }
}
