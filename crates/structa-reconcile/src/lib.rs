//! Desired-state reconciliation for hierarchical object stores.
//!
//! A [`Document`](structa_document::Document) describes a tree of nodes as it
//! should be. The [`Reconciler`] walks it depth-first against a
//! [`StoreClient`], matching each desired node to a live child of its parent by
//! name and type, then creating, renaming, deleting, or updating as the node's
//! operation asks.
//!
//! # Pipeline
//!
//! - [`resolve_root`] -- anchors the document to an existing live node
//! - [`ValueResolver`] -- turns declared attribute values into writable ones,
//!   reading `$(FILE)` contents and substituting `$(REF)` logical ids
//! - [`ReferenceTable`] -- logical id to node id bindings, built as the walk
//!   proceeds
//! - [`AttributeWriter`] -- commits values to node attributes
//! - [`RunReport`] -- counters and recorded failures for one run
//!
//! # Rules
//!
//! 1. Running the same document twice creates nothing the second time.
//! 2. Nodes the document does not mention are never touched.
//! 3. A reference resolves only to a node processed earlier in the same run.
//! 4. A failure inside a subtree skips that subtree, not its siblings.
//! 5. Losing the connection ends the run; completed changes stay.

pub mod config;
pub mod error;
pub mod reconciler;
pub mod refs;
pub mod report;
pub mod resolve;
mod retry;
pub mod root;
pub mod writer;

use std::path::Path;

use structa_document::Document;
use structa_store::StoreClient;

pub use config::ReconcileConfig;
pub use error::{ErrorKind, ReconcileError, ReconcileResult};
pub use reconciler::Reconciler;
pub use refs::ReferenceTable;
pub use report::{Failure, NodeOutcome, RunReport};
pub use resolve::ValueResolver;
pub use root::resolve_root;
pub use writer::AttributeWriter;

/// Load the document at `path` and reconcile it against `store`.
pub fn reconcile_path<S: StoreClient + ?Sized>(
    store: &S,
    path: &Path,
    config: &ReconcileConfig,
) -> ReconcileResult<RunReport> {
    let document = Document::load(path, config.load_options())?;
    Reconciler::new(store, config.clone()).reconcile(&document)
}
