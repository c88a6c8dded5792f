//! Desired-state documents for structa.
//!
//! A document describes one root node and a nested tree of children, each
//! with an operation code, a name, a type and attribute assignments. Loading
//! decodes the integer operation codes into [`structa_types::Operation`] and
//! the marker-prefixed attribute strings into
//! [`structa_types::DeclaredValue`]. It also rejects documents that reuse a
//! logical id, unless told otherwise.

pub mod error;
pub mod loader;
pub mod node;

pub use error::{DocumentError, DocumentResult};
pub use loader::{Document, DuplicatePolicy, LoadOptions};
pub use node::{DesiredAttribute, DesiredNode};
