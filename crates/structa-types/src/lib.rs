//! Foundation types for structa.
//!
//! Every other structa crate depends on `structa-types`. The types here are
//! plain values: they carry no store handle and perform no I/O.
//!
//! # Key Types
//!
//! - [`NodeId`] -- store-assigned identifier of a live node
//! - [`LogicalId`] -- document-declared id that later values can reference
//! - [`Operation`] -- what to do with a desired node, decoded once at load time
//! - [`DeclaredValue`] -- an attribute value as written in the document
//! - [`ResolvedValue`] / [`FilePayload`] -- a value ready to be written to the store

pub mod error;
pub mod id;
pub mod operation;
pub mod value;

pub use error::TypeError;
pub use id::{LogicalId, NodeId};
pub use operation::Operation;
pub use value::{DeclaredValue, FilePayload, ResolvedValue, FILE_MARKER, REFERENCE_MARKER};
