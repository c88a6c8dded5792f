//! Hierarchical object store capability for structa.
//!
//! The reconciler never talks to a concrete store. It consumes the
//! [`StoreClient`] trait, which covers lookups by id, by type and by parent,
//! creating and deleting nodes, and reading and writing attribute values.
//!
//! # Backends
//!
//! - [`InMemoryStore`] -- `RwLock`-guarded store with a small type system
//!   (allowed parents, unique types, typed attributes). It can be persisted as
//!   a JSON [`StoreSnapshot`], which is what the CLI operates on.
//! - [`DeadlineStore`] -- wraps any backend with a per-call deadline.
//!
//! # Rules
//!
//! 1. Node ids are positive and never reused.
//! 2. Every mutating call commits on its own.
//! 3. Deleting a node with children fails; cascading is the caller's job.
//! 4. A dead connection fails every call with [`StoreError::ConnectionLost`].

pub mod config;
pub mod deadline;
pub mod error;
pub mod memory;
pub mod object;
pub mod snapshot;
pub mod traits;

pub use config::StoreConfig;
pub use deadline::DeadlineStore;
pub use error::{StoreError, StoreResult};
pub use memory::{AttributeRecord, InMemoryStore, NodeRecord};
pub use object::{Attribute, AttributeKind, AttributeSpec, LiveNode, NodeType, Sample};
pub use snapshot::StoreSnapshot;
pub use traits::StoreClient;
