//! Logical-id to store-id bindings for one run.

use std::collections::HashMap;

use structa_types::{LogicalId, NodeId};

/// Maps logical ids declared in a document to the ids their nodes ended up
/// with in the store.
///
/// Created empty at the start of a run and dropped at its end. Entries are
/// added once a node is resolved (created or matched) and read by later
/// `$(REF)` values. Forward references are not supported.
#[derive(Clone, Debug, Default)]
pub struct ReferenceTable {
    entries: HashMap<LogicalId, NodeId>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `id` to `node`, returning the previous binding if there was one.
    pub fn bind(&mut self, id: LogicalId, node: NodeId) -> Option<NodeId> {
        self.entries.insert(id, node)
    }

    pub fn get(&self, id: LogicalId) -> Option<NodeId> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All bindings, sorted by logical id.
    pub fn bindings(&self) -> Vec<(LogicalId, NodeId)> {
        let mut out: Vec<_> = self.entries.iter().map(|(k, v)| (*k, *v)).collect();
        out.sort();
        out
    }
}
