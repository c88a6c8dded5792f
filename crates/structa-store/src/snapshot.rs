//! JSON snapshots of an [`InMemoryStore`].
//!
//! A snapshot records the type system, every node with its parent link and
//! attribute history, and the next id to hand out. Child order is not stored:
//! it is rebuilt from ascending node ids, which equals creation order.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::memory::{AttributeRecord, InMemoryStore, NodeRecord, State};
use crate::object::NodeType;

/// Serializable image of an in-memory store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub types: Vec<NodeType>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub next_id: i64,
}

impl StoreSnapshot {
    /// Read a snapshot from a JSON file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let data = fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(path, data)?;
        info!(path = %path.display(), nodes = self.nodes.len(), "snapshot saved");
        Ok(())
    }
}

impl InMemoryStore {
    /// Capture the current state.
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().expect("lock poisoned");
        StoreSnapshot {
            types: state.types.values().cloned().collect(),
            nodes: state.nodes.values().cloned().collect(),
            next_id: state.next_id,
        }
    }

    /// Rebuild a store from a snapshot, checking that it is self-consistent.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        let mut state = State::default();
        for node_type in snapshot.types {
            state.types.insert(node_type.name.clone(), node_type);
        }

        let mut max_id = 0;
        for mut node in snapshot.nodes {
            let node_type = state.types.get(&node.type_name).ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "node {} has unknown type {:?}",
                    node.id, node.type_name
                ))
            })?;
            for spec in &node_type.attributes {
                node.attributes
                    .entry(spec.name.clone())
                    .or_insert_with(|| AttributeRecord {
                        kind: spec.kind,
                        samples: Vec::new(),
                    });
            }
            node.children.clear();
            max_id = max_id.max(node.id.get());
            if state.nodes.insert(node.id, node).is_some() {
                return Err(StoreError::Corrupt("duplicate node id".into()));
            }
        }

        let links: Vec<_> = state
            .nodes
            .values()
            .filter_map(|n| n.parent.map(|p| (p, n.id)))
            .collect();
        for (parent, child) in links {
            let record = state.nodes.get_mut(&parent).ok_or_else(|| {
                StoreError::Corrupt(format!("node {child} has missing parent {parent}"))
            })?;
            record.children.push(child);
        }

        state.next_id = snapshot.next_id.max(max_id + 1);
        Ok(Self::from_state(state))
    }

    /// Load a store from a snapshot file.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let store = Self::from_snapshot(StoreSnapshot::load(path)?)?;
        info!(path = %path.display(), nodes = store.len(), "snapshot loaded");
        Ok(store)
    }

    /// Persist the current state to a snapshot file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        self.snapshot().save(path)
    }
}
