use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use structa_types::{NodeId, ResolvedValue};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{Attribute, AttributeKind, LiveNode, NodeType, Sample};
use crate::traits::StoreClient;

/// Stored form of one attribute: its kind and full sample history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub kind: AttributeKind,
    #[serde(default)]
    pub samples: Vec<Sample>,
}

/// Stored form of one node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeRecord>,
    #[serde(skip)]
    pub(crate) children: Vec<NodeId>,
}

impl NodeRecord {
    fn live(&self) -> LiveNode {
        LiveNode {
            id: self.id,
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            parent: self.parent,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) types: BTreeMap<String, NodeType>,
    pub(crate) nodes: BTreeMap<NodeId, NodeRecord>,
    pub(crate) next_id: i64,
}

impl State {
    fn allocate_id(&mut self) -> NodeId {
        self.next_id = self.next_id.max(1);
        let id = NodeId::new(self.next_id).expect("next_id starts at 1");
        self.next_id += 1;
        id
    }

    fn node(&self, id: NodeId) -> StoreResult<&NodeRecord> {
        self.nodes.get(&id).ok_or(StoreError::NodeNotFound(id))
    }

    fn insert(&mut self, parent: Option<NodeId>, node_type: &NodeType, name: &str) -> NodeRecord {
        let id = self.allocate_id();
        let attributes = node_type
            .attributes
            .iter()
            .map(|spec| {
                (
                    spec.name.clone(),
                    AttributeRecord {
                        kind: spec.kind,
                        samples: Vec::new(),
                    },
                )
            })
            .collect();
        let record = NodeRecord {
            id,
            name: name.to_string(),
            type_name: node_type.name.clone(),
            parent,
            attributes,
            children: Vec::new(),
        };
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.push(id);
            }
        }
        self.nodes.insert(id, record.clone());
        record
    }
}

/// In-memory hierarchical store with a small type system.
///
/// Intended for tests, for embedding, and as the snapshot-backed store the
/// CLI operates on. State lives behind a `RwLock`. Children are listed in
/// creation order, and ids are handed out sequentially from 1.
pub struct InMemoryStore {
    pub(crate) state: RwLock<State>,
    live: AtomicBool,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::from_state(State {
            next_id: 1,
            ..State::default()
        })
    }

    pub(crate) fn from_state(state: State) -> Self {
        Self {
            state: RwLock::new(state),
            live: AtomicBool::new(true),
        }
    }

    /// Add or replace a type definition.
    pub fn define_type(&self, node_type: NodeType) {
        let mut state = self.state.write().expect("lock poisoned");
        state.types.insert(node_type.name.clone(), node_type);
    }

    /// Create a top-level node with no parent.
    pub fn create_root(&self, type_name: &str, name: &str) -> StoreResult<LiveNode> {
        let mut state = self.state.write().expect("lock poisoned");
        let node_type = state
            .types
            .get(type_name)
            .cloned()
            .ok_or_else(|| StoreError::TypeNotFound(type_name.to_string()))?;
        Ok(state.insert(None, &node_type, name).live())
    }

    /// Simulate losing (or regaining) the connection.
    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    /// Number of nodes currently stored.
    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").nodes.len()
    }

    /// Returns `true` if the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.state.read().expect("lock poisoned").nodes.is_empty()
    }

    /// Nodes without a parent, in id order.
    pub fn roots(&self) -> Vec<LiveNode> {
        let state = self.state.read().expect("lock poisoned");
        state
            .nodes
            .values()
            .filter(|n| n.parent.is_none())
            .map(NodeRecord::live)
            .collect()
    }

    /// Full sample history of an attribute, oldest first.
    pub fn samples(&self, node: NodeId, name: &str) -> StoreResult<Vec<Sample>> {
        let state = self.state.read().expect("lock poisoned");
        let record = state.node(node)?;
        record
            .attributes
            .get(name)
            .map(|a| a.samples.clone())
            .ok_or_else(|| StoreError::AttributeNotFound {
                node,
                name: name.to_string(),
            })
    }

    fn ensure_live(&self) -> StoreResult<()> {
        if self.is_connection_live() {
            Ok(())
        } else {
            Err(StoreError::ConnectionLost)
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreClient for InMemoryStore {
    fn get_type(&self, name: &str) -> StoreResult<Option<NodeType>> {
        self.ensure_live()?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state.types.get(name).cloned())
    }

    fn get_node(&self, id: NodeId) -> StoreResult<Option<LiveNode>> {
        self.ensure_live()?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state.nodes.get(&id).map(NodeRecord::live))
    }

    fn list_nodes(&self, type_name: &str) -> StoreResult<Vec<LiveNode>> {
        self.ensure_live()?;
        let state = self.state.read().expect("lock poisoned");
        Ok(state
            .nodes
            .values()
            .filter(|n| n.type_name == type_name)
            .map(NodeRecord::live)
            .collect())
    }

    fn create_child(&self, parent: NodeId, type_name: &str, name: &str) -> StoreResult<LiveNode> {
        self.ensure_live()?;
        let mut state = self.state.write().expect("lock poisoned");
        let parent_record = state.node(parent)?;
        let node_type = state
            .types
            .get(type_name)
            .cloned()
            .ok_or_else(|| StoreError::TypeNotFound(type_name.to_string()))?;

        if !node_type.is_allowed_under(&parent_record.type_name) {
            return Err(StoreError::NotAllowedUnder {
                type_name: type_name.to_string(),
                parent_type: parent_record.type_name.clone(),
            });
        }
        if node_type.unique {
            let taken = parent_record
                .children
                .iter()
                .filter_map(|c| state.nodes.get(c))
                .any(|c| c.type_name == type_name);
            if taken {
                return Err(StoreError::UniqueViolation {
                    type_name: type_name.to_string(),
                    parent,
                });
            }
        }

        let record = state.insert(Some(parent), &node_type, name);
        debug!(id = %record.id, %parent, type_name, name, "node created");
        Ok(record.live())
    }

    fn delete_node(&self, id: NodeId) -> StoreResult<()> {
        self.ensure_live()?;
        let mut state = self.state.write().expect("lock poisoned");
        let record = state.node(id)?;
        if !record.children.is_empty() {
            return Err(StoreError::HasChildren {
                id,
                children: record.children.len(),
            });
        }
        let parent = record.parent;
        state.nodes.remove(&id);
        if let Some(parent) = parent {
            if let Some(p) = state.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != id);
            }
        }
        debug!(%id, "node deleted");
        Ok(())
    }

    fn rename_node(&self, id: NodeId, new_name: &str) -> StoreResult<LiveNode> {
        self.ensure_live()?;
        let mut state = self.state.write().expect("lock poisoned");
        let record = state.nodes.get_mut(&id).ok_or(StoreError::NodeNotFound(id))?;
        record.name = new_name.to_string();
        Ok(record.live())
    }

    fn get_node_children(&self, id: NodeId) -> StoreResult<Vec<LiveNode>> {
        self.ensure_live()?;
        let state = self.state.read().expect("lock poisoned");
        let record = state.node(id)?;
        Ok(record
            .children
            .iter()
            .filter_map(|c| state.nodes.get(c))
            .map(NodeRecord::live)
            .collect())
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> StoreResult<Option<Attribute>> {
        self.ensure_live()?;
        let state = self.state.read().expect("lock poisoned");
        let record = state.node(node)?;
        Ok(record.attributes.get(name).map(|a| Attribute {
            name: name.to_string(),
            kind: a.kind,
            latest: a.samples.last().cloned(),
            sample_count: a.samples.len(),
        }))
    }

    fn write_attribute_value(
        &self,
        node: NodeId,
        name: &str,
        value: &ResolvedValue,
    ) -> StoreResult<()> {
        self.ensure_live()?;
        let mut state = self.state.write().expect("lock poisoned");
        let record = state.nodes.get_mut(&node).ok_or(StoreError::NodeNotFound(node))?;
        let attribute = record
            .attributes
            .get_mut(name)
            .ok_or_else(|| StoreError::AttributeNotFound {
                node,
                name: name.to_string(),
            })?;
        if !attribute.kind.accepts(value) {
            return Err(StoreError::ValueKindMismatch {
                attribute: name.to_string(),
                expected: attribute.kind,
            });
        }
        attribute.samples.push(Sample::now(value.clone()));
        Ok(())
    }

    fn is_connection_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        f.debug_struct("InMemoryStore")
            .field("type_count", &state.types.len())
            .field("node_count", &state.nodes.len())
            .finish()
    }
}
