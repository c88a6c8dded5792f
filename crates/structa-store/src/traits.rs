use structa_types::{NodeId, ResolvedValue};

use crate::error::{StoreError, StoreResult};
use crate::object::{Attribute, LiveNode, NodeType};

/// Capability surface over a live hierarchical object store.
///
/// Implementations must satisfy these invariants:
/// - Node ids are positive, unique, and never reused within one store.
/// - `get_node_children` and `list_nodes` return a stable order for an
///   unchanged store. Callers must not assume any particular order beyond that.
/// - Every mutating call commits on its own; there is no transaction spanning
///   several calls.
/// - `delete_node` never cascades: deleting a node with children fails.
pub trait StoreClient: Send + Sync {
    /// Look up a type by name. `Ok(None)` if the type system lacks it.
    fn get_type(&self, name: &str) -> StoreResult<Option<NodeType>>;

    /// Look up a node by id. `Ok(None)` if it does not exist.
    fn get_node(&self, id: NodeId) -> StoreResult<Option<LiveNode>>;

    /// All nodes of the given type, anywhere in the store.
    fn list_nodes(&self, type_name: &str) -> StoreResult<Vec<LiveNode>>;

    /// Create a node of `type_name` named `name` under `parent`.
    ///
    /// Fails if the parent is missing, the type is unknown, or the type is
    /// not permitted under the parent's type.
    fn create_child(&self, parent: NodeId, type_name: &str, name: &str) -> StoreResult<LiveNode>;

    /// Delete a leaf node. Fails with [`StoreError::HasChildren`] otherwise.
    fn delete_node(&self, id: NodeId) -> StoreResult<()>;

    /// Rename a node in place.
    ///
    /// Backends without rename support keep the default, which reports the
    /// operation as unsupported.
    fn rename_node(&self, id: NodeId, new_name: &str) -> StoreResult<LiveNode> {
        let _ = (id, new_name);
        Err(StoreError::Unsupported("rename_node"))
    }

    /// Direct children of a node.
    fn get_node_children(&self, id: NodeId) -> StoreResult<Vec<LiveNode>>;

    /// Look up an attribute of a node. `Ok(None)` if the node's type does
    /// not declare it.
    fn get_attribute(&self, node: NodeId, name: &str) -> StoreResult<Option<Attribute>>;

    /// Commit a new value to an attribute.
    fn write_attribute_value(
        &self,
        node: NodeId,
        name: &str,
        value: &ResolvedValue,
    ) -> StoreResult<()>;

    /// Cheap liveness check, made before every mutating call.
    fn is_connection_live(&self) -> bool;
}
