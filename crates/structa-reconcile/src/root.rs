//! Locating the live node a document's tree hangs under.

use structa_document::DesiredNode;
use structa_store::{LiveNode, StoreClient};
use structa_types::NodeId;
use tracing::{debug, warn};

use crate::error::{ReconcileError, ReconcileResult};
use crate::retry::read_with_retry;

/// Find the existing root for `root`. Never mutates the store.
///
/// A positive `raw_id` pins the root to that store id; the node found there
/// must carry exactly the declared name and type. Without an id, the first
/// node of the declared type with the declared name wins, in store order.
pub fn resolve_root<S: StoreClient + ?Sized>(
    store: &S,
    root: &DesiredNode,
    read_retries: u32,
) -> ReconcileResult<LiveNode> {
    read_with_retry(read_retries, || store.get_type(&root.type_name))?
        .ok_or_else(|| ReconcileError::TypeNotFound(root.type_name.clone()))?;

    if root.raw_id > 0 {
        let id = NodeId::new(root.raw_id).map_err(|_| root_not_found(root))?;
        return match read_with_retry(read_retries, || store.get_node(id))? {
            Some(node) if node.name == root.name && node.type_name == root.type_name => {
                debug!(%id, "root found by id");
                Ok(node)
            }
            Some(node) => Err(ReconcileError::RootMismatch {
                id,
                expected: format!("{}/{}", root.name, root.type_name),
                found: format!("{}/{}", node.name, node.type_name),
            }),
            None => Err(root_not_found(root)),
        };
    }

    let mut candidates: Vec<LiveNode> = read_with_retry(read_retries, || {
        store.list_nodes(&root.type_name)
    })?
    .into_iter()
    .filter(|n| n.name == root.name)
    .collect();

    if candidates.len() > 1 {
        let ids: Vec<String> = candidates.iter().map(|n| n.id.to_string()).collect();
        warn!(
            name = %root.name,
            type_name = %root.type_name,
            candidates = %ids.join(","),
            "several roots match; using the first. Pin the root with its id to disambiguate"
        );
    }
    if candidates.is_empty() {
        return Err(root_not_found(root));
    }
    let node = candidates.swap_remove(0);
    debug!(id = %node.id, "root found by name");
    Ok(node)
}

fn root_not_found(root: &DesiredNode) -> ReconcileError {
    ReconcileError::RootNotFound {
        name: root.name.clone(),
        type_name: root.type_name.clone(),
    }
}
