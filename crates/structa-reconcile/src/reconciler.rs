//! The tree walk: match, dispatch, apply, recurse.

use structa_document::{DesiredNode, Document};
use structa_store::{LiveNode, StoreClient, StoreError};
use structa_types::{DeclaredValue, LogicalId, NodeId, Operation};
use tracing::{debug, error, info, warn};

use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::refs::ReferenceTable;
use crate::report::{NodeOutcome, RunReport};
use crate::resolve::ValueResolver;
use crate::retry::read_with_retry;
use crate::root::resolve_root;
use crate::writer::AttributeWriter;

/// Reconciles documents against one store.
///
/// Each call to [`Reconciler::reconcile`] is an independent run with its own
/// reference table. Runs are strictly sequential and depth-first: a node's
/// attributes are written before its children are visited, and siblings are
/// visited in document order.
pub struct Reconciler<'s, S: StoreClient + ?Sized> {
    store: &'s S,
    config: ReconcileConfig,
}

impl<'s, S: StoreClient + ?Sized> Reconciler<'s, S> {
    pub fn new(store: &'s S, config: ReconcileConfig) -> Self {
        Self { store, config }
    }

    /// Apply `document` to the store.
    ///
    /// Returns `Err` only for run-fatal errors: the root cannot be resolved,
    /// the connection is lost, or the store cannot express an operation.
    /// Changes made before such an error stay in the store. Everything else
    /// is recorded in the returned report.
    pub fn reconcile(&self, document: &Document) -> ReconcileResult<RunReport> {
        let desired_root = &document.root;
        info!(
            document = %document.path.display(),
            root = %desired_root.segment(),
            nodes = desired_root.len(),
            "reconciliation started"
        );

        let root = resolve_root(self.store, desired_root, self.config.read_retries).map_err(|err| {
            error!(document = %document.path.display(), error = %err, "root resolution failed; nothing applied");
            err
        })?;

        let mut run = Run::new(self.store, document, self.config.read_retries);
        run.report.root = Some(root.id);

        let root_path = format!("/{}", root.name);
        if let Err(err) = run.apply_children(&desired_root.children, &root, &root_path) {
            error!(
                document = %document.path.display(),
                error = %err,
                progress = %run.report,
                "reconciliation aborted"
            );
            return Err(err);
        }

        debug!(document = %document.path.display(), bindings = ?run.refs.bindings(), "reference table");
        info!(
            document = %document.path.display(),
            summary = %run.report,
            bindings = run.refs.len(),
            "reconciliation finished"
        );
        Ok(run.report)
    }
}

/// State owned by a single run.
struct Run<'s, S: StoreClient + ?Sized> {
    store: &'s S,
    refs: ReferenceTable,
    resolver: ValueResolver,
    report: RunReport,
    read_retries: u32,
}

impl<'s, S: StoreClient + ?Sized> Run<'s, S> {
    fn new(store: &'s S, document: &Document, read_retries: u32) -> Self {
        Self {
            store,
            refs: ReferenceTable::new(),
            resolver: ValueResolver::new(&document.base_dir),
            report: RunReport::new(&document.path),
            read_retries,
        }
    }

    /// Reconcile `children` in document order under `parent`, returning how
    /// many of them failed.
    fn apply_children(
        &mut self,
        children: &[DesiredNode],
        parent: &LiveNode,
        parent_path: &str,
    ) -> ReconcileResult<usize> {
        let mut failed = 0;
        for child in children {
            match self.apply_node(child, parent, parent_path)? {
                NodeOutcome::Applied { node, created } => {
                    debug!(path = %parent_path, child = %node.id, created, "child applied");
                }
                NodeOutcome::Skipped => {}
                NodeOutcome::Failed(kind) => {
                    debug!(path = %parent_path, child = %child.segment(), ?kind, "child failed");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            info!(path = %parent_path, failed, of = children.len(), "children finished with failures");
        }
        Ok(failed)
    }

    /// Reconcile one desired node under `parent`.
    ///
    /// Subtree-local failures are recorded and reported as
    /// [`NodeOutcome::Failed`]; only run-fatal errors come back as `Err`.
    fn apply_node(
        &mut self,
        desired: &DesiredNode,
        parent: &LiveNode,
        parent_path: &str,
    ) -> ReconcileResult<NodeOutcome> {
        let path = format!("{parent_path}/{}", desired.segment());
        debug!(
            path = %path,
            id = desired.raw_id,
            type_name = %desired.type_name,
            operation = %desired.operation,
            "processing node"
        );

        match self.dispatch(desired, parent, &path) {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_run_fatal() => Err(err),
            Err(err) => {
                warn!(path = %path, error = %err, "node failed; skipping its subtree");
                Ok(NodeOutcome::Failed(self.report.record(&path, err)))
            }
        }
    }

    fn dispatch(
        &mut self,
        desired: &DesiredNode,
        parent: &LiveNode,
        path: &str,
    ) -> ReconcileResult<NodeOutcome> {
        let found = self.find_match(parent.id, &desired.name, &desired.type_name)?;

        match &desired.operation {
            Operation::Ignore => {
                info!(path = %path, "ignored");
                self.report.ignored += 1;
                Ok(NodeOutcome::Skipped)
            }
            Operation::Delete => self.delete_matches(desired, parent, path, found, false),
            Operation::DeleteRecursive => self.delete_matches(desired, parent, path, found, true),
            Operation::Rename(new_name) => {
                let node = self.rename(desired, parent, path, found, new_name)?;
                self.apply_contents(desired, &node, path)?;
                Ok(NodeOutcome::Applied {
                    node,
                    created: false,
                })
            }
            Operation::CreateOrUpdate(logical_id) => {
                let (node, created) = match found {
                    Some(node) => {
                        debug!(path = %path, id = %node.id, "matched existing node");
                        self.report.matched += 1;
                        (node, false)
                    }
                    None => (self.create(desired, parent, path)?, true),
                };
                if let Some(logical_id) = logical_id {
                    self.bind(*logical_id, node.id, path);
                }
                self.apply_contents(desired, &node, path)?;
                Ok(NodeOutcome::Applied { node, created })
            }
        }
    }

    /// First child of `parent` agreeing on name and type, in store order.
    fn find_match(
        &self,
        parent: NodeId,
        name: &str,
        type_name: &str,
    ) -> ReconcileResult<Option<LiveNode>> {
        let children = read_with_retry(self.read_retries, || self.store.get_node_children(parent))?;
        for child in children {
            debug!(
                id = %child.id,
                name = %child.name,
                type_name = %child.type_name,
                "comparing"
            );
            if child.matches(name, type_name) {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    fn ensure_live(&self) -> ReconcileResult<()> {
        if self.store.is_connection_live() {
            Ok(())
        } else {
            Err(ReconcileError::ConnectionLost)
        }
    }

    fn create(&mut self, desired: &DesiredNode, parent: &LiveNode, path: &str) -> ReconcileResult<LiveNode> {
        self.ensure_live()?;
        let node = self
            .store
            .create_child(parent.id, &desired.type_name, &desired.name)
            .map_err(|err| match err {
                StoreError::ConnectionLost | StoreError::DeadlineExceeded { .. } => err.into(),
                source => ReconcileError::CreateRejected {
                    name: desired.name.clone(),
                    type_name: desired.type_name.clone(),
                    source,
                },
            })?;
        info!(path = %path, id = %node.id, parent = %parent.id, "created");
        self.report.created += 1;
        Ok(node)
    }

    fn bind(&mut self, logical_id: LogicalId, node: NodeId, path: &str) {
        if let Some(previous) = self.refs.bind(logical_id, node) {
            if previous != node {
                warn!(
                    path = %path,
                    %logical_id,
                    %previous,
                    current = %node,
                    "logical id rebound; later references see the new node"
                );
            }
        }
        debug!(path = %path, %logical_id, %node, "logical id bound");
    }

    /// Delete the match, then keep matching and deleting until nothing
    /// matches any more.
    fn delete_matches(
        &mut self,
        desired: &DesiredNode,
        parent: &LiveNode,
        path: &str,
        mut found: Option<LiveNode>,
        recursive: bool,
    ) -> ReconcileResult<NodeOutcome> {
        if found.is_none() {
            info!(path = %path, "nothing to delete; carrying on");
        }
        while let Some(node) = found {
            if recursive {
                info!(path = %path, id = %node.id, "deleting subtree");
                self.delete_subtree(&node, path)?;
            } else {
                self.delete_one(&node, path)?;
            }
            found = self.find_match(parent.id, &desired.name, &desired.type_name)?;
        }
        Ok(NodeOutcome::Skipped)
    }

    /// Depth-first, bottom-up: children are drained before the node goes.
    fn delete_subtree(&mut self, node: &LiveNode, path: &str) -> ReconcileResult<()> {
        loop {
            let children = read_with_retry(self.read_retries, || self.store.get_node_children(node.id))?;
            match children.into_iter().next() {
                Some(child) => {
                    let child_path = format!("{path}/{}", child.name);
                    self.delete_subtree(&child, &child_path)?;
                }
                None => break,
            }
        }
        self.delete_one(node, path)
    }

    fn delete_one(&mut self, node: &LiveNode, path: &str) -> ReconcileResult<()> {
        self.ensure_live()?;
        self.store.delete_node(node.id).map_err(|err| match err {
            StoreError::ConnectionLost | StoreError::DeadlineExceeded { .. } => err.into(),
            source => ReconcileError::DeleteRejected {
                node: node.id,
                source,
            },
        })?;
        info!(path = %path, id = %node.id, type_name = %node.type_name, "deleted");
        self.report.deleted += 1;
        Ok(())
    }

    /// Rename the matched node in place. A node already carrying the new name
    /// is accepted as is, so repeating a rename is harmless.
    fn rename(
        &mut self,
        desired: &DesiredNode,
        parent: &LiveNode,
        path: &str,
        found: Option<LiveNode>,
        new_name: &str,
    ) -> ReconcileResult<LiveNode> {
        if let Some(node) = found {
            if node.name == new_name {
                debug!(path = %path, id = %node.id, "already carries the new name");
                return Ok(node);
            }
            self.ensure_live()?;
            let renamed = self.store.rename_node(node.id, new_name)?;
            info!(path = %path, id = %node.id, from = %node.name, to = %new_name, "renamed");
            self.report.renamed += 1;
            return Ok(renamed);
        }
        match self.find_match(parent.id, new_name, &desired.type_name)? {
            Some(node) => {
                debug!(path = %path, id = %node.id, "already renamed");
                self.report.matched += 1;
                Ok(node)
            }
            None => Err(ReconcileError::NodeNotFound(format!(
                "{}/{} (to be renamed to {new_name})",
                desired.name, desired.type_name
            ))),
        }
    }

    /// Write the node's attributes, then reconcile its children.
    fn apply_contents(&mut self, desired: &DesiredNode, node: &LiveNode, path: &str) -> ReconcileResult<()> {
        self.write_attributes(desired, node, path)?;
        self.apply_children(&desired.children, node, path)?;
        Ok(())
    }

    fn write_attributes(&mut self, desired: &DesiredNode, node: &LiveNode, path: &str) -> ReconcileResult<()> {
        let writer = AttributeWriter::new(self.store, self.read_retries);

        for (index, attribute) in desired.attributes.iter().enumerate() {
            debug!(path = %path, attribute = %attribute.name, value = %attribute.value, "processing attribute");

            let value = match self.resolver.resolve(&attribute.value, &self.refs) {
                Ok(Some(value)) => {
                    if !matches!(attribute.value, DeclaredValue::Literal(_)) {
                        debug!(
                            path = %path,
                            attribute = %attribute.name,
                            declared = %attribute.value,
                            value = %value.summary(),
                            "value resolved"
                        );
                    }
                    value
                }
                Ok(None) => {
                    debug!(path = %path, attribute = %attribute.name, "no value specified; not writing");
                    self.report.attributes_skipped += 1;
                    continue;
                }
                Err(err @ ReconcileError::FileReadError { .. }) => {
                    let remaining = desired.attributes.len() - index;
                    warn!(
                        path = %path,
                        attribute = %attribute.name,
                        error = %err,
                        skipped = remaining,
                        "file unreadable; abandoning remaining attributes of this node"
                    );
                    self.report.attributes_skipped += remaining;
                    self.report.record(path, err);
                    break;
                }
                Err(err) => {
                    warn!(path = %path, attribute = %attribute.name, error = %err, "attribute not resolved");
                    self.report.attributes_skipped += 1;
                    self.report.record(path, err);
                    continue;
                }
            };

            match writer.write(node.id, &attribute.name, &value) {
                Ok(()) => {
                    info!(path = %path, attribute = %attribute.name, value = %value.summary(), "attribute written");
                    self.report.attributes_written += 1;
                }
                Err(err) if err.is_run_fatal() => return Err(err),
                Err(err) => {
                    warn!(path = %path, attribute = %attribute.name, error = %err, "attribute not written");
                    self.report.attributes_skipped += 1;
                    self.report.record(path, err);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use structa_document::LoadOptions;
    use structa_store::{AttributeSpec, InMemoryStore, NodeType};
    use structa_types::{DeclaredValue, ResolvedValue};

    fn store() -> (InMemoryStore, LiveNode) {
        let store = InMemoryStore::new();
        store.define_type(NodeType::new("Organization"));
        store.define_type(
            NodeType::new("Building")
                .under(["Organization"])
                .with_attribute(AttributeSpec::text("address")),
        );
        store.define_type(
            NodeType::new("Meter")
                .under(["Building"])
                .with_attribute(AttributeSpec::text("serial"))
                .with_attribute(AttributeSpec::text("unit")),
        );
        let root = store.create_root("Organization", "Site").unwrap();
        (store, root)
    }

    fn doc(children: Vec<DesiredNode>) -> Document {
        let mut root = DesiredNode::new("Site", "Organization");
        root.children = children;
        Document::from_root(root, "site.json")
    }

    fn op(raw: i64) -> Operation {
        Operation::decode(raw, None).unwrap()
    }

    fn run(store: &InMemoryStore, document: &Document) -> RunReport {
        Reconciler::new(store, ReconcileConfig::default())
            .reconcile(document)
            .unwrap()
    }

    fn names(store: &InMemoryStore, parent: NodeId) -> Vec<String> {
        store
            .get_node_children(parent)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Create / update
    // -----------------------------------------------------------------------

    #[test]
    fn creates_missing_nodes_in_document_order() {
        let (store, root) = store();
        let report = run(
            &store,
            &doc(vec![
                DesiredNode::new("B", "Building"),
                DesiredNode::new("A", "Building"),
            ]),
        );
        assert_eq!(report.created, 2);
        assert_eq!(names(&store, root.id), vec!["B", "A"]);
        assert_eq!(report.root, Some(root.id));
    }

    #[test]
    fn matched_node_keeps_unmentioned_attributes() {
        let (store, root) = store();
        let b = store.create_child(root.id, "Building", "B").unwrap();
        let m = store.create_child(b.id, "Meter", "M").unwrap();
        store
            .write_attribute_value(m.id, "unit", &ResolvedValue::Literal("kWh".into()))
            .unwrap();

        let document = doc(vec![DesiredNode::new("B", "Building").with_child(
            DesiredNode::new("M", "Meter").with_attribute("serial", DeclaredValue::Literal("42".into())),
        )]);
        let report = run(&store, &document);

        assert_eq!(report.created, 0);
        assert_eq!(report.matched, 2);
        let unit = store.get_attribute(m.id, "unit").unwrap().unwrap();
        assert_eq!(unit.value(), Some(&ResolvedValue::Literal("kWh".into())));
        let serial = store.get_attribute(m.id, "serial").unwrap().unwrap();
        assert_eq!(serial.value(), Some(&ResolvedValue::Literal("42".into())));
    }

    #[test]
    fn create_rejection_skips_subtree_but_not_siblings() {
        let (store, root) = store();
        let document = doc(vec![
            DesiredNode::new("M", "Meter").with_child(DesiredNode::new("Inner", "Building")),
            DesiredNode::new("B", "Building"),
        ]);
        let report = run(&store, &document);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind(), ErrorKind::CreateRejected);
        assert_eq!(report.failures[0].path, "/Site/M");
        assert_eq!(names(&store, root.id), vec!["B"]);
    }

    #[test]
    fn empty_name_matches_by_type() {
        let (store, root) = store();
        store.create_child(root.id, "Building", "Existing").unwrap();
        let document = doc(vec![DesiredNode::new("", "Building")
            .with_attribute("address", DeclaredValue::Literal("x".into()))]);
        let report = run(&store, &document);
        assert_eq!(report.created, 0);
        assert_eq!(report.attributes_written, 1);
    }

    // -----------------------------------------------------------------------
    // Ignore / delete
    // -----------------------------------------------------------------------

    #[test]
    fn ignore_skips_subtree() {
        let (store, root) = store();
        let document = doc(vec![DesiredNode::new("B", "Building")
            .with_operation(-1, op(-1))
            .with_child(DesiredNode::new("M", "Meter"))]);
        let report = run(&store, &document);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.created, 0);
        assert!(names(&store, root.id).is_empty());
    }

    #[test]
    fn delete_removes_all_matching_leaves() {
        let (store, root) = store();
        store.create_child(root.id, "Building", "Old").unwrap();
        store.create_child(root.id, "Building", "Keep").unwrap();
        store.create_child(root.id, "Building", "Old").unwrap();
        let document = doc(vec![DesiredNode::new("Old", "Building").with_operation(-2, op(-2))]);
        let report = run(&store, &document);
        assert_eq!(report.deleted, 2);
        assert_eq!(names(&store, root.id), vec!["Keep"]);
    }

    #[test]
    fn non_recursive_delete_refuses_parent() {
        let (store, root) = store();
        let b = store.create_child(root.id, "Building", "B").unwrap();
        store.create_child(b.id, "Meter", "M").unwrap();
        let document = doc(vec![DesiredNode::new("B", "Building").with_operation(-2, op(-2))]);
        let report = run(&store, &document);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.failures[0].kind(), ErrorKind::DeleteRejected);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn recursive_delete_drains_bottom_up() {
        let (store, root) = store();
        let b = store.create_child(root.id, "Building", "B").unwrap();
        store.create_child(b.id, "Meter", "M1").unwrap();
        store.create_child(b.id, "Meter", "M2").unwrap();
        let document = doc(vec![DesiredNode::new("B", "Building").with_operation(-3, op(-3))]);
        let report = run(&store, &document);
        assert_eq!(report.deleted, 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_of_missing_node_carries_on() {
        let (store, _) = store();
        let document = doc(vec![
            DesiredNode::new("Ghost", "Building").with_operation(-2, op(-2)),
            DesiredNode::new("B", "Building"),
        ]);
        let report = run(&store, &document);
        assert!(report.is_clean());
        assert_eq!(report.created, 1);
    }

    // -----------------------------------------------------------------------
    // Rename
    // -----------------------------------------------------------------------

    #[test]
    fn rename_in_place_then_update() {
        let (store, root) = store();
        let b = store.create_child(root.id, "Building", "Old").unwrap();
        let document = doc(vec![DesiredNode::new("Old", "Building")
            .with_operation(-4, Operation::Rename("New".into()))
            .with_attribute("address", DeclaredValue::Literal("x".into()))
            .with_child(DesiredNode::new("M", "Meter"))]);

        let report = run(&store, &document);
        assert_eq!(report.renamed, 1);
        assert_eq!(store.get_node(b.id).unwrap().unwrap().name, "New");
        assert_eq!(names(&store, b.id), vec!["M"]);

        let again = run(&store, &document);
        assert_eq!(again.renamed, 0);
        assert_eq!(again.created, 0);
        assert!(again.is_clean());
    }

    #[test]
    fn rename_without_source_or_target_fails_locally() {
        let (store, _) = store();
        let document = doc(vec![
            DesiredNode::new("Old", "Building").with_operation(-4, Operation::Rename("New".into())),
            DesiredNode::new("B", "Building"),
        ]);
        let report = run(&store, &document);
        assert_eq!(report.failures[0].kind(), ErrorKind::NodeNotFound);
        assert_eq!(report.created, 1);
    }

    // -----------------------------------------------------------------------
    // Attributes and references
    // -----------------------------------------------------------------------

    #[test]
    fn reference_to_earlier_sibling() {
        let (store, root) = store();
        let document = doc(vec![
            DesiredNode::new("B", "Building").with_operation(7, op(7)),
            DesiredNode::new("C", "Building")
                .with_attribute("address", DeclaredValue::Reference(LogicalId::new(7).unwrap())),
        ]);
        run(&store, &document);
        let children = store.get_node_children(root.id).unwrap();
        let attr = store.get_attribute(children[1].id, "address").unwrap().unwrap();
        assert_eq!(attr.value(), Some(&ResolvedValue::Literal(children[0].id.to_string())));
    }

    #[test]
    fn forward_reference_is_recorded_not_written() {
        let (store, root) = store();
        let document = doc(vec![
            DesiredNode::new("C", "Building")
                .with_attribute("address", DeclaredValue::Reference(LogicalId::new(7).unwrap())),
            DesiredNode::new("B", "Building").with_operation(7, op(7)),
        ]);
        let report = run(&store, &document);
        assert_eq!(report.failures_of(ErrorKind::UnresolvedReference).count(), 1);
        let c = store.get_node_children(root.id).unwrap().remove(0);
        let attr = store.get_attribute(c.id, "address").unwrap().unwrap();
        assert!(attr.value().is_none());
    }

    #[test]
    fn self_reference_resolves() {
        let (store, root) = store();
        let document = doc(vec![DesiredNode::new("B", "Building")
            .with_operation(3, op(3))
            .with_attribute("address", DeclaredValue::Reference(LogicalId::new(3).unwrap()))]);
        run(&store, &document);
        let b = store.get_node_children(root.id).unwrap().remove(0);
        let attr = store.get_attribute(b.id, "address").unwrap().unwrap();
        assert_eq!(attr.value(), Some(&ResolvedValue::Literal(b.id.to_string())));
    }

    #[test]
    fn attribute_failures_do_not_stop_later_attributes() {
        let (store, root) = store();
        let b = store.create_child(root.id, "Building", "B").unwrap();
        let document = doc(vec![DesiredNode::new("B", "Building")
            .with_child(
                DesiredNode::new("M", "Meter")
                    .with_attribute("colour", DeclaredValue::Literal("red".into()))
                    .with_attribute("serial", DeclaredValue::Empty)
                    .with_attribute("unit", DeclaredValue::Literal("kWh".into())),
            )]);
        let report = run(&store, &document);
        assert_eq!(report.failures_of(ErrorKind::AttributeNotFound).count(), 1);
        assert_eq!(report.attributes_written, 1);
        assert_eq!(report.attributes_skipped, 2);
        let m = store.get_node_children(b.id).unwrap().remove(0);
        assert!(store.get_attribute(m.id, "unit").unwrap().unwrap().value().is_some());
    }

    #[test]
    fn unreadable_file_abandons_rest_of_node_but_not_children() {
        let dir = tempfile::tempdir().unwrap();
        let mut root = DesiredNode::new("Site", "Organization");
        root.children.push(
            DesiredNode::new("B", "Building")
                .with_attribute("address", DeclaredValue::File("missing.txt".into()))
                .with_attribute("address", DeclaredValue::Literal("never".into()))
                .with_child(DesiredNode::new("M", "Meter")),
        );
        let document = Document::from_root(root, dir.path().join("site.json"));

        let (store, site) = store();
        let report = run(&store, &document);
        assert_eq!(report.failures_of(ErrorKind::FileReadError).count(), 1);
        assert_eq!(report.attributes_written, 0);
        assert_eq!(report.attributes_skipped, 2);
        let b = store.get_node_children(site.id).unwrap().remove(0);
        assert!(store.get_attribute(b.id, "address").unwrap().unwrap().value().is_none());
        assert_eq!(names(&store, b.id), vec!["M"]);
    }

    // -----------------------------------------------------------------------
    // Node outcomes
    // -----------------------------------------------------------------------

    #[test]
    fn apply_node_reports_created_then_matched() {
        let (store, root) = store();
        let document = doc(vec![]);
        let mut run = Run::new(&store, &document, 0);
        let desired = DesiredNode::new("B", "Building");

        match run.apply_node(&desired, &root, "/Site").unwrap() {
            NodeOutcome::Applied { node, created } => {
                assert!(created);
                assert_eq!(node.name, "B");
            }
            other => panic!("expected Applied, got {other:?}"),
        }
        assert!(matches!(
            run.apply_node(&desired, &root, "/Site").unwrap(),
            NodeOutcome::Applied { created: false, .. }
        ));
        let ignored = DesiredNode::new("B", "Building").with_operation(-1, op(-1));
        assert_eq!(run.apply_node(&ignored, &root, "/Site").unwrap(), NodeOutcome::Skipped);
    }

    #[test]
    fn apply_children_counts_failed_children() {
        let (store, root) = store();
        let document = doc(vec![]);
        let mut run = Run::new(&store, &document, 0);
        let children = vec![
            DesiredNode::new("M", "Meter"),
            DesiredNode::new("B", "Building"),
            DesiredNode::new("Ghost", "Building").with_operation(-4, Operation::Rename("New".into())),
        ];

        assert_eq!(run.apply_children(&children, &root, "/Site").unwrap(), 2);
        assert_eq!(run.report.failures_of(ErrorKind::CreateRejected).count(), 1);
        assert_eq!(run.report.failures_of(ErrorKind::NodeNotFound).count(), 1);
        assert_eq!(names(&store, root.id), vec!["B"]);
    }

    // -----------------------------------------------------------------------
    // Trace events
    // -----------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `document` with a debug-level subscriber, returning the log lines.
    fn traced(store: &InMemoryStore, document: &Document) -> Vec<String> {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_target(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || run(store, document));
        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap().lines().map(str::to_string).collect()
    }

    fn event<'a>(lines: &'a [String], message: &str) -> Vec<&'a String> {
        lines.iter().filter(|l| l.contains(&format!(" {message} "))).collect()
    }

    #[test]
    fn mutation_events_carry_node_path() {
        let (store, root) = store();
        let old = store.create_child(root.id, "Building", "Old").unwrap();
        store.create_child(old.id, "Meter", "M").unwrap();
        let document = doc(vec![
            DesiredNode::new("Old", "Building").with_operation(-3, op(-3)),
            DesiredNode::new("B", "Building")
                .with_operation(1, op(1))
                .with_attribute("address", DeclaredValue::Literal("x".into())),
            DesiredNode::new("C", "Building")
                .with_attribute("address", DeclaredValue::Reference(LogicalId::new(1).unwrap())),
        ]);
        let lines = traced(&store, &document);

        let deleted = event(&lines, "deleted");
        assert_eq!(deleted.len(), 2);
        assert!(deleted[0].contains("path=/Site/Old/M"), "{}", deleted[0]);
        assert!(deleted[1].contains("path=/Site/Old "), "{}", deleted[1]);

        let written = event(&lines, "attribute written");
        assert_eq!(written.len(), 2);
        assert!(written[0].contains("path=/Site/B"), "{}", written[0]);
        assert!(written[1].contains("path=/Site/C"), "{}", written[1]);

        let resolved = event(&lines, "value resolved");
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].contains("path=/Site/C"), "{}", resolved[0]);
    }

    // -----------------------------------------------------------------------
    // Run-fatal errors
    // -----------------------------------------------------------------------

    #[test]
    fn root_failure_applies_nothing() {
        let (store, _) = store();
        let mut root = DesiredNode::new("Nowhere", "Organization");
        root.children.push(DesiredNode::new("B", "Building"));
        let document = Document::from_root(root, "x.json");
        let err = Reconciler::new(&store, ReconcileConfig::default())
            .reconcile(&document)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::RootNotFound { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reconcile_loaded_document() {
        let (store, root) = store();
        let json = r#"{"name":"Site","jevisClass":"Organization","children":[
            {"id":1,"name":"B","jevisClass":"Building","children":[
                {"id":2,"name":"M","jevisClass":"Meter","attributes":[{"name":"serial","lastvalue":"$(REF)1"}]}]}]}"#;
        let document = Document::parse(json, Path::new("site.json"), LoadOptions::default()).unwrap();
        let report = run(&store, &document);
        assert_eq!(report.created, 2);
        let b = store.get_node_children(root.id).unwrap().remove(0);
        let m = store.get_node_children(b.id).unwrap().remove(0);
        let serial = store.get_attribute(m.id, "serial").unwrap().unwrap();
        assert_eq!(serial.value(), Some(&ResolvedValue::Literal(b.id.to_string())));
    }
}
