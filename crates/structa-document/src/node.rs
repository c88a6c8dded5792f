use structa_types::{DeclaredValue, Operation};

/// One attribute assignment on a desired node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredAttribute {
    pub name: String,
    pub value: DeclaredValue,
}

impl DesiredAttribute {
    pub fn new(name: impl Into<String>, value: DeclaredValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The desired shape of one node and its subtree.
///
/// Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredNode {
    pub operation: Operation,
    /// The integer id exactly as written in the document.
    pub raw_id: i64,
    /// Empty matches any name.
    pub name: String,
    /// Empty matches any type.
    pub type_name: String,
    pub attributes: Vec<DesiredAttribute>,
    pub children: Vec<DesiredNode>,
}

impl DesiredNode {
    /// A create-or-update node without logical id, attributes or children.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            operation: Operation::CreateOrUpdate(None),
            raw_id: 0,
            name: name.into(),
            type_name: type_name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_operation(mut self, raw_id: i64, operation: Operation) -> Self {
        self.raw_id = raw_id;
        self.operation = operation;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: DeclaredValue) -> Self {
        self.attributes.push(DesiredAttribute::new(name, value));
        self
    }

    pub fn with_child(mut self, child: DesiredNode) -> Self {
        self.children.push(child);
        self
    }

    /// Path segment used in trace lines: the name, or `[type]` for wildcards.
    pub fn segment(&self) -> String {
        match (self.name.is_empty(), self.type_name.is_empty()) {
            (false, _) => self.name.clone(),
            (true, false) => format!("[{}]", self.type_name),
            (true, true) => "[*]".to_string(),
        }
    }

    /// Number of nodes in this subtree, including this one.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(DesiredNode::len).sum::<usize>()
    }

    /// Always `false`: a subtree contains at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_prefers_name() {
        assert_eq!(DesiredNode::new("Bldg", "Building").segment(), "Bldg");
        assert_eq!(DesiredNode::new("", "Building").segment(), "[Building]");
        assert_eq!(DesiredNode::new("", "").segment(), "[*]");
    }

    #[test]
    fn len_counts_subtree() {
        let tree = DesiredNode::new("a", "")
            .with_child(DesiredNode::new("b", "").with_child(DesiredNode::new("c", "")))
            .with_child(DesiredNode::new("d", ""));
        assert_eq!(tree.len(), 4);
    }
}
