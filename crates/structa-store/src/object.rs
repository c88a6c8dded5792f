use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use structa_types::{NodeId, ResolvedValue};

/// What kind of value an attribute accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Plain text, including resolved references.
    #[default]
    Text,
    /// A file payload.
    File,
}

impl AttributeKind {
    /// Returns `true` if a value of this shape can be committed.
    pub fn accepts(&self, value: &ResolvedValue) -> bool {
        matches!(
            (self, value),
            (Self::Text, ResolvedValue::Literal(_)) | (Self::File, ResolvedValue::File(_))
        )
    }
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Declaration of one attribute on a node type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(default)]
    pub kind: AttributeKind,
}

impl AttributeSpec {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Text,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::File,
        }
    }
}

/// A named type in the store's type system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeType {
    pub name: String,
    /// Types a node of this type may be created under. Empty allows any parent.
    #[serde(default)]
    pub allowed_parents: Vec<String>,
    /// At most one node of this type per parent.
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
}

impl NodeType {
    /// A type allowed anywhere with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_parents: Vec::new(),
            unique: false,
            attributes: Vec::new(),
        }
    }

    /// Restrict the parent types this type may be created under.
    pub fn under<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Check the parent constraint.
    pub fn is_allowed_under(&self, parent_type: &str) -> bool {
        self.allowed_parents.is_empty() || self.allowed_parents.iter().any(|p| p == parent_type)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// A node as currently present in the store.
///
/// This is a value snapshot. It does not track later mutations; query the
/// store again to observe them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveNode {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub parent: Option<NodeId>,
}

impl LiveNode {
    /// The desired-node match rule: an empty name or type matches anything.
    pub fn matches(&self, name: &str, type_name: &str) -> bool {
        (name.is_empty() || self.name == name)
            && (type_name.is_empty() || self.type_name == type_name)
    }
}

impl std::fmt::Display for LiveNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.id, self.name, self.type_name)
    }
}

/// One committed attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub value: ResolvedValue,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn now(value: ResolvedValue) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
        }
    }
}

/// An attribute of a live node together with its latest sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    pub latest: Option<Sample>,
    pub sample_count: usize,
}

impl Attribute {
    /// The latest committed value, if any.
    pub fn value(&self) -> Option<&ResolvedValue> {
        self.latest.as_ref().map(|s| &s.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use structa_types::FilePayload;

    fn node(name: &str, type_name: &str) -> LiveNode {
        LiveNode {
            id: NodeId::new(1).unwrap(),
            name: name.into(),
            type_name: type_name.into(),
            parent: None,
        }
    }

    #[test]
    fn match_is_name_and_type_conjunctive() {
        let n = node("Meter", "Meter");
        assert!(n.matches("Meter", "Meter"));
        assert!(!n.matches("Meter", "Building"));
        assert!(!n.matches("Other", "Meter"));
    }

    #[test]
    fn empty_name_or_type_is_wildcard() {
        let n = node("Meter", "Meter");
        assert!(n.matches("", "Meter"));
        assert!(n.matches("Meter", ""));
        assert!(n.matches("", ""));
        assert!(!n.matches("", "Building"));
    }

    #[test]
    fn allowed_under() {
        let any = NodeType::new("Folder");
        assert!(any.is_allowed_under("Whatever"));
        let meter = NodeType::new("Meter").under(["Building"]);
        assert!(meter.is_allowed_under("Building"));
        assert!(!meter.is_allowed_under("Organization"));
    }

    #[test]
    fn attribute_kind_accepts() {
        let text = ResolvedValue::Literal("1".into());
        let file = ResolvedValue::File(FilePayload::new("f", vec![]));
        assert!(AttributeKind::Text.accepts(&text));
        assert!(!AttributeKind::Text.accepts(&file));
        assert!(AttributeKind::File.accepts(&file));
        assert!(!AttributeKind::File.accepts(&text));
    }

    #[test]
    fn node_type_deserializes_with_defaults() {
        let t: NodeType = serde_json::from_str(r#"{"name":"Building"}"#).unwrap();
        assert!(t.allowed_parents.is_empty());
        assert!(!t.unique);
        assert!(t.attributes.is_empty());
    }
}
