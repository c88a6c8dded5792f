use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::LogicalId;

/// What the reconciler does with one desired node.
///
/// Documents encode the operation in the node's integer `id`: positive values
/// double as logical ids, and a few negative values select the destructive
/// operations. The loader decodes the integer exactly once into this enum.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Match or create the node, then write its attributes and recurse.
    CreateOrUpdate(Option<LogicalId>),
    /// Leave the node and its subtree untouched.
    Ignore,
    /// Delete every matching leaf node.
    Delete,
    /// Delete every matching node together with its subtree.
    DeleteRecursive,
    /// Rename the matching node in place, then treat it as an update.
    Rename(String),
}

impl Operation {
    pub const IGNORE: i64 = -1;
    pub const DELETE: i64 = -2;
    pub const DELETE_RECURSIVE: i64 = -3;
    pub const RENAME: i64 = -4;

    /// Decode the integer operation code of a document node.
    ///
    /// `rename_to` is only consulted for [`Operation::RENAME`]. Zero and any
    /// negative code without a special meaning decode to a plain
    /// create-or-update without a logical id.
    pub fn decode(raw: i64, rename_to: Option<&str>) -> Result<Self, TypeError> {
        match raw {
            Self::IGNORE => Ok(Self::Ignore),
            Self::DELETE => Ok(Self::Delete),
            Self::DELETE_RECURSIVE => Ok(Self::DeleteRecursive),
            Self::RENAME => match rename_to {
                Some(name) if !name.is_empty() => Ok(Self::Rename(name.to_string())),
                _ => Err(TypeError::MissingRenameTarget),
            },
            n if n > 0 => Ok(Self::CreateOrUpdate(Some(LogicalId::new(n)?))),
            _ => Ok(Self::CreateOrUpdate(None)),
        }
    }

    /// The logical id this operation binds, if any.
    pub fn logical_id(&self) -> Option<LogicalId> {
        match self {
            Self::CreateOrUpdate(id) => *id,
            _ => None,
        }
    }

    /// Whether the node's declared children are reconciled at all.
    ///
    /// Ignored and deleted nodes never descend, so nothing beneath them is
    /// matched, created or bound.
    pub fn visits_children(&self) -> bool {
        matches!(self, Self::CreateOrUpdate(_) | Self::Rename(_))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateOrUpdate(Some(id)) => write!(f, "create-or-update {id}"),
            Self::CreateOrUpdate(None) => write!(f, "create-or-update"),
            Self::Ignore => write!(f, "ignore"),
            Self::Delete => write!(f, "delete"),
            Self::DeleteRecursive => write!(f, "delete-recursive"),
            Self::Rename(to) => write!(f, "rename -> {to}"),
        }
    }
}
