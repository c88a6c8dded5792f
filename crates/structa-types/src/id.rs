use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier the store assigns to a live node.
///
/// Always positive and unique within one store. The store never reuses an
/// id after the node is deleted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct NodeId(i64);

impl NodeId {
    /// Create a node id, rejecting zero and negative values.
    pub fn new(raw: i64) -> Result<Self, TypeError> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(TypeError::NonPositiveId(raw))
        }
    }

    /// The raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for NodeId {
    type Error = TypeError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<NodeId> for i64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document-scoped id declared on a desired node.
///
/// A logical id lives only for one reconciliation run. It maps onto whatever
/// [`NodeId`] the node ends up with in the store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct LogicalId(i64);

impl LogicalId {
    /// Create a logical id, rejecting zero and negative values.
    pub fn new(raw: i64) -> Result<Self, TypeError> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(TypeError::NonPositiveId(raw))
        }
    }

    /// The raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for LogicalId {
    type Error = TypeError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<LogicalId> for i64 {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}

impl FromStr for LogicalId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s.trim().parse().map_err(|e: std::num::ParseIntError| {
            TypeError::InvalidReference {
                raw: s.to_string(),
                reason: e.to_string(),
            }
        })?;
        Self::new(raw).map_err(|_| TypeError::InvalidReference {
            raw: s.to_string(),
            reason: "logical ids must be positive".into(),
        })
    }
}

impl fmt::Debug for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicalId({})", self.0)
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
