use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the CLI reaches its store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot file backing the in-memory store.
    pub snapshot: Option<PathBuf>,
    /// Per-call deadline in milliseconds. `None` disables deadlines.
    pub call_timeout_ms: Option<u64>,
}

impl StoreConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}
