use serde::{Deserialize, Serialize};
use structa_document::{DuplicatePolicy, LoadOptions};

/// Configuration for a reconciliation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Handling of logical ids declared more than once.
    pub duplicate_ids: DuplicatePolicy,
    /// Extra attempts for read-only store calls that hit a transient error.
    pub read_retries: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            duplicate_ids: DuplicatePolicy::Reject,
            read_retries: 1,
        }
    }
}

impl ReconcileConfig {
    /// Document loading options implied by this configuration.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            duplicates: self.duplicate_ids,
        }
    }
}
