use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use structa_document::DuplicatePolicy;
use structa_reconcile::ReconcileConfig;
use structa_store::StoreConfig;

use crate::cli::ApplyArgs;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "structa.toml";

/// Contents of `structa.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: StoreConfig,
    pub reconcile: ReconcileConfig,
}

impl CliConfig {
    /// Load from `explicit`, else from `./structa.toml` if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Command-line flags win over file values.
    pub fn apply_overrides(&mut self, args: &ApplyArgs) {
        if let Some(store) = &args.store {
            self.store.snapshot = Some(store.clone());
        }
        if let Some(ms) = args.call_timeout_ms {
            self.store.call_timeout_ms = Some(ms);
        }
        if let Some(retries) = args.read_retries {
            self.reconcile.read_retries = retries;
        }
        if args.allow_duplicate_ids {
            self.reconcile.duplicate_ids = DuplicatePolicy::LastWriteWins;
        }
    }

    pub fn snapshot_path(&self, flag: Option<&PathBuf>) -> anyhow::Result<PathBuf> {
        flag.or(self.store.snapshot.as_ref())
            .cloned()
            .context("no store snapshot given: pass --store or set [store] snapshot in structa.toml")
    }
}
