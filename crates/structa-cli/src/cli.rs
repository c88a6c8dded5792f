use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "structa",
    about = "structa -- declarative structure reconciliation for hierarchical object stores",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./structa.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile documents against a store snapshot, in order
    Apply(ApplyArgs),
    /// Load and validate documents without touching a store
    Check(CheckArgs),
    /// Print the live tree of a store snapshot
    Tree(TreeArgs),
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Store snapshot to reconcile against; written back afterwards
    #[arg(long)]
    pub store: Option<PathBuf>,
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,
    /// Let a later node take over a logical id declared earlier
    #[arg(long)]
    pub allow_duplicate_ids: bool,
    /// Per-call store deadline in milliseconds
    #[arg(long)]
    pub call_timeout_ms: Option<u64>,
    /// Extra attempts for reads that hit a deadline
    #[arg(long)]
    pub read_retries: Option<u32>,
}

#[derive(Args)]
pub struct CheckArgs {
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,
    #[arg(long)]
    pub allow_duplicate_ids: bool,
}

#[derive(Args)]
pub struct TreeArgs {
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Print only the subtree under this node id
    #[arg(long)]
    pub root: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_apply() {
        let cli = Cli::try_parse_from(["structa", "apply", "--store", "s.json", "a.json", "b.json"]).unwrap();
        if let Command::Apply(args) = cli.command {
            assert_eq!(args.store, Some(PathBuf::from("s.json")));
            assert_eq!(args.documents, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
            assert!(!args.allow_duplicate_ids);
            assert_eq!(args.call_timeout_ms, None);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_apply_overrides() {
        let cli = Cli::try_parse_from([
            "structa", "apply", "a.json", "--allow-duplicate-ids", "--call-timeout-ms", "250",
            "--read-retries", "3",
        ])
        .unwrap();
        if let Command::Apply(args) = cli.command {
            assert!(args.allow_duplicate_ids);
            assert_eq!(args.call_timeout_ms, Some(250));
            assert_eq!(args.read_retries, Some(3));
            assert_eq!(args.store, None);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn apply_needs_a_document() {
        assert!(Cli::try_parse_from(["structa", "apply", "--store", "s.json"]).is_err());
    }

    #[test]
    fn parse_check() {
        let cli = Cli::try_parse_from(["structa", "check", "a.json"]).unwrap();
        assert!(matches!(cli.command, Command::Check(_)));
    }

    #[test]
    fn parse_tree_root() {
        let cli = Cli::try_parse_from(["structa", "tree", "--store", "s.json", "--root", "4"]).unwrap();
        if let Command::Tree(args) = cli.command {
            assert_eq!(args.root, Some(4));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "structa", "--verbose", "--log-format", "json", "--config", "x.toml", "check", "a.json",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
