use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use structa_document::{Document, LoadOptions};
use structa_reconcile::{reconcile_path, ReconcileConfig, ReconcileError, RunReport};
use structa_store::{DeadlineStore, InMemoryStore, LiveNode, StoreClient};
use structa_types::NodeId;

use crate::cli::*;
use crate::config::CliConfig;

/// How a command ended, mapped onto the process exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Everything applied cleanly.
    Clean,
    /// At least one document aborted or recorded failures.
    Failures,
    /// The store could not be opened or its connection was lost.
    StoreUnavailable,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Clean => ExitCode::SUCCESS,
            Outcome::Failures => ExitCode::from(1),
            Outcome::StoreUnavailable => ExitCode::from(2),
        }
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<Outcome> {
    let config = CliConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Apply(args) => cmd_apply(config, args),
        Command::Check(args) => cmd_check(config, args),
        Command::Tree(args) => cmd_tree(config, args),
    }
}

/// Tally over all documents of one `apply`.
#[derive(Debug, Default)]
struct Tally {
    clean: usize,
    failed: usize,
    connection_lost: bool,
}

fn cmd_apply(mut config: CliConfig, args: ApplyArgs) -> anyhow::Result<Outcome> {
    config.apply_overrides(&args);
    let snapshot = config.snapshot_path(None)?;
    let store = match InMemoryStore::open(&snapshot) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("{} cannot open store {}: {err}", "✗".red().bold(), snapshot.display());
            return Ok(Outcome::StoreUnavailable);
        }
    };

    let (tally, store) = match config.store.call_timeout() {
        Some(deadline) => {
            let store = DeadlineStore::new(store, deadline);
            tracing::debug!(deadline_ms = store.deadline().as_millis() as u64, "store calls carry a deadline");
            let tally = apply_all(&store, &args.documents, &config.reconcile);
            (tally, store.into_inner())
        }
        None => (apply_all(&store, &args.documents, &config.reconcile), store),
    };

    store
        .save(&snapshot)
        .with_context(|| format!("saving store snapshot {}", snapshot.display()))?;

    println!(
        "\n{} documents: {} clean, {} with failures",
        (tally.clean + tally.failed).to_string().bold(),
        tally.clean.to_string().green(),
        tally.failed.to_string().red()
    );
    Ok(if tally.connection_lost {
        Outcome::StoreUnavailable
    } else if tally.failed > 0 {
        Outcome::Failures
    } else {
        Outcome::Clean
    })
}

fn apply_all<S: StoreClient>(store: &S, documents: &[PathBuf], config: &ReconcileConfig) -> Tally {
    let mut tally = Tally::default();
    for (index, path) in documents.iter().enumerate() {
        match reconcile_path(store, path, config) {
            Ok(report) => {
                print_report(&report);
                if report.is_clean() {
                    tally.clean += 1;
                } else {
                    tally.failed += 1;
                }
            }
            Err(err) => {
                tally.failed += 1;
                println!("{} {} aborted: {}", "✗".red().bold(), path.display().to_string().bold(), err);
                if matches!(err, ReconcileError::ConnectionLost) {
                    tally.connection_lost = true;
                    let skipped = documents.len() - index - 1;
                    if skipped > 0 {
                        tracing::error!(skipped, "connection lost; remaining documents not processed");
                    }
                    break;
                }
            }
        }
    }
    tally
}

fn print_report(report: &RunReport) {
    let mark = if report.is_clean() { "✓".green().bold() } else { "!".yellow().bold() };
    println!(
        "{} {}{}",
        mark,
        report.document.display().to_string().bold(),
        change_note(report).dimmed()
    );
    if let Some(root) = report.root {
        println!("  Root: {}", format!("#{root}").cyan());
    }
    println!(
        "  Nodes: {} created, {} matched, {} renamed, {} deleted, {} ignored",
        report.created.to_string().green(),
        report.matched,
        report.renamed.to_string().yellow(),
        report.deleted.to_string().red(),
        report.ignored.to_string().dimmed()
    );
    println!(
        "  Attributes: {} written, {} skipped",
        report.attributes_written.to_string().green(),
        report.attributes_skipped
    );
    for failure in &report.failures {
        println!("  {} {}: {}", "✗".red(), failure.path.yellow(), failure.error);
    }
}

fn change_note(report: &RunReport) -> &'static str {
    if report.has_changes() {
        ""
    } else {
        " (no changes)"
    }
}

fn cmd_check(config: CliConfig, args: CheckArgs) -> anyhow::Result<Outcome> {
    let mut options: LoadOptions = config.reconcile.load_options();
    if args.allow_duplicate_ids {
        options.duplicates = structa_document::DuplicatePolicy::LastWriteWins;
    }

    let mut failed = 0;
    for path in &args.documents {
        match Document::load(path, options) {
            Ok(doc) => println!(
                "{} {} ({} nodes under {})",
                "✓".green().bold(),
                path.display().to_string().bold(),
                doc.root.len() - 1,
                doc.root.segment().cyan()
            ),
            Err(err) => {
                failed += 1;
                println!("{} {}: {}", "✗".red().bold(), path.display().to_string().bold(), err);
            }
        }
    }
    Ok(if failed > 0 { Outcome::Failures } else { Outcome::Clean })
}

fn cmd_tree(config: CliConfig, args: TreeArgs) -> anyhow::Result<Outcome> {
    let snapshot = config.snapshot_path(args.store.as_ref())?;
    let store = match InMemoryStore::open(&snapshot) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("{} cannot open store {}: {err}", "✗".red().bold(), snapshot.display());
            return Ok(Outcome::StoreUnavailable);
        }
    };

    let tops = match args.root {
        Some(raw) => {
            let id = NodeId::new(raw)?;
            match store.get_node(id)? {
                Some(node) => vec![node],
                None => {
                    println!("{} no node {}", "✗".red().bold(), id);
                    return Ok(Outcome::Failures);
                }
            }
        }
        None => store.roots(),
    };
    if tops.is_empty() {
        println!("Store {} is empty.", snapshot.display());
    }
    for node in &tops {
        print_tree(&store, node, 0)?;
    }
    Ok(Outcome::Clean)
}

fn print_tree(store: &InMemoryStore, node: &LiveNode, depth: usize) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    println!(
        "{}{} {} {}",
        indent,
        node.name.bold(),
        format!("[{}]", node.type_name).cyan(),
        format!("#{}", node.id).dimmed()
    );
    if let Some(node_type) = store.get_type(&node.type_name)? {
        for spec in &node_type.attributes {
            let value = store
                .get_attribute(node.id, &spec.name)?
                .and_then(|a| a.value().map(|v| v.summary()));
            match value {
                Some(v) => println!("{}  {} = {}", indent, spec.name.yellow(), v),
                None => println!("{}  {} = {}", indent, spec.name.yellow(), "(unset)".dimmed()),
            }
        }
    }
    for child in store.get_node_children(node.id)? {
        print_tree(store, &child, depth + 1)?;
    }
    Ok(())
}
