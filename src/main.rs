//! # Codemarks CLI (`cmk`)
//!
//! The `cmk` binary is the primary interface for Codemarks. It provides
//! commands for scanning a workspace for marker comments, listing and
//! triaging the indexed annotations, exporting unprocessed batches, and
//! delivering them to a remote sink.
//!
//! ## Usage
//!
//! ```bash
//! cmk --config ./codemarks.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cmk scan` | Scan the workspace and index marker annotations |
//! | `cmk list` | Show indexed annotations and their processed state |
//! | `cmk export` | Write the unprocessed batch as JSON |
//! | `cmk process` | Mark every indexed annotation processed |
//! | `cmk sync` | Deliver the unprocessed batch to the remote sink |
//! | `cmk toggle <id>` | Flip one annotation's processed flag |
//! | `cmk reset` | Delete the index snapshot |
//!
//! ## Examples
//!
//! ```bash
//! # Index marker comments under the configured root
//! cmk scan --config ./codemarks.toml
//!
//! # Show what is left to triage
//! cmk list --unprocessed --config ./codemarks.toml
//!
//! # Dump the unprocessed batch for another tool
//! cmk export --out marks.json --config ./codemarks.toml
//!
//! # Deliver the batch and mark it processed
//! cmk sync --config ./codemarks.toml
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use codemarks::config;
use codemarks::progress::ProgressMode;
use codemarks::reconcile;
use codemarks::remote::HttpSink;
use codemarks::workspace::{self, ScanOutcome};

/// Codemarks CLI — a marker-comment scanning and triage engine for
/// source trees.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See the README for a full example.
#[derive(Parser)]
#[command(
    name = "cmk",
    about = "Codemarks — a marker-comment scanning and triage engine for source trees",
    version,
    long_about = "Codemarks scans a workspace for configurable marker patterns (TODO, FIXME, \
    @audit, and anything else expressible as a regex), indexes each match as a content-addressed \
    annotation, and tracks which annotations have been processed in a durable on-disk ledger."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./codemarks.toml`. The project root, marker categories,
    /// search globs, and sync settings are read from this file.
    #[arg(long, global = true, default_value = "./codemarks.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Scan the workspace and index marker annotations.
    ///
    /// Enumerates files under the project root, applies the include and
    /// exclude globs, and rescans every eligible file. Files that fail to
    /// read are skipped with a warning and keep their previous entries.
    /// Ctrl-C cancels between files; partial results are kept.
    Scan {
        /// Progress output.
        #[arg(long, value_enum, default_value = "auto")]
        progress: ProgressArg,
    },

    /// Show indexed annotations from the last scan.
    ///
    /// Reads the index snapshot without rescanning. Each row shows the
    /// processed flag, a short id usable with `cmk toggle`, the category,
    /// and the one-based line number.
    List {
        /// Only show annotations that are not yet processed.
        #[arg(long)]
        unprocessed: bool,
    },

    /// Export the unprocessed batch as JSON.
    ///
    /// Rescans first, then writes every annotation whose id is not marked
    /// processed. Export never changes the processed-state ledger, so it
    /// can be run repeatedly.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Mark every indexed annotation processed.
    ///
    /// Rescans first, then records all current annotation ids as processed
    /// in one ledger write. Useful for adopting Codemarks in a tree full
    /// of pre-existing markers.
    Process,

    /// Deliver the unprocessed batch to the remote sink.
    ///
    /// Refuses to run until `sync.endpoint` and `sync.api_key` are
    /// configured. The batch is only marked processed after the remote
    /// acknowledged it, so a failed delivery is retried in full next run.
    Sync,

    /// Flip one annotation's processed flag.
    ///
    /// Accepts a full id or any unique prefix of one, as shown by
    /// `cmk list`.
    Toggle {
        /// Annotation id or unique id prefix.
        id: String,
    },

    /// Delete the index snapshot.
    ///
    /// The processed-state ledger is kept, so a later `cmk scan` restores
    /// annotations with their processed flags intact.
    Reset,
}

/// Progress output for `cmk scan`.
#[derive(Clone, Copy, ValueEnum)]
enum ProgressArg {
    /// Human progress when stderr is a TTY, otherwise off.
    Auto,
    /// No progress output.
    Off,
    /// Human-readable progress lines on stderr.
    Human,
    /// One JSON object per line on stderr.
    Json,
}

impl ProgressArg {
    fn mode(self) -> ProgressMode {
        match self {
            ProgressArg::Auto => ProgressMode::default_for_tty(),
            ProgressArg::Off => ProgressMode::Off,
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Scan { progress } => {
            let reporter = progress.mode().reporter();
            let report = workspace::run_scan_command(&cfg, reporter.as_ref()).await?;
            match report.outcome {
                ScanOutcome::Completed => {
                    if report.files_skipped > 0 {
                        println!(
                            "Scanned {} of {} files ({} skipped), found {} annotations.",
                            report.files_scanned,
                            report.files_total,
                            report.files_skipped,
                            report.annotations_found
                        );
                    } else {
                        println!(
                            "Scanned {} files, found {} annotations.",
                            report.files_scanned, report.annotations_found
                        );
                    }
                }
                ScanOutcome::Cancelled => {
                    println!(
                        "Scan cancelled after {} of {} files; partial index kept.",
                        report.files_scanned + report.files_skipped,
                        report.files_total
                    );
                }
                ScanOutcome::Failed(msg) => {
                    anyhow::bail!("scan failed: {}", msg);
                }
            }
        }
        Commands::List { unprocessed } => {
            reconcile::run_list(&cfg, unprocessed)?;
        }
        Commands::Export { out } => {
            reconcile::run_export(&cfg, out.as_deref()).await?;
        }
        Commands::Process => {
            reconcile::run_process(&cfg).await?;
        }
        Commands::Sync => {
            let sink = HttpSink::new(&cfg.sync)?;
            reconcile::run_sync(&cfg, &sink).await?;
        }
        Commands::Toggle { id } => {
            reconcile::run_toggle(&cfg, &id)?;
        }
        Commands::Reset => {
            reconcile::run_reset(&cfg)?;
        }
    }

    Ok(())
}
