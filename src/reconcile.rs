//! Reconciliation between the scanned corpus and the processed-state
//! ledger, and the command flows built on it.
//!
//! Export, process, and sync all rescan the workspace first so they
//! operate on current annotations. Sync only marks a batch processed
//! after the remote sink acknowledged it; a failed delivery leaves the
//! ledger exactly as it was, and the next run retries the same batch.

use std::path::Path;

use crate::catalog::PatternCatalog;
use crate::config::Config;
use crate::error::{CodemarksError, Result};
use crate::index::CorpusIndex;
use crate::models::{ExportBookmark, ExportPayload};
use crate::progress::NoProgress;
use crate::remote::RemoteSink;
use crate::state::ProcessingStateStore;
use crate::workspace::{self, CancelFlag, ScanOutcome};

/// The unprocessed slice of the corpus: the payload to deliver plus the
/// ids to mark once delivery succeeds.
pub struct UnprocessedBatch {
    pub payload: ExportPayload,
    pub ids: Vec<String>,
}

/// Collect every indexed annotation whose id is not processed, in index
/// order.
pub fn select_unprocessed(
    project: &str,
    scheme: &str,
    index: &CorpusIndex,
    store: &ProcessingStateStore,
) -> UnprocessedBatch {
    let mut bookmarks = Vec::new();
    let mut ids = Vec::new();
    for (file_key, category, annotation) in index.iter() {
        if store.is_processed(&annotation.id) {
            continue;
        }
        bookmarks.push(ExportBookmark {
            text: annotation.text.clone(),
            deeplink: annotation.deeplink(scheme, file_key),
            kind: category.to_string(),
        });
        ids.push(annotation.id.clone());
    }
    UnprocessedBatch {
        payload: ExportPayload {
            project: project.to_string(),
            bookmarks,
        },
        ids,
    }
}

/// Rescan the workspace and open the ledger. Enumeration failure is an
/// error here: commands built on a rescan have nothing to operate on.
pub async fn scan_workspace(config: &Config) -> Result<(CorpusIndex, ProcessingStateStore)> {
    let catalog = PatternCatalog::build(&config.markers);
    let store = ProcessingStateStore::open(&config.state_file())?;
    let mut index = CorpusIndex::load_snapshot(&config.snapshot_file());

    let report =
        workspace::run_scan(config, &catalog, &mut index, &CancelFlag::new(), &NoProgress).await?;
    if let ScanOutcome::Failed(msg) = report.outcome {
        return Err(CodemarksError::Enumeration(msg));
    }
    index.save_snapshot(&config.snapshot_file())?;

    Ok((index, store))
}

/// Write the unprocessed batch as JSON, to a file or stdout. Never
/// mutates the ledger.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let project = config.resolve_project_name()?;
    let (index, store) = scan_workspace(config).await?;
    let batch = select_unprocessed(&project, &config.deeplink.scheme, &index, &store);
    let json = serde_json::to_string_pretty(&batch.payload)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!(
                "Exported {} unprocessed annotations to {}",
                batch.ids.len(),
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}

/// Mark every currently indexed annotation processed.
pub async fn run_process(config: &Config) -> Result<()> {
    let (index, mut store) = scan_workspace(config).await?;
    let ids: Vec<String> = index.iter().map(|(_, _, a)| a.id.clone()).collect();
    store.mark_all_processed(ids.iter().map(|s| s.as_str()))?;
    println!(
        "Processed {} annotations across {} files.",
        ids.len(),
        index.file_count()
    );
    Ok(())
}

/// Deliver the unprocessed batch to the remote sink, then mark it
/// processed. Configuration is checked before any scan or network I/O.
pub async fn run_sync(config: &Config, sink: &dyn RemoteSink) -> Result<()> {
    config.validate_sync()?;
    let project = config.resolve_project_name()?;
    let (index, mut store) = scan_workspace(config).await?;
    let batch = select_unprocessed(&project, &config.deeplink.scheme, &index, &store);

    if batch.ids.is_empty() {
        println!("No unprocessed annotations found.");
        return Ok(());
    }

    sink.deliver(&batch.payload).await?;
    store.mark_all_processed(batch.ids.iter().map(|s| s.as_str()))?;
    println!("Synced {} annotations to the remote sink.", batch.ids.len());
    Ok(())
}

/// Print the indexed annotations from the last scan snapshot. Read-only:
/// neither the snapshot nor the ledger is created or modified.
pub fn run_list(config: &Config, unprocessed_only: bool) -> Result<()> {
    let index = CorpusIndex::load_snapshot(&config.snapshot_file());
    let store = ProcessingStateStore::open_read_only(&config.state_file());

    if index.is_empty() {
        println!("No annotations indexed. Run `cmk scan` first.");
        return Ok(());
    }

    let mut shown = 0usize;
    let mut current_file: Option<&str> = None;
    for (file_key, category, annotation) in index.iter() {
        let processed = store.is_processed(&annotation.id);
        if unprocessed_only && processed {
            continue;
        }
        if current_file != Some(file_key) {
            println!("{}", file_key);
            current_file = Some(file_key);
        }
        let marker = if processed { "[x]" } else { "[ ]" };
        let short_id = &annotation.id[..annotation.id.len().min(8)];
        println!(
            "  {} {}  {}:{}  {}",
            marker,
            short_id,
            category,
            annotation.range.start_line + 1,
            annotation.text
        );
        shown += 1;
    }

    if shown == 0 {
        println!("No unprocessed annotations.");
    }
    Ok(())
}

/// Toggle an annotation's processed flag by id or unique id prefix.
pub fn run_toggle(config: &Config, id_prefix: &str) -> Result<()> {
    let index = CorpusIndex::load_snapshot(&config.snapshot_file());
    let mut matches: Vec<String> = index
        .iter()
        .map(|(_, _, a)| a.id.clone())
        .filter(|id| id.starts_with(id_prefix))
        .collect();
    matches.sort();
    matches.dedup();

    let id = match matches.len() {
        0 => {
            return Err(CodemarksError::Configuration(format!(
                "no indexed annotation matches id '{}'; run `cmk scan` then `cmk list` to see ids",
                id_prefix
            )))
        }
        1 => matches.remove(0),
        n => {
            return Err(CodemarksError::Configuration(format!(
                "id '{}' is ambiguous ({} matches); use more characters",
                id_prefix, n
            )))
        }
    };

    let mut store = ProcessingStateStore::open(&config.state_file())?;
    let processed = store.toggle_processed(&id)?;
    println!(
        "{} -> {}",
        id,
        if processed { "processed" } else { "unprocessed" }
    );
    Ok(())
}

/// Delete the index snapshot. The processed-state ledger is untouched.
pub fn run_reset(config: &Config) -> Result<()> {
    match std::fs::remove_file(config.snapshot_file()) {
        Ok(()) => {
            println!("Index snapshot cleared.");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("Index snapshot already empty.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
