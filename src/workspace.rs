//! Workspace scan orchestration.
//!
//! A scan enumerates candidate files, then for each eligible file clears
//! its index entries and rescans it. Files that are ineligible or fail to
//! read are left untouched, so their previous entries survive. A scan can
//! be cancelled between files; everything scanned so far is kept.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::catalog::PatternCatalog;
use crate::config::Config;
use crate::error::{CodemarksError, Result};
use crate::files;
use crate::index::CorpusIndex;
use crate::progress::{ScanProgressEvent, ScanProgressReporter};
use crate::scanner;

/// Terminal state of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// Summary of one scan run.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub files_total: usize,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub annotations_found: usize,
}

impl ScanReport {
    fn empty(outcome: ScanOutcome) -> Self {
        Self {
            outcome,
            files_total: 0,
            files_scanned: 0,
            files_skipped: 0,
            annotations_found: 0,
        }
    }
}

/// Cooperative cancellation flag, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scan one document into the index. Returns the number of annotations
/// found. An ineligible file leaves the index untouched; an eligible one
/// has its entries cleared before the rescan.
pub fn scan_file(
    catalog: &PatternCatalog,
    index: &mut CorpusIndex,
    file_key: &str,
    text: &str,
) -> usize {
    if !catalog.is_file_eligible(file_key) {
        return 0;
    }
    index.clear_file(file_key);

    let mut found = 0;
    for category in catalog.categories() {
        let annotations = scanner::scan_document(text, category, file_key);
        if annotations.is_empty() {
            continue;
        }
        found += annotations.len();
        index.replace(file_key, &category.name, annotations);
    }
    found
}

/// Run a full scan over the configured search root, updating `index` in
/// place. Enumeration failure is reported as `ScanOutcome::Failed` rather
/// than an error so callers can keep the existing index.
pub async fn run_scan(
    config: &Config,
    catalog: &PatternCatalog,
    index: &mut CorpusIndex,
    cancel: &CancelFlag,
    progress: &dyn ScanProgressReporter,
) -> Result<ScanReport> {
    // Never scan our own state directory.
    let mut exclude_globs = config.search.exclude_globs.clone();
    exclude_globs.push(format!("{}/**", config.state.dir.display()));

    let paths = match files::enumerate(
        &config.project.root,
        &config.search.include_globs,
        &exclude_globs,
        config.search.max_files,
    ) {
        Ok(paths) => paths,
        Err(CodemarksError::Enumeration(msg)) => {
            log::error!("file enumeration failed: {msg}");
            return Ok(ScanReport::empty(ScanOutcome::Failed(msg)));
        }
        Err(e) => return Err(e),
    };

    let mut report = ScanReport::empty(ScanOutcome::Completed);
    report.files_total = paths.len();
    progress.report(ScanProgressEvent::Started {
        files_total: paths.len() as u64,
    });

    for path in &paths {
        if cancel.is_cancelled() {
            log::info!(
                "scan cancelled after {} of {} files",
                report.files_scanned + report.files_skipped,
                report.files_total
            );
            report.outcome = ScanOutcome::Cancelled;
            return Ok(report);
        }

        let file_key = path.display().to_string();
        match files::read_document(path).await {
            Ok(text) => {
                report.annotations_found += scan_file(catalog, index, &file_key, &text);
                report.files_scanned += 1;
            }
            Err(source) => {
                let err = CodemarksError::FileRead {
                    path: file_key,
                    source,
                };
                log::warn!("{err}");
                report.files_skipped += 1;
            }
        }

        progress.report(ScanProgressEvent::FileScanned {
            n: (report.files_scanned + report.files_skipped) as u64,
            total: report.files_total as u64,
            annotations: report.annotations_found as u64,
        });
    }

    Ok(report)
}

/// The `cmk scan` entry point: load the previous snapshot, scan with
/// Ctrl-C cancellation, and write the snapshot back. A cancelled scan
/// still persists its partial results; a failed one leaves the previous
/// snapshot alone.
pub async fn run_scan_command(
    config: &Config,
    progress: &dyn ScanProgressReporter,
) -> Result<ScanReport> {
    let catalog = PatternCatalog::build(&config.markers);
    let mut index = CorpusIndex::load_snapshot(&config.snapshot_file());

    let cancel = CancelFlag::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    let report = run_scan(config, &catalog, &mut index, &cancel, progress).await?;
    if !matches!(report.outcome, ScanOutcome::Failed(_)) {
        index.save_snapshot(&config.snapshot_file())?;
    }
    Ok(report)
}
