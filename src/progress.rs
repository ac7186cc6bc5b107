//! Scan progress reporting.
//!
//! Reports observable progress during `cmk scan` so users see how many
//! files are left and how many annotations have been found. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a scan.
#[derive(Clone, Debug)]
pub enum ScanProgressEvent {
    /// Enumeration finished; the scan is starting over this many files.
    Started { files_total: u64 },
    /// n files completed out of total, with the running annotation count.
    FileScanned {
        n: u64,
        total: u64,
        annotations: u64,
    },
}

/// Reports scan progress. Implementations write to stderr (human or JSON).
pub trait ScanProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the scan loop.
    fn report(&self, event: ScanProgressEvent);
}

/// Human-friendly progress on stderr: "scan  1,234 / 5,000 files  87 annotations".
pub struct StderrProgress;

impl ScanProgressReporter for StderrProgress {
    fn report(&self, event: ScanProgressEvent) {
        let line = match &event {
            ScanProgressEvent::Started { files_total } => {
                format!("scan  starting  {} files\n", format_number(*files_total))
            }
            ScanProgressEvent::FileScanned {
                n,
                total,
                annotations,
            } => {
                let n_fmt = format_number(*n);
                let total_fmt = format_number(*total);
                format!(
                    "scan  {} / {} files  {} annotations\n",
                    n_fmt,
                    total_fmt,
                    format_number(*annotations)
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ScanProgressReporter for JsonProgress {
    fn report(&self, event: ScanProgressEvent) {
        let obj = match &event {
            ScanProgressEvent::Started { files_total } => serde_json::json!({
                "event": "progress",
                "phase": "started",
                "total": files_total
            }),
            ScanProgressEvent::FileScanned {
                n,
                total,
                annotations,
            } => serde_json::json!({
                "event": "progress",
                "phase": "scanning",
                "n": n,
                "total": total,
                "annotations": annotations
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ScanProgressReporter for NoProgress {
    fn report(&self, _event: ScanProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller can pass it to the scan.
    pub fn reporter(&self) -> Box<dyn ScanProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
