//! Core data types shared across the scanning and sync pipeline.

use serde::{Deserialize, Serialize};

/// Zero-based position span of one annotation within a document.
/// `start_char` and `end_char` are byte columns within their lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: usize,
    pub start_char: usize,
    pub end_line: usize,
    pub end_char: usize,
}

/// One matched marker occurrence.
///
/// `text` is the trimmed content of the line containing the match. `id` is
/// derived from (file key, category, start line, text), so rescans of
/// unchanged text at the same location always reproduce the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub text: String,
    pub range: Range,
    pub category: String,
}

impl Annotation {
    /// Navigation URI for this annotation: `<scheme>://file/<path>:<line>`
    /// with a 1-based line number.
    pub fn deeplink(&self, scheme: &str, file_key: &str) -> String {
        format!(
            "{}://file/{}:{}",
            scheme,
            file_key,
            self.range.start_line + 1
        )
    }
}

/// Payload sent to the remote sink and written by `cmk export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPayload {
    pub project: String,
    pub bookmarks: Vec<ExportBookmark>,
}

/// One unprocessed annotation inside an export payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBookmark {
    pub text: String,
    pub deeplink: String,
    #[serde(rename = "type")]
    pub kind: String,
}
