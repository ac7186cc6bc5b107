//! Single-document marker scanner.
//!
//! Runs one category's patterns over one document and produces annotations
//! in pattern order, then match order within each pattern. Never sorted by
//! position: downstream fixtures depend on this ordering.

use crate::catalog::CategoryPatterns;
use crate::identity;
use crate::models::{Annotation, Range};

/// Byte offset -> (line, character) lookup, built once per document so
/// positions are not re-derived per match.
pub struct PositionIndex {
    line_starts: Vec<usize>,
    line_ends: Vec<usize>,
    len: usize,
}

impl PositionIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        let mut line_ends = Vec::new();
        for (i, b) in bytes.iter().enumerate() {
            if *b == b'\n' {
                // Content ends before the line terminator, CRLF included.
                let content_end = if i > 0 && bytes[i - 1] == b'\r' { i - 1 } else { i };
                line_ends.push(content_end);
                line_starts.push(i + 1);
            }
        }
        line_ends.push(bytes.len());
        Self {
            line_starts,
            line_ends,
            len: bytes.len(),
        }
    }

    /// Zero-based (line, byte column) of a byte offset, or `None` when the
    /// offset is out of range.
    pub fn position(&self, offset: usize) -> Option<(usize, usize)> {
        if offset > self.len {
            return None;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Some((line, offset - self.line_starts[line]))
    }

    /// Byte offsets of a line's start and content end (before any line
    /// terminator), or `None` for a line that does not exist.
    pub fn line_span(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line)?;
        let end = *self.line_ends.get(line)?;
        Some((start, end))
    }
}

/// Scan one document for a single category.
///
/// Each match's range starts at the match and is extended to the end of its
/// containing line; the annotation text is that whole line's content,
/// trimmed. A match whose position cannot be resolved, or that lands on an
/// empty line, is skipped individually; the rest of the category still
/// scans.
pub fn scan_document(text: &str, category: &CategoryPatterns, file_key: &str) -> Vec<Annotation> {
    let positions = PositionIndex::new(text);
    let mut annotations = Vec::new();

    for pattern in &category.patterns {
        for m in pattern.find_iter(text) {
            let Some((start_line, start_char)) = positions.position(m.start()) else {
                continue;
            };
            let Some((line_start, content_end)) = positions.line_span(start_line) else {
                continue;
            };
            if content_end == line_start {
                // Match on an empty line has no trailing context.
                continue;
            }

            let fragment = &text[line_start..content_end];
            let annotation_text = fragment.trim().to_string();
            let id = identity::annotation_id(file_key, &category.name, start_line, &annotation_text);

            annotations.push(Annotation {
                id,
                text: annotation_text,
                range: Range {
                    start_line,
                    start_char,
                    end_line: start_line,
                    end_char: content_end - line_start,
                },
                category: category.name.clone(),
            });
        }
    }

    annotations
}
