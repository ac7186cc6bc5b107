//! Stable content-addressed annotation identity.
//!
//! An annotation's id is the SHA-256 of a canonical JSON object built from
//! its file key, category, start line, and trimmed text. Unchanged text at
//! the same location always hashes to the same id across scans and runs;
//! editing the line produces a new id and orphans the old one in the
//! processed-state ledger. That drift is intentional.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Canonical identity input. Field declaration order is the canonical JSON
/// key order; changing it changes every id ever issued.
#[derive(Serialize)]
struct IdentityInput<'a> {
    uri: &'a str,
    category: &'a str,
    line: usize,
    text: &'a str,
}

/// Compact canonical JSON for one annotation's identity inputs.
fn canonical_json(file_key: &str, category: &str, line: usize, text: &str) -> String {
    let input = IdentityInput {
        uri: file_key,
        category,
        line,
        text: text.trim(),
    };
    // A flat struct of strings and an integer cannot fail to serialize.
    serde_json::to_string(&input).expect("identity input serializes")
}

/// Derive the stable id for one annotation.
pub fn annotation_id(file_key: &str, category: &str, line: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(file_key, category, line, text).as_bytes());
    format!("{:x}", hasher.finalize())
}
