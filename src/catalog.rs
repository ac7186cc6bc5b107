//! Marker pattern catalog: which categories scan, with which patterns,
//! against which files.
//!
//! Built once per scan from `[markers]` configuration. Two ignore rules
//! apply:
//! - a file is skipped when its path ends with any entry of
//!   `ignored_extensions` (case-sensitive suffix match);
//! - a category is skipped when its pattern list is empty, or when its
//!   **first** pattern starts with any entry of `ignored_words`. Only the
//!   first pattern is consulted. This rule is inherited behavior and is
//!   kept exactly as-is; widening it to all patterns would change which
//!   categories scan.

use regex::Regex;

use crate::config::MarkersConfig;

/// One eligible category with its compiled patterns, in config order.
pub struct CategoryPatterns {
    pub name: String,
    pub patterns: Vec<Regex>,
}

/// Immutable scan-time view of the marker configuration.
pub struct PatternCatalog {
    categories: Vec<CategoryPatterns>,
    ignored_words: Vec<String>,
    ignored_extensions: Vec<String>,
}

impl PatternCatalog {
    /// Normalize the configured lists, drop ineligible categories, and
    /// compile the remaining patterns. Invalid patterns are logged and
    /// skipped; their category still scans with its valid siblings.
    pub fn build(markers: &MarkersConfig) -> Self {
        let ignored_words = normalize_list(&markers.ignored_words);
        let ignored_extensions = normalize_list(&markers.ignored_extensions);

        let mut categories = Vec::new();
        for (name, raw_patterns) in &markers.categories {
            let patterns = normalize_list(raw_patterns);
            if !category_eligible(&patterns, &ignored_words) {
                log::debug!("category {} is not eligible, skipping", name);
                continue;
            }
            categories.push(CategoryPatterns {
                name: name.clone(),
                patterns: compile_patterns(name, &patterns),
            });
        }

        Self {
            categories,
            ignored_words,
            ignored_extensions,
        }
    }

    /// Categories that will scan, in configuration (name) order.
    pub fn categories(&self) -> &[CategoryPatterns] {
        &self.categories
    }

    /// False iff the path ends with a configured ignored extension.
    pub fn is_file_eligible(&self, path: &str) -> bool {
        !self
            .ignored_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
    }

    /// False if `patterns` is empty or its first entry starts with an
    /// ignored word prefix.
    pub fn is_category_eligible(&self, patterns: &[String]) -> bool {
        category_eligible(patterns, &self.ignored_words)
    }
}

fn category_eligible(patterns: &[String], ignored_words: &[String]) -> bool {
    match patterns.first() {
        None => false,
        Some(first) => !ignored_words.iter().any(|word| first.starts_with(word.as_str())),
    }
}

fn compile_patterns(category: &str, patterns: &[String]) -> Vec<Regex> {
    let mut compiled = Vec::new();
    for pattern in patterns {
        match Regex::new(pattern) {
            Ok(re) => compiled.push(re),
            Err(e) => log::warn!(
                "ignoring invalid pattern {:?} in category {}: {}",
                pattern,
                category,
                e
            ),
        }
    }
    compiled
}

/// Trim entries, drop empties, and dedupe keeping first occurrence.
fn normalize_list(raw: &[String]) -> Vec<String> {
    let mut list: Vec<String> = Vec::new();
    for entry in raw {
        let trimmed = entry.trim();
        if trimmed.is_empty() || list.iter().any(|seen| seen == trimmed) {
            continue;
        }
        list.push(trimmed.to_string());
    }
    list
}
