//! The per-page output of a crawl.

use crate::classify::Classification;
use crate::extraction::ExtractedPage;
use crate::ontology::ClassificationResult;
use serde::{Deserialize, Serialize};

/// Longest `clean_text` kept in a record, in characters.
pub const CLEAN_TEXT_LIMIT: usize = 15_000;
/// Longest markup snapshot kept in a record, in characters.
pub const MARKUP_LIMIT: usize = 200_000;

/// Which cascade stage produced a record's primary category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorySource {
    Ontology,
    Predefined,
    /// The external model.
    Auto,
    None,
}

/// One successfully fetched and classified page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub category: String,
    pub confidence: f32,
    pub category_source: CategorySource,
    pub category_reason: String,
    pub ontology: ClassificationResult,
    pub list_blocks: Vec<String>,
    pub list_items: Vec<String>,
    pub clean_text: String,
    pub full_markup: String,
}

impl PageRecord {
    pub fn new(url: impl Into<String>, page: ExtractedPage, classification: Classification) -> Self {
        Self {
            url: url.into(),
            title: page.title,
            meta_description: page.meta_description,
            category: classification.category,
            confidence: classification.confidence,
            category_source: classification.source,
            category_reason: classification.reason,
            ontology: classification.ontology,
            list_blocks: page.list_blocks,
            list_items: page.list_items,
            clean_text: truncate_chars(page.clean_text, CLEAN_TEXT_LIMIT),
            full_markup: truncate_chars(page.full_markup, MARKUP_LIMIT),
        }
    }
}

fn truncate_chars(mut s: String, limit: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(limit) {
        s.truncate(idx);
    }
    s
}
