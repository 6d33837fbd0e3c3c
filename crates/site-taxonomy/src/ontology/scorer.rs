//! Keyword evidence scoring for ontology entities.

use regex::Regex;

/// Tokens this short or shorter carry no evidence.
const MIN_TOKEN_LEN: usize = 4;
const ID_TOKEN_WEIGHT: f32 = 0.5;
const LABEL_TOKEN_WEIGHT: f32 = 1.0;
/// Raw evidence that saturates the score at 1.0.
const SATURATION: f32 = 10.0;

/// Precompiled whole-word matchers for one entity's id and label tokens.
#[derive(Debug, Clone)]
pub struct EntityTerms {
    terms: Vec<(Regex, f32)>,
}

impl EntityTerms {
    pub fn new(entity_id: &str, entity_label: &str) -> Self {
        let id_tokens = entity_id
            .replace(['_', '-'], " ")
            .to_lowercase()
            .split_whitespace()
            .map(|token| (token.to_string(), ID_TOKEN_WEIGHT))
            .collect::<Vec<_>>();
        let label_tokens = entity_label
            .to_lowercase()
            .split_whitespace()
            .map(|token| (token.to_string(), LABEL_TOKEN_WEIGHT))
            .collect::<Vec<_>>();

        let terms = id_tokens
            .into_iter()
            .chain(label_tokens)
            .filter(|(token, _)| token.chars().count() >= MIN_TOKEN_LEN)
            .filter_map(|(token, weight)| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&token)))
                    .ok()
                    .map(|re| (re, weight))
            })
            .collect();

        Self { terms }
    }

    /// Normalised evidence in `[0.0, 1.0]`; `0.0` means no evidence.
    pub fn score(&self, text: &str) -> f32 {
        let raw: f32 = self
            .terms
            .iter()
            .map(|(re, weight)| re.find_iter(text).count() as f32 * weight)
            .sum();
        (raw / SATURATION).min(1.0)
    }
}

/// Score `text` against an entity without a prebuilt lexicon.
pub fn score(text: &str, entity_id: &str, entity_label: &str) -> f32 {
    EntityTerms::new(entity_id, entity_label).score(text)
}
