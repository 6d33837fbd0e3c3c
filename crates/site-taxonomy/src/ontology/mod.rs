//! Ontology store: the controlled vocabulary plus its scoring lexicon.
//!
//! The store is built once and never mutated afterwards, so it can be shared
//! behind an `Arc` by any number of concurrent classifications.

pub mod loader;
pub mod scorer;
pub mod types;

use crate::error::ParseError;
use scorer::EntityTerms;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
pub use types::{Category, ClassificationResult, EntityMatch, OntologyEntity};

/// Ranked partitions keep entities scoring strictly above this.
const RANKED_THRESHOLD: f32 = 0.3;
/// Ranked partitions keep at most this many entities.
const RANKED_LIMIT: usize = 3;

#[derive(Debug, Clone)]
struct LexiconEntry {
    label: String,
    terms: EntityTerms,
}

/// One partition, keyed by id. Iteration is in ascending id order, which is
/// also the tie-break order when two entities score the same.
#[derive(Debug, Clone, Default)]
struct Partition {
    entries: BTreeMap<String, LexiconEntry>,
}

impl Partition {
    fn scored<'a>(&'a self, text: &'a str) -> impl Iterator<Item = EntityMatch> + 'a {
        self.entries.iter().filter_map(move |(id, entry)| {
            let confidence = entry.terms.score(text);
            (confidence > 0.0).then(|| EntityMatch {
                id: id.clone(),
                label: entry.label.clone(),
                confidence,
            })
        })
    }

    /// Highest scoring entity; earliest id wins ties.
    fn best(&self, text: &str) -> Option<EntityMatch> {
        self.scored(text).fold(None, |best: Option<EntityMatch>, candidate| match best {
            Some(b) if b.confidence >= candidate.confidence => Some(b),
            _ => Some(candidate),
        })
    }

    /// Up to three entities above the ranked threshold, best first.
    fn ranked(&self, text: &str) -> Vec<EntityMatch> {
        let mut matches: Vec<EntityMatch> = self
            .scored(text)
            .filter(|m| m.confidence > RANKED_THRESHOLD)
            .collect();
        // Stable sort keeps ascending id order among equal scores.
        matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        matches.truncate(RANKED_LIMIT);
        matches
    }
}

/// The loaded ontology, partitioned by category.
#[derive(Debug, Clone, Default)]
pub struct OntologyStore {
    partitions: BTreeMap<Category, Partition>,
}

impl OntologyStore {
    /// Load and index an ontology document from disk.
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let xml = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_xml(&xml)?;
        info!(
            "loaded ontology from {} ({} entities)",
            path.display(),
            store.len()
        );
        Ok(store)
    }

    /// Parse and index an ontology document.
    pub fn from_xml(xml: &str) -> Result<Self, ParseError> {
        Ok(Self::from_entities(loader::parse_entities(xml)?))
    }

    /// Index already-parsed entities. A repeated id keeps its last label.
    pub fn from_entities(entities: impl IntoIterator<Item = OntologyEntity>) -> Self {
        let mut partitions: BTreeMap<Category, Partition> = Category::ALL
            .into_iter()
            .map(|category| (category, Partition::default()))
            .collect();

        for entity in entities {
            let terms = EntityTerms::new(&entity.id, &entity.label);
            partitions.entry(entity.category).or_default().entries.insert(
                entity.id,
                LexiconEntry {
                    label: entity.label,
                    terms,
                },
            );
        }

        Self { partitions }
    }

    pub fn len(&self) -> usize {
        self.partitions.values().map(|p| p.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// id → label for one partition, in ascending id order.
    pub fn labels(&self, category: Category) -> BTreeMap<String, String> {
        self.partitions
            .get(&category)
            .map(|p| {
                p.entries
                    .iter()
                    .map(|(id, entry)| (id.clone(), entry.label.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every partition, keyed by its plural name (`document_types`, ...).
    pub fn categories(&self) -> BTreeMap<&'static str, BTreeMap<String, String>> {
        Category::ALL
            .into_iter()
            .map(|category| (category.plural_key(), self.labels(category)))
            .collect()
    }

    /// Entity counts per partition, keyed `<plural>_count`.
    pub fn statistics(&self) -> BTreeMap<String, usize> {
        Category::ALL
            .into_iter()
            .map(|category| {
                let count = self.partitions.get(&category).map_or(0, |p| p.entries.len());
                (format!("{}_count", category.plural_key()), count)
            })
            .collect()
    }

    /// Classify a page's text against every partition.
    pub fn classify(&self, text: &str, title: &str, meta_description: &str) -> ClassificationResult {
        let combined = format!("{title} {meta_description} {text}").to_lowercase();
        let best = |category: Category| self.partitions.get(&category).and_then(|p| p.best(&combined));
        let ranked = |category: Category| {
            self.partitions
                .get(&category)
                .map(|p| p.ranked(&combined))
                .unwrap_or_default()
        };

        ClassificationResult {
            document_type: best(Category::DocumentType),
            work_type: best(Category::WorkType),
            themes: ranked(Category::Theme),
            areas_of_reference: ranked(Category::AreaOfReference),
            geo_area: best(Category::GeoArea),
            salesian_family_group: best(Category::FamilyGroup),
        }
    }
}
