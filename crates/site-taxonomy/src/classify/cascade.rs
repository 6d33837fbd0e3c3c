//! Ordered fallback between the ontology, the keyword taxonomy and the
//! external model.

use super::keywords::KeywordTaxonomy;
use super::model::{CategoryModel, ModelVerdict, OpenAiModel};
use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::extraction::ExtractedPage;
use crate::ontology::{ClassificationResult, OntologyStore};
use crate::record::CategorySource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Primary category when no stage produced anything.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// The keyword taxonomy only runs while the best confidence is below this.
const PREDEFINED_GATE: f32 = 0.3;
/// The external model only runs while the best confidence is below this.
const MODEL_GATE: f32 = 0.5;

/// Cascade stages, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Ontology,
    Predefined,
    Model,
}

impl Stage {
    const ORDER: [Stage; 3] = [Stage::Ontology, Stage::Predefined, Stage::Model];

    /// Confidence at or above which this stage is skipped.
    fn gate(self) -> Option<f32> {
        match self {
            Stage::Ontology => None,
            Stage::Predefined => Some(PREDEFINED_GATE),
            Stage::Model => Some(MODEL_GATE),
        }
    }

    fn source(self) -> CategorySource {
        match self {
            Stage::Ontology => CategorySource::Ontology,
            Stage::Predefined => CategorySource::Predefined,
            Stage::Model => CategorySource::Auto,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    category: String,
    confidence: f32,
    source: CategorySource,
    reason: String,
}

/// Final outcome of the cascade for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: String,
    pub confidence: f32,
    pub source: CategorySource,
    /// The model's justification; empty unless `source` is `Auto`.
    pub reason: String,
    /// Ontology detail, attached whichever stage won.
    pub ontology: ClassificationResult,
}

/// The classifier cascade. Shared read-only across crawl workers.
#[derive(Clone)]
pub struct Cascade {
    ontology: Option<Arc<OntologyStore>>,
    keywords: KeywordTaxonomy,
    model: Option<Arc<dyn CategoryModel>>,
    model_timeout: Duration,
}

impl Cascade {
    /// A cascade without an external model.
    pub fn new(ontology: Option<Arc<OntologyStore>>) -> Self {
        Self {
            ontology,
            keywords: KeywordTaxonomy::new(),
            model: None,
            model_timeout: ModelConfig::default().timeout(),
        }
    }

    /// A cascade whose last stage is the configured OpenAI model, when an
    /// API key is available.
    pub fn from_config(ontology: Option<Arc<OntologyStore>>, config: &ModelConfig) -> Self {
        let cascade = Self::new(ontology);
        match OpenAiModel::from_config(config) {
            Ok(model) => cascade.with_model(Arc::new(model), config.timeout()),
            Err(ModelError::MissingCredentials) => {
                debug!(
                    "{} not set, external classification disabled",
                    config.api_key_env
                );
                cascade
            }
            Err(e) => {
                warn!("external classification disabled: {e}");
                cascade
            }
        }
    }

    /// Use `model` as the last stage, bounding each call by `timeout`.
    pub fn with_model(mut self, model: Arc<dyn CategoryModel>, timeout: Duration) -> Self {
        self.model = Some(model);
        self.model_timeout = timeout;
        self
    }

    pub fn ontology(&self) -> Option<&OntologyStore> {
        self.ontology.as_deref()
    }

    /// Run the stages in order, keeping the most confident candidate.
    pub async fn classify(&self, page: &ExtractedPage) -> Classification {
        let ontology = self
            .ontology
            .as_ref()
            .map(|store| store.classify(&page.clean_text, &page.title, &page.meta_description))
            .unwrap_or_default();

        let mut best: Option<Candidate> = None;
        for stage in Stage::ORDER {
            let current = best.as_ref().map(|c| c.confidence);
            if let (Some(gate), Some(confidence)) = (stage.gate(), current) {
                if confidence >= gate {
                    debug!("skipping {stage:?} stage, confidence {confidence:.2} >= {gate}");
                    continue;
                }
            }

            let Some(candidate) = self.run_stage(stage, page, &ontology).await else {
                continue;
            };
            if current.map_or(true, |c| candidate.confidence > c) {
                debug!(
                    "{stage:?} stage picked {:?} ({:.2})",
                    candidate.category, candidate.confidence
                );
                best = Some(candidate);
            }
        }

        match best {
            Some(c) => Classification {
                category: c.category,
                confidence: c.confidence,
                source: c.source,
                reason: c.reason,
                ontology,
            },
            None => Classification {
                category: UNCATEGORIZED.to_string(),
                confidence: 0.0,
                source: CategorySource::None,
                reason: String::new(),
                ontology,
            },
        }
    }

    async fn run_stage(
        &self,
        stage: Stage,
        page: &ExtractedPage,
        ontology: &ClassificationResult,
    ) -> Option<Candidate> {
        let (category, confidence, reason) = match stage {
            Stage::Ontology => {
                let primary = ontology.primary()?;
                (primary.label.clone(), primary.confidence, String::new())
            }
            Stage::Predefined => {
                let text = format!(
                    "{} {} {}",
                    page.clean_text, page.title, page.meta_description
                );
                let (name, confidence) = self.keywords.classify(&text)?;
                (name.to_string(), confidence, String::new())
            }
            Stage::Model => {
                let verdict = self.ask_model(&page.clean_text).await?;
                (verdict.category, verdict.confidence, verdict.reason)
            }
        };

        Some(Candidate {
            category,
            confidence,
            source: stage.source(),
            reason,
        })
    }

    /// Any model failure is logged and treated as no answer.
    async fn ask_model(&self, text: &str) -> Option<ModelVerdict> {
        let model = self.model.as_ref()?;
        let names = self.keywords.names();
        match tokio::time::timeout(self.model_timeout, model.categorize(text, &names)).await {
            Ok(Ok(verdict)) if !verdict.category.trim().is_empty() => Some(verdict),
            Ok(Ok(_)) => {
                debug!("model returned no category");
                None
            }
            Ok(Err(e)) => {
                warn!("external classification failed: {e}");
                None
            }
            Err(_) => {
                warn!("{}", ModelError::Timeout(self.model_timeout));
                None
            }
        }
    }
}
