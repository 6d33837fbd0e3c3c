//! Site Taxonomy: crawl a website and classify every page against a
//! controlled ontology, falling back to a keyword taxonomy and an external
//! model when the ontology is not confident.
//!
//! ```no_run
//! use site_taxonomy::{CrawlConfig, Crawler, OntologyStore};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let ontology = OntologyStore::from_path(Path::new("ontology.owl"))?;
//! let config = CrawlConfig::new("https://example.org");
//! let crawler = Crawler::from_config(&config, Some(Arc::new(ontology)))?;
//! let records = crawler.crawl_site(&config).await?;
//! println!("{} pages", records.len());
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod cartography;
pub mod classify;
pub mod config;
pub mod error;
pub mod extraction;
pub mod ontology;
pub mod record;

pub use acquisition::{FetchedPage, Fetcher};
pub use cartography::{Crawler, StopHandle, StopSignal};
pub use classify::{Cascade, CategoryModel, Classification, ModelVerdict, OpenAiModel};
pub use config::{CrawlConfig, FetchPolicy, ModelConfig};
pub use error::{ConfigError, FetchError, ModelError, ParseError};
pub use extraction::ExtractedPage;
pub use ontology::{Category, ClassificationResult, EntityMatch, OntologyEntity, OntologyStore};
pub use record::{CategorySource, PageRecord};
