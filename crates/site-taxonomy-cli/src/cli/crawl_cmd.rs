//! `site-taxonomy crawl <url>` and `site-taxonomy scrape <url>`.

use crate::cli::output;
use anyhow::{bail, Context, Result};
use clap::Args;
use site_taxonomy::{
    CategorySource, CrawlConfig, Crawler, OntologyStore, PageRecord, StopSignal,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Where the ontology comes from and how hard to insist on it.
#[derive(Args, Debug, Clone)]
pub struct OntologyArgs {
    /// RDF/XML ontology document used as the primary classifier
    #[arg(long, env = "SITE_TAXONOMY_ONTOLOGY")]
    pub ontology: Option<PathBuf>,

    /// Abort if the ontology cannot be loaded instead of falling back to
    /// keyword and model classification
    #[arg(long)]
    pub require_ontology: bool,
}

impl OntologyArgs {
    pub fn load(&self) -> Result<Option<Arc<OntologyStore>>> {
        let Some(path) = &self.ontology else {
            if self.require_ontology {
                bail!("--require-ontology given but no --ontology document");
            }
            warn!("no ontology given, classifying with keywords and model only");
            return Ok(None);
        };

        match OntologyStore::from_path(path) {
            Ok(store) => Ok(Some(Arc::new(store))),
            Err(e) if self.require_ontology => {
                Err(e).with_context(|| format!("loading ontology {}", path.display()))
            }
            Err(e) => {
                warn!("ontology unavailable ({e}), classifying with keywords and model only");
                Ok(None)
            }
        }
    }
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Start URL; its host bounds the crawl
    pub url: Option<String>,

    /// JSON file with crawl settings; flags override it
    #[arg(long, env = "SITE_TAXONOMY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stop after this many pages (1-1000)
    #[arg(long, env = "SITE_TAXONOMY_MAX_PAGES")]
    pub max_pages: Option<usize>,

    /// Politeness delay between page visits, in milliseconds (0-5000)
    #[arg(long, env = "SITE_TAXONOMY_DELAY_MS")]
    pub delay_ms: Option<u64>,

    /// Only scrape the start URL
    #[arg(long)]
    pub single_page: bool,

    /// Pages fetched in parallel (1-8)
    #[arg(long, env = "SITE_TAXONOMY_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Give up after this many seconds, keeping the pages gathered so far
    #[arg(long, env = "SITE_TAXONOMY_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,

    /// Retries per page after the first attempt
    #[arg(long, env = "SITE_TAXONOMY_RETRIES")]
    pub retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, env = "SITE_TAXONOMY_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    #[command(flatten)]
    pub ontology: OntologyArgs,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CrawlArgs {
    /// Settings from `--config` (or defaults) with explicit flags applied.
    pub fn to_config(&self) -> Result<CrawlConfig> {
        let mut config = match &self.config {
            Some(path) => CrawlConfig::from_json_file(path)?,
            None => CrawlConfig::default(),
        };

        if let Some(url) = &self.url {
            config.start_url = url.clone();
        }
        if config.start_url.is_empty() {
            bail!("no start URL: pass one or set start_url in --config");
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.delay_ms = delay_ms;
        }
        if self.single_page {
            config.single_page = true;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.deadline_secs.is_some() {
            config.deadline_secs = self.deadline_secs;
        }
        if let Some(retries) = self.retries {
            config.fetch.retries = retries;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.fetch.timeout_secs = timeout_secs;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Page to scrape
    pub url: String,

    #[command(flatten)]
    pub ontology: OntologyArgs,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run_crawl(args: CrawlArgs) -> Result<()> {
    let config = args.to_config()?;
    let ontology = args.ontology.load()?;
    let crawler = Crawler::from_config(&config, ontology).context("building HTTP client")?;

    let (handle, signal) = StopSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing with the pages gathered so far");
            handle.stop();
        }
    });

    let records = crawler.crawl_until(&config, signal).await?;
    info!("{}", summarize(&records));
    output::write_json(&records, args.output.as_deref())
}

pub async fn run_scrape(args: ScrapeArgs) -> Result<()> {
    let config = CrawlConfig::new(args.url.clone());
    config.validate()?;
    let ontology = args.ontology.load()?;
    let crawler = Crawler::from_config(&config, ontology).context("building HTTP client")?;

    let Some(record) = crawler.scrape_page(&args.url).await else {
        bail!("could not fetch {}", args.url);
    };
    output::write_json(&record, args.output.as_deref())
}

fn summarize(records: &[PageRecord]) -> String {
    let count = |source: CategorySource| {
        records
            .iter()
            .filter(|r| r.category_source == source)
            .count()
    };
    format!(
        "{} pages classified: {} by ontology, {} by keywords, {} by model, {} uncategorized",
        records.len(),
        count(CategorySource::Ontology),
        count(CategorySource::Predefined),
        count(CategorySource::Auto),
        count(CategorySource::None),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(url: Option<&str>) -> CrawlArgs {
        CrawlArgs {
            url: url.map(str::to_string),
            config: None,
            max_pages: None,
            delay_ms: None,
            single_page: false,
            concurrency: None,
            deadline_secs: None,
            retries: None,
            timeout_secs: None,
            ontology: OntologyArgs {
                ontology: None,
                require_ontology: false,
            },
            output: None,
        }
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"start_url": "https://from-file.org", "max_pages": 50, "delay_ms": 100}}"#
        )
        .unwrap();

        let mut args = args(None);
        args.config = Some(file.path().to_path_buf());
        args.max_pages = Some(10);
        args.retries = Some(0);

        let config = args.to_config().unwrap();
        assert_eq!(config.start_url, "https://from-file.org");
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.delay_ms, 100);
        assert_eq!(config.fetch.retries, 0);
    }

    #[test]
    fn test_requires_start_url() {
        assert!(args(None).to_config().is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut args = args(Some("https://example.org"));
        args.delay_ms = Some(9_000);
        assert!(args.to_config().is_err());
    }

    #[test]
    fn test_ontology_optional_unless_required() {
        let mut ontology = OntologyArgs {
            ontology: Some(PathBuf::from("/nonexistent/ontology.owl")),
            require_ontology: false,
        };
        assert!(ontology.load().unwrap().is_none());

        ontology.require_ontology = true;
        assert!(ontology.load().is_err());
    }

    #[test]
    fn test_summary_counts_sources() {
        assert_eq!(
            summarize(&[]),
            "0 pages classified: 0 by ontology, 0 by keywords, 0 by model, 0 uncategorized"
        );
    }
}
