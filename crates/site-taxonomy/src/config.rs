//! Crawl controls, fetch policy and external model settings.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Upper bound accepted for `max_pages`.
pub const MAX_PAGES_LIMIT: usize = 1000;
/// Upper bound accepted for `delay_ms`.
pub const MAX_DELAY_MS: u64 = 5000;
/// Upper bound accepted for `concurrency`.
pub const MAX_CONCURRENCY: usize = 8;

/// Caller-facing controls for one crawl invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrawlConfig {
    /// Where the crawl begins. Its host bounds the crawl.
    pub start_url: String,
    /// Stop once this many records have been produced.
    pub max_pages: usize,
    /// Politeness delay between successive page visits.
    pub delay_ms: u64,
    /// Scrape only `start_url`, without following links.
    pub single_page: bool,
    /// Number of pages processed in parallel.
    pub concurrency: usize,
    /// Abort the crawl after this many seconds, keeping what was gathered.
    pub deadline_secs: Option<u64>,
    pub fetch: FetchPolicy,
    pub model: ModelConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_url: String::new(),
            max_pages: 100,
            delay_ms: 800,
            single_page: false,
            concurrency: 1,
            deadline_secs: None,
            fetch: FetchPolicy::default(),
            model: ModelConfig::default(),
        }
    }
}

impl CrawlConfig {
    /// Controls for crawling `start_url` with every other knob at its default.
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            ..Self::default()
        }
    }

    /// Load controls from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject out-of-range controls and return the parsed start URL.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let start = parse_start_url(&self.start_url)?;

        if self.max_pages == 0 || self.max_pages > MAX_PAGES_LIMIT {
            return Err(ConfigError::MaxPagesOutOfRange {
                value: self.max_pages,
                max: MAX_PAGES_LIMIT,
            });
        }
        if self.delay_ms > MAX_DELAY_MS {
            return Err(ConfigError::DelayOutOfRange {
                value_ms: self.delay_ms,
                max_ms: MAX_DELAY_MS,
            });
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::ConcurrencyOutOfRange {
                value: self.concurrency,
                max: MAX_CONCURRENCY,
            });
        }

        Ok(start)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

fn parse_start_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidStartUrl {
        url: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

/// Retry and timeout policy for page fetches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchPolicy {
    pub timeout_secs: u64,
    /// Retries beyond the first attempt.
    pub retries: u32,
    pub retry_pause_ms: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: 12,
            retries: 2,
            retry_pause_ms: 1000,
        }
    }
}

impl FetchPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }

    /// Total requests issued for a URL that keeps failing.
    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }
}

/// Settings for the external classification model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Chat-completions endpoint.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key. No key, no model.
    pub api_key_env: String,
    /// Bound on one model call, independent of the fetch timeout.
    pub timeout_secs: u64,
    /// Characters of page text sent in the prompt.
    pub prompt_chars: usize,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 20,
            prompt_chars: 4000,
            max_tokens: 300,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured API key, if the environment provides a non-blank one.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = CrawlConfig::new("https://example.com/start");
        let url = config.validate().unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(config.fetch.max_attempts(), 3);
        assert_eq!(config.delay(), Duration::from_millis(800));
    }

    #[test]
    fn test_rejects_out_of_range_controls() {
        let mut config = CrawlConfig::new("https://example.com");
        config.max_pages = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MaxPagesOutOfRange { value: 0, .. })
        ));

        config.max_pages = 1001;
        assert!(config.validate().is_err());

        config.max_pages = 10;
        config.delay_ms = 5001;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DelayOutOfRange { .. })
        ));

        config.delay_ms = 0;
        config.concurrency = 9;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConcurrencyOutOfRange { .. })
        ));
    }

    #[test]
    fn test_rejects_relative_or_non_http_start() {
        for raw in ["example.com", "/about", "ftp://example.com", ""] {
            let config = CrawlConfig::new(raw);
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidStartUrl { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"start_url": "https://example.org", "max_pages": 5, "fetch": {{"retries": 0}}}}"#
        )
        .unwrap();

        let config = CrawlConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.start_url, "https://example.org");
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.delay_ms, 800);
        assert_eq!(config.fetch.retries, 0);
        assert_eq!(config.fetch.timeout_secs, 12);
        assert_eq!(config.model.model, "gpt-4o-mini");
    }

    #[test]
    fn test_from_json_file_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(
            CrawlConfig::from_json_file(file.path()),
            Err(ConfigError::Json { .. })
        ));
    }
}
