//! Error taxonomy for the crawler and its collaborators.
//!
//! Per-page failures (`FetchError`) are contained inside the crawl loop and
//! only ever surface as a missing record. `ParseError` is the one fatal
//! condition: it stops an `OntologyStore` from being built at all.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to retrieve a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered 403. Never retried.
    #[error("{url} refused the request (403 Forbidden); the site may block automated clients")]
    Blocked { url: String },

    #[error("{url} returned HTTP {status} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("{url} timed out after {attempts} attempt(s)")]
    Timeout { url: String, attempts: u32 },

    #[error("request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetch of {url} was cancelled")]
    Cancelled { url: String },

    #[error("failed to build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Whether another request for the same URL could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Status { .. } | FetchError::Timeout { .. } | FetchError::Transport { .. }
        )
    }
}

/// The ontology document could not be read or is not well-formed XML.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read ontology document {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ontology document at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

/// Failure of the external classification model. Always swallowed by the
/// cascade; exposed so model implementations and tests can be precise.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no API key configured for the classification model")]
    MissingCredentials,

    #[error("classification model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("classification model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("classification model did not answer within {0:?}")]
    Timeout(Duration),

    #[error("classification model returned an empty reply")]
    EmptyReply,

    #[error("could not interpret model reply: {0}")]
    Unparseable(String),
}

/// Invalid caller-supplied crawl controls.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("start url {url:?} must be an absolute http(s) URL with a host")]
    InvalidStartUrl { url: String },

    #[error("max_pages must be between 1 and {max}, got {value}")]
    MaxPagesOutOfRange { value: usize, max: usize },

    #[error("delay must be between 0 and {max_ms} ms, got {value_ms} ms")]
    DelayOutOfRange { value_ms: u64, max_ms: u64 },

    #[error("concurrency must be between 1 and {max}, got {value}")]
    ConcurrencyOutOfRange { value: usize, max: usize },

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
