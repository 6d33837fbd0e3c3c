//! Retry-governed HTTP GET with a browser-like header set.

use crate::config::FetchPolicy;
use crate::error::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Desktop Chrome user agent; many sites turn away obvious bots.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 10;

/// A successfully fetched document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after following redirects.
    pub final_url: String,
    pub markup: String,
}

/// Why one attempt failed; turned into a `FetchError` once retries run out.
enum AttemptFailure {
    Status(u16),
    Timeout,
    Transport(reqwest::Error),
}

impl AttemptFailure {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AttemptFailure::Timeout
        } else {
            AttemptFailure::Transport(e)
        }
    }

    fn into_error(self, url: &str, attempts: u32) -> FetchError {
        let url = url.to_string();
        match self {
            AttemptFailure::Status(status) => FetchError::Status {
                url,
                status,
                attempts,
            },
            AttemptFailure::Timeout => FetchError::Timeout { url, attempts },
            AttemptFailure::Transport(source) => FetchError::Transport {
                url,
                attempts,
                source,
            },
        }
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers
}

/// HTTP fetcher. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    retry_pause: Duration,
}

impl Fetcher {
    pub fn new(policy: &FetchPolicy) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(policy.timeout())
            .build()
            .map_err(|source| FetchError::Client { source })?;

        Ok(Self {
            client,
            max_attempts: policy.max_attempts(),
            retry_pause: policy.retry_pause(),
        })
    }

    /// GET `url`, retrying transient failures.
    ///
    /// A 403 fails at once. Other error statuses, timeouts and transport
    /// errors are retried up to the policy's budget with a fixed pause in
    /// between. The error only tells the caller to skip this page.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let attempts = self.max_attempts;
        let mut attempt = 1;

        loop {
            let failure = match self.client.get(url).send().await {
                Ok(response) if response.status() == StatusCode::FORBIDDEN => {
                    warn!("GET {url} failed: 403 Forbidden, the site may be blocking automated requests");
                    return Err(FetchError::Blocked {
                        url: url.to_string(),
                    });
                }
                Ok(response) if response.status().as_u16() >= 400 => {
                    AttemptFailure::Status(response.status().as_u16())
                }
                Ok(response) => {
                    let final_url = response.url().to_string();
                    match response.text().await {
                        Ok(markup) => {
                            debug!("fetched {} bytes from {url}", markup.len());
                            return Ok(FetchedPage { final_url, markup });
                        }
                        Err(e) => AttemptFailure::from_reqwest(e),
                    }
                }
                Err(e) => AttemptFailure::from_reqwest(e),
            };

            if attempt >= attempts {
                let error = failure.into_error(url, attempts);
                warn!("GET {error}");
                return Err(error);
            }

            debug!(
                "GET {url} failed, retrying (attempt {}/{attempts})",
                attempt + 1
            );
            attempt += 1;
            tokio::time::sleep(self.retry_pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_policy() -> FetchPolicy {
        FetchPolicy {
            timeout_secs: 1,
            retries: 2,
            retry_pause_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_fetch_success_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header_exists("sec-fetch-mode"))
            .and(header_exists("accept-language"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hello</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&quick_policy()).unwrap();
        let page = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(page.markup, "<p>hello</p>");
        assert!(page.final_url.ends_with("/page"));
    }

    #[tokio::test]
    async fn test_forbidden_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&quick_policy()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/blocked", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Blocked { .. }));
        assert!(!err.is_retryable());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_server_errors_retried_until_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&quick_policy()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/flaky", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status {
                status: 503,
                attempts: 3,
                ..
            }
        ));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recover"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/recover"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&quick_policy()).unwrap();
        let page = fetcher
            .fetch(&format!("{}/recover", server.uri()))
            .await
            .unwrap();
        assert_eq!(page.markup, "ok");
    }

    #[tokio::test]
    async fn test_timeouts_exhaust_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(1500)),
            )
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&quick_policy()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/slow", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { attempts: 3, .. }));
        assert!(err.is_retryable());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_zero_retries_means_one_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let policy = FetchPolicy {
            retries: 0,
            ..quick_policy()
        };
        let fetcher = Fetcher::new(&policy).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, attempts: 1, .. }));
    }
}
