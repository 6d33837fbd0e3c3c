//! Site-wide robots.txt check.
//!
//! Only a blanket `Disallow: /` is honoured. User-agent groups, path rules
//! and crawl delays are ignored.

use crate::acquisition::Fetcher;
use tracing::{debug, info};
use url::Url;

/// Whether the robots document disallows the entire site.
pub fn disallows_everything(txt: &str) -> bool {
    txt.lines().any(|line| {
        let line = line.split('#').next().unwrap_or("").trim();
        line.split_once(':').is_some_and(|(key, value)| {
            key.trim().eq_ignore_ascii_case("disallow") && value.trim() == "/"
        })
    })
}

/// Fetch `/robots.txt` for `base_url`'s site and check it.
///
/// Fails open: an unreachable or unreadable robots file allows crawling.
pub async fn is_allowed(fetcher: &Fetcher, base_url: &Url) -> bool {
    let Ok(robots_url) = base_url.join("/robots.txt") else {
        return true;
    };

    match fetcher.fetch(robots_url.as_str()).await {
        Ok(page) if disallows_everything(&page.markup) => {
            info!("{robots_url} disallows the whole site");
            false
        }
        Ok(_) => true,
        Err(e) => {
            debug!("no usable robots.txt ({e}), assuming allowed");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchPolicy;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_blanket_disallow() {
        assert!(disallows_everything("User-agent: *\nDisallow: /\n"));
        assert!(disallows_everything("user-agent: *\r\ndisallow:/   \r\n"));
        assert!(disallows_everything("User-agent: *\nDisallow: / # everything\n"));
    }

    #[test]
    fn test_partial_rules_allow() {
        assert!(!disallows_everything("User-agent: *\nDisallow: /admin\n"));
        assert!(!disallows_everything("User-agent: *\nDisallow:\n"));
        assert!(!disallows_everything("# Disallow: /\nAllow: /"));
        assert!(!disallows_everything(""));
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(&FetchPolicy {
            timeout_secs: 2,
            retries: 0,
            retry_pause_ms: 0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_is_allowed_reads_site_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
            .expect(1)
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/deep/page", server.uri())).unwrap();
        assert!(!is_allowed(&fetcher(), &base).await);
    }

    #[tokio::test]
    async fn test_missing_robots_fails_open() {
        let server = MockServer::start().await;
        let base = Url::parse(&server.uri()).unwrap();
        assert!(is_allowed(&fetcher(), &base).await);
    }
}
