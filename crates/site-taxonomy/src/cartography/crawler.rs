//! Breadth-first site crawler.

use super::frontier::Frontier;
use super::rate_limiter::RateLimiter;
use super::robots;
use super::url::{internal_links, normalize_url};
use crate::acquisition::{FetchedPage, Fetcher};
use crate::classify::Cascade;
use crate::config::CrawlConfig;
use crate::error::{ConfigError, FetchError};
use crate::extraction::{extract, link_targets};
use crate::ontology::OntologyStore;
use crate::record::PageRecord;
use futures::future::join_all;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Trips a [`StopSignal`].
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<watch::Sender<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

/// Tells a running crawl to wind down: either a caller tripped it or its
/// deadline passed. Records gathered so far are still returned.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl StopSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// A signal plus the handle that fires it.
    pub fn channel() -> (StopHandle, StopSignal) {
        let (tx, rx) = watch::channel(false);
        (
            StopHandle(Arc::new(tx)),
            StopSignal {
                cancel: Some(rx),
                deadline: None,
            },
        )
    }

    /// Also fire once `after` has elapsed.
    pub fn with_deadline(mut self, after: Duration) -> Self {
        let at = Instant::now() + after;
        self.deadline = Some(self.deadline.map_or(at, |d| d.min(at)));
        self
    }

    pub fn is_stopped(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
            || self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the signal fires; pending forever if it never can.
    pub async fn stopped(&self) {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    if rx.wait_for(|stop| *stop).await.is_err() {
                        // handle dropped without firing
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = deadline => {}
            _ = cancelled => {}
        }
    }
}

/// What one worker should do next.
enum Claim {
    Visit(String),
    Wait,
    Done,
}

struct CrawlState {
    frontier: Frontier,
    records: Vec<PageRecord>,
    /// URLs claimed but not yet finished. Each holds a reservation against
    /// the page cap.
    in_flight: usize,
}

impl CrawlState {
    fn claim(&mut self, max_pages: usize) -> Claim {
        if self.records.len() >= max_pages {
            return Claim::Done;
        }
        if self.records.len() + self.in_flight >= max_pages {
            return Claim::Wait;
        }
        match self.frontier.claim_next() {
            Some(url) => {
                self.in_flight += 1;
                Claim::Visit(url)
            }
            None if self.in_flight == 0 => Claim::Done,
            None => Claim::Wait,
        }
    }
}

struct SharedCrawl {
    state: Mutex<CrawlState>,
    progress: Notify,
    limiter: RateLimiter,
    start: Url,
    max_pages: usize,
}

/// The outcome of visiting one URL.
struct Visit {
    record: Option<PageRecord>,
    links: Vec<String>,
}

/// Crawls a site breadth-first, classifying every page it fetches.
#[derive(Clone)]
pub struct Crawler {
    fetcher: Fetcher,
    cascade: Arc<Cascade>,
}

impl Crawler {
    pub fn new(fetcher: Fetcher, cascade: Arc<Cascade>) -> Self {
        Self { fetcher, cascade }
    }

    /// Build the fetcher and cascade described by `config`.
    pub fn from_config(
        config: &CrawlConfig,
        ontology: Option<Arc<OntologyStore>>,
    ) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(&config.fetch)?;
        let cascade = Cascade::from_config(ontology, &config.model);
        Ok(Self::new(fetcher, Arc::new(cascade)))
    }

    pub fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    /// Fetch, extract and classify a single page.
    ///
    /// robots.txt is consulted but only logged here; the page is scraped
    /// regardless.
    pub async fn scrape_page(&self, url: &str) -> Option<PageRecord> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("cannot scrape {url}: {e}");
                return None;
            }
        };
        if !robots::is_allowed(&self.fetcher, &parsed).await {
            warn!("robots.txt disallows {url}, scraping anyway");
        }

        let page = self.fetcher.fetch(url).await.ok()?;
        Some(self.build_record(url, &page).await)
    }

    /// Crawl the site at `config.start_url` to completion.
    pub async fn crawl_site(&self, config: &CrawlConfig) -> Result<Vec<PageRecord>, ConfigError> {
        self.crawl_until(config, StopSignal::never()).await
    }

    /// Crawl until the frontier is exhausted, the page cap is reached, or
    /// `stop` fires. Per-page failures only ever mean a missing record.
    pub async fn crawl_until(
        &self,
        config: &CrawlConfig,
        stop: StopSignal,
    ) -> Result<Vec<PageRecord>, ConfigError> {
        let start = config.validate()?;
        let stop = match config.deadline() {
            Some(after) => stop.with_deadline(after),
            None => stop,
        };

        if config.single_page {
            let url = normalize_url(start.as_str());
            info!("scraping single page {url}");
            let record = tokio::select! {
                record = self.scrape_page(&url) => record,
                _ = stop.stopped() => None,
            };
            return Ok(record.into_iter().collect());
        }

        let allowed = tokio::select! {
            allowed = robots::is_allowed(&self.fetcher, &start) => allowed,
            _ = stop.stopped() => return Ok(Vec::new()),
        };
        if !allowed {
            warn!("robots.txt disallows crawling {start}");
            return Ok(Vec::new());
        }

        info!(
            "crawling {start} (max {} pages, {} ms delay, {} worker(s))",
            config.max_pages, config.delay_ms, config.concurrency
        );

        let shared = SharedCrawl {
            state: Mutex::new(CrawlState {
                frontier: Frontier::new(start.as_str()),
                records: Vec::new(),
                in_flight: 0,
            }),
            progress: Notify::new(),
            limiter: RateLimiter::new(config.concurrency, config.delay()),
            start,
            max_pages: config.max_pages,
        };

        join_all((0..config.concurrency).map(|id| self.worker(id, &shared, &stop))).await;

        let state = shared.state.into_inner();
        if stop.is_stopped() {
            info!(
                "crawl stopped early with {} pages ({} queued)",
                state.records.len(),
                state.frontier.pending()
            );
        } else {
            info!(
                "crawl finished: {} pages from {} visited URLs",
                state.records.len(),
                state.frontier.visited_count()
            );
        }
        Ok(state.records)
    }

    async fn worker(&self, id: usize, shared: &SharedCrawl, stop: &StopSignal) {
        loop {
            if stop.is_stopped() {
                break;
            }

            // Register interest before inspecting the state so progress made
            // in between is not missed.
            let mut progress = pin!(shared.progress.notified());
            progress.as_mut().enable();

            let claim = shared.state.lock().await.claim(shared.max_pages);
            let url = match claim {
                Claim::Visit(url) => url,
                Claim::Done => break,
                Claim::Wait => {
                    tokio::select! {
                        _ = progress => continue,
                        _ = stop.stopped() => break,
                    }
                }
            };

            let visit = tokio::select! {
                visit = self.visit(&url, shared) => visit,
                _ = stop.stopped() => {
                    debug!("worker {id}: {}", FetchError::Cancelled { url: url.clone() });
                    Visit { record: None, links: Vec::new() }
                }
            };

            {
                let mut state = shared.state.lock().await;
                state.in_flight -= 1;
                for link in &visit.links {
                    state.frontier.push(link);
                }
                if let Some(record) = visit.record {
                    if state.records.len() < shared.max_pages {
                        state.records.push(record);
                    }
                }
            }
            shared.progress.notify_waiters();
        }
        debug!("worker {id} done");
    }

    /// Fetch, extract, classify and harvest links for one claimed URL.
    async fn visit(&self, url: &str, shared: &SharedCrawl) -> Visit {
        let Ok(_guard) = shared.limiter.acquire().await else {
            return Visit {
                record: None,
                links: Vec::new(),
            };
        };
        info!("visiting {url}");

        match self.fetcher.fetch(url).await {
            Ok(page) => {
                let links = page_links(&page, url, &shared.start);
                let record = self.build_record(url, &page).await;
                debug!(
                    "{url}: {} ({:.2}, {:?}), {} internal links",
                    record.category,
                    record.confidence,
                    record.category_source,
                    links.len()
                );
                Visit {
                    record: Some(record),
                    links,
                }
            }
            Err(e) if e.is_retryable() => {
                // The page is lost, but its links may still be reachable.
                let links = match self.fetcher.fetch(url).await {
                    Ok(page) => page_links(&page, url, &shared.start),
                    Err(_) => Vec::new(),
                };
                Visit {
                    record: None,
                    links,
                }
            }
            Err(_) => Visit {
                record: None,
                links: Vec::new(),
            },
        }
    }

    async fn build_record(&self, url: &str, page: &FetchedPage) -> PageRecord {
        let extracted = extract(&page.markup);
        let classification = self.cascade.classify(&extracted).await;
        PageRecord::new(url, extracted, classification)
    }
}

/// Same-site links of a fetched page, resolved against where it actually
/// came from.
fn page_links(page: &FetchedPage, requested: &str, start: &Url) -> Vec<String> {
    let Some(base) = Url::parse(&page.final_url)
        .ok()
        .or_else(|| Url::parse(requested).ok())
    else {
        return Vec::new();
    };
    internal_links(link_targets(&page.markup, &base), start)
}
