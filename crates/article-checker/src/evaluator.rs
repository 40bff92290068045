//! Author enrichment.
//!
//! Resolves each leading author of a paper through the cache first and the
//! metrics service second, then scores the paper by its highest h-index.
//! Consecutive service calls are spaced by a fixed delay; cache hits are never
//! delayed. A failed lookup leaves that author unresolved and moves on.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::cache::CacheManager;
use crate::error::ClientResult;
use crate::models::{Author, AuthorMetrics, Paper};

/// Source of author metrics.
#[async_trait::async_trait]
pub trait MetricsLookup: Send + Sync {
    /// Metrics for the best match of `name`; `None` when nothing matches.
    async fn lookup_author(&self, name: &str) -> ClientResult<Option<AuthorMetrics>>;
}

/// How one author was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Served from the cache.
    Cached(AuthorMetrics),
    /// Fetched and written to the cache.
    Fetched(AuthorMetrics),
    /// The service had no match. Nothing cached.
    NotFound,
    /// The lookup failed. Nothing cached.
    Failed,
    /// Blank name, not looked up.
    Skipped,
}

/// Per-paper evaluation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    /// Authors served from cache.
    pub cached: usize,
    /// Authors fetched.
    pub fetched: usize,
    /// Authors without a match.
    pub not_found: usize,
    /// Authors whose lookup failed.
    pub failed: usize,
}

impl EvaluationStats {
    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Cached(_) => self.cached += 1,
            Resolution::Fetched(_) => self.fetched += 1,
            Resolution::NotFound => self.not_found += 1,
            Resolution::Failed => self.failed += 1,
            Resolution::Skipped => {}
        }
    }

    /// Accumulate another paper's counters.
    pub fn merge(&mut self, other: Self) {
        self.cached += other.cached;
        self.fetched += other.fetched;
        self.not_found += other.not_found;
        self.failed += other.failed;
    }
}

/// Cache-or-fetch author evaluator.
pub struct AuthorEvaluator<L> {
    lookup: L,
    delay: Duration,
    last_fetch: Mutex<Option<Instant>>,
}

impl<L: MetricsLookup> AuthorEvaluator<L> {
    /// Evaluator spacing service calls by `delay`.
    #[must_use]
    pub fn new(lookup: L, delay: Duration) -> Self {
        Self { lookup, delay, last_fetch: Mutex::new(None) }
    }

    /// Resolve the first `max_authors` authors in order and score the paper.
    pub async fn evaluate_authors(
        &self,
        cache: &mut CacheManager,
        paper: &mut Paper,
        max_authors: usize,
    ) -> EvaluationStats {
        let mut stats = EvaluationStats::default();
        for author in paper.authors.iter_mut().take(max_authors) {
            let resolution = self.resolve_author(cache, author).await;
            stats.record(&resolution);
        }
        paper.compute_score();

        tracing::debug!(
            paper = %paper.id,
            max_h_index = paper.max_h_index,
            cached = stats.cached,
            fetched = stats.fetched,
            failed = stats.failed,
            "Evaluated authors"
        );
        stats
    }

    /// Fill in one author's metrics from the cache or the service.
    pub async fn resolve_author(&self, cache: &mut CacheManager, author: &mut Author) -> Resolution {
        let name = author.display_name().to_string();
        if name.is_empty() {
            return Resolution::Skipped;
        }

        if let Some(entry) = cache.get_author(&name) {
            let metrics = entry.metrics();
            author.metrics = metrics.clone();
            return Resolution::Cached(metrics);
        }

        match self.fetch(&name).await {
            Ok(Some(metrics)) => {
                cache.set_author(&name, &metrics);
                author.metrics = metrics.clone();
                Resolution::Fetched(metrics)
            }
            Ok(None) => {
                tracing::debug!(author = %name, "No metrics match");
                Resolution::NotFound
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::info!(author = %name, error = %e, retry_after = ?e.retry_after(), "Metrics lookup unavailable");
                } else {
                    tracing::warn!(author = %name, error = %e, "Metrics lookup failed");
                }
                Resolution::Failed
            }
        }
    }

    /// Whether any of the first `check_first_n` authors has an h-index of at
    /// least `min_h_index`. Stops at the first qualifying author. A cached
    /// entry is final for its author.
    pub async fn meets_threshold(
        &self,
        cache: &mut CacheManager,
        paper: &Paper,
        min_h_index: u32,
        check_first_n: usize,
    ) -> bool {
        for author in paper.authors.iter().take(check_first_n) {
            let mut probe = author.clone();
            let h_index = match self.resolve_author(cache, &mut probe).await {
                Resolution::Cached(m) | Resolution::Fetched(m) => m.h_index,
                Resolution::NotFound | Resolution::Failed | Resolution::Skipped => None,
            };
            if h_index.is_some_and(|h| h >= min_h_index) {
                return true;
            }
        }
        false
    }

    async fn fetch(&self, name: &str) -> ClientResult<Option<AuthorMetrics>> {
        let mut last = self.last_fetch.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        let result = self.lookup.lookup_author(name).await;
        *last = Some(Instant::now());
        result
    }
}

impl<L> std::fmt::Debug for AuthorEvaluator<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorEvaluator").field("delay", &self.delay).finish_non_exhaustive()
    }
}
