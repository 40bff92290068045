//! Author-metrics and sent-paper caches.
//!
//! Both caches live in memory as key → record maps for the whole run. They are
//! read from their backend once, pruned of expired rows, and written back
//! independently at the end.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::{Config, Settings, defaults};
use crate::error::StoreResult;
use crate::keys;
use crate::models::records::is_expired;
use crate::models::{AuthorMetrics, CachedAuthor, Paper, SentPaperRecord};
use crate::store::{
    GistStore, KeyedRecordStore, LocalFileStore, RecordMap, TabularRecord, ordered_records,
};

/// Boxed backend for one logical cache.
pub type BoxedStore<R> = Box<dyn KeyedRecordStore<R>>;

/// Entries purged by one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    /// Author rows removed.
    pub authors: usize,

    /// Sent-paper rows removed.
    pub sent_papers: usize,
}

impl CleanupStats {
    /// Total rows removed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.authors + self.sent_papers
    }
}

/// Outcome of writing both caches back.
#[derive(Debug)]
pub struct SaveReport {
    /// Author cache write.
    pub authors: StoreResult<()>,

    /// Sent-papers cache write.
    pub sent_papers: StoreResult<()>,
}

impl SaveReport {
    /// Both writes succeeded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.authors.is_ok() && self.sent_papers.is_ok()
    }
}

/// Owns both caches and their backends.
pub struct CacheManager {
    authors: RecordMap<CachedAuthor>,
    sent: RecordMap<SentPaperRecord>,
    author_store: BoxedStore<CachedAuthor>,
    sent_store: BoxedStore<SentPaperRecord>,
    author_ttl: TimeDelta,
    sent_ttl: TimeDelta,
}

impl CacheManager {
    /// Empty caches over the given backends with TTLs from `settings`.
    #[must_use]
    pub fn new(
        author_store: BoxedStore<CachedAuthor>,
        sent_store: BoxedStore<SentPaperRecord>,
        settings: &Settings,
    ) -> Self {
        Self {
            authors: RecordMap::new(),
            sent: RecordMap::new(),
            author_store,
            sent_store,
            author_ttl: TimeDelta::days(i64::from(settings.author_cache_expiry_days)),
            sent_ttl: TimeDelta::days(i64::from(settings.sent_papers_expiry_days)),
        }
    }

    /// Override both TTLs.
    #[must_use]
    pub fn with_expiry(mut self, author_ttl: TimeDelta, sent_ttl: TimeDelta) -> Self {
        self.author_ttl = author_ttl;
        self.sent_ttl = sent_ttl;
        self
    }

    /// Pick backends: the gist when credentials exist, local JSON files otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the gist HTTP client cannot be built.
    pub fn stores_for(
        config: &Config,
    ) -> StoreResult<(BoxedStore<CachedAuthor>, BoxedStore<SentPaperRecord>)> {
        if let Some(gist) = &config.gist {
            tracing::info!(gist_id = %gist.gist_id, "Using gist cache backend");
            let authors = GistStore::new(gist, format!("{}.csv", defaults::AUTHOR_CACHE_NAME))?;
            let sent = GistStore::new(gist, format!("{}.csv", defaults::SENT_PAPERS_NAME))?;
            return Ok((Box::new(authors), Box::new(sent)));
        }

        tracing::info!(dir = %config.cache_dir.display(), "Using local cache backend");
        let authors =
            LocalFileStore::new(config.cache_dir.join(format!("{}.json", defaults::AUTHOR_CACHE_NAME)));
        let sent =
            LocalFileStore::new(config.cache_dir.join(format!("{}.json", defaults::SENT_PAPERS_NAME)));
        Ok((Box::new(authors), Box::new(sent)))
    }

    /// Build from configuration and load both caches.
    ///
    /// # Errors
    ///
    /// Returns error if the gist HTTP client cannot be built. Unreachable or
    /// unreadable caches are not errors.
    pub async fn open(config: &Config) -> StoreResult<Self> {
        let (authors, sent) = Self::stores_for(config)?;
        let mut manager = Self::new(authors, sent, config.settings());
        manager.load().await;
        Ok(manager)
    }

    /// Load both caches, then drop expired rows.
    ///
    /// A backend that fails to load leaves its cache empty.
    pub async fn load(&mut self) -> CleanupStats {
        self.authors = load_or_empty(self.author_store.as_ref(), "author").await;
        self.sent = load_or_empty(self.sent_store.as_ref(), "sent papers").await;

        tracing::info!(
            authors = self.authors.len(),
            sent_papers = self.sent.len(),
            "Loaded caches"
        );
        self.cleanup_expired()
    }

    /// Drop rows older than their TTL.
    pub fn cleanup_expired(&mut self) -> CleanupStats {
        self.cleanup_expired_at(Utc::now())
    }

    /// [`cleanup_expired`](Self::cleanup_expired) against an explicit clock.
    pub fn cleanup_expired_at(&mut self, now: DateTime<Utc>) -> CleanupStats {
        let stats = CleanupStats {
            authors: purge(&mut self.authors, now, self.author_ttl),
            sent_papers: purge(&mut self.sent, now, self.sent_ttl),
        };
        if stats.total() > 0 {
            tracing::info!(
                authors = stats.authors,
                sent_papers = stats.sent_papers,
                "Purged expired cache entries"
            );
        }
        stats
    }

    /// Cached metrics for `name`, if present and still fresh.
    #[must_use]
    pub fn get_author(&self, name: &str) -> Option<&CachedAuthor> {
        self.authors
            .get(&keys::author_key(name))
            .filter(|entry| !is_expired(entry.cached_at, Utc::now(), self.author_ttl))
    }

    /// Store fresh metrics for `name`, replacing any previous entry.
    pub fn set_author(&mut self, name: &str, metrics: &AuthorMetrics) {
        let entry = CachedAuthor::new(name, metrics, Utc::now());
        self.authors.insert(entry.cache_key(), entry);
    }

    /// Whether a fresh sent record exists for `paper_id`.
    #[must_use]
    pub fn is_paper_sent(&self, paper_id: &str) -> bool {
        self.sent_record(paper_id).is_some()
    }

    /// Fresh sent record for `paper_id`.
    #[must_use]
    pub fn sent_record(&self, paper_id: &str) -> Option<&SentPaperRecord> {
        self.sent
            .get(&keys::paper_key(paper_id))
            .filter(|record| !is_expired(record.sent_at, Utc::now(), self.sent_ttl))
    }

    /// Record `paper` as sent now.
    pub fn mark_paper_sent(&mut self, paper: &Paper) {
        let record = SentPaperRecord::from_paper(paper, Utc::now());
        self.sent.insert(record.cache_key(), record);
    }

    /// Papers without a fresh sent record, in input order.
    #[must_use]
    pub fn get_unsent_papers(&self, papers: &[Paper]) -> Vec<Paper> {
        papers.iter().filter(|p| !self.is_paper_sent(&p.id)).cloned().collect()
    }

    /// All sent records currently held, oldest first.
    pub fn sent_records(&self) -> impl Iterator<Item = &SentPaperRecord> {
        ordered_records(&self.sent).into_iter()
    }

    /// Author entries held.
    #[must_use]
    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    /// Sent-paper entries held.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }

    /// Write both caches. One failing never stops the other.
    pub async fn save(&self) -> SaveReport {
        let report = SaveReport {
            authors: save_logged(self.author_store.as_ref(), &self.authors, "author").await,
            sent_papers: save_logged(self.sent_store.as_ref(), &self.sent, "sent papers").await,
        };
        if report.is_complete() {
            tracing::info!(
                authors = self.authors.len(),
                sent_papers = self.sent.len(),
                "Saved caches"
            );
        }
        report
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("authors", &self.authors.len())
            .field("sent_papers", &self.sent.len())
            .field("author_store", &self.author_store.describe())
            .field("sent_store", &self.sent_store.describe())
            .finish_non_exhaustive()
    }
}

async fn load_or_empty<R: TabularRecord>(
    store: &dyn KeyedRecordStore<R>,
    label: &str,
) -> RecordMap<R> {
    match store.load().await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(cache = label, store = %store.describe(), error = %e, "Cache load failed, starting empty");
            RecordMap::new()
        }
    }
}

async fn save_logged<R: TabularRecord>(
    store: &dyn KeyedRecordStore<R>,
    records: &RecordMap<R>,
    label: &str,
) -> StoreResult<()> {
    let result = store.save(records).await;
    if let Err(e) = &result {
        tracing::error!(cache = label, store = %store.describe(), error = %e, "Cache save failed");
    }
    result
}

fn purge<R: TabularRecord>(records: &mut RecordMap<R>, now: DateTime<Utc>, ttl: TimeDelta) -> usize {
    let before = records.len();
    records.retain(|_, r| !is_expired(r.timestamp(), now, ttl));
    before - records.len()
}
