//! Pipeline tests with in-process sources, lookup and notifier.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeDelta, Utc};

use tempfile::TempDir;

use article_checker::config::Settings;
use article_checker::error::{ClientResult, FeedError};
use article_checker::models::{AuthorMetrics, CachedAuthor, Paper, Score, ScoreTier, SentPaperRecord};
use article_checker::sources::PaperSource;
use article_checker::store::{KeyedRecordStore, LocalFileStore, index_records};
use article_checker::{AuthorEvaluator, CacheManager, MetricsLookup, Notifier, Pipeline, RunOptions};

// =============================================================================
// Test Helpers
// =============================================================================

struct StubSource {
    name: String,
    papers: Option<Vec<Paper>>,
}

impl StubSource {
    fn boxed(name: &str, papers: Vec<Paper>) -> Box<dyn PaperSource> {
        Box::new(Self { name: name.to_string(), papers: Some(papers) })
    }

    fn broken(name: &str) -> Box<dyn PaperSource> {
        Box::new(Self { name: name.to_string(), papers: None })
    }
}

#[async_trait::async_trait]
impl PaperSource for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Paper>, FeedError> {
        self.papers.clone().ok_or(FeedError::Status(503))
    }
}

/// Every author has h-index 25.
#[derive(Clone, Default)]
struct FlatLookup {
    calls: Arc<Mutex<usize>>,
}

impl FlatLookup {
    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl MetricsLookup for FlatLookup {
    async fn lookup_author(&self, _name: &str) -> ClientResult<Option<AuthorMetrics>> {
        *self.calls.lock().unwrap() += 1;
        Ok(Some(AuthorMetrics { h_index: Some(25), ..AuthorMetrics::default() }))
    }
}

#[derive(Debug, Clone)]
struct Delivery {
    source: String,
    symbol: String,
    papers: Vec<Paper>,
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    delivered: Arc<Mutex<Vec<Delivery>>>,
    reject: HashSet<String>,
}

impl RecordingNotifier {
    fn rejecting(source: &str) -> Self {
        Self { reject: HashSet::from([source.to_string()]), ..Self::default() }
    }

    fn deliveries(&self) -> Vec<Delivery> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_batch(&self, source: &str, symbol: &str, papers: &[Paper]) -> bool {
        if self.reject.contains(source) {
            return false;
        }
        self.delivered.lock().unwrap().push(Delivery {
            source: source.to_string(),
            symbol: symbol.to_string(),
            papers: papers.to_vec(),
        });
        true
    }
}

const ARXIV: &str = "arXiv:quant-ph";
const JOURNAL: &str = "PRX Quantum";

fn preprint(id: &str, author: &str) -> Paper {
    let mut paper = Paper::new(
        format!("oai:arXiv.org:{id}"),
        format!("Preprint {id}"),
        format!("https://arxiv.org/abs/{id}"),
        ARXIV,
    )
    .with_authors([author]);
    paper.arxiv_id = Some(id.to_string());
    paper.source_symbol = "arxiv/quant-ph".into();
    paper
}

fn article(doi: &str) -> Paper {
    let mut paper = Paper::new(doi, format!("Article {doi}"), format!("https://doi.org/{doi}"), JOURNAL)
        .with_authors(["Journal Author"]);
    paper.doi = Some(doi.to_string());
    paper.source_symbol = "PRX-Q".into();
    paper
}

fn default_sources() -> Vec<Box<dyn PaperSource>> {
    vec![
        StubSource::boxed(ARXIV, vec![preprint("2501.00001", "Ann Smith"), preprint("2501.00002", "Bo Chen")]),
        StubSource::boxed(JOURNAL, vec![article("10.1103/prxq.1")]),
    ]
}

fn cache_in(dir: &TempDir) -> CacheManager {
    CacheManager::new(
        Box::new(LocalFileStore::<CachedAuthor>::new(dir.path().join("author_cache.json"))),
        Box::new(LocalFileStore::<SentPaperRecord>::new(dir.path().join("sent_papers.json"))),
        &Settings::default(),
    )
}

fn pipeline(
    settings: Settings,
    sources: Vec<Box<dyn PaperSource>>,
    lookup: &FlatLookup,
    notifier: &RecordingNotifier,
) -> Pipeline<FlatLookup> {
    Pipeline::new(settings, sources, AuthorEvaluator::new(lookup.clone(), Duration::ZERO))
        .with_notifier(Box::new(notifier.clone()))
}

fn ids(papers: &[Paper]) -> Vec<&str> {
    papers.iter().map(|p| p.id.as_str()).collect()
}

// =============================================================================
// Run
// =============================================================================

#[tokio::test]
async fn test_run_sends_one_batch_per_source_and_marks_sent() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let pipeline = pipeline(Settings::default(), default_sources(), &lookup, &notifier);

    let summary = pipeline.run(&mut cache, RunOptions::default()).await;
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.failed_batches, 0);
    assert_eq!(summary.evaluation.fetched, 2);
    assert!(summary.save.is_complete());

    let deliveries = notifier.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].source, ARXIV);
    assert_eq!(deliveries[0].symbol, "arxiv/quant-ph");
    assert_eq!(ids(&deliveries[0].papers), vec!["oai:arXiv.org:2501.00001", "oai:arXiv.org:2501.00002"]);
    assert!(deliveries[0].papers.iter().all(|p| p.score == Score::Authors(ScoreTier::Core)));
    assert_eq!(deliveries[1].symbol, "PRX-Q");
    assert_eq!(deliveries[1].papers[0].score, Score::Journal);

    // Journal authors are never looked up.
    assert_eq!(lookup.calls(), 2);
    assert!(cache.is_paper_sent("10.1103/prxq.1"));
    assert!(dir.path().join("sent_papers.json").exists());
}

#[tokio::test]
async fn test_second_run_sends_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let pipeline = pipeline(Settings::default(), default_sources(), &lookup, &notifier);

    pipeline.run(&mut cache, RunOptions::default()).await;
    let summary = pipeline.run(&mut cache, RunOptions::default()).await;

    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.candidates, 0);
    assert_eq!(summary.sent, 0);
    assert_eq!(notifier.deliveries().len(), 2);
}

#[tokio::test]
async fn test_rejected_batch_stays_unsent() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::rejecting(JOURNAL);
    let pipeline = pipeline(Settings::default(), default_sources(), &lookup, &notifier);

    let summary = pipeline.run(&mut cache, RunOptions::default()).await;
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.failed_batches, 1);
    assert!(cache.is_paper_sent("oai:arXiv.org:2501.00001"));
    assert!(!cache.is_paper_sent("10.1103/prxq.1"));

    let retry = pipeline.run(&mut cache, RunOptions::default()).await;
    assert_eq!(retry.candidates, 1);
}

#[tokio::test]
async fn test_dry_run_marks_nothing_but_keeps_author_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let pipeline = pipeline(Settings::default(), default_sources(), &lookup, &notifier);

    let summary = pipeline.run(&mut cache, RunOptions { dry_run: true, ..RunOptions::default() }).await;

    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.sent, 0);
    assert!(notifier.deliveries().is_empty());
    assert_eq!(cache.sent_count(), 0);
    assert_eq!(cache.author_count(), 2);
}

#[tokio::test]
async fn test_missing_notifier_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let pipeline =
        Pipeline::new(Settings::default(), default_sources(), AuthorEvaluator::new(FlatLookup::default(), Duration::ZERO));

    let summary = pipeline.run(&mut cache, RunOptions::default()).await;
    assert_eq!(summary.sent, 0);
    assert_eq!(cache.sent_count(), 0);
}

#[tokio::test]
async fn test_run_limit_truncates_in_feed_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let settings = Settings { max_papers_per_run: 2, ..Settings::default() };
    let pipeline = pipeline(settings, default_sources(), &lookup, &notifier);

    let summary = pipeline.run(&mut cache, RunOptions::default()).await;
    assert_eq!(summary.candidates, 2);
    assert_eq!(notifier.deliveries().len(), 1);
    assert!(!cache.is_paper_sent("10.1103/prxq.1"));

    let next = pipeline.run(&mut cache, RunOptions::default()).await;
    assert_eq!(next.candidates, 1);
    assert_eq!(notifier.deliveries()[1].source, JOURNAL);
}

#[tokio::test]
async fn test_broken_source_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let sources = vec![StubSource::broken(ARXIV), StubSource::boxed(JOURNAL, vec![article("10.1103/prxq.2")])];
    let pipeline = pipeline(Settings::default(), sources, &lookup, &notifier);

    let summary = pipeline.run(&mut cache, RunOptions::default()).await;
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.sent, 1);
}

#[tokio::test]
async fn test_ignoring_sent_cache_resends() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let pipeline = pipeline(Settings::default(), default_sources(), &lookup, &notifier);

    pipeline.run(&mut cache, RunOptions::default()).await;
    let summary = pipeline.run(&mut cache, RunOptions { ignore_sent_cache: true, ..RunOptions::default() }).await;

    assert_eq!(summary.sent, 3);
    assert_eq!(notifier.deliveries().len(), 4);
}

#[tokio::test]
async fn test_author_evaluation_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let settings = Settings { evaluate_authors: false, ..Settings::default() };
    let pipeline = pipeline(settings, default_sources(), &lookup, &notifier);

    pipeline.run(&mut cache, RunOptions::default()).await;

    assert_eq!(lookup.calls(), 0);
    assert_eq!(notifier.deliveries()[0].papers[0].score, Score::Unscored);
    assert_eq!(notifier.deliveries()[1].papers[0].score, Score::Journal);
}

// =============================================================================
// Seed and Diagnose
// =============================================================================

#[tokio::test]
async fn test_seed_marks_everything_without_sending() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let pipeline = pipeline(Settings::default(), default_sources(), &lookup, &notifier);

    let seeded = pipeline.seed(&mut cache).await;
    assert_eq!(seeded.fetched, 3);
    assert_eq!(seeded.seeded, 3);
    assert!(seeded.save.is_complete());
    assert!(notifier.deliveries().is_empty());
    assert_eq!(lookup.calls(), 0);

    assert_eq!(pipeline.seed(&mut cache).await.seeded, 0);
    assert_eq!(pipeline.run(&mut cache, RunOptions::default()).await.candidates, 0);
}

#[tokio::test]
async fn test_diagnose_reports_matches_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache_in(&dir);

    // Same title as a feed paper, stored under an older identifier.
    let mut renamed = preprint("2501.00002", "Bo Chen");
    renamed.id = "http://arxiv.org/abs/2501.00002v1".into();
    cache.mark_paper_sent(&renamed);
    cache.mark_paper_sent(&preprint("2501.00001", "Ann Smith"));

    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let settings = Settings { max_papers_per_run: 1, ..Settings::default() };
    let mut sources = default_sources();
    sources.push(StubSource::broken("Broken Journal"));
    let pipeline = pipeline(settings, sources, &lookup, &notifier);

    let diagnosis = pipeline.diagnose(&cache).await;

    assert_eq!(diagnosis.stored, 2);
    assert_eq!(diagnosis.sent_per_day.values().sum::<usize>(), 2);
    assert_eq!(diagnosis.fetched, 3);
    assert_eq!(diagnosis.would_skip, 1);
    assert_eq!(diagnosis.would_send, 2);
    assert!(diagnosis.exceeds_limit());
    assert_eq!(
        diagnosis.per_source,
        vec![(ARXIV.to_string(), Some(2)), (JOURNAL.to_string(), Some(1)), ("Broken Journal".to_string(), None)]
    );

    let renamed_match = &diagnosis.unmatched[0];
    assert_eq!(renamed_match.id, "oai:arXiv.org:2501.00002");
    assert_eq!(renamed_match.same_title_id.as_deref(), Some("http://arxiv.org/abs/2501.00002v1"));
    assert_eq!(diagnosis.unmatched[1].same_title_id, None);

    let report = diagnosis.to_string();
    assert!(report.contains("Would SEND (new):          2"));
    assert!(report.contains("Broken Journal: fetch failed"));

    assert_eq!(cache.sent_count(), 2);
    assert!(!dir.path().join("sent_papers.json").exists());
    assert_eq!(lookup.calls(), 0);
    assert!(notifier.deliveries().is_empty());
}

#[tokio::test]
async fn test_diagnose_reports_oldest_same_title_row() {
    let dir = tempfile::tempdir().unwrap();
    let title_twin = preprint("2501.00002", "Bo Chen");
    let now = Utc::now();
    let stored = [("z-newest", 1), ("m-oldest", 5), ("a-middle", 3)].map(|(id, days)| {
        let mut paper = title_twin.clone();
        paper.id = id.to_string();
        SentPaperRecord::from_paper(&paper, now - TimeDelta::days(days))
    });
    LocalFileStore::<SentPaperRecord>::new(dir.path().join("sent_papers.json"))
        .save(&index_records(stored))
        .await
        .unwrap();

    let mut cache = cache_in(&dir);
    cache.load().await;
    let lookup = FlatLookup::default();
    let notifier = RecordingNotifier::default();
    let pipeline = pipeline(Settings::default(), default_sources(), &lookup, &notifier);

    for _ in 0..5 {
        let diagnosis = pipeline.diagnose(&cache).await;
        let twin = diagnosis.unmatched.iter().find(|u| u.id == title_twin.id).unwrap();
        assert_eq!(twin.same_title_id.as_deref(), Some("m-oldest"));
    }
}
