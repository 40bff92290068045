//! One invocation: fetch, deduplicate, enrich, notify, persist.
//!
//! Everything runs sequentially. Papers keep their fetch order from the feeds
//! through to the sent cache.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::cache::{CacheManager, SaveReport};
use crate::config::Settings;
use crate::evaluator::{AuthorEvaluator, EvaluationStats, MetricsLookup};
use crate::models::Paper;
use crate::notify::Notifier;
use crate::sources::{PaperSource, fetch_all};

/// Unmatched papers listed by a diagnosis.
const DIAGNOSE_SAMPLE: usize = 10;

/// Title prefix compared when looking for a stored duplicate.
const TITLE_PREFIX_CHARS: usize = 30;

/// Switches for [`Pipeline::run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Evaluate and log, but never notify or mark anything sent.
    pub dry_run: bool,

    /// Treat every fetched paper as new.
    pub ignore_sent_cache: bool,
}

/// Papers from one source, in fetch order.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    /// Source label.
    pub source: String,

    /// Short symbol for the subject line.
    pub symbol: String,

    /// Papers.
    pub papers: Vec<Paper>,
}

/// Outcome of a run.
#[derive(Debug)]
pub struct RunSummary {
    /// Papers returned by all sources.
    pub fetched: usize,

    /// Papers left after deduplication and the per-run limit.
    pub candidates: usize,

    /// Author resolution counters across all papers.
    pub evaluation: EvaluationStats,

    /// Papers delivered and marked sent.
    pub sent: usize,

    /// Batches whose delivery failed.
    pub failed_batches: usize,

    /// Cache write results.
    pub save: SaveReport,
}

/// Outcome of seeding the sent cache.
#[derive(Debug)]
pub struct SeedSummary {
    /// Papers returned by all sources.
    pub fetched: usize,

    /// Papers newly marked sent.
    pub seeded: usize,

    /// Cache write results.
    pub save: SaveReport,
}

/// A fetched paper with no sent record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedPaper {
    /// Natural identifier.
    pub id: String,

    /// DOI if known.
    pub doi: Option<String>,

    /// Title.
    pub title: String,

    /// Source label.
    pub source: String,

    /// Stored id of a sent record whose title matches, if any.
    pub same_title_id: Option<String>,
}

/// Read-only report on how the next run would behave.
#[derive(Debug, Clone, Default)]
pub struct Diagnosis {
    /// Sent records currently stored.
    pub stored: usize,

    /// Stored records per `sent_at` day.
    pub sent_per_day: BTreeMap<NaiveDate, usize>,

    /// Papers per source; `None` when the source failed.
    pub per_source: Vec<(String, Option<usize>)>,

    /// Papers fetched in total.
    pub fetched: usize,

    /// Papers that would be skipped.
    pub would_skip: usize,

    /// Papers that would be sent.
    pub would_send: usize,

    /// First unmatched papers.
    pub unmatched: Vec<UnmatchedPaper>,

    /// Configured per-run limit.
    pub max_papers_per_run: usize,
}

impl Diagnosis {
    /// More new papers than one run will send.
    #[must_use]
    pub const fn exceeds_limit(&self) -> bool {
        self.would_send > self.max_papers_per_run
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Sent cache: {} papers ===", self.stored)?;
        if let (Some(first), Some(last)) =
            (self.sent_per_day.keys().next(), self.sent_per_day.keys().next_back())
        {
            writeln!(f, "  Date range: {first} .. {last}")?;
            for (day, count) in &self.sent_per_day {
                writeln!(f, "    {day}: {count} papers")?;
            }
        }

        writeln!(f, "\n=== Sources ===")?;
        for (name, count) in &self.per_source {
            match count {
                Some(n) => writeln!(f, "  {name}: {n} papers (after keyword filter)")?,
                None => writeln!(f, "  {name}: fetch failed")?,
            }
        }
        writeln!(f, "  Total: {}", self.fetched)?;

        writeln!(f, "\n=== Matching ===")?;
        writeln!(f, "  Would SKIP (already sent): {}", self.would_skip)?;
        writeln!(f, "  Would SEND (new):          {}", self.would_send)?;

        if !self.unmatched.is_empty() {
            writeln!(f, "\n=== Unmatched papers (first {}) ===", self.unmatched.len())?;
            for paper in &self.unmatched {
                writeln!(f, "  id:     {}", paper.id)?;
                writeln!(f, "  doi:    {}", paper.doi.as_deref().unwrap_or("-"))?;
                writeln!(f, "  title:  {}", paper.title)?;
                writeln!(f, "  source: {}", paper.source)?;
                if let Some(stored) = &paper.same_title_id {
                    writeln!(f, "  !! Same title already sent under a different id: {stored}")?;
                }
                writeln!(f)?;
            }
        }

        writeln!(f, "\n=== Config ===")?;
        writeln!(f, "  max_papers_per_run: {}", self.max_papers_per_run)?;
        if self.exceeds_limit() {
            writeln!(
                f,
                "  !! {} new papers exceed the limit of {}; several runs are needed to send them all",
                self.would_send, self.max_papers_per_run
            )?;
        }
        Ok(())
    }
}

/// Group papers by source, keeping first-appearance order of sources and papers.
#[must_use]
pub fn group_by_source(papers: Vec<Paper>) -> Vec<SourceBatch> {
    let mut batches: Vec<SourceBatch> = Vec::new();
    for paper in papers {
        match batches.iter_mut().find(|b| b.source == paper.source) {
            Some(batch) => batch.papers.push(paper),
            None => batches.push(SourceBatch {
                source: paper.source.clone(),
                symbol: if paper.source_symbol.is_empty() {
                    paper.source.clone()
                } else {
                    paper.source_symbol.clone()
                },
                papers: vec![paper],
            }),
        }
    }
    batches
}

fn title_prefix(title: &str) -> String {
    title.chars().take(TITLE_PREFIX_CHARS).collect()
}

/// Sources, enrichment and delivery wired together.
pub struct Pipeline<L> {
    settings: Settings,
    sources: Vec<Box<dyn PaperSource>>,
    evaluator: AuthorEvaluator<L>,
    notifier: Option<Box<dyn Notifier>>,
}

impl<L: MetricsLookup> Pipeline<L> {
    /// Pipeline without a notifier; runs behave as dry runs until one is set.
    #[must_use]
    pub fn new(settings: Settings, sources: Vec<Box<dyn PaperSource>>, evaluator: AuthorEvaluator<L>) -> Self {
        Self { settings, sources, evaluator, notifier: None }
    }

    /// Attach the delivery channel.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Fetch, deduplicate, enrich, notify and persist.
    pub async fn run(&self, cache: &mut CacheManager, options: RunOptions) -> RunSummary {
        tracing::info!("Fetching papers from all sources");
        let fetched = fetch_all(&self.sources).await;
        let total = fetched.len();
        tracing::info!(papers = total, "Fetched papers");

        let mut papers = if options.ignore_sent_cache {
            fetched
        } else {
            let unsent = cache.get_unsent_papers(&fetched);
            tracing::info!(papers = unsent.len(), "Filtered already-sent papers");
            unsent
        };

        if papers.len() > self.settings.max_papers_per_run {
            tracing::info!(limit = self.settings.max_papers_per_run, "Limiting papers for this run");
            papers.truncate(self.settings.max_papers_per_run);
        }
        let candidates = papers.len();

        let mut evaluation = EvaluationStats::default();
        let mut sent = 0;
        let mut failed_batches = 0;

        let notifier = if options.dry_run {
            None
        } else {
            if self.notifier.is_none() {
                tracing::warn!("No notifier configured, nothing will be sent");
            }
            self.notifier.as_deref()
        };

        for mut batch in group_by_source(papers) {
            for (i, paper) in batch.papers.iter_mut().enumerate() {
                tracing::info!(source = %batch.source, index = i + 1, title = %paper.title, "Processing paper");
                evaluation.merge(self.enrich(cache, paper).await);
            }

            let Some(notifier) = notifier else {
                tracing::info!(
                    source = %batch.source,
                    symbol = %batch.symbol,
                    papers = batch.papers.len(),
                    "[DRY RUN] Would send batch"
                );
                continue;
            };

            if notifier.send_batch(&batch.source, &batch.symbol, &batch.papers).await {
                for paper in &batch.papers {
                    cache.mark_paper_sent(paper);
                }
                sent += batch.papers.len();
            } else {
                tracing::warn!(source = %batch.source, papers = batch.papers.len(), "Batch not delivered, will retry next run");
                failed_batches += 1;
            }
        }

        let save = cache.save().await;
        tracing::info!(sent, candidates, failed_batches, "Run finished");

        RunSummary { fetched: total, candidates, evaluation, sent, failed_batches, save }
    }

    /// Mark every fetched, unsent paper as sent without notifying.
    pub async fn seed(&self, cache: &mut CacheManager) -> SeedSummary {
        let papers = fetch_all(&self.sources).await;
        let mut seeded = 0;
        for paper in &papers {
            if !cache.is_paper_sent(&paper.id) {
                cache.mark_paper_sent(paper);
                seeded += 1;
            }
        }
        tracing::info!(fetched = papers.len(), seeded, "Seeded sent cache");

        let save = cache.save().await;
        SeedSummary { fetched: papers.len(), seeded, save }
    }

    /// Report how the next run would treat the current feeds. Writes nothing.
    pub async fn diagnose(&self, cache: &CacheManager) -> Diagnosis {
        let mut diagnosis =
            Diagnosis { max_papers_per_run: self.settings.max_papers_per_run, ..Diagnosis::default() };

        for record in cache.sent_records() {
            *diagnosis.sent_per_day.entry(record.sent_at.date_naive()).or_default() += 1;
            diagnosis.stored += 1;
        }

        let mut papers = Vec::new();
        for source in &self.sources {
            match source.fetch().await {
                Ok(found) => {
                    diagnosis.per_source.push((source.name().to_string(), Some(found.len())));
                    papers.extend(found);
                }
                Err(e) => {
                    tracing::warn!(source = %source.name(), error = %e, "Feed fetch failed");
                    diagnosis.per_source.push((source.name().to_string(), None));
                }
            }
        }
        diagnosis.fetched = papers.len();

        for paper in &papers {
            if cache.is_paper_sent(&paper.id) {
                diagnosis.would_skip += 1;
                continue;
            }
            diagnosis.would_send += 1;
            if diagnosis.unmatched.len() < DIAGNOSE_SAMPLE {
                let prefix = title_prefix(&paper.title);
                let same_title_id = cache
                    .sent_records()
                    .find(|r| !prefix.is_empty() && r.paper_id != paper.id && r.title.contains(&prefix))
                    .map(|r| r.paper_id.clone());
                diagnosis.unmatched.push(UnmatchedPaper {
                    id: paper.id.clone(),
                    doi: paper.doi.clone(),
                    title: paper.title.clone(),
                    source: paper.source.clone(),
                    same_title_id,
                });
            }
        }
        diagnosis
    }

    async fn enrich(&self, cache: &mut CacheManager, paper: &mut Paper) -> EvaluationStats {
        if !paper.is_preprint() {
            paper.mark_journal();
            return EvaluationStats::default();
        }
        if !self.settings.evaluate_authors || paper.authors.is_empty() {
            return EvaluationStats::default();
        }
        let stats =
            self.evaluator.evaluate_authors(cache, paper, self.settings.max_authors_to_evaluate).await;
        tracing::info!(max_h_index = paper.max_h_index, score = %paper.score.label(), "Scored paper");
        stats
    }
}

impl<L> fmt::Debug for Pipeline<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .field("sources", &self.sources.len())
            .field("has_notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}
