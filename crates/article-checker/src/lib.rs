//! article-checker
//!
//! Scheduled paper alerts. Each run fetches arXiv and journal feeds, drops
//! papers that were already notified, scores preprints by their authors'
//! h-index via Semantic Scholar, and mails one digest per source.
//!
//! # Features
//!
//! - **Deduplication**: a sent-papers cache with a 30-day window
//! - **Author enrichment**: cache-or-fetch lookups with a 180-day author cache
//! - **Two backends**: a GitHub Gist (CSV files) or local JSON files
//! - **Degrades, never aborts**: unreachable caches, feeds or lookups are logged and skipped
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use article_checker::{AuthorEvaluator, CacheManager, Config, Pipeline, RunOptions, SemanticScholarClient, sources};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Path::new("config"), Path::new(".cache"))?;
//!     let client = SemanticScholarClient::new(&config.scholar)?;
//!     let evaluator = AuthorEvaluator::new(client, config.scholar.rate_limit_delay);
//!     let pipeline = Pipeline::new(config.settings().clone(), sources::build_sources(&config.feeds)?, evaluator);
//!
//!     let mut cache = CacheManager::open(&config).await?;
//!     let summary = pipeline.run(&mut cache, RunOptions { dry_run: true, ..RunOptions::default() }).await;
//!     println!("{} new papers", summary.candidates);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod formatters;
pub mod keys;
pub mod models;
pub mod notify;
pub mod runner;
pub mod sources;
pub mod store;

pub use cache::{CacheManager, CleanupStats, SaveReport};
pub use client::SemanticScholarClient;
pub use config::Config;
pub use error::{ClientError, ConfigError, FeedError, NotifyError, StoreError};
pub use evaluator::{AuthorEvaluator, MetricsLookup, Resolution};
pub use notify::{EmailNotifier, Notifier};
pub use runner::{Pipeline, RunOptions, RunSummary};
