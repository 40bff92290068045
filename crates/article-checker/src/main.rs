//! article-checker - Entry Point
//!
//! Runs once per invocation, typically from a scheduler.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use article_checker::{
    AuthorEvaluator, CacheManager, Config, EmailNotifier, Pipeline, RunOptions,
    SemanticScholarClient, sources,
};

#[derive(Parser, Debug)]
#[command(name = "article-checker")]
#[command(about = "Paper alerts from arXiv and journal feeds with author h-index enrichment")]
#[command(version)]
struct Cli {
    /// Directory containing feeds.yaml
    #[arg(long, default_value = "config", env = "ARTICLE_CHECKER_CONFIG_DIR")]
    config_dir: PathBuf,

    /// Directory for local cache files (used when no gist is configured)
    #[arg(long, default_value = ".cache", env = "ARTICLE_CHECKER_CACHE_DIR")]
    cache_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Fetch and evaluate but don't send mail
    #[arg(long, global = true)]
    dry_run: bool,

    /// Ignore the sent-papers cache (re-send everything)
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Fetch, evaluate and notify (default)
    Run,
    /// Mark every paper currently in the feeds as already sent
    Seed,
    /// Report how the next run would treat the current feeds
    Diagnose,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let command = cli.command.unwrap_or(Command::Run);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?command,
        dry_run = cli.dry_run,
        "Starting article-checker"
    );

    let config = Config::load(&cli.config_dir, &cli.cache_dir)?;
    let sources = sources::build_sources(&config.feeds)?;
    let client = SemanticScholarClient::new(&config.scholar)?;
    let evaluator = AuthorEvaluator::new(client, config.scholar.rate_limit_delay);
    let pipeline = Pipeline::new(config.settings().clone(), sources, evaluator);

    let mut cache = CacheManager::open(&config).await?;

    match command {
        Command::Run => {
            let dry_run = cli.dry_run;
            let pipeline = if dry_run {
                pipeline
            } else {
                config.require_smtp()?;
                pipeline.with_notifier(Box::new(EmailNotifier::new(&config.smtp)?))
            };

            let summary =
                pipeline.run(&mut cache, RunOptions { dry_run, ignore_sent_cache: cli.no_cache }).await;
            tracing::info!(
                fetched = summary.fetched,
                candidates = summary.candidates,
                sent = summary.sent,
                failed_batches = summary.failed_batches,
                authors_cached = summary.evaluation.cached,
                authors_fetched = summary.evaluation.fetched,
                caches_saved = summary.save.is_complete(),
                "Done"
            );
        }
        Command::Seed => {
            let summary = pipeline.seed(&mut cache).await;
            tracing::info!(
                fetched = summary.fetched,
                seeded = summary.seeded,
                caches_saved = summary.save.is_complete(),
                "Seed complete"
            );
        }
        Command::Diagnose => {
            let diagnosis = pipeline.diagnose(&cache).await;
            println!("{diagnosis}");
        }
    }

    Ok(())
}
