//! Paper sources.
//!
//! Each configured feed becomes one [`PaperSource`]. Sources run in config
//! order, arXiv first. A source that fails is logged and skipped.

mod arxiv;
mod journal;

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;

use crate::config::{FeedsConfig, KeywordFilter, api};
use crate::error::FeedError;
use crate::models::Paper;

pub use arxiv::ArxivSource;
pub use journal::JournalSource;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

/// A feed that yields papers.
#[async_trait::async_trait]
pub trait PaperSource: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str;

    /// Fetch, convert and filter the feed's entries.
    async fn fetch(&self) -> Result<Vec<Paper>, FeedError>;
}

/// Download and parse a feed.
pub(crate) async fn download_feed(client: &Client, url: &str) -> Result<feed_rs::model::Feed, FeedError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status(status.as_u16()));
    }
    let bytes = response.bytes().await?;
    Ok(feed_rs::parser::parse(&bytes[..])?)
}

/// HTTP client shared by all feeds.
///
/// # Errors
///
/// Returns error if HTTP client initialization fails.
pub fn feed_client() -> Result<Client, FeedError> {
    Ok(Client::builder()
        .user_agent(api::USER_AGENT)
        .timeout(api::FEED_TIMEOUT)
        .connect_timeout(api::CONNECT_TIMEOUT)
        .gzip(true)
        .build()?)
}

/// Collapse runs of whitespace into single spaces.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove markup tags, then collapse whitespace.
#[must_use]
pub fn strip_tags(text: &str) -> String {
    collapse_whitespace(&HTML_TAG.replace_all(text, ""))
}

/// Apply a keyword filter to `text`.
///
/// Returns `None` when the text is rejected, otherwise the include keywords
/// that matched. Matching is case-insensitive substring search; any exclude
/// keyword rejects, and a non-empty include list needs at least one hit.
#[must_use]
pub fn match_keywords(text: &str, include: &[String], exclude: &[String]) -> Option<Vec<String>> {
    let haystack = text.to_lowercase();

    if exclude.iter().any(|k| haystack.contains(&k.to_lowercase())) {
        return None;
    }

    let matched: Vec<String> =
        include.iter().filter(|k| haystack.contains(&k.to_lowercase())).cloned().collect();

    if !include.is_empty() && matched.is_empty() {
        return None;
    }
    Some(matched)
}

/// Keep papers passing `filter`, recording matched keywords on each.
#[must_use]
pub fn apply_keyword_filter(papers: Vec<Paper>, filter: &KeywordFilter) -> Vec<Paper> {
    if !filter.enabled {
        return papers;
    }
    papers
        .into_iter()
        .filter_map(|mut paper| {
            let text = format!("{} {}", paper.title, paper.abstract_text);
            let matched = match_keywords(&text, &filter.include, &filter.exclude)?;
            paper.keywords_matched = matched;
            Some(paper)
        })
        .collect()
}

/// One source per configured feed, arXiv feeds first.
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built.
pub fn build_sources(feeds: &FeedsConfig) -> Result<Vec<Box<dyn PaperSource>>, FeedError> {
    let client = feed_client()?;
    let mut sources: Vec<Box<dyn PaperSource>> = Vec::new();
    for feed in &feeds.arxiv {
        sources.push(Box::new(ArxivSource::new(client.clone(), feed.clone())));
    }
    for feed in &feeds.journals {
        sources.push(Box::new(JournalSource::new(client.clone(), feed.clone())));
    }
    Ok(sources)
}

/// Fetch every source in order. Failures contribute no papers.
pub async fn fetch_all(sources: &[Box<dyn PaperSource>]) -> Vec<Paper> {
    let mut papers = Vec::new();
    for source in sources {
        match source.fetch().await {
            Ok(found) => {
                tracing::info!(source = %source.name(), papers = found.len(), "Fetched feed");
                papers.extend(found);
            }
            Err(e) => {
                tracing::warn!(source = %source.name(), error = %e, "Feed fetch failed, skipping");
            }
        }
    }
    papers
}
