//! Journal feeds (APS, Nature, Quantum, ...).

use std::sync::LazyLock;

use feed_rs::model::{Entry, Feed};
use regex::Regex;
use reqwest::Client;

use super::{PaperSource, apply_keyword_filter, download_feed, strip_tags};
use crate::config::JournalFeedConfig;
use crate::error::FeedError;
use crate::models::Paper;

static DOI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(10\.\d{4,}/[^\s]+)").expect("valid DOI regex"));

/// Extract a DOI from an id or URL.
#[must_use]
pub fn extract_doi(text: &str) -> Option<String> {
    DOI.captures(text).map(|c| c[1].trim_end_matches(['.', ',', ';']).to_string())
}

/// One journal feed.
pub struct JournalSource {
    client: Client,
    config: JournalFeedConfig,
}

impl JournalSource {
    /// Source for `config`.
    #[must_use]
    pub fn new(client: Client, config: JournalFeedConfig) -> Self {
        Self { client, config }
    }

    /// Convert a parsed feed, skipping entries that cannot become papers.
    #[must_use]
    pub fn papers_from_feed(&self, feed: &Feed) -> Vec<Paper> {
        let papers: Vec<Paper> = feed
            .entries
            .iter()
            .filter_map(|entry| {
                let paper = self.parse_entry(entry);
                if paper.is_none() {
                    tracing::warn!(source = %self.config.name, entry = %entry.id, "Skipping unusable entry");
                }
                paper
            })
            .collect();
        apply_keyword_filter(papers, &self.config.filters.keywords)
    }

    fn parse_entry(&self, entry: &Entry) -> Option<Paper> {
        let link = entry.links.first().map(|l| l.href.trim().to_string()).filter(|l| !l.is_empty());
        let entry_id = Some(entry.id.trim().to_string()).filter(|id| !id.is_empty());
        let doi = entry_id
            .as_deref()
            .and_then(extract_doi)
            .or_else(|| link.as_deref().and_then(extract_doi));

        let id = doi.clone().or_else(|| entry_id.clone()).or_else(|| link.clone())?;
        let title = strip_tags(&entry.title.as_ref()?.content);
        if title.is_empty() {
            return None;
        }

        let url = link.or_else(|| doi.as_ref().map(|d| format!("https://doi.org/{d}"))).unwrap_or_else(|| id.clone());
        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| s.content.clone())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
            .map(|text| strip_tags(&text))
            .unwrap_or_default();

        let mut paper = Paper::new(id, title, url, self.config.name.clone());
        paper.source_symbol = self.config.symbol.clone().unwrap_or_else(|| self.config.name.clone());
        paper.abstract_text = abstract_text;
        paper.published = entry.published.or(entry.updated);
        paper.doi = doi;
        paper.is_open_access = self.config.open_access;
        paper = paper.with_authors(entry.authors.iter().map(|a| a.name.trim()).filter(|n| !n.is_empty()));
        Some(paper)
    }
}

#[async_trait::async_trait]
impl PaperSource for JournalSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn fetch(&self) -> Result<Vec<Paper>, FeedError> {
        tracing::info!(journal = %self.config.name, url = %self.config.url, "Fetching journal feed");
        let feed = download_feed(&self.client, &self.config.url).await?;
        Ok(self.papers_from_feed(&feed))
    }
}
