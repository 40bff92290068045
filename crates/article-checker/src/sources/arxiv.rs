//! arXiv category feeds.
//!
//! arXiv puts every author of an entry into one comma-separated author
//! element. Entry ids look like `oai:arXiv.org:2401.01234v1` or
//! `http://arxiv.org/abs/2401.01234v1`.

use std::sync::LazyLock;

use feed_rs::model::{Entry, Feed};
use regex::Regex;
use reqwest::Client;

use super::{PaperSource, apply_keyword_filter, collapse_whitespace, download_feed};
use crate::config::ArxivFeedConfig;
use crate::error::FeedError;
use crate::models::Paper;

static ARXIV_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)arxiv\.org(?:/abs/|:)(\d{4}\.\d{4,5}(?:v\d+)?)").expect("valid arXiv id regex")
});

/// Extract an arXiv identifier from an entry id or URL.
#[must_use]
pub fn extract_arxiv_id(text: &str) -> Option<String> {
    ARXIV_ID.captures(text).map(|c| c[1].to_string())
}

/// One arXiv category feed.
pub struct ArxivSource {
    client: Client,
    config: ArxivFeedConfig,
    name: String,
}

impl ArxivSource {
    /// Source for `config`.
    #[must_use]
    pub fn new(client: Client, config: ArxivFeedConfig) -> Self {
        let name = format!("arXiv:{}", config.category);
        Self { client, config, name }
    }

    fn symbol(&self) -> String {
        self.config.symbol.clone().unwrap_or_else(|| format!("arxiv/{}", self.config.category))
    }

    /// Convert a parsed feed, skipping entries that cannot become papers.
    #[must_use]
    pub fn papers_from_feed(&self, feed: &Feed) -> Vec<Paper> {
        let symbol = self.symbol();
        let papers: Vec<Paper> = feed
            .entries
            .iter()
            .filter_map(|entry| {
                let paper = self.parse_entry(entry, &symbol);
                if paper.is_none() {
                    tracing::warn!(source = %self.name, entry = %entry.id, "Skipping unusable entry");
                }
                paper
            })
            .collect();
        apply_keyword_filter(papers, &self.config.filters.keywords)
    }

    fn parse_entry(&self, entry: &Entry, symbol: &str) -> Option<Paper> {
        let link = entry.links.first().map(|l| l.href.clone());
        let id = Some(entry.id.trim().to_string()).filter(|id| !id.is_empty()).or_else(|| link.clone())?;
        let title = collapse_whitespace(&entry.title.as_ref()?.content);
        if title.is_empty() {
            return None;
        }

        let arxiv_id = extract_arxiv_id(&id).or_else(|| link.as_deref().and_then(extract_arxiv_id));

        let mut paper = Paper::new(id.clone(), title, link.unwrap_or(id), self.name.clone());
        paper.source_symbol = symbol.to_string();
        paper.abstract_text =
            entry.summary.as_ref().map(|s| collapse_whitespace(&s.content)).unwrap_or_default();
        paper.published = entry.published.or(entry.updated);
        paper.pdf_url = arxiv_id.as_ref().map(|id| format!("https://arxiv.org/pdf/{id}.pdf"));
        paper.arxiv_id = arxiv_id;
        paper.is_open_access = true;

        if let Some(first) = entry.authors.first() {
            paper = paper.with_authors(first.name.split(',').map(str::trim).filter(|n| !n.is_empty()));
        }
        Some(paper)
    }
}

#[async_trait::async_trait]
impl PaperSource for ArxivSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Paper>, FeedError> {
        tracing::info!(url = %self.config.url, "Fetching arXiv feed");
        let feed = download_feed(&self.client, &self.config.url).await?;
        Ok(self.papers_from_feed(&feed))
    }
}
