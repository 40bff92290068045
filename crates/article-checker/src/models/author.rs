//! Author search model matching the Semantic Scholar API schema.

use serde::{Deserialize, Serialize};

use super::AuthorMetrics;

/// Author search result. Only the matched authors are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorSearchResult {
    #[serde(default)]
    pub data: Vec<ScholarAuthor>,
}

/// The metrics fields of a Semantic Scholar author record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarAuthor {
    /// Profile URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Total number of papers by this author.
    #[serde(default)]
    pub paper_count: Option<i64>,

    /// Total citation count across all papers.
    #[serde(default)]
    pub citation_count: Option<i64>,

    /// h-index metric.
    #[serde(default)]
    pub h_index: Option<i64>,
}

impl ScholarAuthor {
    /// Convert to metrics. Missing counts read as zero, negative values are clamped.
    #[must_use]
    pub fn into_metrics(self) -> AuthorMetrics {
        AuthorMetrics {
            h_index: Some(self.h_index.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32),
            citation_count: Some(self.citation_count.unwrap_or(0).max(0) as u64),
            paper_count: Some(self.paper_count.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32),
            profile_url: self.url.filter(|u| !u.is_empty()),
        }
    }
}
