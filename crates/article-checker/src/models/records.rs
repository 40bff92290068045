//! Persisted cache records.
//!
//! In memory both caches are maps from a hashed key to one of these structs.
//! They become tabular rows or JSON objects only at the store boundary.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{AuthorMetrics, Paper};
use crate::config::columns;
use crate::keys;
use crate::store::{Row, TabularRecord};

/// Timestamp encoding shared by both caches.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Value used when a stored timestamp is missing or unreadable.
    /// Old enough that the next cleanup purges the row.
    #[must_use]
    pub fn fallback() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).single().unwrap_or_default()
    }

    /// Render as RFC 3339 UTC.
    #[must_use]
    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parse RFC 3339, or a naive ISO date-time taken as UTC.
    #[must_use]
    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Parse, falling back to [`fallback`].
    #[must_use]
    pub fn parse_or_fallback(text: &str) -> DateTime<Utc> {
        parse(text).unwrap_or_else(fallback)
    }

    pub(crate) fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(ts))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().map_or_else(fallback, parse_or_fallback))
    }
}

/// Empty strings in older cache files mean "absent".
fn empty_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.filter(|s| !s.is_empty()))
}

fn parse_cell<T: std::str::FromStr>(cell: Option<&str>) -> Option<T> {
    cell.and_then(|c| c.trim().parse().ok())
}

fn opt_cell<T: ToString>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

/// Age check shared by both record types: valid while `now - ts <= ttl`.
#[must_use]
pub fn is_expired(ts: DateTime<Utc>, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
    now.signed_duration_since(ts) > ttl
}

/// Cached metrics for one author name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAuthor {
    /// Display name as first looked up.
    #[serde(default)]
    pub name: String,

    /// h-index.
    #[serde(default)]
    pub h_index: Option<u32>,

    /// Total citations.
    #[serde(default)]
    pub citation_count: Option<u64>,

    /// Number of papers.
    #[serde(default)]
    pub paper_count: Option<u32>,

    /// Profile page.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub url: Option<String>,

    /// When the lookup happened.
    #[serde(with = "timestamp", default = "timestamp::fallback")]
    pub cached_at: DateTime<Utc>,
}

impl CachedAuthor {
    /// Record fresh metrics for `name`.
    #[must_use]
    pub fn new(name: &str, metrics: &AuthorMetrics, cached_at: DateTime<Utc>) -> Self {
        Self {
            name: name.trim().to_string(),
            h_index: metrics.h_index,
            citation_count: metrics.citation_count,
            paper_count: metrics.paper_count,
            url: metrics.profile_url.clone(),
            cached_at,
        }
    }

    /// Metrics view.
    #[must_use]
    pub fn metrics(&self) -> AuthorMetrics {
        AuthorMetrics {
            h_index: self.h_index,
            citation_count: self.citation_count,
            paper_count: self.paper_count,
            profile_url: self.url.clone(),
        }
    }
}

impl TabularRecord for CachedAuthor {
    const COLUMNS: &'static [&'static str] = columns::AUTHOR_CACHE;

    fn natural_key(&self) -> &str {
        &self.name
    }

    fn cache_key(&self) -> String {
        keys::author_key(&self.name)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.cached_at
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            opt_cell(self.h_index.as_ref()),
            opt_cell(self.citation_count.as_ref()),
            opt_cell(self.paper_count.as_ref()),
            opt_cell(self.url.as_ref()),
            timestamp::format(&self.cached_at),
        ]
    }

    fn from_row(row: &Row) -> Option<Self> {
        let name = row.value("name")?.to_string();
        Some(Self {
            name,
            h_index: parse_cell(row.value("h_index")),
            citation_count: parse_cell(row.value("citation_count")),
            paper_count: parse_cell(row.value("paper_count")),
            url: row.value("url").map(str::to_string),
            cached_at: timestamp::parse_or_fallback(row.cell("cached_at")),
        })
    }
}

/// A paper that has been notified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentPaperRecord {
    /// Natural identifier as sent.
    #[serde(default)]
    pub paper_id: String,

    /// DOI if known.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub doi: Option<String>,

    /// Title.
    #[serde(default)]
    pub title: String,

    /// Source label.
    #[serde(default)]
    pub source: String,

    /// Short source symbol.
    #[serde(default)]
    pub source_symbol: String,

    /// When the notification went out.
    #[serde(with = "timestamp", default = "timestamp::fallback")]
    pub sent_at: DateTime<Utc>,

    /// Short citation label.
    #[serde(default)]
    pub citation_label: String,
}

impl SentPaperRecord {
    /// Snapshot a paper at send time.
    #[must_use]
    pub fn from_paper(paper: &Paper, sent_at: DateTime<Utc>) -> Self {
        Self {
            paper_id: paper.id.clone(),
            doi: paper.doi.clone().filter(|d| !d.is_empty()),
            title: paper.title.clone(),
            source: paper.source.clone(),
            source_symbol: paper.source_symbol.clone(),
            sent_at,
            citation_label: paper.citation_label(),
        }
    }
}

impl TabularRecord for SentPaperRecord {
    const COLUMNS: &'static [&'static str] = columns::SENT_PAPERS;

    fn natural_key(&self) -> &str {
        &self.paper_id
    }

    fn cache_key(&self) -> String {
        keys::paper_key(&self.paper_id)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.sent_at
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.paper_id.clone(),
            opt_cell(self.doi.as_ref()),
            self.title.clone(),
            self.source.clone(),
            self.source_symbol.clone(),
            timestamp::format(&self.sent_at),
            self.citation_label.clone(),
        ]
    }

    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            paper_id: row.value("paper_id")?.to_string(),
            doi: row.value("doi").map(str::to_string),
            title: row.cell("title").to_string(),
            source: row.cell("source").to_string(),
            source_symbol: row.cell("source_symbol").to_string(),
            sent_at: timestamp::parse_or_fallback(row.cell("sent_at")),
            citation_label: row.cell("citation_label").to_string(),
        })
    }
}
