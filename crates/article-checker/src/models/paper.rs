//! Paper and author model shared by sources, the evaluator, the cache and the notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name split on the last space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorName {
    /// Everything before the last space (may be empty).
    pub first: String,

    /// Last whitespace-separated token.
    pub last: String,

    /// Trimmed display name.
    pub full: String,
}

impl AuthorName {
    /// Parse a display name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let full = name.trim().to_string();
        match full.rsplit_once(' ') {
            Some((first, last)) => {
                Self { first: first.trim_end().to_string(), last: last.to_string(), full: full.clone() }
            }
            None => Self { first: String::new(), last: full.clone(), full },
        }
    }
}

/// Bibliometric metrics resolved for one author. All fields empty means unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorMetrics {
    /// h-index.
    pub h_index: Option<u32>,

    /// Total citations.
    pub citation_count: Option<u64>,

    /// Number of papers.
    pub paper_count: Option<u32>,

    /// Profile page.
    pub profile_url: Option<String>,
}

impl AuthorMetrics {
    /// Nothing has been resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.h_index.is_none()
            && self.citation_count.is_none()
            && self.paper_count.is_none()
            && self.profile_url.is_none()
    }
}

/// A paper author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Parsed name.
    pub name: AuthorName,

    /// Metrics, filled in by the evaluator.
    #[serde(default)]
    pub metrics: AuthorMetrics,
}

impl Author {
    /// Create an unresolved author from a display name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { name: AuthorName::parse(name), metrics: AuthorMetrics::default() }
    }

    /// Trimmed display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.name.full
    }

    /// Resolved h-index, if any.
    #[must_use]
    pub const fn h_index(&self) -> Option<u32> {
        self.metrics.h_index
    }
}

/// Prominence tier derived from the highest h-index among evaluated authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    /// h < 10.
    Emerging,
    /// h >= 10.
    Notable,
    /// h >= 20.
    Core,
    /// h >= 50.
    Leading,
    /// h >= 100.
    Eminent,
}

impl ScoreTier {
    /// Map an h-index to its tier.
    #[must_use]
    pub const fn from_h_index(h_index: u32) -> Self {
        match h_index {
            100.. => Self::Eminent,
            50.. => Self::Leading,
            20.. => Self::Core,
            10.. => Self::Notable,
            _ => Self::Emerging,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Eminent => "World-leading authority",
            Self::Leading => "Top researcher",
            Self::Core => "Core researcher",
            Self::Notable => "Notable researcher",
            Self::Emerging => "Early-career researcher",
        }
    }

    /// CSS class used by the HTML mail.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Eminent => "score-s-plus",
            Self::Leading => "score-s",
            Self::Core => "score-a",
            Self::Notable => "score-b",
            Self::Emerging => "score-c",
        }
    }

    /// Emoji marker.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Eminent => "🏆",
            Self::Leading => "🏅",
            Self::Core => "🟢",
            Self::Notable => "🔵",
            Self::Emerging => "⚪",
        }
    }
}

/// Score state of a paper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// Not evaluated.
    #[default]
    Unscored,
    /// Scored from author h-indices.
    Authors(ScoreTier),
    /// Published in a journal; authors are not evaluated.
    Journal,
}

impl Score {
    /// Label shown in notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unscored => "",
            Self::Authors(tier) => tier.label(),
            Self::Journal => "Peer-reviewed journal",
        }
    }

    /// CSS class used by the HTML mail.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Unscored => "score-none",
            Self::Authors(tier) => tier.css_class(),
            Self::Journal => "score-journal",
        }
    }

    /// Emoji marker.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Unscored => "",
            Self::Authors(tier) => tier.marker(),
            Self::Journal => "📘",
        }
    }
}

/// A paper from any source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// Natural identifier: DOI when known, else the feed's id or URL.
    pub id: String,

    /// Title with whitespace collapsed.
    pub title: String,

    /// Landing page.
    pub url: String,

    /// Source label, e.g. `arXiv:quant-ph` or `PRX Quantum`.
    pub source: String,

    /// Short source symbol for subjects, e.g. `arxiv/quant-ph`.
    #[serde(default)]
    pub source_symbol: String,

    /// Abstract or feed summary.
    #[serde(default)]
    pub abstract_text: String,

    /// Authors in source order.
    #[serde(default)]
    pub authors: Vec<Author>,

    /// Publication date.
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,

    /// Include keywords that matched.
    #[serde(default)]
    pub keywords_matched: Vec<String>,

    /// arXiv identifier for preprints.
    #[serde(default)]
    pub arxiv_id: Option<String>,

    /// DOI for journal papers.
    #[serde(default)]
    pub doi: Option<String>,

    /// Direct PDF link.
    #[serde(default)]
    pub pdf_url: Option<String>,

    /// Whether the full text is freely available.
    #[serde(default)]
    pub is_open_access: bool,

    /// Highest resolved h-index among evaluated authors.
    #[serde(default)]
    pub max_h_index: u32,

    /// Score derived from `max_h_index`.
    #[serde(default)]
    pub score: Score,
}

impl Paper {
    /// Create a paper with the required fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let source = source.into();
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            source_symbol: source.clone(),
            source,
            abstract_text: String::new(),
            authors: Vec::new(),
            published: None,
            keywords_matched: Vec::new(),
            arxiv_id: None,
            doi: None,
            pdf_url: None,
            is_open_access: false,
            max_h_index: 0,
            score: Score::Unscored,
        }
    }

    /// Attach authors from display names.
    #[must_use]
    pub fn with_authors<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.authors = names.into_iter().map(Author::new).collect();
        self
    }

    /// Preprints are scored by author; journal papers are not.
    #[must_use]
    pub const fn is_preprint(&self) -> bool {
        self.arxiv_id.is_some()
    }

    /// Recompute `max_h_index` and the tier from resolved authors.
    pub fn compute_score(&mut self) {
        self.max_h_index = self.authors.iter().filter_map(Author::h_index).max().unwrap_or(0);
        self.score = Score::Authors(ScoreTier::from_h_index(self.max_h_index));
    }

    /// Score a journal paper without author evaluation.
    pub fn mark_journal(&mut self) {
        self.score = Score::Journal;
    }

    /// Short citation label such as `Smith+24_Title` or `Smith-Jones_Title`.
    #[must_use]
    pub fn citation_label(&self) -> String {
        let title: String = self.title.chars().filter(|c| *c != ' ').collect();
        if self.authors.is_empty() {
            return title;
        }
        if self.authors.len() > 3 {
            let yy = self.published.map(|d| d.format("%y").to_string()).unwrap_or_default();
            return format!("{}+{yy}_{title}", self.authors[0].name.last);
        }
        let names: Vec<&str> = self.authors.iter().map(|a| a.name.last.as_str()).collect();
        format!("{}_{title}", names.join("-"))
    }

    /// Author display names joined with commas.
    #[must_use]
    pub fn author_names(&self) -> String {
        self.authors.iter().map(Author::display_name).collect::<Vec<_>>().join(", ")
    }
}
