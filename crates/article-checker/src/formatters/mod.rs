//! Notification bodies.
//!
//! One batch per source: a subject line, a plain-text body and an HTML body.

mod html;
mod plain;

pub use html::{escape_html, format_batch_html};
pub use plain::format_batch_plain;

use crate::models::{Paper, Score};

/// Project page linked from every mail.
pub const REPO_URL: &str = "https://github.com/kmitsutani/article-checker";

/// Subject line, e.g. `[arxiv/quant-ph] 3 new papers`.
#[must_use]
pub fn batch_subject(symbol: &str, count: usize) -> String {
    format!("[{symbol}] {count} new paper{}", if count == 1 { "" } else { "s" })
}

/// Bookmark link for reading later.
#[must_use]
pub fn read_later_url(paper_url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(paper_url.as_bytes()).collect();
    format!("https://b.hatena.ne.jp/my/add.confirm?url={encoded}")
}

/// Score line: the journal label, or h-index plus tier label when one resolved.
#[must_use]
pub fn score_line(paper: &Paper) -> Option<String> {
    match paper.score {
        Score::Journal => Some(paper.score.label().to_string()),
        Score::Authors(_) if paper.max_h_index > 0 => {
            Some(format!("Max h-index: {} ({})", paper.max_h_index, paper.score.label()))
        }
        Score::Authors(_) => Some(paper.score.label().to_string()),
        Score::Unscored => None,
    }
}
