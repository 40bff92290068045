//! Data models: papers as produced by sources, cache records as persisted,
//! and the metrics lookup response.

mod author;
mod paper;
pub mod records;

pub use author::{AuthorSearchResult, ScholarAuthor};
pub use paper::{Author, AuthorMetrics, AuthorName, Paper, Score, ScoreTier};
pub use records::{CachedAuthor, SentPaperRecord};
