//! Plain-text mail body.

use super::{REPO_URL, read_later_url, score_line};
use crate::models::Paper;

const RULE_WIDTH: usize = 60;

/// Plain-text body listing every paper of one source.
#[must_use]
pub fn format_batch_plain(source: &str, papers: &[Paper]) -> String {
    let total = papers.len();
    let mut output = format!("[{REPO_URL}]\n\nSource: {source}\nPapers: {total}\n\n{}\n", "=".repeat(RULE_WIDTH));

    for (i, paper) in papers.iter().enumerate() {
        output.push_str(&format!("\n[{}/{total}] {}\n", i + 1, paper.title));
        output.push_str(&format!("  Citation: {}\n", paper.citation_label()));
        output.push_str(&format!("  URL: {}\n", paper.url));

        if !paper.authors.is_empty() {
            output.push_str(&format!("  Authors: {}\n", paper.author_names()));
        }
        if !paper.keywords_matched.is_empty() {
            output.push_str(&format!("  Keywords: {}\n", paper.keywords_matched.join(", ")));
        }
        if let Some(line) = score_line(paper) {
            output.push_str(&format!("  {line}\n"));
        }
        output.push_str(&format!("  Read later: {}\n", read_later_url(&paper.url)));

        output.push_str(&format!("\n  Abstract:\n  {}\n\n{}\n", paper.abstract_text, "-".repeat(RULE_WIDTH)));
    }

    output
}
