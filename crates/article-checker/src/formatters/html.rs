//! HTML mail body: one card per paper.
//!
//! Every piece of feed or metrics text is escaped before it is embedded.

use super::{REPO_URL, batch_subject, read_later_url, score_line};
use crate::models::{Paper, Score};

const STYLE: &str = r"
        body { font-family: -apple-system, 'Segoe UI', Arial, sans-serif; line-height: 1.6; max-width: 800px; margin: 0 auto; padding: 20px; background-color: #f5f5f5; }
        .header { background-color: #2c3e50; color: white; padding: 20px 25px; border-radius: 8px 8px 0 0; }
        .header h1 { margin: 0; font-size: 1.3em; }
        .header .meta, .header .meta a { color: #bdc3c7; font-size: 0.85em; }
        .paper-card { background-color: white; padding: 20px 25px; border-bottom: 1px solid #ecf0f1; }
        .paper-card h2 { color: #2c3e50; font-size: 1.15em; margin: 0 0 8px 0; }
        .paper-number { display: inline-block; background-color: #3498db; color: white; width: 24px; height: 24px; line-height: 24px; text-align: center; border-radius: 50%; font-size: 0.8em; margin-right: 8px; }
        .score-badge { display: inline-block; padding: 3px 12px; border-radius: 15px; font-weight: bold; font-size: 0.85em; margin: 5px 0; }
        .card-meta { color: #7f8c8d; font-size: 0.9em; margin: 5px 0; }
        .keywords { color: #e74c3c; font-weight: 500; }
        .abstract { background-color: #f9f9f9; border-left: 3px solid #95a5a6; padding: 12px 15px; margin: 12px 0; font-style: italic; color: #555; font-size: 0.9em; }
        .btn { display: inline-block; padding: 8px 16px; border-radius: 5px; text-decoration: none; font-weight: bold; font-size: 0.85em; margin-right: 8px; color: white; }
        .btn-read { background-color: #3498db; }
        .btn-pdf { background-color: #27ae60; }
        .btn-later { background-color: #00a4de; }
        .authors-table { width: 100%; border-collapse: collapse; margin: 10px 0; font-size: 0.85em; }
        .authors-table th { background-color: #3498db; color: white; padding: 6px 8px; text-align: left; }
        .authors-table td { padding: 6px 8px; border-bottom: 1px solid #eee; }
";

/// Escape text for element content and quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Badge colors (background, foreground) per score class.
fn badge_colors(score: Score) -> (&'static str, &'static str) {
    match score.css_class() {
        "score-s-plus" => ("#ffd700", "#000"),
        "score-s" => ("#ff6b6b", "white"),
        "score-a" => ("#4ecdc4", "white"),
        "score-b" => ("#45b7d1", "white"),
        "score-journal" => ("#2ecc71", "white"),
        _ => ("#95a5a6", "white"),
    }
}

/// Group digits in thousands: `12345` becomes `12,345`.
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn render_card(paper: &Paper, index: usize) -> String {
    let mut card = String::from("    <div class=\"paper-card\">\n");
    card.push_str(&format!(
        "        <h2><span class=\"paper-number\">{index}</span>{} {}</h2>\n",
        paper.score.marker(),
        escape_html(&paper.title)
    ));
    card.push_str(&format!("        <div class=\"card-meta\">{}</div>\n", escape_html(&paper.citation_label())));

    if !paper.authors.is_empty() {
        card.push_str(&format!(
            "        <div class=\"card-meta\">Authors: {}</div>\n",
            escape_html(&paper.author_names())
        ));
    }

    if let Some(line) = score_line(paper) {
        let (bg, fg) = badge_colors(paper.score);
        card.push_str(&format!(
            "        <div class=\"score-badge {}\" style=\"background-color: {bg}; color: {fg};\">{}</div>\n",
            paper.score.css_class(),
            escape_html(&line)
        ));
    }

    if !paper.keywords_matched.is_empty() {
        let keywords: Vec<String> = paper.keywords_matched.iter().map(|k| escape_html(k)).collect();
        card.push_str(&format!(
            "        <div class=\"card-meta\"><span class=\"keywords\">Keywords: {}</span></div>\n",
            keywords.join(" &bull; ")
        ));
    }

    if let Some(published) = paper.published {
        card.push_str(&format!(
            "        <div class=\"card-meta\">Published: {}</div>\n",
            published.format("%Y-%m-%d %H:%M")
        ));
    }

    let resolved: Vec<_> = paper.authors.iter().filter(|a| a.h_index().is_some()).collect();
    if !resolved.is_empty() {
        card.push_str("        <table class=\"authors-table\">\n");
        card.push_str("            <tr><th>Author</th><th>h-index</th><th>Citations</th><th>Papers</th></tr>\n");
        for author in resolved {
            let metrics = &author.metrics;
            let url = metrics.profile_url.as_deref().unwrap_or("#");
            let citations = metrics.citation_count.filter(|c| *c > 0).map_or_else(|| "-".to_string(), thousands);
            let papers = metrics.paper_count.filter(|c| *c > 0).map_or_else(|| "-".to_string(), |c| c.to_string());
            card.push_str(&format!(
                "            <tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{citations}</td><td>{papers}</td></tr>\n",
                escape_html(url),
                escape_html(author.display_name()),
                metrics.h_index.unwrap_or_default(),
            ));
        }
        card.push_str("        </table>\n");
    }

    card.push_str(&format!("        <div class=\"abstract\">{}</div>\n", escape_html(&paper.abstract_text)));

    card.push_str("        <div class=\"buttons\">\n");
    card.push_str(&format!(
        "            <a href=\"{}\" class=\"btn btn-read\" target=\"_blank\">Read Paper &rarr;</a>\n",
        escape_html(&paper.url)
    ));
    if let Some(pdf) = &paper.pdf_url {
        card.push_str(&format!(
            "            <a href=\"{}\" class=\"btn btn-pdf\" target=\"_blank\">Download PDF</a>\n",
            escape_html(pdf)
        ));
    }
    card.push_str(&format!(
        "            <a href=\"{}\" class=\"btn btn-later\" target=\"_blank\">Read later</a>\n",
        escape_html(&read_later_url(&paper.url))
    ));
    card.push_str("        </div>\n    </div>");
    card
}

/// HTML body listing every paper of one source.
#[must_use]
pub fn format_batch_html(source: &str, symbol: &str, papers: &[Paper]) -> String {
    let cards: Vec<String> = papers.iter().enumerate().map(|(i, p)| render_card(p, i + 1)).collect();

    format!(
        "<!DOCTYPE html>
<html>
<head>
    <meta charset=\"UTF-8\">
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">
    <style>{STYLE}    </style>
</head>
<body>
    <div class=\"header\">
        <h1>{}</h1>
        <div class=\"meta\">Source: {} | <a href=\"{REPO_URL}\">{REPO_URL}</a></div>
    </div>
{}
</body>
</html>
",
        escape_html(&batch_subject(symbol, papers.len())),
        escape_html(source),
        cards.join("\n")
    )
}
