//! CSV encoding for the remote store.
//!
//! Header row plus one row per record. Fields containing a comma, quote, CR or
//! LF are quoted with inner quotes doubled. The reader accepts LF and CRLF and
//! quoted fields spanning lines.

use std::borrow::Cow;
use std::collections::HashMap;

use super::{RecordMap, TabularRecord, index_records, ordered_records};
use crate::error::{StoreError, StoreResult};

/// One parsed row, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: HashMap<String, String>,
}

impl Row {
    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self { cells: pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect() }
    }

    /// Raw cell; empty when the column is absent.
    #[must_use]
    pub fn cell(&self, column: &str) -> &str {
        self.cells.get(column).map_or("", String::as_str)
    }

    /// Non-blank cell.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&str> {
        Some(self.cell(column)).filter(|v| !v.trim().is_empty())
    }
}

/// Escape a single field.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn push_line(output: &mut String, fields: impl IntoIterator<Item = impl AsRef<str>>) {
    let mut first = true;
    for field in fields {
        if !first {
            output.push(',');
        }
        output.push_str(&escape(field.as_ref()));
        first = false;
    }
    output.push('\n');
}

/// Encode records under their schema, oldest first.
#[must_use]
pub fn encode<R: TabularRecord>(records: &RecordMap<R>) -> String {
    let mut output = String::new();
    push_line(&mut output, R::COLUMNS);
    for record in ordered_records(records) {
        push_line(&mut output, record.to_row());
    }
    output
}

/// Split text into records of fields.
fn split(content: &str) -> StoreResult<Vec<Vec<String>>> {
    let mut lines = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                fields.push(std::mem::take(&mut field));
                lines.push(std::mem::take(&mut fields));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(StoreError::malformed("unterminated quoted field"));
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        lines.push(fields);
    }

    // Blank lines carry no record.
    lines.retain(|l| !(l.len() == 1 && l[0].is_empty()));
    Ok(lines)
}

/// Parse text into rows keyed by the header.
pub fn decode(content: &str) -> StoreResult<Vec<Row>> {
    let mut lines = split(content)?.into_iter();
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();

    Ok(lines
        .map(|values| Row {
            cells: header.iter().cloned().zip(values).collect(),
        })
        .collect())
}

/// Parse text straight into an index of records.
pub fn decode_records<R: TabularRecord>(content: &str) -> StoreResult<RecordMap<R>> {
    let rows = decode(content)?;
    Ok(index_records(rows.iter().filter_map(R::from_row)))
}
