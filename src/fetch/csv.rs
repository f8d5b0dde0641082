//! Quote-aware CSV parsing for fetched feeds.
//!
//! The first line is the header; each subsequent non-blank line becomes a
//! record keyed by the header names. Rows whose field count differs from
//! the header are dropped rather than failing the whole fetch.

use serde_json::Value;

use super::FetchError;
use crate::model::Record;

/// Parse a whole CSV document into records.
pub fn parse(body: &str) -> Result<Vec<Record>, FetchError> {
    let mut lines = body.lines();
    let header_line = lines
        .next()
        .ok_or_else(|| FetchError::InvalidPayload("CSV document is empty".to_string()))?;
    let headers = split_line(header_line);
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(FetchError::InvalidPayload(
            "CSV document has no header row".to_string(),
        ));
    }

    let mut records = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_line(line);
        if fields.len() != headers.len() {
            continue;
        }
        let mut record = Record::new();
        for (header, field) in headers.iter().zip(fields) {
            record.insert(header.clone(), Value::String(field));
        }
        records.push(record);
    }

    Ok(records)
}

/// Split one CSV line into fields.
///
/// Handles double-quoted fields with embedded commas and doubled-quote
/// escapes. A stray quote mid-field is kept literally rather than rejected.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
