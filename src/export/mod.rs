//! CSV export of fetched records.
//!
//! Exports the raw (pre-pivot) records so downstream tools see exactly
//! what the source produced. Output starts with a UTF-8 BOM for
//! spreadsheet compatibility and is capped at a configured row count.

use crate::fetch::FetchError;
use crate::model::{stringify, Record};
use crate::store::StoreError;

/// Errors that can occur during export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("feature not enabled: {feature}")]
    CapabilityRequired { feature: &'static str },

    #[error("definition not found")]
    NotFound,

    #[error("no data to export")]
    NoData,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Serialize records to CSV text.
///
/// The header is the first record's key set; later records contribute the
/// fields they share with it. At most `max_rows` records are written.
pub fn records_to_csv(records: &[Record], max_rows: usize) -> String {
    let mut out = String::from("\u{feff}");
    let Some(first) = records.first() else {
        return out;
    };

    let headers: Vec<&String> = first.keys().collect();
    out.push_str(
        &headers
            .iter()
            .map(|h| escape_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for record in records.iter().take(max_rows) {
        let line = headers
            .iter()
            .map(|h| {
                record
                    .get(*h)
                    .map(|v| escape_field(&stringify(v)))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Quote a field when it contains a delimiter, quote, or newline.
fn escape_field(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
