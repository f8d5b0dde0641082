//! Pivoting flat records into a row×column matrix.
//!
//! One pass over the records builds a sparse cell map plus the global value
//! range; key lists are then sorted and optionally truncated for display.
//! This layer assumes validated, fetched input: it never fails, it coerces.

use std::collections::HashMap;

use crate::model::{stringify, to_number, Record};

/// Display-window limits applied to the sorted key lists. Zero means no
/// limit. Truncation happens after the value range is computed, so a legend
/// always reflects the full data range even when rows are hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PivotLimits {
    pub max_rows: usize,
    pub max_cols: usize,
}

impl PivotLimits {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(max_rows: usize, max_cols: usize) -> Self {
        Self { max_rows, max_cols }
    }
}

/// A pivoted result set. Built fresh on every render, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotMatrix {
    /// Distinct row keys, lexicographically sorted (then truncated).
    pub row_keys: Vec<String>,
    /// Distinct column keys, lexicographically sorted (then truncated).
    pub col_keys: Vec<String>,
    /// Observed cells. Missing combinations read as 0.0.
    pub cells: HashMap<(String, String), f64>,
    /// Smallest coerced value across all records (pre-truncation).
    pub min_value: f64,
    /// Largest coerced value across all records (pre-truncation).
    pub max_value: f64,
}

impl PivotMatrix {
    /// The cell value, 0.0 when the combination never appeared.
    pub fn value(&self, row: &str, col: &str) -> f64 {
        self.cells
            .get(&(row.to_string(), col.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether the combination appeared in the source data.
    pub fn has_cell(&self, row: &str, col: &str) -> bool {
        self.cells
            .contains_key(&(row.to_string(), col.to_string()))
    }

    /// No rows at all. The renderer must short-circuit to a "no data"
    /// state instead of drawing an empty table.
    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty() || self.col_keys.is_empty()
    }
}

/// Pivot records on the three configured fields.
///
/// Row and column values are stringified; the value field is coerced to a
/// float (non-numeric → 0.0, and those zeros participate in min/max).
/// Duplicate (row, col) pairs keep the last value seen; the source query
/// is expected to have grouped already, so no aggregation happens here.
pub fn pivot(
    records: &[Record],
    row_field: &str,
    col_field: &str,
    value_field: &str,
    limits: &PivotLimits,
) -> PivotMatrix {
    let mut row_keys: Vec<String> = Vec::new();
    let mut col_keys: Vec<String> = Vec::new();
    let mut cells: HashMap<(String, String), f64> = HashMap::new();
    let mut min_value = f64::MAX;
    let mut max_value = f64::MIN;

    for record in records {
        let (Some(row_raw), Some(col_raw)) = (record.get(row_field), record.get(col_field)) else {
            continue;
        };
        let row = stringify(row_raw);
        let col = stringify(col_raw);
        let value = record.get(value_field).map(to_number).unwrap_or(0.0);

        if !row_keys.contains(&row) {
            row_keys.push(row.clone());
        }
        if !col_keys.contains(&col) {
            col_keys.push(col.clone());
        }
        cells.insert((row, col), value);

        if value < min_value {
            min_value = value;
        }
        if value > max_value {
            max_value = value;
        }
    }

    row_keys.sort();
    col_keys.sort();

    if limits.max_rows > 0 && row_keys.len() > limits.max_rows {
        row_keys.truncate(limits.max_rows);
    }
    if limits.max_cols > 0 && col_keys.len() > limits.max_cols {
        col_keys.truncate(limits.max_cols);
    }

    PivotMatrix {
        row_keys,
        col_keys,
        cells,
        min_value,
        max_value,
    }
}
