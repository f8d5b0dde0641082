//! Flat records and scalar coercion.
//!
//! Records are what the fetcher hands to the pivot engine: one JSON object
//! per source row. The coercion rules here are deliberately forgiving:
//! downstream stages never fail on odd data, they coerce and keep going.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// One flat source row, keyed by output column name.
pub type Record = serde_json::Map<String, Value>;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Whether `s` is a bare alphanumeric/underscore identifier.
///
/// Field mappings must pass this before they are ever interpolated into a
/// projection probe.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Canonical string form of a scalar, for use as a pivot key.
///
/// Unlike `Value::to_string`, strings are not re-quoted. Integral floats
/// print without a trailing `.0` so that `5` and `5.0` land in the same key.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        (f as i64).to_string()
                    }
                    _ => n.to_string(),
                }
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Coerce a scalar to a float. Non-numeric values become 0.0.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => coerce_numeric(s).unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Parse a numeric-looking string, tolerating thousands separators.
///
/// Commas and spaces are stripped first, so `"1,234.5"` and `"1 234"` both
/// parse. Anything that is not digits with an optional leading `-` and an
/// optional decimal point is rejected.
pub fn coerce_numeric(s: &str) -> Option<f64> {
    let cleaned: String = s.chars().filter(|c| *c != ',' && *c != ' ').collect();
    if cleaned.is_empty() {
        return None;
    }
    let digits = cleaned.strip_prefix('-').unwrap_or(&cleaned);
    if digits.is_empty() {
        return None;
    }
    let mut dots = 0;
    for c in digits.chars() {
        match c {
            '0'..='9' => {}
            '.' => dots += 1,
            _ => return None,
        }
    }
    if dots > 1 || digits == "." {
        return None;
    }
    cleaned.parse().ok()
}
