//! Query validation.
//!
//! User-supplied queries are statically inspected against a restrictive
//! safety policy (read-only, single statement, allow-listed table
//! namespace), then probed against the live source to confirm the declared
//! row/column/value output fields are actually producible.
//!
//! The static checks are pure and accumulate every problem they find; the
//! two probes run only when the static checks pass, carry a bounded
//! timeout, and their outcome must never be cached: the underlying schema
//! can change between requests.
//!
//! Table extraction is a best-effort tokenizer, not a SQL parser. The live
//! probe is the real guarantee; the heuristic exists to give fast,
//! user-correctable feedback before any round-trip.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::model::is_identifier;
use crate::provider::DataSourceProvider;

/// Keywords that disqualify a query outright, checked word-boundary and
/// case-insensitively, in order; the first hit is reported.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT",
    "UPDATE",
    "DELETE",
    "DROP",
    "ALTER",
    "TRUNCATE",
    "RENAME",
    "CREATE",
    "ATTACH",
    "MERGE",
    "CALL",
    "DO",
    "REPLACE",
    "OUTFILE",
    "INFILE",
    "LOAD DATA",
    "INTO DUMPFILE",
    "HANDLER",
    "SLEEP",
    "BENCHMARK",
];

static STARTS_WITH_SELECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(SELECT|WITH)\s").unwrap());

static FORBIDDEN: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    FORBIDDEN_KEYWORDS
        .iter()
        .map(|kw| {
            let pattern = format!(r"(?i)\b{}\b", kw.replace(' ', r"\s+"));
            (*kw, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// A `;` followed by the start of another statement. A bare trailing
/// semicolon is already stripped before this runs.
static STACKED_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i);\s*(SELECT|WITH|INSERT|UPDATE|DELETE|DROP|ALTER|TRUNCATE|RENAME|CREATE|ATTACH|MERGE|CALL|DO|REPLACE|HANDLER|LOAD|SET|GRANT|REVOKE)\b",
    )
    .unwrap()
});

static TABLE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bfrom\s+([^\s,;]+)|\bjoin\s+([^\s,;]+)").unwrap());

/// Strip from a backtick or open-paren onward, dropping quoting and any
/// inline sub-select remainder glued to the token.
static TABLE_TRAILER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[`(].*$").unwrap());

/// Placeholder tokens a stored query may use instead of the real prefix.
const PREFIX_PLACEHOLDERS: &[&str] = &["{{prefix}}", "{prefix}"];

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Query is empty.")]
    Empty,

    #[error("Only SELECT queries are allowed (must start with SELECT or WITH).")]
    NotSelect,

    #[error("Forbidden keyword detected: {keyword}.")]
    ForbiddenKeyword { keyword: String },

    #[error("Multiple SQL statements are not allowed.")]
    StackedStatements,

    #[error("Only tables starting with \"{prefix}\" may be queried. Offending table: {table}.")]
    DisallowedTable { table: String, prefix: String },

    #[error("Field name '{field}' must contain only letters, digits, and underscores.")]
    InvalidFieldName { field: String },

    #[error("SQL error: {message}")]
    Execution { message: String },

    #[error("The query must return columns named exactly: {row}, {col}, {value}. Use AS aliases to rename computed columns.")]
    MissingColumns {
        row: String,
        col: String,
        value: String,
    },
}

/// The accumulated result of a validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// All problems joined into one user-facing message.
    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Validates queries against the safety policy and the live schema.
#[derive(Debug, Clone)]
pub struct QueryValidator {
    prefix: String,
    probe_timeout: Duration,
}

impl QueryValidator {
    pub fn new(prefix: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            probe_timeout,
        }
    }

    /// Run the full validation pass, including the execution probes.
    ///
    /// Static checks (shape, keywords, stacked statements, table namespace)
    /// all run and accumulate; the probes only run when the static pass is
    /// clean, so a forbidden query never reaches the engine.
    pub async fn validate(
        &self,
        provider: &dyn DataSourceProvider,
        raw_query: &str,
        row_field: &str,
        col_field: &str,
        value_field: &str,
    ) -> ValidationOutcome {
        let mut errors = self.check_static(raw_query);
        if !errors.is_empty() {
            return ValidationOutcome::from_errors(errors);
        }

        let sql = expand_prefix(&strip_trailing_terminator(raw_query), &self.prefix);
        self.probe_columns(provider, &sql, row_field, col_field, value_field, &mut errors)
            .await;
        ValidationOutcome::from_errors(errors)
    }

    /// The pure part of validation: steps that need no round-trip.
    pub fn check_static(&self, raw_query: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let sql = strip_trailing_terminator(raw_query);

        if sql.is_empty() {
            errors.push(ValidationError::Empty);
            return errors;
        }

        if !STARTS_WITH_SELECT.is_match(&sql) {
            errors.push(ValidationError::NotSelect);
        }

        // First match wins, in list order.
        for (keyword, pattern) in FORBIDDEN.iter() {
            if pattern.is_match(&sql) {
                errors.push(ValidationError::ForbiddenKeyword {
                    keyword: (*keyword).to_string(),
                });
                break;
            }
        }

        if STACKED_STATEMENT.is_match(&sql) {
            errors.push(ValidationError::StackedStatements);
        }

        for table in extract_tables(&sql) {
            if !self.table_allowed(&table) {
                errors.push(ValidationError::DisallowedTable {
                    table,
                    prefix: self.prefix.clone(),
                });
                break;
            }
        }

        errors
    }

    fn table_allowed(&self, table: &str) -> bool {
        table.starts_with(&self.prefix)
            || PREFIX_PLACEHOLDERS.iter().any(|p| table.starts_with(p))
    }

    /// Run the wrapped query once, then fall back to a zero-row
    /// projection when the first row does not show the mapped columns.
    async fn probe_columns(
        &self,
        provider: &dyn DataSourceProvider,
        sql: &str,
        row_field: &str,
        col_field: &str,
        value_field: &str,
        errors: &mut Vec<ValidationError>,
    ) {
        let probe_sql = format!("SELECT * FROM ({sql}) AS heatgrid_sub LIMIT 1");
        debug!(probe = %probe_sql, "running validation probe");

        let rows = match tokio::time::timeout(self.probe_timeout, provider.run_query(&probe_sql))
            .await
        {
            Err(_) => {
                errors.push(ValidationError::Execution {
                    message: format!(
                        "probe timed out after {}s",
                        self.probe_timeout.as_secs()
                    ),
                });
                return;
            }
            Ok(Err(e)) => {
                errors.push(ValidationError::Execution {
                    message: e.to_string(),
                });
                return;
            }
            Ok(Ok(rows)) => rows,
        };

        if let Some(first) = rows.first() {
            let columns: Vec<String> = first.keys().map(|k| k.to_lowercase()).collect();
            let present = |f: &str| columns.iter().any(|c| c == &f.to_lowercase());
            if present(row_field) && present(col_field) && present(value_field) {
                return;
            }
        }

        // The three names are interpolated into SQL below, so they must be
        // plain identifiers; a bad name fails here instead of reaching the
        // engine unescaped.
        let mut bad_field = false;
        for field in [row_field, col_field, value_field] {
            if !is_identifier(field) {
                errors.push(ValidationError::InvalidFieldName {
                    field: field.to_string(),
                });
                bad_field = true;
            }
        }
        if bad_field {
            return;
        }

        // Zero-row projection: succeeding with no data still proves the
        // columns exist.
        let projection_sql = format!(
            "SELECT {row_field}, {col_field}, {value_field} FROM ({sql}) AS heatgrid_sub LIMIT 0"
        );
        debug!(probe = %projection_sql, "running projection probe");
        match tokio::time::timeout(self.probe_timeout, provider.run_query(&projection_sql)).await {
            Ok(Ok(_)) => {}
            _ => errors.push(ValidationError::MissingColumns {
                row: row_field.to_string(),
                col: col_field.to_string(),
                value: value_field.to_string(),
            }),
        }
    }
}

/// Trim the query and strip one trailing statement terminator.
pub fn strip_trailing_terminator(sql: &str) -> String {
    let trimmed = sql.trim();
    match trimmed.strip_suffix(';') {
        Some(rest) => rest.trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Substitute `{prefix}` / `{{prefix}}` placeholder tokens with the real
/// namespace prefix.
pub fn expand_prefix(sql: &str, prefix: &str) -> String {
    let mut out = sql.to_string();
    for placeholder in PREFIX_PLACEHOLDERS {
        out = out.replace(placeholder, prefix);
    }
    out
}

/// Extract table identifiers following FROM/JOIN tokens, deduplicated in
/// first-seen order. Sub-selects (tokens opening with `(`) are skipped.
/// The tokenizer does not track CTE names, so selecting FROM a CTE counts
/// as a table reference and the CTE name must carry the prefix too.
pub fn extract_tables(sql: &str) -> Vec<String> {
    let mut tables: Vec<String> = Vec::new();
    for caps in TABLE_REF.captures_iter(sql) {
        let token = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        if token.starts_with('(') {
            continue;
        }
        let table = TABLE_TRAILER.replace(token, "").trim().to_string();
        if !table.is_empty() && !tables.contains(&table) {
            tables.push(table);
        }
    }
    tables
}
