//! Integration tests for the query validator.
//!
//! Static checks run against fixtures; the probe steps run against a real
//! in-memory SQLite provider.

use std::time::Duration;

use heatgrid::provider::{MemoryProvider, SqliteProvider};
use heatgrid::validate::{extract_tables, QueryValidator, ValidationError};

fn validator() -> QueryValidator {
    QueryValidator::new("wp_", Duration::from_secs(5))
}

fn sqlite_with_sales() -> SqliteProvider {
    let provider = SqliteProvider::open_in_memory().unwrap();
    provider
        .execute_batch(
            "CREATE TABLE wp_sales (region TEXT, month TEXT, total REAL);
             INSERT INTO wp_sales VALUES ('east', 'jan', 10.0), ('west', 'jan', 3.0);",
        )
        .unwrap();
    provider
}

#[test]
fn test_empty_query_rejected() {
    let errors = validator().check_static("   ;  ");
    assert_eq!(errors, vec![ValidationError::Empty]);
}

#[test]
fn test_must_start_with_select_or_with() {
    let errors = validator().check_static("SHOW TABLES");
    assert!(errors.contains(&ValidationError::NotSelect));

    assert!(validator().check_static("SELECT 1").is_empty());
    // CTE names count as table references, so they need the prefix too
    assert!(validator()
        .check_static("WITH wp_t AS (SELECT 1) SELECT * FROM wp_t")
        .is_empty());
    // case-insensitive
    assert!(validator().check_static("select 1").is_empty());
}

#[test]
fn test_forbidden_keyword_detected() {
    let errors = validator().check_static("SELECT * FROM wp_posts WHERE 1; DROP TABLE wp_posts");
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::ForbiddenKeyword { keyword } if keyword == "DROP"
    )));
}

#[test]
fn test_forbidden_keyword_is_word_boundary_scoped() {
    // `updated_posts` contains UPDATE as a substring but must not trigger
    let errors = validator().check_static("SELECT updated_at FROM wp_updated_posts");
    assert!(!errors
        .iter()
        .any(|e| matches!(e, ValidationError::ForbiddenKeyword { .. })));
}

#[test]
fn test_forbidden_multiword_keyword() {
    let errors = validator().check_static("SELECT * FROM wp_x WHERE a LOAD  DATA b");
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::ForbiddenKeyword { keyword } if keyword == "LOAD DATA"
    )));
}

#[test]
fn test_first_forbidden_keyword_wins() {
    let errors = validator().check_static("SELECT sleep(1), benchmark(1, 1) FROM wp_x");
    let hits: Vec<_> = errors
        .iter()
        .filter(|e| matches!(e, ValidationError::ForbiddenKeyword { .. }))
        .collect();
    assert_eq!(hits.len(), 1);
    assert!(matches!(
        hits[0],
        ValidationError::ForbiddenKeyword { keyword } if keyword == "SLEEP"
    ));
}

#[test]
fn test_trailing_semicolon_tolerated_stacked_statement_rejected() {
    assert!(validator().check_static("SELECT * FROM wp_posts;").is_empty());

    let errors = validator().check_static("SELECT * FROM wp_posts; SELECT 2");
    assert!(errors.contains(&ValidationError::StackedStatements));
}

#[test]
fn test_table_namespace_enforced() {
    let errors = validator().check_static("SELECT * FROM other_app_table");
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::DisallowedTable { table, prefix }
            if table == "other_app_table" && prefix == "wp_"
    )));

    assert!(validator().check_static("SELECT * FROM wp_posts").is_empty());
    // placeholder form is allowed too
    assert!(validator()
        .check_static("SELECT * FROM {prefix}posts")
        .is_empty());
}

#[test]
fn test_join_tables_checked() {
    let errors =
        validator().check_static("SELECT * FROM wp_posts p JOIN rogue_terms t ON t.id = p.id");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::DisallowedTable { table, .. } if table == "rogue_terms")));
}

#[test]
fn test_extract_tables_dedupes() {
    let tables = extract_tables("SELECT * FROM wp_a JOIN wp_b x JOIN wp_a y");
    assert_eq!(tables, vec!["wp_a", "wp_b"]);
}

#[tokio::test]
async fn test_probe_passes_when_columns_match() {
    let provider = sqlite_with_sales();
    let outcome = validator()
        .validate(
            &provider,
            "SELECT region, month, total FROM wp_sales",
            "region",
            "month",
            "total",
        )
        .await;
    assert!(outcome.is_valid, "unexpected errors: {:?}", outcome.errors);
}

#[tokio::test]
async fn test_probe_is_case_insensitive_on_columns() {
    let provider = sqlite_with_sales();
    let outcome = validator()
        .validate(
            &provider,
            "SELECT region, month, total FROM wp_sales",
            "REGION",
            "Month",
            "TOTAL",
        )
        .await;
    assert!(outcome.is_valid, "unexpected errors: {:?}", outcome.errors);
}

#[tokio::test]
async fn test_probe_reports_missing_columns() {
    let provider = sqlite_with_sales();
    let outcome = validator()
        .validate(
            &provider,
            "SELECT region, month, total FROM wp_sales",
            "region",
            "month",
            "missing_col",
        )
        .await;
    assert!(!outcome.is_valid);
    assert!(outcome.errors.iter().any(|e| matches!(
        e,
        ValidationError::MissingColumns { value, .. } if value == "missing_col"
    )));
}

#[tokio::test]
async fn test_zero_row_fallback_proves_columns() {
    let provider = sqlite_with_sales();
    // no rows, so the LIMIT 1 probe cannot show the columns; the zero-row
    // projection must still prove them
    let outcome = validator()
        .validate(
            &provider,
            "SELECT region, month, total FROM wp_sales WHERE 0 = 1",
            "region",
            "month",
            "total",
        )
        .await;
    assert!(outcome.is_valid, "unexpected errors: {:?}", outcome.errors);
}

#[tokio::test]
async fn test_bad_field_name_never_reaches_engine() {
    let provider = sqlite_with_sales();
    let outcome = validator()
        .validate(
            &provider,
            "SELECT region, month, total FROM wp_sales",
            "region",
            "month",
            "bad-name",
        )
        .await;
    assert!(!outcome.is_valid);
    assert!(outcome.errors.iter().any(|e| matches!(
        e,
        ValidationError::InvalidFieldName { field } if field == "bad-name"
    )));
    // sanitization failure prevents the projection probe entirely
    assert!(!outcome
        .errors
        .iter()
        .any(|e| matches!(e, ValidationError::MissingColumns { .. })));
}

#[tokio::test]
async fn test_execution_error_surfaces_engine_message() {
    let provider = SqliteProvider::open_in_memory().unwrap();
    let outcome = validator()
        .validate(
            &provider,
            "SELECT * FROM wp_nonexistent",
            "r",
            "c",
            "v",
        )
        .await;
    assert!(!outcome.is_valid);
    assert!(outcome
        .errors
        .iter()
        .any(|e| matches!(e, ValidationError::Execution { .. })));
}

#[tokio::test]
async fn test_static_failure_skips_probe() {
    // a provider with no fixtures errors on any query; validation must not
    // reach it when the static pass already failed
    let provider = MemoryProvider::new();
    let outcome = validator()
        .validate(&provider, "DELETE FROM wp_posts", "r", "c", "v")
        .await;
    assert!(!outcome.is_valid);
    assert!(!outcome
        .errors
        .iter()
        .any(|e| matches!(e, ValidationError::Execution { .. })));
}
