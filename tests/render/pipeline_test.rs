//! End-to-end pipeline tests: store → validate → fetch → pivot → map.

use heatgrid::chart::HeatmapView;
use heatgrid::config::Settings;
use heatgrid::export::ExportError;
use heatgrid::model::{
    Capabilities, ChartType, DataSourceType, ExternalConfig, NewDefinition, Record,
};
use heatgrid::provider::{MemoryProvider, SqliteProvider};
use heatgrid::render::{Pipeline, RenderOptions, RenderOutcome};
use heatgrid::store::DefinitionStore;
use serde_json::json;

fn sales_definition() -> NewDefinition {
    NewDefinition::sql(
        "Sales by region",
        "SELECT region, month, total FROM wp_sales",
        "region",
        "month",
        "total",
    )
}

fn sqlite_with_sales() -> SqliteProvider {
    let provider = SqliteProvider::open_in_memory().unwrap();
    provider
        .execute_batch(
            "CREATE TABLE wp_sales (region TEXT, month TEXT, total REAL);
             INSERT INTO wp_sales VALUES
                ('east', 'jan', 10.0), ('east', 'feb', 20.0), ('west', 'jan', 3.0);",
        )
        .unwrap();
    provider
}

fn row(region: &str, month: &str, total: f64) -> Record {
    let mut r = Record::new();
    r.insert("region".to_string(), json!(region));
    r.insert("month".to_string(), json!(month));
    r.insert("total".to_string(), json!(total));
    r
}

fn heatmap(outcome: RenderOutcome) -> HeatmapView {
    match outcome {
        RenderOutcome::Heatmap(view) => view,
        other => panic!("expected a heatmap, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sql_definition_renders_heatmap() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let id = store.insert(&sales_definition()).unwrap();
    let provider = sqlite_with_sales();
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let view = heatmap(pipeline.render(id, &RenderOptions::public()).await.unwrap());
    assert_eq!(view.title, "Sales by region");
    assert_eq!(view.row_keys, vec!["east", "west"]);
    assert_eq!(view.col_keys, vec!["feb", "jan"]);
    assert_eq!(view.value("east", "feb"), 20.0);
    assert_eq!(view.value("west", "feb"), 0.0);
    assert_eq!(view.legend.min_label, "3");
    assert_eq!(view.legend.max_label, "20");
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let provider = MemoryProvider::new();
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let outcome = pipeline.render(42, &RenderOptions::public()).await.unwrap();
    assert!(matches!(outcome, RenderOutcome::NotFound));
}

#[tokio::test]
async fn test_disabled_definition_renders_only_in_preview() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let mut def = sales_definition();
    def.is_enabled = false;
    let id = store.insert(&def).unwrap();
    let provider = sqlite_with_sales();
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let outcome = pipeline.render(id, &RenderOptions::public()).await.unwrap();
    assert!(matches!(outcome, RenderOutcome::Disabled));

    let outcome = pipeline.render(id, &RenderOptions::preview(0, 0)).await.unwrap();
    assert!(matches!(outcome, RenderOutcome::Heatmap(_)));
}

#[tokio::test]
async fn test_stored_query_is_revalidated_on_render() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let id = store.insert(&sales_definition()).unwrap();
    // empty database: the table the stored query references no longer exists
    let provider = SqliteProvider::open_in_memory().unwrap();
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let outcome = pipeline.render(id, &RenderOptions::public()).await.unwrap();
    let RenderOutcome::Invalid { errors } = outcome else {
        panic!("expected Invalid, got {outcome:?}");
    };
    assert!(!errors.is_empty());
}

#[tokio::test]
async fn test_empty_result_is_no_data() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let id = store.insert(&sales_definition()).unwrap();
    let provider = SqliteProvider::open_in_memory().unwrap();
    provider
        .execute_batch("CREATE TABLE wp_sales (region TEXT, month TEXT, total REAL);")
        .unwrap();
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let outcome = pipeline.render(id, &RenderOptions::public()).await.unwrap();
    assert!(matches!(outcome, RenderOutcome::NoData));
}

#[tokio::test]
async fn test_preview_limits_truncate_axes() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let id = store.insert(&sales_definition()).unwrap();
    let provider = sqlite_with_sales();
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let view = heatmap(
        pipeline
            .render(id, &RenderOptions::preview(1, 1))
            .await
            .unwrap(),
    );
    assert_eq!(view.row_keys, vec!["east"]);
    assert_eq!(view.col_keys, vec!["feb"]);
    // hidden cells still defined the legend range
    assert_eq!(view.legend.min_label, "3");
}

#[tokio::test]
async fn test_chart_type_requires_charts_capability() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let mut def = sales_definition();
    def.chart_type = ChartType::Pie;
    let id = store.insert(&def).unwrap();
    let provider = sqlite_with_sales();

    let mut caps = Capabilities::base();
    caps.export = true;
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), caps);
    let outcome = pipeline.render(id, &RenderOptions::public()).await.unwrap();
    assert!(matches!(
        outcome,
        RenderOutcome::CapabilityRequired { feature: "charts" }
    ));

    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());
    let outcome = pipeline.render(id, &RenderOptions::public()).await.unwrap();
    let RenderOutcome::Chart(chart) = outcome else {
        panic!("expected Chart, got {outcome:?}");
    };
    assert_eq!(chart.kind, ChartType::Pie);
    assert!(!chart.is_empty());
}

#[tokio::test]
async fn test_external_definition_renders_through_api() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let def = NewDefinition::external(
        "Feed",
        DataSourceType::Api,
        ExternalConfig::new("https://x.test/data"),
        "region",
        "month",
        "total",
    );
    let id = store.insert(&def).unwrap();

    let body = json!([
        {"region": "east", "month": "jan", "total": 10},
        {"region": "west", "month": "jan", "total": 3}
    ])
    .to_string();
    let provider = MemoryProvider::new().with_response("https://x.test/data", 200, body);
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let view = heatmap(pipeline.render(id, &RenderOptions::public()).await.unwrap());
    assert_eq!(view.row_keys, vec!["east", "west"]);
    assert_eq!(view.value("east", "jan"), 10.0);
}

#[tokio::test]
async fn test_external_fetch_failure_is_failed_not_err() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let def = NewDefinition::external(
        "Feed",
        DataSourceType::Api,
        ExternalConfig::new("https://x.test/data"),
        "region",
        "month",
        "total",
    );
    let id = store.insert(&def).unwrap();
    let provider = MemoryProvider::new().with_response("https://x.test/data", 500, "oops");
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let outcome = pipeline.render(id, &RenderOptions::public()).await.unwrap();
    assert!(matches!(outcome, RenderOutcome::Failed { .. }));
}

#[tokio::test]
async fn test_external_without_capability_is_gated() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let def = NewDefinition::external(
        "Feed",
        DataSourceType::Api,
        ExternalConfig::new("https://x.test/data"),
        "region",
        "month",
        "total",
    );
    let id = store.insert(&def).unwrap();
    let provider = MemoryProvider::new();
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::base());

    let outcome = pipeline.render(id, &RenderOptions::public()).await.unwrap();
    assert!(matches!(
        outcome,
        RenderOutcome::CapabilityRequired {
            feature: "external_data"
        }
    ));
}

#[tokio::test]
async fn test_slicers_summarize_full_range() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let id = store.insert(&sales_definition()).unwrap();
    let provider = sqlite_with_sales();
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let summary = pipeline.slicers(id).await.unwrap().unwrap();
    assert_eq!(summary.rows, vec!["east", "west"]);
    assert_eq!(summary.cols, vec!["feb", "jan"]);
    assert_eq!(summary.min_value, 3.0);
    assert_eq!(summary.max_value, 20.0);
}

#[tokio::test]
async fn test_slicers_degrade_to_none() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let id = store.insert(&sales_definition()).unwrap();
    let provider = sqlite_with_sales();

    // capability off
    let mut caps = Capabilities::all();
    caps.slicers = false;
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), caps);
    assert!(pipeline.slicers(id).await.unwrap().is_none());

    // missing definition
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());
    assert!(pipeline.slicers(999).await.unwrap().is_none());

    // fetch failure
    let empty = SqliteProvider::open_in_memory().unwrap();
    let pipeline = Pipeline::new(&store, &empty, Settings::default(), Capabilities::all());
    assert!(pipeline.slicers(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_export_produces_bom_and_rows() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let id = store.insert(&sales_definition()).unwrap();
    let provider = MemoryProvider::new().with_default_rows(vec![
        row("east", "jan", 10.0),
        row("west", "jan", 3.0),
    ]);
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    let csv = pipeline.export_csv(id).await.unwrap();
    assert!(csv.starts_with('\u{feff}'));
    let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').lines().collect();
    assert_eq!(lines[0], "month,region,total");
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_export_requires_capability() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let id = store.insert(&sales_definition()).unwrap();
    let provider = MemoryProvider::new();
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::base());

    let err = pipeline.export_csv(id).await.unwrap_err();
    assert!(matches!(
        err,
        ExportError::CapabilityRequired { feature: "export" }
    ));
}

#[tokio::test]
async fn test_export_missing_and_empty() {
    let store = DefinitionStore::open_in_memory().unwrap();
    let provider = MemoryProvider::new().with_default_rows(Vec::new());
    let pipeline = Pipeline::new(&store, &provider, Settings::default(), Capabilities::all());

    assert!(matches!(
        pipeline.export_csv(1).await.unwrap_err(),
        ExportError::NotFound
    ));

    let id = store.insert(&sales_definition()).unwrap();
    assert!(matches!(
        pipeline.export_csv(id).await.unwrap_err(),
        ExportError::NoData
    ));
}
