//! Graph definition types.
//!
//! A [`GraphDefinition`] is the persisted configuration describing one
//! visualization: where its data comes from, which output columns become the
//! pivot axes and cell value, and how values map to colors.

use serde::{Deserialize, Serialize};

/// Default gradient endpoint for the smallest value.
pub const DEFAULT_COLOR_MIN: &str = "#f0f9e8";
/// Default gradient endpoint for the largest value.
pub const DEFAULT_COLOR_MAX: &str = "#084081";

/// Where a definition's rows come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceType {
    /// A SQL query executed against the relational source.
    Sql,
    /// A JSON REST endpoint.
    Api,
    /// A CSV document fetched by URL.
    CsvUrl,
}

impl DataSourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceType::Sql => "sql",
            DataSourceType::Api => "api",
            DataSourceType::CsvUrl => "csv_url",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sql" => Some(DataSourceType::Sql),
            "api" => Some(DataSourceType::Api),
            "csv_url" => Some(DataSourceType::CsvUrl),
            _ => None,
        }
    }

    /// External sources are everything that is not the relational branch.
    pub fn is_external(&self) -> bool {
        !matches!(self, DataSourceType::Sql)
    }
}

/// Which visualization the pivoted matrix is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Heatmap,
    Bar,
    Pie,
    Line,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Heatmap => "heatmap",
            ChartType::Bar => "bar",
            ChartType::Pie => "pie",
            ChartType::Line => "line",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "heatmap" => Some(ChartType::Heatmap),
            "bar" => Some(ChartType::Bar),
            "pie" => Some(ChartType::Pie),
            "line" => Some(ChartType::Line),
            _ => None,
        }
    }
}

/// Authentication for external feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "auth_type", rename_all = "snake_case")]
pub enum AuthType {
    None,
    Bearer { token: String },
}

impl Default for AuthType {
    fn default() -> Self {
        AuthType::None
    }
}

/// Connection details for non-SQL sources.
///
/// Stored as a JSON column but always parsed into this struct at the store
/// boundary; the pipeline never sees an untyped blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalConfig {
    pub url: String,
    #[serde(flatten)]
    pub auth: AuthType,
}

impl ExternalConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: AuthType::None,
        }
    }

    pub fn with_bearer(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: AuthType::Bearer {
                token: token.into(),
            },
        }
    }
}

/// A persisted graph definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub data_source_type: DataSourceType,
    /// Only meaningful when `data_source_type` is [`DataSourceType::Sql`].
    pub query: String,
    pub row_field: String,
    pub col_field: String,
    pub value_field: String,
    pub color_min: String,
    pub color_max: String,
    pub chart_type: ChartType,
    /// Disabled definitions refuse public rendering but still render in an
    /// authenticated preview context.
    pub is_enabled: bool,
    /// Present iff `data_source_type` is external.
    pub external_config: Option<ExternalConfig>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// The writable fields of a definition, used for create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub data_source_type: DataSourceType,
    #[serde(default)]
    pub query: String,
    pub row_field: String,
    pub col_field: String,
    pub value_field: String,
    #[serde(default)]
    pub color_min: String,
    #[serde(default)]
    pub color_max: String,
    pub chart_type: ChartType,
    pub is_enabled: bool,
    #[serde(default)]
    pub external_config: Option<ExternalConfig>,
}

impl NewDefinition {
    /// A SQL-backed heat map with default colors, the common case.
    pub fn sql(
        name: impl Into<String>,
        query: impl Into<String>,
        row_field: impl Into<String>,
        col_field: impl Into<String>,
        value_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            data_source_type: DataSourceType::Sql,
            query: query.into(),
            row_field: row_field.into(),
            col_field: col_field.into(),
            value_field: value_field.into(),
            color_min: DEFAULT_COLOR_MIN.to_string(),
            color_max: DEFAULT_COLOR_MAX.to_string(),
            chart_type: ChartType::Heatmap,
            is_enabled: true,
            external_config: None,
        }
    }

    /// An external definition fetching from `config.url`.
    pub fn external(
        name: impl Into<String>,
        source: DataSourceType,
        config: ExternalConfig,
        row_field: impl Into<String>,
        col_field: impl Into<String>,
        value_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            data_source_type: source,
            query: String::new(),
            row_field: row_field.into(),
            col_field: col_field.into(),
            value_field: value_field.into(),
            color_min: DEFAULT_COLOR_MIN.to_string(),
            color_max: DEFAULT_COLOR_MAX.to_string(),
            chart_type: ChartType::Heatmap,
            is_enabled: true,
            external_config: Some(config),
        }
    }
}

/// Feature toggles injected at pipeline construction.
///
/// Replaces the original licensing singleton: the pipeline checks the set it
/// was handed, nothing global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub charts: bool,
    pub export: bool,
    pub slicers: bool,
    pub external_data: bool,
    pub linked_charts: bool,
}

impl Capabilities {
    /// Everything enabled.
    pub fn all() -> Self {
        Self {
            charts: true,
            export: true,
            slicers: true,
            external_data: true,
            linked_charts: true,
        }
    }

    /// Heat maps over SQL only.
    pub fn base() -> Self {
        Self {
            charts: false,
            export: false,
            slicers: false,
            external_data: false,
            linked_charts: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Return `color` if it is a strict `#RRGGBB` value, else `default`.
pub fn sanitize_hex_or_default(color: &str, default: &str) -> String {
    let c = color.trim();
    let ok = c.len() == 7
        && c.starts_with('#')
        && c[1..].chars().all(|ch| ch.is_ascii_hexdigit());
    if ok {
        c.to_string()
    } else {
        default.to_string()
    }
}
