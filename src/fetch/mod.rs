//! Data fetching.
//!
//! Turns a validated [`GraphDefinition`] into a sequence of flat records:
//! either by executing its query against the relational source, or by
//! fetching and parsing an external JSON/CSV feed. Failures are always a
//! single tagged error, never a partial result.

use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{
    coerce_numeric, AuthType, Capabilities, DataSourceType, GraphDefinition, Record,
};
use crate::provider::{DataSourceProvider, ProviderError};
use crate::validate::{expand_prefix, strip_trailing_terminator};

pub mod csv;

/// Errors that can occur while fetching source data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The provider round-trip failed (network, driver, timeout).
    #[error("fetch failed: {0}")]
    Provider(#[from] ProviderError),

    /// The feed answered with a non-2xx status.
    #[error("external source returned HTTP {status}")]
    Status { status: u16 },

    /// The body was not the JSON/CSV shape the source type promises.
    #[error("invalid payload from external source: {0}")]
    InvalidPayload(String),

    /// The definition has no URL configured for its external source.
    #[error("external source is missing a URL")]
    MissingUrl,

    /// The capability set handed to the fetcher does not cover this source.
    #[error("feature not enabled: {feature}")]
    CapabilityRequired { feature: &'static str },
}

/// Fetches records for a definition through an injected provider.
#[derive(Debug, Clone)]
pub struct DataFetcher {
    prefix: String,
    capabilities: Capabilities,
}

impl DataFetcher {
    pub fn new(prefix: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            prefix: prefix.into(),
            capabilities,
        }
    }

    /// Fetch all records for `definition`.
    pub async fn fetch(
        &self,
        provider: &dyn DataSourceProvider,
        definition: &GraphDefinition,
    ) -> Result<Vec<Record>, FetchError> {
        match definition.data_source_type {
            DataSourceType::Sql => self.fetch_sql(provider, definition).await,
            DataSourceType::Api => self.fetch_api(provider, definition).await,
            DataSourceType::CsvUrl => self.fetch_csv(provider, definition).await,
        }
    }

    async fn fetch_sql(
        &self,
        provider: &dyn DataSourceProvider,
        definition: &GraphDefinition,
    ) -> Result<Vec<Record>, FetchError> {
        let sql = expand_prefix(&strip_trailing_terminator(&definition.query), &self.prefix);
        let records = provider.run_query(&sql).await?;
        debug!(definition = definition.id, rows = records.len(), "query executed");
        Ok(records)
    }

    fn external_url<'d>(&self, definition: &'d GraphDefinition) -> Result<&'d str, FetchError> {
        if !self.capabilities.external_data {
            return Err(FetchError::CapabilityRequired {
                feature: "external_data",
            });
        }
        let url = definition
            .external_config
            .as_ref()
            .map(|c| c.url.as_str())
            .unwrap_or("");
        if url.is_empty() {
            return Err(FetchError::MissingUrl);
        }
        Ok(url)
    }

    fn auth_headers(definition: &GraphDefinition) -> Vec<(String, String)> {
        match definition.external_config.as_ref().map(|c| &c.auth) {
            Some(AuthType::Bearer { token }) => vec![(
                "Authorization".to_string(),
                format!("Bearer {token}"),
            )],
            _ => Vec::new(),
        }
    }

    async fn fetch_api(
        &self,
        provider: &dyn DataSourceProvider,
        definition: &GraphDefinition,
    ) -> Result<Vec<Record>, FetchError> {
        let url = self.external_url(definition)?;
        let headers = Self::auth_headers(definition);

        let response = provider.http_get(url, &headers).await?;
        if !response.is_success() {
            warn!(definition = definition.id, status = response.status, "api fetch rejected");
            return Err(FetchError::Status {
                status: response.status,
            });
        }

        let parsed: Value = serde_json::from_str(&response.body)
            .map_err(|e| FetchError::InvalidPayload(format!("invalid JSON: {e}")))?;
        let items = unwrap_envelope(parsed)?;

        Ok(project_records(
            items,
            &definition.row_field,
            &definition.col_field,
            &definition.value_field,
        ))
    }

    async fn fetch_csv(
        &self,
        provider: &dyn DataSourceProvider,
        definition: &GraphDefinition,
    ) -> Result<Vec<Record>, FetchError> {
        let url = self.external_url(definition)?;

        let response = provider.http_get(url, &[]).await?;
        if !response.is_success() {
            warn!(definition = definition.id, status = response.status, "csv fetch rejected");
            return Err(FetchError::Status {
                status: response.status,
            });
        }

        csv::parse(&response.body)
    }
}

/// Unwrap known nested envelopes down to the record array.
///
/// Recognized shapes, tried in order:
/// - `{result: {records: [...]}}` (CKAN datastore)
/// - `{success: true, result: [...]}` / `{success: true, result: {records: [...]}}`
/// - a bare top-level array
pub fn unwrap_envelope(payload: Value) -> Result<Vec<Value>, FetchError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            let success = map.get("success").and_then(Value::as_bool) == Some(true);
            match map.remove("result") {
                Some(Value::Object(mut result)) => match result.remove("records") {
                    Some(Value::Array(items)) => Ok(items),
                    _ => Err(FetchError::InvalidPayload(
                        "result object has no records array".to_string(),
                    )),
                },
                Some(Value::Array(items)) if success => Ok(items),
                _ => Err(FetchError::InvalidPayload(
                    "expected a record array or a known envelope".to_string(),
                )),
            }
        }
        _ => Err(FetchError::InvalidPayload(
            "expected a record array or a known envelope".to_string(),
        )),
    }
}

/// Project each raw item down to exactly the three configured fields.
///
/// Value strings that look numeric are coerced to numbers; items missing
/// any of the three fields are dropped.
pub fn project_records(
    items: Vec<Value>,
    row_field: &str,
    col_field: &str,
    value_field: &str,
) -> Vec<Record> {
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(map) = item else { continue };
        let (Some(row), Some(col), Some(value)) =
            (map.get(row_field), map.get(col_field), map.get(value_field))
        else {
            continue;
        };

        let value = match value {
            Value::String(s) => match coerce_numeric(s) {
                Some(n) => Value::from(n),
                None => value.clone(),
            },
            other => other.clone(),
        };

        let mut record = Record::new();
        record.insert(row_field.to_string(), row.clone());
        record.insert(col_field.to_string(), col.clone());
        record.insert(value_field.to_string(), value);
        records.push(record);
    }
    records
}
