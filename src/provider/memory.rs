//! In-memory fixture provider.
//!
//! Serves canned query results and URL responses. Used throughout the test
//! suite and handy for demos that should not touch a real database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{DataSourceProvider, HttpResponse, ProviderError, ProviderResult};
use crate::model::Record;

/// Canned responses keyed by exact query text / URL.
#[derive(Default)]
pub struct MemoryProvider {
    queries: Mutex<HashMap<String, Vec<Record>>>,
    responses: Mutex<HashMap<String, HttpResponse>>,
    /// Fallback rows returned for any query without an exact match.
    default_rows: Mutex<Option<Vec<Record>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register rows for one exact query string.
    pub fn with_query(self, sql: impl Into<String>, rows: Vec<Record>) -> Self {
        self.queries
            .lock()
            .expect("fixture map poisoned")
            .insert(sql.into(), rows);
        self
    }

    /// Register rows returned for any query without an exact match.
    ///
    /// Keeps validator probe fixtures short: the probes wrap the stored
    /// query in derived SELECTs that tests rarely want to spell out.
    pub fn with_default_rows(self, rows: Vec<Record>) -> Self {
        *self.default_rows.lock().expect("fixture map poisoned") = Some(rows);
        self
    }

    /// Register a response for one URL.
    pub fn with_response(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.responses.lock().expect("fixture map poisoned").insert(
            url.into(),
            HttpResponse {
                status,
                body: body.into(),
            },
        );
        self
    }
}

#[async_trait]
impl DataSourceProvider for MemoryProvider {
    async fn run_query(&self, sql: &str) -> ProviderResult<Vec<Record>> {
        if let Some(rows) = self.queries.lock().expect("fixture map poisoned").get(sql) {
            return Ok(rows.clone());
        }
        if let Some(rows) = self
            .default_rows
            .lock()
            .expect("fixture map poisoned")
            .clone()
        {
            return Ok(rows);
        }
        Err(ProviderError::Query(format!("no fixture for query: {sql}")))
    }

    async fn http_get(
        &self,
        url: &str,
        _headers: &[(String, String)],
    ) -> ProviderResult<HttpResponse> {
        self.responses
            .lock()
            .expect("fixture map poisoned")
            .get(url)
            .cloned()
            .ok_or(ProviderError::Unsupported("no fixture for url"))
    }
}
