//! reqwest-backed provider for external feeds.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{DataSourceProvider, HttpResponse, ProviderError, ProviderResult};
use crate::model::Record;

/// Provider that serves HTTP fetches and nothing else.
pub struct HttpProvider {
    client: reqwest::Client,
}

impl HttpProvider {
    /// Build a client with a whole-request timeout.
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap a pre-configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceProvider for HttpProvider {
    async fn run_query(&self, _sql: &str) -> ProviderResult<Vec<Record>> {
        Err(ProviderError::Unsupported("run_query"))
    }

    async fn http_get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> ProviderResult<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(url, status, bytes = body.len(), "external fetch completed");

        Ok(HttpResponse { status, body })
    }
}
