//! DataSourceProvider trait definition.
//!
//! The provider abstracts the two kinds of I/O the pipeline performs:
//! executing a read-only query against the relational source, and fetching
//! an external document over HTTP. It is always passed in explicitly,
//! never ambient, so every stage stays testable against fixtures.

use async_trait::async_trait;

use crate::model::Record;

mod http;
mod memory;
mod sqlite;

pub use http::HttpProvider;
pub use memory::MemoryProvider;
pub use sqlite::SqliteProvider;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur at the provider boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// SQLite driver error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Transport-level HTTP failure (connect, TLS, timeout).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine rejected the query; carries the engine's message.
    #[error("query failed: {0}")]
    Query(String),

    /// This backend does not implement the requested operation.
    #[error("operation not supported by this provider: {0}")]
    Unsupported(&'static str),
}

impl ProviderError {
    /// Whether this failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Http(e) if e.is_timeout())
    }
}

/// A fetched HTTP document.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstracts query execution and external fetches.
///
/// Implementations must be cheap to share across concurrent renders; the
/// pipeline never mutates provider state.
#[async_trait]
pub trait DataSourceProvider: Send + Sync {
    /// Execute a read-only query and return its rows as flat records.
    async fn run_query(&self, sql: &str) -> ProviderResult<Vec<Record>>;

    /// Fetch a document over HTTP GET with the given headers.
    async fn http_get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> ProviderResult<HttpResponse>;
}
