//! SQLite-backed provider.
//!
//! Runs queries against an in-process SQLite database. Used in tests and in
//! deployments whose source data lives in SQLite; other engines implement
//! [`DataSourceProvider`] directly.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

use super::{DataSourceProvider, HttpResponse, ProviderError, ProviderResult};
use crate::model::Record;

/// Provider over a single SQLite connection.
pub struct SqliteProvider {
    conn: Mutex<Connection>,
}

impl SqliteProvider {
    /// Open a database file.
    pub fn open(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> ProviderResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run a statement that returns no rows (schema setup in tests).
    pub fn execute_batch(&self, sql: &str) -> ProviderResult<()> {
        let conn = self.conn.lock().expect("sqlite connection poisoned");
        conn.execute_batch(sql)?;
        Ok(())
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

#[async_trait]
impl DataSourceProvider for SqliteProvider {
    async fn run_query(&self, sql: &str) -> ProviderResult<Vec<Record>> {
        let conn = self.conn.lock().expect("sqlite connection poisoned");
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| ProviderError::Query(e.to_string()))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt
            .query([])
            .map_err(|e| ProviderError::Query(e.to_string()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(|e| ProviderError::Query(e.to_string()))? {
            let mut record = Record::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| ProviderError::Query(e.to_string()))?;
                record.insert(name.clone(), value_to_json(value));
            }
            records.push(record);
        }
        Ok(records)
    }

    async fn http_get(
        &self,
        _url: &str,
        _headers: &[(String, String)],
    ) -> ProviderResult<HttpResponse> {
        Err(ProviderError::Unsupported("http_get"))
    }
}
