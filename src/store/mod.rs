//! SQLite-backed definition store.
//!
//! Persists graph definitions and migrates their schema across versions.
//! The default database lives in `~/.heatgrid/definitions.db`.
//!
//! # Schema versions
//!
//! - v1: heat-map-only columns (name, query, field mapping, colors).
//! - v2: adds `data_source_type`, `chart_type`, and the `external_config`
//!   JSON column for external feeds.
//!
//! Definitions are user data, so a version mismatch migrates the table in
//! place; it never clears.

use std::path::PathBuf;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::model::{
    is_identifier, sanitize_hex_or_default, ChartType, DataSourceType, ExternalConfig,
    GraphDefinition, NewDefinition, DEFAULT_COLOR_MAX, DEFAULT_COLOR_MIN,
};

/// Current schema version. Bump when the definition table changes shape.
const SCHEMA_VERSION: i32 = 2;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to determine data directory")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid definition: {}", .0.join(" "))]
    InvalidDefinition(Vec<String>),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// SQLite-backed store of graph definitions.
pub struct DefinitionStore {
    conn: Connection,
}

impl DefinitionStore {
    /// Open or create the default database under the home directory.
    pub fn open_default() -> StoreResult<Self> {
        Self::open(Self::default_path()?)
    }

    /// Open or create a database at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Default database location.
    pub fn default_path() -> StoreResult<PathBuf> {
        let base = dirs::home_dir().ok_or(StoreError::NoDataDir)?;
        Ok(base.join(".heatgrid").join("definitions.db"))
    }

    /// Create tables and migrate older schemas in place.
    fn init(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS graph_definitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                data_source_type TEXT NOT NULL DEFAULT 'sql',
                query TEXT NOT NULL DEFAULT '',
                row_field TEXT NOT NULL,
                col_field TEXT NOT NULL,
                value_field TEXT NOT NULL,
                color_min TEXT NOT NULL DEFAULT '#f0f9e8',
                color_max TEXT NOT NULL DEFAULT '#084081',
                chart_type TEXT NOT NULL DEFAULT 'heatmap',
                is_enabled INTEGER NOT NULL DEFAULT 1,
                external_config TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_graph_definitions_enabled
                ON graph_definitions (is_enabled);

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored_version: Option<i32> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| {
                    let s: String = row.get(0)?;
                    Ok(s.parse().unwrap_or(0))
                },
            )
            .optional()?;

        match stored_version {
            Some(v) if v == SCHEMA_VERSION => {}
            Some(v) => {
                self.migrate(v)?;
                self.set_version()?;
            }
            None => {
                self.set_version()?;
            }
        }

        Ok(())
    }

    fn set_version(&self) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Upgrade an older table shape step by step.
    fn migrate(&self, from: i32) -> StoreResult<()> {
        info!(from, to = SCHEMA_VERSION, "migrating definition schema");
        if from < 2 {
            // v1 tables predate external sources and chart type selection.
            for ddl in [
                "ALTER TABLE graph_definitions ADD COLUMN data_source_type TEXT NOT NULL DEFAULT 'sql'",
                "ALTER TABLE graph_definitions ADD COLUMN chart_type TEXT NOT NULL DEFAULT 'heatmap'",
                "ALTER TABLE graph_definitions ADD COLUMN external_config TEXT",
            ] {
                match self.conn.execute(ddl, []) {
                    Ok(_) => {}
                    // column already there: fresh CREATE TABLE ran first
                    Err(e) if e.to_string().contains("duplicate column") => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }

    /// Validate and normalize the writable fields before a save.
    fn check(def: &NewDefinition) -> StoreResult<NewDefinition> {
        let mut problems = Vec::new();

        if def.name.trim().is_empty() {
            problems.push("Name is required.".to_string());
        }
        for (label, field) in [
            ("Row", &def.row_field),
            ("Column", &def.col_field),
            ("Value", &def.value_field),
        ] {
            if field.is_empty() {
                problems.push(format!("{label} field name is required."));
            } else if !is_identifier(field) {
                problems.push(format!(
                    "{label} field name '{field}' must contain only letters, digits, and underscores."
                ));
            }
        }

        match def.data_source_type {
            DataSourceType::Sql => {
                if def.query.trim().is_empty() {
                    problems.push("SQL query is required.".to_string());
                }
                if def.external_config.is_some() {
                    problems.push("SQL definitions must not carry an external config.".to_string());
                }
            }
            _ => {
                if def.external_config.is_none() {
                    problems.push("External definitions require a URL configuration.".to_string());
                }
            }
        }

        if !problems.is_empty() {
            return Err(StoreError::InvalidDefinition(problems));
        }

        let mut normalized = def.clone();
        normalized.color_min = sanitize_hex_or_default(&def.color_min, DEFAULT_COLOR_MIN);
        normalized.color_max = sanitize_hex_or_default(&def.color_max, DEFAULT_COLOR_MAX);
        Ok(normalized)
    }

    /// Insert a definition; returns its new id.
    pub fn insert(&self, def: &NewDefinition) -> StoreResult<i64> {
        let def = Self::check(def)?;
        let now = unix_now();
        let external = match &def.external_config {
            Some(cfg) => Some(serde_json::to_string(cfg)?),
            None => None,
        };
        self.conn.execute(
            "INSERT INTO graph_definitions
                (name, description, data_source_type, query,
                 row_field, col_field, value_field,
                 color_min, color_max, chart_type, is_enabled,
                 external_config, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                def.name,
                def.description,
                def.data_source_type.as_str(),
                def.query,
                def.row_field,
                def.col_field,
                def.value_field,
                def.color_min,
                def.color_max,
                def.chart_type.as_str(),
                def.is_enabled as i64,
                external,
                now,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Overwrite the writable fields of an existing definition.
    pub fn update(&self, id: i64, def: &NewDefinition) -> StoreResult<bool> {
        let def = Self::check(def)?;
        let external = match &def.external_config {
            Some(cfg) => Some(serde_json::to_string(cfg)?),
            None => None,
        };
        let rows = self.conn.execute(
            "UPDATE graph_definitions SET
                name = ?, description = ?, data_source_type = ?, query = ?,
                row_field = ?, col_field = ?, value_field = ?,
                color_min = ?, color_max = ?, chart_type = ?, is_enabled = ?,
                external_config = ?, updated_at = ?
             WHERE id = ?",
            params![
                def.name,
                def.description,
                def.data_source_type.as_str(),
                def.query,
                def.row_field,
                def.col_field,
                def.value_field,
                def.color_min,
                def.color_max,
                def.chart_type.as_str(),
                def.is_enabled as i64,
                external,
                unix_now(),
                id,
            ],
        )?;
        Ok(rows > 0)
    }

    /// Delete a definition.
    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM graph_definitions WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    /// Fetch one definition by id.
    pub fn get_by_id(&self, id: i64) -> StoreResult<Option<GraphDefinition>> {
        self.conn
            .query_row(
                "SELECT id, name, description, data_source_type, query,
                        row_field, col_field, value_field,
                        color_min, color_max, chart_type, is_enabled,
                        external_config, created_at, updated_at
                 FROM graph_definitions WHERE id = ?",
                params![id],
                row_to_definition,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All definitions, most recently updated first.
    pub fn list(&self) -> StoreResult<Vec<GraphDefinition>> {
        self.query_many(
            "SELECT id, name, description, data_source_type, query,
                    row_field, col_field, value_field,
                    color_min, color_max, chart_type, is_enabled,
                    external_config, created_at, updated_at
             FROM graph_definitions ORDER BY updated_at DESC, id DESC",
        )
    }

    /// Only definitions enabled for public rendering.
    pub fn list_enabled(&self) -> StoreResult<Vec<GraphDefinition>> {
        self.query_many(
            "SELECT id, name, description, data_source_type, query,
                    row_field, col_field, value_field,
                    color_min, color_max, chart_type, is_enabled,
                    external_config, created_at, updated_at
             FROM graph_definitions WHERE is_enabled = 1
             ORDER BY updated_at DESC, id DESC",
        )
    }

    fn query_many(&self, sql: &str) -> StoreResult<Vec<GraphDefinition>> {
        let mut stmt = self.conn.prepare(sql)?;
        let defs = stmt
            .query_map([], row_to_definition)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(defs)
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn row_to_definition(row: &Row<'_>) -> rusqlite::Result<GraphDefinition> {
    let id: i64 = row.get(0)?;
    let source_raw: String = row.get(3)?;
    let chart_raw: String = row.get(10)?;
    let external_raw: Option<String> = row.get(12)?;

    // Unknown enum text and malformed JSON mean a corrupt row; surface it
    // through rusqlite's conversion error so callers see which row broke.
    let invalid = |msg: String| {
        rusqlite::Error::FromSqlConversionFailure(
            id as usize,
            rusqlite::types::Type::Text,
            msg.into(),
        )
    };

    let data_source_type = DataSourceType::from_str(&source_raw)
        .ok_or_else(|| invalid(format!("unknown data_source_type '{source_raw}'")))?;
    let chart_type = ChartType::from_str(&chart_raw)
        .ok_or_else(|| invalid(format!("unknown chart_type '{chart_raw}'")))?;
    let external_config: Option<ExternalConfig> = match external_raw {
        Some(json) => Some(
            serde_json::from_str(&json)
                .map_err(|e| invalid(format!("bad external_config: {e}")))?,
        ),
        None => None,
    };

    Ok(GraphDefinition {
        id,
        name: row.get(1)?,
        description: row.get(2)?,
        data_source_type,
        query: row.get(4)?,
        row_field: row.get(5)?,
        col_field: row.get(6)?,
        value_field: row.get(7)?,
        color_min: row.get(8)?,
        color_max: row.get(9)?,
        chart_type,
        is_enabled: row.get::<_, i64>(11)? != 0,
        external_config,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}
