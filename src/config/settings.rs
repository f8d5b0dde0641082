//! TOML-based configuration.
//!
//! Supports a config file (heatgrid.toml) with environment variable
//! expansion.
//!
//! Example configuration:
//! ```toml
//! namespace_prefix = "wp_"
//!
//! [http]
//! timeout_secs = 30
//!
//! [probe]
//! timeout_secs = 10
//!
//! [limits]
//! max_export_rows = 100000
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Required leading substring of every table a query may reference.
    pub namespace_prefix: String,

    /// External HTTP fetch configuration.
    pub http: HttpSettings,

    /// Validator probe configuration.
    pub probe: ProbeSettings,

    /// Output size limits.
    pub limits: LimitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace_prefix: "wp_".to_string(),
            http: HttpSettings::default(),
            probe: ProbeSettings::default(),
            limits: LimitSettings::default(),
        }
    }
}

/// HTTP client configuration for external feeds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Timeout budget for the validator's execution probes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub timeout_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Caps applied to exports.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Maximum number of records a CSV export will include.
    pub max_export_rows: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_export_rows: 100_000,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, expanding `${ENV_VAR}` references.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let expanded = expand_env_vars(&raw)?;
        let settings: Settings = toml::from_str(&expanded)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        match Self::load(&path) {
            Err(SettingsError::FileNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.namespace_prefix.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "namespace_prefix must not be empty".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 || self.probe.timeout_secs == 0 {
            return Err(SettingsError::InvalidConfig(
                "timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand `${ENV_VAR}` references in a string.
///
/// Returns an error if a referenced variable is not set.
pub fn expand_env_vars(input: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut name = String::new();
            let mut closed = false;
            for inner in chars.by_ref() {
                if inner == '}' {
                    closed = true;
                    break;
                }
                name.push(inner);
            }
            if !closed {
                return Err(SettingsError::InvalidConfig(format!(
                    "unterminated variable reference: ${{{}",
                    name
                )));
            }
            let value = env::var(&name).map_err(|_| SettingsError::MissingEnvVar(name.clone()))?;
            result.push_str(&value);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
