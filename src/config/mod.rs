//! Configuration for heatgrid.
//!
//! Handles the settings file, environment variable expansion, and limits.

mod settings;

pub use settings::{
    expand_env_vars, HttpSettings, LimitSettings, ProbeSettings, Settings, SettingsError,
};
