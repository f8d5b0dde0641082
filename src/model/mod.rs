//! Core data model: graph definitions and the records they produce.

mod definition;
mod record;

pub use definition::{
    sanitize_hex_or_default, AuthType, Capabilities, ChartType, DataSourceType, ExternalConfig,
    GraphDefinition, NewDefinition, DEFAULT_COLOR_MAX, DEFAULT_COLOR_MIN,
};
pub use record::{coerce_numeric, is_identifier, stringify, to_number, Record};
