//! # Heatgrid
//!
//! A query-to-visualization pipeline: user-defined graph definitions are
//! validated against a restrictive safety policy, executed against a
//! relational source or an external feed, pivoted into a row×column matrix,
//! and mapped to colors or chart series.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        GraphDefinition (Definition Store, SQLite)        │
//! │  (name, source, query, row/col/value mapping, colors)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [validate]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Query Validator (policy checks + live schema probes)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [fetch]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Data Fetcher (SQL / JSON API / CSV feed → records)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [pivot]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Pivot Engine (row×column matrix + value range)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [color / chart]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Color & Series Mapper (heat-map view, bar/pie/line)    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The pipeline is synchronous per render: no shared mutable state, no
//! result cache. The only blocking I/O is the provider round-trip (query
//! execution or HTTP fetch), which carries a bounded timeout.

pub mod chart;
pub mod color;
pub mod config;
pub mod export;
pub mod fetch;
pub mod model;
pub mod pivot;
pub mod provider;
pub mod render;
pub mod store;
pub mod validate;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::chart::{ChartData, ChartDataset, HeatmapView, SlicerSummary};
    pub use crate::color::{format_number, interpolate, Legend, Rgb};
    pub use crate::config::Settings;
    pub use crate::fetch::{DataFetcher, FetchError};
    pub use crate::model::{
        AuthType, Capabilities, ChartType, DataSourceType, ExternalConfig, GraphDefinition,
        NewDefinition, Record,
    };
    pub use crate::pivot::{pivot, PivotLimits, PivotMatrix};
    pub use crate::provider::{
        DataSourceProvider, HttpProvider, HttpResponse, MemoryProvider, ProviderError,
        SqliteProvider,
    };
    pub use crate::render::{Pipeline, RenderOptions, RenderOutcome};
    pub use crate::store::{DefinitionStore, StoreError};
    pub use crate::validate::{QueryValidator, ValidationError, ValidationOutcome};
}

pub use model::{Capabilities, ChartType, DataSourceType, GraphDefinition, Record};
pub use pivot::{pivot, PivotMatrix};
pub use render::{Pipeline, RenderOutcome};
