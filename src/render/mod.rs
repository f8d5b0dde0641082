//! Render pipeline orchestration.
//!
//! One synchronous pass per render: load the definition, re-validate its
//! query, fetch, pivot, map. "Not found", "disabled", and "no data" are
//! explicit outcome variants the renderer must check, not errors; only
//! store I/O surfaces as `Err`.
//!
//! There is deliberately no result cache: identical concurrent renders
//! redo the work, which keeps renders fully independent.

use tracing::debug;

use crate::chart::{self, ChartData, HeatmapView, SlicerSummary};
use crate::config::Settings;
use crate::export::{self, ExportError};
use crate::fetch::{DataFetcher, FetchError};
use crate::model::{Capabilities, ChartType, DataSourceType, GraphDefinition};
use crate::pivot::{pivot, PivotLimits};
use crate::provider::DataSourceProvider;
use crate::store::{DefinitionStore, StoreError};
use crate::validate::{QueryValidator, ValidationError};

/// Per-render options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Authenticated preview renders disabled definitions too.
    pub preview: bool,
    /// Display-window truncation of sorted row keys (0 = unlimited).
    pub max_rows: usize,
    /// Display-window truncation of sorted column keys (0 = unlimited).
    pub max_cols: usize,
}

impl RenderOptions {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn preview(max_rows: usize, max_cols: usize) -> Self {
        Self {
            preview: true,
            max_rows,
            max_cols,
        }
    }

    fn limits(&self) -> PivotLimits {
        PivotLimits::new(self.max_rows, self.max_cols)
    }
}

/// What one render produced. Sentinel states are variants, not errors.
#[derive(Debug)]
pub enum RenderOutcome {
    /// No definition with that id.
    NotFound,
    /// Definition exists but is disabled and this is not a preview.
    Disabled,
    /// The stored query no longer passes validation.
    Invalid { errors: Vec<ValidationError> },
    /// The capability set does not cover this definition.
    CapabilityRequired { feature: &'static str },
    /// Fetch failed; nothing partial is returned.
    Failed { error: FetchError },
    /// The source produced no records.
    NoData,
    /// A heat-map payload.
    Heatmap(HeatmapView),
    /// A bar/pie/line payload.
    Chart(ChartData),
}

/// The composed query-to-visualization pipeline.
///
/// Everything is injected: the store is read-only during render, the
/// provider carries all I/O, and the capability set replaces any global
/// feature gating.
pub struct Pipeline<'a, P: DataSourceProvider> {
    store: &'a DefinitionStore,
    provider: &'a P,
    settings: Settings,
    capabilities: Capabilities,
    validator: QueryValidator,
    fetcher: DataFetcher,
}

impl<'a, P: DataSourceProvider> Pipeline<'a, P> {
    pub fn new(
        store: &'a DefinitionStore,
        provider: &'a P,
        settings: Settings,
        capabilities: Capabilities,
    ) -> Self {
        let validator = QueryValidator::new(&settings.namespace_prefix, settings.probe.timeout());
        let fetcher = DataFetcher::new(&settings.namespace_prefix, capabilities);
        Self {
            store,
            provider,
            settings,
            capabilities,
            validator,
            fetcher,
        }
    }

    /// Render one definition.
    pub async fn render(&self, id: i64, opts: &RenderOptions) -> Result<RenderOutcome, StoreError> {
        let Some(definition) = self.store.get_by_id(id)? else {
            return Ok(RenderOutcome::NotFound);
        };
        if !definition.is_enabled && !opts.preview {
            return Ok(RenderOutcome::Disabled);
        }
        if definition.chart_type != ChartType::Heatmap && !self.capabilities.charts {
            return Ok(RenderOutcome::CapabilityRequired { feature: "charts" });
        }

        // Stored queries are re-validated on every render; the schema they
        // were saved against can have changed since.
        if definition.data_source_type == DataSourceType::Sql {
            let outcome = self
                .validator
                .validate(
                    self.provider,
                    &definition.query,
                    &definition.row_field,
                    &definition.col_field,
                    &definition.value_field,
                )
                .await;
            if !outcome.is_valid {
                debug!(id, errors = outcome.errors.len(), "stored query failed validation");
                return Ok(RenderOutcome::Invalid {
                    errors: outcome.errors,
                });
            }
        }

        let records = match self.fetcher.fetch(self.provider, &definition).await {
            Ok(records) => records,
            Err(FetchError::CapabilityRequired { feature }) => {
                return Ok(RenderOutcome::CapabilityRequired { feature })
            }
            Err(error) => return Ok(RenderOutcome::Failed { error }),
        };
        if records.is_empty() {
            return Ok(RenderOutcome::NoData);
        }

        let matrix = pivot(
            &records,
            &definition.row_field,
            &definition.col_field,
            &definition.value_field,
            &opts.limits(),
        );
        if matrix.is_empty() {
            return Ok(RenderOutcome::NoData);
        }

        Ok(self.map(definition, matrix))
    }

    fn map(&self, definition: GraphDefinition, matrix: crate::pivot::PivotMatrix) -> RenderOutcome {
        match definition.chart_type {
            ChartType::Heatmap => RenderOutcome::Heatmap(HeatmapView::new(
                matrix,
                &definition.name,
                &definition.color_min,
                &definition.color_max,
            )),
            kind => RenderOutcome::Chart(chart::build(
                &matrix,
                kind,
                &definition.color_min,
                &definition.color_max,
            )),
        }
    }

    /// Distinct keys and value range for filter controls.
    ///
    /// `None` when slicers are not enabled, the definition is missing, or
    /// nothing could be fetched. Filter UIs degrade to "no filters"
    /// rather than erroring.
    pub async fn slicers(&self, id: i64) -> Result<Option<SlicerSummary>, StoreError> {
        if !self.capabilities.slicers {
            return Ok(None);
        }
        let Some(definition) = self.store.get_by_id(id)? else {
            return Ok(None);
        };
        let Ok(records) = self.fetcher.fetch(self.provider, &definition).await else {
            return Ok(None);
        };
        let matrix = pivot(
            &records,
            &definition.row_field,
            &definition.col_field,
            &definition.value_field,
            &PivotLimits::none(),
        );
        if matrix.is_empty() {
            return Ok(None);
        }
        Ok(Some(chart::slicer_summary(&matrix)))
    }

    /// Export a definition's raw records as CSV.
    pub async fn export_csv(&self, id: i64) -> Result<String, ExportError> {
        if !self.capabilities.export {
            return Err(ExportError::CapabilityRequired { feature: "export" });
        }
        let Some(definition) = self.store.get_by_id(id)? else {
            return Err(ExportError::NotFound);
        };
        let records = self.fetcher.fetch(self.provider, &definition).await?;
        if records.is_empty() {
            return Err(ExportError::NoData);
        }
        Ok(export::records_to_csv(
            &records,
            self.settings.limits.max_export_rows,
        ))
    }
}
