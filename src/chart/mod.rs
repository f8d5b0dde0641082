//! Chart-ready series mapping.
//!
//! Turns a [`PivotMatrix`] into render payloads: a heat-map view for
//! table-style rendering, or labeled datasets for bar/pie/line widgets.
//! When every cell shares a single column key ("static column collapse"),
//! categorical charts use row keys alone as labels and borrow the sole
//! column key as the dataset label.

use uuid::Uuid;

use crate::color::{format_number, interpolate, Legend, Rgb};
use crate::model::{ChartType, DEFAULT_COLOR_MAX, DEFAULT_COLOR_MIN};
use crate::pivot::PivotMatrix;

/// Fixed categorical palette for pie slices, cycled by point index.
const PIE_PALETTE: [Rgb; 8] = [
    Rgb { r: 59, g: 130, b: 246 },  // blue
    Rgb { r: 16, g: 185, b: 129 },  // green
    Rgb { r: 245, g: 158, b: 11 },  // yellow
    Rgb { r: 239, g: 68, b: 68 },   // red
    Rgb { r: 139, g: 92, b: 246 },  // purple
    Rgb { r: 236, g: 72, b: 153 },  // pink
    Rgb { r: 20, g: 184, b: 166 },  // teal
    Rgb { r: 251, g: 146, b: 60 },  // orange
];

/// Fixed palette for line series, cycled by row index.
const LINE_PALETTE: [Rgb; 6] = [
    Rgb { r: 59, g: 130, b: 246 },  // blue
    Rgb { r: 16, g: 185, b: 129 },  // green
    Rgb { r: 245, g: 158, b: 11 },  // yellow
    Rgb { r: 239, g: 68, b: 68 },   // red
    Rgb { r: 139, g: 92, b: 246 },  // purple
    Rgb { r: 236, g: 72, b: 153 },  // pink
];

/// One series of a categorical chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
    /// Per-point fill colors (bar/pie) or a single repeated series color
    /// (line).
    pub colors: Vec<String>,
    pub border_color: String,
}

/// A chart-ready payload for bar, pie, and line widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    /// Unique element id for embedding, one per render.
    pub chart_id: String,
    pub kind: ChartType,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.datasets.iter().all(|d| d.data.is_empty())
    }
}

/// The abstract heat-map render payload.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapView {
    pub title: String,
    pub row_keys: Vec<String>,
    pub col_keys: Vec<String>,
    pub legend: Legend,
    color_min: String,
    color_max: String,
    matrix: PivotMatrix,
}

impl HeatmapView {
    pub fn new(matrix: PivotMatrix, title: &str, color_min: &str, color_max: &str) -> Self {
        Self {
            title: title.to_string(),
            row_keys: matrix.row_keys.clone(),
            col_keys: matrix.col_keys.clone(),
            legend: Legend::new(color_min, color_max, matrix.min_value, matrix.max_value),
            color_min: color_min.to_string(),
            color_max: color_max.to_string(),
            matrix,
        }
    }

    /// Cell value; absent combinations read as 0.0.
    pub fn value(&self, row: &str, col: &str) -> f64 {
        self.matrix.value(row, col)
    }

    /// Interpolated background color for one cell.
    pub fn color(&self, row: &str, col: &str) -> String {
        interpolate(
            &self.color_min,
            &self.color_max,
            self.matrix.min_value,
            self.matrix.max_value,
            self.matrix.value(row, col),
        )
    }

    /// Abbreviated display label for one cell.
    pub fn cell_label(&self, row: &str, col: &str) -> String {
        format_number(self.matrix.value(row, col))
    }
}

/// Distinct keys and value range, for building filter UIs.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicerSummary {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    pub min_value: f64,
    pub max_value: f64,
}

/// Summarize a matrix for slicer controls.
pub fn slicer_summary(matrix: &PivotMatrix) -> SlicerSummary {
    SlicerSummary {
        rows: matrix.row_keys.clone(),
        cols: matrix.col_keys.clone(),
        min_value: if matrix.min_value <= matrix.max_value {
            matrix.min_value
        } else {
            0.0
        },
        max_value: if matrix.min_value <= matrix.max_value {
            matrix.max_value
        } else {
            0.0
        },
    }
}

/// Whether the column-key set collapses to a single value.
fn static_column(matrix: &PivotMatrix) -> Option<&str> {
    match matrix.col_keys.as_slice() {
        [only] => Some(only.as_str()),
        _ => None,
    }
}

/// Labels and values over the cells that actually appeared, row-major.
fn present_points(matrix: &PivotMatrix) -> Vec<(String, f64)> {
    let collapse = static_column(matrix).map(str::to_string);
    let mut points = Vec::new();
    for row in &matrix.row_keys {
        for col in &matrix.col_keys {
            if !matrix.has_cell(row, col) {
                continue;
            }
            let label = match &collapse {
                Some(_) => row.clone(),
                None => format!("{row} / {col}"),
            };
            points.push((label, matrix.value(row, col)));
        }
    }
    points
}

/// Build the chart payload for `kind`.
///
/// Heat maps are not built here (use [`HeatmapView`]); passing
/// [`ChartType::Heatmap`] falls back to a bar mapping.
pub fn build(matrix: &PivotMatrix, kind: ChartType, color_min: &str, color_max: &str) -> ChartData {
    match kind {
        ChartType::Pie => build_pie(matrix),
        ChartType::Line => build_line(matrix),
        ChartType::Bar | ChartType::Heatmap => build_bar(matrix, color_min, color_max),
    }
}

fn chart_id() -> String {
    format!("heatgrid-chart-{}", Uuid::new_v4().simple())
}

/// One flat series; point colors walk the heat-map gradient by point
/// index, not by value.
fn build_bar(matrix: &PivotMatrix, color_min: &str, color_max: &str) -> ChartData {
    let points = present_points(matrix);
    let label = static_column(matrix)
        .unwrap_or("Values")
        .to_string();

    let lo = Rgb::parse_or(color_min, DEFAULT_COLOR_MIN);
    let hi = Rgb::parse_or(color_max, DEFAULT_COLOR_MAX);
    let count = points.len();
    let colors: Vec<String> = (0..count)
        .map(|i| {
            let t = if count > 1 {
                i as f64 / (count - 1) as f64
            } else {
                0.0
            };
            lo.lerp(hi, t).to_rgba(0.7)
        })
        .collect();

    let (labels, data): (Vec<_>, Vec<_>) = points.into_iter().unzip();
    ChartData {
        chart_id: chart_id(),
        kind: ChartType::Bar,
        labels,
        datasets: vec![ChartDataset {
            label,
            data,
            colors,
            border_color: hi.to_hex(),
        }],
    }
}

/// One flat series; zero and negative values are meaningless as slices and
/// are skipped. Colors cycle the fixed 8-color palette.
fn build_pie(matrix: &PivotMatrix) -> ChartData {
    let points: Vec<(String, f64)> = present_points(matrix)
        .into_iter()
        .filter(|(_, v)| *v > 0.0)
        .collect();

    let colors: Vec<String> = (0..points.len())
        .map(|i| PIE_PALETTE[i % PIE_PALETTE.len()].to_rgba(0.8))
        .collect();

    let (labels, data): (Vec<_>, Vec<_>) = points.into_iter().unzip();
    ChartData {
        chart_id: chart_id(),
        kind: ChartType::Pie,
        labels,
        datasets: vec![ChartDataset {
            label: String::new(),
            data,
            colors,
            border_color: "#ffffff".to_string(),
        }],
    }
}

/// One series per row key over the shared column axis; absent cells plot
/// as 0.0. Series colors cycle the fixed 6-color palette by row index.
fn build_line(matrix: &PivotMatrix) -> ChartData {
    let labels = matrix.col_keys.clone();
    let datasets: Vec<ChartDataset> = matrix
        .row_keys
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let color = LINE_PALETTE[idx % LINE_PALETTE.len()];
            let data: Vec<f64> = matrix
                .col_keys
                .iter()
                .map(|col| matrix.value(row, col))
                .collect();
            ChartDataset {
                label: row.clone(),
                data,
                colors: vec![color.to_rgba(0.1); matrix.col_keys.len()],
                border_color: color.to_rgba(1.0),
            }
        })
        .collect();

    ChartData {
        chart_id: chart_id(),
        kind: ChartType::Line,
        labels,
        datasets,
    }
}
