use crate::dataset::Dataset;
use crate::field::{FieldType, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart styles the projector can feed.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Pie,
    Area,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Area => "area",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            "pie" => Ok(ChartKind::Pie),
            "area" => Ok(ChartKind::Area),
            other => Err(format!("Unknown chart type: {}", other)),
        }
    }
}

/// What to plot. Not persisted with the dataset.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type", default)]
    pub kind: ChartKind,
    #[serde(default)]
    pub x_axis: Option<String>,
    #[serde(default)]
    pub y_axis: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ChartConfig {
    pub fn new(kind: ChartKind) -> Self {
        ChartConfig {
            kind,
            ..Default::default()
        }
    }

    pub fn with_x_axis(mut self, field_name: &str) -> Self {
        self.x_axis = Some(field_name.to_string());
        self
    }

    pub fn with_y_axis(mut self, field_name: &str) -> Self {
        self.y_axis.push(field_name.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Y-axis names that do not refer to a `number` field; they plot as zero.
    pub fn non_numeric_y<'a>(&'a self, dataset: &Dataset) -> Vec<&'a str> {
        self.y_axis
            .iter()
            .filter(|name| !is_numeric_field(dataset, name))
            .map(String::as_str)
            .collect()
    }
}

/// One x position with a value per series, in series order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
}

/// Projected data ready for a charting backend.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChartData {
    pub kind: ChartKind,
    pub title: Option<String>,
    /// Series names, i.e. the configured y-axis fields.
    pub series: Vec<String>,
    pub points: Vec<ChartPoint>,
    /// Filled for pie charts only.
    pub slices: Vec<PieSlice>,
}

impl ChartData {
    /// Nothing to draw; callers show an empty-state placeholder.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn is_numeric_field(dataset: &Dataset, name: &str) -> bool {
    dataset
        .field_by_name(name)
        .is_some_and(|f| f.field_type == FieldType::Number)
}

/// Label of the point for `row`: the x-axis value when set and non-empty,
/// otherwise `Row N` (1-based).
pub fn point_label(row: &Row, index: usize, x_axis: Option<&str>) -> String {
    x_axis
        .and_then(|name| row.get(name))
        .map(|value| value.to_string())
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| format!("Row {}", index + 1))
}

/// Numeric reading of one series for one row; 0 when missing or when the
/// series does not refer to a `number` field.
pub fn series_value(dataset: &Dataset, row: &Row, field_name: &str) -> f64 {
    if !is_numeric_field(dataset, field_name) {
        return 0.0;
    }
    row.get(field_name).map(|v| v.as_number()).unwrap_or(0.0)
}

/// Map the dataset onto plot points, one per row in row order.
pub fn project(dataset: &Dataset, config: &ChartConfig) -> ChartData {
    let mut data = ChartData {
        kind: config.kind,
        title: config.title.clone(),
        series: config.y_axis.clone(),
        points: Vec::new(),
        slices: Vec::new(),
    };

    if config.y_axis.is_empty() {
        return data;
    }

    data.points = dataset
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| ChartPoint {
            label: point_label(row, index, config.x_axis.as_deref()),
            values: config
                .y_axis
                .iter()
                .map(|name| series_value(dataset, row, name))
                .collect(),
        })
        .collect();

    if config.kind == ChartKind::Pie {
        data.slices = pie_slices(&data);
    }
    data
}

/// Slices for a pie chart: one per row for a single series, otherwise one
/// per series holding the sum over all rows.
pub fn pie_slices(data: &ChartData) -> Vec<PieSlice> {
    match data.series.len() {
        0 => Vec::new(),
        1 => data
            .points
            .iter()
            .map(|point| PieSlice {
                label: point.label.clone(),
                value: point.values.first().copied().unwrap_or(0.0),
            })
            .collect(),
        _ => data
            .series
            .iter()
            .enumerate()
            .map(|(i, name)| PieSlice {
                label: name.clone(),
                value: data.points.iter().map(|p| p.values[i]).sum(),
            })
            .collect(),
    }
}
