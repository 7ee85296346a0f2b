use crate::filter::FilterSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart kinds understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Scatter,
    Pie,
    Area,
    Heatmap,
    Doughnut,
    Bubble,
    Box,
    Venn,
    Contour,
    Table,
}

impl ChartKind {
    pub const ALL: [ChartKind; 12] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Scatter,
        ChartKind::Pie,
        ChartKind::Area,
        ChartKind::Heatmap,
        ChartKind::Doughnut,
        ChartKind::Bubble,
        ChartKind::Box,
        ChartKind::Venn,
        ChartKind::Contour,
        ChartKind::Table,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Pie => "pie",
            ChartKind::Area => "area",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Doughnut => "doughnut",
            ChartKind::Bubble => "bubble",
            ChartKind::Box => "box",
            ChartKind::Venn => "venn",
            ChartKind::Contour => "contour",
            ChartKind::Table => "table",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown chart kind '{}'", s))
    }
}

/// Reducer applied to each group in the grouped-aggregate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    #[serde(alias = "mean")]
    Avg,
    Min,
    Max,
    Count,
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "avg" | "mean" => Ok(Aggregation::Avg),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "count" => Ok(Aggregation::Count),
            _ => Err(format!("unknown aggregation '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    None,
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(SortOrder::None),
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            _ => Err(format!("unknown sort order '{}'", s)),
        }
    }
}

/// Everything the engine needs to turn rows into plotting records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub x_axis_key: Option<String>,
    pub y_axis_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_axis_key: Option<String>,
    pub aggregation: Aggregation,
    pub sort_order: SortOrder,
    #[serde(skip_serializing_if = "FilterSet::is_empty")]
    pub filters: FilterSet,
}

impl ChartConfig {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn with_x(mut self, column: impl Into<String>) -> Self {
        self.x_axis_key = Some(column.into());
        self
    }

    pub fn with_y(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.y_axis_keys.contains(&column) {
            self.y_axis_keys.push(column);
        }
        self
    }

    pub fn with_z(mut self, column: impl Into<String>) -> Self {
        self.z_axis_key = Some(column.into());
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_sort(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The x key, ignoring an empty string.
    pub fn x_key(&self) -> Option<&str> {
        self.x_axis_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn first_y_key(&self) -> Option<&str> {
        self.y_axis_keys.first().map(String::as_str).filter(|k| !k.is_empty())
    }

    pub fn z_key(&self) -> Option<&str> {
        self.z_axis_key.as_deref().filter(|k| !k.is_empty())
    }
}
