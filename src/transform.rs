use crate::chart::{Aggregation, ChartConfig, ChartKind, SortOrder};
use crate::data::{cell, try_numeric, Cell, Row};
use crate::quantile::five_number;
use crate::record::{
    AggregateRecord, BoxRecord, FrequencyCell, OverlapRecord, PlottingRecord, PointRecord,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;

/// Most distinct (x, y) pairs a heatmap or contour result carries.
pub const HEATMAP_LIMIT: usize = 500;
/// Most points a scatter or bubble result carries.
pub const SCATTER_LIMIT: usize = 1000;
/// Most groups a grouped-aggregate result carries.
pub const GROUP_LIMIT: usize = 100;
/// Bubble size used when no z column is configured or the value is not numeric.
pub const DEFAULT_BUBBLE_SIZE: f64 = 100.0;

/// Why a result came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    MissingXAxis,
    MissingYAxis,
    NoRowsAfterFilter,
    NoPlottableValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transformed {
    pub records: Vec<PlottingRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,
}

impl Transformed {
    fn empty(reason: EmptyReason) -> Self {
        Self {
            records: Vec::new(),
            reason: Some(reason),
        }
    }
}

/// Main entry point: turn rows into plotting records for one chart.
///
/// Pure and infallible. Incomplete configuration and unusable values produce
/// an empty (or shorter) result rather than an error.
pub fn transform(rows: &[Row], config: &ChartConfig) -> Vec<PlottingRecord> {
    transform_with_reason(rows, config).records
}

/// Same as [`transform`], but also reports why an empty result is empty.
pub fn transform_with_reason(rows: &[Row], config: &ChartConfig) -> Transformed {
    let Some(x_key) = config.x_key() else {
        return Transformed::empty(EmptyReason::MissingXAxis);
    };

    // 1. Filter
    let rows = config.filters.apply(rows);

    // 2. Dispatch by chart kind
    let y_key = config.first_y_key();
    let records = match config.kind {
        ChartKind::Heatmap | ChartKind::Contour => match y_key {
            Some(y_key) => frequency_cells(&rows, x_key, y_key),
            None => return Transformed::empty(EmptyReason::MissingYAxis),
        },
        ChartKind::Venn => overlap_counts(&rows, x_key, y_key),
        ChartKind::Box => match y_key {
            Some(y_key) => box_summaries(&rows, x_key, y_key),
            None => return Transformed::empty(EmptyReason::MissingYAxis),
        },
        ChartKind::Scatter | ChartKind::Bubble => match y_key {
            Some(y_key) => points(&rows, x_key, y_key, config.z_key()),
            None => return Transformed::empty(EmptyReason::MissingYAxis),
        },
        ChartKind::Bar
        | ChartKind::Line
        | ChartKind::Pie
        | ChartKind::Area
        | ChartKind::Doughnut
        | ChartKind::Table => aggregate_groups(&rows, x_key, config),
    };

    tracing::debug!(
        kind = %config.kind,
        rows = rows.len(),
        records = records.len(),
        "transformed chart data"
    );

    let reason = if !records.is_empty() {
        None
    } else if rows.is_empty() {
        Some(EmptyReason::NoRowsAfterFilter)
    } else {
        Some(EmptyReason::NoPlottableValues)
    };

    Transformed { records, reason }
}

// =============================================================================
// Heatmap / contour: pairwise frequency table
// =============================================================================

fn frequency_cells(rows: &[&Row], x_key: &str, y_key: &str) -> Vec<PlottingRecord> {
    let mut counts: IndexMap<(String, String), u64> = IndexMap::new();
    for row in rows {
        let key = (cell(row, x_key).label(), cell(row, y_key).label());
        *counts.entry(key).or_default() += 1;
    }

    counts
        .into_iter()
        .take(HEATMAP_LIMIT)
        .map(|((x, y), value)| PlottingRecord::Cell(FrequencyCell { x, y, value }))
        .collect()
}

// =============================================================================
// Venn: set-membership tally over two columns
// =============================================================================

/// Null, false, zero, empty string and missing all count as absent.
fn is_present(value: &Cell) -> bool {
    match value {
        Cell::Null => false,
        Cell::Bool(b) => *b,
        Cell::Num(n) => *n != 0.0 && !n.is_nan(),
        Cell::Str(s) => !s.is_empty(),
    }
}

/// Set B is the first y column. Without one, every row is absent from B.
fn overlap_counts(rows: &[&Row], a_key: &str, b_key: Option<&str>) -> Vec<PlottingRecord> {
    let mut only_a = 0u64;
    let mut only_b = 0u64;
    let mut both = 0u64;

    for row in rows {
        let in_b = b_key.map_or(false, |key| is_present(cell(row, key)));
        match (is_present(cell(row, a_key)), in_b) {
            (true, true) => both += 1,
            (true, false) => only_a += 1,
            (false, true) => only_b += 1,
            (false, false) => {}
        }
    }

    let b_name = b_key.unwrap_or_default();
    vec![
        PlottingRecord::Overlap(OverlapRecord {
            sets: vec![a_key.to_string()],
            size: only_a,
        }),
        PlottingRecord::Overlap(OverlapRecord {
            sets: vec![b_name.to_string()],
            size: only_b,
        }),
        PlottingRecord::Overlap(OverlapRecord {
            sets: vec![a_key.to_string(), b_name.to_string()],
            size: both,
        }),
    ]
}

// =============================================================================
// Box plot: five-number summary per x group
// =============================================================================

fn box_summaries(rows: &[&Row], x_key: &str, y_key: &str) -> Vec<PlottingRecord> {
    let mut groups: IndexMap<String, Vec<f64>> = IndexMap::new();
    for row in rows {
        // Groups only come into existence with a valid value, so empty groups never appear.
        if let Some(y) = try_numeric(cell(row, y_key)) {
            groups.entry(cell(row, x_key).label()).or_default().push(y);
        }
    }

    groups
        .into_iter()
        .filter_map(|(name, mut values)| {
            five_number(&mut values).map(|s| {
                PlottingRecord::Box(BoxRecord {
                    name,
                    min: s.min,
                    q1: s.q1,
                    median: s.median,
                    q3: s.q3,
                    max: s.max,
                })
            })
        })
        .collect()
}

// =============================================================================
// Scatter / bubble: raw points
// =============================================================================

fn points(rows: &[&Row], x_key: &str, y_key: &str, z_key: Option<&str>) -> Vec<PlottingRecord> {
    rows.iter()
        .filter_map(|row| {
            let x = try_numeric(cell(row, x_key))?;
            let y = try_numeric(cell(row, y_key))?;
            let z = z_key
                .and_then(|k| try_numeric(cell(row, k)))
                .map(f64::abs)
                .unwrap_or(DEFAULT_BUBBLE_SIZE);
            Some(PlottingRecord::Point(PointRecord { x, y, z }))
        })
        .take(SCATTER_LIMIT)
        .collect()
}

// =============================================================================
// Default: grouped aggregation
// =============================================================================

/// Field name used for the row count when no y keys are configured.
pub const COUNT_FIELD: &str = "count";

#[derive(Debug, Clone, Default)]
struct Accumulator {
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn observe(&mut self, value: f64) {
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }
}

#[derive(Debug, Clone)]
struct GroupStats {
    rows: u64,
    per_key: Vec<Accumulator>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn reduce(acc: &Accumulator, rows: u64, aggregation: Aggregation) -> f64 {
    match aggregation {
        Aggregation::Sum => acc.sum,
        Aggregation::Avg => {
            if rows == 0 {
                0.0
            } else {
                round2(acc.sum / rows as f64)
            }
        }
        Aggregation::Min => acc.min.unwrap_or(0.0),
        Aggregation::Max => acc.max.unwrap_or(0.0),
        Aggregation::Count => rows as f64,
    }
}

fn aggregate_groups(rows: &[&Row], x_key: &str, config: &ChartConfig) -> Vec<PlottingRecord> {
    let y_keys = &config.y_axis_keys;
    let mut groups: IndexMap<String, GroupStats> = IndexMap::new();

    for row in rows {
        let stats = groups
            .entry(cell(row, x_key).label())
            .or_insert_with(|| GroupStats {
                rows: 0,
                per_key: vec![Accumulator::default(); y_keys.len()],
            });
        stats.rows += 1;
        for (acc, key) in stats.per_key.iter_mut().zip(y_keys) {
            if let Some(value) = try_numeric(cell(row, key)) {
                acc.observe(value);
            }
        }
    }

    let mut records: Vec<AggregateRecord> = groups
        .into_iter()
        .map(|(name, stats)| {
            let mut values = IndexMap::with_capacity(y_keys.len().max(1));
            if y_keys.is_empty() {
                values.insert(COUNT_FIELD.to_string(), stats.rows as f64);
            } else {
                for (key, acc) in y_keys.iter().zip(&stats.per_key) {
                    values.insert(key.clone(), reduce(acc, stats.rows, config.aggregation));
                }
            }
            AggregateRecord { name, values }
        })
        .collect();

    match config.sort_order {
        SortOrder::Ascending => records.sort_by(|a, b| compare_values(a, b)),
        SortOrder::Descending => records.sort_by(|a, b| compare_values(b, a)),
        SortOrder::None => records.sort_by(|a, b| compare_names(&a.name, &b.name)),
    }

    records.truncate(GROUP_LIMIT);
    records.into_iter().map(PlottingRecord::Aggregate).collect()
}

fn primary_value(record: &AggregateRecord) -> f64 {
    record.values.values().next().copied().unwrap_or(0.0)
}

fn compare_values(a: &AggregateRecord, b: &AggregateRecord) -> Ordering {
    primary_value(a)
        .partial_cmp(&primary_value(b))
        .unwrap_or(Ordering::Equal)
}

fn parse_label(label: &str) -> Option<f64> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric order when both names parse as numbers, locale-style order otherwise.
fn compare_names(a: &str, b: &str) -> Ordering {
    match (parse_label(a), parse_label(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => locale_compare(a, b),
    }
}

/// Case-insensitive first, then lowercase before uppercase for otherwise equal text.
fn locale_compare(a: &str, b: &str) -> Ordering {
    let primary = a.to_lowercase().cmp(&b.to_lowercase());
    if primary != Ordering::Equal {
        return primary;
    }
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            return match (ca.is_lowercase(), cb.is_lowercase()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => ca.cmp(&cb),
            };
        }
    }
    a.len().cmp(&b.len())
}
