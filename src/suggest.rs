use crate::chart::{Aggregation, ChartConfig, ChartKind};
use crate::data::{try_numeric, Cell, Dataset};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashSet;

/// Range of distinct values a column needs to be a useful bar grouping.
const CATEGORY_CARDINALITY: std::ops::RangeInclusive<usize> = 2..=20;

/// How each column of a dataset can be plotted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnProfile {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub temporal: Vec<String>,
}

fn is_id_like(column: &str) -> bool {
    column.to_ascii_lowercase().ends_with("id")
}

fn looks_temporal_name(column: &str) -> bool {
    let lower = column.to_ascii_lowercase();
    ["date", "time", "year"].iter().any(|hint| lower.contains(hint))
}

fn parses_as_date(value: &Cell) -> bool {
    match value {
        Cell::Num(n) => n.fract() == 0.0 && (1000.0..=9999.0).contains(n),
        Cell::Str(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || NaiveDate::parse_from_str(s, "%Y/%m/%d").is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
                || DateTime::parse_from_rfc3339(s).is_ok()
                || (s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()))
        }
        _ => false,
    }
}

/// Classify every column by the values it holds.
pub fn profile(dataset: &Dataset) -> ColumnProfile {
    let mut profile = ColumnProfile::default();

    for column in &dataset.columns {
        let values: Vec<&Cell> = dataset
            .rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|cell| !cell.is_null())
            .collect();
        if values.is_empty() {
            continue;
        }

        let temporal = looks_temporal_name(column) && values.iter().all(|v| parses_as_date(v));
        if temporal {
            profile.temporal.push(column.clone());
        }

        if values.iter().all(|v| try_numeric(v).is_some()) {
            if !is_id_like(column) {
                profile.numeric.push(column.clone());
            }
            continue;
        }
        if temporal {
            continue;
        }

        let distinct: HashSet<String> = values.iter().map(|v| v.label()).collect();
        if CATEGORY_CARDINALITY.contains(&distinct.len()) {
            profile.categorical.push(column.clone());
        }
    }

    profile
}

/// Propose a starter dashboard for a dataset.
pub fn suggest_charts(dataset: &Dataset) -> Vec<ChartConfig> {
    let profile = profile(dataset);
    let mut charts = Vec::new();

    // Distribution and correlation of the leading metrics
    if let Some(metric) = profile.numeric.first() {
        charts.push(
            ChartConfig::new(ChartKind::Bar)
                .with_x(metric.as_str())
                .with_y(metric.as_str())
                .with_aggregation(Aggregation::Count)
                .with_title(format!("Distribution of {}", metric))
                .with_id("chart_dist_1"),
        );

        if let Some(second) = profile.numeric.get(1) {
            charts.push(
                ChartConfig::new(ChartKind::Scatter)
                    .with_x(metric.as_str())
                    .with_y(second.as_str())
                    .with_title(format!("{} vs {}", metric, second))
                    .with_id("chart_scatter_1"),
            );
        }
    }

    // Metric by category
    if let (Some(category), Some(metric)) = (profile.categorical.first(), profile.numeric.first()) {
        charts.push(
            ChartConfig::new(ChartKind::Bar)
                .with_x(category.as_str())
                .with_y(metric.as_str())
                .with_aggregation(Aggregation::Sum)
                .with_title(format!("Sum of {} by {}", metric, category))
                .with_id("chart_cat_1"),
        );
    }

    // Metric over time
    let non_temporal_metric = profile
        .numeric
        .iter()
        .find(|m| !profile.temporal.contains(*m));
    if let (Some(date), Some(metric)) = (profile.temporal.first(), non_temporal_metric) {
        charts.push(
            ChartConfig::new(ChartKind::Line)
                .with_x(date.as_str())
                .with_y(metric.as_str())
                .with_aggregation(Aggregation::Avg)
                .with_title(format!("{} over Time", metric))
                .with_id("chart_time_1"),
        );
    }

    tracing::debug!(
        numeric = profile.numeric.len(),
        categorical = profile.categorical.len(),
        temporal = profile.temporal.len(),
        suggested = charts.len(),
        "suggested dashboard"
    );
    charts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Dataset {
        Dataset::from_csv(
            "OrderId,date,region,sales,profit\n\
             1,2024-01-01,North,10,2\n\
             2,2024-01-02,South,20,5\n\
             3,2024-01-03,North,15,1\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_profile_skips_id_columns() {
        let p = profile(&sales());
        assert_eq!(p.numeric, vec!["sales", "profit"]);
        assert_eq!(p.categorical, vec!["region"]);
        assert_eq!(p.temporal, vec!["date"]);
    }

    #[test]
    fn test_suggestions() {
        let charts = suggest_charts(&sales());
        let ids: Vec<&str> = charts.iter().filter_map(|c| c.id.as_deref()).collect();
        assert_eq!(ids, vec!["chart_dist_1", "chart_scatter_1", "chart_cat_1", "chart_time_1"]);
        assert_eq!(charts[2].x_key(), Some("region"));
        assert_eq!(charts[3].aggregation, Aggregation::Avg);
    }

    #[test]
    fn test_high_cardinality_is_not_categorical() {
        let mut csv = String::from("name,score\n");
        for i in 0..30 {
            csv.push_str(&format!("person{},{}\n", i, i));
        }
        let data = Dataset::from_csv(csv.as_bytes()).unwrap();
        let p = profile(&data);
        assert!(p.categorical.is_empty());
        let charts = suggest_charts(&data);
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].kind, ChartKind::Bar);
    }

    #[test]
    fn test_numeric_year_column_is_temporal() {
        let data = Dataset::from_csv("year,units\n2020,5\n2021,7\n".as_bytes()).unwrap();
        let p = profile(&data);
        assert_eq!(p.temporal, vec!["year"]);
        let charts = suggest_charts(&data);
        let line = charts.iter().find(|c| c.kind == ChartKind::Line).unwrap();
        assert_eq!(line.first_y_key(), Some("units"));
    }

    #[test]
    fn test_empty_dataset() {
        assert!(suggest_charts(&Dataset::from_rows(vec![])).is_empty());
    }
}
