// Row preparation applied to a dataset before charting

use crate::data::{cell, Cell, Dataset, Row};
use crate::quantile::quantile;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Threshold used by the z-score method when the caller passes a non-positive one.
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Keep values within `[Q1 - t*IQR, Q3 + t*IQR]`.
    #[default]
    Iqr,
    /// Keep values with `|z| < t`, using the sample standard deviation.
    ZScore,
}

impl FromStr for OutlierMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" | "z-score" => Ok(OutlierMethod::ZScore),
            other => Err(format!("Unknown outlier method: {}", other)),
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr => f.write_str("iqr"),
            OutlierMethod::ZScore => f.write_str("zscore"),
        }
    }
}

/// How `impute_missing` fills a null cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Imputation {
    Mean,
    Median,
    Mode,
    /// Remove rows with a null in the column instead of filling.
    Drop,
    Constant(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    MinMax,
    Standard,
}

/// Numeric view of a column, one entry per row (`None` for null).
///
/// Returns `None` when the column is absent or holds any non-numeric value.
fn numeric_column(dataset: &Dataset, column: &str) -> Option<Vec<Option<f64>>> {
    if !dataset.columns.iter().any(|c| c == column) {
        return None;
    }
    dataset
        .rows
        .iter()
        .map(|row| match cell(row, column) {
            Cell::Num(n) if n.is_finite() => Some(Some(*n)),
            Cell::Null => Some(None),
            _ => None,
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; `None` below two values.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values
}

/// Drop rows whose value in `column` is an outlier.
///
/// A missing or non-numeric column leaves the dataset unchanged. Rows with a
/// null in the column never pass the bounds check and are dropped.
pub fn filter_outliers(dataset: &Dataset, column: &str, method: OutlierMethod, threshold: f64) -> Dataset {
    let Some(values) = numeric_column(dataset, column) else {
        tracing::warn!(column, "outlier filter skipped: column missing or not numeric");
        return dataset.clone();
    };
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    let keep: Box<dyn Fn(f64) -> bool> = match method {
        OutlierMethod::Iqr => {
            let data = sorted(present);
            let q1 = quantile(&data, 0.25);
            let q3 = quantile(&data, 0.75);
            let iqr = q3 - q1;
            let (lower, upper) = (q1 - threshold * iqr, q3 + threshold * iqr);
            Box::new(move |v| v >= lower && v <= upper)
        }
        OutlierMethod::ZScore => {
            let std = match sample_std(&present) {
                Some(std) if std > 0.0 => std,
                _ => return dataset.clone(),
            };
            let m = mean(&present);
            let limit = if threshold > 0.0 { threshold } else { DEFAULT_ZSCORE_THRESHOLD };
            Box::new(move |v| ((v - m) / std).abs() < limit)
        }
    };

    let rows: Vec<Row> = dataset
        .rows
        .iter()
        .zip(&values)
        .filter(|(_, value)| value.map_or(false, |v| keep(v)))
        .map(|(row, _)| row.clone())
        .collect();

    tracing::debug!(
        column,
        %method,
        removed = dataset.len() - rows.len(),
        "filtered outliers"
    );
    Dataset::new(dataset.columns.clone(), rows)
}

/// Equality key for a cell: values of different types never collide.
fn cell_key(value: &Cell) -> (u8, String) {
    match value {
        Cell::Bool(b) => (0, b.to_string()),
        Cell::Num(_) => (1, value.label()),
        Cell::Str(s) => (2, s.clone()),
        Cell::Null => (3, String::new()),
    }
}

/// Keep the first occurrence of each row, comparing `subset` columns (all
/// columns when `None`).
pub fn remove_duplicates(dataset: &Dataset, subset: Option<&[String]>) -> Dataset {
    let columns = subset.unwrap_or(&dataset.columns[..]);
    let mut seen: IndexSet<Vec<(u8, String)>> = IndexSet::new();

    let rows: Vec<Row> = dataset
        .rows
        .iter()
        .filter(|row| seen.insert(columns.iter().map(|c| cell_key(cell(row, c))).collect()))
        .cloned()
        .collect();

    tracing::debug!(removed = dataset.len() - rows.len(), "removed duplicate rows");
    Dataset::new(dataset.columns.clone(), rows)
}

/// Smallest-first order used to break ties between equally frequent values.
fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Num(x), Cell::Num(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => cell_key(a).cmp(&cell_key(b)),
    }
}

/// Most frequent non-null value; ties go to the smallest.
fn mode(dataset: &Dataset, column: &str) -> Option<Cell> {
    let mut counts: IndexMap<(u8, String), (Cell, usize)> = IndexMap::new();
    for row in &dataset.rows {
        let value = cell(row, column);
        if value.is_null() {
            continue;
        }
        counts.entry(cell_key(value)).or_insert_with(|| (value.clone(), 0)).1 += 1;
    }
    counts
        .into_values()
        .max_by(|(a, na), (b, nb)| na.cmp(nb).then_with(|| compare_cells(b, a)))
        .map(|(value, _)| value)
}

fn fill_value(dataset: &Dataset, column: &str, strategy: &Imputation) -> Option<Cell> {
    match strategy {
        Imputation::Mean | Imputation::Median => {
            let present: Vec<f64> = numeric_column(dataset, column)?.into_iter().flatten().collect();
            if present.is_empty() {
                return None;
            }
            let value = match strategy {
                Imputation::Mean => mean(&present),
                _ => quantile(&sorted(present), 0.5),
            };
            Some(Cell::Num(value))
        }
        Imputation::Mode => mode(dataset, column),
        Imputation::Constant(value) => Some(Cell::Str(value.clone())),
        Imputation::Drop => None,
    }
}

/// Fill (or drop) null cells in each listed column. Unknown columns are skipped;
/// mean and median only apply to numeric columns.
pub fn impute_missing(dataset: &Dataset, columns: &[String], strategy: &Imputation) -> Dataset {
    let mut current = Dataset::new(dataset.columns.clone(), dataset.rows.clone());
    for column in columns {
        if !current.columns.contains(column) {
            continue;
        }
        if *strategy == Imputation::Drop {
            current.rows.retain(|row| !cell(row, column).is_null());
            continue;
        }
        let Some(fill) = fill_value(&current, column, strategy) else {
            continue;
        };
        for row in &mut current.rows {
            if cell(row, column).is_null() {
                row.insert(column.clone(), fill.clone());
            }
        }
    }
    current
}

/// Rescale numeric columns in place. Constant columns are left as they are.
pub fn normalize(dataset: &Dataset, columns: &[String], method: Scaling) -> Dataset {
    let mut rows = dataset.rows.clone();
    for column in columns {
        let Some(values) = numeric_column(dataset, column) else {
            continue;
        };
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let (offset, scale) = match method {
            Scaling::MinMax => {
                let min = present.iter().copied().fold(f64::INFINITY, f64::min);
                let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if !(max > min) {
                    continue;
                }
                (min, max - min)
            }
            Scaling::Standard => match sample_std(&present) {
                Some(std) if std > 0.0 => (mean(&present), std),
                _ => continue,
            },
        };
        for (row, value) in rows.iter_mut().zip(values) {
            if let Some(v) = value {
                row.insert(column.clone(), Cell::Num((v - offset) / scale));
            }
        }
    }
    Dataset::new(dataset.columns.clone(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(json: &str) -> Dataset {
        Dataset::from_json_str(json).unwrap()
    }

    fn column_values(data: &Dataset, column: &str) -> Vec<Cell> {
        data.rows.iter().map(|r| cell(r, column).clone()).collect()
    }

    #[test]
    fn test_iqr_drops_far_values() {
        let data = dataset(r#"[{"v":1},{"v":2},{"v":3},{"v":4},{"v":100}]"#);
        // Q1 = 2, Q3 = 4, bounds [-1, 7]
        let out = filter_outliers(&data, "v", OutlierMethod::Iqr, 1.5);
        assert_eq!(out.len(), 4);
        assert!(!column_values(&out, "v").contains(&Cell::Num(100.0)));
        assert_ne!(out.id(), data.id());
    }

    #[test]
    fn test_iqr_drops_null_rows() {
        let data = dataset(r#"[{"v":1},{"v":null},{"v":2}]"#);
        let out = filter_outliers(&data, "v", OutlierMethod::Iqr, 1.5);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_outliers_skip_non_numeric_column() {
        let data = dataset(r#"[{"v":"a"},{"v":2}]"#);
        assert_eq!(filter_outliers(&data, "v", OutlierMethod::Iqr, 1.5).len(), 2);
        assert_eq!(filter_outliers(&data, "missing", OutlierMethod::ZScore, 1.0).len(), 2);
    }

    #[test]
    fn test_zscore() {
        let data = dataset(r#"[{"v":10},{"v":10},{"v":10},{"v":10},{"v":50}]"#);
        // mean 18, sample std ~17.89; 50 sits at z ~1.79
        let out = filter_outliers(&data, "v", OutlierMethod::ZScore, 1.5);
        assert_eq!(out.len(), 4);
        let out = filter_outliers(&data, "v", OutlierMethod::ZScore, 0.0);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_zscore_constant_column_unchanged() {
        let data = dataset(r#"[{"v":5},{"v":5}]"#);
        assert_eq!(filter_outliers(&data, "v", OutlierMethod::ZScore, 1.0).len(), 2);
    }

    #[test]
    fn test_outlier_method_from_str() {
        assert_eq!("IQR".parse::<OutlierMethod>(), Ok(OutlierMethod::Iqr));
        assert_eq!("zscore".parse::<OutlierMethod>(), Ok(OutlierMethod::ZScore));
        assert!("mad".parse::<OutlierMethod>().is_err());
    }

    #[test]
    fn test_remove_duplicates_all_columns() {
        let data = dataset(r#"[{"a":1,"b":"x"},{"a":1,"b":"x"},{"a":1,"b":"y"},{"a":"1","b":"x"}]"#);
        let out = remove_duplicates(&data, None);
        // the string "1" is not the number 1
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_remove_duplicates_subset_keeps_first() {
        let data = dataset(r#"[{"a":1,"b":"x"},{"a":1,"b":"y"},{"a":null,"b":"z"},{"a":null,"b":"w"}]"#);
        let out = remove_duplicates(&data, Some(&["a".to_string()]));
        assert_eq!(column_values(&out, "b"), vec![Cell::Str("x".into()), Cell::Str("z".into())]);
    }

    #[test]
    fn test_impute_mean_and_median() {
        let data = dataset(r#"[{"v":1},{"v":null},{"v":2},{"v":6}]"#);
        let cols = vec!["v".to_string()];
        let out = impute_missing(&data, &cols, &Imputation::Mean);
        assert_eq!(out.rows[1]["v"], Cell::Num(3.0));
        let out = impute_missing(&data, &cols, &Imputation::Median);
        assert_eq!(out.rows[1]["v"], Cell::Num(2.0));
    }

    #[test]
    fn test_impute_mean_skips_text_column() {
        let data = dataset(r#"[{"v":"a"},{"v":null}]"#);
        let out = impute_missing(&data, &["v".to_string()], &Imputation::Mean);
        assert_eq!(out.rows[1]["v"], Cell::Null);
    }

    #[test]
    fn test_impute_mode_tie_takes_smallest() {
        let data = dataset(r#"[{"c":"b"},{"c":"a"},{"c":null},{"c":"b"},{"c":"a"}]"#);
        let out = impute_missing(&data, &["c".to_string()], &Imputation::Mode);
        assert_eq!(out.rows[2]["c"], Cell::Str("a".into()));
    }

    #[test]
    fn test_impute_drop_and_constant() {
        let data = dataset(r#"[{"c":"x","d":null},{"c":null,"d":1}]"#);
        let out = impute_missing(&data, &["c".to_string()], &Imputation::Drop);
        assert_eq!(out.len(), 1);

        let out = impute_missing(&data, &["d".to_string(), "nope".to_string()], &Imputation::Constant("Unknown".into()));
        assert_eq!(out.rows[0]["d"], Cell::Str("Unknown".into()));
        assert_eq!(out.rows[1]["d"], Cell::Num(1.0));
    }

    #[test]
    fn test_normalize_min_max() {
        let data = dataset(r#"[{"v":10},{"v":null},{"v":30},{"v":20}]"#);
        let out = normalize(&data, &["v".to_string()], Scaling::MinMax);
        assert_eq!(
            column_values(&out, "v"),
            vec![Cell::Num(0.0), Cell::Null, Cell::Num(1.0), Cell::Num(0.5)]
        );
    }

    #[test]
    fn test_normalize_standard_and_constant() {
        let data = dataset(r#"[{"v":1,"k":4},{"v":3,"k":4}]"#);
        let out = normalize(&data, &["v".to_string(), "k".to_string()], Scaling::Standard);
        let v = column_values(&out, "v");
        let std = 2f64.sqrt();
        assert_eq!(v, vec![Cell::Num(-1.0 / std), Cell::Num(1.0 / std)]);
        assert_eq!(out.rows[0]["k"], Cell::Num(4.0));
    }
}
