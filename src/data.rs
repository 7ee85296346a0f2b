use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};

/// A single scalar value in a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    Bool(bool),
    Num(f64),
    Str(String),
    #[default]
    Null,
}

impl Cell {
    /// Infer a typed cell from raw CSV text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Cell::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Cell::Bool(false);
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Num(n),
            _ => Cell::Str(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Display string used for grouping keys and filter membership.
    pub fn label(&self) -> String {
        match self {
            Cell::Str(s) => s.clone(),
            Cell::Num(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
            Cell::Null => "null".to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Integral values print without a fractional part ("10", not "10.0").
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Try to read a cell as a finite number.
///
/// Numbers pass through, strings are trimmed and parsed. Booleans, nulls and
/// empty strings are not numeric. Callers drop values that come back `None`.
pub fn try_numeric(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Num(n) if n.is_finite() => Some(*n),
        Cell::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

pub type Row = IndexMap<String, Cell>;

static NULL_CELL: Cell = Cell::Null;

/// Look up a column, treating a missing key as null.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Cell {
    row.get(column).unwrap_or(&NULL_CELL)
}

/// Identity of a row sequence, used as the memoization key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DatasetId(u64);

static NEXT_DATASET_ID: AtomicU64 = AtomicU64::new(1);

impl DatasetId {
    fn next() -> Self {
        DatasetId(NEXT_DATASET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    id: DatasetId,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            id: DatasetId::next(),
            columns,
            rows,
        }
    }

    /// Build a dataset from rows alone; columns are collected in first-seen order.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self::new(columns, rows)
    }

    pub fn id(&self) -> DatasetId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Read CSV with a header row, inferring a type for every field.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if columns.is_empty() {
            return Err(anyhow!("CSV input has no header row"));
        }

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", line + 1))?;
            if record.len() > columns.len() {
                tracing::warn!(
                    record = line + 1,
                    fields = record.len(),
                    columns = columns.len(),
                    "dropping CSV fields beyond the header"
                );
            }
            let mut row = Row::with_capacity(columns.len());
            for (idx, header) in columns.iter().enumerate() {
                let cell = record.get(idx).map(Cell::infer).unwrap_or(Cell::Null);
                row.insert(header.clone(), cell);
            }
            rows.push(row);
        }

        tracing::debug!("Read {} CSV rows with {} columns", rows.len(), columns.len());
        Ok(Self::new(columns, rows))
    }

    /// Create a dataset from a JSON array of objects.
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in array must be objects"))?;

            let mut row = Row::with_capacity(obj.len());
            for (key, val) in obj {
                let cell = match val {
                    Value::String(s) => Cell::Str(s.clone()),
                    Value::Number(n) => n.as_f64().map(Cell::Num).unwrap_or(Cell::Null),
                    Value::Bool(b) => Cell::Bool(*b),
                    Value::Null => Cell::Null,
                    _ => return Err(anyhow!("Unsupported value type for field '{}'", key)),
                };
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
                row.insert(key.clone(), cell);
            }
            rows.push(row);
        }

        Ok(Self::new(columns, rows))
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input).context("Input is not valid JSON")?;
        Self::from_json(&value)
    }
}
