use crate::data::{cell, Cell, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Column → allowed-values constraints, intersected across columns.
///
/// Values are compared by their display string, so `2020` in a filter matches
/// both the number `2020` and the string `"2020"`. An empty allowed set is
/// never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<Cell>>",
    into = "BTreeMap<String, BTreeSet<String>>"
)]
pub struct FilterSet {
    constraints: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the allowed values for a column. An empty set removes the entry.
    pub fn set<I, S>(&mut self, column: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.constraints.remove(column);
        } else {
            self.constraints.insert(column.to_string(), values);
        }
    }

    /// Add the value if absent, remove it if present.
    pub fn toggle(&mut self, column: &str, value: &str) {
        let emptied = match self.constraints.get_mut(column) {
            Some(values) => {
                if !values.remove(value) {
                    values.insert(value.to_string());
                }
                values.is_empty()
            }
            None => {
                self.constraints
                    .insert(column.to_string(), BTreeSet::from([value.to_string()]));
                false
            }
        };
        if emptied {
            self.constraints.remove(column);
        }
    }

    pub fn clear(&mut self, column: &str) {
        self.constraints.remove(column);
    }

    pub fn clear_all(&mut self) {
        self.constraints.clear();
    }

    pub fn allowed(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.constraints.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.constraints.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.constraints
            .iter()
            .all(|(column, allowed)| allowed.contains(&cell(row, column).label()))
    }

    pub fn apply<'a>(&self, rows: &'a [Row]) -> Vec<&'a Row> {
        if self.is_empty() {
            return rows.iter().collect();
        }
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

impl From<BTreeMap<String, Vec<Cell>>> for FilterSet {
    fn from(raw: BTreeMap<String, Vec<Cell>>) -> Self {
        let mut filters = FilterSet::new();
        for (column, values) in raw {
            filters.set(&column, values.iter().map(Cell::label));
        }
        filters
    }
}

impl From<FilterSet> for BTreeMap<String, BTreeSet<String>> {
    fn from(filters: FilterSet) -> Self {
        filters.constraints
    }
}

/// Distinct display values of a column in first-seen order, for building a segmenter.
pub fn distinct_values(rows: &[Row], column: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut values = Vec::new();
    for row in rows {
        let Some(value) = row.get(column) else { continue };
        if value.is_null() {
            continue;
        }
        let label = value.label();
        if seen.insert(label.clone()) {
            values.push(label);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(region: &str, year: f64) -> Row {
        let mut r = Row::new();
        r.insert("region".to_string(), Cell::Str(region.to_string()));
        r.insert("year".to_string(), Cell::Num(year));
        r
    }

    fn rows() -> Vec<Row> {
        vec![row("North", 2020.0), row("South", 2020.0), row("North", 2021.0)]
    }

    #[test]
    fn test_empty_set_is_no_constraint() {
        let data = rows();
        let mut filters = FilterSet::new();
        filters.set("region", Vec::<String>::new());
        assert!(filters.is_empty());
        assert_eq!(filters.apply(&data).len(), FilterSet::new().apply(&data).len());
    }

    #[test]
    fn test_constraints_are_intersected() {
        let data = rows();
        let mut filters = FilterSet::new();
        filters.set("region", ["North"]);
        filters.set("year", ["2020"]);
        let kept = filters.apply(&data);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["region"], Cell::Str("North".to_string()));
    }

    #[test]
    fn test_toggle_removes_emptied_column() {
        let mut filters = FilterSet::new();
        filters.toggle("region", "North");
        assert_eq!(filters.allowed("region").map(|s| s.len()), Some(1));
        filters.toggle("region", "North");
        assert!(filters.allowed("region").is_none());
    }

    #[test]
    fn test_missing_column_fails_constraint() {
        let data = rows();
        let mut filters = FilterSet::new();
        filters.set("segment", ["A"]);
        assert!(filters.apply(&data).is_empty());
    }

    #[test]
    fn test_deserialize_drops_empty_entries() {
        let filters: FilterSet =
            serde_json::from_str(r#"{"region": [], "year": [2020, "2021"]}"#).unwrap();
        assert!(filters.allowed("region").is_none());
        let years: Vec<&String> = filters.allowed("year").unwrap().iter().collect();
        assert_eq!(years, vec!["2020", "2021"]);
    }

    #[test]
    fn test_distinct_values() {
        assert_eq!(distinct_values(&rows(), "region"), vec!["North", "South"]);
        assert_eq!(distinct_values(&rows(), "year"), vec!["2020", "2021"]);
    }
}
