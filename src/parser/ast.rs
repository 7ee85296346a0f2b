// Syntax tree for the chart DSL

use crate::chart::{Aggregation, SortOrder};

/// One named argument inside a chart command, e.g. `agg: sum`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartArg {
    X(String),
    Y(Vec<String>),
    Z(String),
    Agg(Aggregation),
    Sort(SortOrder),
    Title(String),
    Id(String),
}

/// `filter(col: [values], ...)`: each entry replaces that column's allowed set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterClause {
    pub entries: Vec<(String, Vec<String>)>,
}
