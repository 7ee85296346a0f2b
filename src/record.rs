use indexmap::IndexMap;
use serde::Serialize;

// =============================================================================
// Plotting records: the engine's output, one shape per chart family
// =============================================================================

/// One element of the engine's output. Every element of a single result has
/// the same variant, chosen by the chart kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlottingRecord {
    Aggregate(AggregateRecord),
    Point(PointRecord),
    Box(BoxRecord),
    Cell(FrequencyCell),
    Overlap(OverlapRecord),
}

/// Grouped value for bar/line/area/pie/doughnut/table.
/// Serializes flat: `{"name": "x", "sales": 15}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRecord {
    pub name: String,
    #[serde(flatten)]
    pub values: IndexMap<String, f64>,
}

/// Scatter/bubble point; `z` is the bubble size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxRecord {
    pub name: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Heatmap/contour cell with its occurrence count as intensity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyCell {
    pub x: String,
    pub y: String,
    pub value: u64,
}

/// Set-overlap tally. `sets` names one column for an exclusive region and both
/// columns for the intersection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapRecord {
    pub sets: Vec<String>,
    pub size: u64,
}

impl PlottingRecord {
    pub fn as_aggregate(&self) -> Option<&AggregateRecord> {
        match self {
            PlottingRecord::Aggregate(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<&PointRecord> {
        match self {
            PlottingRecord::Point(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_box(&self) -> Option<&BoxRecord> {
        match self {
            PlottingRecord::Box(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&FrequencyCell> {
        match self {
            PlottingRecord::Cell(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_overlap(&self) -> Option<&OverlapRecord> {
        match self {
            PlottingRecord::Overlap(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_serializes_flat() {
        let mut values = IndexMap::new();
        values.insert("v".to_string(), 15.0);
        let record = PlottingRecord::Aggregate(AggregateRecord {
            name: "x".to_string(),
            values,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"name": "x", "v": 15.0}));
    }

    #[test]
    fn test_overlap_shape() {
        let record = PlottingRecord::Overlap(OverlapRecord {
            sets: vec!["a".to_string(), "b".to_string()],
            size: 2,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"sets": ["a", "b"], "size": 2}));
    }
}
