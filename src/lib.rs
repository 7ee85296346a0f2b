// Library exports for insightboard

pub mod cache;
pub mod canvas;
pub mod chart;
pub mod config;
pub mod data;
pub mod filter;
pub mod parser;
pub mod prepare;
pub mod quantile;
pub mod record;
pub mod suggest;
pub mod transform;

pub use cache::{CacheOptions, CacheStats, TransformCache};
pub use canvas::{Canvas, CanvasEffect, LayoutOptions, PointerEvent, Tile, TileId};
pub use chart::{Aggregation, ChartConfig, ChartKind, SortOrder};
pub use config::Settings;
pub use data::{Cell, Dataset, Row};
pub use filter::FilterSet;
pub use prepare::{Imputation, OutlierMethod, Scaling};
pub use record::PlottingRecord;
pub use transform::{transform, transform_with_reason, EmptyReason, Transformed};
