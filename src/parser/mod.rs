// Chart DSL parser module

pub mod ast;
pub mod geom;
pub mod lexer;
pub mod pipeline;

// Public API re-exports
pub use pipeline::{parse_chart_config, parse_chart_spec};
