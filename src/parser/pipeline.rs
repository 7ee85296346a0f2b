// Pipeline parser for the chart DSL

use super::ast::FilterClause;
use super::geom::{parse_chart, parse_filter};
use super::lexer::ws;
use crate::chart::ChartConfig;
use anyhow::{anyhow, Result};
use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::{eof, map},
    error::{Error, ErrorKind},
    multi::separated_list1,
    IResult,
};

#[derive(Debug)]
enum PipelineComponent {
    Chart(ChartConfig),
    Filter(FilterClause),
}

fn parse_pipeline_component(input: &str) -> IResult<&str, PipelineComponent> {
    alt((
        map(parse_filter, PipelineComponent::Filter),
        map(parse_chart, PipelineComponent::Chart),
    ))(input)
}

/// Parse a complete chart specification
/// Format: chart(...) | filter(...) | ...
pub fn parse_chart_spec(input: &str) -> IResult<&str, ChartConfig> {
    let (rest, components) =
        separated_list1(ws(tag("|")), parse_pipeline_component)(input)?;
    let (rest, _) = ws(eof)(rest)?;

    let mut chart = None;
    let mut filters = Vec::new();
    for comp in components {
        match comp {
            PipelineComponent::Chart(c) => {
                // Only one chart command per pipeline
                if chart.replace(c).is_some() {
                    return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
                }
            }
            PipelineComponent::Filter(f) => filters.push(f),
        }
    }

    let Some(mut config) = chart else {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Verify)));
    };
    for clause in filters {
        for (column, values) in clause.entries {
            config.filters.set(&column, values);
        }
    }

    Ok((rest, config))
}

/// Parse a chart spec into a config, reporting failures with context.
pub fn parse_chart_config(input: &str) -> Result<ChartConfig> {
    match parse_chart_spec(input) {
        Ok((_, config)) => Ok(config),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(anyhow!(
            "Invalid chart spec near '{}' ({:?})",
            e.input.trim(),
            e.code
        )),
        Err(nom::Err::Incomplete(_)) => Err(anyhow!("Incomplete chart spec")),
    }
}
