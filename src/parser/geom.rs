// Chart and filter command parsers

use super::ast::{ChartArg, FilterClause};
use super::lexer::{column, column_list, identifier, string_literal, value_list, ws};
use crate::chart::{Aggregation, ChartConfig, ChartKind, SortOrder};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, map_res},
    multi::separated_list0,
    sequence::{pair, preceded, terminated},
    IResult,
};

fn parse_chart_arg(input: &str) -> IResult<&str, ChartArg> {
    alt((
        map(preceded(ws(tag("x:")), ws(column)), ChartArg::X),
        map(
            preceded(ws(tag("y:")), alt((ws(column_list), map(ws(column), |c| vec![c])))),
            ChartArg::Y,
        ),
        map(preceded(ws(tag("z:")), ws(column)), ChartArg::Z),
        map(
            preceded(
                ws(tag("agg:")),
                ws(map_res(column, |s| s.parse::<Aggregation>())),
            ),
            ChartArg::Agg,
        ),
        map(
            preceded(
                ws(tag("sort:")),
                ws(map_res(column, |s| s.parse::<SortOrder>())),
            ),
            ChartArg::Sort,
        ),
        map(preceded(ws(tag("title:")), ws(string_literal)), ChartArg::Title),
        map(preceded(ws(tag("id:")), ws(column)), ChartArg::Id),
    ))(input)
}

/// Parse a chart command
/// Format: bar(x: region, y: [sales, profit], agg: avg, sort: desc, title: "...")
pub fn parse_chart(input: &str) -> IResult<&str, ChartConfig> {
    let (input, kind) = ws(map_res(identifier, |name| name.parse::<ChartKind>()))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, args) = separated_list0(ws(char(',')), parse_chart_arg)(input)?;
    let (input, _) = ws(char(')'))(input)?;

    let mut config = ChartConfig::new(kind);
    for arg in args {
        match arg {
            ChartArg::X(x) => config.x_axis_key = Some(x),
            ChartArg::Y(ys) => {
                config.y_axis_keys.clear();
                for y in ys {
                    config = config.with_y(y);
                }
            }
            ChartArg::Z(z) => config.z_axis_key = Some(z),
            ChartArg::Agg(agg) => config.aggregation = agg,
            ChartArg::Sort(sort) => config.sort_order = sort,
            ChartArg::Title(title) => config.title = Some(title),
            ChartArg::Id(id) => config.id = Some(id),
        }
    }

    Ok((input, config))
}

/// Parse a filter command
/// Format: filter(region: ["North", "South"], year: [2020])
pub fn parse_filter(input: &str) -> IResult<&str, FilterClause> {
    let (input, _) = ws(tag("filter"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, entries) = separated_list0(
        ws(char(',')),
        pair(terminated(ws(column), ws(char(':'))), value_list),
    )(input)?;
    let (input, _) = ws(char(')'))(input)?;

    Ok((input, FilterClause { entries }))
}
