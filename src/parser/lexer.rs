// Shared tokens for the chart DSL

use crate::data::format_number;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::{map, recognize},
    multi::{many0_count, separated_list0},
    number::complete::double,
    sequence::{delimited, pair},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace.
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Bare identifier: letter or underscore, then letters, digits or underscores.
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        String::from,
    )(input)
}

/// Double-quoted string without escapes.
pub fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        String::from,
    )(input)
}

pub fn number_literal(input: &str) -> IResult<&str, f64> {
    double(input)
}

/// Column name: bare identifier, or a quoted string for names with spaces.
pub fn column(input: &str) -> IResult<&str, String> {
    alt((string_literal, identifier))(input)
}

/// `[a, "b c"]`
pub fn column_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        ws(char('[')),
        separated_list0(ws(char(',')), ws(column)),
        ws(char(']')),
    )(input)
}

/// Filter value as its display string; numbers print the way cells do.
pub fn value_literal(input: &str) -> IResult<&str, String> {
    alt((string_literal, identifier, map(number_literal, format_number)))(input)
}

/// `["North", 2020, yes]`
pub fn value_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        ws(char('[')),
        separated_list0(ws(char(',')), ws(value_literal)),
        ws(char(']')),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("sales_2024 rest"), Ok((" rest", "sales_2024".to_string())));
        assert!(identifier("9lives").is_err());
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal(r#""Unit Price"x"#), Ok(("x", "Unit Price".to_string())));
        assert_eq!(string_literal(r#""""#), Ok(("", String::new())));
        assert!(string_literal(r#""open"#).is_err());
    }

    #[test]
    fn test_column_list() {
        let (rest, cols) = column_list(r#"[ a , "b c" ]"#).unwrap();
        assert_eq!(rest, "");
        assert_eq!(cols, vec!["a", "b c"]);
        assert_eq!(column_list("[]").unwrap().1, Vec::<String>::new());
    }

    #[test]
    fn test_value_list_formats_numbers() {
        let (_, values) = value_list(r#"["North", 2020, 1.5, yes]"#).unwrap();
        assert_eq!(values, vec!["North", "2020", "1.5", "yes"]);
    }
}
