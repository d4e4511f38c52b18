use chumsky::prelude::*;

use crate::parser::types::AttrValue;

fn number() -> impl Parser<char, AttrValue, Error = Simple<char>> {
    filter(|c: &char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
        .map(Some)
        .chain::<char, Vec<_>, _>(
            filter(|c: &char| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                .repeated(),
        )
        .collect::<String>()
        .try_map(|literal, span| {
            if let Ok(int) = literal.parse::<i64>() {
                return Ok(AttrValue::Int(int));
            }
            literal
                .parse::<f64>()
                .map(AttrValue::Float)
                .map_err(|_| Simple::custom(span, format!("Invalid number literal {:?}", literal)))
        })
        .labelled("number")
}

fn quoted(quote: char) -> impl Parser<char, String, Error = Simple<char>> {
    just(quote)
        .ignore_then(filter(move |c: &char| *c != quote).repeated())
        .then_ignore(just(quote))
        .collect()
}

fn string() -> impl Parser<char, AttrValue, Error = Simple<char>> {
    quoted('\'')
        .or(quoted('"'))
        .map(AttrValue::Str)
        .labelled("string")
}

fn word() -> impl Parser<char, AttrValue, Error = Simple<char>> {
    text::ident()
        .map(|word: String| match word.as_str() {
            "true" | "True" => AttrValue::Bool(true),
            "false" | "False" => AttrValue::Bool(false),
            "None" | "none" => AttrValue::None,
            _ => AttrValue::Str(word),
        })
        .labelled("identifier")
}

pub fn value() -> impl Parser<char, AttrValue, Error = Simple<char>> {
    recursive(|value| {
        let round = value
            .clone()
            .padded()
            .separated_by(just(','))
            .allow_trailing()
            .delimited_by(just('('), just(')'));
        let square = value
            .padded()
            .separated_by(just(','))
            .allow_trailing()
            .delimited_by(just('['), just(']'));
        let tuple = round.or(square).map(AttrValue::Tuple).labelled("tuple");

        number().or(string()).or(tuple).or(word())
    })
}

/// Parses one complete dictionary value, surrounding whitespace allowed.
pub fn parse_value(source: &str) -> Result<AttrValue, Vec<Simple<char>>> {
    value().padded().then_ignore(end()).parse(source)
}
