//! Parser implementation using Pest.

use pest::error::{Error, ErrorVariant};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::script::ast::*;
use crate::script::error::ScriptError;
use crate::script::value::Value;

#[derive(Parser)]
#[grammar = "script/grammar.pest"]
pub struct TemplateParser;

type ParseResult<T> = Result<T, Box<Error<Rule>>>;

/// Highest parameter index a custom function may use.
pub const MAX_PARAMETER: usize = 255;

/// Parse the source of the definition `name` into a template.
pub fn parse_definition(name: &str, input: &str) -> Result<Template, ScriptError> {
    parse_template(input).map_err(|e| ScriptError::parse(name, *e))
}

/// Parse a template string into an AST.
pub fn parse_template(input: &str) -> ParseResult<Template> {
    let pairs = TemplateParser::parse(Rule::template, input).map_err(Box::new)?;

    let mut segments = Vec::new();
    for pair in pairs {
        if pair.as_rule() != Rule::template {
            continue;
        }
        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::literal_text => {
                    segments.push(Segment::Literal(unescape_literal(inner_pair.as_str())));
                }
                Rule::interpolation => {
                    let expr = only_child(inner_pair)?;
                    segments.push(Segment::Expression(parse_expression(expr)?));
                }
                _ => {}
            }
        }
    }

    Ok(Template::new(segments))
}

fn parse_expression(pair: Pair<Rule>) -> ParseResult<Expression> {
    let inner = only_child(pair)?;

    match inner.as_rule() {
        Rule::function_call => parse_function_call(inner),
        Rule::boolean => Ok(Expression::Literal(Value::Boolean(
            inner.as_str().eq_ignore_ascii_case("true"),
        ))),
        Rule::number => parse_number(inner),
        Rule::string => parse_string(inner),
        Rule::parameter => {
            let index = inner.as_str()[1..]
                .parse::<usize>()
                .ok()
                .filter(|index| *index <= MAX_PARAMETER)
                .ok_or_else(|| custom_error(&inner, "parameter index is too large"))?;
            Ok(Expression::Parameter(index))
        }
        Rule::array => {
            let items = inner
                .into_inner()
                .map(parse_expression)
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Expression::Array(items))
        }
        Rule::map => {
            let mut entries = Vec::new();
            for entry in inner.into_inner() {
                let mut entry_inner = entry.into_inner();
                let (Some(key), Some(value)) = (entry_inner.next(), entry_inner.next()) else {
                    continue;
                };
                entries.push((parse_expression(key)?, parse_expression(value)?));
            }
            Ok(Expression::Map(entries))
        }
        Rule::variable => Ok(Expression::Variable(inner.as_str().to_string())),
        _ => Err(custom_error(&inner, "unexpected expression")),
    }
}

fn parse_function_call(pair: Pair<Rule>) -> ParseResult<Expression> {
    let span_error = custom_error(&pair, "function call without a name");
    let mut inner = pair.into_inner();
    let name = inner.next().ok_or(span_error)?.as_str()[1..].to_string();

    let args = inner.map(parse_expression).collect::<ParseResult<Vec<_>>>()?;

    Ok(Expression::Call(Call::new(name, args)))
}

fn parse_number(pair: Pair<Rule>) -> ParseResult<Expression> {
    let text = pair.as_str();
    let value = if text.contains('.') {
        text.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Integer)
    };

    value
        .map(Expression::Literal)
        .ok_or_else(|| custom_error(&pair, "number is out of range"))
}

fn parse_string(pair: Pair<Rule>) -> ParseResult<Expression> {
    let contents = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
    Ok(Expression::Literal(Value::String(parse_string_inner(contents))))
}

fn parse_string_inner(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                match next {
                    'n' => result.push('\n'),
                    'r' => result.push('\r'),
                    't' => result.push('\t'),
                    '\\' => result.push('\\'),
                    '"' => result.push('"'),
                    '\'' => result.push('\''),
                    _ => {
                        result.push('\\');
                        result.push(next);
                    }
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn unescape_literal(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

fn only_child(pair: Pair<Rule>) -> ParseResult<Pair<Rule>> {
    let span_error = custom_error(&pair, "empty expression");
    pair.into_inner().next().ok_or(span_error)
}

fn custom_error(pair: &Pair<Rule>, message: &str) -> Box<Error<Rule>> {
    Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: message.to_string(),
        },
        pair.as_span(),
    ))
}
