//! String built-ins.

use regex::Regex;

use super::{array_arg, integer_arg, string_arg, Arity, BuiltinFunction, FunctionError};
use crate::script::value::Value;

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[
    BuiltinFunction::strict("concat", Arity::at_least(1), concat),
    BuiltinFunction::strict("string", Arity::exactly(1), string),
    BuiltinFunction::strict("lower", Arity::exactly(1), lower),
    BuiltinFunction::strict("upper", Arity::exactly(1), upper),
    BuiltinFunction::strict("capitalize", Arity::exactly(1), capitalize),
    BuiltinFunction::strict("titlecase", Arity::exactly(1), titlecase),
    BuiltinFunction::strict("strip", Arity::exactly(1), strip),
    BuiltinFunction::strict("replace", Arity::between(3, 4), replace),
    BuiltinFunction::strict("split", Arity::between(2, 3), split),
    BuiltinFunction::strict("join", Arity::exactly(2), join),
    BuiltinFunction::strict("pad", Arity::exactly(3), pad),
    BuiltinFunction::strict("pad_zero", Arity::exactly(2), pad_zero),
    BuiltinFunction::strict("truncate", Arity::exactly(2), truncate),
    BuiltinFunction::strict("regex_search", Arity::exactly(2), regex_search),
    BuiltinFunction::strict("regex_sub", Arity::exactly(3), regex_sub),
    BuiltinFunction::strict("sanitize", Arity::exactly(1), sanitize),
    BuiltinFunction::strict("sanitize_plex_episode", Arity::exactly(1), sanitize_plex_episode),
];

fn concat(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(args.iter().map(Value::to_string).collect()))
}

fn string(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(args[0].to_string()))
}

fn lower(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(string_arg(args, 0, "lower")?.to_lowercase()))
}

fn upper(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(string_arg(args, 0, "upper")?.to_uppercase()))
}

fn capitalize(args: &[Value]) -> Result<Value, FunctionError> {
    let s = string_arg(args, 0, "capitalize")?;
    let mut chars = s.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    Ok(Value::String(capitalized))
}

fn titlecase(args: &[Value]) -> Result<Value, FunctionError> {
    let s = string_arg(args, 0, "titlecase")?;
    let mut result = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                result.extend(ch.to_uppercase());
            } else {
                result.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            result.push(ch);
            at_word_start = ch != '\'';
        }
    }
    Ok(Value::String(result))
}

fn strip(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(string_arg(args, 0, "strip")?.trim().to_string()))
}

fn replace(args: &[Value]) -> Result<Value, FunctionError> {
    let s = string_arg(args, 0, "replace")?;
    let old = string_arg(args, 1, "replace")?;
    let new = string_arg(args, 2, "replace")?;
    let replaced = match args.get(3) {
        Some(_) => {
            let count = integer_arg(args, 3, "replace")?;
            let count = usize::try_from(count)
                .map_err(|_| {
                    FunctionError::Argument("replace count must not be negative".to_string())
                })?;
            s.replacen(old, new, count)
        }
        None => s.replace(old, new),
    };
    Ok(Value::String(replaced))
}

fn split(args: &[Value]) -> Result<Value, FunctionError> {
    let s = string_arg(args, 0, "split")?;
    let separator = string_arg(args, 1, "split")?;
    if separator.is_empty() {
        return Err(FunctionError::Argument("split separator must not be empty".to_string()));
    }
    let parts: Vec<Value> = match args.get(2) {
        Some(_) => {
            let max_split = integer_arg(args, 2, "split")?;
            let pieces = usize::try_from(max_split)
                .map_err(|_| {
                    FunctionError::Argument("split limit must not be negative".to_string())
                })?
                .saturating_add(1);
            s.splitn(pieces, separator).map(Value::from).collect()
        }
        None => s.split(separator).map(Value::from).collect(),
    };
    Ok(Value::Array(parts))
}

fn join(args: &[Value]) -> Result<Value, FunctionError> {
    let separator = string_arg(args, 0, "join")?;
    let items = array_arg(args, 1, "join")?;
    let joined = items
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::String(joined))
}

fn pad(args: &[Value]) -> Result<Value, FunctionError> {
    let s = args[0].to_string();
    let width = width_arg(args, 1, "pad")?;
    let fill = string_arg(args, 2, "pad")?;
    let mut fill_chars = fill.chars();
    let (Some(fill), None) = (fill_chars.next(), fill_chars.next()) else {
        return Err(FunctionError::Argument("pad character must be a single character".to_string()));
    };
    let missing = width.saturating_sub(s.chars().count());
    let mut padded: String = std::iter::repeat_n(fill, missing).collect();
    padded.push_str(&s);
    Ok(Value::String(padded))
}

fn pad_zero(args: &[Value]) -> Result<Value, FunctionError> {
    let n = integer_arg(args, 0, "pad_zero")?;
    let width = width_arg(args, 1, "pad_zero")?;
    let digits = n.unsigned_abs().to_string();
    let sign = if n < 0 { "-" } else { "" };
    Ok(Value::String(format!("{}{:0>width$}", sign, digits, width = width)))
}

/// Widest result `%pad` and `%pad_zero` will produce.
const MAX_PAD_WIDTH: usize = 4096;

/// Negative widths pad nothing.
fn width_arg(args: &[Value], index: usize, function: &str) -> Result<usize, FunctionError> {
    let width = usize::try_from(integer_arg(args, index, function)?).unwrap_or(0);
    if width > MAX_PAD_WIDTH {
        return Err(FunctionError::Argument(format!(
            "%{} width {} exceeds the maximum of {}",
            function, width, MAX_PAD_WIDTH
        )));
    }
    Ok(width)
}

/// Truncates to at most `max_bytes` bytes without splitting a character.
fn truncate(args: &[Value]) -> Result<Value, FunctionError> {
    let s = string_arg(args, 0, "truncate")?;
    let max_bytes = usize::try_from(integer_arg(args, 1, "truncate")?).unwrap_or(0);
    if s.len() <= max_bytes {
        return Ok(Value::String(s.to_string()));
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    Ok(Value::String(s[..end].to_string()))
}

fn compile(pattern: &str, function: &str) -> Result<Regex, FunctionError> {
    Regex::new(pattern)
        .map_err(|e| FunctionError::Argument(format!("invalid regex in %{}: {}", function, e)))
}

/// Returns `[match, group1, ...]` for the first match, or an empty array.
fn regex_search(args: &[Value]) -> Result<Value, FunctionError> {
    let s = string_arg(args, 0, "regex_search")?;
    let regex = compile(string_arg(args, 1, "regex_search")?, "regex_search")?;
    let captures = match regex.captures(s) {
        Some(captures) => captures
            .iter()
            .map(|group| Value::from(group.map_or("", |m| m.as_str())))
            .collect(),
        None => Vec::new(),
    };
    Ok(Value::Array(captures))
}

fn regex_sub(args: &[Value]) -> Result<Value, FunctionError> {
    let regex = compile(string_arg(args, 0, "regex_sub")?, "regex_sub")?;
    let replacement = string_arg(args, 1, "regex_sub")?;
    let s = string_arg(args, 2, "regex_sub")?;
    Ok(Value::String(regex.replace_all(s, replacement).into_owned()))
}

/// Makes any value safe to use as a single path component.
///
/// Path separators and characters reserved on common filesystems are replaced with
/// their full-width lookalikes; control characters are dropped.
fn sanitize_filename(s: &str) -> String {
    let sanitized: String = s
        .chars()
        .filter(|ch| !ch.is_control())
        .map(|ch| match ch {
            '/' => '⧸',
            '\\' => '⧹',
            ':' => '：',
            '*' => '＊',
            '?' => '？',
            '"' => '＂',
            '<' => '＜',
            '>' => '＞',
            '|' => '｜',
            other => other,
        })
        .collect();

    match sanitized.as_str() {
        "." => "．".to_string(),
        ".." => "．．".to_string(),
        _ => sanitized,
    }
}

fn sanitize(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(sanitize_filename(&args[0].to_string())))
}

/// Like `%sanitize`, but also swaps ASCII digits for full-width digits so media
/// servers do not mistake them for episode numbers.
fn sanitize_plex_episode(args: &[Value]) -> Result<Value, FunctionError> {
    let swapped: String = args[0]
        .to_string()
        .chars()
        .map(|ch| match ch.to_digit(10) {
            Some(d) => char::from_u32(0xFF10 + d).unwrap_or(ch),
            None => ch,
        })
        .collect();
    Ok(Value::String(sanitize_filename(&swapped)))
}
