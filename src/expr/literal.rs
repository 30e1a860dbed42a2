//! Literal coercion: raw operand text → typed JSON value.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());

/// Coerce a raw textual operand.
///
/// - `true` / `false` → bool
/// - `null` → null
/// - `-?\d+(\.\d+)?` → number
/// - `'…'` / `"…"` → string, with `\n`, `\r`, `\t` decoded; any other escaped
///   character is taken literally
/// - anything else → the trimmed text as a string
pub fn coerce_str(raw: &str) -> Value {
    let text = raw.trim();
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if NUMERIC.is_match(text) {
        if let Some(n) = parse_number(text) {
            return Value::Number(n);
        }
    }
    if let Some(inner) = strip_quotes(text) {
        return Value::String(unescape(inner));
    }
    Value::String(text.to_string())
}

/// Coerce a JSON value; only strings are rewritten, everything else passes through.
pub fn coerce(value: &Value) -> Value {
    match value {
        Value::String(s) => coerce_str(s),
        other => other.clone(),
    }
}

fn parse_number(text: &str) -> Option<Number> {
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Number::from(i));
        }
    }
    // integers too large for i64 degrade to f64
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

fn strip_quotes(text: &str) -> Option<&str> {
    if text.len() < 2 {
        return None;
    }
    let first = text.chars().next()?;
    if (first == '"' || first == '\'') && text.ends_with(first) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
