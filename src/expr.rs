//! Embedded mini-language for custom validator bodies and conditional guards.
//!
//! The language is a fixed set of textual shapes, not a grammar:
//!
//! - `this matches /<pattern>/<flags>`
//! - `not (this matches /<pattern>/<flags>)`
//! - `this <op> $a and this <op> $b`      (`<op>` ∈ `< > <= >=`)
//! - `this <op> <operand>`                (`<op>` ∈ `< > <= >= = !=`)
//! - `<dotted.path> <op> <literal>`       (guards only, `<op>` ∈ `= !=`)
//!
//! Text is recognized once, when a body or guard is built, and kept as a small
//! typed tree. Evaluation is tri-state: `Some(true)`, `Some(false)`, or `None`
//! when the outcome cannot be decided.
pub mod literal;

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use literal::{coerce, coerce_str};

/// Bound validator parameters, in declaration order.
pub type Bindings = IndexMap<String, Value>;

// ————————————————————————————————————————————————————————————————————————————
// SHAPES
// ————————————————————————————————————————————————————————————————————————————

static SLASHED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/(.*)/([A-Za-z]*)$").unwrap());
static MATCHES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^this\s+matches\s+/(.*)/([A-Za-z]*)$").unwrap());
static NOT_MATCHES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^not\s*\(\s*this\s+matches\s+/(.*)/([A-Za-z]*)\s*\)$").unwrap()
});
static RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^this\s*(<=|>=|<|>)\s*\$([A-Za-z_]\w*)\s+and\s+this\s*(<=|>=|<|>)\s*\$([A-Za-z_]\w*)$",
    )
    .unwrap()
});
static COMPARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^this\s*(<=|>=|!=|<|>|=)\s*(.+)$").unwrap());
static PATH_EQ: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*)\s*(!=|=)\s*(.+)$").unwrap()
});

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Param(String),
    Const(Value),
}

/// A compiled `/pattern/flags` literal.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

#[derive(Debug, Clone, Error)]
pub enum PatternError {
    #[error("unsupported regex flag '{0}'")]
    Flag(char),
    /// Lookaround and backreferences land here.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Matches(Pattern),
    NotMatches(Pattern),
    Range { low: (CmpOp, String), high: (CmpOp, String) },
    Compare { op: CmpOp, operand: Operand },
    /// A `matches` shape whose pattern the regex engine rejected.
    Rejected(PatternError),
    /// Text that fit no shape.
    Unrecognized,
}

#[derive(Debug, Clone)]
enum GuardForm {
    PathEq { path: Vec<String>, op: CmpOp, expected: Value },
    Subject(Expr),
}

/// A custom validator body, parsed once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Body {
    source: String,
    expr: Expr,
}

/// A conditional-type guard, parsed once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Guard {
    source: String,
    form: GuardForm,
}

// ————————————————————————————————————————————————————————————————————————————
// PARSING
// ————————————————————————————————————————————————————————————————————————————

impl CmpOp {
    fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "<" => CmpOp::Lt,
            ">" => CmpOp::Gt,
            "<=" => CmpOp::Le,
            ">=" => CmpOp::Ge,
            "=" => CmpOp::Eq,
            "!=" => CmpOp::Ne,
            _ => return None,
        })
    }
}

impl Pattern {
    pub fn compile(source: &str, flags: &str) -> Result<Self, PatternError> {
        let source = source.replace(r"\/", "/");
        let mut builder = RegexBuilder::new(&source);
        for flag in flags.chars() {
            match flag {
                'i' => { builder.case_insensitive(true); }
                'm' => { builder.multi_line(true); }
                's' => { builder.dot_matches_new_line(true); }
                'x' => { builder.ignore_whitespace(true); }
                'g' | 'u' | 'y' => {}
                other => return Err(PatternError::Flag(other)),
            }
        }
        Ok(Pattern { regex: builder.build()? })
    }

    /// Either `/pattern/flags` or a bare pattern without flags.
    pub fn parse_literal(text: &str) -> Result<Self, PatternError> {
        match SLASHED.captures(text) {
            Some(caps) => Pattern::compile(&caps[1], &caps[2]),
            None => Pattern::compile(text, ""),
        }
    }

    pub fn is_match(&self, subject: &Value) -> bool {
        self.regex.is_match(&string_of(subject))
    }
}

impl Expr {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(caps) = NOT_MATCHES.captures(text) {
            return Pattern::compile(&caps[1], &caps[2])
                .map_or_else(Expr::Rejected, Expr::NotMatches);
        }
        if let Some(caps) = MATCHES.captures(text) {
            return Pattern::compile(&caps[1], &caps[2])
                .map_or_else(Expr::Rejected, Expr::Matches);
        }
        if let Some(caps) = RANGE.captures(text) {
            let low = CmpOp::parse(&caps[1]).map(|op| (op, caps[2].to_string()));
            let high = CmpOp::parse(&caps[3]).map(|op| (op, caps[4].to_string()));
            return match (low, high) {
                (Some(low), Some(high)) => Expr::Range { low, high },
                _ => Expr::Unrecognized,
            };
        }
        if let Some(caps) = COMPARE.captures(text) {
            let Some(op) = CmpOp::parse(&caps[1]) else { return Expr::Unrecognized };
            let raw = caps[2].trim();
            let operand = match raw.strip_prefix('$') {
                Some(name) => Operand::Param(name.to_string()),
                None => Operand::Const(coerce_str(raw)),
            };
            return Expr::Compare { op, operand };
        }
        Expr::Unrecognized
    }

    /// False for unrecognized text and for rejected patterns.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Expr::Unrecognized | Expr::Rejected(_))
    }
}

impl Guard {
    pub fn parse(text: &str) -> Self {
        let source = text.trim().to_string();
        let expr = Expr::parse(&source);
        let form = if !matches!(expr, Expr::Unrecognized) {
            GuardForm::Subject(expr)
        } else if let Some(caps) = PATH_EQ.captures(&source) {
            match CmpOp::parse(&caps[2]) {
                Some(op) => GuardForm::PathEq {
                    path: caps[1].split('.').map(str::to_string).collect(),
                    op,
                    expected: coerce_str(&caps[3]),
                },
                None => GuardForm::Subject(Expr::Unrecognized),
            }
        } else {
            GuardForm::Subject(Expr::Unrecognized)
        };
        match &form {
            GuardForm::Subject(Expr::Rejected(error)) => tracing::warn!(
                guard = %source,
                %error,
                "regex pattern rejected (lookaround and backreferences are unsupported); treated as indeterminate"
            ),
            GuardForm::Subject(Expr::Unrecognized) => {
                tracing::warn!(guard = %source, "unrecognized condition; treated as indeterminate")
            }
            _ => {}
        }
        Guard { source, form }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Body {
    pub fn parse(text: &str) -> Self {
        let expr = Expr::parse(text);
        match &expr {
            Expr::Rejected(error) => tracing::warn!(
                body = %text.trim(),
                %error,
                "regex pattern rejected (lookaround and backreferences are unsupported); it will never fail"
            ),
            Expr::Unrecognized => {
                tracing::warn!(body = %text.trim(), "unrecognized validator body; it will never fail")
            }
            _ => {}
        }
        Body { source: text.trim().to_string(), expr }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self { Body::parse(&text) }
}
impl From<Body> for String {
    fn from(body: Body) -> Self { body.source }
}
impl From<String> for Guard {
    fn from(text: String) -> Self { Guard::parse(&text) }
}
impl From<Guard> for String {
    fn from(guard: Guard) -> Self { guard.source }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// EVALUATION
// ————————————————————————————————————————————————————————————————————————————

impl Expr {
    /// Evaluate with `subject` as `this`.
    pub fn eval(&self, subject: &Value, params: &Bindings) -> Option<bool> {
        match self {
            Expr::Matches(p) => Some(p.is_match(subject)),
            Expr::NotMatches(p) => Some(!p.is_match(subject)),
            Expr::Range { low, high } => {
                let lo = compare(low.0, subject, params.get(&low.1)?)?;
                let hi = compare(high.0, subject, params.get(&high.1)?)?;
                Some(lo && hi)
            }
            Expr::Compare { op, operand } => {
                let rhs = match operand {
                    Operand::Param(name) => params.get(name)?,
                    Operand::Const(v) => v,
                };
                compare(*op, subject, rhs)
            }
            Expr::Rejected(_) | Expr::Unrecognized => None,
        }
    }
}

impl Guard {
    /// Evaluate against an object scope (the enclosing record, or the root).
    ///
    /// A non-object scope is indeterminate. A dotted path that runs into a
    /// missing key or a non-object is `false`.
    pub fn eval(&self, scope: &Value) -> Option<bool> {
        match &self.form {
            GuardForm::PathEq { path, op, expected } => {
                if !scope.is_object() {
                    return None;
                }
                let mut cursor = scope;
                for segment in path {
                    match cursor.get(segment.as_str()) {
                        Some(next) => cursor = next,
                        None => return Some(false),
                    }
                }
                compare(*op, cursor, expected)
            }
            GuardForm::Subject(expr) => expr.eval(scope, &Bindings::new()),
        }
    }
}

/// Apply `op` to `left` and `right`. Ordering is only defined within numbers
/// and within strings; other pairs are indeterminate.
pub fn compare(op: CmpOp, left: &Value, right: &Value) -> Option<bool> {
    match op {
        CmpOp::Eq => Some(values_equal(left, right)),
        CmpOp::Ne => Some(!values_equal(left, right)),
        CmpOp::Lt => order(left, right).map(Ordering::is_lt),
        CmpOp::Gt => order(left, right).map(Ordering::is_gt),
        CmpOp::Le => order(left, right).map(Ordering::is_le),
        CmpOp::Ge => order(left, right).map(Ordering::is_ge),
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Strict equality: same kind and same value; numbers compare numerically.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm.iter().all(|(k, x)| ym.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

/// String form of a subject for regex tests.
pub fn string_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
