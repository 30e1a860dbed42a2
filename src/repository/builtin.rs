//! Builtin types and constraint predicates.
use serde_json::Value;

use crate::expr::{self, string_of, values_equal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    Any,
    Null,
    Bool,
    String,
    Int,
    Float,
    Number,
    Array,
    Object,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 9] = [
        BuiltinType::Any,
        BuiltinType::Null,
        BuiltinType::Bool,
        BuiltinType::String,
        BuiltinType::Int,
        BuiltinType::Float,
        BuiltinType::Number,
        BuiltinType::Array,
        BuiltinType::Object,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Any => "Any",
            BuiltinType::Null => "Null",
            BuiltinType::Bool => "Bool",
            BuiltinType::String => "String",
            BuiltinType::Int => "Int",
            BuiltinType::Float => "Float",
            BuiltinType::Number => "Number",
            BuiltinType::Array => "Array",
            BuiltinType::Object => "Object",
        }
    }

    /// Native shape predicate.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            BuiltinType::Any => true,
            BuiltinType::Null => value.is_null(),
            BuiltinType::Bool => value.is_boolean(),
            BuiltinType::String => value.is_string(),
            BuiltinType::Int => is_integral(value),
            BuiltinType::Float | BuiltinType::Number => {
                value.as_f64().is_some_and(f64::is_finite)
            }
            BuiltinType::Array => value.is_array(),
            BuiltinType::Object => value.is_object(),
        }
    }
}

fn is_integral(value: &Value) -> bool {
    let Value::Number(n) = value else { return false };
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

/// Human name for a value's kind, used in mismatch messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinValidator {
    MinLength,
    MaxLength,
    Length,
    Pattern,
    NonEmpty,
    OneOf,
    Min,
    Max,
    Range,
    Positive,
    NonNegative,
    MultipleOf,
    MinItems,
    MaxItems,
    Unique,
}

/// `(target type, constraint name, predicate)` triples registered in every repository.
pub fn catalog() -> Vec<(&'static str, &'static str, BuiltinValidator)> {
    use BuiltinValidator::*;
    let mut out = vec![
        ("String", "min", MinLength),
        ("String", "max", MaxLength),
        ("String", "length", Length),
        ("String", "pattern", Pattern),
        ("String", "nonEmpty", NonEmpty),
        ("String", "oneOf", OneOf),
        ("Array", "minItems", MinItems),
        ("Array", "maxItems", MaxItems),
        ("Array", "nonEmpty", NonEmpty),
        ("Array", "unique", Unique),
    ];
    for numeric in ["Int", "Float", "Number"] {
        out.extend([
            (numeric, "min", Min),
            (numeric, "max", Max),
            (numeric, "range", Range),
            (numeric, "positive", Positive),
            (numeric, "nonNegative", NonNegative),
            (numeric, "multipleOf", MultipleOf),
            (numeric, "oneOf", OneOf),
        ]);
    }
    out
}

impl BuiltinValidator {
    /// `Some(false)` is a violation; `None` means the predicate does not apply
    /// to this value or argument.
    pub fn check(self, value: &Value, arg: &Value) -> Option<bool> {
        use BuiltinValidator::*;
        match self {
            MinLength => Some((char_len(value)? as f64) >= arg.as_f64()?),
            MaxLength => Some((char_len(value)? as f64) <= arg.as_f64()?),
            Length => Some((char_len(value)? as f64) == arg.as_f64()?),
            Pattern => {
                value.as_str()?;
                Some(expr::Pattern::parse_literal(arg.as_str()?).ok()?.is_match(value))
            }
            NonEmpty => match value {
                Value::String(s) => Some(!s.is_empty()),
                Value::Array(xs) => Some(!xs.is_empty()),
                _ => None,
            },
            OneOf => match arg {
                Value::Array(options) => Some(options.iter().any(|o| values_equal(o, value))),
                single => Some(values_equal(single, value)),
            },
            Min => Some(number(value)? >= arg.as_f64()?),
            Max => Some(number(value)? <= arg.as_f64()?),
            Range => {
                let n = number(value)?;
                let [lo, hi] = arg.as_array()?.as_slice() else { return None };
                Some(n >= lo.as_f64()? && n <= hi.as_f64()?)
            }
            Positive => Some(number(value)? > 0.0),
            NonNegative => Some(number(value)? >= 0.0),
            MultipleOf => {
                let m = arg.as_f64()?;
                if m == 0.0 {
                    return None;
                }
                let q = number(value)? / m;
                Some((q - q.round()).abs() <= f64::EPSILON * q.abs().max(1.0) * 4.0)
            }
            MinItems => Some((value.as_array()?.len() as f64) >= arg.as_f64()?),
            MaxItems => Some((value.as_array()?.len() as f64) <= arg.as_f64()?),
            Unique => {
                let xs = value.as_array()?;
                Some(xs.iter().enumerate().all(|(i, x)| {
                    xs[i + 1..].iter().all(|y| !values_equal(x, y))
                }))
            }
        }
    }

    /// Short description of the rule, for diagnostics.
    pub fn describe(self, arg: &Value) -> String {
        use BuiltinValidator::*;
        let arg = string_of(arg);
        match self {
            MinLength => format!("length must be at least {arg}"),
            MaxLength => format!("length must be at most {arg}"),
            Length => format!("length must be exactly {arg}"),
            Pattern => format!("must match pattern {arg}"),
            NonEmpty => "must not be empty".to_string(),
            OneOf => format!("must be one of {arg}"),
            Min => format!("must be >= {arg}"),
            Max => format!("must be <= {arg}"),
            Range => format!("must be within {arg}"),
            Positive => "must be positive".to_string(),
            NonNegative => "must not be negative".to_string(),
            MultipleOf => format!("must be a multiple of {arg}"),
            MinItems => format!("must have at least {arg} items"),
            MaxItems => format!("must have at most {arg} items"),
            Unique => "items must be unique".to_string(),
        }
    }
}

fn char_len(value: &Value) -> Option<usize> {
    value.as_str().map(|s| s.chars().count())
}

fn number(value: &Value) -> Option<f64> {
    value.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(BuiltinType::Int, json!(3), true)]
    #[case(BuiltinType::Int, json!(-3), true)]
    #[case(BuiltinType::Int, json!(3.0), true)]
    #[case(BuiltinType::Int, json!(3.5), false)]
    #[case(BuiltinType::Int, json!("3"), false)]
    #[case(BuiltinType::Number, json!(3.5), true)]
    #[case(BuiltinType::Float, json!(1), true)]
    #[case(BuiltinType::Number, json!(null), false)]
    #[case(BuiltinType::String, json!(""), true)]
    #[case(BuiltinType::Bool, json!(0), false)]
    #[case(BuiltinType::Null, json!(null), true)]
    #[case(BuiltinType::Array, json!({}), false)]
    #[case(BuiltinType::Object, json!([]), false)]
    #[case(BuiltinType::Object, json!({"a": 1}), true)]
    #[case(BuiltinType::Any, json!([null]), true)]
    fn test_type_predicates(#[case] ty: BuiltinType, #[case] value: Value, #[case] ok: bool) {
        assert_eq!(ty.matches(&value), ok);
    }

    #[rstest]
    #[case(BuiltinValidator::MinLength, json!("abc"), json!(3), Some(true))]
    #[case(BuiltinValidator::MinLength, json!("ab"), json!(3), Some(false))]
    #[case(BuiltinValidator::MinLength, json!("héé"), json!(3), Some(true))]
    #[case(BuiltinValidator::MinLength, json!(12), json!(3), None)]
    #[case(BuiltinValidator::MaxLength, json!("abcd"), json!(3), Some(false))]
    #[case(BuiltinValidator::Length, json!("ab"), json!(2), Some(true))]
    #[case(BuiltinValidator::Pattern, json!("abc"), json!("^a"), Some(true))]
    #[case(BuiltinValidator::Pattern, json!("abc"), json!("/^b/"), Some(false))]
    #[case(BuiltinValidator::Pattern, json!("abc"), json!("("), None)]
    #[case(BuiltinValidator::Pattern, json!("ABC"), json!("/^a/i"), Some(true))]
    #[case(BuiltinValidator::Pattern, json!("ABC"), json!("/^a/"), Some(false))]
    #[case(BuiltinValidator::Pattern, json!("abc"), json!("/^a/q"), None)]
    #[case(BuiltinValidator::Pattern, json!(3), json!("^3"), None)]
    #[case(BuiltinValidator::NonEmpty, json!([]), json!(null), Some(false))]
    #[case(BuiltinValidator::NonEmpty, json!("x"), json!(null), Some(true))]
    #[case(BuiltinValidator::OneOf, json!("b"), json!(["a", "b"]), Some(true))]
    #[case(BuiltinValidator::OneOf, json!(2), json!([1, 3]), Some(false))]
    #[case(BuiltinValidator::Min, json!(5), json!(5), Some(true))]
    #[case(BuiltinValidator::Max, json!(6), json!(5), Some(false))]
    #[case(BuiltinValidator::Max, json!(6), json!("five"), None)]
    #[case(BuiltinValidator::Range, json!(5), json!([1, 10]), Some(true))]
    #[case(BuiltinValidator::Range, json!(11), json!([1, 10]), Some(false))]
    #[case(BuiltinValidator::Range, json!(5), json!(1), None)]
    #[case(BuiltinValidator::Positive, json!(0), json!(null), Some(false))]
    #[case(BuiltinValidator::NonNegative, json!(0), json!(null), Some(true))]
    #[case(BuiltinValidator::MultipleOf, json!(9), json!(3), Some(true))]
    #[case(BuiltinValidator::MultipleOf, json!(10), json!(3), Some(false))]
    #[case(BuiltinValidator::MultipleOf, json!(10), json!(0), None)]
    #[case(BuiltinValidator::MultipleOf, json!(0.3), json!(0.1), Some(true))]
    #[case(BuiltinValidator::MultipleOf, json!(0.7), json!(0.1), Some(true))]
    #[case(BuiltinValidator::MultipleOf, json!(0.35), json!(0.1), Some(false))]
    #[case(BuiltinValidator::MultipleOf, json!(-6), json!(1.5), Some(true))]
    #[case(BuiltinValidator::MinItems, json!([1]), json!(2), Some(false))]
    #[case(BuiltinValidator::MaxItems, json!([1]), json!(2), Some(true))]
    #[case(BuiltinValidator::Unique, json!([1, 2, 1.0]), json!(null), Some(false))]
    #[case(BuiltinValidator::Unique, json!([1, "1"]), json!(null), Some(true))]
    fn test_validator_predicates(
        #[case] validator: BuiltinValidator,
        #[case] value: Value,
        #[case] arg: Value,
        #[case] expected: Option<bool>,
    ) {
        assert_eq!(validator.check(&value, &arg), expected);
    }

    #[test]
    fn test_catalog_covers_numeric_types() {
        let catalog = catalog();
        for ty in ["Int", "Float", "Number"] {
            assert!(catalog.iter().any(|(t, c, _)| *t == ty && *c == "range"));
        }
        assert!(catalog.iter().any(|(t, c, v)| *t == "String" && *c == "min" && *v == BuiltinValidator::MinLength));
    }
}
