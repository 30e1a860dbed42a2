//! Constraint application: resolve a usage against its target type, then run
//! either a builtin predicate or a custom body.
use serde_json::Value;

use super::Evaluator;
use crate::diagnostic::{Diagnostics, ErrorCode, ValidationError};
use crate::expr::{coerce, coerce_str, Bindings};
use crate::ir::ConstraintUsage;
use crate::repository::{CustomValidator, ValidatorDefinition};

impl Evaluator<'_> {
    pub(super) fn apply_constraints(
        &self,
        target: &str,
        constraints: &[ConstraintUsage],
        value: &Value,
        path: &str,
        out: &mut Diagnostics,
    ) {
        for usage in constraints {
            if let Some(error) = self.apply_constraint(target, usage, value, path) {
                out.add(error);
            }
        }
    }

    /// At most one diagnostic per usage.
    pub fn apply_constraint(
        &self,
        target: &str,
        usage: &ConstraintUsage,
        value: &Value,
        path: &str,
    ) -> Option<ValidationError> {
        let Some(definition) = self.repo.get_validator(target, &usage.name) else {
            return Some(ValidationError::new(
                path,
                ErrorCode::UnknownConstraint,
                format!("unknown constraint '{}' for type '{target}'", usage.name),
            ));
        };
        match definition {
            ValidatorDefinition::Builtin(builtin) => {
                let arg = resolve_argument(usage);
                match builtin.check(value, &arg) {
                    Some(false) => Some(ValidationError::new(
                        path,
                        ErrorCode::ConstraintViolation,
                        format!("{target}({}): {}", usage.name, builtin.describe(&arg)),
                    )),
                    _ => None,
                }
            }
            ValidatorDefinition::Custom(custom) => {
                let params = bind_params(custom, usage);
                match custom.body.expr().eval(value, &params) {
                    Some(false) => Some(ValidationError::new(
                        path,
                        ErrorCode::ValidatorFailed,
                        format!("{target}({}) failed: {}", usage.name, custom.body.source()),
                    )),
                    Some(true) => None,
                    None => {
                        tracing::debug!(
                            constraint = %usage.name,
                            body = custom.body.source(),
                            "custom validator was indeterminate; passing",
                        );
                        None
                    }
                }
            }
        }
    }
}

/// One call argument is coerced on its own, several become a list, none
/// falls back to the raw single argument.
pub fn resolve_argument(usage: &ConstraintUsage) -> Value {
    match usage.args.as_slice() {
        [] => usage.argument.clone().unwrap_or(Value::Null),
        [single] => coerce_str(single),
        many => Value::Array(many.iter().map(|a| coerce_str(a)).collect()),
    }
}

/// Bind call arguments to declared parameters by position; unbound parameters
/// take their coerced default, or stay unbound.
pub fn bind_params(validator: &CustomValidator, usage: &ConstraintUsage) -> Bindings {
    let args: Vec<Value> = if usage.args.is_empty() {
        usage.argument.iter().map(coerce).collect()
    } else {
        usage.args.iter().map(|a| coerce_str(a)).collect()
    };
    let mut bound = Bindings::new();
    for (i, param) in validator.params.iter().enumerate() {
        if let Some(arg) = args.get(i) {
            bound.insert(param.name.clone(), arg.clone());
        } else if let Some(default) = &param.default {
            bound.insert(param.name.clone(), coerce_str(default));
        }
    }
    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Body;
    use crate::repository::{Param, SchemaRepository};
    use serde_json::json;

    fn between() -> CustomValidator {
        CustomValidator {
            name: "between".to_string(),
            params: vec![
                Param { name: "lo".to_string(), default: Some("0".to_string()) },
                Param { name: "hi".to_string(), default: Some("100".to_string()) },
            ],
            body: Body::parse("this >= $lo and this <= $hi"),
        }
    }

    fn repo() -> SchemaRepository {
        let mut repo = SchemaRepository::new();
        repo.define_validator(&["Int"], between());
        repo.define_validator(
            &["String"],
            CustomValidator {
                name: "fuzzy".to_string(),
                params: Vec::new(),
                body: Body::parse("this is roughly fine"),
            },
        );
        repo
    }

    #[test]
    fn test_resolve_argument() {
        assert_eq!(resolve_argument(&ConstraintUsage::call("min", ["3"])), json!(3));
        assert_eq!(resolve_argument(&ConstraintUsage::call("range", ["1", "'a'"])), json!([1, "a"]));
        let raw = ConstraintUsage { name: "min".into(), args: vec![], argument: Some(json!("3")) };
        assert_eq!(resolve_argument(&raw), json!("3"));
        assert_eq!(resolve_argument(&ConstraintUsage::flag("unique")), json!(null));
    }

    #[test]
    fn test_bind_params_fills_defaults() {
        let bound = bind_params(&between(), &ConstraintUsage::call("between", ["5"]));
        assert_eq!(bound.get("lo"), Some(&json!(5)));
        assert_eq!(bound.get("hi"), Some(&json!(100)));
    }

    #[test]
    fn test_builtin_violation() {
        let repo = repo();
        let eval = Evaluator::new(&repo);
        let err = eval
            .apply_constraint("String", &ConstraintUsage::call("min", ["3"]), &json!("ab"), "$.name")
            .unwrap();
        assert_eq!(err.code, ErrorCode::ConstraintViolation);
        assert_eq!(err.path, "$.name");
        assert!(eval
            .apply_constraint("String", &ConstraintUsage::call("min", ["3"]), &json!("abc"), "$")
            .is_none());
    }

    #[test]
    fn test_custom_validator() {
        let repo = repo();
        let eval = Evaluator::new(&repo);
        let usage = ConstraintUsage::call("between", ["1", "10"]);
        assert!(eval.apply_constraint("Int", &usage, &json!(5), "$").is_none());
        let err = eval.apply_constraint("Int", &usage, &json!(50), "$").unwrap();
        assert_eq!(err.code, ErrorCode::ValidatorFailed);

        // defaults only
        let usage = ConstraintUsage::flag("between");
        assert!(eval.apply_constraint("Int", &usage, &json!(50), "$").is_none());
        assert!(eval.apply_constraint("Int", &usage, &json!(500), "$").is_some());
    }

    #[test]
    fn test_unrecognized_body_passes() {
        let repo = repo();
        let eval = Evaluator::new(&repo);
        assert!(eval
            .apply_constraint("String", &ConstraintUsage::flag("fuzzy"), &json!("x"), "$")
            .is_none());
    }

    #[test]
    fn test_unknown_constraint() {
        let repo = repo();
        let eval = Evaluator::new(&repo);
        let err = eval
            .apply_constraint("Int", &ConstraintUsage::call("unknownRule", ["1"]), &json!(10), "$.value")
            .unwrap();
        assert_eq!(err.code, ErrorCode::UnknownConstraint);
        assert_eq!(err.category, crate::ErrorCategory::SemanticError);
    }
}
