//! Structural evaluator: walks a JSON value in lock-step with a type expression.
//!
//! Every structural mismatch becomes a diagnostic in the caller's
//! [`Diagnostics`]; nothing here returns an error. Named types are resolved
//! through the repository on every visit, so recursive schemas are followed
//! lazily (and unboundedly: depth is the caller's concern).
pub mod constraint;

use serde_json::Value;

use crate::diagnostic::{
    dict_key_path, dict_value_path, field_path, index_path, Diagnostics, ErrorCode,
};
use crate::expr::values_equal;
use crate::ir::{ConstraintUsage, FieldDef, TypeNode};
use crate::repository::builtin::kind_name;
use crate::repository::{Repository, TypeDefinition};

/// Where the evaluator is in the document. Replaced, never mutated, on each
/// descent into an array element, record field, or dict entry.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'v> {
    pub root: &'v Value,
    pub current: &'v Value,
    /// Enclosing array or object; `None` at the root.
    pub parent: Option<&'v Value>,
}

impl<'v> Scope<'v> {
    pub fn root(root: &'v Value) -> Self {
        Scope { root, current: root, parent: None }
    }

    pub fn descend(self, current: &'v Value, parent: &'v Value) -> Self {
        Scope { root: self.root, current, parent: Some(parent) }
    }

    /// Object that conditional guards are evaluated against.
    fn guard_target(&self) -> &'v Value {
        self.parent.unwrap_or(self.root)
    }
}

pub struct Evaluator<'r> {
    repo: &'r dyn Repository,
}

impl<'r> Evaluator<'r> {
    pub fn new(repo: &'r dyn Repository) -> Self {
        Evaluator { repo }
    }

    pub fn validate(
        &self,
        value: &Value,
        node: &TypeNode,
        path: &str,
        scope: Scope<'_>,
        out: &mut Diagnostics,
    ) {
        match node {
            TypeNode::Named { name, constraints } => {
                self.validate_named(value, name, constraints, path, scope, out)
            }
            TypeNode::NullableNamed { name } => {
                if !value.is_null() {
                    self.validate_named(value, name, &[], path, scope, out)
                }
            }
            TypeNode::Nullable { inner } => {
                if !value.is_null() {
                    self.validate(value, inner, path, scope, out)
                }
            }
            TypeNode::Array { items, constraints } => {
                self.validate_array(value, items, constraints, path, scope, out)
            }
            TypeNode::Record { fields } => self.validate_record(value, fields, path, scope, out),
            TypeNode::Dict { key, value: value_ty } => {
                self.validate_dict(value, key, value_ty, path, scope, out)
            }
            TypeNode::Union { members } => {
                if !members.iter().any(|m| self.accepts(value, m, path, scope)) {
                    out.push(
                        path,
                        ErrorCode::TypeMismatch,
                        format!("expected {}, got {}", node.describe(), kind_name(value)),
                    );
                }
            }
            TypeNode::Intersection { members } => {
                for member in members {
                    self.validate(value, member, path, scope, out);
                }
            }
            TypeNode::Conditional { condition, then, otherwise } => {
                match condition.eval(scope.guard_target()) {
                    Some(true) => self.validate(value, then, path, scope, out),
                    Some(false) => self.validate(value, otherwise, path, scope, out),
                    None => {
                        if !self.accepts(value, then, path, scope)
                            && !self.accepts(value, otherwise, path, scope)
                        {
                            out.push(
                                path,
                                ErrorCode::TypeMismatch,
                                format!("value matches neither branch of `when {condition}`"),
                            );
                        }
                    }
                }
            }
            TypeNode::Literal { value: expected } => {
                if !values_equal(value, expected) {
                    out.push(
                        path,
                        ErrorCode::TypeMismatch,
                        format!("expected literal {expected}, got {value}"),
                    );
                }
            }
            TypeNode::Absent => {
                if !value.is_null() {
                    out.push(path, ErrorCode::FieldMustBeAbsent, "field must be absent");
                }
            }
        }
    }

    /// Isolated sub-evaluation: true iff `node` yields no diagnostics.
    pub fn accepts(&self, value: &Value, node: &TypeNode, path: &str, scope: Scope<'_>) -> bool {
        let mut trial = Diagnostics::new();
        self.validate(value, node, path, scope, &mut trial);
        trial.is_empty()
    }

    fn validate_named(
        &self,
        value: &Value,
        name: &str,
        constraints: &[ConstraintUsage],
        path: &str,
        scope: Scope<'_>,
        out: &mut Diagnostics,
    ) {
        tracing::trace!(%path, type_name = name, "named");
        match self.repo.get_type(name) {
            None => out.push(path, ErrorCode::UnknownType, format!("unknown type '{name}'")),
            Some(TypeDefinition::Builtin(builtin)) => {
                if !builtin.matches(value) {
                    out.push(
                        path,
                        ErrorCode::TypeMismatch,
                        format!("expected {name}, got {}", kind_name(value)),
                    );
                    return;
                }
                self.apply_constraints(name, constraints, value, path, out);
            }
            Some(TypeDefinition::UserDefined(body)) => {
                self.validate(value, body, path, scope, out);
                self.apply_constraints(name, constraints, value, path, out);
            }
        }
    }

    fn validate_array(
        &self,
        value: &Value,
        items: &TypeNode,
        constraints: &[ConstraintUsage],
        path: &str,
        scope: Scope<'_>,
        out: &mut Diagnostics,
    ) {
        let Some(elements) = value.as_array() else {
            out.push(
                path,
                ErrorCode::TypeMismatch,
                format!("expected array, got {}", kind_name(value)),
            );
            return;
        };
        self.apply_constraints("Array", constraints, value, path, out);
        for (i, element) in elements.iter().enumerate() {
            let child = scope.descend(element, value);
            self.validate(element, items, &index_path(path, i), child, out);
        }
    }

    fn validate_record(
        &self,
        value: &Value,
        fields: &[FieldDef],
        path: &str,
        scope: Scope<'_>,
        out: &mut Diagnostics,
    ) {
        let Some(map) = value.as_object() else {
            out.push(
                path,
                ErrorCode::TypeMismatch,
                format!("expected object, got {}", kind_name(value)),
            );
            return;
        };
        // undeclared keys are ignored
        for field in fields {
            let field_at = field_path(path, &field.name);
            match map.get(&field.name) {
                Some(field_value) => {
                    let child = scope.descend(field_value, value);
                    self.validate(field_value, &field.ty, &field_at, child, out);
                }
                None => {
                    if field.optional
                        || field.default.is_some()
                        || self.admits_absence(&field.ty, value)
                    {
                        continue;
                    }
                    out.push(
                        &field_at,
                        ErrorCode::FieldMissing,
                        format!("missing required field '{}'", field.name),
                    );
                }
            }
        }
    }

    fn validate_dict(
        &self,
        value: &Value,
        key_ty: &TypeNode,
        value_ty: &TypeNode,
        path: &str,
        scope: Scope<'_>,
        out: &mut Diagnostics,
    ) {
        let Some(map) = value.as_object() else {
            out.push(
                path,
                ErrorCode::TypeMismatch,
                format!("expected object, got {}", kind_name(value)),
            );
            return;
        };
        for (key, entry) in map {
            let key_value = Value::String(key.clone());
            let key_scope = scope.descend(&key_value, value);
            self.validate(&key_value, key_ty, &dict_key_path(path, key), key_scope, out);
            let entry_scope = scope.descend(entry, value);
            self.validate(entry, value_ty, &dict_value_path(path, key), entry_scope, out);
        }
    }

    /// Whether a field of type `node` may be left out of `record` entirely.
    fn admits_absence(&self, node: &TypeNode, record: &Value) -> bool {
        match node {
            TypeNode::Absent => true,
            TypeNode::Nullable { inner } => self.admits_absence(inner, record),
            TypeNode::Conditional { condition, then, otherwise } => match condition.eval(record) {
                Some(true) => self.admits_absence(then, record),
                Some(false) => self.admits_absence(otherwise, record),
                None => self.admits_absence(then, record) || self.admits_absence(otherwise, record),
            },
            _ => false,
        }
    }
}
