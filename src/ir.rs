// Type-expression IR consumed by the evaluator. Owned by the repository;
// the evaluator only ever borrows it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expr::Guard;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeNode {
    /// Reference to a builtin or user-defined type, with attached constraints.
    Named {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        constraints: Vec<ConstraintUsage>,
    },
    /// `Name?`: `null` or a `Name`.
    NullableNamed { name: String },
    /// `null` or whatever `inner` accepts.
    Nullable { inner: Box<TypeNode> },
    Array {
        items: Box<TypeNode>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        constraints: Vec<ConstraintUsage>,
    },
    Record { fields: Vec<FieldDef> },
    Dict { key: Box<TypeNode>, value: Box<TypeNode> },
    Union { members: Vec<TypeNode> },
    Intersection { members: Vec<TypeNode> },
    /// `when <condition> then <then> else <else>`
    Conditional {
        condition: Guard,
        then: Box<TypeNode>,
        #[serde(rename = "else")]
        otherwise: Box<TypeNode>,
    },
    Literal { value: Value },
    /// Only meaningful as a field type: the key must not be present.
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeNode,
    #[serde(default)]
    pub optional: bool,
    /// Raw default expression; its presence makes the field omittable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A constraint attached to a `Named` or `Array` node, e.g. `String(min: 3)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintUsage {
    pub name: String,
    /// Raw, uncoerced call arguments in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Raw single argument, used when there are no call arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<Value>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTORS
// ————————————————————————————————————————————————————————————————————————————

impl TypeNode {
    pub fn named(name: impl Into<String>) -> Self {
        TypeNode::Named { name: name.into(), constraints: Vec::new() }
    }
    pub fn named_with(name: impl Into<String>, constraints: Vec<ConstraintUsage>) -> Self {
        TypeNode::Named { name: name.into(), constraints }
    }
    pub fn nullable_named(name: impl Into<String>) -> Self {
        TypeNode::NullableNamed { name: name.into() }
    }
    pub fn nullable(inner: TypeNode) -> Self {
        TypeNode::Nullable { inner: Box::new(inner) }
    }
    pub fn array(items: TypeNode) -> Self {
        TypeNode::Array { items: Box::new(items), constraints: Vec::new() }
    }
    pub fn array_with(items: TypeNode, constraints: Vec<ConstraintUsage>) -> Self {
        TypeNode::Array { items: Box::new(items), constraints }
    }
    pub fn record(fields: Vec<FieldDef>) -> Self {
        TypeNode::Record { fields }
    }
    pub fn dict(key: TypeNode, value: TypeNode) -> Self {
        TypeNode::Dict { key: Box::new(key), value: Box::new(value) }
    }
    pub fn union(members: Vec<TypeNode>) -> Self {
        TypeNode::Union { members }
    }
    pub fn intersection(members: Vec<TypeNode>) -> Self {
        TypeNode::Intersection { members }
    }
    pub fn conditional(condition: &str, then: TypeNode, otherwise: TypeNode) -> Self {
        TypeNode::Conditional {
            condition: Guard::parse(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }
    pub fn literal(value: impl Into<Value>) -> Self {
        TypeNode::Literal { value: value.into() }
    }

    /// Short human-readable rendering used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TypeNode::Named { name, .. } => name.clone(),
            TypeNode::NullableNamed { name } => format!("{name}?"),
            TypeNode::Nullable { inner } => format!("{}?", inner.describe()),
            TypeNode::Array { items, .. } => format!("{}[]", items.describe()),
            TypeNode::Record { .. } => "record".to_string(),
            TypeNode::Dict { key, value } => {
                format!("dict<{}, {}>", key.describe(), value.describe())
            }
            TypeNode::Union { members } => members
                .iter()
                .map(TypeNode::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            TypeNode::Intersection { members } => members
                .iter()
                .map(TypeNode::describe)
                .collect::<Vec<_>>()
                .join(" & "),
            TypeNode::Conditional { then, otherwise, .. } => {
                format!("{} | {}", then.describe(), otherwise.describe())
            }
            TypeNode::Literal { value } => value.to_string(),
            TypeNode::Absent => "absent".to_string(),
        }
    }
}

impl FieldDef {
    pub fn required(name: impl Into<String>, ty: TypeNode) -> Self {
        FieldDef { name: name.into(), ty, optional: false, default: None }
    }
    pub fn optional(name: impl Into<String>, ty: TypeNode) -> Self {
        FieldDef { name: name.into(), ty, optional: true, default: None }
    }
    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

impl ConstraintUsage {
    pub fn call<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConstraintUsage {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
            argument: None,
        }
    }
    pub fn flag(name: impl Into<String>) -> Self {
        ConstraintUsage { name: name.into(), ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_tagged_nodes() {
        let node: TypeNode = serde_json::from_value(json!({
            "kind": "record",
            "fields": [
                { "name": "title", "type": { "kind": "named", "name": "String",
                    "constraints": [{ "name": "min", "args": ["3"] }] } },
                { "name": "tags", "type": { "kind": "array", "items": { "kind": "named", "name": "String" } },
                  "optional": true },
                { "name": "reason", "type": {
                    "kind": "conditional",
                    "condition": "status = \"Rejected\"",
                    "then": { "kind": "named", "name": "String" },
                    "else": { "kind": "absent" } } }
            ]
        }))
        .unwrap();

        let TypeNode::Record { fields } = node else { panic!("expected record") };
        assert_eq!(fields.len(), 3);
        assert!(!fields[0].optional);
        assert!(fields[1].optional);
        assert!(matches!(&fields[0].ty, TypeNode::Named { constraints, .. }
            if constraints[0].name == "min" && constraints[0].args == vec!["3"]));
        assert!(matches!(&fields[2].ty, TypeNode::Conditional { otherwise, .. }
            if matches!(**otherwise, TypeNode::Absent)));
    }

    #[test]
    fn test_describe() {
        let node = TypeNode::union(vec![
            TypeNode::named("Int"),
            TypeNode::array(TypeNode::nullable_named("String")),
        ]);
        assert_eq!(node.describe(), "Int | String?[]");
        assert_eq!(TypeNode::literal("Draft").describe(), "\"Draft\"");
    }
}
