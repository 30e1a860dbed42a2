//! Validate decoded JSON against a compiled schema repository.
//!
//! ```no_run
//! use json_tyck::{validate_str, SchemaRepository};
//!
//! let repo = SchemaRepository::from_path("schema.json").unwrap();
//! for error in validate_str(r#"{"title": 1}"#, &repo, None) {
//!     eprintln!("{error}");
//! }
//! ```
pub mod diagnostic;
pub mod eval;
pub mod expr;
pub mod ir;
pub mod path_de;
pub mod repository;

use serde_json::Value;

pub use diagnostic::{Diagnostics, ErrorCategory, ErrorCode, ValidationError};
pub use eval::{Evaluator, Scope};
pub use ir::{ConstraintUsage, FieldDef, TypeNode};
pub use repository::{
    CustomValidator, Param, Repository, RepositoryError, SchemaDocument, SchemaRepository,
    TypeDefinition, ValidatorDefinition,
};

/// Schema specification version this engine implements.
pub const SPEC_VERSION: &str = "1.0";

/// Validate an already-decoded value against `root_type` (or the repository's
/// default root). Diagnostics come back in document pre-order.
///
/// Only an unresolvable root type stops validation early.
pub fn validate(value: &Value, repo: &dyn Repository, root_type: Option<&str>) -> Vec<ValidationError> {
    let root = match repo.resolve_root_type(root_type) {
        Ok(root) => root,
        Err(err) => {
            return vec![ValidationError::new(
                diagnostic::ROOT_PATH,
                ErrorCode::UnknownType,
                err.to_string(),
            )];
        }
    };
    let node = TypeNode::named(root.as_str());
    let mut out = Diagnostics::new();
    Evaluator::new(repo).validate(value, &node, diagnostic::ROOT_PATH, Scope::root(value), &mut out);
    tracing::debug!(%root, errors = out.len(), "validated");
    out.into_vec()
}

/// Decode `text` and validate it. Malformed JSON yields a single
/// `InvalidExpression` diagnostic at `$`.
pub fn validate_str(text: &str, repo: &dyn Repository, root_type: Option<&str>) -> Vec<ValidationError> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => validate(&value, repo, root_type),
        Err(err) => vec![ValidationError::new(
            diagnostic::ROOT_PATH,
            ErrorCode::InvalidExpression,
            format!("invalid JSON: {err}"),
        )],
    }
}
