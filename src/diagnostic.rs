//! Path-qualified validation diagnostics and the per-call collector.
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    ParseError,
    TypeError,
    ValidationError,
    SemanticError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Input text is not well-formed JSON.
    InvalidExpression,
    UnknownType,
    TypeMismatch,
    FieldMissing,
    FieldMustBeAbsent,
    UnknownConstraint,
    /// A builtin constraint predicate returned false.
    ConstraintViolation,
    /// A custom validator body evaluated to false.
    ValidatorFailed,
}

impl ErrorCode {
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorCode::InvalidExpression => ErrorCategory::ParseError,
            ErrorCode::UnknownType | ErrorCode::TypeMismatch => ErrorCategory::TypeError,
            ErrorCode::FieldMissing
            | ErrorCode::FieldMustBeAbsent
            | ErrorCode::ConstraintViolation
            | ErrorCode::ValidatorFailed => ErrorCategory::ValidationError,
            ErrorCode::UnknownConstraint => ErrorCategory::SemanticError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One reported mismatch.
///
/// Path grammar: `$` is the root, `.name` a record field, `[i]` an array
/// element, `.[key:k]` a dict key and `.k` a dict value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
    pub code: ErrorCode,
    pub category: ErrorCategory,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        ValidationError {
            path: path.into(),
            message: message.into(),
            code,
            category: code.category(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.path, self.message, self.code)
    }
}

/// Diagnostics for one top-level validation, in document pre-order.
/// Never deduplicated.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<ValidationError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: &str, code: ErrorCode, message: impl Into<String>) {
        self.errors.push(ValidationError::new(path, code, message));
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PATHS
// ————————————————————————————————————————————————————————————————————————————

pub const ROOT_PATH: &str = "$";

pub fn field_path(parent: &str, name: &str) -> String {
    format!("{parent}.{name}")
}

pub fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

pub fn dict_key_path(parent: &str, key: &str) -> String {
    format!("{parent}.[key:{key}]")
}

pub fn dict_value_path(parent: &str, key: &str) -> String {
    format!("{parent}.{key}")
}
