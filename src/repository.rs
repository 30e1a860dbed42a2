//! Read-only catalog of type and validator definitions for one compiled schema.
//!
//! The evaluator only talks to the [`Repository`] trait. [`SchemaRepository`]
//! is the in-memory implementation, built programmatically or loaded from a
//! compiled schema document:
//!
//! ```json
//! { "version": "1.0", "root": "Root",
//!   "types": { "Root": { "kind": "record", "fields": [...] } },
//!   "validators": [ { "name": "even", "applies_to": ["Int"], "body": "..." } ] }
//! ```
pub mod builtin;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::Body;
use crate::ir::TypeNode;

pub use builtin::{BuiltinType, BuiltinValidator};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub enum TypeDefinition {
    Builtin(BuiltinType),
    UserDefined(TypeNode),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    /// Raw default expression, coerced when the parameter is left unbound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomValidator {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    pub body: Body,
}

#[derive(Debug, Clone)]
pub enum ValidatorDefinition {
    Builtin(BuiltinValidator),
    Custom(CustomValidator),
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("no root type given and the schema does not declare one")]
    NoDefaultRoot,
    #[error("'{0}' is a builtin type and cannot be redefined")]
    ReservedName(String),
    #[error("failed to read schema {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid schema document at {path}: {message}")]
    Schema { path: String, message: String },
}

/// Lookups the evaluator needs. Implementations must be safe to share across
/// threads for reading.
pub trait Repository {
    /// Resolve the root type name, falling back to the schema's default.
    fn resolve_root_type(&self, name: Option<&str>) -> Result<String, RepositoryError>;
    fn get_type(&self, name: &str) -> Option<&TypeDefinition>;
    fn get_validator(&self, target_type: &str, constraint: &str) -> Option<&ValidatorDefinition>;
}

/// Serialized form of a compiled schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default)]
    pub types: IndexMap<String, TypeNode>,
    #[serde(default)]
    pub validators: Vec<ValidatorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorEntry {
    /// Target type names; empty means any type.
    #[serde(default)]
    pub applies_to: Vec<String>,
    #[serde(flatten)]
    pub validator: CustomValidator,
}

fn default_version() -> String {
    crate::SPEC_VERSION.to_string()
}

#[derive(Debug, Clone)]
pub struct SchemaRepository {
    version: String,
    root: Option<String>,
    types: IndexMap<String, TypeDefinition>,
    /// target type → constraint name → definition
    validators: IndexMap<String, IndexMap<String, ValidatorDefinition>>,
    /// validators that apply to any target type
    generic: IndexMap<String, ValidatorDefinition>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Default for SchemaRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRepository {
    /// An empty repository pre-seeded with the builtin catalog.
    pub fn new() -> Self {
        let mut repo = SchemaRepository {
            version: crate::SPEC_VERSION.to_string(),
            root: None,
            types: IndexMap::new(),
            validators: IndexMap::new(),
            generic: IndexMap::new(),
        };
        for ty in BuiltinType::ALL {
            repo.types.insert(ty.name().to_string(), TypeDefinition::Builtin(ty));
        }
        for (target, name, validator) in builtin::catalog() {
            repo.validators
                .entry(target.to_string())
                .or_default()
                .insert(name.to_string(), ValidatorDefinition::Builtin(validator));
        }
        repo
    }

    pub fn from_document(document: SchemaDocument) -> Result<Self, RepositoryError> {
        if document.version != crate::SPEC_VERSION {
            tracing::warn!(
                schema = %document.version,
                engine = crate::SPEC_VERSION,
                "schema version differs from the engine's",
            );
        }
        let mut repo = Self::new();
        repo.version = document.version;
        for (name, node) in document.types {
            repo.define_type(name, node)?;
        }
        for entry in document.validators {
            repo.define_validator(&entry.applies_to, entry.validator);
        }
        repo.root = document.root;
        Ok(repo)
    }

    pub fn from_json_str(source: &str) -> Result<Self, RepositoryError> {
        Self::from_document(crate::path_de::from_str_with_path(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| RepositoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_document(crate::path_de::from_slice_with_path(&bytes)?)
    }

    pub fn define_type(
        &mut self,
        name: impl Into<String>,
        node: TypeNode,
    ) -> Result<&mut Self, RepositoryError> {
        let name = name.into();
        if matches!(self.types.get(&name), Some(TypeDefinition::Builtin(_))) {
            return Err(RepositoryError::ReservedName(name));
        }
        self.types.insert(name, TypeDefinition::UserDefined(node));
        Ok(self)
    }

    /// Register a custom validator for each name in `applies_to`, or for every
    /// type when `applies_to` is empty.
    pub fn define_validator<S: AsRef<str>>(
        &mut self,
        applies_to: &[S],
        validator: CustomValidator,
    ) -> &mut Self {
        let name = validator.name.clone();
        if applies_to.is_empty() {
            self.generic.insert(name, ValidatorDefinition::Custom(validator));
            return self;
        }
        for target in applies_to {
            self.validators
                .entry(target.as_ref().to_string())
                .or_default()
                .insert(name.clone(), ValidatorDefinition::Custom(validator.clone()));
        }
        self
    }

    pub fn set_root(&mut self, name: impl Into<String>) -> &mut Self {
        self.root = Some(name.into());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn user_type_names(&self) -> impl Iterator<Item = &String> {
        self.types
            .iter()
            .filter(|(_, def)| matches!(def, TypeDefinition::UserDefined(_)))
            .map(|(name, _)| name)
    }
}

impl Repository for SchemaRepository {
    fn resolve_root_type(&self, name: Option<&str>) -> Result<String, RepositoryError> {
        let name = match name.or(self.root.as_deref()) {
            Some(name) => name.to_string(),
            None => {
                let mut user = self.user_type_names();
                match (user.next(), user.next()) {
                    (Some(only), None) => only.clone(),
                    _ => return Err(RepositoryError::NoDefaultRoot),
                }
            }
        };
        if self.types.contains_key(&name) {
            Ok(name)
        } else {
            Err(RepositoryError::UnknownType(name))
        }
    }

    fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// Looks at the target type, then down its alias chain, then at the
    /// validators that apply to any type.
    fn get_validator(&self, target_type: &str, constraint: &str) -> Option<&ValidatorDefinition> {
        let mut seen = HashSet::new();
        let mut current = target_type;
        while seen.insert(current) {
            if let Some(found) = self.validators.get(current).and_then(|m| m.get(constraint)) {
                return Some(found);
            }
            match self.types.get(current) {
                Some(TypeDefinition::UserDefined(
                    TypeNode::Named { name, .. } | TypeNode::NullableNamed { name },
                )) => current = name.as_str(),
                _ => break,
            }
        }
        self.generic.get(constraint)
    }
}
