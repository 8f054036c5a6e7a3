//! Error types.
//!
//! Two families of errors exist:
//!
//! - [`DefinitionError`]: raised while a type description is resolved or
//!   compiled. These abort serializer construction.
//! - [`ValidationError`]: raised per call when data does not match the
//!   compiled type. These carry one [`ErrorItem`] per violation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for serializer operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Umbrella error returned by the serializer facade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The type description cannot be compiled.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// The data does not match the compiled type.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Validation items, if this is a data error.
    pub fn errors(&self) -> &[ErrorItem] {
        match self {
            Error::Validation(err) => &err.errors,
            Error::Definition(_) => &[],
        }
    }
}

/// Failure to turn a type description into IR or schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Unknown type {0}")]
    UnknownType(String),

    #[error("Unfilled TypeVar: {0}")]
    UnfilledTypeVar(String),

    #[error("Variable length tuples are not supported")]
    VariableLengthTuple,

    #[error("Supported only Literal[str | int, ...]")]
    UnsupportedLiteral,

    #[error("Unions supported only for entities. Provided: {0}")]
    NonEntityUnion(String),

    #[error("Type {type_name} does not have discriminator field \"{field}\"")]
    MissingDiscriminator { type_name: String, field: String },

    #[error(
        "Type {type_name} has invalid discriminator field \"{field}\" with type \"{found}\". \
         Discriminator supports only Literal[<str>] with one argument."
    )]
    InvalidDiscriminator {
        type_name: String,
        field: String,
        found: String,
    },

    #[error("Duplicate discriminator value \"{value}\" in {union}")]
    DuplicateDiscriminator { union: String, value: String },

    #[error("Field name conflict in {record}: '{key}' from flattened struct field")]
    FlattenConflict { record: String, key: String },

    #[error("Duplicate field key '{key}' in {record}")]
    DuplicateField { record: String, key: String },

    #[error("Multiple dict flatten fields are not allowed in {0}")]
    MultipleDictFlatten(String),

    #[error("Flatten field '{field}' has type '{kind}' which cannot be flattened")]
    NotFlattenable { field: String, kind: String },

    #[error("Unresolved forward reference '{0}'")]
    UnresolvedReference(String),

    #[error("Recursive type not resolved: {0}")]
    UnresolvedRecursion(String),

    #[error("This type is not deserializable from query params")]
    NotQueryDeserializable,

    #[error("Invalid json schema: {0}")]
    InvalidSchema(String),
}

/// A single data violation.
///
/// Paths are `/`-joined segments with the root represented by `""`,
/// e.g. `bar/1/foo/0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorItem {
    /// Human-readable error message
    pub message: String,
    /// Location of the offending value in the instance
    pub instance_path: String,
    /// Location of the failing keyword in the schema
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schema_path: String,
}

impl ErrorItem {
    /// Create an error item without a schema location.
    pub fn new(message: impl Into<String>, instance_path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            instance_path: instance_path.into(),
            schema_path: String::new(),
        }
    }

    /// Attach the schema keyword location.
    pub fn with_schema_path(mut self, schema_path: impl Into<String>) -> Self {
        self.schema_path = schema_path.into();
        self
    }
}

impl fmt::Display for ErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Data did not match the compiled type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Schema validation failed:\n{}", render_items(.errors))]
pub struct ValidationError {
    /// Every violation found
    pub errors: Vec<ErrorItem>,
}

impl ValidationError {
    pub fn new(errors: Vec<ErrorItem>) -> Self {
        Self { errors }
    }

    /// Shorthand for a single violation.
    pub fn single(message: impl Into<String>, instance_path: impl Into<String>) -> Self {
        Self {
            errors: vec![ErrorItem::new(message, instance_path)],
        }
    }
}

impl From<ErrorItem> for ValidationError {
    fn from(item: ErrorItem) -> Self {
        Self { errors: vec![item] }
    }
}

fn render_items(items: &[ErrorItem]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Append a segment to a `/`-joined path.
pub(crate) fn child_path(parent: &str, segment: impl fmt::Display) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}/{segment}")
    }
}
