//! Error types for the CLI.
//!
//! Each stage of a command (configuration, catalogue loading, type parsing,
//! serializer construction, output) has its own error enum; [`CliError`]
//! wraps them all.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Main error type for CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error loading configuration.
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    /// Error loading a type catalogue.
    #[error("Failed to load catalogue: {0}")]
    Catalog(#[from] CatalogError),

    /// The catalogue describes a type the serializer rejects.
    #[error("Invalid type definition: {0}")]
    Definition(#[from] typeforge::DefinitionError),

    /// Error writing output files.
    #[error("Failed to write output: {0}")]
    Write(#[from] WriteError),

    /// Data did not match the type.
    #[error("Data is invalid: {count} error(s)")]
    InvalidData { count: usize },

    /// Command-level misuse, such as overwriting a file without `--force`.
    #[error("{0}")]
    Usage(String),

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<typeforge::Error> for CliError {
    fn from(err: typeforge::Error) -> Self {
        match err {
            typeforge::Error::Definition(err) => CliError::Definition(err),
            typeforge::Error::Validation(err) => CliError::InvalidData {
                count: err.errors.len(),
            },
        }
    }
}

/// Error loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid TOML syntax.
    #[error("Invalid TOML in {path}: {message}")]
    InvalidToml { path: PathBuf, message: String },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// IO error reading config.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an invalid TOML error.
    pub fn invalid_toml(path: PathBuf, message: impl Into<String>) -> Self {
        Self::InvalidToml {
            path,
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Error loading a type catalogue.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Invalid TOML syntax or shape.
    #[error("Invalid catalogue TOML: {0}")]
    InvalidToml(String),

    /// A field type could not be parsed.
    #[error("Invalid type for field '{record}.{field}': {source}")]
    FieldType {
        record: String,
        field: String,
        #[source]
        source: TypeParseError,
    },

    /// A root type expression could not be parsed.
    #[error("Invalid root type '{text}': {source}")]
    RootType {
        text: String,
        #[source]
        source: TypeParseError,
    },

    /// Two declarations share a name.
    #[error("Duplicate declaration '{0}'")]
    Duplicate(String),

    /// An enum member value is neither a string nor an integer.
    #[error("Enum member '{enum_name}.{member}' must have a string or integer value")]
    InvalidMember { enum_name: String, member: String },

    /// A bound is neither an integer nor a float.
    #[error("Bound '{key}' on field '{record}.{field}' must be a number")]
    InvalidBound {
        record: String,
        field: String,
        key: String,
    },

    /// IO error reading the catalogue.
    #[error("Failed to read catalogue {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error parsing a type expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct TypeParseError {
    /// Byte offset into the type text
    pub offset: usize,
    pub message: String,
}

impl TypeParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Error writing output files.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to create directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write file.
    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
