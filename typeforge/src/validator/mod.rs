//! Data validation.
//!
//! The [`Validator`] trait is the seam between the serializer and whatever
//! engine checks wire data against the compiled schema. The built-in
//! [`SchemaValidator`] runs the document through the `jsonschema` crate and
//! collects every violation instead of stopping at the first.

mod formats;
mod schema_validator;

pub use formats::{check_format, parse_time, FORMATS};
pub use schema_validator::SchemaValidator;

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::error::{ErrorItem, ValidationError};

/// Checks wire data against a compiled schema.
pub trait Validator: Send + Sync {
    /// Every violation found, in document order. Empty when the data is valid.
    fn validate(&self, instance: &JsonValue) -> Vec<ErrorItem>;

    /// [`validate`](Self::validate) folded into a `Result`.
    fn check(&self, instance: &JsonValue) -> Result<(), ValidationError> {
        let errors = self.validate(instance);
        if errors.is_empty() {
            trace!("Validation passed");
            return Ok(());
        }
        let paths: Vec<_> = errors.iter().map(|e| e.instance_path.as_str()).collect();
        debug!(
            error_count = errors.len(),
            paths = ?paths,
            "Validation failed"
        );
        Err(ValidationError::new(errors))
    }
}
