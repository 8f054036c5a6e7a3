//! Value codecs.
//!
//! A [`CodecEngine`] compiles a [`TypeGraph`] into a [`Codec`] that converts
//! between native [`Value`]s and wire JSON. The built-in [`JsonCodecEngine`]
//! interprets the graph directly:
//!
//! - `dump` walks the value alongside the IR and emits JSON
//! - `load` walks the JSON alongside the IR and rebuilds native values,
//!   including flattened records and captured extra keys
//! - `load_query` parses string-typed query parameters
//!
//! Codec errors reuse the validator's message vocabulary, so a caller sees the
//! same wording whether or not validation ran first.

mod assemble;
mod decode;
mod encode;
mod query;

pub use query::QueryParams;

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{DefinitionError, Error, ErrorItem, ValidationError};
use crate::ir::TypeGraph;
use crate::value::Value;

use decode::Decoder;
use encode::Encoder;
use query::QueryDecoder;

/// Converts values of one compiled type.
pub trait Codec: Send + Sync {
    /// Native value to wire JSON.
    fn dump(&self, value: &Value) -> Result<JsonValue, ValidationError>;

    /// Wire JSON to native value. Reports the first mismatch only.
    fn load(&self, data: &JsonValue) -> Result<Value, ValidationError>;

    /// Query parameters to native value.
    fn load_query(&self, params: &QueryParams) -> Result<Value, Error>;
}

/// Builds codecs from resolved type graphs.
pub trait CodecEngine: Send + Sync {
    fn compile(&self, graph: Arc<TypeGraph>) -> Result<Box<dyn Codec>, DefinitionError>;
}

/// The built-in engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodecEngine;

impl CodecEngine for JsonCodecEngine {
    fn compile(&self, graph: Arc<TypeGraph>) -> Result<Box<dyn Codec>, DefinitionError> {
        Ok(Box::new(JsonCodec::new(graph)))
    }
}

/// Graph-interpreting codec.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    graph: Arc<TypeGraph>,
}

impl JsonCodec {
    pub fn new(graph: Arc<TypeGraph>) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }
}

impl Codec for JsonCodec {
    fn dump(&self, value: &Value) -> Result<JsonValue, ValidationError> {
        Encoder::new(&self.graph)
            .encode(self.graph.root(), value, "")
            .map_err(ValidationError::from)
    }

    fn load(&self, data: &JsonValue) -> Result<Value, ValidationError> {
        Decoder::new(&self.graph)
            .decode(self.graph.root(), data, "")
            .map_err(ValidationError::from)
    }

    fn load_query(&self, params: &QueryParams) -> Result<Value, Error> {
        QueryDecoder::new(&self.graph).load(params)
    }
}

// =============================================================================
// Messages
// =============================================================================

pub(crate) fn not_of_type(instance: impl fmt::Display, type_name: &str, path: &str) -> ErrorItem {
    ErrorItem::new(format!("{instance} is not of type \"{type_name}\""), path)
}

pub(crate) fn required_property(key: &str, path: &str) -> ErrorItem {
    ErrorItem::new(format!("\"{key}\" is a required property"), path)
}

pub(crate) fn not_one_of(instance: impl fmt::Display, allowed: &[JsonValue], path: &str) -> ErrorItem {
    ErrorItem::new(
        format!(
            "{instance} is not one of {}",
            JsonValue::Array(allowed.to_vec())
        ),
        path,
    )
}

pub(crate) fn no_alternative(instance: impl fmt::Display, path: &str) -> ErrorItem {
    ErrorItem::new(
        format!("{instance} is not valid under any of the schemas listed in the 'anyOf' keyword"),
        path,
    )
}

pub(crate) fn unknown_discriminator<'a>(
    tag: impl fmt::Display,
    known: impl Iterator<Item = &'a String>,
    path: &str,
) -> ErrorItem {
    let known: Vec<String> = known
        .map(|k| JsonValue::String(k.clone()).to_string())
        .collect();
    ErrorItem::new(
        format!(
            "{tag} is not one of [{}] discriminator values",
            known.join(", ")
        ),
        path,
    )
}

pub(crate) fn arity(instance: impl fmt::Display, expected: usize, found: usize, path: &str) -> ErrorItem {
    let relation = if found < expected { "less" } else { "more" };
    ErrorItem::new(
        format!(
            "{instance} has {relation} than {expected} {}",
            plural(expected, "item", "items")
        ),
        path,
    )
}

pub(crate) fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}

pub(crate) fn not_allowed(instance: impl fmt::Display, path: &str) -> ErrorItem {
    ErrorItem::new(format!("False schema does not allow {instance}"), path)
}

pub(crate) fn unexpected_key(key: &str, path: &str) -> ErrorItem {
    ErrorItem::new(
        format!("Additional properties are not allowed ('{key}' was unexpected)"),
        path,
    )
}
