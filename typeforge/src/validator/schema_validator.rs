//! Validator backed by the `jsonschema` crate.
//!
//! Documents are compiled as draft 2020-12 with format assertions on. The
//! formats in [`FORMATS`](super::formats::FORMATS) replace the engine's own
//! checks; unknown formats such as `int64` are ignored.
//!
//! The engine does not act on `discriminator`, so a failed `oneOf` only says
//! that no alternative matched. When the failing union carries a discriminator
//! the error is replaced by what the tag selects: a missing tag, an unknown tag
//! or the violations of the mapped alternative.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use jsonschema::paths::PathChunk;
use jsonschema::{CompilationOptions, Draft, ErrorIterator, JSONSchema};
use serde_json::{Map, Value as JsonValue};

use crate::codec::{required_property, unknown_discriminator};
use crate::error::{child_path, DefinitionError, ErrorItem};

use super::formats::FORMATS;
use super::Validator;

/// Steps taken without consuming a path segment before the union search gives up.
const MAX_HOPS: usize = 32;

/// Validator over a compiled schema document.
#[derive(Clone)]
pub struct SchemaValidator {
    inner: Arc<Compiled>,
}

struct Compiled {
    root: JSONSchema,
    document: JsonValue,
    /// One compiled schema per discriminator mapping target, by `$ref`.
    alternatives: HashMap<String, JSONSchema>,
}

impl SchemaValidator {
    /// Compile `document`. `$ref`s resolve inside the document itself.
    pub fn new(document: &JsonValue) -> Result<Self, DefinitionError> {
        let options = compile_options();
        let root = compile(&options, document)?;

        let mut references = Vec::new();
        collect_mapping_refs(document, &mut references);
        let mut alternatives = HashMap::new();
        for reference in references {
            if alternatives.contains_key(&reference) {
                continue;
            }
            let mut rooted = Map::new();
            rooted.insert("$ref".to_string(), JsonValue::String(reference.clone()));
            if let Some(components) = document.get("components") {
                rooted.insert("components".to_string(), components.clone());
            }
            let compiled = compile(&options, &JsonValue::Object(rooted))?;
            alternatives.insert(reference, compiled);
        }

        Ok(Self {
            inner: Arc::new(Compiled {
                root,
                document: document.clone(),
                alternatives,
            }),
        })
    }

    pub fn is_valid(&self, instance: &JsonValue) -> bool {
        self.inner.root.is_valid(instance)
    }

    fn describe(&self, errors: ErrorIterator<'_>, prefix: &[PathChunk]) -> Vec<ErrorItem> {
        let mut items = Vec::new();
        for error in errors {
            let mut location = prefix.to_vec();
            location.extend(error.instance_path.iter().cloned());
            if matches!(error.kind, ValidationErrorKind::OneOfNotValid) {
                if let Some(explained) = self.explain_one_of(&error.instance, &location) {
                    items.extend(explained);
                    continue;
                }
            }
            items.push(
                ErrorItem::new(error.to_string(), join_path(&location))
                    .with_schema_path(join_path(&error.schema_path)),
            );
        }
        items
    }

    /// Errors for a discriminated `oneOf` at `location`, or `None` to keep the
    /// engine's message.
    fn explain_one_of(&self, instance: &JsonValue, location: &[PathChunk]) -> Option<Vec<ErrorItem>> {
        let document = &self.inner.document;
        let union = locate_union(document, document, location, 0)?;
        let discriminator = union.get("discriminator")?;
        let property = discriminator.get("propertyName")?.as_str()?;
        let mapping = discriminator.get("mapping")?.as_object()?;
        let path = join_path(location);

        let Some(tag) = instance.as_object()?.get(property) else {
            return Some(vec![required_property(property, &path)]);
        };
        let Some(reference) = tag
            .as_str()
            .and_then(|tag| mapping.get(tag))
            .and_then(JsonValue::as_str)
        else {
            return Some(vec![unknown_discriminator(
                tag,
                mapping.keys(),
                &child_path(&path, property),
            )]);
        };

        let alternative = self.inner.alternatives.get(reference)?;
        match alternative.validate(instance) {
            Ok(()) => None,
            Err(errors) => Some(self.describe(errors, location)),
        }
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("alternatives", &self.inner.alternatives.len())
            .finish_non_exhaustive()
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, instance: &JsonValue) -> Vec<ErrorItem> {
        // is_valid skips building error values
        if self.inner.root.is_valid(instance) {
            return Vec::new();
        }
        match self.inner.root.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => self.describe(errors, &[]),
        }
    }
}

fn compile_options() -> CompilationOptions {
    let mut options = JSONSchema::options();
    options
        .with_draft(Draft::Draft202012)
        .should_validate_formats(true);
    for (name, check) in FORMATS {
        options.with_format(name, check);
    }
    options
}

fn compile(options: &CompilationOptions, document: &JsonValue) -> Result<JSONSchema, DefinitionError> {
    options
        .compile(document)
        .map_err(|err| DefinitionError::InvalidSchema(err.to_string()))
}

/// Every `discriminator.mapping` target in the document.
fn collect_mapping_refs(schema: &JsonValue, references: &mut Vec<String>) {
    match schema {
        JsonValue::Object(object) => {
            if let Some(mapping) = object
                .get("discriminator")
                .and_then(|discriminator| discriminator.get("mapping"))
                .and_then(JsonValue::as_object)
            {
                references.extend(
                    mapping
                        .values()
                        .filter_map(JsonValue::as_str)
                        .map(str::to_string),
                );
            }
            for child in object.values() {
                collect_mapping_refs(child, references);
            }
        }
        JsonValue::Array(items) => {
            for child in items {
                collect_mapping_refs(child, references);
            }
        }
        _ => {}
    }
}

/// Walk `schema` along an instance path to the discriminated union that
/// governs it, following `$ref`s and trying `anyOf`/`oneOf`/`allOf` branches.
fn locate_union<'a>(
    document: &'a JsonValue,
    schema: &'a JsonValue,
    path: &[PathChunk],
    hops: usize,
) -> Option<&'a Map<String, JsonValue>> {
    if hops > MAX_HOPS {
        return None;
    }
    let object = schema.as_object()?;
    if let Some(reference) = object.get("$ref").and_then(JsonValue::as_str) {
        let target = document.pointer(reference.strip_prefix('#')?)?;
        return locate_union(document, target, path, hops + 1);
    }

    match path.split_first() {
        None if object.contains_key("discriminator") => return Some(object),
        None => {}
        Some((chunk, rest)) => {
            let child = match chunk {
                PathChunk::Property(name) => object
                    .get("properties")
                    .and_then(|properties| properties.get(&**name))
                    .or_else(|| object.get("additionalProperties")),
                PathChunk::Index(index) => object
                    .get("prefixItems")
                    .and_then(|items| items.get(*index))
                    .or_else(|| object.get("items")),
                PathChunk::Keyword(_) => None,
            };
            if let Some(found) = child.and_then(|child| locate_union(document, child, rest, 0)) {
                return Some(found);
            }
        }
    }

    ["anyOf", "oneOf", "allOf"]
        .iter()
        .filter_map(|keyword| object.get(*keyword).and_then(JsonValue::as_array))
        .flatten()
        .find_map(|branch| locate_union(document, branch, path, hops + 1))
}

fn join_path<'a>(chunks: impl IntoIterator<Item = &'a PathChunk>) -> String {
    chunks
        .into_iter()
        .map(|chunk| match chunk {
            PathChunk::Property(property) => property.to_string(),
            PathChunk::Index(index) => index.to_string(),
            PathChunk::Keyword(keyword) => keyword.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
