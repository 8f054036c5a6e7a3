//! IR to JSON Schema.
//!
//! # Fragments
//!
//! | IR | Schema |
//! |----|--------|
//! | `Integer` | `{"type":"integer","format":"int64"}` |
//! | `Float` | `{"type":"number"}` |
//! | `Decimal` | `oneOf` decimal string / decimal number |
//! | `String` | `{"type":"string"}` |
//! | `Bytes`, `Uuid`, `Date`, `Time`, `DateTime` | `string` with a format |
//! | `Literal`, `Enum` | `{"enum":[...]}` |
//! | `Optional` | `{"anyOf":[{"type":"null"}, inner]}` |
//! | `Array`, `Tuple` | `array` with `items` / `prefixItems` |
//! | `Dictionary` | `object` with `additionalProperties` |
//! | records, recursion holders | `$ref` to the definition |
//! | `Union` | `anyOf` |
//! | `DiscriminatedUnion` | `oneOf` plus a `discriminator` mapping |
//! | `Any` | `{}` |
//! | `Never` | `{"not":{}}` |

use indexmap::IndexMap;
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use crate::ir::{
    DiscriminatedUnion, LengthBounds, Node, NumericBounds, RecordType, TypeGraph, TypeKind,
};

use super::{definition_ref, SchemaDocument};

/// Compiles a [`TypeGraph`] into a [`SchemaDocument`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use typeforge::annotations::Annotations;
/// use typeforge::expr::{TypeExpr, TypeRegistry};
/// use typeforge::resolver::TypeResolver;
/// use typeforge::schema::SchemaCompiler;
///
/// let graph = TypeResolver::new(Arc::new(TypeRegistry::new()))
///     .resolve_root(&TypeExpr::list(TypeExpr::Int), &Annotations::new())
///     .unwrap();
/// let schema = SchemaCompiler::compile(&graph).into_value();
/// assert_eq!(schema["type"], "array");
/// ```
#[derive(Debug, Default)]
pub struct SchemaCompiler {
    definitions: IndexMap<String, JsonValue>,
}

impl SchemaCompiler {
    pub fn compile(graph: &TypeGraph) -> SchemaDocument {
        let mut compiler = SchemaCompiler::default();
        let root = compiler.compile_node(graph.root());
        debug!(
            definitions = compiler.definitions.len(),
            "Schema compiled"
        );
        SchemaDocument::new(root, compiler.definitions)
    }

    fn compile_node(&mut self, node: &Node) -> JsonValue {
        match &node.kind {
            // Primitives
            TypeKind::Integer(bounds) => {
                with_numeric_bounds(json!({"type": "integer", "format": "int64"}), bounds)
            }
            TypeKind::Float(bounds) => with_numeric_bounds(json!({"type": "number"}), bounds),
            TypeKind::Decimal(bounds) => with_numeric_bounds(
                json!({"oneOf": [
                    {"type": "string", "format": "decimal"},
                    {"type": "number", "format": "decimal"}
                ]}),
                bounds,
            ),
            TypeKind::String(bounds) => {
                with_length_bounds(json!({"type": "string"}), bounds, "minLength", "maxLength")
            }
            TypeKind::Boolean => json!({"type": "boolean"}),
            TypeKind::Bytes => string_format("binary"),
            TypeKind::Uuid => string_format("uuid"),
            TypeKind::Date => string_format("date"),
            TypeKind::Time => string_format("time"),
            TypeKind::DateTime => string_format("date-time"),

            // Value sets
            TypeKind::Literal(values) => {
                json!({"enum": values.iter().map(|v| v.to_json()).collect::<Vec<_>>()})
            }
            TypeKind::Enum(def) => {
                json!({"enum": def.members.iter().map(|m| m.value.to_json()).collect::<Vec<_>>()})
            }

            // Compound types
            TypeKind::Optional(inner) => {
                json!({"anyOf": [{"type": "null"}, self.compile_node(inner)]})
            }
            TypeKind::Array { item, bounds } => with_length_bounds(
                json!({"type": "array", "items": self.compile_node(item)}),
                bounds,
                "minItems",
                "maxItems",
            ),
            TypeKind::Tuple(items) => {
                let prefix: Vec<JsonValue> = items.iter().map(|i| self.compile_node(i)).collect();
                json!({
                    "type": "array",
                    "prefixItems": prefix,
                    "minItems": items.len(),
                    "maxItems": items.len(),
                })
            }
            TypeKind::Dictionary { value, .. } => {
                json!({"type": "object", "additionalProperties": self.compile_node(value)})
            }

            // Records and unions
            TypeKind::Entity(record) | TypeKind::TypedDict(record) => self.compile_record(record),
            TypeKind::RecursionHolder(holder) => json!({"$ref": definition_ref(&holder.name)}),
            TypeKind::Union(items) => {
                let alternatives: Vec<JsonValue> =
                    items.iter().map(|i| self.compile_node(i)).collect();
                json!({"anyOf": alternatives})
            }
            TypeKind::DiscriminatedUnion(union) => self.compile_discriminated(union),

            // Special types
            TypeKind::Any => json!({}),
            TypeKind::Never => json!({"not": {}}),
            TypeKind::Custom { schema } => schema.clone(),
        }
    }

    /// Emit the definition once and return a reference to it.
    fn compile_record(&mut self, record: &RecordType) -> JsonValue {
        if !self.definitions.contains_key(&record.name) {
            // reserve the slot so definitions keep first-visit order
            self.definitions
                .insert(record.name.clone(), JsonValue::Null);
            let definition = self.record_definition(record);
            self.definitions.insert(record.name.clone(), definition);
        }
        json!({"$ref": definition_ref(&record.name)})
    }

    fn record_definition(&mut self, record: &RecordType) -> JsonValue {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &record.fields {
            let mut schema = self.compile_node(&field.ty);
            if let (Some(doc), JsonValue::Object(map)) = (&field.doc, &mut schema) {
                map.insert("description".to_string(), JsonValue::String(doc.clone()));
            }
            properties.insert(field.dict_key.clone(), schema);
            if field.required {
                required.push(JsonValue::String(field.dict_key.clone()));
            }
        }

        let mut definition = Map::new();
        definition.insert("type".to_string(), json!("object"));
        definition.insert("properties".to_string(), JsonValue::Object(properties));
        if !required.is_empty() {
            definition.insert("required".to_string(), JsonValue::Array(required));
        }
        if let Some(doc) = &record.doc {
            definition.insert("description".to_string(), JsonValue::String(doc.clone()));
        }
        if let Some(extra) = &record.extra {
            let additional = match extra.value.kind {
                TypeKind::Any => JsonValue::Bool(true),
                TypeKind::Never => JsonValue::Bool(false),
                _ => self.compile_node(&extra.value),
            };
            definition.insert("additionalProperties".to_string(), additional);
        }
        JsonValue::Object(definition)
    }

    fn compile_discriminated(&mut self, union: &DiscriminatedUnion) -> JsonValue {
        let mut alternatives = Vec::with_capacity(union.items.len());
        let mut mapping = Map::new();
        for (value, node) in &union.items {
            let schema = self.compile_node(node);
            if let Some(reference) = schema.get("$ref") {
                mapping.insert(value.clone(), reference.clone());
            }
            alternatives.push(schema);
        }
        json!({
            "oneOf": alternatives,
            "discriminator": {
                "propertyName": union.load_discriminator,
                "mapping": mapping,
            }
        })
    }
}

fn string_format(format: &str) -> JsonValue {
    json!({"type": "string", "format": format})
}

fn with_numeric_bounds(mut schema: JsonValue, bounds: &NumericBounds) -> JsonValue {
    if let JsonValue::Object(map) = &mut schema {
        if let Some(min) = &bounds.min {
            map.insert("minimum".to_string(), min.to_json());
        }
        if let Some(max) = &bounds.max {
            map.insert("maximum".to_string(), max.to_json());
        }
    }
    schema
}

fn with_length_bounds(
    mut schema: JsonValue,
    bounds: &LengthBounds,
    min_key: &str,
    max_key: &str,
) -> JsonValue {
    if let JsonValue::Object(map) = &mut schema {
        if let Some(min) = bounds.min {
            map.insert(min_key.to_string(), json!(min));
        }
        if let Some(max) = bounds.max {
            map.insert(max_key.to_string(), json!(max));
        }
    }
    schema
}
