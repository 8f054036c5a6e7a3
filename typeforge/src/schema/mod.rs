//! JSON Schema compilation.
//!
//! [`SchemaCompiler`] walks a [`TypeGraph`](crate::ir::TypeGraph) and emits a
//! draft 2020-12 document. Each record is emitted once, under its generated
//! name, in `components/schemas`; every use site is a `$ref`.

mod compiler;

pub use compiler::SchemaCompiler;

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

/// Dialect URI placed in every document.
pub const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Prefix of record references.
pub const REF_PREFIX: &str = "#/components/schemas/";

/// Reference to a record definition.
pub fn definition_ref(name: &str) -> String {
    format!("{REF_PREFIX}{name}")
}

/// A compiled schema: the root fragment plus record definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    root: JsonValue,
    definitions: IndexMap<String, JsonValue>,
}

impl SchemaDocument {
    pub fn new(root: JsonValue, definitions: IndexMap<String, JsonValue>) -> Self {
        Self { root, definitions }
    }

    /// Schema of the root type; a `$ref` when the root is a record.
    pub fn root(&self) -> &JsonValue {
        &self.root
    }

    /// Record definitions in first-visit order.
    pub fn definitions(&self) -> &IndexMap<String, JsonValue> {
        &self.definitions
    }

    pub fn definition(&self, name: &str) -> Option<&JsonValue> {
        self.definitions.get(name)
    }

    /// Render the full document.
    pub fn to_value(&self) -> JsonValue {
        let mut document = Map::new();
        document.insert(
            "$schema".to_string(),
            JsonValue::String(SCHEMA_DIALECT.to_string()),
        );
        match &self.root {
            JsonValue::Object(fragment) => {
                for (key, value) in fragment {
                    document.insert(key.clone(), value.clone());
                }
            }
            // boolean schemas cannot carry sibling keywords
            other => {
                document.insert("allOf".to_string(), JsonValue::Array(vec![other.clone()]));
            }
        }
        if !self.definitions.is_empty() {
            let schemas: Map<String, JsonValue> = self
                .definitions
                .iter()
                .map(|(name, schema)| (name.clone(), schema.clone()))
                .collect();
            let mut components = Map::new();
            components.insert("schemas".to_string(), JsonValue::Object(schemas));
            document.insert("components".to_string(), JsonValue::Object(components));
        }
        JsonValue::Object(document)
    }

    pub fn into_value(self) -> JsonValue {
        self.to_value()
    }
}
