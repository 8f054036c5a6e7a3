//! TOML type catalogues.
//!
//! A catalogue declares the records and enums a command works with:
//!
//! ```toml
//! [[enums]]
//! name = "shop.Status"
//! members = [{ name = "OPEN", value = "open" }, { name = "CLOSED", value = "closed" }]
//!
//! [[records]]
//! name = "shop.Order"
//! doc = "A customer order."
//!
//! [[records.fields]]
//! name = "order_id"
//! type = "int"
//! min = 1
//!
//! [[records.fields]]
//! name = "status"
//! type = "shop.Status"
//! default = "open"
//! ```
//!
//! Field types use the syntax described in [`crate::type_parser`]. Names that
//! are not builtins refer to other catalogue entries and may appear before
//! their declaration, which allows recursive records. Generic records must be
//! declared before they are applied.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;
use typeforge::annotations::Bound;
use typeforge::expr::Scalar;
use typeforge::{Annotation, EnumDef, FieldDefault, RecordDef, TypeExpr, TypeRegistry, Value};

use crate::error::CatalogError;
use crate::type_parser::TypeParser;

// =============================================================================
// File format
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    enums: Vec<EnumEntry>,
    #[serde(default)]
    records: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnumEntry {
    name: String,
    members: Vec<MemberEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MemberEntry {
    name: String,
    value: toml::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RecordStyle {
    #[default]
    Entity,
    TypedDict,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordEntry {
    name: String,
    doc: Option<String>,
    #[serde(default)]
    style: RecordStyle,
    /// Only meaningful for `typed_dict` records
    #[serde(default = "default_total")]
    total: bool,
    #[serde(default)]
    params: Vec<String>,
    #[serde(default)]
    fields: Vec<FieldEntry>,
}

fn default_total() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldEntry {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    doc: Option<String>,
    default: Option<toml::Value>,
    /// TOML has no null, so a `None` default is spelled out
    #[serde(default)]
    default_none: bool,
    /// Explicit key marker for `typed_dict` records
    required: Option<bool>,
    alias: Option<String>,
    min: Option<toml::Value>,
    max: Option<toml::Value>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    #[serde(default)]
    flatten: bool,
    discriminator: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// Records and enums loaded from a catalogue file.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    registry: TypeRegistry,
    records: IndexMap<String, Arc<RecordDef>>,
    enums: IndexMap<String, Arc<EnumDef>>,
    generics: HashMap<String, Arc<RecordDef>>,
}

impl Catalog {
    /// Load a catalogue from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::parse(&content)?;
        debug!(
            path = %path.display(),
            records = catalog.records.len(),
            enums = catalog.enums.len(),
            "Catalogue loaded"
        );
        Ok(catalog)
    }

    /// Parse a catalogue from TOML text.
    pub fn parse(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CatalogError::InvalidToml(e.to_string()))?;

        let mut catalog = Catalog::default();
        for entry in file.enums {
            catalog.add_enum(entry)?;
        }
        for entry in file.records {
            catalog.add_record(entry)?;
        }
        Ok(catalog)
    }

    /// Parse a root type expression against this catalogue.
    pub fn root_type(&self, text: &str) -> Result<TypeExpr, CatalogError> {
        TypeParser::new(&self.generics, &[])
            .parse(text)
            .map_err(|source| CatalogError::RootType {
                text: text.to_string(),
                source,
            })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<RecordDef>> {
        self.records.values()
    }

    pub fn enums(&self) -> impl Iterator<Item = &Arc<EnumDef>> {
        self.enums.values()
    }

    fn claim(&self, name: &str) -> Result<(), CatalogError> {
        if self.records.contains_key(name) || self.enums.contains_key(name) {
            return Err(CatalogError::Duplicate(name.to_string()));
        }
        Ok(())
    }

    fn add_enum(&mut self, entry: EnumEntry) -> Result<(), CatalogError> {
        self.claim(&entry.name)?;
        let mut builder = EnumDef::new(&entry.name);
        for member in entry.members {
            let value = match member.value {
                toml::Value::String(s) => Scalar::Str(s),
                toml::Value::Integer(i) => Scalar::Int(i),
                _ => {
                    return Err(CatalogError::InvalidMember {
                        enum_name: entry.name,
                        member: member.name,
                    })
                }
            };
            builder = builder.member(member.name, value);
        }
        let def = builder.build();
        self.registry.register_enum(&def);
        self.enums.insert(entry.name, def);
        Ok(())
    }

    fn add_record(&mut self, entry: RecordEntry) -> Result<(), CatalogError> {
        self.claim(&entry.name)?;
        let mut builder = match entry.style {
            RecordStyle::Entity => RecordDef::entity(&entry.name),
            RecordStyle::TypedDict => RecordDef::typed_dict(&entry.name, entry.total),
        };
        if let Some(doc) = entry.doc {
            builder = builder.doc(doc);
        }
        for param in &entry.params {
            builder = builder.param(param);
        }

        let parser = TypeParser::new(&self.generics, &entry.params);
        for field in entry.fields {
            let ty = field_type(&parser, &entry.name, &field)?;
            let default = if field.default_none {
                FieldDefault::Value(Value::None)
            } else {
                field
                    .default
                    .as_ref()
                    .map_or(FieldDefault::Missing, |v| FieldDefault::Value(toml_to_value(v)))
            };
            builder = builder.field_full(field.name, ty, default, field.doc);
        }

        let def = builder.build();
        if def.is_generic() {
            self.generics.insert(entry.name.clone(), Arc::clone(&def));
        }
        self.registry.register_record(&def);
        self.records.insert(entry.name, def);
        Ok(())
    }
}

/// Parse a field's type and attach its annotations and key marker.
fn field_type(
    parser: &TypeParser<'_>,
    record: &str,
    field: &FieldEntry,
) -> Result<TypeExpr, CatalogError> {
    let ty = parser
        .parse(&field.ty)
        .map_err(|source| CatalogError::FieldType {
            record: record.to_string(),
            field: field.name.clone(),
            source,
        })?;

    let bound = |key: &str, value: &toml::Value| -> Result<Bound, CatalogError> {
        match value {
            toml::Value::Integer(i) => Ok(Bound::Int(*i)),
            toml::Value::Float(f) => Ok(Bound::Float(*f)),
            toml::Value::String(s) => Ok(Bound::Decimal(s.clone())),
            _ => Err(CatalogError::InvalidBound {
                record: record.to_string(),
                field: field.name.clone(),
                key: key.to_string(),
            }),
        }
    };

    let mut annotations = Vec::new();
    if let Some(alias) = &field.alias {
        annotations.push(Annotation::alias(alias));
    }
    if let Some(min) = &field.min {
        annotations.push(Annotation::Min(bound("min", min)?));
    }
    if let Some(max) = &field.max {
        annotations.push(Annotation::Max(bound("max", max)?));
    }
    if let Some(len) = field.min_length {
        annotations.push(Annotation::MinLength(len));
    }
    if let Some(len) = field.max_length {
        annotations.push(Annotation::MaxLength(len));
    }
    if field.flatten {
        annotations.push(Annotation::Flatten);
    }
    if let Some(key) = &field.discriminator {
        annotations.push(Annotation::discriminator(key));
    }

    let ty = if annotations.is_empty() {
        ty
    } else {
        TypeExpr::annotated(ty, annotations)
    };
    Ok(match field.required {
        Some(true) => TypeExpr::Required(Box::new(ty)),
        Some(false) => TypeExpr::NotRequired(Box::new(ty)),
        None => ty,
    })
}

fn toml_to_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::Str(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::Str(dt.to_string()),
        toml::Value::Array(items) => Value::List(items.iter().map(toml_to_value).collect()),
        toml::Value::Table(table) => Value::Dict(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use typeforge::{Serializer, SerializerConfig};

    const SHOP: &str = r#"
[[enums]]
name = "shop.Status"
members = [{ name = "OPEN", value = "open" }, { name = "CLOSED", value = "closed" }]

[[records]]
name = "shop.Page"
params = ["T"]

[[records.fields]]
name = "items"
type = "list[T]"

[[records.fields]]
name = "total"
type = "int"
min = 0

[[records]]
name = "shop.Order"
doc = "A customer order."

[[records.fields]]
name = "order_id"
type = "int"
alias = "id"

[[records.fields]]
name = "status"
type = "shop.Status"
default = "open"

[[records.fields]]
name = "note"
type = "str | None"
default_none = true
max_length = 10
"#;

    fn serializer(catalog: &Catalog, root: &str) -> Serializer {
        let config = SerializerConfig::new().with_registry(catalog.registry().clone());
        Serializer::new(&catalog.root_type(root).unwrap(), config).unwrap()
    }

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::parse(SHOP).unwrap();
        let names: Vec<&str> = catalog.records().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["shop.Page", "shop.Order"]);
        assert_eq!(catalog.enums().count(), 1);
        assert_eq!(catalog.registry().len(), 3);

        let order = catalog.records.get("shop.Order").unwrap();
        assert_eq!(order.doc.as_deref(), Some("A customer order."));
        assert!(order.field_decl("order_id").unwrap().default.is_missing());
        assert!(!order.field_decl("note").unwrap().default.is_missing());
    }

    #[test]
    fn test_catalog_types_load_data() {
        let catalog = Catalog::parse(SHOP).unwrap();
        let s = serializer(&catalog, "shop.Order");

        let loaded = s.load(&json!({"id": 7, "status": "closed"}), true).unwrap();
        assert_eq!(loaded.field("order_id"), Some(&Value::Int(7)));
        assert_eq!(loaded.field("note"), Some(&Value::None));

        let err = s
            .load(&json!({"id": 7, "note": "far too long for this"}), true)
            .unwrap_err();
        assert_eq!(err.errors[0].instance_path, "note");
    }

    #[test]
    fn test_generic_root_type() {
        let catalog = Catalog::parse(SHOP).unwrap();
        let s = serializer(&catalog, "shop.Page[shop.Order]");
        let schema = s.get_json_schema();
        let schemas = schema["components"]["schemas"].as_object().unwrap();
        assert!(schemas.keys().any(|name| name.starts_with("shop.Page[")));
        assert!(schemas.contains_key("shop.Order[no_format,keep_nones]"));

        let err = s.load(&json!({"items": [], "total": -1}), true).unwrap_err();
        assert_eq!(err.errors[0].message, "-1 is less than the minimum of 0");
    }

    #[test]
    fn test_recursive_record() {
        let catalog = Catalog::parse(
            r#"
[[records]]
name = "tree.Node"

[[records.fields]]
name = "children"
type = "list[tree.Node]"
default = []
"#,
        )
        .unwrap();
        let s = serializer(&catalog, "tree.Node");
        let loaded = s
            .load(&json!({"children": [{"children": []}, {}]}), true)
            .unwrap();
        assert!(matches!(loaded.field("children"), Some(Value::List(items)) if items.len() == 2));
    }

    #[test]
    fn test_typed_dict_key_markers() {
        let catalog = Catalog::parse(
            r#"
[[records]]
name = "api.Filter"
style = "typed_dict"
total = false

[[records.fields]]
name = "query"
type = "str"
required = true

[[records.fields]]
name = "limit"
type = "int"
"#,
        )
        .unwrap();
        let s = serializer(&catalog, "api.Filter");
        assert_eq!(
            s.get_json_schema()["components"]["schemas"]["api.Filter[no_format,keep_nones]"]
                ["required"],
            json!(["query"])
        );
    }

    #[test]
    fn test_duplicate_declaration() {
        let err = Catalog::parse(
            r#"
[[enums]]
name = "x.A"
members = [{ name = "ONE", value = 1 }]

[[records]]
name = "x.A"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate(name) if name == "x.A"));
    }

    #[test]
    fn test_invalid_field_type() {
        let err = Catalog::parse(
            r#"
[[records]]
name = "x.A"

[[records.fields]]
name = "tags"
type = "list[str"
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid type for field 'x.A.tags': expected ',' or ']' at offset 8"
        );
    }

    #[test]
    fn test_invalid_member_and_bound() {
        let err = Catalog::parse(
            r#"
[[enums]]
name = "x.E"
members = [{ name = "ON", value = true }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidMember { .. }));

        let err = Catalog::parse(
            r#"
[[records]]
name = "x.A"

[[records.fields]]
name = "n"
type = "int"
min = [1]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidBound { key, .. } if key == "min"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = Catalog::parse("[[records]]\nname = \"x.A\"\ncolour = \"red\"\n").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidToml(_)));
    }
}
