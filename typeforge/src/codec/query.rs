//! Query-parameter loading.
//!
//! Query strings carry only text, so every leaf is parsed from a string.
//! Only flat shapes are supported: a record (or dictionary) whose fields are
//! scalars, lists or tuples of scalars, or unions and optionals over those.

use serde_json::{Number, Value as JsonValue};

use crate::error::{child_path, DefinitionError, Error, ErrorItem, ValidationError};
use crate::ir::{Field, Node, RecordType, TypeGraph, TypeKind};
use crate::value::{EnumValue, Value};

use super::assemble::RecordAssembler;
use super::decode::{check_item_count, check_string_length, Decoder};
use super::{arity, no_alternative, not_of_type, not_one_of, unexpected_key};

/// Ordered multimap of query parameters; repeated keys keep every value.
pub type QueryParams = indexmap::IndexMap<String, Vec<String>>;

type Result<T> = std::result::Result<T, ErrorItem>;

const TRUE_VALUES: [&str; 5] = ["t", "T", "true", "True", "TRUE"];
const FALSE_VALUES: [&str; 5] = ["f", "F", "false", "False", "FALSE"];

/// Whether a node parses from a single string.
fn is_leaf(node: &Node) -> bool {
    match &node.kind {
        TypeKind::Optional(inner) => is_leaf(inner),
        TypeKind::Union(items) => items.iter().all(|item| is_leaf(item)),
        kind => kind.is_scalar(),
    }
}

/// Whether a record field or dictionary value can be read from query values.
fn is_query_loadable(node: &Node) -> bool {
    match &node.kind {
        TypeKind::Optional(inner) => is_query_loadable(inner),
        TypeKind::Array { item, .. } => is_leaf(item),
        TypeKind::Tuple(items) => items.iter().all(|item| is_leaf(item)),
        _ => is_leaf(node),
    }
}

pub(crate) struct QueryDecoder<'g> {
    graph: &'g TypeGraph,
    json: Decoder<'g>,
}

impl<'g> QueryDecoder<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self {
            graph,
            json: Decoder::new(graph),
        }
    }

    pub fn load(&self, params: &QueryParams) -> std::result::Result<Value, Error> {
        let root = self.graph.deref(self.graph.root())?;
        match &root.kind {
            TypeKind::Entity(record) | TypeKind::TypedDict(record) => {
                let loadable = record
                    .fields
                    .iter()
                    .all(|field| is_query_loadable(&field.ty))
                    && record
                        .extra
                        .as_ref()
                        .map_or(true, |extra| is_query_loadable(&extra.value));
                if !loadable {
                    return Err(DefinitionError::NotQueryDeserializable.into());
                }
                Ok(self.load_record(record, params).map_err(ValidationError::from)?)
            }
            TypeKind::Dictionary { value, .. } if is_query_loadable(value) => {
                let mut out = indexmap::IndexMap::new();
                for (key, values) in params {
                    let decoded = self
                        .decode_values(value, values, key)
                        .map_err(ValidationError::from)?;
                    out.insert(key.clone(), decoded);
                }
                Ok(Value::Dict(out))
            }
            _ => Err(DefinitionError::NotQueryDeserializable.into()),
        }
    }

    fn load_record(&self, record: &RecordType, params: &QueryParams) -> Result<Value> {
        let mut assembler = RecordAssembler::new(record);
        for field in &record.fields {
            match params.get(&field.dict_key).filter(|values| !values.is_empty()) {
                Some(values) => {
                    let value = self.decode_values(&field.ty, values, &field.dict_key)?;
                    assembler.set(field, value);
                }
                None => self.missing(&mut assembler, field)?,
            }
        }

        if let Some(extra) = &record.extra {
            for (key, values) in params {
                if record.field_by_key(key).is_some() {
                    continue;
                }
                if extra.forbid {
                    return Err(unexpected_key(key, ""));
                }
                let value = self.decode_values(&extra.value, values, key)?;
                assembler.set_extra(key.clone(), value);
            }
        }
        Ok(assembler.finish())
    }

    /// Absent key: defaults first, then `None` for optionals.
    fn missing(&self, assembler: &mut RecordAssembler<'_>, field: &Field) -> Result<()> {
        if field.default.is_missing() && matches!(field.ty.kind, TypeKind::Optional(_)) {
            assembler.set(field, Value::None);
            return Ok(());
        }
        assembler.missing(field, "")
    }

    fn decode_values(&self, node: &Node, values: &[String], path: &str) -> Result<Value> {
        if let Some(deserialize) = node
            .custom_encoder
            .as_ref()
            .and_then(|encoder| encoder.deserialize.as_ref())
        {
            let data = match node.kind {
                TypeKind::Array { .. } | TypeKind::Tuple(_) => {
                    JsonValue::Array(values.iter().cloned().map(JsonValue::String).collect())
                }
                _ => JsonValue::String(values.first().cloned().unwrap_or_default()),
            };
            return deserialize(&data).map_err(|message| ErrorItem::new(message, path));
        }

        match &node.kind {
            TypeKind::Optional(inner) => self.decode_values(inner, values, path),
            TypeKind::Array { item, bounds } => {
                check_item_count(bounds, values.len(), render_values(values), path)?;
                values
                    .iter()
                    .enumerate()
                    .map(|(i, text)| self.decode_text(item, text, &child_path(path, i)))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
            TypeKind::Tuple(items) => {
                if items.len() != values.len() {
                    return Err(arity(render_values(values), items.len(), values.len(), path));
                }
                items
                    .iter()
                    .zip(values)
                    .enumerate()
                    .map(|(i, (item, text))| self.decode_text(item, text, &child_path(path, i)))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Tuple)
            }
            _ => match values.first() {
                Some(text) => self.decode_text(node, text, path),
                None => Err(ErrorItem::new("Missing query value", path)),
            },
        }
    }

    fn decode_text(&self, node: &Node, text: &str, path: &str) -> Result<Value> {
        let quoted = JsonValue::String(text.to_string());
        if node
            .custom_encoder
            .as_ref()
            .is_some_and(|encoder| encoder.deserialize.is_some())
        {
            return self.json.decode(node, &quoted, path);
        }

        match &node.kind {
            TypeKind::Integer(_) => {
                let number = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| not_of_type(&quoted, "integer", path))?;
                self.json.decode(node, &JsonValue::from(number), path)
            }
            TypeKind::Float(_) => {
                let number = text
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .ok_or_else(|| not_of_type(&quoted, "number", path))?;
                self.json.decode(node, &JsonValue::Number(number), path)
            }
            TypeKind::Boolean => {
                if TRUE_VALUES.contains(&text) {
                    Ok(Value::Bool(true))
                } else if FALSE_VALUES.contains(&text) {
                    Ok(Value::Bool(false))
                } else {
                    Err(not_of_type(&quoted, "boolean", path))
                }
            }
            TypeKind::String(bounds) => {
                check_string_length(bounds, text, path)?;
                Ok(Value::Str(text.to_string()))
            }
            TypeKind::Any => Ok(Value::Str(text.to_string())),
            TypeKind::Literal(values) => values
                .iter()
                .find(|scalar| scalar.matches_text(text))
                .map(|scalar| scalar.to_value())
                .ok_or_else(|| {
                    let allowed: Vec<_> = values.iter().map(|s| s.to_json()).collect();
                    not_one_of(&quoted, &allowed, path)
                }),
            TypeKind::Enum(def) => def
                .members
                .iter()
                .find(|member| member.value.matches_text(text))
                .map(|member| Value::Enum(EnumValue::new(def.name.clone(), member.name.clone())))
                .ok_or_else(|| {
                    let allowed: Vec<_> = def.members.iter().map(|m| m.value.to_json()).collect();
                    not_one_of(&quoted, &allowed, path)
                }),
            TypeKind::Optional(inner) => self.decode_text(inner, text, path),
            TypeKind::Union(items) => items
                .iter()
                .find_map(|item| self.decode_text(item, text, path).ok())
                .ok_or_else(|| no_alternative(&quoted, path)),
            // logical scalars share the JSON string decoding
            _ => self.json.decode(node, &quoted, path),
        }
    }
}

fn render_values(values: &[String]) -> JsonValue {
    JsonValue::Array(values.iter().cloned().map(JsonValue::String).collect())
}
