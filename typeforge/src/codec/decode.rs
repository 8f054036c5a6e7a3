//! Wire JSON to native value.

use std::collections::HashSet;

use base64::Engine;
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::annotations::Bound;
use crate::error::{child_path, ErrorItem};
use crate::ir::{
    DiscriminatedUnion, LengthBounds, Node, NumericBounds, RecordType, TypeGraph, TypeKind,
};
use crate::validator::check_format;
use crate::value::{EnumValue, Value};

use super::assemble::RecordAssembler;
use super::{
    arity, no_alternative, not_allowed, not_of_type, not_one_of, plural, required_property,
    unexpected_key, unknown_discriminator,
};

type Result<T> = std::result::Result<T, ErrorItem>;

pub(crate) struct Decoder<'g> {
    graph: &'g TypeGraph,
}

impl<'g> Decoder<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self { graph }
    }

    pub fn decode(&self, node: &Node, data: &JsonValue, path: &str) -> Result<Value> {
        if let Some(deserialize) = node
            .custom_encoder
            .as_ref()
            .and_then(|encoder| encoder.deserialize.as_ref())
        {
            return deserialize(data).map_err(|message| ErrorItem::new(message, path));
        }

        match &node.kind {
            // Primitives
            TypeKind::Integer(bounds) => {
                let value = integer(data).ok_or_else(|| not_of_type(data, "integer", path))?;
                check_bounds(bounds, value as f64, data, path)?;
                Ok(Value::Int(value))
            }
            TypeKind::Float(bounds) => {
                let value = data
                    .as_f64()
                    .ok_or_else(|| not_of_type(data, "number", path))?;
                check_bounds(bounds, value, data, path)?;
                Ok(Value::Float(value))
            }
            TypeKind::Decimal(bounds) => {
                let text = match data {
                    JsonValue::String(text) if check_format("decimal", text) => text.clone(),
                    JsonValue::Number(n) => n.to_string(),
                    _ => return Err(not_of_type(data, "decimal", path)),
                };
                if let Ok(number) = text.parse::<f64>() {
                    check_bounds(bounds, number, &text, path)?;
                }
                Ok(Value::Decimal(text))
            }
            TypeKind::String(bounds) => {
                let text = data
                    .as_str()
                    .ok_or_else(|| not_of_type(data, "string", path))?;
                check_string_length(bounds, text, path)?;
                Ok(Value::Str(text.to_string()))
            }
            TypeKind::Boolean => data
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| not_of_type(data, "boolean", path)),
            TypeKind::Bytes => data
                .as_str()
                .and_then(|s| base64::engine::general_purpose::STANDARD.decode(s).ok())
                .map(Value::Bytes)
                .ok_or_else(|| not_of_type(data, "bytes", path)),
            TypeKind::Uuid => data
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(Value::Uuid)
                .ok_or_else(|| not_of_type(data, "uuid", path)),
            TypeKind::Date => data
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .map(Value::Date)
                .ok_or_else(|| not_of_type(data, "date", path)),
            TypeKind::Time => data
                .as_str()
                .and_then(crate::validator::parse_time)
                .map(Value::Time)
                .ok_or_else(|| not_of_type(data, "time", path)),
            TypeKind::DateTime => data
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(Value::DateTime)
                .ok_or_else(|| not_of_type(data, "datetime", path)),

            // Value sets
            TypeKind::Literal(values) => values
                .iter()
                .find(|scalar| scalar.matches_json(data))
                .map(|scalar| scalar.to_value())
                .ok_or_else(|| {
                    let allowed: Vec<_> = values.iter().map(|s| s.to_json()).collect();
                    not_one_of(data, &allowed, path)
                }),
            TypeKind::Enum(def) => def
                .members
                .iter()
                .find(|member| member.value.matches_json(data))
                .map(|member| Value::Enum(EnumValue::new(def.name.clone(), member.name.clone())))
                .ok_or_else(|| {
                    let allowed: Vec<_> = def.members.iter().map(|m| m.value.to_json()).collect();
                    not_one_of(data, &allowed, path)
                }),

            // Compound types
            TypeKind::Optional(inner) => match data {
                JsonValue::Null => Ok(Value::None),
                _ => self.decode(inner, data, path),
            },
            TypeKind::Array { item, bounds } => match data {
                JsonValue::Array(items) => {
                    check_item_count(bounds, items.len(), data, path)?;
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, v)| self.decode(item, v, &child_path(path, i)))
                        .collect::<Result<Vec<_>>>()
                        .map(Value::List)
                }
                _ => Err(not_of_type(data, "array", path)),
            },
            TypeKind::Tuple(nodes) => match data {
                JsonValue::Array(items) if items.len() == nodes.len() => nodes
                    .iter()
                    .zip(items)
                    .enumerate()
                    .map(|(i, (n, v))| self.decode(n, v, &child_path(path, i)))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Tuple),
                JsonValue::Array(items) => Err(arity(data, nodes.len(), items.len(), path)),
                _ => Err(not_of_type(data, "sequence", path)),
            },
            TypeKind::Dictionary { value, .. } => match data {
                JsonValue::Object(map) => map
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.decode(value, v, &child_path(path, k))?)))
                    .collect::<Result<_>>()
                    .map(Value::Dict),
                _ => Err(not_of_type(data, "object", path)),
            },

            // Records and unions
            TypeKind::Entity(record) | TypeKind::TypedDict(record) => match data {
                JsonValue::Object(map) => self.decode_record(record, map, path),
                _ => Err(not_of_type(data, "object", path)),
            },
            TypeKind::Union(items) => items
                .iter()
                .find_map(|item| self.decode(item, data, path).ok())
                .ok_or_else(|| no_alternative(data, path)),
            TypeKind::DiscriminatedUnion(union) => self.decode_discriminated(union, data, path),
            TypeKind::RecursionHolder(_) => {
                let target = self
                    .graph
                    .deref(node)
                    .map_err(|err| ErrorItem::new(err.to_string(), path))?;
                self.decode(target, data, path)
            }

            // Special types
            TypeKind::Any | TypeKind::Custom { .. } => Ok(Value::from_json(data)),
            TypeKind::Never => Err(not_allowed(data, path)),
        }
    }

    fn decode_record(
        &self,
        record: &RecordType,
        map: &Map<String, JsonValue>,
        path: &str,
    ) -> Result<Value> {
        let mut assembler = RecordAssembler::new(record);
        for field in &record.fields {
            match map.get(&field.dict_key) {
                Some(data) => {
                    let value = self.decode(&field.ty, data, &child_path(path, &field.dict_key))?;
                    assembler.set(field, value);
                }
                None => assembler.missing(field, path)?,
            }
        }

        let known: HashSet<&str> = record.fields.iter().map(|f| f.dict_key.as_str()).collect();
        if let Some(extra) = &record.extra {
            for (key, data) in map.iter().filter(|(k, _)| !known.contains(k.as_str())) {
                if extra.forbid {
                    return Err(unexpected_key(key, path));
                }
                let value = self.decode(&extra.value, data, &child_path(path, key))?;
                assembler.set_extra(key.clone(), value);
            }
        }
        Ok(assembler.finish())
    }

    fn decode_discriminated(
        &self,
        union: &DiscriminatedUnion,
        data: &JsonValue,
        path: &str,
    ) -> Result<Value> {
        let JsonValue::Object(map) = data else {
            return Err(not_of_type(data, "object", path));
        };
        let tag = map
            .get(&union.load_discriminator)
            .ok_or_else(|| required_property(&union.load_discriminator, path))?;
        match tag.as_str().and_then(|t| union.items.get(t)) {
            Some(node) => self.decode(node, data, path),
            None => Err(unknown_discriminator(
                tag,
                union.items.keys(),
                &child_path(path, &union.load_discriminator),
            )),
        }
    }
}

fn integer(data: &JsonValue) -> Option<i64> {
    data.as_i64().or_else(|| {
        data.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Range check shared by the numeric kinds.
pub(crate) fn check_bounds(
    bounds: &NumericBounds,
    value: f64,
    rendered: impl std::fmt::Display,
    path: &str,
) -> Result<()> {
    if let Some(min) = &bounds.min {
        if min.as_f64().is_some_and(|m| value < m) {
            return Err(ErrorItem::new(
                format!("{rendered} is less than the minimum of {}", render_bound(min)),
                path,
            ));
        }
    }
    if let Some(max) = &bounds.max {
        if max.as_f64().is_some_and(|m| value > m) {
            return Err(ErrorItem::new(
                format!("{rendered} is greater than the maximum of {}", render_bound(max)),
                path,
            ));
        }
    }
    Ok(())
}

/// Character-count check for strings.
pub(crate) fn check_string_length(bounds: &LengthBounds, text: &str, path: &str) -> Result<()> {
    let length = text.chars().count();
    if let Some(min) = bounds.min.filter(|min| length < *min) {
        return Err(ErrorItem::new(
            format!(
                "{} is shorter than {min} {}",
                JsonValue::from(text),
                plural(min, "character", "characters")
            ),
            path,
        ));
    }
    if let Some(max) = bounds.max.filter(|max| length > *max) {
        return Err(ErrorItem::new(
            format!(
                "{} is longer than {max} {}",
                JsonValue::from(text),
                plural(max, "character", "characters")
            ),
            path,
        ));
    }
    Ok(())
}

/// Item-count check for lists.
pub(crate) fn check_item_count(
    bounds: &LengthBounds,
    count: usize,
    rendered: impl std::fmt::Display,
    path: &str,
) -> Result<()> {
    if let Some(min) = bounds.min.filter(|min| count < *min) {
        return Err(arity(rendered, min, count, path));
    }
    if let Some(max) = bounds.max.filter(|max| count > *max) {
        return Err(arity(rendered, max, count, path));
    }
    Ok(())
}

fn render_bound(bound: &Bound) -> String {
    bound.to_json().to_string()
}
