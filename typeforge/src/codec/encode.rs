//! Native value to wire JSON.

use std::borrow::Cow;

use base64::Engine;
use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{child_path, ErrorItem};
use crate::ir::{DiscriminatedUnion, Node, RecordType, TypeGraph, TypeKind};
use crate::value::Value;

use super::{arity, no_alternative, not_allowed, not_of_type, not_one_of, required_property, unknown_discriminator};

type Result<T> = std::result::Result<T, ErrorItem>;

pub(crate) struct Encoder<'g> {
    graph: &'g TypeGraph,
}

impl<'g> Encoder<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self { graph }
    }

    pub fn encode(&self, node: &Node, value: &Value, path: &str) -> Result<JsonValue> {
        if let Some(serialize) = node
            .custom_encoder
            .as_ref()
            .and_then(|encoder| encoder.serialize.as_ref())
        {
            return serialize(value).map_err(|message| ErrorItem::new(message, path));
        }

        match (&node.kind, value) {
            // Primitives
            (TypeKind::Integer(_), Value::Int(i)) => Ok(JsonValue::from(*i)),
            (TypeKind::Float(_), Value::Float(f)) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .ok_or_else(|| not_of_type(value, "number", path)),
            (TypeKind::Float(_), Value::Int(i)) => Ok(JsonValue::from(*i)),
            (TypeKind::Decimal(_), Value::Decimal(text)) => Ok(JsonValue::String(text.clone())),
            (TypeKind::Decimal(_), Value::Int(i)) => Ok(JsonValue::String(i.to_string())),
            (TypeKind::Decimal(_), Value::Float(f)) => Ok(JsonValue::String(f.to_string())),
            (TypeKind::String(_), Value::Str(s)) => Ok(JsonValue::String(s.clone())),
            (TypeKind::Boolean, Value::Bool(b)) => Ok(JsonValue::Bool(*b)),
            (TypeKind::Bytes, Value::Bytes(bytes)) => Ok(JsonValue::String(
                base64::engine::general_purpose::STANDARD.encode(bytes),
            )),
            (TypeKind::Uuid, Value::Uuid(_))
            | (TypeKind::Date, Value::Date(_))
            | (TypeKind::Time, Value::Time(_))
            | (TypeKind::DateTime, Value::DateTime(_)) => Ok(value.to_json()),

            // Value sets
            (TypeKind::Literal(values), _) => values
                .iter()
                .find(|scalar| scalar.matches_value(value))
                .map(|scalar| scalar.to_json())
                .ok_or_else(|| {
                    let allowed: Vec<_> = values.iter().map(|s| s.to_json()).collect();
                    not_one_of(value, &allowed, path)
                }),
            (TypeKind::Enum(def), _) => {
                let member = match value {
                    Value::Enum(e) if e.enum_name == def.name => def.by_name(&e.member),
                    other => def.members.iter().find(|m| m.value.matches_value(other)),
                };
                member.map(|m| m.value.to_json()).ok_or_else(|| {
                    let allowed: Vec<_> = def.members.iter().map(|m| m.value.to_json()).collect();
                    not_one_of(value, &allowed, path)
                })
            }

            // Compound types
            (TypeKind::Optional(_), Value::None) => Ok(JsonValue::Null),
            (TypeKind::Optional(inner), _) => self.encode(inner, value, path),
            (TypeKind::Array { item, .. }, Value::List(items) | Value::Tuple(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| self.encode(item, v, &child_path(path, i)))
                .collect::<Result<Vec<_>>>()
                .map(JsonValue::Array),
            (TypeKind::Tuple(nodes), Value::Tuple(items) | Value::List(items)) => {
                if nodes.len() != items.len() {
                    return Err(arity(value, nodes.len(), items.len(), path));
                }
                nodes
                    .iter()
                    .zip(items)
                    .enumerate()
                    .map(|(i, (n, v))| self.encode(n, v, &child_path(path, i)))
                    .collect::<Result<Vec<_>>>()
                    .map(JsonValue::Array)
            }
            (
                TypeKind::Dictionary {
                    value: value_node,
                    omit_none,
                    ..
                },
                Value::Dict(map),
            ) => {
                let mut out = Map::new();
                for (key, item) in map {
                    if *omit_none && item.is_none() {
                        continue;
                    }
                    out.insert(key.clone(), self.encode(value_node, item, &child_path(path, key))?);
                }
                Ok(JsonValue::Object(out))
            }

            // Records and unions
            (TypeKind::Entity(record) | TypeKind::TypedDict(record), Value::Record(_) | Value::Dict(_)) => {
                self.encode_record(record, value, path)
            }
            (TypeKind::Union(items), _) => items
                .iter()
                .find_map(|item| self.encode(item, value, path).ok())
                .ok_or_else(|| no_alternative(value, path)),
            (TypeKind::DiscriminatedUnion(union), _) => self.encode_discriminated(union, value, path),
            (TypeKind::RecursionHolder(_), _) => {
                let target = self
                    .graph
                    .deref(node)
                    .map_err(|err| ErrorItem::new(err.to_string(), path))?;
                self.encode(target, value, path)
            }

            // Special types
            (TypeKind::Any | TypeKind::Custom { .. }, _) => Ok(value.to_json()),
            (TypeKind::Never, _) => Err(not_allowed(value, path)),

            (kind, _) => Err(not_of_type(value, wire_type(kind), path)),
        }
    }

    fn encode_record(&self, record: &RecordType, value: &Value, path: &str) -> Result<JsonValue> {
        let mut out = Map::new();
        for field in &record.fields {
            let found = lookup(value, &field.path, &field.name);
            let item = match found {
                Some(item) => Cow::Borrowed(item),
                None => match field.default.produce() {
                    Some(default) => Cow::Owned(default),
                    None if field.required => return Err(required_property(&field.name, path)),
                    None => continue,
                },
            };
            if record.omit_none && item.is_none() {
                continue;
            }
            let encoded = self.encode(&field.ty, &item, &child_path(path, &field.dict_key))?;
            out.insert(field.dict_key.clone(), encoded);
        }

        if let Some(extra) = &record.extra {
            if let Some(Value::Dict(captured)) = lookup(value, &extra.path, &extra.field) {
                for (key, item) in captured {
                    // declared fields own their wire keys
                    if record.field_by_key(key).is_some() {
                        continue;
                    }
                    if record.omit_none && item.is_none() {
                        continue;
                    }
                    let encoded = self.encode(&extra.value, item, &child_path(path, key))?;
                    out.insert(key.clone(), encoded);
                }
            }
        }
        Ok(JsonValue::Object(out))
    }

    fn encode_discriminated(
        &self,
        union: &DiscriminatedUnion,
        value: &Value,
        path: &str,
    ) -> Result<JsonValue> {
        let tag = value
            .field(&union.dump_discriminator)
            .ok_or_else(|| required_property(&union.dump_discriminator, path))?;
        let alternative = union
            .tags
            .iter()
            .zip(union.items.values())
            .find(|(literal, _)| literal.matches_value(tag));
        match alternative {
            Some((_, node)) => self.encode(node, value, path),
            None => Err(unknown_discriminator(
                tag,
                union.items.keys(),
                &child_path(path, &union.load_discriminator),
            )),
        }
    }
}

/// Find a field value, walking through flatten groups.
fn lookup<'v>(value: &'v Value, path: &[String], name: &str) -> Option<&'v Value> {
    let mut current = value;
    for segment in path {
        current = current.field(segment)?;
    }
    current.field(name)
}

/// JSON type name expected by a kind, for mismatch messages.
fn wire_type(kind: &TypeKind) -> &'static str {
    match kind {
        TypeKind::Integer(_) => "integer",
        TypeKind::Float(_) => "number",
        TypeKind::Decimal(_) => "decimal",
        TypeKind::String(_) => "string",
        TypeKind::Boolean => "boolean",
        TypeKind::Bytes => "bytes",
        TypeKind::Uuid => "uuid",
        TypeKind::Date => "date",
        TypeKind::Time => "time",
        TypeKind::DateTime => "datetime",
        TypeKind::Array { .. } => "array",
        TypeKind::Tuple(_) => "sequence",
        _ => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::annotations::{Annotation, Annotations};
    use crate::expr::{EnumDef, RecordDef, TypeExpr, TypeRegistry};
    use crate::resolver::TypeResolver;
    use crate::value::{EnumValue, RecordValue};

    fn dump(expr: &TypeExpr, value: &Value) -> Result<JsonValue> {
        let graph = TypeResolver::new(Arc::new(TypeRegistry::new()))
            .resolve_root(expr, &Annotations::new())
            .unwrap();
        Encoder::new(&graph).encode(graph.root(), value, "")
    }

    #[test]
    fn test_logical_types() {
        assert_eq!(
            dump(&TypeExpr::Bytes, &Value::Bytes(b"hi".to_vec())).unwrap(),
            json!("aGk=")
        );
        assert_eq!(
            dump(&TypeExpr::Decimal, &Value::Decimal("1.50".into())).unwrap(),
            json!("1.50")
        );
        let err = dump(&TypeExpr::Int, &Value::Str("1".into())).unwrap_err();
        assert_eq!(err.message, "\"1\" is not of type \"integer\"");
    }

    #[test]
    fn test_enum_dumps_member_value() {
        let color = EnumDef::new("m.Color").member("RED", "red").member("BLUE", 2).build();
        let expr = TypeExpr::enumeration(&color);
        assert_eq!(
            dump(&expr, &EnumValue::new("m.Color", "BLUE").into()).unwrap(),
            json!(2)
        );
        assert!(dump(&expr, &EnumValue::new("m.Color", "GREEN").into()).is_err());
    }

    #[test]
    fn test_record_defaults_and_omit_none() {
        let def = RecordDef::entity("m.A")
            .field("a", TypeExpr::optional(TypeExpr::Int))
            .field_default("b", TypeExpr::Str, "x")
            .build();
        let expr = TypeExpr::annotated(TypeExpr::record(&def), vec![Annotation::omit_none()]);
        let value = RecordValue::new("m.A").with("a", Value::None).into();
        assert_eq!(dump(&expr, &value).unwrap(), json!({"b": "x"}));

        let missing = RecordValue::new("m.A").into();
        let err = dump(&TypeExpr::record(&def), &missing).unwrap_err();
        assert_eq!(err.message, "\"a\" is a required property");
    }

    #[test]
    fn test_tuple_arity() {
        let expr = TypeExpr::tuple(vec![TypeExpr::Int, TypeExpr::Int]);
        let err = dump(&expr, &Value::tuple([1i64])).unwrap_err();
        assert_eq!(err.message, "[1] has less than 2 items");
    }
}
