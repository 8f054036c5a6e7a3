//! Type resolution.
//!
//! The [`TypeResolver`] turns a [`TypeExpr`] plus an ambient [`Annotations`]
//! bag into IR nodes. Records are memoized per [`ResolutionKey`], which makes
//! recursive types terminate: revisiting a record that is still being built
//! yields a [`RecursionHolder`] pointing at its arena key.
//!
//! # Dispatch
//!
//! | Expression | IR |
//! |------------|----|
//! | `Int`, `Float`, `Decimal` | numeric kinds with `Min`/`Max` bounds |
//! | `Str` | `String` with `MinLength`/`MaxLength` |
//! | `List`, `Dict`, `Tuple` | containers; children get inheritable options only |
//! | `Union` with `None` | `Optional` over the rest |
//! | `Union` + `Discriminator` | `DiscriminatedUnion` over entity records |
//! | `Record`, `Generic` | `Entity`/`TypedDict`, memoized |
//! | `Forward` | registry lookup, then re-resolution |
//! | `NewType` | its supertype |
//! | `Opaque`, bare `None` | [`DefinitionError::UnknownType`] |

mod context;
mod fields;
mod record;

pub use context::{NameGenerator, ResolverContext, Slot};
pub use fields::{FieldSource, SourceField};

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::annotations::{AnnotationKind, Annotations};
use crate::custom::{CustomEncoder, CustomTypeResolver};
use crate::error::DefinitionError;
use crate::expr::{RecordDef, RecordStyle, TypeExpr, TypeRegistry};
use crate::ir::{
    DiscriminatedUnion, LengthBounds, Node, NumericBounds, RecursionHolder, TypeGraph, TypeKind,
    TypeNode,
};

use fields::peel;

type Result<T> = std::result::Result<T, DefinitionError>;

/// Resolves type expressions into IR.
///
/// One resolver is one session: its context, arena and generated names are
/// dropped (or frozen into a [`TypeGraph`]) when it finishes.
pub struct TypeResolver {
    ctx: ResolverContext,
    custom_type_resolver: Option<CustomTypeResolver>,
}

impl TypeResolver {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            ctx: ResolverContext::new(registry),
            custom_type_resolver: None,
        }
    }

    /// Install a hook that may claim any expression before built-in dispatch.
    pub fn with_custom_type_resolver(mut self, resolver: Option<CustomTypeResolver>) -> Self {
        self.custom_type_resolver = resolver;
        self
    }

    pub fn context(&self) -> &ResolverContext {
        &self.ctx
    }

    /// Resolve a root expression and freeze the session into a graph.
    pub fn resolve_root(
        mut self,
        expr: &TypeExpr,
        annotations: &Annotations,
    ) -> Result<TypeGraph> {
        debug!(root = %expr, annotations = %annotations, "Resolving type");
        let root = self.resolve(expr, annotations)?;
        let graph = self.ctx.into_graph(root);
        debug!(records = graph.record_count(), "Type resolved");
        Ok(graph)
    }

    /// Resolve `expr` under the inheritable part of `ambient`.
    pub fn resolve(&mut self, expr: &TypeExpr, ambient: &Annotations) -> Result<Node> {
        let (inner, local) = peel(expr);
        let local: Annotations = local.into_iter().collect();
        self.resolve_bare(inner, ambient.merge(&local))
    }

    /// Resolve `expr` keeping every option of `ann`, local ones included.
    fn resolve_keeping(&mut self, expr: &TypeExpr, ann: Annotations) -> Result<Node> {
        let (inner, local) = peel(expr);
        let local: Annotations = local.into_iter().collect();
        self.resolve_bare(inner, ann.overlay(&local))
    }

    /// Dispatch on an expression whose wrappers are already peeled.
    fn resolve_bare(&mut self, expr: &TypeExpr, ann: Annotations) -> Result<Node> {
        if let Some(hook) = self.custom_type_resolver.clone() {
            if let Some(custom) = hook(expr) {
                trace!(expr = %expr, "Custom type claimed expression");
                let encoder = ann
                    .custom_encoder()
                    .unwrap_or_else(|| CustomEncoder::from_custom_type(Arc::clone(&custom)));
                let node = TypeNode::new(TypeKind::Custom {
                    schema: custom.json_schema(),
                })
                .with_custom_encoder(Some(encoder));
                return Ok(node.into_node());
            }
        }

        let kind = match expr {
            // Primitives
            TypeExpr::Int => TypeKind::Integer(numeric_bounds(&ann)),
            TypeExpr::Float => TypeKind::Float(numeric_bounds(&ann)),
            TypeExpr::Decimal => TypeKind::Decimal(numeric_bounds(&ann)),
            TypeExpr::Str => TypeKind::String(length_bounds(&ann)),
            TypeExpr::Bool => TypeKind::Boolean,
            TypeExpr::Bytes => TypeKind::Bytes,
            TypeExpr::Uuid => TypeKind::Uuid,
            TypeExpr::Date => TypeKind::Date,
            TypeExpr::Time => TypeKind::Time,
            TypeExpr::DateTime => TypeKind::DateTime,
            TypeExpr::Any => TypeKind::Any,
            TypeExpr::Never => TypeKind::Never,
            TypeExpr::None => return Err(DefinitionError::UnknownType("None".to_string())),

            // Value sets
            TypeExpr::Literal(values) => {
                if values.is_empty() {
                    return Err(DefinitionError::UnsupportedLiteral);
                }
                TypeKind::Literal(values.clone())
            }
            TypeExpr::Enum(def) => TypeKind::Enum(Arc::clone(def)),

            // Containers
            TypeExpr::List(item) => TypeKind::Array {
                item: self.resolve(item, &ann)?,
                bounds: length_bounds(&ann),
            },
            TypeExpr::Dict(key, value) => TypeKind::Dictionary {
                key: self.resolve(key, &ann)?,
                value: self.resolve(value, &ann)?,
                omit_none: ann.none_format().omit(),
            },
            TypeExpr::Tuple(items) => {
                if items.is_empty() {
                    return Err(DefinitionError::VariableLengthTuple);
                }
                let items = items
                    .iter()
                    .map(|item| self.resolve(item, &ann))
                    .collect::<Result<Vec<_>>>()?;
                TypeKind::Tuple(items)
            }
            TypeExpr::VarTuple(_) => return Err(DefinitionError::VariableLengthTuple),
            TypeExpr::Union(items) => return self.resolve_union(items, ann),

            // Records
            TypeExpr::Record(def) => return self.resolve_record(def, &[], &ann),
            TypeExpr::Generic(def, args) => return self.resolve_record(def, args, &ann),
            TypeExpr::Param(name) => return Err(DefinitionError::UnfilledTypeVar(name.clone())),

            // References and wrappers
            TypeExpr::Forward(name) => {
                let target = self.lookup(name)?;
                trace!(name = %name, target = %target, "Forward reference resolved");
                return self.resolve_keeping(&target, ann);
            }
            TypeExpr::NewType(_, inner) => return self.resolve_keeping(inner, ann),
            TypeExpr::Annotated(..) | TypeExpr::Required(_) | TypeExpr::NotRequired(_) => {
                return self.resolve_keeping(expr, ann)
            }
            TypeExpr::Opaque(name) => return Err(DefinitionError::UnknownType(name.clone())),
        };

        Ok(TypeNode::new(kind)
            .with_custom_encoder(ann.custom_encoder())
            .into_node())
    }

    fn lookup(&self, name: &str) -> Result<TypeExpr> {
        self.ctx
            .registry()
            .lookup(name)
            .cloned()
            .ok_or_else(|| DefinitionError::UnresolvedReference(name.to_string()))
    }

    fn resolve_union(&mut self, items: &[TypeExpr], ann: Annotations) -> Result<Node> {
        let rest: Vec<TypeExpr> = items
            .iter()
            .filter(|item| !matches!(peel(item).0, TypeExpr::None))
            .cloned()
            .collect();

        if rest.is_empty() {
            return Err(DefinitionError::UnknownType("None".to_string()));
        }

        if rest.len() < items.len() {
            let encoder = ann.custom_encoder();
            let inner_ann = ann.without(AnnotationKind::CustomEncoder);
            let inner = match rest.as_slice() {
                [single] => self.resolve_keeping(single, inner_ann)?,
                _ => self.resolve_union(&rest, inner_ann)?,
            };
            return Ok(TypeNode::new(TypeKind::Optional(inner))
                .with_custom_encoder(encoder)
                .into_node());
        }

        if let [single] = rest.as_slice() {
            return self.resolve_keeping(single, ann);
        }

        let kind = match ann.discriminator() {
            Some(field) => {
                let field = field.to_string();
                TypeKind::DiscriminatedUnion(self.resolve_discriminated(&rest, &field, &ann)?)
            }
            None => TypeKind::Union(
                rest.iter()
                    .map(|item| self.resolve(item, &ann))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(TypeNode::new(kind)
            .with_custom_encoder(ann.custom_encoder())
            .into_node())
    }

    fn resolve_discriminated(
        &mut self,
        items: &[TypeExpr],
        field: &str,
        ann: &Annotations,
    ) -> Result<DiscriminatedUnion> {
        let rendered = TypeExpr::Union(items.to_vec()).to_string();
        let mut alternatives: IndexMap<String, Node> = IndexMap::new();
        let mut tags = Vec::with_capacity(items.len());

        for item in items {
            let def = self
                .entity_target(item)?
                .ok_or_else(|| DefinitionError::NonEntityUnion(rendered.clone()))?;
            let (value, tag) = record::discriminator_value(&def, field)?;
            if alternatives.contains_key(&value) {
                return Err(DefinitionError::DuplicateDiscriminator {
                    union: rendered,
                    value,
                });
            }

            let previous = self.ctx.replace_discriminator(Some(field.to_string()));
            let node = self.resolve(item, ann);
            self.ctx.replace_discriminator(previous);
            alternatives.insert(value, node?);
            tags.push(tag);
        }

        Ok(DiscriminatedUnion {
            items: alternatives,
            tags,
            dump_discriminator: field.to_string(),
            load_discriminator: ann.naming().apply(field),
        })
    }

    /// The nominal record behind an alternative, following forward references.
    fn entity_target(&self, expr: &TypeExpr) -> Result<Option<Arc<RecordDef>>> {
        match peel(expr).0 {
            TypeExpr::Record(def) | TypeExpr::Generic(def, _)
                if def.style == RecordStyle::Entity =>
            {
                Ok(Some(Arc::clone(def)))
            }
            TypeExpr::Forward(name) => {
                let target = self.lookup(name)?;
                self.entity_target(&target)
            }
            TypeExpr::NewType(_, inner) => self.entity_target(inner),
            _ => Ok(None),
        }
    }
}

fn numeric_bounds(ann: &Annotations) -> NumericBounds {
    NumericBounds {
        min: ann.min(),
        max: ann.max(),
    }
}

fn length_bounds(ann: &Annotations) -> LengthBounds {
    LengthBounds {
        min: ann.min_length(),
        max: ann.max_length(),
    }
}

/// Reuse a memoized node, attaching a use-site custom encoder if present.
fn with_encoder(node: Node, encoder: Option<CustomEncoder>) -> Node {
    match encoder {
        None => node,
        Some(encoder) => TypeNode::new(node.kind.clone())
            .with_custom_encoder(Some(encoder))
            .into_node(),
    }
}

fn recursion_holder(holder: RecursionHolder) -> Node {
    TypeNode::new(TypeKind::RecursionHolder(holder)).into_node()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Annotation;
    use crate::expr::{EnumDef, Scalar};
    use crate::naming::NamingConvention;

    fn resolve(expr: &TypeExpr) -> Result<TypeGraph> {
        TypeResolver::new(Arc::new(TypeRegistry::new())).resolve_root(expr, &Annotations::new())
    }

    fn resolve_with(registry: TypeRegistry, expr: &TypeExpr) -> Result<TypeGraph> {
        TypeResolver::new(Arc::new(registry)).resolve_root(expr, &Annotations::new())
    }

    #[test]
    fn test_primitive_bounds_come_from_annotations() {
        let expr = TypeExpr::annotated(
            TypeExpr::Int,
            vec![Annotation::min(1), Annotation::max(10)],
        );
        let graph = resolve(&expr).unwrap();
        match &graph.root().kind {
            TypeKind::Integer(bounds) => {
                assert_eq!(bounds.min.as_ref().map(|b| b.to_string()), Some("1".into()));
                assert_eq!(bounds.max.as_ref().map(|b| b.to_string()), Some("10".into()));
            }
            other => panic!("unexpected kind {other}"),
        }
    }

    #[test]
    fn test_bounds_do_not_leak_into_children() {
        let expr = TypeExpr::annotated(
            TypeExpr::list(TypeExpr::Str),
            vec![Annotation::MinLength(2)],
        );
        let graph = resolve(&expr).unwrap();
        let TypeKind::Array { item, bounds } = &graph.root().kind else {
            panic!("expected array");
        };
        assert_eq!(bounds.min, Some(2));
        assert!(matches!(&item.kind, TypeKind::String(b) if b.min.is_none()));
    }

    #[test]
    fn test_optional_collapses_none() {
        let graph = resolve(&TypeExpr::optional(TypeExpr::Int)).unwrap();
        let TypeKind::Optional(inner) = &graph.root().kind else {
            panic!("expected optional");
        };
        assert!(matches!(inner.kind, TypeKind::Integer(_)));

        let graph = resolve(&TypeExpr::union(vec![
            TypeExpr::Int,
            TypeExpr::Str,
            TypeExpr::None,
        ]))
        .unwrap();
        let TypeKind::Optional(inner) = &graph.root().kind else {
            panic!("expected optional");
        };
        assert!(matches!(&inner.kind, TypeKind::Union(items) if items.len() == 2));
    }

    #[test]
    fn test_optional_keeps_bounds_for_inner() {
        let expr = TypeExpr::annotated(
            TypeExpr::optional(TypeExpr::Str),
            vec![Annotation::MaxLength(3)],
        );
        let graph = resolve(&expr).unwrap();
        let TypeKind::Optional(inner) = &graph.root().kind else {
            panic!("expected optional");
        };
        assert!(matches!(&inner.kind, TypeKind::String(b) if b.max == Some(3)));
    }

    #[test]
    fn test_definition_errors() {
        assert_eq!(
            resolve(&TypeExpr::VarTuple(Box::new(TypeExpr::Int))).unwrap_err(),
            DefinitionError::VariableLengthTuple
        );
        assert_eq!(
            resolve(&TypeExpr::tuple(vec![])).unwrap_err(),
            DefinitionError::VariableLengthTuple
        );
        assert_eq!(
            resolve(&TypeExpr::Literal(vec![])).unwrap_err(),
            DefinitionError::UnsupportedLiteral
        );
        assert_eq!(
            resolve(&TypeExpr::Opaque("Foo".into())).unwrap_err(),
            DefinitionError::UnknownType("Foo".into())
        );
        assert_eq!(
            resolve(&TypeExpr::None).unwrap_err(),
            DefinitionError::UnknownType("None".into())
        );
        assert_eq!(
            resolve(&TypeExpr::forward("missing.Type")).unwrap_err(),
            DefinitionError::UnresolvedReference("missing.Type".into())
        );
    }

    #[test]
    fn test_unfilled_type_var() {
        let page = RecordDef::entity("m.Page")
            .param("T")
            .field("items", TypeExpr::list(TypeExpr::param("U")))
            .build();
        assert_eq!(
            resolve(&TypeExpr::record(&page)).unwrap_err(),
            DefinitionError::UnfilledTypeVar("U".into())
        );
    }

    #[test]
    fn test_forward_reference_keeps_use_site_options() {
        let mut registry = TypeRegistry::new();
        registry.register("m.Small", TypeExpr::Int);
        let expr = TypeExpr::annotated(TypeExpr::forward("m.Small"), vec![Annotation::max(5)]);
        let graph = resolve_with(registry, &expr).unwrap();
        assert!(matches!(&graph.root().kind, TypeKind::Integer(b) if b.max.is_some()));
    }

    #[test]
    fn test_new_type_resolves_supertype() {
        let expr = TypeExpr::new_type("UserId", TypeExpr::Uuid);
        assert!(matches!(resolve(&expr).unwrap().root().kind, TypeKind::Uuid));
    }

    #[test]
    fn test_enum_and_literal() {
        let color = EnumDef::new("m.Color").member("RED", "red").build();
        let graph = resolve(&TypeExpr::enumeration(&color)).unwrap();
        assert!(matches!(&graph.root().kind, TypeKind::Enum(def) if def.name == "m.Color"));

        let graph = resolve(&TypeExpr::literal([Scalar::Int(1), Scalar::from("a")])).unwrap();
        assert!(matches!(&graph.root().kind, TypeKind::Literal(v) if v.len() == 2));
    }

    #[test]
    fn test_recursive_record_terminates() {
        let node = RecordDef::entity("m.Node")
            .field("value", TypeExpr::Int)
            .field("next", TypeExpr::optional(TypeExpr::forward("m.Node")))
            .build();
        let mut registry = TypeRegistry::new();
        registry.register_record(&node);

        let graph = resolve_with(registry, &TypeExpr::record(&node)).unwrap();
        let record = graph.root().as_record().unwrap();
        let TypeKind::Optional(next) = &record.fields[1].ty.kind else {
            panic!("expected optional");
        };
        assert!(matches!(next.kind, TypeKind::RecursionHolder(_)));
        assert!(Arc::ptr_eq(graph.deref(next).unwrap(), graph.root()));
        assert_eq!(graph.record_count(), 1);
    }

    #[test]
    fn test_memoized_record_is_shared() {
        let item = RecordDef::entity("m.Item").field("id", TypeExpr::Int).build();
        let pair = RecordDef::entity("m.Pair")
            .field("left", TypeExpr::record(&item))
            .field("right", TypeExpr::record(&item))
            .build();
        let graph = resolve(&TypeExpr::record(&pair)).unwrap();
        let record = graph.root().as_record().unwrap();
        assert!(Arc::ptr_eq(&record.fields[0].ty, &record.fields[1].ty));
        assert_eq!(graph.record_count(), 2);
    }

    #[test]
    fn test_naming_convention_changes_record_identity() {
        let item = RecordDef::entity("m.Item").field("item_id", TypeExpr::Int).build();
        let pair = RecordDef::entity("m.Pair")
            .field("plain", TypeExpr::record(&item))
            .field(
                "camel",
                TypeExpr::annotated(TypeExpr::record(&item), vec![Annotation::camel_case()]),
            )
            .build();
        let graph = resolve(&TypeExpr::record(&pair)).unwrap();
        let record = graph.root().as_record().unwrap();
        let plain = record.fields[0].ty.as_record().unwrap();
        let camel = record.fields[1].ty.as_record().unwrap();
        assert_eq!(plain.name, "m.Item[no_format,keep_nones]");
        assert_eq!(camel.name, "m.Item[camel_case,keep_nones]");
        assert_eq!(camel.fields[0].dict_key, "itemId");
        assert_eq!(
            Annotations::new().with(Annotation::camel_case()).naming(),
            NamingConvention::CamelCase
        );
    }

    #[test]
    fn test_generic_record_binds_arguments() {
        let page = RecordDef::entity("m.Page")
            .param("T")
            .field("items", TypeExpr::list(TypeExpr::param("T")))
            .build();
        let graph = resolve(&TypeExpr::generic(&page, vec![TypeExpr::Int])).unwrap();
        let record = graph.root().as_record().unwrap();
        assert_eq!(record.name, "m.Page[int][no_format,keep_nones]");
        let TypeKind::Array { item, .. } = &record.fields[0].ty.kind else {
            panic!("expected array");
        };
        assert!(matches!(item.kind, TypeKind::Integer(_)));

        let graph = resolve(&TypeExpr::record(&page)).unwrap();
        let record = graph.root().as_record().unwrap();
        let TypeKind::Array { item, .. } = &record.fields[0].ty.kind else {
            panic!("expected array");
        };
        assert!(matches!(item.kind, TypeKind::Any));
    }

    #[test]
    fn test_custom_type_resolver_claims_opaque() {
        use crate::custom::CustomType;
        use crate::value::Value;
        use serde_json::{json, Value as JsonValue};

        struct Money;
        impl CustomType for Money {
            fn serialize(&self, value: &Value) -> std::result::Result<JsonValue, String> {
                Ok(value.to_json())
            }
            fn deserialize(&self, data: &JsonValue) -> std::result::Result<Value, String> {
                Ok(Value::from_json(data))
            }
            fn json_schema(&self) -> JsonValue {
                json!({"type": "string", "format": "money"})
            }
        }

        let hook: CustomTypeResolver = Arc::new(|expr: &TypeExpr| match expr {
            TypeExpr::Opaque(name) if name == "Money" => {
                Some(Arc::new(Money) as Arc<dyn CustomType>)
            }
            _ => None,
        });
        let graph = TypeResolver::new(Arc::new(TypeRegistry::new()))
            .with_custom_type_resolver(Some(hook))
            .resolve_root(&TypeExpr::Opaque("Money".into()), &Annotations::new())
            .unwrap();
        assert!(matches!(
            &graph.root().kind,
            TypeKind::Custom { schema } if schema["format"] == "money"
        ));
        assert!(graph.root().custom_encoder.is_some());
    }
}
