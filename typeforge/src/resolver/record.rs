//! Record building.
//!
//! Turns a [`RecordDef`] into a memoized [`RecordType`] node: binds generic
//! parameters, resolves each field, decides wire keys and splices flattened
//! fields into the owner.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::annotations::Annotations;
use crate::error::DefinitionError;
use crate::expr::{FieldDefault, RecordDef, RecordStyle, Scalar, TypeExpr};
use crate::ir::{
    ExtraFields, Field, FlattenGroup, Node, RecordType, RecursionHolder, ResolutionKey, TypeKind,
    TypeNode,
};
use crate::value::Value;

use super::fields::{peel, FieldSource};
use super::{recursion_holder, with_encoder, Result, Slot, TypeResolver};

impl TypeResolver {
    /// Resolve a (possibly generic) record, memoized by resolution key.
    pub(super) fn resolve_record(
        &mut self,
        def: &Arc<RecordDef>,
        args: &[TypeExpr],
        ann: &Annotations,
    ) -> Result<Node> {
        let bindings: HashMap<String, TypeExpr> = def
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| (param.clone(), args.get(i).cloned().unwrap_or(TypeExpr::Any)))
            .collect();
        let generics = render_generics(def, &bindings);
        let inheritable = ann.inheritable();
        let key = ResolutionKey::new(
            format!("{}@{:p}", def.name, Arc::as_ptr(def)),
            inheritable.key(),
            generics.clone(),
        );

        match self.ctx.lookup(&key) {
            Some(Slot::InProgress { name }) => {
                trace!(record = %def.name, name = %name, "Recursive reference");
                return Ok(recursion_holder(RecursionHolder {
                    name: name.clone(),
                    key,
                }));
            }
            Some(Slot::Done(node)) => {
                trace!(record = %def.name, "Record cache hit");
                return Ok(with_encoder(Arc::clone(node), ann.custom_encoder()));
            }
            None => {}
        }

        let base = format!(
            "{}{}[{},{}{}]",
            def.name,
            generics,
            inheritable.naming().as_str(),
            inheritable.none_format().as_str(),
            if inheritable.optional_default().force_none() {
                ",force_none"
            } else {
                ""
            }
        );
        let name = self.ctx.generate_name(&key, &base);
        self.ctx.begin(key.clone(), name.clone());
        debug!(record = %def.name, name = %name, "Resolving record");

        let discriminator = self.ctx.replace_discriminator(None);
        let built = self.build_record(def, &bindings, &inheritable, name, discriminator.as_deref());
        self.ctx.replace_discriminator(discriminator);

        let record = Arc::new(built?);
        let kind = match def.style {
            RecordStyle::Entity => TypeKind::Entity(record),
            RecordStyle::TypedDict { .. } => TypeKind::TypedDict(record),
        };
        let node = TypeNode::new(kind).into_node();
        self.ctx.finish(key, Arc::clone(&node));
        Ok(with_encoder(node, ann.custom_encoder()))
    }

    fn build_record(
        &mut self,
        def: &RecordDef,
        bindings: &HashMap<String, TypeExpr>,
        ann: &Annotations,
        name: String,
        discriminator: Option<&str>,
    ) -> Result<RecordType> {
        let mut fields = Vec::new();
        let mut flattened = Vec::new();
        let mut extras = Vec::new();

        for source in def.source_fields() {
            let ty = source.ty.substitute(bindings);
            let local: Annotations = peel(&ty).1.into_iter().collect();
            let field_type = self.resolve(&ty, ann)?;

            if local.is_flatten() {
                flatten_into(
                    &source.name,
                    &field_type,
                    &mut fields,
                    &mut flattened,
                    &mut extras,
                )?;
                continue;
            }

            let is_discriminator = discriminator == Some(source.name.as_str());
            let mut required = source.required || is_discriminator;
            let mut default = source.default;
            let force_none = ann.merge(&local).optional_default().force_none();
            if required
                && !is_discriminator
                && force_none
                && matches!(field_type.kind, TypeKind::Optional(_))
            {
                required = false;
                default = FieldDefault::Value(Value::None);
            }

            let dict_key = local
                .alias()
                .map(str::to_string)
                .unwrap_or_else(|| ann.naming().apply(&source.name));

            fields.push(Field {
                name: source.name,
                dict_key,
                ty: field_type,
                doc: source.doc,
                default,
                required,
                is_discriminator,
                path: Vec::new(),
            });
        }

        if extras.len() > 1 {
            return Err(DefinitionError::MultipleDictFlatten(def.name.clone()));
        }
        check_conflicts(&def.name, &fields)?;

        Ok(RecordType {
            name,
            source: def.name.clone(),
            doc: def.doc.clone(),
            style: def.style,
            omit_none: ann.none_format().omit(),
            fields,
            flattened,
            extra: extras.pop(),
        })
    }
}

fn render_generics(def: &RecordDef, bindings: &HashMap<String, TypeExpr>) -> String {
    if !def.is_generic() {
        return String::new();
    }
    let args: Vec<String> = def
        .params
        .iter()
        .map(|p| {
            bindings
                .get(p)
                .map(|t| t.to_string())
                .unwrap_or_else(|| "Any".to_string())
        })
        .collect();
    format!("[{}]", args.join(", "))
}

fn prefixed(head: &str, rest: &[String]) -> Vec<String> {
    std::iter::once(head.to_string())
        .chain(rest.iter().cloned())
        .collect()
}

/// Splice a flatten field's content into the owner.
fn flatten_into(
    field_name: &str,
    node: &Node,
    fields: &mut Vec<Field>,
    flattened: &mut Vec<FlattenGroup>,
    extras: &mut Vec<ExtraFields>,
) -> Result<()> {
    match &node.kind {
        TypeKind::Entity(record) | TypeKind::TypedDict(record) => {
            flattened.push(FlattenGroup {
                path: vec![field_name.to_string()],
                type_name: record.source.clone(),
                style: record.style,
            });
            flattened.extend(record.flattened.iter().map(|group| FlattenGroup {
                path: prefixed(field_name, &group.path),
                ..group.clone()
            }));
            fields.extend(record.fields.iter().map(|field| Field {
                path: prefixed(field_name, &field.path),
                ..field.clone()
            }));
            if let Some(extra) = &record.extra {
                extras.push(ExtraFields {
                    path: prefixed(field_name, &extra.path),
                    ..extra.clone()
                });
            }
            Ok(())
        }
        TypeKind::Dictionary { value, .. } => {
            extras.push(ExtraFields {
                path: Vec::new(),
                field: field_name.to_string(),
                value: Arc::clone(value),
                forbid: matches!(value.kind, TypeKind::Never),
            });
            Ok(())
        }
        other => Err(DefinitionError::NotFlattenable {
            field: field_name.to_string(),
            kind: other.type_name().to_string(),
        }),
    }
}

/// Reject duplicate wire keys.
fn check_conflicts(record: &str, fields: &[Field]) -> Result<()> {
    let mut seen: HashMap<&str, bool> = HashMap::new();
    for field in fields {
        if let Some(previous_flattened) = seen.insert(&field.dict_key, field.is_flattened()) {
            let key = field.dict_key.clone();
            let record = record.to_string();
            return Err(if previous_flattened || field.is_flattened() {
                DefinitionError::FlattenConflict { record, key }
            } else {
                DefinitionError::DuplicateField { record, key }
            });
        }
    }
    Ok(())
}

/// The single string literal a record declares for `field`: its wire value
/// and the literal itself. Enum members with a string value qualify.
pub(super) fn discriminator_value(def: &RecordDef, field: &str) -> Result<(String, Scalar)> {
    let decl = def
        .field_decl(field)
        .ok_or_else(|| DefinitionError::MissingDiscriminator {
            type_name: def.name.clone(),
            field: field.to_string(),
        })?;
    match peel(&decl.ty).0 {
        TypeExpr::Literal(values) => match values.as_slice() {
            [literal] => literal
                .as_str()
                .map(|value| (value.to_string(), literal.clone()))
                .ok_or_else(|| invalid_discriminator(def, field, &decl.ty)),
            _ => Err(invalid_discriminator(def, field, &decl.ty)),
        },
        _ => Err(invalid_discriminator(def, field, &decl.ty)),
    }
}

fn invalid_discriminator(def: &RecordDef, field: &str, ty: &TypeExpr) -> DefinitionError {
    DefinitionError::InvalidDiscriminator {
        type_name: def.name.clone(),
        field: field.to_string(),
        found: ty.to_string(),
    }
}
