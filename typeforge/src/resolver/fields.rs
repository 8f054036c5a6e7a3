//! Field extraction.
//!
//! [`FieldSource`] is the single dispatch point over [`RecordStyle`]: nominal
//! records derive optionality from defaults, structural records from `total`
//! and the `Required`/`NotRequired` key markers.

use crate::annotations::Annotation;
use crate::expr::{FieldDefault, RecordDef, RecordStyle, TypeExpr};

/// A declared field with its optionality decided.
#[derive(Debug, Clone)]
pub struct SourceField {
    pub name: String,
    /// Declared type with key markers removed
    pub ty: TypeExpr,
    pub default: FieldDefault,
    pub required: bool,
    pub doc: Option<String>,
}

/// Anything that can list its fields for record building.
pub trait FieldSource {
    fn source_fields(&self) -> Vec<SourceField>;
}

impl FieldSource for RecordDef {
    fn source_fields(&self) -> Vec<SourceField> {
        match self.style {
            RecordStyle::Entity => entity_fields(self),
            RecordStyle::TypedDict { total } => typed_dict_fields(self, total),
        }
    }
}

fn entity_fields(def: &RecordDef) -> Vec<SourceField> {
    def.fields
        .iter()
        .map(|decl| SourceField {
            name: decl.name.clone(),
            ty: decl.ty.clone(),
            default: decl.default.clone(),
            required: decl.default.is_missing(),
            doc: decl.doc.clone(),
        })
        .collect()
}

fn typed_dict_fields(def: &RecordDef, total: bool) -> Vec<SourceField> {
    def.fields
        .iter()
        .map(|decl| {
            let (ty, marker) = strip_key_marker(&decl.ty);
            SourceField {
                name: decl.name.clone(),
                ty,
                // absent optional keys stay absent on load
                default: FieldDefault::Missing,
                required: marker.unwrap_or(total),
                doc: decl.doc.clone(),
            }
        })
        .collect()
}

/// Remove a `Required`/`NotRequired` marker, also when it sits inside
/// `Annotated` wrappers. Returns the marker as `Some(required)`.
pub fn strip_key_marker(ty: &TypeExpr) -> (TypeExpr, Option<bool>) {
    match ty {
        TypeExpr::Required(inner) => (strip_key_marker(inner).0, Some(true)),
        TypeExpr::NotRequired(inner) => (strip_key_marker(inner).0, Some(false)),
        TypeExpr::Annotated(inner, anns) => {
            let (inner, marker) = strip_key_marker(inner);
            (TypeExpr::Annotated(Box::new(inner), anns.clone()), marker)
        }
        other => (other.clone(), None),
    }
}

/// Peel `Annotated` wrappers and key markers.
///
/// Options of outer wrappers override those of inner ones.
pub fn peel(ty: &TypeExpr) -> (&TypeExpr, Vec<Annotation>) {
    let mut layers: Vec<&[Annotation]> = Vec::new();
    let mut current = ty;
    loop {
        match current {
            TypeExpr::Annotated(inner, anns) => {
                layers.push(anns);
                current = inner;
            }
            TypeExpr::Required(inner) | TypeExpr::NotRequired(inner) => current = inner,
            _ => break,
        }
    }
    let collected = layers.into_iter().rev().flatten().cloned().collect();
    (current, collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Annotations;

    #[test]
    fn test_entity_optionality_follows_defaults() {
        let def = RecordDef::entity("m.A")
            .field("a", TypeExpr::Int)
            .field_default("b", TypeExpr::Int, 1)
            .build();
        let fields = def.source_fields();
        assert!(fields[0].required);
        assert!(!fields[1].required);
    }

    #[test]
    fn test_typed_dict_markers_override_total() {
        let def = RecordDef::typed_dict("m.T", false)
            .field("a", TypeExpr::Required(Box::new(TypeExpr::Int)))
            .field("b", TypeExpr::Int)
            .build();
        let fields = def.source_fields();
        assert!(fields[0].required);
        assert!(matches!(fields[0].ty, TypeExpr::Int));
        assert!(!fields[1].required);

        let def = RecordDef::typed_dict("m.U", true)
            .field(
                "a",
                TypeExpr::annotated(
                    TypeExpr::NotRequired(Box::new(TypeExpr::Str)),
                    vec![Annotation::alias("x")],
                ),
            )
            .field("b", TypeExpr::Int)
            .build();
        let fields = def.source_fields();
        assert!(!fields[0].required);
        assert!(fields[1].required);
    }

    #[test]
    fn test_peel_outer_options_win() {
        let ty = TypeExpr::annotated(
            TypeExpr::annotated(TypeExpr::Int, vec![Annotation::alias("inner")]),
            vec![Annotation::alias("outer")],
        );
        let (inner, anns) = peel(&ty);
        assert!(matches!(inner, TypeExpr::Int));
        let bag: Annotations = anns.into_iter().collect();
        assert_eq!(bag.alias(), Some("outer"));
    }
}
