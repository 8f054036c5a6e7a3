//! Annotation model.
//!
//! Annotations are typed configuration options attached to a type expression
//! through [`TypeExpr::Annotated`](crate::expr::TypeExpr::Annotated). A bag holds
//! at most one option per [`AnnotationKind`].
//!
//! # Inheritance
//!
//! | Kind | Inheritable |
//! |------|-------------|
//! | `NamingConvention` | yes |
//! | `NoneFormat` | yes |
//! | `OptionalDefault` | yes |
//! | `Min`, `Max`, `MinLength`, `MaxLength` | no |
//! | `Alias`, `Discriminator`, `Flatten`, `CustomEncoder` | no |
//!
//! Inheritable options flow into every nested resolution. Local options apply
//! only to the expression they are attached to.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::custom::CustomEncoder;
use crate::naming::NamingConvention;

/// How `None` values are emitted inside records and dictionaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoneFormat {
    #[default]
    KeepNones,
    OmitNones,
}

impl NoneFormat {
    pub fn omit(&self) -> bool {
        matches!(self, NoneFormat::OmitNones)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoneFormat::KeepNones => "keep_nones",
            NoneFormat::OmitNones => "omit_nones",
        }
    }
}

/// Whether `Optional` fields without a default get an implicit `None` default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalDefault {
    #[default]
    KeepDefault,
    ForceNone,
}

impl OptionalDefault {
    pub fn force_none(&self) -> bool {
        matches!(self, OptionalDefault::ForceNone)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionalDefault::KeepDefault => "keep_default",
            OptionalDefault::ForceNone => "force_none",
        }
    }
}

/// Numeric bound for `Min`/`Max`.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Int(i64),
    Float(f64),
    /// Decimal text, e.g. `"10.25"`
    Decimal(String),
}

impl Bound {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Bound::Int(v) => Some(*v as f64),
            Bound::Float(v) => Some(*v),
            Bound::Decimal(v) => v.parse().ok(),
        }
    }

    /// JSON number for schema keywords.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Bound::Int(v) => JsonValue::from(*v),
            Bound::Float(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Bound::Decimal(v) => v
                .parse::<i64>()
                .map(JsonValue::from)
                .ok()
                .or_else(|| {
                    v.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(JsonValue::Number)
                })
                .unwrap_or(JsonValue::Null),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Int(v) => write!(f, "{v}"),
            Bound::Float(v) => write!(f, "{v}"),
            Bound::Decimal(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Bound {
    fn from(value: i64) -> Self {
        Bound::Int(value)
    }
}

impl From<f64> for Bound {
    fn from(value: f64) -> Self {
        Bound::Float(value)
    }
}

/// Discriminant of [`Annotation`], used as the bag key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnotationKind {
    NamingConvention,
    NoneFormat,
    OptionalDefault,
    Min,
    Max,
    MinLength,
    MaxLength,
    Alias,
    Discriminator,
    Flatten,
    CustomEncoder,
}

impl AnnotationKind {
    /// Whether options of this kind propagate into nested resolution.
    pub fn is_inheritable(&self) -> bool {
        matches!(
            self,
            AnnotationKind::NamingConvention
                | AnnotationKind::NoneFormat
                | AnnotationKind::OptionalDefault
        )
    }
}

/// A single configuration option.
#[derive(Debug, Clone)]
pub enum Annotation {
    NamingConvention(NamingConvention),
    NoneFormat(NoneFormat),
    OptionalDefault(OptionalDefault),
    Min(Bound),
    Max(Bound),
    MinLength(usize),
    MaxLength(usize),
    /// Wire name override for a record field
    Alias(String),
    /// Field name that tags the alternatives of a union
    Discriminator(String),
    /// Splice a nested record or dictionary into the owning record
    Flatten,
    CustomEncoder(CustomEncoder),
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::NamingConvention(_) => AnnotationKind::NamingConvention,
            Annotation::NoneFormat(_) => AnnotationKind::NoneFormat,
            Annotation::OptionalDefault(_) => AnnotationKind::OptionalDefault,
            Annotation::Min(_) => AnnotationKind::Min,
            Annotation::Max(_) => AnnotationKind::Max,
            Annotation::MinLength(_) => AnnotationKind::MinLength,
            Annotation::MaxLength(_) => AnnotationKind::MaxLength,
            Annotation::Alias(_) => AnnotationKind::Alias,
            Annotation::Discriminator(_) => AnnotationKind::Discriminator,
            Annotation::Flatten => AnnotationKind::Flatten,
            Annotation::CustomEncoder(_) => AnnotationKind::CustomEncoder,
        }
    }

    pub fn camel_case() -> Self {
        Annotation::NamingConvention(NamingConvention::CamelCase)
    }

    pub fn omit_none() -> Self {
        Annotation::NoneFormat(NoneFormat::OmitNones)
    }

    pub fn alias(name: impl Into<String>) -> Self {
        Annotation::Alias(name.into())
    }

    pub fn discriminator(field: impl Into<String>) -> Self {
        Annotation::Discriminator(field.into())
    }

    pub fn min(bound: impl Into<Bound>) -> Self {
        Annotation::Min(bound.into())
    }

    pub fn max(bound: impl Into<Bound>) -> Self {
        Annotation::Max(bound.into())
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::NamingConvention(v) => write!(f, "NamingConvention({v})"),
            Annotation::NoneFormat(v) => write!(f, "NoneFormat({})", v.as_str()),
            Annotation::OptionalDefault(v) => write!(f, "OptionalDefault({})", v.as_str()),
            Annotation::Min(v) => write!(f, "Min({v})"),
            Annotation::Max(v) => write!(f, "Max({v})"),
            Annotation::MinLength(v) => write!(f, "MinLength({v})"),
            Annotation::MaxLength(v) => write!(f, "MaxLength({v})"),
            Annotation::Alias(v) => write!(f, "Alias({v})"),
            Annotation::Discriminator(v) => write!(f, "Discriminator({v})"),
            Annotation::Flatten => f.write_str("Flatten"),
            Annotation::CustomEncoder(v) => write!(f, "{v}"),
        }
    }
}

/// Immutable-by-convention bag of annotations.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    data: BTreeMap<AnnotationKind, Annotation>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an option, builder style.
    pub fn with(mut self, annotation: Annotation) -> Self {
        self.insert(annotation);
        self
    }

    pub fn insert(&mut self, annotation: Annotation) {
        self.data.insert(annotation.kind(), annotation);
    }

    pub fn get(&self, kind: AnnotationKind) -> Option<&Annotation> {
        self.data.get(&kind)
    }

    pub fn contains(&self, kind: AnnotationKind) -> bool {
        self.data.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.data.values()
    }

    /// Keep the inheritable options of `self`, then overlay all of `other`.
    pub fn merge(&self, other: &Annotations) -> Annotations {
        let mut merged = self.inheritable();
        for annotation in other.data.values() {
            merged.insert(annotation.clone());
        }
        merged
    }

    /// Keep all of `self`, then overlay all of `other`.
    pub fn overlay(&self, other: &Annotations) -> Annotations {
        let mut merged = self.clone();
        for annotation in other.data.values() {
            merged.insert(annotation.clone());
        }
        merged
    }

    /// A copy without the option of `kind`.
    pub fn without(&self, kind: AnnotationKind) -> Annotations {
        let mut rest = self.clone();
        rest.data.remove(&kind);
        rest
    }

    /// The subset of options that propagate into nested types.
    pub fn inheritable(&self) -> Annotations {
        Annotations {
            data: self
                .data
                .iter()
                .filter(|(kind, _)| kind.is_inheritable())
                .map(|(kind, ann)| (*kind, ann.clone()))
                .collect(),
        }
    }

    /// Canonical, order-independent rendering of the bag.
    pub fn key(&self) -> String {
        let mut parts: Vec<String> = self.data.values().map(|a| a.to_string()).collect();
        parts.sort();
        format!("[{}]", parts.join(", "))
    }

    pub fn naming(&self) -> NamingConvention {
        match self.get(AnnotationKind::NamingConvention) {
            Some(Annotation::NamingConvention(v)) => *v,
            _ => NamingConvention::default(),
        }
    }

    pub fn none_format(&self) -> NoneFormat {
        match self.get(AnnotationKind::NoneFormat) {
            Some(Annotation::NoneFormat(v)) => *v,
            _ => NoneFormat::default(),
        }
    }

    pub fn optional_default(&self) -> OptionalDefault {
        match self.get(AnnotationKind::OptionalDefault) {
            Some(Annotation::OptionalDefault(v)) => *v,
            _ => OptionalDefault::default(),
        }
    }

    pub fn min(&self) -> Option<Bound> {
        match self.get(AnnotationKind::Min) {
            Some(Annotation::Min(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn max(&self) -> Option<Bound> {
        match self.get(AnnotationKind::Max) {
            Some(Annotation::Max(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn min_length(&self) -> Option<usize> {
        match self.get(AnnotationKind::MinLength) {
            Some(Annotation::MinLength(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn max_length(&self) -> Option<usize> {
        match self.get(AnnotationKind::MaxLength) {
            Some(Annotation::MaxLength(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self.get(AnnotationKind::Alias) {
            Some(Annotation::Alias(v)) => Some(v),
            _ => None,
        }
    }

    pub fn discriminator(&self) -> Option<&str> {
        match self.get(AnnotationKind::Discriminator) {
            Some(Annotation::Discriminator(v)) => Some(v),
            _ => None,
        }
    }

    pub fn is_flatten(&self) -> bool {
        self.contains(AnnotationKind::Flatten)
    }

    pub fn custom_encoder(&self) -> Option<CustomEncoder> {
        match self.get(AnnotationKind::CustomEncoder) {
            Some(Annotation::CustomEncoder(v)) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromIterator<Annotation> for Annotations {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        let mut bag = Annotations::new();
        for annotation in iter {
            bag.insert(annotation);
        }
        bag
    }
}

impl fmt::Display for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
