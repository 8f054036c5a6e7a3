//! Type expressions.
//!
//! A [`TypeExpr`] is the input to the resolver: a structural description of a
//! type, independent of any host language. Records and enums are declared
//! once as [`RecordDef`]/[`EnumDef`] and shared through `Arc`. Recursive
//! types refer back to themselves through [`TypeExpr::Forward`] names that
//! are looked up in a [`TypeRegistry`].
//!
//! # Example
//!
//! ```rust
//! use typeforge::expr::{RecordDef, TypeExpr, TypeRegistry};
//!
//! let node = RecordDef::entity("tree.Node")
//!     .field("value", TypeExpr::Int)
//!     .field("next", TypeExpr::optional(TypeExpr::forward("tree.Node")))
//!     .build();
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_record(&node);
//! assert!(registry.lookup("tree.Node").is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::annotations::Annotation;
use crate::value::{EnumValue, Value};

/// A literal or enum member value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Str(String),
    /// An enum member used as a literal; on the wire it is the member's value.
    Member(MemberLiteral),
}

/// A member of a named enum, carried by [`Scalar::Member`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberLiteral {
    pub enum_name: String,
    pub member: String,
    pub value: Box<Scalar>,
}

impl Scalar {
    pub fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Int(i) => JsonValue::from(*i),
            Scalar::Str(s) => JsonValue::String(s.clone()),
            Scalar::Member(m) => m.value.to_json(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Int(i) => Value::Int(*i),
            Scalar::Str(s) => Value::Str(s.clone()),
            Scalar::Member(m) => Value::Enum(EnumValue::new(m.enum_name.clone(), m.member.clone())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            Scalar::Int(_) => None,
            Scalar::Member(m) => m.value.as_str(),
        }
    }

    /// Whether a wire value is this scalar.
    pub fn matches_json(&self, data: &JsonValue) -> bool {
        match (self, data) {
            (Scalar::Int(i), JsonValue::Number(n)) => n.as_i64() == Some(*i),
            (Scalar::Str(s), JsonValue::String(d)) => s == d,
            (Scalar::Member(m), _) => m.value.matches_json(data),
            _ => false,
        }
    }

    /// Whether a native value is this scalar.
    pub fn matches_value(&self, value: &Value) -> bool {
        match (self, value) {
            (Scalar::Int(i), Value::Int(v)) => i == v,
            (Scalar::Str(s), Value::Str(v)) => s == v,
            (Scalar::Member(m), Value::Enum(e)) => {
                e.enum_name == m.enum_name && e.member == m.member
            }
            (Scalar::Member(m), _) => m.value.matches_value(value),
            _ => false,
        }
    }

    /// Whether a query-string value spells this scalar.
    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            Scalar::Int(i) => text.parse::<i64>().ok() == Some(*i),
            Scalar::Str(s) => s == text,
            Scalar::Member(m) => m.value.matches_text(text),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Str(s) => write!(f, "'{s}'"),
            Scalar::Member(m) => write!(f, "{}.{}", m.enum_name, m.member),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

/// A named enumeration with ordered members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: Scalar,
}

impl EnumDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.members.push(EnumMember {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn build(self) -> Arc<EnumDef> {
        Arc::new(self)
    }

    pub fn by_name(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// A member as a literal scalar, e.g. for `Literal[Kind.CARD]`.
    pub fn literal(&self, member: &str) -> Option<Scalar> {
        self.by_name(member).map(|m| {
            Scalar::Member(MemberLiteral {
                enum_name: self.name.clone(),
                member: m.name.clone(),
                value: Box::new(m.value.clone()),
            })
        })
    }
}

/// Declaration style of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStyle {
    /// Nominal class-like record: optional fields are those with defaults
    Entity,
    /// Structural key/optional-key record
    TypedDict {
        /// Whether keys are required unless marked `NotRequired`
        total: bool,
    },
}

/// Produces a fresh default value for each load.
#[derive(Clone)]
pub struct DefaultFactory(Arc<dyn Fn() -> Value + Send + Sync>);

impl DefaultFactory {
    pub fn new(factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(factory))
    }

    pub fn produce(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultFactory(..)")
    }
}

/// Default of a record field.
#[derive(Debug, Clone, Default)]
pub enum FieldDefault {
    /// No default: the field is required
    #[default]
    Missing,
    Value(Value),
    Factory(DefaultFactory),
}

impl FieldDefault {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldDefault::Missing)
    }

    /// Materialize the default, if any.
    pub fn produce(&self) -> Option<Value> {
        match self {
            FieldDefault::Missing => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Factory(f) => Some(f.produce()),
        }
    }
}

/// A declared record field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub default: FieldDefault,
    pub doc: Option<String>,
}

/// A record declaration.
#[derive(Debug, Clone)]
pub struct RecordDef {
    /// Qualified source name, e.g. `shop.Order`
    pub name: String,
    pub doc: Option<String>,
    pub style: RecordStyle,
    /// Generic parameter names, in order
    pub params: Vec<String>,
    pub fields: Vec<FieldDecl>,
}

impl RecordDef {
    /// Start a nominal record declaration.
    pub fn entity(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder::new(name, RecordStyle::Entity)
    }

    /// Start a structural record declaration.
    pub fn typed_dict(name: impl Into<String>, total: bool) -> RecordBuilder {
        RecordBuilder::new(name, RecordStyle::TypedDict { total })
    }

    pub fn is_generic(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn field_decl(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builder for [`RecordDef`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    def: RecordDef,
}

impl RecordBuilder {
    fn new(name: impl Into<String>, style: RecordStyle) -> Self {
        Self {
            def: RecordDef {
                name: name.into(),
                doc: None,
                style,
                params: Vec::new(),
                fields: Vec::new(),
            },
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.def.doc = Some(doc.into());
        self
    }

    /// Declare a generic parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.def.params.push(name.into());
        self
    }

    /// Add a field without a default.
    pub fn field(self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.field_full(name, ty, FieldDefault::Missing, None)
    }

    /// Add a field with a default value.
    pub fn field_default(
        self,
        name: impl Into<String>,
        ty: TypeExpr,
        default: impl Into<Value>,
    ) -> Self {
        self.field_full(name, ty, FieldDefault::Value(default.into()), None)
    }

    /// Add a field whose default is produced on demand.
    pub fn field_factory(
        self,
        name: impl Into<String>,
        ty: TypeExpr,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.field_full(
            name,
            ty,
            FieldDefault::Factory(DefaultFactory::new(factory)),
            None,
        )
    }

    /// Add a documented field without a default.
    pub fn field_doc(self, name: impl Into<String>, ty: TypeExpr, doc: impl Into<String>) -> Self {
        self.field_full(name, ty, FieldDefault::Missing, Some(doc.into()))
    }

    pub fn field_full(
        mut self,
        name: impl Into<String>,
        ty: TypeExpr,
        default: FieldDefault,
        doc: Option<String>,
    ) -> Self {
        self.def.fields.push(FieldDecl {
            name: name.into(),
            ty,
            default,
            doc,
        });
        self
    }

    pub fn build(self) -> Arc<RecordDef> {
        Arc::new(self.def)
    }
}

/// A structural type description.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    // ==========================================================================
    // Primitives
    // ==========================================================================
    Int,
    Float,
    Decimal,
    Str,
    Bool,
    Bytes,
    Uuid,
    Date,
    Time,
    DateTime,
    /// Unconstrained
    Any,
    /// The `None` type, only meaningful inside unions
    None,
    /// Uninhabited type
    Never,

    // ==========================================================================
    // Value sets
    // ==========================================================================
    Literal(Vec<Scalar>),
    Enum(Arc<EnumDef>),

    // ==========================================================================
    // Containers
    // ==========================================================================
    List(Box<TypeExpr>),
    Dict(Box<TypeExpr>, Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    /// Homogeneous tuple of any length; rejected by the resolver
    VarTuple(Box<TypeExpr>),
    Union(Vec<TypeExpr>),

    // ==========================================================================
    // Wrappers
    // ==========================================================================
    Annotated(Box<TypeExpr>, Vec<Annotation>),
    /// Structural-record key marker
    Required(Box<TypeExpr>),
    /// Structural-record key marker
    NotRequired(Box<TypeExpr>),
    /// Distinct name over an existing type
    NewType(String, Box<TypeExpr>),

    // ==========================================================================
    // Records and references
    // ==========================================================================
    Record(Arc<RecordDef>),
    /// Generic record applied to arguments
    Generic(Arc<RecordDef>, Vec<TypeExpr>),
    /// Generic parameter placeholder
    Param(String),
    /// Deferred reference resolved through the registry
    Forward(String),
    /// A type nothing knows how to handle unless a custom resolver claims it
    Opaque(String),
}

impl TypeExpr {
    pub fn list(item: TypeExpr) -> Self {
        TypeExpr::List(Box::new(item))
    }

    pub fn dict(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Dict(Box::new(key), Box::new(value))
    }

    pub fn tuple(items: Vec<TypeExpr>) -> Self {
        TypeExpr::Tuple(items)
    }

    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Union(vec![inner, TypeExpr::None])
    }

    pub fn union(items: Vec<TypeExpr>) -> Self {
        TypeExpr::Union(items)
    }

    pub fn literal<S: Into<Scalar>>(values: impl IntoIterator<Item = S>) -> Self {
        TypeExpr::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn annotated(inner: TypeExpr, annotations: Vec<Annotation>) -> Self {
        TypeExpr::Annotated(Box::new(inner), annotations)
    }

    pub fn record(def: &Arc<RecordDef>) -> Self {
        TypeExpr::Record(Arc::clone(def))
    }

    pub fn generic(def: &Arc<RecordDef>, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Generic(Arc::clone(def), args)
    }

    pub fn enumeration(def: &Arc<EnumDef>) -> Self {
        TypeExpr::Enum(Arc::clone(def))
    }

    pub fn param(name: impl Into<String>) -> Self {
        TypeExpr::Param(name.into())
    }

    pub fn forward(name: impl Into<String>) -> Self {
        TypeExpr::Forward(name.into())
    }

    pub fn new_type(name: impl Into<String>, inner: TypeExpr) -> Self {
        TypeExpr::NewType(name.into(), Box::new(inner))
    }

    /// Replace generic parameters with their bound arguments.
    ///
    /// Unbound parameters are left in place so that resolution can report them.
    pub fn substitute(&self, bindings: &HashMap<String, TypeExpr>) -> TypeExpr {
        if bindings.is_empty() {
            return self.clone();
        }
        let sub = |t: &TypeExpr| t.substitute(bindings);
        match self {
            TypeExpr::Param(name) => bindings
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeExpr::List(item) => TypeExpr::List(Box::new(sub(item))),
            TypeExpr::Dict(k, v) => TypeExpr::Dict(Box::new(sub(k)), Box::new(sub(v))),
            TypeExpr::Tuple(items) => TypeExpr::Tuple(items.iter().map(sub).collect()),
            TypeExpr::VarTuple(item) => TypeExpr::VarTuple(Box::new(sub(item))),
            TypeExpr::Union(items) => TypeExpr::Union(items.iter().map(sub).collect()),
            TypeExpr::Annotated(inner, anns) => {
                TypeExpr::Annotated(Box::new(sub(inner)), anns.clone())
            }
            TypeExpr::Required(inner) => TypeExpr::Required(Box::new(sub(inner))),
            TypeExpr::NotRequired(inner) => TypeExpr::NotRequired(Box::new(sub(inner))),
            TypeExpr::NewType(name, inner) => TypeExpr::NewType(name.clone(), Box::new(sub(inner))),
            TypeExpr::Generic(def, args) => {
                TypeExpr::Generic(Arc::clone(def), args.iter().map(sub).collect())
            }
            other => other.clone(),
        }
    }
}

fn join(items: &[TypeExpr], sep: &str) -> String {
    items
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Int => f.write_str("int"),
            TypeExpr::Float => f.write_str("float"),
            TypeExpr::Decimal => f.write_str("Decimal"),
            TypeExpr::Str => f.write_str("str"),
            TypeExpr::Bool => f.write_str("bool"),
            TypeExpr::Bytes => f.write_str("bytes"),
            TypeExpr::Uuid => f.write_str("UUID"),
            TypeExpr::Date => f.write_str("date"),
            TypeExpr::Time => f.write_str("time"),
            TypeExpr::DateTime => f.write_str("datetime"),
            TypeExpr::Any => f.write_str("Any"),
            TypeExpr::None => f.write_str("None"),
            TypeExpr::Never => f.write_str("Never"),
            TypeExpr::Literal(values) => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "Literal[{}]", rendered.join(", "))
            }
            TypeExpr::Enum(def) => f.write_str(&def.name),
            TypeExpr::List(item) => write!(f, "list[{item}]"),
            TypeExpr::Dict(k, v) => write!(f, "dict[{k}, {v}]"),
            TypeExpr::Tuple(items) => write!(f, "tuple[{}]", join(items, ", ")),
            TypeExpr::VarTuple(item) => write!(f, "tuple[{item}, ...]"),
            TypeExpr::Union(items) => f.write_str(&join(items, " | ")),
            TypeExpr::Annotated(inner, anns) => {
                let rendered: Vec<String> = anns.iter().map(|a| a.to_string()).collect();
                write!(f, "Annotated[{inner}, {}]", rendered.join(", "))
            }
            TypeExpr::Required(inner) => write!(f, "Required[{inner}]"),
            TypeExpr::NotRequired(inner) => write!(f, "NotRequired[{inner}]"),
            TypeExpr::NewType(name, _) => f.write_str(name),
            TypeExpr::Record(def) => f.write_str(&def.name),
            TypeExpr::Generic(def, args) => write!(f, "{}[{}]", def.name, join(args, ", ")),
            TypeExpr::Param(name) => f.write_str(name),
            TypeExpr::Forward(name) => write!(f, "'{name}'"),
            TypeExpr::Opaque(name) => f.write_str(name),
        }
    }
}

/// Global name table for deferred references.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeExpr>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, ty: TypeExpr) {
        self.types.insert(name.into(), ty);
    }

    /// Register a record under its own name.
    pub fn register_record(&mut self, def: &Arc<RecordDef>) {
        self.types
            .insert(def.name.clone(), TypeExpr::Record(Arc::clone(def)));
    }

    /// Register an enum under its own name.
    pub fn register_enum(&mut self, def: &Arc<EnumDef>) {
        self.types
            .insert(def.name.clone(), TypeExpr::Enum(Arc::clone(def)));
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeExpr> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
