//! Type IR definitions.
//!
//! This module defines the node structures that the resolver produces and
//! that the schema compiler and codec consume. Nodes are immutable and
//! shared through [`Node`] (`Arc<TypeNode>`).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::annotations::Bound;
use crate::custom::CustomEncoder;
use crate::expr::{EnumDef, Scalar};

use super::key::ResolutionKey;
use super::record::RecordType;

/// Shared handle to a resolved node.
pub type Node = Arc<TypeNode>;

/// Type intermediate representation.
#[derive(Debug, Clone)]
pub struct TypeNode {
    /// The kind of type
    pub kind: TypeKind,

    /// Dump/load override for this node
    pub custom_encoder: Option<CustomEncoder>,
}

impl TypeNode {
    /// Create a new node with the given kind.
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            custom_encoder: None,
        }
    }

    /// Attach a custom encoder.
    pub fn with_custom_encoder(mut self, encoder: Option<CustomEncoder>) -> Self {
        self.custom_encoder = encoder;
        self
    }

    pub fn into_node(self) -> Node {
        Arc::new(self)
    }

    /// Record payload for entity and typed-dict nodes.
    pub fn as_record(&self) -> Option<&Arc<RecordType>> {
        match &self.kind {
            TypeKind::Entity(record) | TypeKind::TypedDict(record) => Some(record),
            _ => None,
        }
    }
}

/// Optional lower/upper numeric bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericBounds {
    pub min: Option<Bound>,
    pub max: Option<Bound>,
}

/// Optional length bounds for strings and arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthBounds {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

/// Tagged union of records dispatched by one literal field.
#[derive(Debug, Clone)]
pub struct DiscriminatedUnion {
    /// Discriminator value -> record node, in declaration order
    pub items: IndexMap<String, Node>,
    /// Declared literal of each alternative, aligned with `items`
    pub tags: Vec<Scalar>,
    /// Source field name used when dumping
    pub dump_discriminator: String,
    /// Wire key read when loading
    pub load_discriminator: String,
}

/// Forward handle to a record that was still being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursionHolder {
    /// Generated name of the target record
    pub name: String,
    pub key: ResolutionKey,
}

/// Node kind enumeration.
#[derive(Debug, Clone)]
pub enum TypeKind {
    // ==========================================================================
    // Primitives
    // ==========================================================================
    Integer(NumericBounds),
    Float(NumericBounds),
    Decimal(NumericBounds),
    String(LengthBounds),
    Boolean,
    Bytes,
    Uuid,
    Date,
    Time,
    DateTime,

    // ==========================================================================
    // Value sets
    // ==========================================================================
    Literal(Vec<Scalar>),
    Enum(Arc<EnumDef>),

    // ==========================================================================
    // Compound Types
    // ==========================================================================
    Optional(Node),
    Array {
        item: Node,
        bounds: LengthBounds,
    },
    Dictionary {
        key: Node,
        value: Node,
        omit_none: bool,
    },
    Tuple(Vec<Node>),

    // ==========================================================================
    // Records and unions
    // ==========================================================================
    Entity(Arc<RecordType>),
    TypedDict(Arc<RecordType>),
    Union(Vec<Node>),
    DiscriminatedUnion(DiscriminatedUnion),

    // ==========================================================================
    // Special Types
    // ==========================================================================
    /// Accepts any value
    Any,
    /// Accepts nothing
    Never,
    /// Externally supplied codec with its schema fragment
    Custom { schema: JsonValue },
    RecursionHolder(RecursionHolder),
}

impl TypeKind {
    /// Stable kind name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            TypeKind::Integer(_) => "IntegerType",
            TypeKind::Float(_) => "FloatType",
            TypeKind::Decimal(_) => "DecimalType",
            TypeKind::String(_) => "StringType",
            TypeKind::Boolean => "BooleanType",
            TypeKind::Bytes => "BytesType",
            TypeKind::Uuid => "UUIDType",
            TypeKind::Date => "DateType",
            TypeKind::Time => "TimeType",
            TypeKind::DateTime => "DateTimeType",
            TypeKind::Literal(_) => "LiteralType",
            TypeKind::Enum(_) => "EnumType",
            TypeKind::Optional(_) => "OptionalType",
            TypeKind::Array { .. } => "ArrayType",
            TypeKind::Dictionary { .. } => "DictionaryType",
            TypeKind::Tuple(_) => "TupleType",
            TypeKind::Entity(_) => "EntityType",
            TypeKind::TypedDict(_) => "TypedDictType",
            TypeKind::Union(_) => "UnionType",
            TypeKind::DiscriminatedUnion(_) => "DiscriminatedUnionType",
            TypeKind::Any => "AnyType",
            TypeKind::Never => "NeverType",
            TypeKind::Custom { .. } => "CustomType",
            TypeKind::RecursionHolder(_) => "RecursionHolder",
        }
    }

    /// Whether the node is a leaf that parses from a single string.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeKind::Integer(_)
                | TypeKind::Float(_)
                | TypeKind::Decimal(_)
                | TypeKind::String(_)
                | TypeKind::Boolean
                | TypeKind::Bytes
                | TypeKind::Uuid
                | TypeKind::Date
                | TypeKind::Time
                | TypeKind::DateTime
                | TypeKind::Literal(_)
                | TypeKind::Enum(_)
                | TypeKind::Any
                | TypeKind::Custom { .. }
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
