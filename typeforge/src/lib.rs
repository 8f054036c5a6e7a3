//! # typeforge
//!
//! Type resolution, JSON Schema compilation and value codecs driven by
//! structural type descriptions.
//!
//! A type is described as a [`TypeExpr`] tree: scalars, containers, records
//! with field metadata, enums, literals, unions, generics and forward
//! references. A [`Serializer`] resolves that description once into a
//! [`TypeGraph`](ir::TypeGraph), compiles a JSON Schema document from the
//! graph, and then dumps and loads values of the type.
//!
//! ## Overview
//!
//! ```text
//! TypeExpr ──► resolver ──► TypeGraph ──┬──► schema compiler ──► JSON Schema ──► validator
//!                                       └──► codec (dump / load / load_query_params)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use typeforge::{
//!     Annotation, RecordDef, RecordValue, Serializer, SerializerConfig, TypeExpr, Value,
//! };
//!
//! let point = RecordDef::entity("geo.Point")
//!     .field("x", TypeExpr::annotated(TypeExpr::Int, vec![Annotation::min(0)]))
//!     .field("y", TypeExpr::Int)
//!     .field_default("label", TypeExpr::optional(TypeExpr::Str), Value::None)
//!     .build();
//!
//! let serializer =
//!     Serializer::new(&TypeExpr::record(&point), SerializerConfig::new()).unwrap();
//!
//! let value: Value = RecordValue::new("geo.Point").with("x", 1i64).with("y", 2i64).into();
//! let data = serializer.dump(&value).unwrap();
//! assert_eq!(data, json!({"x": 1, "y": 2, "label": null}));
//!
//! let err = serializer.load(&json!({"x": -1, "y": 2}), true).unwrap_err();
//! assert_eq!(err.errors[0].message, "-1 is less than the minimum of 0");
//! assert_eq!(err.errors[0].instance_path, "x");
//! ```
//!
//! ## Annotations
//!
//! | Annotation | Effect | Inherited by nested records |
//! |------------|--------|-----------------------------|
//! | `NamingConvention` | Wire key casing for record fields | yes |
//! | `NoneFormat` | Keep or omit `None` when dumping | yes |
//! | `OptionalDefault` | Implicit `None` default for optional fields | yes |
//! | `Min` / `Max` | Numeric bounds | no |
//! | `MinLength` / `MaxLength` | String length and list size bounds | no |
//! | `Alias` | Wire key override for one field | no |
//! | `Discriminator` | Tag field for a union of records | no |
//! | `Flatten` | Splice a nested record or dict into the owner | no |
//! | `CustomEncoder` | Replace dump and/or load for one node | no |
//!
//! ## Type Mappings
//!
//! | Type | JSON Schema | Wire form |
//! |------|-------------|-----------|
//! | `int` | `{"type": "integer", "format": "int64"}` | number |
//! | `float` | `{"type": "number"}` | number |
//! | `Decimal` | `oneOf` decimal string / decimal number | string |
//! | `str` | `{"type": "string"}` | string |
//! | `bool` | `{"type": "boolean"}` | boolean |
//! | `bytes` | `{"type": "string", "format": "binary"}` | base64 string |
//! | `UUID` | `{"type": "string", "format": "uuid"}` | string |
//! | `date` / `time` / `datetime` | `{"type": "string", "format": ...}` | ISO 8601 string |
//! | `list[T]` | `{"type": "array", "items": T}` | array |
//! | `tuple[A, B]` | `{"type": "array", "prefixItems": [A, B]}` | array |
//! | `dict[str, V]` | `{"type": "object", "additionalProperties": V}` | object |
//! | `T \| None` | `{"anyOf": [{"type": "null"}, T]}` | value or null |
//! | record | `{"$ref": "#/components/schemas/..."}` | object |
//!
//! ## Modules
//!
//! - [`expr`] - Type descriptions and the forward-reference registry
//! - [`annotations`] - Per-type options and their inheritance rules
//! - [`resolver`] - Type description to IR, with memoization and recursion
//! - [`ir`] - The resolved type graph
//! - [`schema`] - JSON Schema compilation
//! - [`validator`] - Schema validation and string formats
//! - [`codec`] - Value encoding and decoding
//! - [`serializer`] - The facade tying it all together
//! - [`error`] - Definition and validation errors

pub mod annotations;
pub mod codec;
pub mod custom;
pub mod error;
pub mod expr;
pub mod ir;
pub mod naming;
pub mod resolver;
pub mod schema;
pub mod serializer;
pub mod validator;
pub mod value;

// Re-export main types for convenience
pub use annotations::{Annotation, AnnotationKind, Annotations, Bound, NoneFormat, OptionalDefault};
pub use codec::{Codec, CodecEngine, JsonCodecEngine, QueryParams};
pub use custom::{CustomEncoder, CustomType, CustomTypeResolver};
pub use error::{DefinitionError, Error, ErrorItem, Result, ValidationError};
pub use expr::{EnumDef, FieldDefault, RecordDef, TypeExpr, TypeRegistry};
pub use naming::NamingConvention;
pub use schema::{SchemaCompiler, SchemaDocument};
pub use serializer::{Serializer, SerializerConfig};
pub use validator::{SchemaValidator, Validator};
pub use value::{EnumValue, RecordValue, Value};
