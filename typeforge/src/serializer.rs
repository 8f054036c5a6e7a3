//! Serializer facade.
//!
//! A [`Serializer`] is built once per type and configuration. Construction
//! resolves the type, compiles its JSON Schema, builds the validator and the
//! codec; afterwards the serializer is immutable, `Send + Sync`, and every
//! operation takes `&self`.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use typeforge::expr::{RecordDef, TypeExpr};
//! use typeforge::value::{RecordValue, Value};
//! use typeforge::{Serializer, SerializerConfig};
//!
//! let user = RecordDef::entity("app.User")
//!     .field("user_id", TypeExpr::Int)
//!     .field("nick_name", TypeExpr::Str)
//!     .build();
//!
//! let serializer = Serializer::new(
//!     &TypeExpr::record(&user),
//!     SerializerConfig::new().with_camel_case(),
//! )
//! .unwrap();
//!
//! let value: Value = RecordValue::new("app.User")
//!     .with("user_id", 7i64)
//!     .with("nick_name", "neo")
//!     .into();
//! let data = serializer.dump(&value).unwrap();
//! assert_eq!(data, json!({"userId": 7, "nickName": "neo"}));
//! assert_eq!(serializer.load(&data, true).unwrap(), value);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::annotations::{Annotation, Annotations, NoneFormat, OptionalDefault};
use crate::codec::{Codec, CodecEngine, JsonCodecEngine, QueryParams};
use crate::custom::CustomTypeResolver;
use crate::error::{Result, ValidationError};
use crate::expr::{TypeExpr, TypeRegistry};
use crate::ir::TypeGraph;
use crate::naming::NamingConvention;
use crate::resolver::TypeResolver;
use crate::schema::SchemaCompiler;
use crate::validator::{SchemaValidator, Validator};
use crate::value::Value;

/// Serializer construction options.
///
/// # Fields
///
/// * `naming_convention` - How source field names become wire keys.
///   Default: `NoFormat`.
///
/// * `omit_none` - Drop `None` values from dumped records and dictionaries.
///   Default: false.
///
/// * `force_default_for_optional` - `Optional` fields without a default get a
///   `None` default and stop being required. Default: false.
///
/// * `custom_type_resolver` - Hook that may claim any type expression before
///   the built-in rules. Default: none.
///
/// * `registry` - Names available to forward references. Default: empty.
#[derive(Clone, Default)]
pub struct SerializerConfig {
    pub naming_convention: NamingConvention,
    pub omit_none: bool,
    pub force_default_for_optional: bool,
    pub custom_type_resolver: Option<CustomTypeResolver>,
    pub registry: Arc<TypeRegistry>,
}

impl SerializerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the naming convention.
    ///
    /// # Example
    /// ```rust
    /// use typeforge::{NamingConvention, SerializerConfig};
    ///
    /// let config = SerializerConfig::new().with_naming_convention(NamingConvention::CamelCase);
    /// assert_eq!(config.naming_convention, NamingConvention::CamelCase);
    /// ```
    #[must_use = "This method returns a new SerializerConfig and does not modify self"]
    pub fn with_naming_convention(mut self, convention: NamingConvention) -> Self {
        self.naming_convention = convention;
        self
    }

    /// Shorthand for camelCase wire keys.
    ///
    /// # Example
    /// ```rust
    /// use typeforge::{NamingConvention, SerializerConfig};
    ///
    /// let config = SerializerConfig::new().with_camel_case();
    /// assert_eq!(config.naming_convention, NamingConvention::CamelCase);
    /// ```
    #[must_use = "This method returns a new SerializerConfig and does not modify self"]
    pub fn with_camel_case(self) -> Self {
        self.with_naming_convention(NamingConvention::CamelCase)
    }

    /// Drop `None` values when dumping.
    ///
    /// # Example
    /// ```rust
    /// use typeforge::SerializerConfig;
    ///
    /// let config = SerializerConfig::new().with_omit_none(true);
    /// assert!(config.omit_none);
    /// ```
    #[must_use = "This method returns a new SerializerConfig and does not modify self"]
    pub fn with_omit_none(mut self, omit: bool) -> Self {
        self.omit_none = omit;
        self
    }

    /// Give `Optional` fields an implicit `None` default.
    ///
    /// # Example
    /// ```rust
    /// use typeforge::SerializerConfig;
    ///
    /// let config = SerializerConfig::new().with_force_default_for_optional(true);
    /// assert!(config.force_default_for_optional);
    /// ```
    #[must_use = "This method returns a new SerializerConfig and does not modify self"]
    pub fn with_force_default_for_optional(mut self, force: bool) -> Self {
        self.force_default_for_optional = force;
        self
    }

    /// Install a custom type hook.
    ///
    /// # Example
    /// ```rust
    /// use std::sync::Arc;
    /// use typeforge::custom::CustomTypeResolver;
    /// use typeforge::SerializerConfig;
    ///
    /// let hook: CustomTypeResolver = Arc::new(|_| None);
    /// let config = SerializerConfig::new().with_custom_type_resolver(hook);
    /// assert!(config.custom_type_resolver.is_some());
    /// ```
    #[must_use = "This method returns a new SerializerConfig and does not modify self"]
    pub fn with_custom_type_resolver(mut self, resolver: CustomTypeResolver) -> Self {
        self.custom_type_resolver = Some(resolver);
        self
    }

    /// Set the names available to forward references.
    ///
    /// # Example
    /// ```rust
    /// use typeforge::expr::{TypeExpr, TypeRegistry};
    /// use typeforge::SerializerConfig;
    ///
    /// let mut registry = TypeRegistry::new();
    /// registry.register("app.Id", TypeExpr::Int);
    /// let config = SerializerConfig::new().with_registry(registry);
    /// assert_eq!(config.registry.len(), 1);
    /// ```
    #[must_use = "This method returns a new SerializerConfig and does not modify self"]
    pub fn with_registry(mut self, registry: impl Into<Arc<TypeRegistry>>) -> Self {
        self.registry = registry.into();
        self
    }

    /// The options every resolution starts from.
    pub fn root_annotations(&self) -> Annotations {
        Annotations::new()
            .with(Annotation::NamingConvention(self.naming_convention))
            .with(Annotation::NoneFormat(if self.omit_none {
                NoneFormat::OmitNones
            } else {
                NoneFormat::KeepNones
            }))
            .with(Annotation::OptionalDefault(
                if self.force_default_for_optional {
                    OptionalDefault::ForceNone
                } else {
                    OptionalDefault::KeepDefault
                },
            ))
    }
}

impl fmt::Debug for SerializerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerConfig")
            .field("naming_convention", &self.naming_convention)
            .field("omit_none", &self.omit_none)
            .field("force_default_for_optional", &self.force_default_for_optional)
            .field(
                "custom_type_resolver",
                &self.custom_type_resolver.as_ref().map(|_| ".."),
            )
            .field("registry", &self.registry.len())
            .finish()
    }
}

/// Dumps, loads and describes values of one type.
pub struct Serializer {
    graph: Arc<TypeGraph>,
    schema: JsonValue,
    validator: Box<dyn Validator>,
    codec: Box<dyn Codec>,
}

impl Serializer {
    /// Build a serializer with the built-in codec engine.
    ///
    /// Fails with a [`DefinitionError`](crate::error::DefinitionError) when the
    /// type cannot be resolved.
    pub fn new(expr: &TypeExpr, config: SerializerConfig) -> Result<Self> {
        Self::with_engine(expr, config, &JsonCodecEngine)
    }

    /// Build a serializer with a specific codec engine.
    pub fn with_engine(
        expr: &TypeExpr,
        config: SerializerConfig,
        engine: &dyn CodecEngine,
    ) -> Result<Self> {
        let graph = TypeResolver::new(Arc::clone(&config.registry))
            .with_custom_type_resolver(config.custom_type_resolver.clone())
            .resolve_root(expr, &config.root_annotations())?;
        let graph = Arc::new(graph);
        let schema = SchemaCompiler::compile(&graph).into_value();
        let validator = Box::new(SchemaValidator::new(&schema)?);
        let codec = engine.compile(Arc::clone(&graph))?;
        debug!(root = %expr, records = graph.record_count(), "Serializer ready");
        Ok(Self {
            graph,
            schema,
            validator,
            codec,
        })
    }

    /// Replace the validator used by `load` and `load_json`.
    #[must_use = "This method returns a new Serializer and does not modify self"]
    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Native value to wire JSON.
    pub fn dump(&self, value: &Value) -> std::result::Result<JsonValue, ValidationError> {
        self.codec.dump(value)
    }

    /// Wire JSON to native value.
    ///
    /// With `validate`, the data is checked against the schema first and every
    /// violation is reported; otherwise only the first mismatch is.
    pub fn load(
        &self,
        data: &JsonValue,
        validate: bool,
    ) -> std::result::Result<Value, ValidationError> {
        if validate {
            self.validator.check(data)?;
        }
        self.codec.load(data)
    }

    /// Parse a JSON string and load it.
    pub fn load_json(&self, text: &str, validate: bool) -> Result<Value> {
        let data: JsonValue = serde_json::from_str(text).map_err(|err| {
            ValidationError::single(format!("Error while parsing JSON string: {err}"), "")
        })?;
        Ok(self.load(&data, validate)?)
    }

    /// Load from query parameters.
    pub fn load_query_params(&self, params: &QueryParams) -> Result<Value> {
        self.codec.load_query(params)
    }

    /// The compiled JSON Schema document.
    pub fn get_json_schema(&self) -> JsonValue {
        self.schema.clone()
    }

    pub fn type_graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Validate wire data without loading it.
    pub fn validate(&self, data: &JsonValue) -> std::result::Result<(), ValidationError> {
        self.validator.check(data)
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("root", &self.graph.root().kind.type_name())
            .field("records", &self.graph.record_count())
            .finish_non_exhaustive()
    }
}
