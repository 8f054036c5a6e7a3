//! Custom codecs.
//!
//! A [`CustomEncoder`] overrides how one node is dumped and/or loaded.
//! A [`CustomType`] supplies a whole type: both transforms plus the JSON
//! Schema fragment that describes its wire form. Custom types are plugged
//! in through a [`CustomTypeResolver`] hook that sees every type expression
//! before the built-in rules do.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::expr::TypeExpr;
use crate::value::Value;

/// Native value to wire value.
pub type SerializeFn = Arc<dyn Fn(&Value) -> Result<JsonValue, String> + Send + Sync>;

/// Wire value to native value.
pub type DeserializeFn = Arc<dyn Fn(&JsonValue) -> Result<Value, String> + Send + Sync>;

/// Hook consulted for every type expression during resolution.
pub type CustomTypeResolver =
    Arc<dyn Fn(&TypeExpr) -> Option<Arc<dyn CustomType>> + Send + Sync>;

/// Optional per-node dump/load overrides.
#[derive(Clone, Default)]
pub struct CustomEncoder {
    pub serialize: Option<SerializeFn>,
    pub deserialize: Option<DeserializeFn>,
}

impl CustomEncoder {
    pub fn new<S, D>(serialize: S, deserialize: D) -> Self
    where
        S: Fn(&Value) -> Result<JsonValue, String> + Send + Sync + 'static,
        D: Fn(&JsonValue) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            serialize: Some(Arc::new(serialize)),
            deserialize: Some(Arc::new(deserialize)),
        }
    }

    /// Override only the dump direction.
    pub fn serialize_with<S>(serialize: S) -> Self
    where
        S: Fn(&Value) -> Result<JsonValue, String> + Send + Sync + 'static,
    {
        Self {
            serialize: Some(Arc::new(serialize)),
            deserialize: None,
        }
    }

    /// Override only the load direction.
    pub fn deserialize_with<D>(deserialize: D) -> Self
    where
        D: Fn(&JsonValue) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            serialize: None,
            deserialize: Some(Arc::new(deserialize)),
        }
    }

    /// Wrap a [`CustomType`] as an encoder.
    pub fn from_custom_type(custom: Arc<dyn CustomType>) -> Self {
        let ser = Arc::clone(&custom);
        let de = custom;
        Self {
            serialize: Some(Arc::new(move |value: &Value| ser.serialize(value))),
            deserialize: Some(Arc::new(move |data: &JsonValue| de.deserialize(data))),
        }
    }
}

impl fmt::Debug for CustomEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEncoder")
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .finish()
    }
}

impl fmt::Display for CustomEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CustomEncoder(serialize={}, deserialize={})",
            self.serialize.is_some(),
            self.deserialize.is_some()
        )
    }
}

/// A user-supplied type with its own codec and schema.
pub trait CustomType: Send + Sync {
    fn serialize(&self, value: &Value) -> Result<JsonValue, String>;

    fn deserialize(&self, data: &JsonValue) -> Result<Value, String>;

    /// Schema fragment for the wire form.
    fn json_schema(&self) -> JsonValue;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct IpAddress;

    impl CustomType for IpAddress {
        fn serialize(&self, value: &Value) -> Result<JsonValue, String> {
            match value {
                Value::Str(s) => Ok(json!(s)),
                other => Err(format!("expected an address, got {other}")),
            }
        }

        fn deserialize(&self, data: &JsonValue) -> Result<Value, String> {
            match data.as_str() {
                Some(s) if s.split('.').count() == 4 => Ok(Value::Str(s.to_string())),
                Some(s) => Err(format!("Expected 4 octets in '{s}'")),
                None => Err("expected a string".to_string()),
            }
        }

        fn json_schema(&self) -> JsonValue {
            json!({"type": "string", "format": "ipv4"})
        }
    }

    #[test]
    fn test_from_custom_type_wraps_both_directions() {
        let encoder = CustomEncoder::from_custom_type(Arc::new(IpAddress));
        let ser = encoder.serialize.as_ref().unwrap();
        let de = encoder.deserialize.as_ref().unwrap();

        assert_eq!(ser(&Value::from("10.0.0.1")).unwrap(), json!("10.0.0.1"));
        assert_eq!(
            de(&json!("invalid")).unwrap_err(),
            "Expected 4 octets in 'invalid'"
        );
    }

    #[test]
    fn test_one_sided_encoders() {
        let encoder = CustomEncoder::serialize_with(|_| Ok(json!(1)));
        assert!(encoder.serialize.is_some());
        assert!(encoder.deserialize.is_none());
        assert_eq!(
            encoder.to_string(),
            "CustomEncoder(serialize=true, deserialize=false)"
        );
    }
}
