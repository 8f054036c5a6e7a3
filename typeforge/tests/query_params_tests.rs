//! Loading values from query parameters.

use serde_json::json;
use typeforge::{
    Annotation, DefinitionError, EnumDef, EnumValue, Error, QueryParams, RecordDef, RecordValue,
    Serializer, SerializerConfig, TypeExpr, Value,
};

fn query(pairs: &[(&str, &str)]) -> QueryParams {
    let mut params = QueryParams::new();
    for (key, value) in pairs {
        params
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    params
}

fn search() -> Serializer {
    let order = EnumDef::new("api.Order")
        .member("ASC", "asc")
        .member("DESC", "desc")
        .build();
    let def = RecordDef::entity("api.Search")
        .field("search_text", TypeExpr::Str)
        .field_default(
            "page",
            TypeExpr::annotated(TypeExpr::Int, vec![Annotation::min(1)]),
            1i64,
        )
        .field("exact", TypeExpr::optional(TypeExpr::Bool))
        .field_default("tags", TypeExpr::list(TypeExpr::Str), Value::List(vec![]))
        .field_default("order", TypeExpr::enumeration(&order), EnumValue::new("api.Order", "ASC"))
        .field("since", TypeExpr::optional(TypeExpr::Date))
        .build();
    Serializer::new(&TypeExpr::record(&def), SerializerConfig::new().with_camel_case()).unwrap()
}

#[test]
fn test_query_params_with_defaults() {
    let loaded = search()
        .load_query_params(&query(&[("searchText", "rust")]))
        .unwrap();
    assert_eq!(
        loaded,
        Value::Record(
            RecordValue::new("api.Search")
                .with("search_text", "rust")
                .with("page", 1i64)
                .with("exact", Value::None)
                .with("tags", Value::List(vec![]))
                .with("order", EnumValue::new("api.Order", "ASC"))
                .with("since", Value::None)
        )
    );
}

#[test]
fn test_query_params_parse_every_leaf() {
    let loaded = search()
        .load_query_params(&query(&[
            ("searchText", "rust"),
            ("page", "3"),
            ("exact", "False"),
            ("tags", "a"),
            ("tags", "b"),
            ("order", "desc"),
            ("since", "2024-01-31"),
        ]))
        .unwrap();
    assert_eq!(loaded.field("page"), Some(&Value::Int(3)));
    assert_eq!(loaded.field("exact"), Some(&Value::Bool(false)));
    assert_eq!(loaded.field("tags"), Some(&Value::list(["a", "b"])));
    assert_eq!(
        loaded.field("order"),
        Some(&Value::Enum(EnumValue::new("api.Order", "DESC")))
    );
    assert!(matches!(loaded.field("since"), Some(Value::Date(_))));
}

#[test]
fn test_query_params_errors() {
    let s = search();

    let err = s.load_query_params(&query(&[])).unwrap_err();
    assert_eq!(err.errors()[0].message, "\"searchText\" is a required property");

    let err = s
        .load_query_params(&query(&[("searchText", "x"), ("page", "0")]))
        .unwrap_err();
    assert_eq!(err.errors()[0].message, "0 is less than the minimum of 1");
    assert_eq!(err.errors()[0].instance_path, "page");

    let err = s
        .load_query_params(&query(&[("searchText", "x"), ("exact", "maybe")]))
        .unwrap_err();
    assert_eq!(err.errors()[0].message, "\"maybe\" is not of type \"boolean\"");
}

#[test]
fn test_query_params_enforce_length_bounds() {
    let def = RecordDef::entity("api.Lookup")
        .field(
            "name",
            TypeExpr::annotated(TypeExpr::Str, vec![Annotation::MaxLength(3)]),
        )
        .field_default(
            "ids",
            TypeExpr::annotated(
                TypeExpr::list(TypeExpr::Int),
                vec![Annotation::MinLength(1), Annotation::MaxLength(2)],
            ),
            Value::List(vec![Value::Int(0)]),
        )
        .build();
    let s = Serializer::new(&TypeExpr::record(&def), SerializerConfig::new()).unwrap();

    let err = s
        .load_query_params(&query(&[("name", "hello")]))
        .unwrap_err();
    assert_eq!(err.errors()[0].message, "\"hello\" is longer than 3 characters");
    assert_eq!(err.errors()[0].instance_path, "name");

    let err = s
        .load_query_params(&query(&[("name", "abc"), ("ids", "1"), ("ids", "2"), ("ids", "3")]))
        .unwrap_err();
    assert_eq!(
        err.errors()[0].message,
        "[\"1\",\"2\",\"3\"] has more than 2 items"
    );
    assert_eq!(err.errors()[0].instance_path, "ids");

    assert!(s.load_query_params(&query(&[("name", "abc"), ("ids", "7")])).is_ok());
}

#[test]
fn test_loaded_query_value_dumps_as_json() {
    let s = search();
    let loaded = s
        .load_query_params(&query(&[("searchText", "q"), ("tags", "x")]))
        .unwrap();
    assert_eq!(
        s.dump(&loaded).unwrap(),
        json!({
            "searchText": "q",
            "page": 1,
            "exact": null,
            "tags": ["x"],
            "order": "asc",
            "since": null
        })
    );
}

#[test]
fn test_nested_records_are_not_query_loadable() {
    let inner = RecordDef::entity("api.Range")
        .field("lo", TypeExpr::Int)
        .build();
    let def = RecordDef::entity("api.Filter")
        .field("range", TypeExpr::record(&inner))
        .build();
    let s = Serializer::new(&TypeExpr::record(&def), SerializerConfig::new()).unwrap();
    assert_eq!(
        s.load_query_params(&query(&[("range", "1")])).unwrap_err(),
        Error::Definition(DefinitionError::NotQueryDeserializable)
    );
}
