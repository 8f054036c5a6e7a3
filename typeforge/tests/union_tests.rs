//! Plain and discriminated unions.

use std::sync::Arc;

use serde_json::json;
use typeforge::{
    Annotation, DefinitionError, EnumDef, EnumValue, Error, RecordDef, RecordValue, Serializer,
    SerializerConfig, TypeExpr, Value,
};

fn cat() -> Arc<RecordDef> {
    RecordDef::entity("zoo.Cat")
        .field("pet_type", TypeExpr::literal(["cat"]))
        .field("lives", TypeExpr::Int)
        .build()
}

fn dog() -> Arc<RecordDef> {
    RecordDef::entity("zoo.Dog")
        .field("pet_type", TypeExpr::literal(["dog"]))
        .field("good_boy", TypeExpr::Bool)
        .build()
}

fn pets() -> TypeExpr {
    TypeExpr::annotated(
        TypeExpr::union(vec![TypeExpr::record(&cat()), TypeExpr::record(&dog())]),
        vec![Annotation::discriminator("pet_type")],
    )
}

// =============================================================================
// Discriminated unions
// =============================================================================

#[test]
fn test_discriminated_round_trip() {
    let s = Serializer::new(&pets(), SerializerConfig::new()).unwrap();
    let dog: Value = RecordValue::new("zoo.Dog")
        .with("pet_type", "dog")
        .with("good_boy", true)
        .into();

    let data = s.dump(&dog).unwrap();
    assert_eq!(data, json!({"pet_type": "dog", "good_boy": true}));
    assert_eq!(s.load(&data, true).unwrap(), dog);
    assert_eq!(s.load(&data, false).unwrap(), dog);
}

#[test]
fn test_unknown_discriminator_value() {
    let s = Serializer::new(&pets(), SerializerConfig::new()).unwrap();
    let data = json!({"pet_type": "C"});

    for validate in [false, true] {
        let err = s.load(&data, validate).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(
            err.errors[0].message,
            "\"C\" is not one of [\"cat\", \"dog\"] discriminator values"
        );
        assert_eq!(err.errors[0].instance_path, "pet_type");
    }
}

#[test]
fn test_missing_discriminator_value() {
    let s = Serializer::new(&pets(), SerializerConfig::new()).unwrap();
    for validate in [false, true] {
        let err = s.load(&json!({"lives": 3}), validate).unwrap_err();
        assert_eq!(err.errors[0].message, "\"pet_type\" is a required property");
        assert_eq!(err.errors[0].instance_path, "");
    }
}

#[test]
fn test_validation_reports_inside_selected_alternative() {
    let s = Serializer::new(&pets(), SerializerConfig::new()).unwrap();
    let err = s
        .load(&json!({"pet_type": "dog", "good_boy": "yes"}), true)
        .unwrap_err();
    assert_eq!(err.errors.len(), 1);
    assert_eq!(err.errors[0].message, "\"yes\" is not of type \"boolean\"");
    assert_eq!(err.errors[0].instance_path, "good_boy");
}

#[test]
fn test_discriminator_follows_naming_convention() {
    let s = Serializer::new(&pets(), SerializerConfig::new().with_camel_case()).unwrap();
    let cat: Value = RecordValue::new("zoo.Cat")
        .with("pet_type", "cat")
        .with("lives", 9i64)
        .into();
    let data = s.dump(&cat).unwrap();
    assert_eq!(data, json!({"petType": "cat", "lives": 9}));
    assert_eq!(s.load(&data, true).unwrap(), cat);

    let schema = s.get_json_schema();
    assert_eq!(schema["discriminator"]["propertyName"], json!("petType"));
    assert_eq!(
        schema["discriminator"]["mapping"],
        json!({
            "cat": "#/components/schemas/zoo.Cat[camel_case,keep_nones]",
            "dog": "#/components/schemas/zoo.Dog[camel_case,keep_nones]"
        })
    );
}

#[test]
fn test_optional_discriminated_union() {
    let s = Serializer::new(&TypeExpr::optional(pets()), SerializerConfig::new()).unwrap();
    assert_eq!(s.load(&json!(null), true).unwrap(), Value::None);
    assert!(s.load(&json!({"pet_type": "cat", "lives": 1}), true).is_ok());
}

#[test]
fn test_enum_member_discriminator_round_trip() {
    let kind = EnumDef::new("pay.Kind")
        .member("CARD", "card")
        .member("TRANSFER", "transfer")
        .build();
    let card = RecordDef::entity("pay.Card")
        .field("kind", TypeExpr::literal(kind.literal("CARD")))
        .field("last_four", TypeExpr::Str)
        .build();
    let transfer = RecordDef::entity("pay.Transfer")
        .field("kind", TypeExpr::literal(kind.literal("TRANSFER")))
        .field("iban", TypeExpr::Str)
        .build();
    let expr = TypeExpr::annotated(
        TypeExpr::union(vec![TypeExpr::record(&card), TypeExpr::record(&transfer)]),
        vec![Annotation::discriminator("kind")],
    );
    let s = Serializer::new(&expr, SerializerConfig::new()).unwrap();

    let value: Value = RecordValue::new("pay.Transfer")
        .with("kind", EnumValue::new("pay.Kind", "TRANSFER"))
        .with("iban", "DE89")
        .into();
    let data = s.dump(&value).unwrap();
    assert_eq!(data, json!({"kind": "transfer", "iban": "DE89"}));
    assert_eq!(s.load(&data, true).unwrap(), value);
    assert_eq!(s.load(&data, false).unwrap(), value);

    let schema = s.get_json_schema();
    assert_eq!(
        schema["discriminator"]["mapping"]["card"],
        json!("#/components/schemas/pay.Card[no_format,keep_nones]")
    );
}

#[test]
fn test_discriminator_definition_errors() {
    let untagged = RecordDef::entity("zoo.Fish").field("fins", TypeExpr::Int).build();
    let err = Serializer::new(
        &TypeExpr::annotated(
            TypeExpr::union(vec![TypeExpr::record(&cat()), TypeExpr::record(&untagged)]),
            vec![Annotation::discriminator("pet_type")],
        ),
        SerializerConfig::new(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::Definition(DefinitionError::MissingDiscriminator {
            type_name: "zoo.Fish".into(),
            field: "pet_type".into(),
        })
    );

    let err = Serializer::new(
        &TypeExpr::annotated(
            TypeExpr::union(vec![TypeExpr::record(&cat()), TypeExpr::record(&cat())]),
            vec![Annotation::discriminator("pet_type")],
        ),
        SerializerConfig::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Definition(DefinitionError::DuplicateDiscriminator { value, .. }) if value == "cat"
    ));

    let numbered = RecordDef::entity("zoo.Numbered")
        .field("pet_type", TypeExpr::Int)
        .build();
    let err = Serializer::new(
        &TypeExpr::annotated(
            TypeExpr::union(vec![TypeExpr::record(&cat()), TypeExpr::record(&numbered)]),
            vec![Annotation::discriminator("pet_type")],
        ),
        SerializerConfig::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Definition(DefinitionError::InvalidDiscriminator { .. })
    ));

    let err = Serializer::new(
        &TypeExpr::annotated(
            TypeExpr::union(vec![TypeExpr::Int, TypeExpr::Str]),
            vec![Annotation::discriminator("pet_type")],
        ),
        SerializerConfig::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Definition(DefinitionError::NonEntityUnion(_))
    ));
}

// =============================================================================
// Plain unions
// =============================================================================

#[test]
fn test_plain_union_picks_first_matching_alternative() {
    let s = Serializer::new(
        &TypeExpr::union(vec![TypeExpr::Int, TypeExpr::Str]),
        SerializerConfig::new(),
    )
    .unwrap();
    assert_eq!(s.load(&json!(3), true).unwrap(), Value::Int(3));
    assert_eq!(s.load(&json!("3"), true).unwrap(), Value::Str("3".into()));

    let err = s.load(&json!(true), true).unwrap_err();
    assert_eq!(
        err.errors[0].message,
        "true is not valid under any of the schemas listed in the 'anyOf' keyword"
    );
    assert_eq!(
        s.get_json_schema()["anyOf"],
        json!([
            {"type": "integer", "format": "int64"},
            {"type": "string"}
        ])
    );
}

#[test]
fn test_plain_union_of_records() {
    let s = Serializer::new(
        &TypeExpr::union(vec![TypeExpr::record(&cat()), TypeExpr::record(&dog())]),
        SerializerConfig::new(),
    )
    .unwrap();
    let loaded = s
        .load(&json!({"pet_type": "dog", "good_boy": false}), true)
        .unwrap();
    assert_eq!(
        loaded,
        Value::Record(
            RecordValue::new("zoo.Dog")
                .with("pet_type", "dog")
                .with("good_boy", false)
        )
    );
}
