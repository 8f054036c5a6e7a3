//! Snapshot tests for compiled schemas and dumped values.
//!
//! These tests use insta to capture the exact JSON produced by the serializer.
//! Run `cargo insta review` to review and accept snapshot changes.

use typeforge::{
    Annotation, RecordDef, RecordValue, Serializer, SerializerConfig, TypeExpr, Value,
};

// =============================================================================
// Schema Snapshots
// =============================================================================

#[test]
fn snapshot_documented_record_schema() {
    let user = RecordDef::entity("app.User")
        .doc("A registered user.")
        .field_doc("id", TypeExpr::Int, "Identifier")
        .field("name", TypeExpr::Str)
        .field_default("email", TypeExpr::optional(TypeExpr::Str), Value::None)
        .build();
    let s = Serializer::new(&TypeExpr::record(&user), SerializerConfig::new()).unwrap();

    insta::assert_json_snapshot!(s.get_json_schema(), @r##"
    {
      "$schema": "https://json-schema.org/draft/2020-12/schema",
      "$ref": "#/components/schemas/app.User[no_format,keep_nones]",
      "components": {
        "schemas": {
          "app.User[no_format,keep_nones]": {
            "type": "object",
            "properties": {
              "id": {
                "type": "integer",
                "format": "int64",
                "description": "Identifier"
              },
              "name": {
                "type": "string"
              },
              "email": {
                "anyOf": [
                  {
                    "type": "null"
                  },
                  {
                    "type": "string"
                  }
                ]
              }
            },
            "required": [
              "id",
              "name"
            ],
            "description": "A registered user."
          }
        }
      }
    }
    "##);
}

#[test]
fn snapshot_discriminated_union_schema() {
    let cat = RecordDef::entity("zoo.Cat")
        .field("pet_type", TypeExpr::literal(["cat"]))
        .field("lives", TypeExpr::Int)
        .build();
    let dog = RecordDef::entity("zoo.Dog")
        .field("pet_type", TypeExpr::literal(["dog"]))
        .build();
    let pets = TypeExpr::annotated(
        TypeExpr::union(vec![TypeExpr::record(&cat), TypeExpr::record(&dog)]),
        vec![Annotation::discriminator("pet_type")],
    );
    let s = Serializer::new(&pets, SerializerConfig::new().with_camel_case()).unwrap();

    insta::assert_json_snapshot!(s.get_json_schema(), @r##"
    {
      "$schema": "https://json-schema.org/draft/2020-12/schema",
      "oneOf": [
        {
          "$ref": "#/components/schemas/zoo.Cat[camel_case,keep_nones]"
        },
        {
          "$ref": "#/components/schemas/zoo.Dog[camel_case,keep_nones]"
        }
      ],
      "discriminator": {
        "propertyName": "petType",
        "mapping": {
          "cat": "#/components/schemas/zoo.Cat[camel_case,keep_nones]",
          "dog": "#/components/schemas/zoo.Dog[camel_case,keep_nones]"
        }
      },
      "components": {
        "schemas": {
          "zoo.Cat[camel_case,keep_nones]": {
            "type": "object",
            "properties": {
              "petType": {
                "enum": [
                  "cat"
                ]
              },
              "lives": {
                "type": "integer",
                "format": "int64"
              }
            },
            "required": [
              "petType",
              "lives"
            ]
          },
          "zoo.Dog[camel_case,keep_nones]": {
            "type": "object",
            "properties": {
              "petType": {
                "enum": [
                  "dog"
                ]
              }
            },
            "required": [
              "petType"
            ]
          }
        }
      }
    }
    "##);
}

// =============================================================================
// Value Snapshots
// =============================================================================

#[test]
fn snapshot_camel_case_dump_without_nones() {
    let profile = RecordDef::entity("app.Profile")
        .field("display_name", TypeExpr::Str)
        .field("nick_name", TypeExpr::optional(TypeExpr::Str))
        .field("login_count", TypeExpr::Int)
        .build();
    let s = Serializer::new(
        &TypeExpr::record(&profile),
        SerializerConfig::new()
            .with_camel_case()
            .with_omit_none(true),
    )
    .unwrap();
    let value: Value = RecordValue::new("app.Profile")
        .with("display_name", "Ada")
        .with("nick_name", Value::None)
        .with("login_count", 3i64)
        .into();

    insta::assert_json_snapshot!(s.dump(&value).unwrap(), @r#"
    {
      "displayName": "Ada",
      "loginCount": 3
    }
    "#);
}
