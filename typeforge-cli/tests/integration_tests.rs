//! Integration tests for typeforge-cli.
//!
//! These tests drive the library the way the binary does: catalogue and
//! configuration files on disk, a session over them, and written output.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use typeforge_cli::{
    config::{CliArgs, ConfigManager, CONFIG_FILENAME},
    error::CatalogError,
    writer::WriteResult,
    CheckInput, CheckOutcome, CliError, SchemaWriter, Session,
};

const SHOP: &str = r#"
[[enums]]
name = "shop.Status"
members = [{ name = "OPEN", value = "open" }, { name = "CLOSED", value = "closed" }]

[[records]]
name = "shop.Card"

[[records.fields]]
name = "kind"
type = "Literal['card']"

[[records.fields]]
name = "last_four"
type = "str"
min_length = 4
max_length = 4

[[records]]
name = "shop.Transfer"

[[records.fields]]
name = "kind"
type = "Literal['transfer']"

[[records.fields]]
name = "iban"
type = "str"

[[records]]
name = "shop.Order"
doc = "A customer order."

[[records.fields]]
name = "order_id"
type = "int"
min = 1

[[records.fields]]
name = "status"
type = "shop.Status"

[[records.fields]]
name = "payment"
type = "shop.Card | shop.Transfer"
discriminator = "kind"

[[records.fields]]
name = "placed_on"
type = "date"

[[records.fields]]
name = "note"
type = "Optional[str]"
default_none = true
"#;

/// Create a temporary directory with the given files.
fn create_temp_project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

fn open(dir: &Path, args: &CliArgs) -> Session {
    let config = ConfigManager::load(Some(&dir.join(CONFIG_FILENAME))).unwrap();
    let config = ConfigManager::merge_cli_args(config, args);
    Session::open(&dir.join("types.toml"), config).unwrap()
}

// =============================================================================
// Schema Command
// =============================================================================

#[test]
fn test_schema_written_to_configured_path() {
    let dir = create_temp_project(&[
        ("types.toml", SHOP),
        (
            CONFIG_FILENAME,
            "[output]\ndir = \"out\"\nfile = \"order.json\"\npretty = false\n",
        ),
    ]);
    let session = open(dir.path(), &CliArgs::default());
    let schema = session.schema("shop.Order").unwrap();

    // Relative output paths resolve against the project here.
    let path: PathBuf = dir.path().join(session.config().output_path());
    let writer = SchemaWriter::new(false, session.config().output.pretty);
    let result = writer.write(&path, &schema).unwrap();
    assert!(matches!(result, WriteResult::Written { .. }));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/order.json")).unwrap())
            .unwrap();
    assert_eq!(written, schema);
    assert_eq!(
        written["$ref"],
        json!("#/components/schemas/shop.Order[no_format,keep_nones]")
    );
}

#[test]
fn test_schema_with_camel_case_flag() {
    let dir = create_temp_project(&[("types.toml", SHOP)]);
    let session = open(
        dir.path(),
        &CliArgs {
            camel_case: true,
            ..Default::default()
        },
    );
    let schema = session.schema("shop.Order").unwrap();
    let order = &schema["components"]["schemas"]["shop.Order[camel_case,keep_nones]"];

    let keys: Vec<&str> = order["properties"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["orderId", "status", "payment", "placedOn", "note"]);
    assert_eq!(order["description"], json!("A customer order."));
    assert_eq!(
        order["properties"]["payment"]["discriminator"]["propertyName"],
        json!("kind")
    );
}

#[test]
fn test_dry_run_leaves_disk_untouched() {
    let dir = create_temp_project(&[("types.toml", SHOP)]);
    let session = open(dir.path(), &CliArgs::default());
    let schema = session.schema("list[shop.Status]").unwrap();

    let path = dir.path().join("schemas/statuses.json");
    let result = SchemaWriter::new(true, true).write(&path, &schema).unwrap();
    assert!(!result.was_written());
    assert!(!path.exists());
}

// =============================================================================
// Check Command
// =============================================================================

#[test]
fn test_check_valid_order() {
    let dir = create_temp_project(&[("types.toml", SHOP)]);
    let session = open(dir.path(), &CliArgs::default());
    let data = json!({
        "order_id": 7,
        "status": "open",
        "payment": {"kind": "card", "last_four": "4242"},
        "placed_on": "2024-02-29"
    });

    let outcome = session
        .check("shop.Order", &CheckInput::Json(data.to_string()))
        .unwrap();
    let CheckOutcome::Valid(canonical) = outcome else {
        panic!("expected valid data");
    };
    assert_eq!(canonical["note"], json!(null));
    assert_eq!(canonical["placed_on"], json!("2024-02-29"));
    assert_eq!(canonical["payment"]["last_four"], json!("4242"));
}

#[test]
fn test_check_reports_every_violation() {
    let dir = create_temp_project(&[("types.toml", SHOP)]);
    let session = open(dir.path(), &CliArgs::default());
    let data = json!({
        "order_id": 0,
        "status": "lost",
        "payment": {"kind": "card", "last_four": "42"},
        "placed_on": "yesterday"
    });

    let outcome = session
        .check("shop.Order", &CheckInput::Json(data.to_string()))
        .unwrap();
    let CheckOutcome::Invalid(errors) = outcome else {
        panic!("expected violations");
    };
    let paths: Vec<&str> = errors.iter().map(|e| e.instance_path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["order_id", "status", "payment/last_four", "placed_on"]
    );
    assert_eq!(errors[0].message, "0 is less than the minimum of 1");
    assert_eq!(errors[2].message, "\"42\" is shorter than 4 characters");
    assert_eq!(errors[3].message, "\"yesterday\" is not a \"date\"");
}

#[test]
fn test_check_malformed_json() {
    let dir = create_temp_project(&[("types.toml", SHOP)]);
    let session = open(dir.path(), &CliArgs::default());
    let outcome = session
        .check("shop.Order", &CheckInput::Json("{".into()))
        .unwrap();
    assert!(matches!(
        outcome,
        CheckOutcome::Invalid(errors)
            if errors[0].message.starts_with("Error while parsing JSON string")
    ));
}

#[test]
fn test_check_query_on_nested_record_is_rejected() {
    let dir = create_temp_project(&[("types.toml", SHOP)]);
    let session = open(dir.path(), &CliArgs::default());
    let err = session
        .check("shop.Order", &CheckInput::query([("order_id", "1")]))
        .unwrap_err();
    assert!(matches!(err, CliError::Definition(_)));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_missing_catalog() {
    let dir = TempDir::new().unwrap();
    let err = Session::open(&dir.path().join("absent.toml"), Default::default()).unwrap_err();
    assert!(matches!(err, CliError::Catalog(CatalogError::Io { .. })));
}

#[test]
fn test_bad_root_expression() {
    let dir = create_temp_project(&[("types.toml", SHOP)]);
    let session = open(dir.path(), &CliArgs::default());
    let err = session.schema("list[shop.Order").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to load catalogue: Invalid root type 'list[shop.Order': expected ',' or ']' at offset 15"
    );
}

#[test]
fn test_init_content_round_trips_through_loader() {
    let dir = create_temp_project(&[(CONFIG_FILENAME, ConfigManager::default_config_content())]);
    let config = ConfigManager::load(Some(&dir.path().join(CONFIG_FILENAME))).unwrap();
    assert_eq!(config.naming.convention, "no_format");
    assert_eq!(config.output_path(), PathBuf::from("./schemas/schema.json"));
}
