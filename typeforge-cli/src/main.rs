//! # typeforge
//!
//! Compile JSON Schemas from TOML type catalogues and check data against them.
//!
//! ## Usage
//!
//! ```bash
//! # Write the schema of a record to ./schemas/schema.json
//! typeforge schema --catalog types.toml --root shop.Order
//!
//! # Print a camelCase schema of a generic record instead of writing it
//! typeforge schema --catalog types.toml --root "shop.Page[shop.Order]" --camel-case --stdout
//!
//! # Check a JSON document (use `-` for stdin)
//! typeforge check --catalog types.toml --root shop.Order --data order.json
//!
//! # Check query parameters
//! typeforge check --catalog types.toml --root shop.Search -p tag=a -p tag=b -p page=2
//!
//! # Initialize configuration
//! typeforge init
//! ```
//!
//! Exit status is 2 when `check` finds invalid data and 1 on any other error.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

use typeforge_cli::{
    config::{CliArgs, ConfigManager, CONFIG_FILENAME},
    writer::WriteResult,
    CheckInput, CheckOutcome, CliError, SchemaWriter, Session,
};

#[derive(Parser)]
#[command(name = "typeforge")]
#[command(author, version, about = "Compile JSON Schemas from type catalogues and check data against them", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that compile a type.
#[derive(Args)]
struct TypeArgs {
    /// TOML catalogue declaring records and enums
    #[arg(long)]
    catalog: PathBuf,

    /// Root type expression, e.g. `shop.Order` or `list[shop.Order]`
    #[arg(short, long)]
    root: String,

    /// Use camelCase keys on the wire
    #[arg(long)]
    camel_case: bool,

    /// Omit None-valued fields when dumping
    #[arg(long)]
    omit_none: bool,

    /// Make every field with a default optional
    #[arg(long)]
    force_default_for_optional: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the JSON Schema of a type
    Schema {
        #[command(flatten)]
        types: TypeArgs,

        /// Output file (defaults to the configured output path)
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,

        /// Print the schema instead of writing it
        #[arg(long)]
        stdout: bool,

        /// Emit compact JSON
        #[arg(long)]
        compact: bool,

        /// Preview without writing files
        #[arg(long)]
        dry_run: bool,
    },

    /// Check data against a type and print its canonical form
    Check {
        #[command(flatten)]
        types: TypeArgs,

        /// JSON document to check, or `-` for stdin
        #[arg(short, long, required_unless_present = "param", conflicts_with = "param")]
        data: Option<PathBuf>,

        /// Query parameter as key=value; repeat for lists
        #[arg(short, long, value_parser = parse_pair)]
        param: Vec<(String, String)>,
    },

    /// Initialize a new typeforge configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        output: PathBuf,

        /// Overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            match err.downcast_ref::<CliError>() {
                Some(CliError::InvalidData { .. }) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);
    if let Err(err) = builder.try_init() {
        eprintln!("failed to install tracing subscriber: {err}");
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Schema {
            types,
            output,
            stdout,
            compact,
            dry_run,
        } => cmd_schema(config_path, &types, output, stdout, compact, dry_run),
        Commands::Check { types, data, param } => {
            let input = match data {
                Some(path) => CheckInput::Json(read_data(&path)?),
                None => CheckInput::query(param.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            };
            cmd_check(config_path, &types, &input)
        }
        Commands::Init { output, force } => cmd_init(&output, force),
    }
}

fn open_session(
    config_path: Option<&Path>,
    types: &TypeArgs,
    compact: Option<bool>,
) -> anyhow::Result<Session> {
    let config = ConfigManager::load(config_path)?;
    let config = ConfigManager::merge_cli_args(
        config,
        &CliArgs {
            camel_case: types.camel_case,
            omit_none: types.omit_none,
            force_default_for_optional: types.force_default_for_optional,
            compact,
        },
    );
    Ok(Session::open(&types.catalog, config)?)
}

/// Schema command implementation.
fn cmd_schema(
    config_path: Option<&Path>,
    types: &TypeArgs,
    output: Option<PathBuf>,
    stdout: bool,
    compact: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let session = open_session(config_path, types, compact.then_some(true))?;
    let schema = session.schema(&types.root)?;
    let writer = SchemaWriter::new(dry_run, session.config().output.pretty);

    if stdout {
        print!("{}", writer.render(&schema));
        return Ok(());
    }

    let path = output.unwrap_or_else(|| session.config().output_path());
    match writer.write(&path, &schema)? {
        WriteResult::Written { path, bytes } => {
            println!(
                "{} Written {} bytes to {}",
                "✓".green(),
                bytes,
                path.display()
            );
        }
        WriteResult::DryRun { path, content } => {
            println!(
                "{} Would write to {}:",
                "[dry-run]".yellow(),
                path.display()
            );
            println!("{}", "─".repeat(60).dimmed());
            print!("{content}");
            println!("{}", "─".repeat(60).dimmed());
        }
    }
    Ok(())
}

/// Check command implementation.
fn cmd_check(
    config_path: Option<&Path>,
    types: &TypeArgs,
    input: &CheckInput,
) -> anyhow::Result<()> {
    let session = open_session(config_path, types, None)?;
    match session.check(&types.root, input)? {
        CheckOutcome::Valid(data) => {
            println!("{} Data is a valid {}", "✓".green(), types.root.cyan());
            println!("{data:#}");
            Ok(())
        }
        CheckOutcome::Invalid(errors) => {
            println!("{} {} error(s):", "✗".red(), errors.len());
            for item in &errors {
                let path = if item.instance_path.is_empty() {
                    "<root>"
                } else {
                    item.instance_path.as_str()
                };
                println!("  {} {}", path.bold(), item.message);
            }
            Err(CliError::InvalidData {
                count: errors.len(),
            }
            .into())
        }
    }
}

/// Init command implementation.
fn cmd_init(output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        return Err(CliError::Usage(format!(
            "Configuration file already exists: {} (use --force to overwrite)",
            output.display()
        ))
        .into());
    }

    std::fs::write(output, ConfigManager::default_config_content())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} Created configuration file: {}",
        "✓".green(),
        output.display()
    );
    Ok(())
}

fn read_data(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read data from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data from {}", path.display()))
}

fn parse_pair(text: &str) -> Result<(String, String), String> {
    text.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{text}'"))
}
