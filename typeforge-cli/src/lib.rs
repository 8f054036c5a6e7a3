//! # typeforge-cli
//!
//! Library behind the `typeforge` command. It reads type declarations from a
//! TOML catalogue, compiles them with [`typeforge`], and either writes the
//! resulting JSON Schema or checks data against it.
//!
//! ## Architecture
//!
//! - [`type_parser`] - Field type syntax (`list[int] | None`, `Page[T]`, ...)
//! - [`catalog`] - TOML catalogue of records and enums
//! - [`config`] - `typeforge.toml` loading and flag merging
//! - [`session`] - Serializer construction, schema output and data checks
//! - [`writer`] - File output and dry-run support
//! - [`error`] - Error types and handling

pub mod catalog;
pub mod config;
pub mod error;
pub mod session;
pub mod type_parser;
pub mod writer;

pub use catalog::Catalog;
pub use config::{Config, ConfigManager};
pub use error::{CliError, CliResult};
pub use session::{CheckInput, CheckOutcome, Session};
pub use writer::SchemaWriter;
