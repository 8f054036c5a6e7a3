//! Command backend: a catalogue plus the configuration to compile it with.

use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::{debug, instrument};
use typeforge::{ErrorItem, QueryParams, Serializer};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::CliResult;

/// Data handed to `typeforge check`.
#[derive(Debug, Clone)]
pub enum CheckInput {
    /// A JSON document
    Json(String),
    /// Repeated `key=value` pairs, grouped by key
    Query(QueryParams),
}

impl CheckInput {
    /// Group `key=value` pairs into query parameters.
    pub fn query<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in pairs {
            params
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
        CheckInput::Query(params)
    }
}

/// What `check` found.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// The data loaded; this is its canonical wire form.
    Valid(JsonValue),
    Invalid(Vec<ErrorItem>),
}

#[derive(Debug)]
pub struct Session {
    catalog: Catalog,
    config: Config,
}

impl Session {
    pub fn new(catalog: Catalog, config: Config) -> Self {
        Self { catalog, config }
    }

    /// Load the catalogue at `path`.
    pub fn open(path: &Path, config: Config) -> CliResult<Self> {
        Ok(Self::new(Catalog::load(path)?, config))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build a serializer for `root`, a type expression over the catalogue.
    #[instrument(skip(self))]
    pub fn serializer(&self, root: &str) -> CliResult<Serializer> {
        let expr = self.catalog.root_type(root)?;
        let config = self
            .config
            .serializer_config(self.catalog.registry().clone())?;
        debug!(?config, "Building serializer");
        Ok(Serializer::new(&expr, config)?)
    }

    /// The JSON Schema document for `root`.
    pub fn schema(&self, root: &str) -> CliResult<JsonValue> {
        Ok(self.serializer(root)?.get_json_schema())
    }

    /// Load `input` as `root`, collecting every violation.
    pub fn check(&self, root: &str, input: &CheckInput) -> CliResult<CheckOutcome> {
        let serializer = self.serializer(root)?;
        let loaded = match input {
            CheckInput::Json(text) => serializer.load_json(text, true),
            CheckInput::Query(params) => serializer.load_query_params(params),
        };
        let value = match loaded {
            Ok(value) => value,
            Err(typeforge::Error::Validation(err)) => return Ok(CheckOutcome::Invalid(err.errors)),
            Err(err) => return Err(err.into()),
        };
        match serializer.dump(&value) {
            Ok(data) => Ok(CheckOutcome::Valid(data)),
            Err(err) => Ok(CheckOutcome::Invalid(err.errors)),
        }
    }
}
