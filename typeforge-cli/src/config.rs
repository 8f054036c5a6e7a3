//! `typeforge.toml` handling.
//!
//! The file sets serializer defaults shared by every command. Command-line
//! flags override it through [`ConfigManager::merge_cli_args`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use typeforge::{NamingConvention, SerializerConfig, TypeRegistry};

use crate::error::{CliResult, ConfigError};

/// Default configuration filename.
pub const CONFIG_FILENAME: &str = "typeforge.toml";

/// Main configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub naming: NamingConfig,
    pub serializer: SerializerSection,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    /// `no_format` or `camel_case`
    pub convention: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            convention: "no_format".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerializerSection {
    /// Drop `None` values from dumped records.
    pub omit_none: bool,

    /// Treat every field that has a default as optional on load.
    pub force_default_for_optional: bool,
}

/// Where `typeforge schema` writes when no `--output` is given.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub file: String,
    /// Indent the emitted JSON.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./schemas"),
            file: "schema.json".to_string(),
            pretty: true,
        }
    }
}

impl Config {
    /// Default output path: `output.dir` joined with `output.file`.
    pub fn output_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.file)
    }

    pub fn naming_convention(&self) -> CliResult<NamingConvention> {
        let convention = self
            .naming
            .convention
            .parse()
            .map_err(|message: String| ConfigError::invalid_value("naming.convention", message))?;
        Ok(convention)
    }

    /// Build a serializer configuration over the given registry.
    pub fn serializer_config(
        &self,
        registry: impl Into<Arc<TypeRegistry>>,
    ) -> CliResult<SerializerConfig> {
        Ok(SerializerConfig::new()
            .with_naming_convention(self.naming_convention()?)
            .with_omit_none(self.serializer.omit_none)
            .with_force_default_for_optional(self.serializer.force_default_for_optional)
            .with_registry(registry))
    }
}

/// Configuration manager for loading and merging configs.
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from `path`, or from [`CONFIG_FILENAME`] in the
    /// working directory. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> CliResult<Config> {
        let config_path = path.map_or_else(|| PathBuf::from(CONFIG_FILENAME), Path::to_path_buf);

        if !config_path.exists() {
            debug!(path = %config_path.display(), "No configuration file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::invalid_toml(config_path.clone(), e.to_string()))?;
        // Unknown conventions fail here, not on first use.
        config.naming_convention()?;

        debug!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Merge CLI arguments into configuration.
    ///
    /// Flags only ever switch behavior on; an absent flag keeps the file's value.
    pub fn merge_cli_args(mut config: Config, args: &CliArgs) -> Config {
        if args.camel_case {
            config.naming.convention = "camel_case".to_string();
        }
        if args.omit_none {
            config.serializer.omit_none = true;
        }
        if args.force_default_for_optional {
            config.serializer.force_default_for_optional = true;
        }
        if let Some(compact) = args.compact {
            config.output.pretty = !compact;
        }
        config
    }

    /// Generate default configuration file content with comments.
    pub fn default_config_content() -> &'static str {
        r#"# typeforge configuration file

[naming]
# Key naming convention on the wire: "no_format" or "camel_case"
convention = "no_format"

[serializer]
# Leave None-valued fields out of dumped records
omit_none = false

# Make every field with a default optional on load
force_default_for_optional = false

[output]
# Where `typeforge schema` writes when --output is not given
dir = "./schemas"
file = "schema.json"

# Indent the emitted JSON
pretty = true
"#
    }
}

/// CLI arguments that can override configuration.
#[derive(Debug, Default)]
pub struct CliArgs {
    pub camel_case: bool,
    pub omit_none: bool,
    pub force_default_for_optional: bool,
    pub compact: Option<bool>,
}
