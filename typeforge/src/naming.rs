//! Wire-name conventions for record fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How source field names are rewritten into wire keys.
///
/// Aliases always win over the convention, and dictionary keys captured by a
/// flattened dictionary are never rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// Keep source names unchanged
    #[default]
    NoFormat,

    /// camelCase
    CamelCase,
}

impl NamingConvention {
    /// Apply the convention to a source name.
    pub fn apply(&self, name: &str) -> String {
        use convert_case::{Case, Casing};

        match self {
            NamingConvention::NoFormat => name.to_string(),
            NamingConvention::CamelCase => name.to_case(Case::Camel),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NamingConvention::NoFormat => "no_format",
            NamingConvention::CamelCase => "camel_case",
        }
    }
}

impl fmt::Display for NamingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamingConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_format" | "none" | "preserve" => Ok(NamingConvention::NoFormat),
            "camel_case" | "camelCase" => Ok(NamingConvention::CamelCase),
            other => Err(format!(
                "unknown naming convention '{other}' (expected 'no_format' or 'camelCase')"
            )),
        }
    }
}
