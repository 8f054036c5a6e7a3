//! Resolution keys.

use std::fmt;

/// Identity used to memoize record resolution.
///
/// Two resolutions with equal keys share one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolutionKey {
    /// Record name plus declaration identity
    pub type_id: String,
    /// Canonical key of the inheritable annotations
    pub annotations: String,
    /// Rendered generic arguments, empty for non-generic records
    pub generics: String,
}

impl ResolutionKey {
    pub fn new(
        type_id: impl Into<String>,
        annotations: impl Into<String>,
        generics: impl Into<String>,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            annotations: annotations.into(),
            generics: generics.into(),
        }
    }
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.type_id, self.generics, self.annotations)
    }
}
