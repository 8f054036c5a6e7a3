//! Record IR.
//!
//! Flattened struct fields are spliced into the owning record's field list.
//! Each spliced field remembers the source path of the flatten field(s) it
//! came through, so codecs can rebuild the nested values on load.

use crate::expr::{FieldDefault, RecordStyle};

use super::types::Node;

/// A resolved record.
#[derive(Debug, Clone)]
pub struct RecordType {
    /// Generated, configuration-specific name used for schema definitions
    pub name: String,
    /// Source name of the declaration
    pub source: String,
    pub doc: Option<String>,
    pub style: RecordStyle,
    /// Drop `None` values when dumping
    pub omit_none: bool,
    /// Wire-ordered fields, including spliced ones
    pub fields: Vec<Field>,
    /// Struct-flatten fields, outermost first
    pub flattened: Vec<FlattenGroup>,
    /// Dictionary-flatten field capturing unknown wire keys
    pub extra: Option<ExtraFields>,
}

impl RecordType {
    /// Field by wire key.
    pub fn field_by_key(&self, dict_key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.dict_key == dict_key)
    }

    /// Wire keys of fields that must be present.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.dict_key.as_str())
    }

    pub fn flatten_group(&self, path: &[String]) -> Option<&FlattenGroup> {
        self.flattened.iter().find(|g| g.path == path)
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.style, RecordStyle::Entity)
    }
}

/// A resolved record field.
#[derive(Debug, Clone)]
pub struct Field {
    /// Source name
    pub name: String,
    /// Wire key after alias/naming convention
    pub dict_key: String,
    pub ty: Node,
    pub doc: Option<String>,
    pub default: FieldDefault,
    pub required: bool,
    pub is_discriminator: bool,
    /// Source names of the flatten fields this field was spliced through
    pub path: Vec<String>,
}

impl Field {
    pub fn is_flattened(&self) -> bool {
        !self.path.is_empty()
    }
}

/// A struct-flatten field whose own fields were spliced into the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenGroup {
    /// Full source path, ending with the flatten field's own name
    pub path: Vec<String>,
    /// Source name of the flattened record type
    pub type_name: String,
    pub style: RecordStyle,
}

/// A dictionary-flatten field.
#[derive(Debug, Clone)]
pub struct ExtraFields {
    /// Source path of the flatten groups that contain the field
    pub path: Vec<String>,
    /// Source name of the dictionary field
    pub field: String,
    /// Type of every captured value
    pub value: Node,
    /// Unknown keys are rejected instead of captured
    pub forbid: bool,
}
