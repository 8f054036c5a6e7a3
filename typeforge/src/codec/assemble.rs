//! Rebuilding record values from wire fields.
//!
//! Flattened fields arrive as siblings of the owner's own fields. The
//! assembler collects them per flatten path and folds the groups back into
//! nested values once every field has been seen.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::ErrorItem;
use crate::expr::RecordStyle;
use crate::ir::{Field, RecordType};
use crate::value::{RecordValue, Value};

use super::required_property;

pub(crate) struct RecordAssembler<'a> {
    record: &'a RecordType,
    root: IndexMap<String, Value>,
    groups: HashMap<Vec<String>, IndexMap<String, Value>>,
    extra: IndexMap<String, Value>,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(record: &'a RecordType) -> Self {
        Self {
            record,
            root: IndexMap::new(),
            groups: HashMap::new(),
            extra: IndexMap::new(),
        }
    }

    fn target(&mut self, path: &[String]) -> &mut IndexMap<String, Value> {
        if path.is_empty() {
            &mut self.root
        } else {
            self.groups.entry(path.to_vec()).or_default()
        }
    }

    pub fn set(&mut self, field: &Field, value: Value) {
        self.target(&field.path).insert(field.name.clone(), value);
    }

    /// Handle an absent wire key: apply the default, skip, or fail.
    pub fn missing(&mut self, field: &Field, path: &str) -> Result<(), ErrorItem> {
        if let Some(default) = field.default.produce() {
            self.set(field, default);
            Ok(())
        } else if field.required {
            Err(required_property(&field.dict_key, path))
        } else {
            Ok(())
        }
    }

    pub fn set_extra(&mut self, key: String, value: Value) {
        self.extra.insert(key, value);
    }

    pub fn finish(mut self) -> Value {
        let record = self.record;
        if let Some(extra) = &record.extra {
            let captured = std::mem::take(&mut self.extra);
            self.target(&extra.path)
                .insert(extra.field.clone(), Value::Dict(captured));
        }

        let mut groups: Vec<_> = record.flattened.iter().collect();
        groups.sort_by_key(|group| std::cmp::Reverse(group.path.len()));
        for group in groups {
            let fields = self.groups.remove(&group.path).unwrap_or_default();
            let value = record_value(group.style, &group.type_name, fields);
            if let Some((name, parent)) = group.path.split_last() {
                self.target(parent).insert(name.clone(), value);
            }
        }

        record_value(record.style, &record.source, self.root)
    }
}

fn record_value(style: RecordStyle, type_name: &str, fields: IndexMap<String, Value>) -> Value {
    match style {
        RecordStyle::Entity => Value::Record(RecordValue {
            type_name: type_name.to_string(),
            fields,
        }),
        RecordStyle::TypedDict { .. } => Value::Dict(fields),
    }
}
