use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::schema::IndexRecordOption;
use crate::ScrivenerError;

/// How a field value should be handled by the indexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldOptions {
    /// `None` means the field is not inverted at all.
    pub indexing: Option<IndexRecordOption>,
}

impl FieldOptions {
    /// Options of a field inverted with the given record option.
    pub fn indexed(record_option: IndexRecordOption) -> FieldOptions {
        FieldOptions {
            indexing: Some(record_option),
        }
    }

    /// Returns true iff the field is inverted.
    pub fn is_indexed(&self) -> bool {
        self.indexing.is_some()
    }
}

/// Frozen metadata about one field of a segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name.
    pub name: String,
    /// Dense field number, in order of first appearance within the buffer.
    pub number: u32,
    /// Record option, or `None` for a field that is not inverted.
    pub indexing: Option<IndexRecordOption>,
    /// True iff at least one occurrence carried a payload.
    pub has_payloads: bool,
}

/// Field metadata of a sealed segment, ordered by field number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfos {
    fields: Vec<FieldInfo>,
}

impl FieldInfos {
    /// Looks a field up by name.
    pub fn get(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field_info| field_info.name == name)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true iff there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the fields by field number.
    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter()
    }

    /// Returns true iff some field records positions.
    pub fn has_positions(&self) -> bool {
        self.fields
            .iter()
            .any(|field| field.indexing.map_or(false, IndexRecordOption::has_positions))
    }
}

/// Mutable field registry of a buffer.
#[derive(Default)]
pub(crate) struct FieldInfosBuilder {
    fields: Vec<FieldInfo>,
    by_name: FxHashMap<String, u32>,
}

impl FieldInfosBuilder {
    /// Returns the field number for `name`, registering the field if needed.
    ///
    /// Options are fixed by the first registration. A field that was stored
    /// only may later become indexed; any other change is refused.
    pub fn get_or_add(&mut self, name: &str, options: FieldOptions) -> crate::Result<u32> {
        if let Some(&number) = self.by_name.get(name) {
            let field_info = &mut self.fields[number as usize];
            match (field_info.indexing, options.indexing) {
                (_, None) => {}
                (None, Some(requested)) => field_info.indexing = Some(requested),
                (Some(current), Some(requested)) if current == requested => {}
                (Some(current), Some(requested)) => {
                    return Err(ScrivenerError::DocumentFailed(format!(
                        "cannot change index option of field '{name}' from {current:?} to \
                         {requested:?}"
                    )));
                }
            }
            return Ok(number);
        }
        let number = self.fields.len() as u32;
        self.fields.push(FieldInfo {
            name: name.to_string(),
            number,
            indexing: options.indexing,
            has_payloads: false,
        });
        self.by_name.insert(name.to_string(), number);
        Ok(number)
    }

    pub fn field_info(&self, number: u32) -> &FieldInfo {
        &self.fields[number as usize]
    }

    pub fn number(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn set_has_payloads(&mut self, number: u32) {
        self.fields[number as usize].has_payloads = true;
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn finish(&self) -> FieldInfos {
        FieldInfos {
            fields: self.fields.clone(),
        }
    }
}
