//! Form schema: the sorted text fields of a document's first form.
//!
//! The JSON shape (`{"textFields":[{"id","name","value","multiline"}]}`) is
//! the contract with the shell, so field names are camelCase on the wire.

mod extractor;
mod merger;

pub use extractor::FormSchemaExtractor;
pub use merger::{FieldMerger, FieldValues, MergeDiagnostic, MergedFields, ValueSource};

use crate::codec::RawField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One single-value text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    /// Codec-assigned identifier, stable for a given document
    pub id: String,
    /// Logical field name; the join key for merging
    pub name: String,
    /// Current value (may be empty)
    pub value: String,
    /// Field accepts multi-line text
    #[serde(default)]
    pub multiline: bool,
}

impl TextField {
    /// Create a single-line text field.
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: value.into(),
            multiline: false,
        }
    }
}

impl From<RawField> for TextField {
    fn from(raw: RawField) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            value: raw.value,
            multiline: raw.multiline,
        }
    }
}

/// Ordered text fields of a form.
///
/// Schemas built with [`FormSchema::new`] are sorted ascending by name
/// (byte-wise, stable for equal names). Schemas deserialized from a caller
/// keep the caller's order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    /// Text fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_fields: Vec<TextField>,
}

impl FormSchema {
    /// Build a schema, sorting fields by name.
    pub fn new(mut text_fields: Vec<TextField>) -> Self {
        text_fields.sort_by(|a, b| a.name.cmp(&b.name));
        Self { text_fields }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.text_fields.len()
    }

    /// Whether the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.text_fields.is_empty()
    }

    /// Iterate over fields in schema order.
    pub fn iter(&self) -> std::slice::Iter<'_, TextField> {
        self.text_fields.iter()
    }

    /// First field named `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&TextField> {
        self.text_fields.iter().find(|field| field.name == name)
    }

    /// Whether fields are in non-decreasing name order.
    pub fn is_sorted_by_name(&self) -> bool {
        self.text_fields.windows(2).all(|pair| pair[0].name <= pair[1].name)
    }
}

impl<'a> IntoIterator for &'a FormSchema {
    type Item = &'a TextField;
    type IntoIter = std::slice::Iter<'a, TextField>;

    fn into_iter(self) -> Self::IntoIter {
        self.text_fields.iter()
    }
}

impl fmt::Display for FormSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TextFields filled in:")?;
        for field in self.text_fields.iter().filter(|field| !field.value.is_empty()) {
            writeln!(f, "{}: {}", field.name, field.value)?;
        }
        writeln!(f, "TextFields not filled in:")?;
        for field in self.text_fields.iter().filter(|field| field.value.is_empty()) {
            writeln!(f, "{}: ", field.name)?;
        }
        Ok(())
    }
}
