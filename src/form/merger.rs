//! Merge caller-supplied values into a form schema by field name.

use super::{FormSchema, TextField};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Submitted values keyed by field name, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValues(IndexMap<String, String>);

impl FieldValues {
    /// Create an empty value set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the values of a submitted schema.
    ///
    /// When a name repeats, the first occurrence wins.
    pub fn from_schema(schema: &FormSchema) -> Self {
        schema
            .iter()
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect()
    }

    /// Set `name` unless it is already present. Returns whether it was inserted.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        match self.0.entry(name.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            },
        }
    }

    /// Value submitted for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no value was submitted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(name, value)` pairs in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FieldValues::new();
        for (name, value) in iter {
            values.insert(name, value);
        }
        values
    }
}

/// Where merged values come from.
#[derive(Debug, Clone, Copy)]
pub enum ValueSource<'a> {
    /// Values submitted by name
    Values(&'a FieldValues),
    /// Each field is filled with its own name
    FieldNames,
}

/// Non-fatal merge finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDiagnostic {
    /// No submitted value matched this schema field; its value was kept
    FieldNotFound {
        /// Schema field name
        name: String,
    },
}

impl fmt::Display for MergeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeDiagnostic::FieldNotFound { name } => write!(f, "field not found: {}", name),
        }
    }
}

/// Result of a merge: one field per schema field, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedFields {
    fields: Vec<TextField>,
    diagnostics: Vec<MergeDiagnostic>,
}

impl MergedFields {
    /// Merged fields in schema order.
    pub fn fields(&self) -> &[TextField] {
        &self.fields
    }

    /// Findings recorded while merging.
    pub fn diagnostics(&self) -> &[MergeDiagnostic] {
        &self.diagnostics
    }

    /// Merged value of the first field named `name`.
    pub fn value_for(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    /// Number of merged fields (always the schema's length).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the merged schema was empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Joins a schema with a value source.
pub struct FieldMerger;

impl FieldMerger {
    /// Merge `source` into `schema`.
    ///
    /// Total over the schema: the output has exactly the schema's fields with
    /// ids and names unchanged. A field with no submitted value keeps its
    /// original value and produces a [`MergeDiagnostic::FieldNotFound`].
    pub fn merge(schema: &FormSchema, source: ValueSource<'_>) -> MergedFields {
        let mut diagnostics = Vec::new();
        let fields = schema
            .iter()
            .map(|field| {
                let value = match source {
                    ValueSource::FieldNames => field.name.clone(),
                    ValueSource::Values(values) => match values.get(&field.name) {
                        Some(value) => value.to_string(),
                        None => {
                            log::warn!("field not found: {}", field.name);
                            diagnostics.push(MergeDiagnostic::FieldNotFound {
                                name: field.name.clone(),
                            });
                            field.value.clone()
                        },
                    },
                };
                TextField {
                    value,
                    ..field.clone()
                }
            })
            .collect();

        MergedFields {
            fields,
            diagnostics,
        }
    }
}
