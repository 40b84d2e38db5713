//! Schema extraction.

use super::{FormSchema, TextField};
use crate::codec::FormCodec;
use crate::config::FillConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Pulls the first form's text fields out of a document.
///
/// Only the first form is considered; a document with several forms is not
/// an error, the others are ignored.
pub struct FormSchemaExtractor<'a, C: FormCodec> {
    codec: &'a C,
    config: &'a FillConfig,
}

impl<'a, C: FormCodec> FormSchemaExtractor<'a, C> {
    /// Create an extractor over `codec`.
    pub fn new(codec: &'a C, config: &'a FillConfig) -> Self {
        Self { codec, config }
    }

    /// Extract the sorted schema of the document at `path`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file cannot be opened
    /// - `InvalidDocument` if it cannot be parsed
    /// - `NoForm` if the document has no form
    pub fn extract(&self, path: &Path) -> Result<FormSchema> {
        let handle = self.codec.open_and_validate(path, self.config)?;
        let forms = self.codec.export_form_fields(&handle)?;
        let form_count = forms.len();
        let first = forms.into_iter().next().ok_or(Error::NoForm)?;
        if form_count > 1 {
            log::debug!("{} has {} forms, using the first", path.display(), form_count);
        }

        let schema = FormSchema::new(first.text_fields.into_iter().map(TextField::from).collect());
        log::debug!("Extracted {} text fields from {}", schema.len(), path.display());
        Ok(schema)
    }
}
