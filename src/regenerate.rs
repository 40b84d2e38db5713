//! Document regeneration pipeline.
//!
//! Drives a [`FormCodec`] through open, export, merge, signature removal,
//! fill, rebuild, validation and serialization. Every stage is fatal on
//! failure and nothing is retried; bytes only leave the pipeline once the
//! whole document has been produced.

use crate::codec::{FormCodec, RawForm};
use crate::config::FillConfig;
use crate::error::{Error, Result};
use crate::form::MergedFields;
use std::io::Write;
use std::path::Path;

/// Produces a new document from a source and a merged field set.
pub struct DocumentRegenerator<'a, C: FormCodec> {
    codec: &'a C,
    config: &'a FillConfig,
}

impl<'a, C: FormCodec> DocumentRegenerator<'a, C> {
    /// Create a regenerator over `codec`.
    pub fn new(codec: &'a C, config: &'a FillConfig) -> Self {
        Self { codec, config }
    }

    /// Regenerate `source` with `merged` values and return the new document.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `InvalidDocument` when the source cannot be opened
    /// - `EmptyDocument` when it has no pages
    /// - `NoForm` when it has no form
    /// - `NoFieldsAffected` when there is nothing to write
    /// - `RebuildFailed` when widgets cannot be rebuilt
    pub fn regenerate(&self, source: &Path, merged: &MergedFields) -> Result<Vec<u8>> {
        let mut handle = self.prepare(source, merged)?;
        let mut bytes = Vec::new();
        self.codec.serialize(&mut handle, &mut bytes)?;
        log::info!("Regenerated {} ({} bytes)", source.display(), bytes.len());
        Ok(bytes)
    }

    /// Like [`regenerate`](Self::regenerate), but serializes into `sink`.
    ///
    /// Nothing is written to `sink` unless every stage before serialization
    /// succeeded. A serialization failure may leave partial output behind;
    /// the caller owns discarding it.
    pub fn regenerate_to(
        &self,
        source: &Path,
        merged: &MergedFields,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let mut handle = self.prepare(source, merged)?;
        self.codec.serialize(&mut handle, sink)?;
        log::info!("Regenerated {}", source.display());
        Ok(())
    }

    /// Stages 1 to 8: everything but serialization.
    fn prepare(&self, source: &Path, merged: &MergedFields) -> Result<C::Handle> {
        let codec = self.codec;
        let mut handle = codec.open_and_validate(source, self.config)?;

        if codec.page_count(&handle) == 0 {
            return Err(Error::EmptyDocument);
        }

        let mut form = codec
            .export_form_fields(&handle)?
            .into_iter()
            .next()
            .ok_or(Error::NoForm)?;
        if form.text_fields.is_empty() {
            return Err(Error::NoFieldsAffected);
        }

        apply_merged(&mut form, merged);

        let removed = codec.remove_signature(&mut handle);
        if removed > 0 {
            log::info!("Stripped {} signature(s) from {}", removed, source.display());
        }

        let written = codec.fill_form_fields(&mut handle, &form)?;
        if written == 0 {
            return Err(Error::NoFieldsAffected);
        }
        log::debug!("Filled {} field(s) on page(s) {:?}", written, form.pages());

        codec.rebuild_page_tree(&mut handle, &form)?;

        if self.config.validation.is_enabled() {
            codec.validate(&handle, self.config.validation)?;
        }
        Ok(handle)
    }
}

/// Overwrite raw values with merged ones, matching by name.
fn apply_merged(form: &mut RawForm, merged: &MergedFields) {
    for field in &mut form.text_fields {
        match merged.value_for(&field.name) {
            Some(value) => field.value = value.to_string(),
            None => log::warn!("No merged value for field '{}', keeping original", field.name),
        }
    }
}
