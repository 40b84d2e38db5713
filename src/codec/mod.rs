//! Document codec boundary.
//!
//! The engine never touches document internals directly. Everything it needs
//! from a document (opening, exporting raw field descriptors, stripping
//! signatures, writing values, rebuilding widgets, serializing) goes through
//! [`FormCodec`].
//!
//! [`LopdfCodec`] is the production implementation for AcroForm PDFs.

mod appearance;
mod encoding;
mod lopdf_codec;

#[cfg(test)]
pub(crate) mod testing;

pub use appearance::TextAppearance;
pub use lopdf_codec::{LopdfCodec, LopdfHandle};

use crate::config::{FillConfig, ValidationMode};
use crate::error::Result;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

bitflags! {
    /// Text field flags from the /Ff entry.
    ///
    /// Per PDF spec Table 221 (common flags) and Table 228 (text field flags).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u32 {
        /// Bit 1: Field is read-only
        const READ_ONLY = 1 << 0;
        /// Bit 2: Field is required
        const REQUIRED = 1 << 1;
        /// Bit 3: Field should not be exported
        const NO_EXPORT = 1 << 2;
        /// Bit 13: Text may include multiple lines
        const MULTILINE = 1 << 12;
        /// Bit 14: Text should be displayed as asterisks
        const PASSWORD = 1 << 13;
        /// Bit 24: Text should not scroll beyond visible area
        const DO_NOT_SCROLL = 1 << 23;
        /// Bit 25: Field is divided into equally spaced positions
        const COMB = 1 << 24;
    }
}

/// A raw text field descriptor as exported by a codec.
///
/// `id` is codec-assigned and only meaningful to the codec that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    /// Codec-assigned identifier
    pub id: String,
    /// Fully qualified field name
    pub name: String,
    /// Current value
    pub value: String,
    /// Field accepts multiple lines
    pub multiline: bool,
    /// Field is read-only
    pub locked: bool,
    /// 1-based numbers of the pages the field's widgets sit on
    pub pages: Vec<usize>,
}

/// The text fields of one form, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawForm {
    /// Text field descriptors
    pub text_fields: Vec<RawField>,
}

impl RawForm {
    /// Sorted, deduplicated pages holding any of this form's widgets.
    pub fn pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self
            .text_fields
            .iter()
            .flat_map(|field| field.pages.iter().copied())
            .collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

/// Low-level document operations the engine drives.
///
/// Implementations own the document format; the engine owns ordering and
/// error policy. A handle is exclusively owned by one pipeline run.
pub trait FormCodec: Send + Sync {
    /// Parsed, mutable document.
    type Handle;

    /// Open `path`, optimize according to `config` and validate.
    ///
    /// Fails with `NotFound` when the file cannot be read and with
    /// `InvalidDocument` when it cannot be parsed or does not validate.
    fn open_and_validate(&self, path: &Path, config: &FillConfig) -> Result<Self::Handle>;

    /// Number of pages in the document.
    fn page_count(&self, handle: &Self::Handle) -> usize;

    /// Export the text fields of every form. An empty vector means no form.
    fn export_form_fields(&self, handle: &Self::Handle) -> Result<Vec<RawForm>>;

    /// Strip digital signatures. Returns how many signature values were removed.
    fn remove_signature(&self, handle: &mut Self::Handle) -> usize;

    /// Write the values of `form` into the document. Returns how many fields were written.
    fn fill_form_fields(&self, handle: &mut Self::Handle, form: &RawForm) -> Result<usize>;

    /// Rebuild page and widget structures so the filled values render.
    fn rebuild_page_tree(&self, handle: &mut Self::Handle, form: &RawForm) -> Result<()>;

    /// Validate the document in its current state.
    fn validate(&self, handle: &Self::Handle, mode: ValidationMode) -> Result<()>;

    /// Serialize the document into `sink`.
    fn serialize(&self, handle: &mut Self::Handle, sink: &mut dyn Write) -> Result<()>;
}
