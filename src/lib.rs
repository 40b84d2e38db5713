// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Formfill
//!
//! Form synchronization and document regeneration for fillable PDFs.
//!
//! ## Core Features
//!
//! - **Schema Extraction**: Text fields of a document's form, sorted by name
//! - **Merging**: Caller values joined to schema fields by exact name, misses reported
//!   as diagnostics
//! - **Regeneration**: Open, strip signatures, fill, rebuild widget appearances,
//!   validate and serialize through a pluggable [`FormCodec`]
//! - **Sessions**: One selected source and at most one generated artifact on disk,
//!   replaced atomically
//!
//! ## Architecture
//!
//! - [`codec`]: the document boundary, with an AcroForm implementation over `lopdf`
//! - [`form`]: [`FormSchema`], [`FormSchemaExtractor`] and [`FieldMerger`]
//! - [`regenerate`]: the [`DocumentRegenerator`] pipeline
//! - [`session`]: [`DocumentSession`] lifecycle and change notifications
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_formfill::{DocumentSession, FieldValues, FillConfig};
//!
//! # fn main() -> pdf_formfill::Result<()> {
//! let session = DocumentSession::new(FillConfig::default());
//! session.select_source("application.pdf")?;
//!
//! // Inspect the form
//! let schema = session.extract_schema()?;
//! println!("{}", schema);
//!
//! // Fill by name; the generated file becomes the preview target
//! let values: FieldValues = [("Name", "Alice"), ("Email", "alice@example.com")]
//!     .into_iter()
//!     .collect();
//! session.submit_values(&values)?;
//! session.export_current("application-filled.pdf")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Document codec boundary
pub mod codec;

// Schema extraction and merging
pub mod form;

// Regeneration pipeline
pub mod regenerate;

// Session lifecycle
pub mod session;

// Re-exports
pub use codec::{FieldFlags, FormCodec, LopdfCodec, RawField, RawForm};
pub use config::{FillConfig, ValidationMode};
pub use error::{Error, Result};
pub use form::{
    FieldMerger, FieldValues, FormSchema, FormSchemaExtractor, MergeDiagnostic, MergedFields,
    TextField, ValueSource,
};
pub use regenerate::DocumentRegenerator;
pub use session::{DocumentSession, LogObserver, SessionEvent, SessionObserver, SessionPhase};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
