//! JSON-backed codec for unit tests.
//!
//! Documents are JSON files holding a page count and raw forms, so pipeline
//! and session behaviour can be exercised without real PDFs, and each stage
//! can be made to fail on demand.

use super::{FormCodec, RawField, RawForm};
use crate::config::{FillConfig, ValidationMode};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Barrier, Mutex, PoisonError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct JsonDocument {
    pub pages: usize,
    pub forms: Vec<RawForm>,
    #[serde(default)]
    pub signed: bool,
}

impl JsonDocument {
    /// One page, one form with the given `(name, value)` text fields.
    pub fn with_fields(fields: &[(&str, &str)]) -> Self {
        let text_fields = fields
            .iter()
            .enumerate()
            .map(|(i, (name, value))| RawField {
                id: (i + 1).to_string(),
                name: name.to_string(),
                value: value.to_string(),
                multiline: false,
                locked: false,
                pages: vec![1],
            })
            .collect();
        Self {
            pages: 1,
            forms: vec![RawForm { text_fields }],
            signed: false,
        }
    }

    pub fn write(&self, path: &Path) {
        fs::write(path, serde_json::to_vec(self).unwrap()).unwrap();
    }

    pub fn read(path: &Path) -> Self {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.forms
            .first()?
            .text_fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailStage {
    Open,
    Export,
    Fill,
    Rebuild,
    Validate,
    Serialize,
}

/// Blocks the first `open_and_validate` until the test releases it.
pub(crate) struct Gate {
    pub entered: Arc<Barrier>,
    pub release: Arc<Barrier>,
}

#[derive(Default)]
pub(crate) struct JsonCodec {
    fail_at: Option<FailStage>,
    gate: Mutex<Option<Gate>>,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(stage: FailStage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    pub fn with_gate(gate: Gate) -> Self {
        Self {
            fail_at: None,
            gate: Mutex::new(Some(gate)),
        }
    }

    fn fails(&self, stage: FailStage) -> bool {
        self.fail_at == Some(stage)
    }
}

impl FormCodec for JsonCodec {
    type Handle = JsonDocument;

    fn open_and_validate(&self, path: &Path, _config: &FillConfig) -> Result<JsonDocument> {
        let gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(gate) = gate {
            gate.entered.wait();
            gate.release.wait();
        }

        let bytes = fs::read(path).map_err(|source| Error::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        if self.fails(FailStage::Open) {
            return Err(Error::InvalidDocument("open failure".to_string()));
        }
        serde_json::from_slice(&bytes).map_err(|e| Error::InvalidDocument(e.to_string()))
    }

    fn page_count(&self, handle: &JsonDocument) -> usize {
        handle.pages
    }

    fn export_form_fields(&self, handle: &JsonDocument) -> Result<Vec<RawForm>> {
        if self.fails(FailStage::Export) {
            return Err(Error::InvalidDocument("export failure".to_string()));
        }
        Ok(handle.forms.clone())
    }

    fn remove_signature(&self, handle: &mut JsonDocument) -> usize {
        if std::mem::take(&mut handle.signed) {
            1
        } else {
            0
        }
    }

    fn fill_form_fields(&self, handle: &mut JsonDocument, form: &RawForm) -> Result<usize> {
        if self.fails(FailStage::Fill) {
            return Ok(0);
        }
        let target = match handle.forms.first_mut() {
            Some(target) => target,
            None => return Ok(0),
        };
        let mut written = 0;
        for field in form.text_fields.iter().filter(|f| !f.locked) {
            if let Some(existing) = target.text_fields.iter_mut().find(|f| f.id == field.id) {
                existing.value = field.value.clone();
                written += 1;
            }
        }
        Ok(written)
    }

    fn rebuild_page_tree(&self, _handle: &mut JsonDocument, _form: &RawForm) -> Result<()> {
        if self.fails(FailStage::Rebuild) {
            return Err(Error::RebuildFailed("rebuild failure".to_string()));
        }
        Ok(())
    }

    fn validate(&self, _handle: &JsonDocument, _mode: ValidationMode) -> Result<()> {
        if self.fails(FailStage::Validate) {
            return Err(Error::InvalidDocument("validation failure".to_string()));
        }
        Ok(())
    }

    fn serialize(&self, handle: &mut JsonDocument, sink: &mut dyn Write) -> Result<()> {
        if self.fails(FailStage::Serialize) {
            sink.write_all(b"{\"pages\":")?;
            return Err(Error::Io(std::io::Error::other("serialize failure")));
        }
        serde_json::to_writer(&mut *sink, &*handle)?;
        Ok(())
    }
}
