//! Document session: the selected source and the current generated artifact.
//!
//! A session owns at most one generated artifact on disk at a time. A new
//! artifact is fully written and synced before it replaces the previous one,
//! and the previous one is deleted only after the replacement is committed.
//! A failed regeneration leaves the session exactly as it was.
//!
//! # Example
//!
//! ```ignore
//! use pdf_formfill::{DocumentSession, FillConfig, FormSchema};
//!
//! let session = DocumentSession::new(FillConfig::default());
//! session.select_source("form.pdf")?;
//!
//! let mut schema = session.extract_schema()?;
//! schema.text_fields[0].value = "Alice".to_string();
//! let artifact = session.submit_form(&schema)?;
//! ```

mod events;

pub use events::{LogObserver, SessionEvent, SessionObserver};

use crate::codec::{FormCodec, LopdfCodec};
use crate::config::FillConfig;
use crate::error::{Error, Result};
use crate::form::{
    FieldMerger, FieldValues, FormSchema, FormSchemaExtractor, MergedFields, ValueSource,
};
use crate::regenerate::DocumentRegenerator;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing selected
    Empty,
    /// A source is selected, nothing generated from it yet
    SourceSelected,
    /// A generated artifact is current
    Generated,
}

#[derive(Debug, Default)]
struct SessionState {
    selected_source: Option<PathBuf>,
    generated_artifact: Option<PathBuf>,
}

impl SessionState {
    fn phase(&self) -> SessionPhase {
        match (&self.selected_source, &self.generated_artifact) {
            (_, Some(_)) => SessionPhase::Generated,
            (Some(_), None) => SessionPhase::SourceSelected,
            (None, None) => SessionPhase::Empty,
        }
    }

    fn preview_target(&self) -> Result<PathBuf> {
        self.generated_artifact
            .as_ref()
            .or(self.selected_source.as_ref())
            .cloned()
            .ok_or(Error::NoFileSelected)
    }
}

/// Stateful controller for one user's form-filling session.
pub struct DocumentSession<C: FormCodec = LopdfCodec> {
    codec: C,
    config: FillConfig,
    state: Mutex<SessionState>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl DocumentSession<LopdfCodec> {
    /// Create a session backed by the lopdf codec.
    pub fn new(config: FillConfig) -> Self {
        Self::with_codec(LopdfCodec, config)
    }
}

impl<C: FormCodec> DocumentSession<C> {
    /// Create a session over a specific codec.
    pub fn with_codec(codec: C, config: FillConfig) -> Self {
        Self {
            codec,
            config,
            state: Mutex::new(SessionState::default()),
            observers: Vec::new(),
        }
    }

    /// Register an observer for [`SessionEvent`]s.
    pub fn with_observer(mut self, observer: impl SessionObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Session configuration.
    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    /// Select a new source document.
    ///
    /// Clears the generated artifact and deletes its file. The new selection
    /// is committed even if that deletion fails, in which case
    /// `ArtifactCleanupFailed` is returned.
    pub fn select_source(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let cleanup = {
            let mut state = self.lock_state();
            let previous = state.generated_artifact.take();
            log::info!("Selected source {}", path.display());
            state.selected_source = Some(path);
            previous.map_or(Ok(()), |old| remove_artifact(&old))
        };

        self.notify(SessionEvent::PreviewChanged);
        self.notify(SessionEvent::FormChanged);
        cleanup
    }

    /// Fill the selected source with the values of `values`, matched by name.
    ///
    /// Returns the path of the new artifact.
    pub fn submit_form(&self, values: &FormSchema) -> Result<PathBuf> {
        self.submit_values(&FieldValues::from_schema(values))
    }

    /// Fill the selected source with values keyed by field name.
    pub fn submit_values(&self, values: &FieldValues) -> Result<PathBuf> {
        let artifact = self.submit(ValueSource::Values(values));
        if committed(&artifact) {
            self.notify(SessionEvent::PreviewChanged);
        }
        artifact
    }

    /// Fill every field of the selected source with its own name.
    pub fn submit_field_name_fill(&self) -> Result<PathBuf> {
        let artifact = self.submit(ValueSource::FieldNames);
        if committed(&artifact) {
            self.notify(SessionEvent::PreviewChanged);
            self.notify(SessionEvent::FormChanged);
        }
        artifact
    }

    /// The generated artifact if there is one, else the selected source.
    pub fn current_preview_target(&self) -> Result<PathBuf> {
        self.lock_state().preview_target()
    }

    /// Schema of the current preview target.
    pub fn extract_schema(&self) -> Result<FormSchema> {
        let state = self.lock_state();
        let target = state.preview_target()?;
        FormSchemaExtractor::new(&self.codec, &self.config).extract(&target)
    }

    /// Base64 of the current preview target's bytes.
    pub fn preview_content(&self) -> Result<String> {
        let state = self.lock_state();
        let target = state.preview_target()?;
        let bytes = fs::read(&target).map_err(|source| Error::NotFound {
            path: target.clone(),
            source,
        })?;
        Ok(STANDARD.encode(bytes))
    }

    /// Copy the current preview target to `dest`. Returns the bytes copied.
    pub fn export_current(&self, dest: impl AsRef<Path>) -> Result<u64> {
        let state = self.lock_state();
        let target = state.preview_target()?;
        let copied = fs::copy(&target, dest.as_ref())?;
        log::info!("Exported {} to {}", target.display(), dest.as_ref().display());
        Ok(copied)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase()
    }

    /// Selected source document, if any.
    pub fn selected_source(&self) -> Option<PathBuf> {
        self.lock_state().selected_source.clone()
    }

    /// Current generated artifact, if any.
    pub fn generated_artifact(&self) -> Option<PathBuf> {
        self.lock_state().generated_artifact.clone()
    }

    fn submit(&self, source: ValueSource<'_>) -> Result<PathBuf> {
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::WouldBlock) => return Err(Error::Busy),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        let selected = state.selected_source.clone().ok_or(Error::NoFileSelected)?;

        let schema = FormSchemaExtractor::new(&self.codec, &self.config).extract(&selected)?;
        let merged = FieldMerger::merge(&schema, source);
        if !merged.diagnostics().is_empty() {
            log::warn!(
                "{} of {} field(s) had no submitted value",
                merged.diagnostics().len(),
                merged.len()
            );
        }

        let artifact = self.write_artifact(&selected, &merged)?;
        log::info!("Generated {}", artifact.display());
        if let Some(previous) = state.generated_artifact.replace(artifact.clone()) {
            remove_artifact(&previous)?;
        }
        Ok(artifact)
    }

    /// Regenerate into a fresh temp file and persist it.
    ///
    /// The temp file is removed on any failure.
    fn write_artifact(&self, source: &Path, merged: &MergedFields) -> Result<PathBuf> {
        let dir = self.config.artifact_dir();
        let mut temp = tempfile::Builder::new()
            .prefix(&format!("{}-", self.config.artifact_prefix))
            .suffix(".pdf")
            .tempfile_in(&dir)?;

        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            DocumentRegenerator::new(&self.codec, &self.config).regenerate_to(
                source,
                merged,
                &mut writer,
            )?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        let (_file, path) = temp.keep().map_err(|e| Error::Io(e.error))?;
        Ok(path)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: SessionEvent) {
        for observer in &self.observers {
            observer.notify(event);
        }
    }
}

impl<C: FormCodec> Drop for DocumentSession<C> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(artifact) = state.generated_artifact.take() {
            if let Err(e) = remove_artifact(&artifact) {
                log::warn!("{}", e);
            }
        }
    }
}

/// Whether a submit replaced the generated artifact.
fn committed(result: &Result<PathBuf>) -> bool {
    matches!(result, Ok(_) | Err(Error::ArtifactCleanupFailed { .. }))
}

/// Delete an artifact; one that is already gone counts as deleted.
fn remove_artifact(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed {}", path.display());
            Ok(())
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} was already removed", path.display());
            Ok(())
        },
        Err(source) => Err(Error::ArtifactCleanupFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}
