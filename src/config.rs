//! Configuration for form filling.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default prefix for generated artifact file names.
pub const DEFAULT_ARTIFACT_PREFIX: &str = "pdf_formfill";

/// How thoroughly a document is checked when opened and after it is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Skip validation entirely
    None,
    /// Catalog, page tree and AcroForm must be well formed
    #[default]
    Relaxed,
    /// Relaxed checks plus every indirect reference must resolve
    Strict,
}

impl ValidationMode {
    /// Whether any validation runs in this mode.
    pub fn is_enabled(self) -> bool {
        self != ValidationMode::None
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationMode::None => "none",
            ValidationMode::Relaxed => "relaxed",
            ValidationMode::Strict => "strict",
        };
        f.write_str(name)
    }
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(ValidationMode::None),
            "relaxed" => Ok(ValidationMode::Relaxed),
            "strict" => Ok(ValidationMode::Strict),
            other => Err(format!("unknown validation mode '{}'", other)),
        }
    }
}

/// Form filling configuration.
#[derive(Debug, Clone)]
pub struct FillConfig {
    /// Validation applied when opening and after rebuilding.
    pub validation: ValidationMode,

    /// Prefix for generated artifact names (`<prefix>-<random>`).
    pub artifact_prefix: String,

    /// Directory for generated artifacts. `None` uses the system temp dir.
    pub artifact_dir: Option<PathBuf>,

    /// Prune unreferenced objects when opening the source.
    pub optimize: bool,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FillConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            validation: ValidationMode::default(),
            artifact_prefix: DEFAULT_ARTIFACT_PREFIX.to_string(),
            artifact_dir: None,
            optimize: true,
        }
    }

    /// Set the validation mode.
    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    /// Set the artifact name prefix.
    pub fn with_artifact_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.artifact_prefix = prefix.into();
        self
    }

    /// Write generated artifacts into `dir` instead of the system temp dir.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Enable or disable pruning of unreferenced objects.
    pub fn with_optimize(mut self, enable: bool) -> Self {
        self.optimize = enable;
        self
    }

    /// Directory generated artifacts are created in.
    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
