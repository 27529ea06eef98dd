//! Validation configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Values load from YAML first, then environment overrides:
//!
//! - `RDFKIT_LATEST_FORMAT_VERSION`: the format version documents are
//!   migrated to and validated against.
//! - `RDFKIT_NAME_MAX_LEN`: names longer than this produce a warning.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rdfkit_core::FormatVersion;
use rdfkit_migrate::{MigrationError, LATEST_FORMAT_VERSION};
use rdfkit_model::ParseOptions;

/// Environment variable overriding [`ValidationConfig::latest_format_version`].
pub const ENV_LATEST_FORMAT_VERSION: &str = "RDFKIT_LATEST_FORMAT_VERSION";
/// Environment variable overriding [`ValidationConfig::name_max_len`].
pub const ENV_NAME_MAX_LEN: &str = "RDFKIT_NAME_MAX_LEN";

/// Settings of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// The current format version: documents below it are migrated, above
    /// it are validated as it with a warning.
    pub latest_format_version: FormatVersion,
    /// Names longer than this produce an advisory warning.
    pub name_max_len: usize,
    /// Whether units outside the known vocabulary produce a warning.
    pub warn_unknown_units: bool,
    /// Whether callers should check local files against declared checksums.
    /// The orchestrator itself never reads files.
    pub perform_io_checks: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            latest_format_version: LATEST_FORMAT_VERSION,
            name_max_len: 64,
            warn_unknown_units: true,
            perform_io_checks: false,
        }
    }
}

impl ValidationConfig {
    /// Defaults with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if an override does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Load a YAML configuration file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`] if the file
    /// cannot be read or parsed, and [`ConfigError::InvalidEnv`] for a bad
    /// override.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.with_overrides(|var| std::env::var(var).ok())
    }

    /// Parse a YAML configuration. An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns the YAML error for malformed input or unknown keys.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a value does not parse.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_LATEST_FORMAT_VERSION) {
            self.latest_format_version =
                FormatVersion::new(raw.trim()).map_err(|e| ConfigError::InvalidEnv {
                    var: ENV_LATEST_FORMAT_VERSION,
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(raw) = lookup(ENV_NAME_MAX_LEN) {
            self.name_max_len = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnv {
                    var: ENV_NAME_MAX_LEN,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(self)
    }

    /// Options for the model parser.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            format_version: self.latest_format_version,
            name_max_len: self.name_max_len,
            warn_unknown_units: self.warn_unknown_units,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("format version {version} is not supported; this build validates {supported}.x")]
    UnsupportedFormatVersion {
        version: FormatVersion,
        supported: String,
    },
    #[error(transparent)]
    Migration(#[from] MigrationError),
}
