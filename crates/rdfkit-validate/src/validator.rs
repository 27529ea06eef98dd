//! # Validation Orchestrator
//!
//! One run: migrate a copy of the raw document, parse it with both passes,
//! and package the diagnostics into a [`ValidationSummary`].
//!
//! ## Forward Compatibility
//!
//! A document declaring a format version newer than the configured latest
//! is validated as the latest version. The rewrite happens on the copy and
//! is reported as a warning at `format_version`.

use serde_json::Value;
use tracing::{debug, info};

use rdfkit_core::{raw::type_name, Diagnostics, Loc};
use rdfkit_migrate::{declared_version, MigrationChain, MigrationOutcome};
use rdfkit_model::{Model, ParseOptions};

use crate::config::{ConfigError, ValidationConfig};
use crate::context::ValidationContext;
use crate::loader::LoadError;
use crate::summary::ValidationSummary;

/// Validates raw documents against one configuration.
///
/// Holds no per-run state; one validator may serve many documents.
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
    chain: MigrationChain,
}

impl Validator {
    /// Build a validator for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormatVersion`] if the configured
    /// latest version is outside the series the model parser implements.
    pub fn new(config: ValidationConfig) -> Result<Self, ConfigError> {
        let supported = ParseOptions::FORMAT_VERSION;
        if !config.latest_format_version.same_series(&supported) {
            return Err(ConfigError::UnsupportedFormatVersion {
                version: config.latest_format_version,
                supported: format!("{}.{}", supported.major, supported.minor),
            });
        }
        let chain = MigrationChain::new(
            config.latest_format_version,
            MigrationChain::standard().steps().to_vec(),
        )?;
        Ok(Self { config, chain })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate `raw`, producing a summary.
    ///
    /// `as_latest` requests migration to the latest format version. Older
    /// documents are migrated either way; without `as_latest` a migration
    /// is additionally reported as a warning.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotAMapping`] if `raw` is not a mapping. Every
    /// other problem is reported in the summary.
    pub fn validate(
        &self,
        raw: &Value,
        ctx: &ValidationContext,
        as_latest: bool,
    ) -> Result<ValidationSummary, LoadError> {
        self.validate_document(raw, ctx, as_latest)
            .map(|(summary, _)| summary)
    }

    /// Like [`validate`](Self::validate), also returning the model when the
    /// document passed.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotAMapping`] if `raw` is not a mapping.
    pub fn validate_document(
        &self,
        raw: &Value,
        ctx: &ValidationContext,
        as_latest: bool,
    ) -> Result<(ValidationSummary, Option<Model>), LoadError> {
        if !raw.is_object() {
            return Err(LoadError::NotAMapping {
                found: type_name(raw),
            });
        }
        debug!(root = %ctx.root, as_latest, "validating document");

        let latest = self.chain.latest();
        let mut diag = Diagnostics::new();
        let version_loc = Loc::from_fields(["format_version"]);

        let migration = self.chain.migrate(raw);
        debug!(migrated = migration.outcome.is_migrated(), "migration chain applied");
        let mut document = migration.document;
        match migration.outcome {
            MigrationOutcome::Migrated { from, to } if !as_latest => {
                diag.warning(
                    &version_loc,
                    format!("document was migrated from format version {from} to {to}"),
                );
            }
            MigrationOutcome::FutureVersion { declared, latest } => {
                diag.warning(
                    &version_loc,
                    format!(
                        "format version {declared} is newer than the latest known version {latest}; validating as {latest}"
                    ),
                );
                if let Value::Object(map) = &mut document {
                    map.insert(
                        "format_version".to_string(),
                        Value::String(latest.to_string()),
                    );
                }
            }
            MigrationOutcome::Unchanged | MigrationOutcome::Migrated { .. } => {}
        }

        let validated_as = match &document {
            Value::Object(map) => declared_version(map).unwrap_or(latest),
            _ => latest,
        };
        let name = document
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);

        let model = Model::parse(&document, &self.config.parse_options(), &mut diag);
        let (errors, warnings) = diag.into_parts();
        let summary = ValidationSummary::new(name, validated_as, errors, warnings);
        info!(
            status = %summary.status,
            errors = summary.errors.len(),
            warnings = summary.warnings.len(),
            "validation finished"
        );
        Ok((summary, model))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            config: ValidationConfig::default(),
            chain: MigrationChain::standard(),
        }
    }
}

/// Validate `raw` with the default configuration.
///
/// # Errors
///
/// Returns [`LoadError::NotAMapping`] if `raw` is not a mapping.
pub fn validate_format(
    raw: &Value,
    ctx: &ValidationContext,
    as_latest: bool,
) -> Result<ValidationSummary, LoadError> {
    Validator::default().validate(raw, ctx, as_latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdfkit_core::FormatVersion;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "format_version": "0.5.0",
            "type": "model",
            "name": "tiny",
            "description": "",
            "authors": [{"name": "Ada"}],
            "license": "MIT",
            "inputs": [{
                "name": "raw",
                "test_tensor": "raw.npy",
                "values": {"type": "interval", "data_type": "float32"},
                "axes": [{"type": "batch"}, {"type": "space", "name": "x", "size": 64}],
            }],
            "outputs": [{
                "name": "mask",
                "test_tensor": "mask.npy",
                "values": {"type": "interval", "data_type": "float32"},
                "axes": [{"type": "batch"}, {"type": "space", "name": "x", "size": {"reference": "raw.x"}}],
            }],
            "weights": {"onnx": {"source": "model.onnx", "opset_version": 15}},
        })
    }

    fn locs<'a>(entries: impl Iterator<Item = &'a Loc>) -> Vec<String> {
        entries.map(|l| l.to_string()).collect()
    }

    #[test]
    fn minimal_document_passes() {
        let summary = validate_format(&minimal(), &ValidationContext::default(), false).unwrap();
        assert!(summary.is_passed(), "{:?}", summary.errors);
        assert_eq!(summary.name.as_deref(), Some("tiny"));
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn future_version_warns_and_validates_as_latest() {
        let mut raw = minimal();
        raw["format_version"] = json!("0.6.2");
        let summary = validate_format(&raw, &ValidationContext::default(), false).unwrap();
        assert!(summary.is_passed(), "{:?}", summary.errors);
        assert_eq!(summary.format_version, FormatVersion::new_const(0, 5, 0));
        assert_eq!(locs(summary.warnings.iter().map(|w| &w.loc)), vec!["format_version"]);
        assert_eq!(raw["format_version"], "0.6.2");
    }

    #[test]
    fn wrong_author_type_is_one_error() {
        let mut raw = minimal();
        raw["authors"] = json!(42);
        let summary = validate_format(&raw, &ValidationContext::default(), true).unwrap();
        assert!(!summary.is_passed());
        assert_eq!(locs(summary.errors.iter().map(|e| &e.loc)), vec!["authors"]);
    }

    #[test]
    fn non_mapping_is_a_boundary_error() {
        let err = validate_format(&json!(["not", "a", "mapping"]), &ValidationContext::default(), true)
            .unwrap_err();
        assert!(matches!(err, LoadError::NotAMapping { found: "a list" }));
    }

    #[test]
    fn unsupported_latest_is_rejected() {
        let config = ValidationConfig {
            latest_format_version: FormatVersion::new_const(0, 6, 0),
            ..ValidationConfig::default()
        };
        assert!(matches!(
            Validator::new(config),
            Err(ConfigError::UnsupportedFormatVersion { .. })
        ));
    }

    #[test]
    fn name_limit_comes_from_config() {
        let validator = Validator::new(ValidationConfig {
            name_max_len: 3,
            ..ValidationConfig::default()
        })
        .unwrap();
        let summary = validator
            .validate(&minimal(), &ValidationContext::default(), false)
            .unwrap();
        assert!(summary.is_passed());
        assert_eq!(locs(summary.warnings.iter().map(|w| &w.loc)), vec!["name"]);
    }
}
