//! # rdfkit-cli: Command-Line Interface
//!
//! The `rdfkit` binary.
//!
//! ## Subcommands
//!
//! - `rdfkit validate` validates a document and prints a report.
//! - `rdfkit migrate` prints a document migrated to the latest format.
//! - `rdfkit dump` prints the normalized form of a valid document.
//!
//! ```bash
//! rdfkit validate models/unet/rdf.yaml
//! rdfkit validate rdf.yaml --root https://example.org/models/unet/ --json
//! rdfkit migrate rdf.yaml > rdf.0_5.yaml
//! rdfkit -vv --config rdfkit.yaml dump rdf.yaml
//! ```
//!
//! ## Exit Codes
//!
//! `0` when the document passed, `1` when it failed validation, `2` when it
//! could not be processed at all.

pub mod dump;
pub mod io_checks;
pub mod migrate;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};

use rdfkit_core::ResolutionRoot;
use rdfkit_validate::{ValidationConfig, ValidationContext};

/// Exit code for a document that passed.
pub const EXIT_PASSED: u8 = 0;
/// Exit code for a document that failed validation.
pub const EXIT_FAILED: u8 = 1;
/// Exit code for anything that prevented validation.
pub const EXIT_ERROR: u8 = 2;

/// Load the configuration file if one was given, else the defaults.
/// Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    match path {
        Some(path) => ValidationConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => ValidationConfig::from_env().context("invalid configuration in environment"),
    }
}

/// The resolution context for `document`: `root` if given, else the
/// document's directory.
pub fn resolve_context(document: &Path, root: Option<&str>) -> ValidationContext {
    match root {
        Some(root) => ValidationContext::new(ResolutionRoot::parse(root)),
        None => ValidationContext::for_document_path(document),
    }
}
