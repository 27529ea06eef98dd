//! # Validate Subcommand
//!
//! Validates one document and prints its summary, as text or as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use rdfkit_core::Diagnostics;
use rdfkit_validate::{load_document, ValidationConfig, ValidationSummary, Validator};

use crate::{io_checks, resolve_context, EXIT_FAILED, EXIT_PASSED};

/// Arguments for `rdfkit validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// The document (YAML or JSON).
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Base URL or directory for relative sources. Defaults to the
    /// document's directory.
    #[arg(long)]
    pub root: Option<String>,

    /// Validate as the latest format version without reporting migration.
    #[arg(long)]
    pub as_latest: bool,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the validate subcommand.
///
/// Returns exit code 0 when the document passed and 1 when it failed.
pub fn run_validate(args: &ValidateArgs, config: ValidationConfig) -> Result<u8> {
    let summary = validate_file(args, config)?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to serialize summary")?
        );
    } else {
        print!("{summary}");
    }
    Ok(if summary.is_passed() {
        EXIT_PASSED
    } else {
        EXIT_FAILED
    })
}

/// Load and validate the document named by `args`.
///
/// With `perform_io_checks` enabled, declared checksums of local files are
/// verified as well.
pub fn validate_file(args: &ValidateArgs, config: ValidationConfig) -> Result<ValidationSummary> {
    let io_checks = config.perform_io_checks;
    let validator = Validator::new(config).context("invalid configuration")?;
    let raw = load_document(&args.path)?;
    let ctx = resolve_context(&args.path, args.root.as_deref());
    let (summary, model) = validator
        .validate_document(&raw, &ctx, args.as_latest)
        .with_context(|| format!("cannot validate {}", args.path.display()))?;

    let Some(model) = model.filter(|_| io_checks) else {
        return Ok(summary);
    };
    let mut diag = Diagnostics::new();
    io_checks::check_local_files(&model, &ctx, &mut diag);
    if !diag.has_errors() {
        return Ok(summary);
    }
    let (io_errors, _) = diag.into_parts();
    let ValidationSummary {
        name,
        format_version,
        mut errors,
        warnings,
        ..
    } = summary;
    errors.extend(io_errors);
    Ok(ValidationSummary::new(name, format_version, errors, warnings))
}
