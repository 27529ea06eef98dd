//! # Dump Subcommand
//!
//! Validates a document as the latest format version and prints its
//! normalized form: migrated, with defaults omitted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use rdfkit_validate::{load_document, ValidationConfig, ValidationSummary, Validator};

use crate::{resolve_context, EXIT_FAILED, EXIT_PASSED};

/// Arguments for `rdfkit dump`.
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// The document (YAML or JSON).
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Base URL or directory for relative sources.
    #[arg(long)]
    pub root: Option<String>,

    /// Print JSON instead of YAML.
    #[arg(long)]
    pub json: bool,
}

/// Execute the dump subcommand.
///
/// An invalid document prints its report to stderr and exits with 1.
pub fn run_dump(args: &DumpArgs, config: ValidationConfig) -> Result<u8> {
    match dump_file(args, config)? {
        Ok(document) => {
            let out = if args.json {
                serde_json::to_string_pretty(&document)?
            } else {
                serde_yaml::to_string(&document)?
            };
            print!("{out}");
            if args.json {
                println!();
            }
            Ok(EXIT_PASSED)
        }
        Err(summary) => {
            eprint!("{summary}");
            Ok(EXIT_FAILED)
        }
    }
}

/// The normalized document, or the failing summary if it is invalid.
pub fn dump_file(
    args: &DumpArgs,
    config: ValidationConfig,
) -> Result<std::result::Result<Value, ValidationSummary>> {
    let validator = Validator::new(config).context("invalid configuration")?;
    let raw = load_document(&args.path)?;
    let ctx = resolve_context(&args.path, args.root.as_deref());
    let (summary, model) = validator
        .validate_document(&raw, &ctx, true)
        .with_context(|| format!("cannot validate {}", args.path.display()))?;
    match model {
        Some(model) => Ok(Ok(model.dump().context("failed to serialize model")?)),
        None => Ok(Err(summary)),
    }
}
