//! # Migrate Subcommand
//!
//! Prints a document migrated to the latest (or a chosen) format version as
//! YAML. The input file is not modified.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;

use rdfkit_core::FormatVersion;
use rdfkit_migrate::{MigrationChain, MigrationOutcome};
use rdfkit_validate::{load_document, ValidationConfig};

use crate::EXIT_PASSED;

/// Arguments for `rdfkit migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// The document (YAML or JSON).
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Stop at this format version instead of the latest.
    #[arg(long, value_name = "VERSION")]
    pub to: Option<FormatVersion>,
}

/// Execute the migrate subcommand.
pub fn run_migrate(args: &MigrateArgs, config: &ValidationConfig) -> Result<u8> {
    let migrated = migrate_file(args, config)?;
    print!(
        "{}",
        serde_yaml::to_string(&migrated).context("failed to serialize migrated document")?
    );
    Ok(EXIT_PASSED)
}

/// Load and migrate the document named by `args`.
pub fn migrate_file(args: &MigrateArgs, config: &ValidationConfig) -> Result<Value> {
    let raw = load_document(&args.path)?;
    if !raw.is_object() {
        bail!("{} does not contain a mapping", args.path.display());
    }
    let chain = MigrationChain::new(
        config.latest_format_version,
        MigrationChain::standard().steps().to_vec(),
    )?;
    let target = args.to.unwrap_or(chain.latest());
    let migration = chain.migrate_to(&raw, target)?;
    match migration.outcome {
        MigrationOutcome::Migrated { from, to } => {
            tracing::info!(%from, %to, "migrated document");
        }
        MigrationOutcome::Unchanged => tracing::info!("document needed no migration"),
        MigrationOutcome::FutureVersion { declared, latest } => {
            tracing::warn!(%declared, %latest, "document is newer than any known format version");
        }
    }
    Ok(migration.document)
}
