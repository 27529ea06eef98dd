//! # rdfkit-migrate: Format Version Migration
//!
//! Brings raw resource descriptions written against an older format
//! version into the shape of the current one, before typed parsing.
//!
//! Migration works on raw trees because older and newer shapes differ in
//! ways no single typed model can represent: a 0.4 axis list is a letter
//! string, a 0.5 axis list is a sequence of mappings.
//!
//! ## Crate Policy
//!
//! - Steps never fail. Anything they do not recognize is left in place for
//!   validation to report.
//! - Steps are idempotent and only ever see a copy of the caller's document.
//! - Each applied step logs at `debug`; a document from a newer format
//!   version logs at `warn`.

pub mod chain;
pub mod v0_4;

pub use chain::{
    declared_version, Migration, MigrationChain, MigrationError, MigrationOutcome, MigrationStep,
    Transform, LATEST_FORMAT_VERSION,
};
