//! # rdfkit-validate: Validation Orchestrator
//!
//! Turns a raw resource description into a [`ValidationSummary`]:
//! migration to the latest format version, structural parsing, and the
//! cross-tensor reference pass, in that order.
//!
//! - [`config`]: [`ValidationConfig`], loaded from YAML and the environment.
//! - [`context`]: where relative sources resolve.
//! - [`loader`]: reading JSON and YAML documents from disk.
//! - [`summary`]: the result of a run and its text report.
//! - [`validator`]: the orchestrator itself.
//!
//! ## Crate Policy
//!
//! - An invalid document is never an `Err`. Errors are reserved for the
//!   boundary: unreadable files, malformed syntax, a document that is not
//!   a mapping, and bad configuration.
//! - The caller's document is never mutated; migration works on a copy.
//! - No network or file access happens during validation itself.

pub mod config;
pub mod context;
pub mod loader;
pub mod summary;
pub mod validator;

pub use config::{ConfigError, ValidationConfig};
pub use context::ValidationContext;
pub use loader::{load_document, parse_yaml, LoadError};
pub use summary::{ValidationStatus, ValidationSummary};
pub use validator::{validate_format, Validator};
