//! # rdfkit-core: Foundational Types for Resource Description Validation
//!
//! This crate is the leaf of the rdfkit dependency graph. It defines the
//! constrained primitive types that every resource description field is
//! built from, plus the plumbing that lets a validation run accumulate
//! every violation instead of stopping at the first one.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for constrained strings.** `Identifier`, `ShortId`,
//!    `TensorId`, `Sha256`, `LicenseId`, `FormatVersion`. All are newtypes with
//!    validated constructors. No bare strings for schema vocabulary.
//!
//! 2. **Locators, not exceptions.** Every violation carries a [`Loc`] such
//!    as `inputs[0].axes[2].size` and lands in a [`Diagnostics`] accumulator.
//!    Parsing never unwinds on an invalid document.
//!
//! 3. **One raw tree type.** Raw documents are `serde_json::Value` trees
//!    regardless of whether they were read from YAML or JSON. The
//!    [`FromRaw`] trait and [`MappingReader`] walk them with strict
//!    unknown-field rejection.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rdfkit-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod checksum;
pub mod contact;
pub mod diagnostics;
pub mod error;
pub mod identifier;
pub mod license;
pub mod loc;
pub mod raw;
pub mod source;
pub mod units;
pub mod version;

// Re-export primary types for ergonomic imports.
pub use checksum::Sha256;
pub use contact::{Email, Orcid};
pub use diagnostics::{Diagnostics, ErrorEntry, ErrorKind, WarningEntry};
pub use error::ValueError;
pub use identifier::{AxisRef, Identifier, ShortId, StepWith, TensorId};
pub use license::{LicenseId, LicenseStatus};
pub use loc::{Loc, LocSegment};
pub use raw::{expect_mapping, parse_list, FromRaw, MappingReader, RawMapping};
pub use source::{CallableImport, CallableSource, FileSource, HttpUrl, ResolutionRoot, ResolvedSource};
pub use version::{FormatVersion, Version};
