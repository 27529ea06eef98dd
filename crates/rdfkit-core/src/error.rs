//! # Error Types
//!
//! Construction errors for the constrained primitive types. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! A `ValueError` never escapes a validation run: the raw-tree walkers in
//! [`crate::raw`] convert it into a located diagnostic. Callers constructing
//! primitives directly (configuration loading, tests) get it as a plain
//! `Result` error.

use thiserror::Error;

/// A literal value does not satisfy the constraints of its declared type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Not an identifier (`[A-Za-z_][A-Za-z0-9_]*`).
    #[error("'{0}' is not a valid identifier; use letters, digits and '_' and do not start with a digit")]
    InvalidIdentifier(String),

    /// String exceeds the maximum length of its type.
    #[error("'{value}' is longer than {max} characters")]
    TooLong {
        /// The offending value.
        value: String,
        /// Maximum number of characters allowed.
        max: usize,
    },

    /// Empty string where content is required.
    #[error("value must not be empty")]
    Empty,

    /// Malformed axis reference token.
    #[error("'{0}' is not a valid axis reference; expected '<axis>' or '<tensor>.<axis>'")]
    InvalidAxisRef(String),

    /// Malformed `MAJOR.MINOR.PATCH` format version.
    #[error("'{0}' is not a valid format version; expected MAJOR.MINOR.PATCH")]
    InvalidFormatVersion(String),

    /// Malformed library version string.
    #[error("'{0}' is not a valid version")]
    InvalidVersion(String),

    /// Not a 64-character hex SHA-256 digest.
    #[error("'{value}' is not a valid SHA-256 digest: expected 64 hex characters, got {len} characters")]
    InvalidSha256 {
        /// The offending value.
        value: String,
        /// Its length in characters.
        len: usize,
    },

    /// License identifier is malformed.
    #[error("'{0}' is not a well-formed SPDX license identifier")]
    InvalidLicense(String),

    /// URL failed to parse or uses an unsupported scheme.
    #[error("invalid URL '{value}': {reason}")]
    InvalidUrl {
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Relative path is malformed.
    #[error("invalid file source '{value}': {reason}")]
    InvalidSource {
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Callable reference is malformed.
    #[error("invalid callable '{value}': {reason}")]
    InvalidCallable {
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// ORCID iD has the wrong shape or checksum.
    #[error("'{0}' is not a valid ORCID iD")]
    InvalidOrcid(String),

    /// E-mail address has the wrong shape.
    #[error("'{0}' is not a valid e-mail address")]
    InvalidEmail(String),
}
