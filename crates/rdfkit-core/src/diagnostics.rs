//! # Diagnostics Accumulator
//!
//! Collects located errors and warnings during a validation run. Every
//! parser and cross-field check writes into the same accumulator, so a run
//! reports the whole document's problems rather than the first one.
//!
//! Warnings never influence whether a document is valid.

use std::fmt;

use serde::Serialize;

use crate::loc::Loc;

/// Category of an error entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A literal value does not match its declared type, shape or constraint.
    Structural,
    /// An axis size reference does not resolve to an addressable axis.
    CrossReference,
}

/// A located validation error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    /// Path to the violating field.
    pub loc: Loc,
    /// Human-readable description.
    pub msg: String,
    /// Error category.
    pub kind: ErrorKind,
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.msg)
    }
}

/// A located advisory warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningEntry {
    /// Path to the field the warning is about.
    pub loc: Loc,
    /// Human-readable description.
    pub msg: String,
}

impl fmt::Display for WarningEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.msg)
    }
}

/// Ordered error and warning lists for one validation run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    errors: Vec<ErrorEntry>,
    warnings: Vec<WarningEntry>,
}

impl Diagnostics {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a structural error.
    pub fn error(&mut self, loc: &Loc, msg: impl Into<String>) {
        self.errors.push(ErrorEntry {
            loc: loc.clone(),
            msg: msg.into(),
            kind: ErrorKind::Structural,
        });
    }

    /// Record a cross-reference error.
    pub fn cross_reference_error(&mut self, loc: &Loc, msg: impl Into<String>) {
        self.errors.push(ErrorEntry {
            loc: loc.clone(),
            msg: msg.into(),
            kind: ErrorKind::CrossReference,
        });
    }

    /// Record an advisory warning.
    pub fn warning(&mut self, loc: &Loc, msg: impl Into<String>) {
        self.warnings.push(WarningEntry {
            loc: loc.clone(),
            msg: msg.into(),
        });
    }

    /// Errors recorded so far, in order.
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Warnings recorded so far, in order.
    pub fn warnings(&self) -> &[WarningEntry] {
        &self.warnings
    }

    /// Whether any error has been recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of recorded errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Consume and return `(errors, warnings)`.
    pub fn into_parts(self) -> (Vec<ErrorEntry>, Vec<WarningEntry>) {
        (self.errors, self.warnings)
    }
}
