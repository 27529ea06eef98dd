//! # Versions
//!
//! Two kinds of version strings appear in a resource description:
//!
//! - [`FormatVersion`]: the schema revision a document claims to conform
//!   to (`0.4.10`, `0.5.0`). Strictly `MAJOR.MINOR.PATCH`, totally ordered.
//!   Drives migration.
//! - [`Version`]: a library version (`pytorch_version: 1.15`,
//!   `tensorflow_version: "2.11.0rc1"`). Loosely checked; YAML often
//!   spells these as bare numbers, which are accepted and stringified.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::error::ValueError;
use crate::identifier::{impl_from_raw_str, impl_validating_deserialize};
use crate::loc::Loc;
use crate::raw::{type_name, FromRaw};

/// A `MAJOR.MINOR.PATCH` schema format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl_validating_deserialize!(FormatVersion);
impl_from_raw_str!(FormatVersion);

impl FormatVersion {
    /// Construct from components.
    pub const fn new_const(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Parse a `MAJOR.MINOR.PATCH` string.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidFormatVersion`] unless the string is
    /// exactly three dot-separated unsigned integers.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        let invalid = || ValueError::InvalidFormatVersion(s.clone());
        let mut parts = s.split('.');
        let mut next = || -> Result<u64, ValueError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let version = Self {
            major: next()?,
            minor: next()?,
            patch: next()?,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }

    /// Whether both versions share `MAJOR.MINOR`.
    pub fn same_series(&self, other: &FormatVersion) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for FormatVersion {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for FormatVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A library version string such as `1.15` or `2.0.1rc1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Version(String);

impl_validating_deserialize!(Version);

impl Version {
    /// Create a version, validating its shape.
    ///
    /// Must start with a digit and contain only ASCII letters, digits and
    /// `.`, `+`, `-`, `_`. No two dots may be adjacent and it may not end
    /// with a dot.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidVersion`] otherwise.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        let starts_with_digit = s.chars().next().is_some_and(|c| c.is_ascii_digit());
        let allowed = s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_'));
        if !starts_with_digit || !allowed || s.contains("..") || s.ends_with('.') {
            return Err(ValueError::InvalidVersion(s));
        }
        Ok(Self(s))
    }

    /// Keep a version string without validating it.
    ///
    /// Used for fields where an invalid version is only advisory and the
    /// original text must survive a dump.
    pub fn unvalidated(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text of a raw version node: strings as-is, numbers stringified.
    pub fn raw_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRaw for Version {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let Some(text) = Self::raw_text(value) else {
            diag.error(
                loc,
                format!("expected a version string, got {}", type_name(value)),
            );
            return None;
        };
        match Self::new(text) {
            Ok(v) => Some(v),
            Err(e) => {
                diag.error(loc, e.to_string());
                None
            }
        }
    }
}
