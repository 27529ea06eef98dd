//! # SPDX License Identifiers
//!
//! The license list itself is maintained outside this crate; the tables
//! below cover the identifiers seen in practice. An identifier that is
//! well-formed but not in the table is accepted with an advisory warning so
//! that a stale table never rejects a valid document.

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::error::ValueError;
use crate::identifier::impl_validating_deserialize;
use crate::loc::Loc;
use crate::raw::{parse_str_with, FromRaw};

/// Current SPDX identifiers recognized without a warning.
pub const KNOWN_LICENSES: &[&str] = &[
    "0BSD",
    "AFL-3.0",
    "AGPL-3.0-only",
    "AGPL-3.0-or-later",
    "Apache-1.1",
    "Apache-2.0",
    "Artistic-2.0",
    "BSD-1-Clause",
    "BSD-2-Clause",
    "BSD-2-Clause-Patent",
    "BSD-3-Clause",
    "BSD-3-Clause-Clear",
    "BSD-4-Clause",
    "BSL-1.0",
    "CC-BY-2.0",
    "CC-BY-3.0",
    "CC-BY-4.0",
    "CC-BY-NC-4.0",
    "CC-BY-NC-ND-4.0",
    "CC-BY-NC-SA-4.0",
    "CC-BY-ND-4.0",
    "CC-BY-SA-3.0",
    "CC-BY-SA-4.0",
    "CC0-1.0",
    "CDDL-1.0",
    "CECILL-2.1",
    "CECILL-B",
    "CECILL-C",
    "ECL-2.0",
    "EPL-1.0",
    "EPL-2.0",
    "EUPL-1.1",
    "EUPL-1.2",
    "GPL-2.0-only",
    "GPL-2.0-or-later",
    "GPL-3.0-only",
    "GPL-3.0-or-later",
    "ISC",
    "LGPL-2.0-only",
    "LGPL-2.0-or-later",
    "LGPL-2.1-only",
    "LGPL-2.1-or-later",
    "LGPL-3.0-only",
    "LGPL-3.0-or-later",
    "LPPL-1.3c",
    "MIT",
    "MIT-0",
    "MPL-1.1",
    "MPL-2.0",
    "MS-PL",
    "MS-RL",
    "NCSA",
    "ODbL-1.0",
    "OFL-1.1",
    "OSL-3.0",
    "PDDL-1.0",
    "PostgreSQL",
    "PSF-2.0",
    "Python-2.0",
    "Unlicense",
    "UPL-1.0",
    "W3C",
    "WTFPL",
    "X11",
    "Zlib",
    "ZPL-2.1",
];

/// Deprecated SPDX identifiers: accepted, with a warning.
pub const DEPRECATED_LICENSES: &[&str] = &[
    "AGPL-1.0",
    "AGPL-3.0",
    "BSD-2-Clause-FreeBSD",
    "BSD-2-Clause-NetBSD",
    "GFDL-1.1",
    "GFDL-1.2",
    "GFDL-1.3",
    "GPL-1.0",
    "GPL-1.0+",
    "GPL-2.0",
    "GPL-2.0+",
    "GPL-3.0",
    "GPL-3.0+",
    "LGPL-2.0",
    "LGPL-2.0+",
    "LGPL-2.1",
    "LGPL-2.1+",
    "LGPL-3.0",
    "LGPL-3.0+",
    "Nunit",
    "StandardML-NJ",
    "eCos-2.0",
    "wxWindows",
];

/// How an identifier relates to the known license tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    /// A current SPDX identifier.
    Known,
    /// A deprecated SPDX identifier.
    Deprecated,
    /// Well-formed but not in the tables.
    Unrecognized,
}

/// An SPDX license identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LicenseId(String);

impl_validating_deserialize!(LicenseId);

impl LicenseId {
    /// Create a license identifier, checking only that it is well-formed
    /// (non-empty; ASCII letters, digits, `.`, `-`, `+`).
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidLicense`] for malformed identifiers.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        let well_formed = !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'));
        if well_formed {
            Ok(Self(s))
        } else {
            Err(ValueError::InvalidLicense(s))
        }
    }

    /// Look the identifier up in the license tables.
    pub fn status(&self) -> LicenseStatus {
        if KNOWN_LICENSES.contains(&self.0.as_str()) {
            LicenseStatus::Known
        } else if DEPRECATED_LICENSES.contains(&self.0.as_str()) {
            LicenseStatus::Deprecated
        } else {
            LicenseStatus::Unrecognized
        }
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LicenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRaw for LicenseId {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let license = parse_str_with(value, loc, diag, |s| Self::new(s))?;
        match license.status() {
            LicenseStatus::Known => {}
            LicenseStatus::Deprecated => diag.warning(
                loc,
                format!("'{license}' is a deprecated SPDX license identifier"),
            ),
            LicenseStatus::Unrecognized => diag.warning(
                loc,
                format!("'{license}' is not a recognized SPDX license identifier"),
            ),
        }
        Some(license)
    }
}
