//! # Validation Summary
//!
//! The immutable result of one validation run. Warnings never influence
//! [`ValidationStatus`].

use std::fmt;

use serde::Serialize;

use rdfkit_core::{ErrorEntry, FormatVersion, WarningEntry};

/// Outcome of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Failed,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        })
    }
}

/// Result of validating one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    /// The document's name, if it was readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: ValidationStatus,
    /// The format version the document was validated as.
    pub format_version: FormatVersion,
    pub errors: Vec<ErrorEntry>,
    pub warnings: Vec<WarningEntry>,
}

impl ValidationSummary {
    /// Build a summary; the status follows from `errors`.
    pub fn new(
        name: Option<String>,
        format_version: FormatVersion,
        errors: Vec<ErrorEntry>,
        warnings: Vec<WarningEntry>,
    ) -> Self {
        let status = if errors.is_empty() {
            ValidationStatus::Passed
        } else {
            ValidationStatus::Failed
        };
        Self {
            name,
            status,
            format_version,
            errors,
            warnings,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == ValidationStatus::Passed
    }
}

/// Human-readable report: a status line, then errors and warnings.
impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.name.as_deref().unwrap_or("(unnamed document)");
        writeln!(f, "{title} (format {}): {}", self.format_version, self.status)?;
        if !self.errors.is_empty() {
            writeln!(f, "\nerrors ({}):", self.errors.len())?;
            for e in &self.errors {
                writeln!(f, "  - {e}")?;
            }
        }
        if !self.warnings.is_empty() {
            writeln!(f, "\nwarnings ({}):", self.warnings.len())?;
            for w in &self.warnings {
                writeln!(f, "  - {w}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdfkit_core::{Diagnostics, Loc};

    fn summary(errors: bool) -> ValidationSummary {
        let mut diag = Diagnostics::new();
        if errors {
            diag.error(&Loc::from_fields(["authors"]), "at least one author is required");
        }
        diag.warning(&Loc::from_fields(["name"]), "Name longer than 64 characters.");
        let (errors, warnings) = diag.into_parts();
        ValidationSummary::new(
            Some("UNet".to_string()),
            FormatVersion::new_const(0, 5, 0),
            errors,
            warnings,
        )
    }

    #[test]
    fn warnings_do_not_fail() {
        let s = summary(false);
        assert!(s.is_passed());
        assert_eq!(s.warnings.len(), 1);
    }

    #[test]
    fn report_lists_entries() {
        let report = summary(true).to_string();
        assert!(report.starts_with("UNet (format 0.5.0): failed\n"));
        assert!(report.contains("errors (1):\n  - authors: at least one author is required\n"));
        assert!(report.contains("warnings (1):\n  - name: Name longer than 64 characters.\n"));
    }

    #[test]
    fn clean_unnamed_report_is_one_line() {
        let s = ValidationSummary::new(None, FormatVersion::new_const(0, 5, 0), Vec::new(), Vec::new());
        assert_eq!(s.to_string(), "(unnamed document) (format 0.5.0): passed\n");
    }

    #[test]
    fn serializes_status_lowercase() {
        let json = serde_json::to_value(summary(true)).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["format_version"], "0.5.0");
        assert_eq!(json["errors"][0]["loc"], serde_json::json!(["authors"]));
    }
}
