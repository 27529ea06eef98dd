//! Parse-time knobs shared by every document parser.

use rdfkit_core::FormatVersion;

/// Options that influence how a raw document is parsed.
///
/// Built by the orchestrator from its configuration; the model crate never
/// reads configuration on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// The format version this parser implements. Documents must declare a
    /// version of the same `MAJOR.MINOR` series.
    pub format_version: FormatVersion,
    /// Names longer than this produce an advisory warning.
    pub name_max_len: usize,
    /// Whether units outside the known vocabulary produce a warning.
    pub warn_unknown_units: bool,
}

impl ParseOptions {
    /// The format version implemented by this crate.
    pub const FORMAT_VERSION: FormatVersion = FormatVersion::new_const(0, 5, 0);
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            format_version: Self::FORMAT_VERSION,
            name_max_len: 64,
            warn_unknown_units: true,
        }
    }
}
