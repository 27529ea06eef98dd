//! Resolution context for relative file references.

use rdfkit_core::{FileSource, ResolutionRoot, ResolvedSource, ValueError};

/// Where a document lives, so that its relative sources can be located.
///
/// Resolution is a string operation; nothing is fetched or opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    /// Base location relative sources resolve against.
    pub root: ResolutionRoot,
}

impl ValidationContext {
    pub fn new(root: ResolutionRoot) -> Self {
        Self { root }
    }

    /// Context for a document read from `path`: its parent directory.
    pub fn for_document_path(path: &std::path::Path) -> Self {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        Self::new(ResolutionRoot::from_dir(dir))
    }

    /// Resolve `source` against the root.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidUrl`] if the source cannot be joined
    /// onto a URL root.
    pub fn resolve(&self, source: &FileSource) -> Result<ResolvedSource, ValueError> {
        source.resolve(&self.root)
    }
}
