//! # File Sources and Resolution
//!
//! A resource description references files (test tensors, weights,
//! documentation, architecture sources) either by absolute URL or by a path
//! relative to the document's own location. The core validates the form of
//! these references and offers a pure string resolution against a
//! [`ResolutionRoot`]; it never fetches anything.

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};
use url::Url;

use crate::error::ValueError;
use crate::identifier::{impl_from_raw_str, impl_validating_deserialize, is_identifier};

const URL_SCHEMES: &[&str] = &["http", "https", "file"];

/// Base location that relative file sources are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionRoot {
    /// A remote or `file://` base URL; always ends with `/`.
    Url(Url),
    /// A local directory.
    Directory(PathBuf),
}

impl ResolutionRoot {
    /// Use `url` as the base; a trailing `/` is added so that relative
    /// sources resolve below it rather than beside it.
    pub fn from_url(mut url: Url) -> Self {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Self::Url(url)
    }

    /// Use a local directory as the base.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::Directory(dir.into())
    }

    /// Interpret `s` as a URL if it has a supported scheme, else as a directory.
    pub fn parse(s: &str) -> Self {
        match Url::parse(s) {
            Ok(url) if URL_SCHEMES.contains(&url.scheme()) => Self::from_url(url),
            _ => Self::from_dir(s),
        }
    }
}

impl Default for ResolutionRoot {
    fn default() -> Self {
        Self::Directory(PathBuf::from("."))
    }
}

impl fmt::Display for ResolutionRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url.as_str()),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// A file source after resolution against a [`ResolutionRoot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    /// Remote location.
    Url(Url),
    /// Local file.
    Path(PathBuf),
}

impl fmt::Display for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url.as_str()),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// An absolute URL or a relative path to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Absolute `http`, `https` or `file` URL.
    Url(Url),
    /// Path relative to the document's root, `/`-separated.
    Path(String),
}

impl_validating_deserialize!(FileSource);
impl_from_raw_str!(FileSource);

impl FileSource {
    /// Parse a file source.
    ///
    /// # Errors
    ///
    /// - [`ValueError::Empty`] for an empty string.
    /// - [`ValueError::InvalidUrl`] for URLs with unsupported schemes.
    /// - [`ValueError::InvalidSource`] for absolute local paths.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValueError::Empty);
        }
        match Url::parse(&s) {
            Ok(url) if URL_SCHEMES.contains(&url.scheme()) => Ok(Self::Url(url)),
            // A single-letter scheme is a Windows drive letter, not a URL.
            Ok(url) if url.scheme().len() == 1 => Err(ValueError::InvalidSource {
                value: s,
                reason: "absolute paths are not allowed; use a relative path or URL".to_string(),
            }),
            Ok(url) => Err(ValueError::InvalidUrl {
                reason: format!("unsupported scheme '{}'", url.scheme()),
                value: s,
            }),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                if s.starts_with('/') || s.starts_with('\\') {
                    return Err(ValueError::InvalidSource {
                        value: s,
                        reason: "absolute paths are not allowed; use a relative path or URL"
                            .to_string(),
                    });
                }
                Ok(Self::Path(s))
            }
            Err(e) => Err(ValueError::InvalidUrl {
                value: s,
                reason: e.to_string(),
            }),
        }
    }

    /// Last path component.
    pub fn file_name(&self) -> &str {
        let path = match self {
            Self::Url(url) => url.path(),
            Self::Path(p) => p.as_str(),
        };
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Whether the file name ends with `suffix` (ASCII case-insensitive).
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.file_name()
            .to_ascii_lowercase()
            .ends_with(&suffix.to_ascii_lowercase())
    }

    /// Resolve against `root`. Absolute URLs are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidUrl`] if joining onto a URL root fails.
    pub fn resolve(&self, root: &ResolutionRoot) -> Result<ResolvedSource, ValueError> {
        match (self, root) {
            (Self::Url(url), _) => Ok(ResolvedSource::Url(url.clone())),
            (Self::Path(p), ResolutionRoot::Url(base)) => base
                .join(p)
                .map(ResolvedSource::Url)
                .map_err(|e| ValueError::InvalidUrl {
                    value: p.clone(),
                    reason: e.to_string(),
                }),
            (Self::Path(p), ResolutionRoot::Directory(dir)) => {
                Ok(ResolvedSource::Path(dir.join(p)))
            }
        }
    }

    /// The source as written.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(url) => url.as_str(),
            Self::Path(p) => p,
        }
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FileSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An absolute `http`/`https` URL (repositories, citations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUrl(Url);

impl_validating_deserialize!(HttpUrl);
impl_from_raw_str!(HttpUrl);

impl HttpUrl {
    /// Parse an absolute web URL.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidUrl`] if parsing fails or the scheme is
    /// not `http`/`https`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        match Url::parse(&s) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self(url)),
            Ok(url) => Err(ValueError::InvalidUrl {
                reason: format!("expected http or https, got '{}'", url.scheme()),
                value: s,
            }),
            Err(e) => Err(ValueError::InvalidUrl {
                value: s,
                reason: e.to_string(),
            }),
        }
    }

    /// The URL string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Serialize for HttpUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

/// `<file source>:<identifier>`: a callable defined in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableSource {
    source: FileSource,
    callable_name: String,
}

impl_validating_deserialize!(CallableSource);
impl_from_raw_str!(CallableSource);

impl CallableSource {
    /// Parse `<source>:<identifier>`, splitting on the last `:`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidCallable`] if the identifier part is not
    /// an identifier or the source part is not a valid file source.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        let invalid = |reason: String| ValueError::InvalidCallable {
            value: s.clone(),
            reason,
        };
        let (source, name) = s
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected '<source file>:<identifier>'".to_string()))?;
        if !is_identifier(name) {
            return Err(invalid(format!("'{name}' is not an identifier")));
        }
        let source = FileSource::new(source).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            source,
            callable_name: name.to_string(),
        })
    }

    /// The source file.
    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// The identifier of the callable within the file.
    pub fn callable_name(&self) -> &str {
        &self.callable_name
    }
}

impl fmt::Display for CallableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.callable_name)
    }
}

impl Serialize for CallableSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `<package>.<module>.<identifier>`: a callable importable from an installed dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CallableImport(String);

impl_validating_deserialize!(CallableImport);
impl_from_raw_str!(CallableImport);

impl CallableImport {
    /// Parse a dotted import path of at least two identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidCallable`] otherwise.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() < 2 || !parts.iter().all(|p| is_identifier(p)) {
            return Err(ValueError::InvalidCallable {
                value: s,
                reason: "expected '<package>.<module>.<identifier>'".to_string(),
            });
        }
        Ok(Self(s))
    }

    /// The import path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallableImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
