//! # Document Metadata
//!
//! Authorship, citation and provenance fields of a resource description.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use rdfkit_core::{
    expect_mapping, Diagnostics, Email, FileSource, FromRaw, HttpUrl, Loc, MappingReader, Orcid,
    RawMapping, Sha256,
};

/// Optional contact fields shared by authors and maintainers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    /// Affiliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    /// E-mail address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    /// ORCID iD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<Orcid>,
}

impl Contact {
    fn read(reader: &mut MappingReader<'_>, diag: &mut Diagnostics) -> Option<Self> {
        let affiliation = reader.optional::<String>("affiliation", diag);
        let email = reader.optional::<Email>("email", diag);
        let orcid = reader.optional::<Orcid>("orcid", diag);
        Some(Self {
            affiliation: affiliation?,
            email: email?,
            orcid: orcid?,
        })
    }
}

/// A person who created the resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    /// Full name.
    pub name: String,
    #[serde(flatten)]
    pub contact: Contact,
    /// GitHub user name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_user: Option<String>,
}

impl FromRaw for Author {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let name_loc = reader.field_loc("name");
        let name = reader.required::<String>("name", diag).and_then(|n| {
            if n.trim().is_empty() {
                diag.error(&name_loc, "name must not be empty");
                None
            } else {
                Some(n)
            }
        });
        let contact = Contact::read(&mut reader, diag);
        let github_user = reader.optional::<String>("github_user", diag);
        reader.finish(diag);
        Some(Self {
            name: name?,
            contact: contact?,
            github_user: github_user?,
        })
    }
}

/// A person who maintains the resource; identified by GitHub user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Maintainer {
    /// Full name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub contact: Contact,
    /// GitHub user name.
    pub github_user: String,
}

impl FromRaw for Maintainer {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let name = reader.optional::<String>("name", diag);
        let contact = Contact::read(&mut reader, diag);
        let github_user = reader.required::<String>("github_user", diag);
        reader.finish(diag);
        Some(Self {
            name: name?,
            contact: contact?,
            github_user: github_user?,
        })
    }
}

/// A citation; needs a DOI or a URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiteEntry {
    /// Free-text citation.
    pub text: String,
    /// DOI, e.g. `10.1038/s41592-019-0612-7`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// URL of the cited work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<HttpUrl>,
}

impl FromRaw for CiteEntry {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let text = reader.required::<String>("text", diag);
        let doi_loc = reader.field_loc("doi");
        let doi = reader.optional::<String>("doi", diag).and_then(|doi| match doi {
            Some(d) if !is_doi(&d) => {
                diag.error(&doi_loc, format!("'{d}' is not a DOI"));
                None
            }
            other => Some(other),
        });
        let url = reader.optional::<HttpUrl>("url", diag);
        reader.finish(diag);
        let (text, doi, url) = (text?, doi?, url?);
        if doi.is_none() && url.is_none() {
            diag.error(loc, "either doi or url is required");
            return None;
        }
        Some(Self { text, doi, url })
    }
}

fn is_doi(s: &str) -> bool {
    s.strip_prefix("10.")
        .and_then(|rest| rest.split_once('/'))
        .is_some_and(|(registrant, suffix)| {
            !registrant.is_empty()
                && registrant.chars().all(|c| c.is_ascii_digit() || c == '.')
                && !suffix.is_empty()
        })
}

/// The resource this one is derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Parent {
    /// A resource by id.
    Linked {
        /// Resource id.
        id: String,
        /// Version of the resource.
        #[serde(skip_serializing_if = "Option::is_none")]
        version_number: Option<u64>,
    },
    /// A resource description file pinned by checksum.
    Rdf {
        /// URL or relative path of the parent's RDF.
        rdf_source: FileSource,
        /// Checksum of that RDF.
        sha256: Sha256,
    },
}

impl FromRaw for Parent {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let parent = if reader.contains("rdf_source") {
            let rdf_source = reader.required::<FileSource>("rdf_source", diag);
            let sha256 = reader.required::<Sha256>("sha256", diag);
            rdf_source
                .zip(sha256)
                .map(|(rdf_source, sha256)| Self::Rdf { rdf_source, sha256 })
        } else {
            let id = reader.required::<String>("id", diag);
            let version_number = reader.optional::<u64>("version_number", diag);
            id.zip(version_number)
                .map(|(id, version_number)| Self::Linked { id, version_number })
        };
        reader.finish(diag);
        parent
    }
}

/// A custom run mode. Not standardized; its presence is always flagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMode {
    /// Run mode name.
    pub name: String,
    /// Run mode arguments.
    #[serde(skip_serializing_if = "RawMapping::is_empty")]
    pub kwargs: RawMapping,
}

impl FromRaw for RunMode {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let name = reader.required::<String>("name", diag);
        let kwargs = reader.defaulted("kwargs", diag, RawMapping::new());
        reader.finish(diag);
        Some(Self {
            name: name?,
            kwargs: kwargs?,
        })
    }
}

/// An ISO 8601 creation timestamp, kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Parse an ISO 8601 date or date-time, with or without offset.
    pub fn parse(text: &str) -> Option<Self> {
        Self::parse_naive_utc(text).map(|_| Self(text.to_string()))
    }

    /// The instant in UTC; naive timestamps are taken as UTC.
    pub fn naive_utc(&self) -> Option<NaiveDateTime> {
        Self::parse_naive_utc(&self.0)
    }

    fn parse_naive_utc(text: &str) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.naive_utc());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt);
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// The timestamp as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRaw for Timestamp {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let text = String::from_raw(value, loc, diag)?;
        let parsed = Self::parse(&text);
        if parsed.is_none() {
            diag.error(loc, format!("'{text}' is not an ISO 8601 timestamp"));
        }
        parsed
    }
}
