//! # Author Contact Fields
//!
//! ORCID iDs are checked against their ISO 7064 11-2 check digit. E-mail
//! addresses only get a shape check; deliverability is not our concern.

use std::fmt;

use serde::Serialize;

use crate::error::ValueError;
use crate::identifier::{impl_from_raw_str, impl_validating_deserialize};

/// An ORCID iD, `XXXX-XXXX-XXXX-XXXX` with a valid check digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Orcid(String);

impl_validating_deserialize!(Orcid);
impl_from_raw_str!(Orcid);

impl Orcid {
    /// Parse an ORCID iD.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidOrcid`] if the layout is wrong or the
    /// check digit does not match.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        let groups: Vec<&str> = s.split('-').collect();
        let layout_ok = groups.len() == 4 && groups.iter().all(|g| g.len() == 4);
        let chars: Vec<char> = groups.concat().chars().collect();
        if !layout_ok || chars.len() != 16 {
            return Err(ValueError::InvalidOrcid(s));
        }
        let mut total: u32 = 0;
        for c in &chars[..15] {
            let Some(d) = c.to_digit(10) else {
                return Err(ValueError::InvalidOrcid(s));
            };
            total = (total + d) * 2;
        }
        let result = (12 - total % 11) % 11;
        let expected = if result == 10 {
            'X'
        } else {
            char::from_digit(result, 10).unwrap_or('?')
        };
        if chars[15] != expected {
            return Err(ValueError::InvalidOrcid(s));
        }
        Ok(Self(s))
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Orcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An e-mail address with a plausible `local@domain.tld` shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl_validating_deserialize!(Email);
impl_from_raw_str!(Email);

impl Email {
    /// Parse an e-mail address.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidEmail`] unless there is exactly one `@`,
    /// a non-empty local part, and a dotted domain without whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        let valid = match s.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !s.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if valid {
            Ok(Self(s))
        } else {
            Err(ValueError::InvalidEmail(s))
        }
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
