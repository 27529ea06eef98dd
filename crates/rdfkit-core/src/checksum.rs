//! # SHA-256 Checksums
//!
//! Declared integrity checksums for referenced files (weights, architecture
//! sources, parent RDFs). The core only checks the declared form; hashing of
//! actual file content is done by external collaborators through
//! [`Sha256::digest`].

use serde::Serialize;
use sha2::Digest;

use crate::error::ValueError;
use crate::identifier::{impl_from_raw_str, impl_validating_deserialize};

/// A SHA-256 digest spelled as 64 hexadecimal characters (stored lowercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256(String);

impl_validating_deserialize!(Sha256);
impl_from_raw_str!(Sha256);

impl Sha256 {
    /// Parse a hex digest.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidSha256`] unless the value is exactly
    /// 64 ASCII hex digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        let len = s.chars().count();
        if len != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValueError::InvalidSha256 { value: s, len });
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Compute the digest of `bytes`.
    pub fn digest(bytes: &[u8]) -> Self {
        let hash = sha2::Sha256::digest(bytes);
        Self(hash.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Lowercase hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sha256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_64_hex_chars() {
        assert!(Sha256::new("0".repeat(64)).is_ok());
        let upper = "AB".repeat(32);
        assert_eq!(Sha256::new(upper).unwrap().as_str(), "ab".repeat(32));
    }

    #[test]
    fn rejects_wrong_length_and_charset() {
        assert!(matches!(
            Sha256::new("0".repeat(63)),
            Err(ValueError::InvalidSha256 { len: 63, .. })
        ));
        assert!(Sha256::new("0".repeat(65)).is_err());
        assert!(Sha256::new("g".repeat(64)).is_err());
        assert!(Sha256::new("").is_err());
    }

    #[test]
    fn digest_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            Sha256::digest(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
