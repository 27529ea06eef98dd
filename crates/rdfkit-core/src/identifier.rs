//! # Identifier Newtypes
//!
//! Name types used for tensors and axes. Each is a distinct type, so you
//! cannot pass a [`TensorId`] where a [`ShortId`] axis name is expected.
//!
//! ## Validation
//!
//! - [`Identifier`]: `[A-Za-z_][A-Za-z0-9_]*`, unbounded.
//! - [`ShortId`]: identifier of at most 16 characters (axis names).
//! - [`TensorId`]: identifier of at most 32 characters (tensor names).
//! - [`AxisRef`]: `<axis>` or `<tensor>.<axis>` token naming another axis.
//!   Parallel channel axes are addressed by their comma-joined names, so
//!   commas are allowed in the axis part.

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::error::ValueError;
use crate::loc::Loc;
use crate::raw::{parse_str_with, FromRaw};

/// Implement `Deserialize` for string newtypes by routing through the
/// type's validating `new()` constructor, so invalid values are rejected
/// at deserialization time rather than silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Implement [`FromRaw`] for string newtypes with a `new(String)` constructor.
macro_rules! impl_from_raw_str {
    ($ty:ident) => {
        impl $crate::raw::FromRaw for $ty {
            fn from_raw(
                value: &serde_json::Value,
                loc: &$crate::loc::Loc,
                diag: &mut $crate::diagnostics::Diagnostics,
            ) -> Option<Self> {
                $crate::raw::parse_str_with(value, loc, diag, |s| Self::new(s))
            }
        }
    };
}

pub(crate) use impl_from_raw_str;
pub(crate) use impl_validating_deserialize;

/// Whether `s` is a non-empty `[A-Za-z_][A-Za-z0-9_]*` identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(s: &str, max: Option<usize>) -> Result<(), ValueError> {
    if !is_identifier(s) {
        return Err(ValueError::InvalidIdentifier(s.to_string()));
    }
    if let Some(max) = max {
        if s.chars().count() > max {
            return Err(ValueError::TooLong {
                value: s.to_string(),
                max,
            });
        }
    }
    Ok(())
}

macro_rules! identifier_newtype {
    ($(#[$meta:meta])* $ty:ident, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $ty(String);

        impl_validating_deserialize!($ty);
        impl_from_raw_str!($ty);

        impl $ty {
            /// Create from a string, validating format and length.
            ///
            /// # Errors
            ///
            /// Returns [`ValueError::InvalidIdentifier`] or [`ValueError::TooLong`].
            pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
                let s = value.into();
                check_identifier(&s, $max)?;
                Ok(Self(s))
            }

            /// Access the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier_newtype!(
    /// An unbounded identifier.
    Identifier,
    None
);

identifier_newtype!(
    /// An identifier of at most 16 characters, used for axis names.
    ShortId,
    Some(16)
);

identifier_newtype!(
    /// An identifier of at most 32 characters, used for tensor names.
    TensorId,
    Some(32)
);

/// Reference token naming another axis: `<axis>` within the same tensor or
/// `<tensor>.<axis>` for an axis of another tensor. At most
/// [`AxisRef::MAX_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AxisRef(String);

impl_validating_deserialize!(AxisRef);
impl_from_raw_str!(AxisRef);

impl AxisRef {
    /// Longest accepted token.
    pub const MAX_LEN: usize = 33;

    /// Create a reference token, validating its shape and length.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidAxisRef`] if the token is empty, has
    /// more than one `.`, or contains characters outside identifiers and `,`.
    /// Returns [`ValueError::TooLong`] past [`AxisRef::MAX_LEN`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let s = value.into();
        if s.chars().count() > Self::MAX_LEN {
            return Err(ValueError::TooLong {
                value: s,
                max: Self::MAX_LEN,
            });
        }
        let valid_axis_part = |p: &str| !p.is_empty() && p.split(',').all(is_identifier);
        let ok = match s.split_once('.') {
            Some((tensor, axis)) => is_identifier(tensor) && valid_axis_part(axis),
            None => valid_axis_part(&s),
        };
        if ok {
            Ok(Self(s))
        } else {
            Err(ValueError::InvalidAxisRef(s))
        }
    }

    /// Access the token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(tensor, axis)`; `tensor` is `None` for local references.
    pub fn parts(&self) -> (Option<&str>, &str) {
        match self.0.split_once('.') {
            Some((tensor, axis)) => (Some(tensor), axis),
            None => (None, &self.0),
        }
    }
}

impl std::fmt::Display for AxisRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Target of a parametrized size's `step_with`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepWith {
    /// Step jointly with another axis.
    Axis(AxisRef),
    /// Step jointly with all batch axes of the model.
    BatchAxes,
}

impl StepWith {
    /// Keyword for stepping with all batch axes.
    pub const BATCH_AXES: &'static str = "BATCH_AXES";

    /// The referenced axis, if this is not the batch keyword.
    pub fn axis(&self) -> Option<&AxisRef> {
        match self {
            Self::Axis(r) => Some(r),
            Self::BatchAxes => None,
        }
    }

    /// Token as written in a document.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Axis(r) => r.as_str(),
            Self::BatchAxes => Self::BATCH_AXES,
        }
    }
}

impl Serialize for StepWith {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromRaw for StepWith {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        parse_str_with(value, loc, diag, |s| {
            if s == Self::BATCH_AXES {
                Ok(Self::BatchAxes)
            } else {
                AxisRef::new(s).map(Self::Axis)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_rules() {
        assert!(Identifier::new("input_1").is_ok());
        assert!(Identifier::new("_private").is_ok());
        assert!(Identifier::new("1st").is_err());
        assert!(Identifier::new("invalid/id").is_err());
        assert!(Identifier::new("").is_err());
    }

    #[test]
    fn short_id_length_limit() {
        assert!(ShortId::new("x").is_ok());
        assert!(ShortId::new("a".repeat(16)).is_ok());
        assert_eq!(
            ShortId::new("a".repeat(17)),
            Err(ValueError::TooLong {
                value: "a".repeat(17),
                max: 16
            })
        );
    }

    #[test]
    fn tensor_id_length_limit() {
        assert!(TensorId::new("t".repeat(32)).is_ok());
        assert!(TensorId::new("t".repeat(33)).is_err());
    }

    #[test]
    fn axis_ref_forms() {
        let local = AxisRef::new("x").unwrap();
        assert_eq!(local.parts(), (None, "x"));
        let qualified = AxisRef::new("input_1.x").unwrap();
        assert_eq!(qualified.parts(), (Some("input_1"), "x"));
        let parallel = AxisRef::new("input_1.r,g,b").unwrap();
        assert_eq!(parallel.parts(), (Some("input_1"), "r,g,b"));
        assert!(AxisRef::new("a.b.c").is_err());
        assert!(AxisRef::new("input_1.").is_err());
        assert!(AxisRef::new("in put").is_err());
    }

    #[test]
    fn axis_ref_length_limit() {
        let at_limit = format!("t.{}", "a".repeat(31));
        assert_eq!(at_limit.len(), AxisRef::MAX_LEN);
        assert!(AxisRef::new(at_limit).is_ok());
        let err = AxisRef::new(format!("t.{}", "a".repeat(32))).unwrap_err();
        assert!(matches!(err, ValueError::TooLong { max: 33, .. }));
        assert!(AxisRef::new(format!("t.{}", "a".repeat(60))).is_err());
    }

    #[test]
    fn step_with_keyword() {
        let mut diag = Diagnostics::new();
        let v = StepWith::from_raw(&serde_json::json!("BATCH_AXES"), &Loc::root(), &mut diag);
        assert_eq!(v, Some(StepWith::BatchAxes));
        let v = StepWith::from_raw(&serde_json::json!("input_1.y"), &Loc::root(), &mut diag).unwrap();
        assert_eq!(v.axis().map(AxisRef::as_str), Some("input_1.y"));
        assert!(!diag.has_errors());
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<ShortId, _> = serde_json::from_str("\"y\"");
        assert!(ok.is_ok());
        let bad: Result<ShortId, _> = serde_json::from_str("\"not valid\"");
        assert!(bad.is_err());
    }
}
