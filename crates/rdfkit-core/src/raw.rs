//! # Raw Tree Walking
//!
//! Raw documents are `serde_json::Value` trees (YAML input is converted on
//! load). This module provides the accumulate-don't-abort parsing primitives
//! the typed document model is built on:
//!
//! - [`FromRaw`]: parse one node into a typed value, recording located
//!   diagnostics and returning `None` on failure.
//! - [`MappingReader`]: read the keys of one mapping node, tracking which
//!   keys were consumed so unknown fields can be rejected in [`MappingReader::finish`].
//! - [`parse_list`] / [`parse_list_partial`]: sequence helpers that visit
//!   every item even after one fails.
//!
//! A JSON `null` is treated as an absent field, matching how YAML documents
//! spell "not set".

use std::collections::BTreeSet;

use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::error::ValueError;
use crate::loc::Loc;

/// A raw mapping node.
pub type RawMapping = serde_json::Map<String, Value>;

/// Parse a typed value from a raw node.
///
/// Implementations record every violation they find in `diag`, located at
/// or below `loc`, and return `None` if the value could not be constructed.
pub trait FromRaw: Sized {
    /// Parse `value`, which sits at `loc` in the document.
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self>;
}

/// Short human name of a raw node's type, for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Require `value` to be a string and run it through a validating constructor.
pub fn parse_str_with<T>(
    value: &Value,
    loc: &Loc,
    diag: &mut Diagnostics,
    ctor: impl FnOnce(&str) -> Result<T, ValueError>,
) -> Option<T> {
    match value {
        Value::String(s) => match ctor(s) {
            Ok(v) => Some(v),
            Err(e) => {
                diag.error(loc, e.to_string());
                None
            }
        },
        other => {
            diag.error(loc, format!("expected a string, got {}", type_name(other)));
            None
        }
    }
}

/// Require `value` to be a mapping and open a reader over it.
pub fn expect_mapping<'a>(
    value: &'a Value,
    loc: &Loc,
    diag: &mut Diagnostics,
) -> Option<MappingReader<'a>> {
    match value {
        Value::Object(map) => Some(MappingReader::new(map, loc.clone())),
        other => {
            diag.error(loc, format!("expected a mapping, got {}", type_name(other)));
            None
        }
    }
}

/// Require `value` to be the string literal `expected`.
pub fn expect_literal(value: &Value, loc: &Loc, diag: &mut Diagnostics, expected: &str) -> Option<()> {
    match value.as_str() {
        Some(s) if s == expected => Some(()),
        _ => {
            diag.error(loc, format!("expected '{expected}', got {value}"));
            None
        }
    }
}

/// Parse every item of a sequence node.
///
/// All items are visited so that every item's errors are reported; the
/// result is `None` if the node is not a list or any item failed.
pub fn parse_list<T>(
    value: &Value,
    loc: &Loc,
    diag: &mut Diagnostics,
    item: impl FnMut(&Value, &Loc, &mut Diagnostics) -> Option<T>,
) -> Option<Vec<T>> {
    parse_list_partial(value, loc, diag, item)?.into_iter().collect()
}

/// Like [`parse_list`], but keeps the per-item outcome.
///
/// Returns `None` only if the node is not a list at all.
pub fn parse_list_partial<T>(
    value: &Value,
    loc: &Loc,
    diag: &mut Diagnostics,
    mut item: impl FnMut(&Value, &Loc, &mut Diagnostics) -> Option<T>,
) -> Option<Vec<Option<T>>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| item(v, &loc.index(i), diag))
                .collect(),
        ),
        other => {
            diag.error(loc, format!("expected a list, got {}", type_name(other)));
            None
        }
    }
}

/// Reader over the keys of one mapping node.
///
/// Every key read through the reader is marked consumed; [`finish`](Self::finish)
/// reports the remaining keys as unknown fields.
#[derive(Debug)]
pub struct MappingReader<'a> {
    map: &'a RawMapping,
    loc: Loc,
    consumed: BTreeSet<String>,
}

impl<'a> MappingReader<'a> {
    /// Open a reader over `map` located at `loc`.
    pub fn new(map: &'a RawMapping, loc: Loc) -> Self {
        Self {
            map,
            loc,
            consumed: BTreeSet::new(),
        }
    }

    /// Location of the mapping itself.
    pub fn loc(&self) -> &Loc {
        &self.loc
    }

    /// Location of one of its fields.
    pub fn field_loc(&self, key: &str) -> Loc {
        self.loc.field(key)
    }

    /// Whether `key` is present and not null. Does not consume it.
    pub fn contains(&self, key: &str) -> bool {
        self.map.get(key).is_some_and(|v| !v.is_null())
    }

    /// Peek at a field without consuming it.
    pub fn peek(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Consume a field and return its raw node (null counts as absent).
    pub fn take(&mut self, key: &str) -> Option<&'a Value> {
        self.consumed.insert(key.to_string());
        self.peek(key)
    }

    /// Read a required field.
    pub fn required<T: FromRaw>(&mut self, key: &str, diag: &mut Diagnostics) -> Option<T> {
        self.required_with(key, diag, T::from_raw)
    }

    /// Read a required field with a custom parser.
    pub fn required_with<T>(
        &mut self,
        key: &str,
        diag: &mut Diagnostics,
        parse: impl FnOnce(&'a Value, &Loc, &mut Diagnostics) -> Option<T>,
    ) -> Option<T> {
        let loc = self.field_loc(key);
        match self.take(key) {
            Some(value) => parse(value, &loc, diag),
            None => {
                diag.error(&loc, "field required");
                None
            }
        }
    }

    /// Read an optional field: `Some(None)` if absent, `None` if present but invalid.
    pub fn optional<T: FromRaw>(&mut self, key: &str, diag: &mut Diagnostics) -> Option<Option<T>> {
        self.optional_with(key, diag, T::from_raw)
    }

    /// Read an optional field with a custom parser.
    pub fn optional_with<T>(
        &mut self,
        key: &str,
        diag: &mut Diagnostics,
        parse: impl FnOnce(&'a Value, &Loc, &mut Diagnostics) -> Option<T>,
    ) -> Option<Option<T>> {
        let loc = self.field_loc(key);
        match self.take(key) {
            Some(value) => parse(value, &loc, diag).map(Some),
            None => Some(None),
        }
    }

    /// Read a field that falls back to `default` when absent.
    pub fn defaulted<T: FromRaw>(&mut self, key: &str, diag: &mut Diagnostics, default: T) -> Option<T> {
        self.optional(key, diag).map(|v| v.unwrap_or(default))
    }

    /// Read an optional list field, defaulting to an empty list.
    pub fn list<T: FromRaw>(&mut self, key: &str, diag: &mut Diagnostics) -> Option<Vec<T>> {
        self.optional::<Vec<T>>(key, diag).map(Option::unwrap_or_default)
    }

    /// Reject every key that was never read.
    pub fn finish(self, diag: &mut Diagnostics) {
        for key in self.map.keys() {
            if !self.consumed.contains(key) {
                diag.error(&self.loc.field(key), "extra fields not permitted");
            }
        }
    }
}

impl FromRaw for String {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        parse_str_with(value, loc, diag, |s| Ok(s.to_string()))
    }
}

impl FromRaw for bool {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            other => {
                diag.error(loc, format!("expected a boolean, got {}", type_name(other)));
                None
            }
        }
    }
}

impl FromRaw for u64 {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        match value.as_u64() {
            Some(n) => Some(n),
            None => {
                diag.error(
                    loc,
                    format!("expected a non-negative integer, got {}", describe(value)),
                );
                None
            }
        }
    }
}

impl FromRaw for i64 {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        match value.as_i64() {
            Some(n) => Some(n),
            None => {
                diag.error(loc, format!("expected an integer, got {}", describe(value)));
                None
            }
        }
    }
}

impl FromRaw for f64 {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        match value.as_f64() {
            Some(n) => Some(n),
            None => {
                diag.error(loc, format!("expected a number, got {}", type_name(value)));
                None
            }
        }
    }
}

impl FromRaw for RawMapping {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        match value {
            Value::Object(map) => Some(map.clone()),
            other => {
                diag.error(loc, format!("expected a mapping, got {}", type_name(other)));
                None
            }
        }
    }
}

impl<T: FromRaw> FromRaw for Vec<T> {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        parse_list(value, loc, diag, T::from_raw)
    }
}

/// Numbers are shown by value, everything else by type.
fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        other => type_name(other).to_string(),
    }
}
