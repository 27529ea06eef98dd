//! # Field-Path Locators
//!
//! A [`Loc`] addresses one node of a raw document tree, e.g.
//! `weights.pytorch_state_dict.architecture.sha256` or
//! `outputs[0].axes[0].size`. Locators are built incrementally while
//! walking the tree and attached to every diagnostic.

use std::fmt;

use serde::Serialize;

/// One step of a locator: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum LocSegment {
    /// Key of a mapping.
    Field(String),
    /// Position in a sequence.
    Index(usize),
}

/// Path from the document root to a node.
///
/// Serializes as a JSON array (`["inputs", 0, "axes"]`); displays in the
/// dotted form used by reports (`inputs[0].axes`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Loc(Vec<LocSegment>);

impl Loc {
    /// The document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a locator from a sequence of field names.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            fields
                .into_iter()
                .map(|f| LocSegment::Field(f.to_string()))
                .collect(),
        )
    }

    /// Extend with a mapping key.
    pub fn field(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(LocSegment::Field(name.to_string()));
        Self(segments)
    }

    /// Extend with a sequence index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(LocSegment::Index(index));
        Self(segments)
    }

    /// Whether this is the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                LocSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                LocSegment::Field(name) => write!(f, ".{name}")?,
                LocSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mixes_fields_and_indices() {
        let loc = Loc::root().field("outputs").index(0).field("axes").index(3).field("size");
        assert_eq!(loc.to_string(), "outputs[0].axes[3].size");
    }

    #[test]
    fn display_root() {
        assert_eq!(Loc::root().to_string(), "(root)");
    }

    #[test]
    fn from_fields_matches_incremental_build() {
        let a = Loc::from_fields(["weights", "onnx", "source"]);
        let b = Loc::root().field("weights").field("onnx").field("source");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "weights.onnx.source");
    }

    #[test]
    fn serializes_as_array() {
        let loc = Loc::root().field("inputs").index(2);
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json, serde_json::json!(["inputs", 2]));
    }
}
