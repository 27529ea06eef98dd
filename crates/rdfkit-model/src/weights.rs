//! # Weights Model
//!
//! `weights` maps a format name to that format's entry. The key is the
//! discriminant: it selects which format-specific fields are read. Every
//! entry shares [`WeightsCommon`].
//!
//! | format                          | specific fields                      |
//! |---------------------------------|--------------------------------------|
//! | `keras_hdf5`                    | `tensorflow_version`                 |
//! | `onnx`                          | `opset_version` (>= 7)               |
//! | `pytorch_state_dict`            | `architecture`, `pytorch_version`    |
//! | `tensorflow_js`                 | `tensorflow_version`                 |
//! | `tensorflow_saved_model_bundle` | `tensorflow_version`                 |
//! | `torchscript`                   | `pytorch_version`                    |

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use rdfkit_core::raw::type_name;
use rdfkit_core::{
    expect_mapping, CallableImport, CallableSource, Diagnostics, FileSource, FromRaw, Loc,
    MappingReader, RawMapping, Sha256, Version,
};

use crate::metadata::Author;

/// Smallest ONNX opset accepted.
pub const MIN_ONNX_OPSET: u64 = 7;

/// Package managers accepted in `dependencies`.
pub const DEPENDENCY_MANAGERS: &[&str] = &["conda", "maven", "pip"];

/// A weights serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightsFormat {
    KerasHdf5,
    Onnx,
    PytorchStateDict,
    TensorflowJs,
    TensorflowSavedModelBundle,
    Torchscript,
}

impl WeightsFormat {
    /// All formats.
    pub const ALL: [WeightsFormat; 6] = [
        Self::KerasHdf5,
        Self::Onnx,
        Self::PytorchStateDict,
        Self::TensorflowJs,
        Self::TensorflowSavedModelBundle,
        Self::Torchscript,
    ];

    /// The key used in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KerasHdf5 => "keras_hdf5",
            Self::Onnx => "onnx",
            Self::PytorchStateDict => "pytorch_state_dict",
            Self::TensorflowJs => "tensorflow_js",
            Self::TensorflowSavedModelBundle => "tensorflow_saved_model_bundle",
            Self::Torchscript => "torchscript",
        }
    }

    /// Look up a format by key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    fn expected() -> String {
        Self::ALL.map(|f| f.as_str()).join(", ")
    }
}

impl fmt::Display for WeightsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromRaw for WeightsFormat {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let name = String::from_raw(value, loc, diag)?;
        let found = Self::from_name(&name);
        if found.is_none() {
            diag.error(
                loc,
                format!("unknown weights format '{name}'; expected one of {}", Self::expected()),
            );
        }
        found
    }
}

/// `<manager>:<file>`, e.g. `conda:environment.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependencies {
    /// Package manager.
    pub manager: String,
    /// Environment file.
    pub file: FileSource,
}

impl fmt::Display for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.manager, self.file)
    }
}

impl Serialize for Dependencies {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromRaw for Dependencies {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let text = String::from_raw(value, loc, diag)?;
        let Some((manager, file)) = text.split_once(':') else {
            diag.error(loc, format!("expected '<manager>:<file>', got '{text}'"));
            return None;
        };
        if !DEPENDENCY_MANAGERS.contains(&manager) {
            diag.error(
                loc,
                format!(
                    "unknown dependency manager '{manager}'; expected one of {}",
                    DEPENDENCY_MANAGERS.join(", ")
                ),
            );
            return None;
        }
        let file = match FileSource::new(file) {
            Ok(f) => f,
            Err(e) => {
                diag.error(loc, e.to_string());
                return None;
            }
        };
        Some(Self {
            manager: manager.to_string(),
            file,
        })
    }
}

/// Fields shared by every weights entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightsCommon {
    /// The weights file.
    pub source: FileSource,
    /// Checksum of `source`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<Sha256>,
    /// Authors of these weights, if they differ from the model's.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    /// Additional files required by these weights.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<FileSource>,
    /// Environment specification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Dependencies>,
    /// Format these weights were converted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<WeightsFormat>,
}

impl WeightsCommon {
    fn read(reader: &mut MappingReader<'_>, diag: &mut Diagnostics) -> Option<Self> {
        let source = reader.required::<FileSource>("source", diag);
        let sha256 = reader.optional::<Sha256>("sha256", diag);
        let authors = reader.list::<Author>("authors", diag);
        let attachments = reader.list::<FileSource>("attachments", diag);
        let dependencies = reader.optional::<Dependencies>("dependencies", diag);
        let parent = reader.optional::<WeightsFormat>("parent", diag);
        Some(Self {
            source: source?,
            sha256: sha256?,
            authors: authors?,
            attachments: attachments?,
            dependencies: dependencies?,
            parent: parent?,
        })
    }
}

/// The network architecture of a state-dict entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Architecture {
    /// Defined in a source file, pinned by checksum.
    FromSource {
        /// `<source file>:<identifier>`.
        callable: CallableSource,
        /// Checksum of the source file.
        sha256: Sha256,
        /// Keyword arguments for `callable`.
        #[serde(skip_serializing_if = "RawMapping::is_empty")]
        kwargs: RawMapping,
    },
    /// Importable from an installed dependency.
    FromDependency {
        /// `<package>.<module>.<identifier>`.
        callable: CallableImport,
        /// Keyword arguments for `callable`.
        #[serde(skip_serializing_if = "RawMapping::is_empty")]
        kwargs: RawMapping,
    },
}

impl Architecture {
    /// The source file, for architectures defined in one.
    pub fn source(&self) -> Option<(&CallableSource, &Sha256)> {
        match self {
            Self::FromSource {
                callable, sha256, ..
            } => Some((callable, sha256)),
            Self::FromDependency { .. } => None,
        }
    }
}

impl FromRaw for Architecture {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        // `<file>:<name>` is a source file; a dotted path is an import.
        let from_source = reader
            .peek("callable")
            .and_then(Value::as_str)
            .is_some_and(|c| c.contains(':'));
        let architecture = if from_source {
            let callable = reader.required::<CallableSource>("callable", diag);
            let sha256 = reader.required::<Sha256>("sha256", diag);
            let kwargs = reader.defaulted("kwargs", diag, RawMapping::new());
            reader.finish(diag);
            Self::FromSource {
                callable: callable?,
                sha256: sha256?,
                kwargs: kwargs?,
            }
        } else {
            let callable = reader.required::<CallableImport>("callable", diag);
            let kwargs = reader.defaulted("kwargs", diag, RawMapping::new());
            reader.finish(diag);
            Self::FromDependency {
                callable: callable?,
                kwargs: kwargs?,
            }
        };
        Some(architecture)
    }
}

/// Format-specific fields of a weights entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormatSpecific {
    /// `keras_hdf5`, `tensorflow_js`, `tensorflow_saved_model_bundle`.
    Tensorflow {
        #[serde(skip_serializing_if = "Option::is_none")]
        tensorflow_version: Option<Version>,
    },
    /// `onnx`.
    Onnx {
        #[serde(skip_serializing_if = "Option::is_none")]
        opset_version: Option<u64>,
    },
    /// `pytorch_state_dict`.
    PytorchStateDict {
        architecture: Architecture,
        #[serde(skip_serializing_if = "Option::is_none")]
        pytorch_version: Option<Version>,
    },
    /// `torchscript`.
    Torchscript {
        #[serde(skip_serializing_if = "Option::is_none")]
        pytorch_version: Option<Version>,
    },
}

/// One weights entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightsEntry {
    #[serde(flatten)]
    pub common: WeightsCommon,
    #[serde(flatten)]
    pub specific: FormatSpecific,
}

impl WeightsEntry {
    /// Parse the entry stored under `format`.
    pub fn parse(
        format: WeightsFormat,
        value: &Value,
        loc: &Loc,
        diag: &mut Diagnostics,
    ) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let common = WeightsCommon::read(&mut reader, diag);
        let specific = match format {
            WeightsFormat::KerasHdf5
            | WeightsFormat::TensorflowJs
            | WeightsFormat::TensorflowSavedModelBundle => reader
                .optional::<Version>("tensorflow_version", diag)
                .map(|tensorflow_version| FormatSpecific::Tensorflow { tensorflow_version }),
            WeightsFormat::Onnx => read_opset(&mut reader, diag)
                .map(|opset_version| FormatSpecific::Onnx { opset_version }),
            WeightsFormat::PytorchStateDict => {
                let architecture = reader.required::<Architecture>("architecture", diag);
                let pytorch_version = read_lenient_version(&mut reader, "pytorch_version", diag);
                architecture.zip(pytorch_version).map(|(architecture, pytorch_version)| {
                    FormatSpecific::PytorchStateDict {
                        architecture,
                        pytorch_version,
                    }
                })
            }
            WeightsFormat::Torchscript => reader
                .optional::<Version>("pytorch_version", diag)
                .map(|pytorch_version| FormatSpecific::Torchscript { pytorch_version }),
        };
        reader.finish(diag);
        Some(Self {
            common: common?,
            specific: specific?,
        })
    }

    /// The architecture of a state-dict entry.
    pub fn architecture(&self) -> Option<&Architecture> {
        match &self.specific {
            FormatSpecific::PytorchStateDict { architecture, .. } => Some(architecture),
            _ => None,
        }
    }
}

fn read_opset(reader: &mut MappingReader<'_>, diag: &mut Diagnostics) -> Option<Option<u64>> {
    let loc = reader.field_loc("opset_version");
    match reader.optional::<u64>("opset_version", diag)? {
        Some(v) if v < MIN_ONNX_OPSET => {
            diag.error(&loc, format!("opset_version must be at least {MIN_ONNX_OPSET}, got {v}"));
            None
        }
        other => Some(other),
    }
}

/// A version whose malformation is only advisory: kept verbatim, with a warning.
fn read_lenient_version(
    reader: &mut MappingReader<'_>,
    key: &str,
    diag: &mut Diagnostics,
) -> Option<Option<Version>> {
    let loc = reader.field_loc(key);
    let Some(value) = reader.take(key) else {
        return Some(None);
    };
    let Some(text) = Version::raw_text(value) else {
        diag.error(&loc, format!("expected a version string, got {}", type_name(value)));
        return None;
    };
    match Version::new(text.clone()) {
        Ok(v) => Some(Some(v)),
        Err(e) => {
            diag.warning(&loc, e.to_string());
            Some(Some(Version::unvalidated(text)))
        }
    }
}

/// All weights entries of a model, keyed by format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<WeightsFormat, WeightsEntry>);

impl Weights {
    /// The entry for `format`.
    pub fn get(&self, format: WeightsFormat) -> Option<&WeightsEntry> {
        self.0.get(&format)
    }

    /// Entries in format order.
    pub fn iter(&self) -> impl Iterator<Item = (WeightsFormat, &WeightsEntry)> {
        self.0.iter().map(|(f, e)| (*f, e))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a parsed document.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromRaw for Weights {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let Value::Object(map) = value else {
            diag.error(loc, format!("expected a mapping, got {}", type_name(value)));
            return None;
        };
        if map.is_empty() {
            diag.error(loc, "at least one weights entry is required");
            return None;
        }
        let mut entries = BTreeMap::new();
        let mut ok = true;
        for (key, entry) in map {
            let entry_loc = loc.field(key);
            if entry.is_null() {
                continue;
            }
            let Some(format) = WeightsFormat::from_name(key) else {
                diag.error(
                    &entry_loc,
                    format!(
                        "unknown weights format '{key}'; expected one of {}",
                        WeightsFormat::expected()
                    ),
                );
                ok = false;
                continue;
            };
            match WeightsEntry::parse(format, entry, &entry_loc, diag) {
                Some(e) => {
                    entries.insert(format, e);
                }
                None => ok = false,
            }
        }
        if ok && entries.is_empty() {
            diag.error(loc, "at least one weights entry is required");
            return None;
        }
        for (format, entry) in &entries {
            let Some(parent) = entry.common.parent else {
                continue;
            };
            let parent_loc = loc.field(format.as_str()).field("parent");
            if parent == *format {
                diag.error(&parent_loc, "weights entry cannot be its own parent");
                ok = false;
            } else if !entries.contains_key(&parent) && !map.contains_key(parent.as_str()) {
                diag.error(
                    &parent_loc,
                    format!("parent format '{parent}' has no weights entry"),
                );
                ok = false;
            }
        }
        ok.then_some(Self(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> (Option<Weights>, Diagnostics) {
        let mut diag = Diagnostics::new();
        let w = Weights::from_raw(&raw, &Loc::from_fields(["weights"]), &mut diag);
        (w, diag)
    }

    fn error_locs(diag: &Diagnostics) -> Vec<String> {
        diag.errors().iter().map(|e| e.loc.to_string()).collect()
    }

    #[test]
    fn every_format_parses() {
        let (w, diag) = parse(json!({
            "torchscript": {"source": "https://example.com/weights", "pytorch_version": 1.15},
            "keras_hdf5": {"source": "https://example.com/weights", "tensorflow_version": 1.10},
            "tensorflow_js": {"source": "https://example.com/weights", "tensorflow_version": 1.10},
            "tensorflow_saved_model_bundle": {"source": "https://example.com/weights", "tensorflow_version": 1.10},
            "onnx": {"source": "https://example.com/weights", "opset_version": 15},
        }));
        assert!(!diag.has_errors(), "{:?}", diag.errors());
        assert_eq!(w.unwrap().len(), 5);
    }

    #[test]
    fn state_dict_from_source() {
        let (w, diag) = parse(json!({
            "pytorch_state_dict": {
                "source": "https://example.com/weights",
                "pytorch_version": "1.15",
                "architecture": {"callable": "https://example.com/file.py:Model", "sha256": "0".repeat(64)},
            }
        }));
        assert!(!diag.has_errors(), "{:?}", diag.errors());
        let w = w.unwrap();
        let arch = w.get(WeightsFormat::PytorchStateDict).and_then(WeightsEntry::architecture);
        let (callable, _) = arch.and_then(Architecture::source).unwrap();
        assert_eq!(callable.callable_name(), "Model");
    }

    #[test]
    fn state_dict_sha256_must_be_64_hex() {
        for bad in ["0".repeat(63), "0".repeat(65), "z".repeat(64)] {
            let (w, diag) = parse(json!({
                "pytorch_state_dict": {
                    "source": "weights.pt",
                    "architecture": {"callable": "unet.py:UNet", "sha256": bad},
                }
            }));
            assert!(w.is_none());
            assert_eq!(
                error_locs(&diag),
                vec!["weights.pytorch_state_dict.architecture.sha256"]
            );
        }
    }

    #[test]
    fn source_architecture_requires_sha256() {
        let (_, diag) = parse(json!({
            "pytorch_state_dict": {"source": "weights.pt", "architecture": {"callable": "unet.py:UNet"}}
        }));
        assert_eq!(error_locs(&diag), vec!["weights.pytorch_state_dict.architecture.sha256"]);
    }

    #[test]
    fn dependency_architecture_rejects_sha256() {
        let (w, diag) = parse(json!({
            "pytorch_state_dict": {
                "source": "weights.pt",
                "architecture": {"callable": "my_module.submodule.get_my_model", "kwargs": {"depth": 4}},
            }
        }));
        assert!(!diag.has_errors(), "{:?}", diag.errors());
        assert!(matches!(
            w.unwrap().get(WeightsFormat::PytorchStateDict).and_then(WeightsEntry::architecture),
            Some(Architecture::FromDependency { .. })
        ));

        let (_, diag) = parse(json!({
            "pytorch_state_dict": {
                "source": "weights.pt",
                "architecture": {"callable": "my_module.get_my_model", "sha256": "0".repeat(64)},
            }
        }));
        assert_eq!(error_locs(&diag), vec!["weights.pytorch_state_dict.architecture.sha256"]);
    }

    #[test]
    fn invalid_pytorch_version_is_a_warning() {
        let (w, diag) = parse(json!({
            "pytorch_state_dict": {
                "source": "weights.pt",
                "pytorch_version": "latest",
                "architecture": {"callable": "pkg.make_model"},
            }
        }));
        assert!(w.is_some());
        assert!(!diag.has_errors());
        assert_eq!(diag.warnings()[0].loc.to_string(), "weights.pytorch_state_dict.pytorch_version");
    }

    #[test]
    fn onnx_opset_minimum() {
        let (_, diag) = parse(json!({"onnx": {"source": "m.onnx", "opset_version": 6}}));
        assert_eq!(error_locs(&diag), vec!["weights.onnx.opset_version"]);
    }

    #[test]
    fn empty_and_unknown_formats() {
        let (w, diag) = parse(json!({}));
        assert!(w.is_none());
        assert_eq!(error_locs(&diag), vec!["weights"]);

        let (_, diag) = parse(json!({"caffe": {"source": "x"}}));
        assert_eq!(error_locs(&diag), vec!["weights.caffe"]);
    }

    #[test]
    fn parent_must_be_another_present_format() {
        let (_, diag) = parse(json!({
            "onnx": {"source": "m.onnx", "parent": "torchscript"},
        }));
        assert_eq!(error_locs(&diag), vec!["weights.onnx.parent"]);

        let (_, diag) = parse(json!({
            "onnx": {"source": "m.onnx", "parent": "onnx"},
        }));
        assert_eq!(error_locs(&diag), vec!["weights.onnx.parent"]);

        let (w, diag) = parse(json!({
            "onnx": {"source": "m.onnx", "parent": "torchscript"},
            "torchscript": {"source": "m.pt"},
        }));
        assert!(w.is_some(), "{:?}", diag.errors());
    }

    #[test]
    fn dependencies_format() {
        let (w, diag) = parse(json!({
            "torchscript": {"source": "m.pt", "dependencies": "conda:environment.yaml"},
        }));
        assert!(!diag.has_errors());
        let dump = serde_json::to_value(w.unwrap()).unwrap();
        assert_eq!(dump["torchscript"]["dependencies"], json!("conda:environment.yaml"));

        let (_, diag) = parse(json!({"torchscript": {"source": "m.pt", "dependencies": "environment.yaml"}}));
        assert_eq!(error_locs(&diag), vec!["weights.torchscript.dependencies"]);
    }
}
