//! # Model Document
//!
//! The root resource description of a model package (format 0.5).
//!
//! Parsing runs in two passes:
//!
//! 1. [`parse_raw`] walks the raw tree once, validating every field and
//!    collecting every violation. It also records a [`DocumentOutline`] of
//!    whatever tensor names and axes parsed.
//! 2. [`check_document`] checks cross-tensor axis references against the
//!    outline.
//!
//! [`Model::parse`] runs both. A model is only produced when neither pass
//! recorded an error; warnings never block it.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use rdfkit_core::raw::{expect_literal, parse_list_partial};
use rdfkit_core::{
    expect_mapping, parse_list, Diagnostics, FileSource, FormatVersion, FromRaw, HttpUrl,
    LicenseId, Loc, RawMapping,
};

use crate::axis::TensorRole;
use crate::metadata::{Author, CiteEntry, Maintainer, Parent, RunMode, Timestamp};
use crate::options::ParseOptions;
use crate::references::{check_document, DocumentOutline};
use crate::tensor::{InputTensor, OutputTensor, TensorOutline};
use crate::weights::Weights;

/// Image formats accepted for cover images.
pub const COVER_SUFFIXES: &[&str] = &[".gif", ".jpeg", ".jpg", ".png", ".svg"];

/// The `type` discriminant of a resource description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Model,
}

/// A validated model resource description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    /// Declared format version, in the series this crate implements.
    pub format_version: FormatVersion,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Human readable name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Creators of the model. At least one.
    pub authors: Vec<Author>,
    /// SPDX license identifier.
    pub license: LicenseId,
    /// Markdown documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<FileSource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cite: Vec<CiteEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_repo: Option<HttpUrl>,
    /// Cover images.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub covers: Vec<FileSource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    /// Who packaged the model, if not its authors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packaged_by: Vec<Author>,
    /// The model this one was derived from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_mode: Option<RunMode>,
    /// Free-form tool configuration, kept verbatim.
    #[serde(skip_serializing_if = "RawMapping::is_empty")]
    pub config: RawMapping,
    /// Input tensors. At least one.
    pub inputs: Vec<InputTensor>,
    /// Output tensors. At least one.
    pub outputs: Vec<OutputTensor>,
    /// Weights by format.
    pub weights: Weights,
}

/// Result of the first parsing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// The model, if the pass recorded no errors.
    pub model: Option<Model>,
    /// Tensor names and axes for the reference pass.
    pub outline: DocumentOutline,
}

impl Model {
    /// Parse and fully validate a raw document.
    ///
    /// Every violation is recorded in `diag`; the model is returned only if
    /// none was an error.
    pub fn parse(raw: &Value, opts: &ParseOptions, diag: &mut Diagnostics) -> Option<Self> {
        let parsed = parse_raw(raw, opts, diag);
        let before = diag.error_count();
        check_document(&parsed.outline, diag);
        parsed.model.filter(|_| diag.error_count() == before)
    }

    /// Serialize back into a raw document.
    ///
    /// Fields at their default value are omitted.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; not expected for a parsed model.
    pub fn dump(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// First parsing pass: structural validation of every field.
pub fn parse_raw(raw: &Value, opts: &ParseOptions, diag: &mut Diagnostics) -> ParsedDocument {
    let root = Loc::root();
    let Some(mut reader) = expect_mapping(raw, &root, diag) else {
        return ParsedDocument {
            model: None,
            outline: DocumentOutline::default(),
        };
    };
    let before = diag.error_count();

    let format_version = reader.required_with("format_version", diag, |v, loc, diag| {
        let declared = FormatVersion::from_raw(v, loc, diag)?;
        if declared.same_series(&opts.format_version) {
            Some(declared)
        } else {
            diag.error(
                loc,
                format!(
                    "format version {declared} is not supported; expected {}.{}.x",
                    opts.format_version.major, opts.format_version.minor
                ),
            );
            None
        }
    });
    let resource_type = reader.required_with("type", diag, |v, loc, diag| {
        expect_literal(v, loc, diag, "model").map(|()| ResourceType::Model)
    });
    let name = reader.required_with("name", diag, |v, loc, diag| {
        parse_name(v, loc, opts, diag)
    });
    let description = reader.required::<String>("description", diag);
    let authors = reader.required_with("authors", diag, |v, loc, diag| {
        let authors = Vec::<Author>::from_raw(v, loc, diag)?;
        if authors.is_empty() {
            diag.error(loc, "at least one author is required");
            return None;
        }
        Some(authors)
    });
    let license = reader.required::<LicenseId>("license", diag);
    let documentation = reader.optional_with("documentation", diag, |v, loc, diag| {
        let src = FileSource::from_raw(v, loc, diag)?;
        if !src.has_suffix(".md") {
            diag.error(loc, "documentation must be a markdown ('.md') file");
            return None;
        }
        Some(src)
    });
    let tags = reader.list::<String>("tags", diag);
    let cite = reader.list::<CiteEntry>("cite", diag);
    let git_repo = reader.optional::<HttpUrl>("git_repo", diag);
    let covers = reader
        .optional_with("covers", diag, parse_covers)
        .map(Option::unwrap_or_default);
    let maintainers = reader.list::<Maintainer>("maintainers", diag);
    let timestamp = reader.optional::<Timestamp>("timestamp", diag);
    let packaged_by = reader.list::<Author>("packaged_by", diag);
    let parent = reader.optional::<Parent>("parent", diag);
    let run_mode_loc = reader.field_loc("run_mode");
    let run_mode = reader.optional::<RunMode>("run_mode", diag);
    if let Some(Some(mode)) = &run_mode {
        diag.warning(
            &run_mode_loc,
            format!(
                "run mode '{}' is not supported by standard tooling and may be ignored",
                mode.name
            ),
        );
    }
    let config = reader.defaulted("config", diag, RawMapping::new());

    let mut outline = DocumentOutline::default();
    let inputs = reader.required_with("inputs", diag, |v, loc, diag| {
        parse_tensors(v, loc, opts, diag, InputTensor::parse, &mut outline.inputs)
    });
    let outputs = reader.required_with("outputs", diag, |v, loc, diag| {
        parse_tensors(v, loc, opts, diag, OutputTensor::parse, &mut outline.outputs)
    });
    check_unique_tensor_names(&outline, diag);

    let weights = reader.required::<Weights>("weights", diag);
    reader.finish(diag);

    let model = (|| {
        Some(Model {
            format_version: format_version?,
            resource_type: resource_type?,
            name: name?,
            description: description?,
            authors: authors?,
            license: license?,
            documentation: documentation?,
            tags: tags?,
            cite: cite?,
            git_repo: git_repo?,
            covers: covers?,
            maintainers: maintainers?,
            timestamp: timestamp?,
            packaged_by: packaged_by?,
            parent: parent?,
            run_mode: run_mode?,
            config: config?,
            inputs: inputs?,
            outputs: outputs?,
            weights: weights?,
        })
    })()
    .filter(|_| diag.error_count() == before);

    debug!(
        errors = diag.error_count() - before,
        complete = model.is_some(),
        "parsed model document"
    );
    ParsedDocument { model, outline }
}

/// Names must be non-empty. Overlong names and unusual characters are
/// only advisory.
fn parse_name(value: &Value, loc: &Loc, opts: &ParseOptions, diag: &mut Diagnostics) -> Option<String> {
    let name = String::from_raw(value, loc, diag)?;
    if name.trim().is_empty() {
        diag.error(loc, "name must not be empty");
        return None;
    }
    if name.chars().count() > opts.name_max_len {
        diag.warning(loc, format!("Name longer than {} characters.", opts.name_max_len));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ' '))
    {
        diag.warning(
            loc,
            "Name should only contain letters, digits, '_', '-' and spaces.",
        );
    }
    Some(name)
}

fn parse_covers(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Vec<FileSource>> {
    parse_list(value, loc, diag, |item, item_loc, diag| {
        let src = FileSource::from_raw(item, item_loc, diag)?;
        if COVER_SUFFIXES.iter().any(|s| src.has_suffix(s)) {
            Some(src)
        } else {
            diag.error(
                item_loc,
                format!("cover must be one of {}", COVER_SUFFIXES.join(", ")),
            );
            None
        }
    })
}

/// Parse a tensor list, storing the outlines of all items in `outlines`.
fn parse_tensors<T>(
    value: &Value,
    loc: &Loc,
    opts: &ParseOptions,
    diag: &mut Diagnostics,
    parse: impl Fn(&Value, &Loc, &ParseOptions, &mut Diagnostics) -> (Option<T>, TensorOutline),
    outlines: &mut Option<Vec<TensorOutline>>,
) -> Option<Vec<T>> {
    let mut seen = Vec::new();
    let items = parse_list_partial(value, loc, diag, |item, item_loc, diag| {
        let (tensor, outline) = parse(item, item_loc, opts, diag);
        seen.push(outline);
        tensor
    });
    let items = items?;
    *outlines = Some(seen);
    if items.is_empty() {
        diag.error(loc, "at least one tensor is required");
        return None;
    }
    items.into_iter().collect()
}

/// Tensor names must be unique across inputs and outputs; every repeat
/// after the first is reported.
fn check_unique_tensor_names(outline: &DocumentOutline, diag: &mut Diagnostics) {
    let mut seen = BTreeSet::new();
    let roles = [
        (TensorRole::Input, &outline.inputs),
        (TensorRole::Output, &outline.outputs),
    ];
    for (role, tensors) in roles {
        for (i, tensor) in tensors.iter().flatten().enumerate() {
            let Some(name) = &tensor.name else {
                continue;
            };
            if !seen.insert(name.as_str()) {
                diag.error(
                    &Loc::root().field(role.as_str()).index(i).field("name"),
                    format!("Duplicate tensor name '{name}'"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "format_version": "0.5.0",
            "type": "model",
            "name": "UNet 2D nuclei",
            "description": "Nucleus segmentation",
            "authors": [{"name": "Jane Doe"}],
            "license": "MIT",
            "inputs": [{
                "name": "input_1",
                "test_tensor": "test_input.npy",
                "values": {"type": "interval", "data_type": "float32"},
                "axes": [
                    {"type": "batch"},
                    {"type": "channel", "size": 1},
                    {"type": "space", "name": "y", "size": {"min": 64, "step": 16}},
                    {"type": "space", "name": "x", "size": {"min": 64, "step": 16}},
                ],
            }],
            "outputs": [{
                "name": "output_1",
                "test_tensor": "test_output.npy",
                "values": {"type": "interval", "data_type": "float32"},
                "axes": [
                    {"type": "batch"},
                    {"type": "channel", "size": 1},
                    {"type": "space", "name": "y", "size": {"reference": "input_1.y"}, "halo": 8},
                    {"type": "space", "name": "x", "size": {"reference": "input_1.x"}, "halo": 8},
                ],
            }],
            "weights": {"torchscript": {"source": "weights.pt", "pytorch_version": "1.13"}},
        })
    }

    fn parse(raw: &Value) -> (Option<Model>, Diagnostics) {
        let mut diag = Diagnostics::new();
        let model = Model::parse(raw, &ParseOptions::default(), &mut diag);
        (model, diag)
    }

    fn error_locs(diag: &Diagnostics) -> Vec<String> {
        diag.errors().iter().map(|e| e.loc.to_string()).collect()
    }

    #[test]
    fn valid_document() {
        let (model, diag) = parse(&document());
        assert!(!diag.has_errors(), "{:?}", diag.errors());
        assert!(diag.warnings().is_empty(), "{:?}", diag.warnings());
        let model = model.unwrap();
        assert_eq!(model.inputs.len(), 1);
    }

    #[test]
    fn authors_must_be_a_list() {
        let mut raw = document();
        raw["authors"] = json!(42);
        let (model, diag) = parse(&raw);
        assert!(model.is_none());
        assert_eq!(error_locs(&diag), vec!["authors"]);
    }

    #[test]
    fn empty_authors() {
        let mut raw = document();
        raw["authors"] = json!([]);
        let (_, diag) = parse(&raw);
        assert_eq!(error_locs(&diag), vec!["authors"]);
    }

    #[test]
    fn unknown_top_level_field() {
        let mut raw = document();
        raw["colour"] = json!("blue");
        let (model, diag) = parse(&raw);
        assert!(model.is_none());
        assert_eq!(error_locs(&diag), vec!["colour"]);
        assert_eq!(diag.errors()[0].msg, "extra fields not permitted");
    }

    #[test]
    fn wrong_type_discriminant() {
        let mut raw = document();
        raw["type"] = json!("dataset");
        let (_, diag) = parse(&raw);
        assert_eq!(error_locs(&diag), vec!["type"]);
    }

    #[test]
    fn other_format_series() {
        let mut raw = document();
        raw["format_version"] = json!("0.4.10");
        let (_, diag) = parse(&raw);
        assert_eq!(error_locs(&diag), vec!["format_version"]);

        raw["format_version"] = json!("0.5.7");
        let (model, _) = parse(&raw);
        assert!(model.is_some());
    }

    #[test]
    fn name_warnings() {
        let mut raw = document();
        raw["name"] = json!("a".repeat(70));
        let (model, diag) = parse(&raw);
        assert!(model.is_some());
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(diag.warnings()[0].loc.to_string(), "name");
        assert_eq!(diag.warnings()[0].msg, "Name longer than 64 characters.");

        raw["name"] = json!("UNet (2D)");
        let (model, diag) = parse(&raw);
        assert!(model.is_some());
        assert_eq!(diag.warnings().len(), 1);

        raw["name"] = json!("   ");
        let (model, diag) = parse(&raw);
        assert!(model.is_none());
        assert_eq!(error_locs(&diag), vec!["name"]);
    }

    #[test]
    fn duplicate_tensor_names() {
        let mut raw = document();
        raw["outputs"][0]["name"] = json!("input_1");
        raw["outputs"][0]["axes"][2]["size"] = json!(64);
        raw["outputs"][0]["axes"][3]["size"] = json!(64);
        let (model, diag) = parse(&raw);
        assert!(model.is_none());
        assert_eq!(error_locs(&diag), vec!["outputs[0].name"]);
    }

    #[test]
    fn run_mode_warns() {
        let mut raw = document();
        raw["run_mode"] = json!({"name": "deepimagej"});
        let (model, diag) = parse(&raw);
        assert!(model.is_some(), "{:?}", diag.errors());
        let locs: Vec<String> = diag.warnings().iter().map(|w| w.loc.to_string()).collect();
        assert_eq!(locs, vec!["run_mode"]);
    }

    #[test]
    fn documentation_and_covers_suffixes() {
        let mut raw = document();
        raw["documentation"] = json!("README.txt");
        raw["covers"] = json!(["cover.png", "cover.tif"]);
        let (_, diag) = parse(&raw);
        assert_eq!(error_locs(&diag), vec!["documentation", "covers[1]"]);
    }

    #[test]
    fn empty_tensor_lists() {
        let mut raw = document();
        raw["outputs"] = json!([]);
        let (_, diag) = parse(&raw);
        assert_eq!(error_locs(&diag), vec!["outputs"]);
    }

    #[test]
    fn reference_pass_runs_despite_unrelated_errors() {
        let mut raw = document();
        raw["license"] = json!("");
        raw["outputs"][0]["axes"][3]["size"] = json!({"reference": "input_1.z"});
        let (_, diag) = parse(&raw);
        assert_eq!(
            error_locs(&diag),
            vec!["license", "outputs[0].axes[3].size"]
        );
    }

    #[test]
    fn not_a_mapping() {
        let mut diag = Diagnostics::new();
        let parsed = parse_raw(&json!(["model"]), &ParseOptions::default(), &mut diag);
        assert!(parsed.model.is_none());
        assert_eq!(parsed.outline, DocumentOutline::default());
        assert_eq!(error_locs(&diag), vec!["(root)"]);
    }

    #[test]
    fn dump_omits_defaults() {
        let (model, _) = parse(&document());
        let dumped = model.unwrap().dump().unwrap();
        assert_eq!(dumped["type"], json!("model"));
        assert_eq!(dumped["inputs"][0]["axes"][0], json!({"type": "batch"}));
        assert!(dumped.get("tags").is_none());
        assert!(dumped.get("config").is_none());
        assert!(dumped["outputs"][0].get("postprocessing").is_none());
    }
}
