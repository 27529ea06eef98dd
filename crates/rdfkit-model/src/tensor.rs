//! # Tensor Model
//!
//! Input and output tensor descriptions. Both share [`TensorDescr`]; inputs
//! add preprocessing, outputs add postprocessing and allow `halo` on their
//! time and space axes.
//!
//! Parsing also yields a [`TensorOutline`]: the tensor's name and whichever
//! axes parsed successfully. The cross-tensor reference pass works on
//! outlines so it can run even when unrelated parts of a tensor are invalid.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use rdfkit_core::raw::parse_list_partial;
use rdfkit_core::{expect_mapping, parse_list, Diagnostics, FileSource, Loc, TensorId};

use crate::axis::{parse_axis, read_description, Axis, TensorRole};
use crate::options::ParseOptions;
use crate::processing::ProcessingStep;
use crate::values::TensorValues;

/// Fields common to input and output tensors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TensorDescr {
    /// Tensor name, unique within the document.
    pub name: TensorId,
    /// Free-text description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Axes, in memory order.
    pub axes: Vec<Axis>,
    /// Example tensor in `.npy` format.
    pub test_tensor: FileSource,
    /// Illustrative sample, any image format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_tensor: Option<FileSource>,
    /// Meaning of the tensor's values.
    pub values: TensorValues,
}

/// A model input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputTensor {
    #[serde(flatten)]
    pub descr: TensorDescr,
    /// Steps applied before the model runs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preprocessing: Vec<ProcessingStep>,
}

/// A model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputTensor {
    #[serde(flatten)]
    pub descr: TensorDescr,
    /// Steps applied after the model runs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub postprocessing: Vec<ProcessingStep>,
}

/// What the reference pass needs to know about one tensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorOutline {
    /// The tensor name, if it parsed.
    pub name: Option<TensorId>,
    /// The axis list, if it was a list; entries are `None` for axes that
    /// failed to parse.
    pub axes: Option<Vec<Option<Axis>>>,
}

impl TensorOutline {
    /// Whether name and every axis parsed.
    pub fn is_complete(&self) -> bool {
        self.name.is_some()
            && self
                .axes
                .as_ref()
                .is_some_and(|axes| axes.iter().all(Option::is_some))
    }
}

impl InputTensor {
    /// Parse an input tensor.
    pub fn parse(
        value: &Value,
        loc: &Loc,
        opts: &ParseOptions,
        diag: &mut Diagnostics,
    ) -> (Option<Self>, TensorOutline) {
        let (parts, outline) = parse_tensor(value, loc, TensorRole::Input, opts, diag);
        let tensor = parts.map(|(descr, preprocessing)| Self {
            descr,
            preprocessing,
        });
        (tensor, outline)
    }
}

impl OutputTensor {
    /// Parse an output tensor.
    pub fn parse(
        value: &Value,
        loc: &Loc,
        opts: &ParseOptions,
        diag: &mut Diagnostics,
    ) -> (Option<Self>, TensorOutline) {
        let (parts, outline) = parse_tensor(value, loc, TensorRole::Output, opts, diag);
        let tensor = parts.map(|(descr, postprocessing)| Self {
            descr,
            postprocessing,
        });
        (tensor, outline)
    }
}

type TensorParts = (TensorDescr, Vec<ProcessingStep>);

fn parse_tensor(
    value: &Value,
    loc: &Loc,
    role: TensorRole,
    opts: &ParseOptions,
    diag: &mut Diagnostics,
) -> (Option<TensorParts>, TensorOutline) {
    let Some(mut reader) = expect_mapping(value, loc, diag) else {
        return (None, TensorOutline::default());
    };
    let name = reader.required::<TensorId>("name", diag);
    let description = read_description(&mut reader, diag);

    let axes_loc = reader.field_loc("axes");
    let axes = reader.required_with("axes", diag, |v, l, d| {
        parse_list_partial(v, l, d, |a, al, ad| parse_axis(a, al, role, opts, ad))
    });
    if let Some(axes) = &axes {
        check_unique_axis_names(axes, &axes_loc, diag);
    }

    let test_loc = reader.field_loc("test_tensor");
    let test_tensor = reader.required::<FileSource>("test_tensor", diag).and_then(|src| {
        if src.has_suffix(".npy") {
            Some(src)
        } else {
            diag.error(&test_loc, "test tensor must be a '.npy' file");
            None
        }
    });
    let sample_tensor = reader.optional::<FileSource>("sample_tensor", diag);
    let values_loc = reader.field_loc("values");
    let values = reader.required::<TensorValues>("values", diag);

    let processing_key = match role {
        TensorRole::Input => "preprocessing",
        TensorRole::Output => "postprocessing",
    };
    let processing_loc = reader.field_loc(processing_key);
    let processing = reader
        .optional_with(processing_key, diag, |v, l, d| {
            parse_list(v, l, d, |s, sl, sd| ProcessingStep::parse(s, sl, role, sd))
        })
        .map(Option::unwrap_or_default);
    reader.finish(diag);

    let outline = TensorOutline {
        name: name.clone(),
        axes: axes.clone(),
    };
    let axes: Option<Vec<Axis>> = axes.and_then(|a| a.into_iter().collect());

    if let (Some(axes), Some(values)) = (&axes, &values) {
        check_channel_values(axes, values, &values_loc, diag);
    }
    if let (Some(axes), Some(steps)) = (&axes, &processing) {
        check_processing_axes(axes, steps, &processing_loc, diag);
    }

    let parts = (|| {
        Some((
            TensorDescr {
                name: name?,
                description: description?,
                axes: axes?,
                test_tensor: test_tensor?,
                sample_tensor: sample_tensor?,
                values: values?,
            },
            processing?,
        ))
    })();
    (parts, outline)
}

/// Reject duplicate axis names, listing every duplicated name once.
fn check_unique_axis_names(axes: &[Option<Axis>], loc: &Loc, diag: &mut Diagnostics) {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for axis in axes.iter().flatten() {
        let name = axis.name_string();
        if !seen.insert(name.clone()) {
            duplicates.insert(name);
        }
    }
    if !duplicates.is_empty() {
        let names: Vec<String> = duplicates.into_iter().collect();
        diag.error(loc, format!("Duplicate axis names: {}", names.join(", ")));
    }
}

fn check_channel_values(axes: &[Axis], values: &TensorValues, loc: &Loc, diag: &mut Diagnostics) {
    let Some(given) = values.per_channel_count() else {
        return;
    };
    match axes.iter().find(|a| matches!(a, Axis::Channel(_))) {
        None if given > 1 => {
            diag.error(loc, "per-channel value descriptions require a channel axis");
        }
        Some(channel) => {
            if let Some(expected) = channel.channel_count() {
                if expected != given {
                    diag.error(
                        loc,
                        format!(
                            "expected {expected} per-channel value descriptions to match the channel axis, got {given}"
                        ),
                    );
                }
            }
        }
        None => {}
    }
}

fn check_processing_axes(axes: &[Axis], steps: &[ProcessingStep], loc: &Loc, diag: &mut Diagnostics) {
    let names: BTreeSet<String> = axes.iter().map(Axis::name_string).collect();
    for (i, step) in steps.iter().enumerate() {
        let Some(step_axes) = step.axes() else {
            continue;
        };
        let unknown: Vec<&str> = step_axes
            .into_iter()
            .filter(|a| !names.contains(*a))
            .collect();
        if !unknown.is_empty() {
            diag.error(
                &loc.index(i).field("kwargs").field("axes"),
                format!(
                    "`kwargs.axes` needs to be a subset of the tensor's axis names; unknown: {}",
                    unknown.join(", ")
                ),
            );
        }
    }
}
