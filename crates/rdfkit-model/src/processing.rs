//! # Pre- and Postprocessing Steps
//!
//! Each step is `{name, kwargs}`. The step name selects which keyword
//! arguments are required; `kwargs.axes`, when given, lists axis names of
//! the owning tensor and is checked against them by the tensor parser.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use rdfkit_core::raw::type_name;
use rdfkit_core::{expect_mapping, Diagnostics, FromRaw, Loc, RawMapping};

use crate::axis::TensorRole;

/// Valid values of the `mode` keyword argument.
pub const MODES: &[&str] = &["fixed", "per_dataset", "per_sample"];

/// Name of a processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingName {
    Binarize,
    Clip,
    ScaleLinear,
    Sigmoid,
    ZeroMeanUnitVariance,
    ScaleRange,
    /// Postprocessing only.
    ScaleMeanVariance,
}

impl ProcessingName {
    const ALL: [ProcessingName; 7] = [
        Self::Binarize,
        Self::Clip,
        Self::ScaleLinear,
        Self::Sigmoid,
        Self::ZeroMeanUnitVariance,
        Self::ScaleRange,
        Self::ScaleMeanVariance,
    ];

    /// The spelling used in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binarize => "binarize",
            Self::Clip => "clip",
            Self::ScaleLinear => "scale_linear",
            Self::Sigmoid => "sigmoid",
            Self::ZeroMeanUnitVariance => "zero_mean_unit_variance",
            Self::ScaleRange => "scale_range",
            Self::ScaleMeanVariance => "scale_mean_variance",
        }
    }

    /// Look up a step by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }

    /// Whether the step may appear on tensors of `role`.
    pub fn allowed_for(&self, role: TensorRole) -> bool {
        !matches!((self, role), (Self::ScaleMeanVariance, TensorRole::Input))
    }

    fn names_for(role: TensorRole) -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|n| n.allowed_for(role))
            .map(ProcessingName::as_str)
            .collect()
    }
}

impl fmt::Display for ProcessingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One processing step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStep {
    /// Which operation to apply.
    pub name: ProcessingName,
    /// Operation arguments, kept verbatim.
    #[serde(skip_serializing_if = "RawMapping::is_empty")]
    pub kwargs: RawMapping,
}

impl ProcessingStep {
    /// Parse a step of a tensor with the given role.
    pub fn parse(value: &Value, loc: &Loc, role: TensorRole, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let name_loc = reader.field_loc("name");
        let name = reader.required::<String>("name", diag).and_then(|name| {
            match ProcessingName::from_name(&name) {
                Some(n) if n.allowed_for(role) => Some(n),
                Some(n) => {
                    diag.error(&name_loc, format!("'{n}' is only allowed in postprocessing"));
                    None
                }
                None => {
                    diag.error(
                        &name_loc,
                        format!(
                            "unknown processing step '{name}'; expected one of {}",
                            ProcessingName::names_for(role).join(", ")
                        ),
                    );
                    None
                }
            }
        });
        let kwargs_loc = reader.field_loc("kwargs");
        let kwargs = reader.defaulted("kwargs", diag, RawMapping::new());
        reader.finish(diag);

        let (name, kwargs) = (name?, kwargs?);
        if !check_kwargs(name, &kwargs, &kwargs_loc, diag) {
            return None;
        }
        Some(Self { name, kwargs })
    }

    /// Axis names listed in `kwargs.axes`, if any.
    pub fn axes(&self) -> Option<Vec<&str>> {
        let items = self.kwargs.get("axes")?.as_array()?;
        Some(items.iter().filter_map(Value::as_str).collect())
    }
}

fn check_kwargs(name: ProcessingName, kwargs: &RawMapping, loc: &Loc, diag: &mut Diagnostics) -> bool {
    let before = diag.error_count();
    match name {
        ProcessingName::Binarize => require_number(kwargs, "threshold", loc, diag),
        ProcessingName::Clip => {
            require_number(kwargs, "min", loc, diag);
            require_number(kwargs, "max", loc, diag);
        }
        ProcessingName::ScaleLinear | ProcessingName::Sigmoid => {}
        ProcessingName::ZeroMeanUnitVariance => {
            if require_mode(kwargs, loc, diag, true) == Some("fixed") {
                require_present(kwargs, "mean", loc, diag);
                require_present(kwargs, "std", loc, diag);
            }
        }
        ProcessingName::ScaleRange => {
            require_mode(kwargs, loc, diag, false);
        }
        ProcessingName::ScaleMeanVariance => {
            require_mode(kwargs, loc, diag, false);
            match kwargs.get("reference_tensor") {
                Some(Value::String(_)) => {}
                Some(other) => diag.error(
                    &loc.field("reference_tensor"),
                    format!("expected a tensor name, got {}", type_name(other)),
                ),
                None => diag.error(&loc.field("reference_tensor"), "field required"),
            }
        }
    }
    if let Some(axes) = kwargs.get("axes") {
        let is_name_list = axes
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string));
        if !is_name_list {
            diag.error(&loc.field("axes"), "expected a list of axis names");
        }
    }
    diag.error_count() == before
}

fn require_present(kwargs: &RawMapping, key: &str, loc: &Loc, diag: &mut Diagnostics) {
    if kwargs.get(key).map_or(true, Value::is_null) {
        diag.error(&loc.field(key), "field required");
    }
}

fn require_number(kwargs: &RawMapping, key: &str, loc: &Loc, diag: &mut Diagnostics) {
    match kwargs.get(key) {
        Some(Value::Number(_)) => {}
        Some(other) => diag.error(
            &loc.field(key),
            format!("expected a number, got {}", type_name(other)),
        ),
        None => diag.error(&loc.field(key), "field required"),
    }
}

fn require_mode<'a>(
    kwargs: &'a RawMapping,
    loc: &Loc,
    diag: &mut Diagnostics,
    allow_fixed: bool,
) -> Option<&'a str> {
    let mode_loc = loc.field("mode");
    let Some(mode) = kwargs.get("mode") else {
        diag.error(&mode_loc, "field required");
        return None;
    };
    let allowed: &[&str] = if allow_fixed { MODES } else { &MODES[1..] };
    match mode.as_str() {
        Some(m) if allowed.contains(&m) => Some(m),
        _ => {
            diag.error(
                &mode_loc,
                format!("expected one of {}, got {mode}", allowed.join(", ")),
            );
            None
        }
    }
}
