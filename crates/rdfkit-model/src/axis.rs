//! # Axis & Size Model
//!
//! One tensor dimension, dispatched on its `type` discriminant:
//!
//! | type      | name                  | size                                 | extras              |
//! |-----------|-----------------------|--------------------------------------|---------------------|
//! | `batch`   | always `batch`        | joint batch parametrization          |                     |
//! | `channel` | list, one per channel | defaults to the number of names      |                     |
//! | `index`   | default `index`       | required                             |                     |
//! | `time`    | default `time`        | required                             | unit, scale, halo*  |
//! | `space`   | default `x`           | required                             | unit, scale, halo*  |
//!
//! (*) `halo` only on output tensors.
//!
//! ## Sizes
//!
//! A size is a literal integer, a [`ParametrizedSize`] (`min + n*step`), a
//! [`SizeReference`] to another tensor's axis, or a bare axis token meaning
//! "same size as that axis". Whether references resolve is checked by the
//! second pass in [`crate::references`]; this module only checks shape.

use serde::Serialize;
use serde_json::Value;

use rdfkit_core::raw::type_name;
use rdfkit_core::units::{is_space_unit, is_time_unit};
use rdfkit_core::{
    expect_mapping, AxisRef, Diagnostics, FromRaw, Loc, MappingReader, ShortId, StepWith,
};

use crate::options::ParseOptions;

/// Maximum length of axis, tensor and value descriptions.
pub const DESCRIPTION_MAX_LEN: usize = 128;

/// Which side of the model a tensor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorRole {
    /// Model input.
    Input,
    /// Model output.
    Output,
}

impl TensorRole {
    /// Field name of the tensor list in a document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "inputs",
            Self::Output => "outputs",
        }
    }
}

// ── Sizes ───────────────────────────────────────────────────────────

/// Size domain `{min + n*step : n >= 0}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParametrizedSize {
    /// Smallest valid size.
    pub min: u64,
    /// Increment between valid sizes.
    pub step: u64,
    /// Axis (or all batch axes) whose `n` this axis shares.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_with: Option<StepWith>,
}

impl ParametrizedSize {
    /// Size at step count `n`.
    pub fn size(&self, n: u64) -> u64 {
        self.min.saturating_add(n.saturating_mul(self.step))
    }
}

impl FromRaw for ParametrizedSize {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let min = read_positive(&mut reader, "min", diag);
        let step = read_positive(&mut reader, "step", diag);
        let step_with = reader.optional::<StepWith>("step_with", diag);
        reader.finish(diag);
        Some(Self {
            min: min?,
            step: step?,
            step_with: step_with?,
        })
    }
}

/// `size = reference.size / reference.scale * scale + offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeReference {
    /// Referenced axis, usually `<tensor>.<axis>`.
    pub reference: AxisRef,
    /// Added after scaling.
    #[serde(skip_serializing_if = "is_zero")]
    pub offset: u64,
}

impl FromRaw for SizeReference {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let reference = reader.required::<AxisRef>("reference", diag);
        let offset = reader.defaulted("offset", diag, 0_u64);
        reader.finish(diag);
        Some(Self {
            reference: reference?,
            offset: offset?,
        })
    }
}

/// The size rule of a non-batch axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AxisSize {
    /// A literal size.
    Fixed(u64),
    /// A size family.
    Parametrized(ParametrizedSize),
    /// Derived from another axis' size.
    Reference(SizeReference),
    /// Same size as the named axis.
    Same(AxisRef),
}

impl AxisSize {
    /// The axis token this size depends on, if any.
    pub fn referenced_axis(&self) -> Option<&AxisRef> {
        match self {
            Self::Fixed(_) => None,
            Self::Parametrized(p) => p.step_with.as_ref().and_then(StepWith::axis),
            Self::Reference(r) => Some(&r.reference),
            Self::Same(r) => Some(r),
        }
    }
}

impl FromRaw for AxisSize {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        match value {
            Value::Number(_) => {
                let n = u64::from_raw(value, loc, diag)?;
                if n == 0 {
                    diag.error(loc, "size must be at least 1");
                    return None;
                }
                Some(Self::Fixed(n))
            }
            Value::String(_) => AxisRef::from_raw(value, loc, diag).map(Self::Same),
            Value::Object(map) if map.contains_key("reference") => {
                SizeReference::from_raw(value, loc, diag).map(Self::Reference)
            }
            Value::Object(_) => ParametrizedSize::from_raw(value, loc, diag).map(Self::Parametrized),
            other => {
                diag.error(
                    loc,
                    format!(
                        "expected an integer, a mapping or an axis reference, got {}",
                        type_name(other)
                    ),
                );
                None
            }
        }
    }
}

// ── Axes ────────────────────────────────────────────────────────────

/// The batch axis. Name and size are fixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchAxis {
    /// Free-text description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A channel axis with one name per channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelAxis {
    /// Channel names; more than one name makes them parallel channels.
    pub name: Vec<ShortId>,
    /// Free-text description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Channel count rule.
    pub size: AxisSize,
}

/// A generic index axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexAxis {
    /// Axis name.
    pub name: ShortId,
    /// Free-text description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Size rule.
    pub size: AxisSize,
}

/// A time or space axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalAxis {
    /// Axis name.
    pub name: ShortId,
    /// Free-text description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Size rule.
    pub size: AxisSize,
    /// Physical unit of one step along the axis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Physical size of one step, in `unit`.
    #[serde(skip_serializing_if = "is_unit_scale")]
    pub scale: f64,
    /// Border cropped from both ends of an output axis.
    #[serde(skip_serializing_if = "is_zero")]
    pub halo: u64,
}

/// One tensor axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Axis {
    /// Batch dimension.
    Batch(BatchAxis),
    /// Channel dimension.
    Channel(ChannelAxis),
    /// Generic index dimension.
    Index(IndexAxis),
    /// Time dimension.
    Time(PhysicalAxis),
    /// Space dimension.
    Space(PhysicalAxis),
}

impl Axis {
    /// The name as a single token; parallel channel names are joined with `,`.
    pub fn name_string(&self) -> String {
        match self {
            Self::Batch(_) => "batch".to_string(),
            Self::Channel(c) => c
                .name
                .iter()
                .map(ShortId::as_str)
                .collect::<Vec<_>>()
                .join(","),
            Self::Index(a) => a.name.to_string(),
            Self::Time(a) | Self::Space(a) => a.name.to_string(),
        }
    }

    /// The size rule; `None` for the batch axis.
    pub fn size(&self) -> Option<&AxisSize> {
        match self {
            Self::Batch(_) => None,
            Self::Channel(c) => Some(&c.size),
            Self::Index(a) => Some(&a.size),
            Self::Time(a) | Self::Space(a) => Some(&a.size),
        }
    }

    /// Whether the size is a bare axis token.
    pub fn is_string_sized(&self) -> bool {
        matches!(self.size(), Some(AxisSize::Same(_)))
    }

    /// Physical unit, for time and space axes.
    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::Time(a) | Self::Space(a) => a.unit.as_deref(),
            _ => None,
        }
    }

    /// Physical scale; 1 for axes without one.
    pub fn scale(&self) -> f64 {
        match self {
            Self::Time(a) | Self::Space(a) => a.scale,
            _ => 1.0,
        }
    }

    /// Halo; 0 for axes without one.
    pub fn halo(&self) -> u64 {
        match self {
            Self::Time(a) | Self::Space(a) => a.halo,
            _ => 0,
        }
    }

    /// Number of channels, when it is known statically.
    pub fn channel_count(&self) -> Option<usize> {
        let Self::Channel(c) = self else {
            return None;
        };
        match c.size {
            AxisSize::Fixed(n) => usize::try_from(n).ok(),
            _ if c.name.len() > 1 => Some(c.name.len()),
            _ => None,
        }
    }
}

/// Parse one axis of a tensor with the given role.
pub fn parse_axis(
    value: &Value,
    loc: &Loc,
    role: TensorRole,
    opts: &ParseOptions,
    diag: &mut Diagnostics,
) -> Option<Axis> {
    let mut reader = expect_mapping(value, loc, diag)?;
    let type_loc = reader.field_loc("type");
    let kind: String = reader.required("type", diag)?;
    let axis = match kind.as_str() {
        "batch" => parse_batch(&mut reader, diag).map(Axis::Batch),
        "channel" => parse_channel(&mut reader, diag).map(Axis::Channel),
        "index" => parse_index(&mut reader, diag).map(Axis::Index),
        "time" => parse_physical(&mut reader, diag, Dimension::Time, role, opts).map(Axis::Time),
        "space" => parse_physical(&mut reader, diag, Dimension::Space, role, opts).map(Axis::Space),
        other => {
            diag.error(
                &type_loc,
                format!(
                    "unknown axis type '{other}'; expected one of batch, channel, index, time, space"
                ),
            );
            return None;
        }
    };
    reader.finish(diag);
    axis
}

fn parse_batch(reader: &mut MappingReader<'_>, diag: &mut Diagnostics) -> Option<BatchAxis> {
    let name_loc = reader.field_loc("name");
    let name_ok = match reader.optional::<String>("name", diag) {
        Some(Some(name)) if name != "batch" => {
            diag.error(&name_loc, format!("batch axis name must be 'batch', got '{name}'"));
            false
        }
        Some(_) => true,
        None => false,
    };
    let size_loc = reader.field_loc("size");
    let size_ok = match reader.take("size") {
        None => true,
        Some(v) if is_batch_size(v) => true,
        Some(_) => {
            diag.error(
                &size_loc,
                "batch axis size is fixed to {min: 1, step: 1, step_with: BATCH_AXES}",
            );
            false
        }
    };
    let description = read_description(reader, diag);
    if !(name_ok && size_ok) {
        return None;
    }
    Some(BatchAxis {
        description: description?,
    })
}

fn is_batch_size(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    map.keys().all(|k| matches!(k.as_str(), "min" | "step" | "step_with"))
        && map.get("min").and_then(Value::as_u64) == Some(1)
        && map.get("step").and_then(Value::as_u64) == Some(1)
        && map
            .get("step_with")
            .map_or(true, |v| v.as_str() == Some(StepWith::BATCH_AXES))
}

fn parse_channel(reader: &mut MappingReader<'_>, diag: &mut Diagnostics) -> Option<ChannelAxis> {
    let names_loc = reader.field_loc("name");
    let names = match reader.optional::<Vec<ShortId>>("name", diag) {
        Some(Some(names)) if names.is_empty() => {
            diag.error(&names_loc, "a channel axis needs at least one channel name");
            None
        }
        Some(Some(names)) => Some(names),
        Some(None) => ShortId::new("channel").ok().map(|n| vec![n]),
        None => None,
    };
    let description = read_description(reader, diag);
    let size_loc = reader.field_loc("size");
    let size = reader.optional::<AxisSize>("size", diag);

    let names = names?;
    let count = names.len() as u64;
    let size = size?.unwrap_or(AxisSize::Fixed(count));
    if let AxisSize::Fixed(n) = size {
        if count > 1 && n != count {
            diag.error(
                &size_loc,
                format!("channel axis size {n} does not match its {count} channel names"),
            );
            return None;
        }
    }
    Some(ChannelAxis {
        name: names,
        description: description?,
        size,
    })
}

fn parse_index(reader: &mut MappingReader<'_>, diag: &mut Diagnostics) -> Option<IndexAxis> {
    let name = read_name(reader, diag, "index");
    let description = read_description(reader, diag);
    let size = reader.required::<AxisSize>("size", diag);
    Some(IndexAxis {
        name: name?,
        description: description?,
        size: size?,
    })
}

#[derive(Clone, Copy)]
enum Dimension {
    Time,
    Space,
}

fn parse_physical(
    reader: &mut MappingReader<'_>,
    diag: &mut Diagnostics,
    dimension: Dimension,
    role: TensorRole,
    opts: &ParseOptions,
) -> Option<PhysicalAxis> {
    let (default_name, label, known): (&str, &str, fn(&str) -> bool) = match dimension {
        Dimension::Time => ("time", "time", is_time_unit as fn(&str) -> bool),
        Dimension::Space => ("x", "space", is_space_unit as fn(&str) -> bool),
    };
    let name = read_name(reader, diag, default_name);
    let description = read_description(reader, diag);
    let size = reader.required::<AxisSize>("size", diag);

    let unit_loc = reader.field_loc("unit");
    let unit = reader.optional::<String>("unit", diag);
    if let Some(Some(unit)) = &unit {
        if opts.warn_unknown_units && !known(unit) {
            diag.warning(&unit_loc, format!("'{unit}' is not a known {label} unit"));
        }
    }

    let scale_loc = reader.field_loc("scale");
    let scale = match reader.defaulted("scale", diag, 1.0_f64) {
        Some(s) if s <= 0.0 => {
            diag.error(&scale_loc, "scale must be greater than 0");
            None
        }
        other => other,
    };

    // Input axes have no halo; leaving the key unread rejects it as an extra field.
    let halo = match role {
        TensorRole::Output => reader.defaulted("halo", diag, 0_u64),
        TensorRole::Input => Some(0),
    };

    let size = size?;
    let halo = halo?;
    check_halo_fits(&size, halo, reader.loc(), diag);
    Some(PhysicalAxis {
        name: name?,
        description: description?,
        size,
        unit: unit?,
        scale: scale?,
        halo,
    })
}

/// Check a halo against statically known sizes, evaluated at `n = 0`.
/// Referenced sizes are checked once references are resolved.
fn check_halo_fits(size: &AxisSize, halo: u64, axis_loc: &Loc, diag: &mut Diagnostics) {
    let min = match size {
        AxisSize::Fixed(n) => *n,
        AxisSize::Parametrized(p) => p.min,
        AxisSize::Reference(_) | AxisSize::Same(_) => return,
    };
    if halo > 0 && min < halo.saturating_mul(2) {
        diag.error(&axis_loc.field("halo"), halo_too_large(halo, min));
    }
}

pub(crate) fn halo_too_large(halo: u64, size: u64) -> String {
    format!("halo {halo} is too large for an axis of size {size}; the size must be at least 2*halo")
}

// ── Shared field readers ────────────────────────────────────────────

/// Read an optional name, falling back to `default` when absent.
pub(crate) fn read_name(
    reader: &mut MappingReader<'_>,
    diag: &mut Diagnostics,
    default: &str,
) -> Option<ShortId> {
    match reader.optional::<ShortId>("name", diag) {
        Some(Some(name)) => Some(name),
        Some(None) => ShortId::new(default).ok(),
        None => None,
    }
}

/// Read an optional, length-limited `description` (default empty).
pub(crate) fn read_description(
    reader: &mut MappingReader<'_>,
    diag: &mut Diagnostics,
) -> Option<String> {
    let loc = reader.field_loc("description");
    let text = reader.defaulted("description", diag, String::new())?;
    if text.chars().count() > DESCRIPTION_MAX_LEN {
        diag.error(
            &loc,
            format!("description is longer than {DESCRIPTION_MAX_LEN} characters"),
        );
        return None;
    }
    Some(text)
}

fn read_positive(reader: &mut MappingReader<'_>, key: &str, diag: &mut Diagnostics) -> Option<u64> {
    let loc = reader.field_loc(key);
    let n: u64 = reader.required(key, diag)?;
    if n == 0 {
        diag.error(&loc, format!("{key} must be greater than 0"));
        return None;
    }
    Some(n)
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

fn is_unit_scale(s: &f64) -> bool {
    *s == 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value, role: TensorRole) -> (Option<Axis>, Diagnostics) {
        let mut diag = Diagnostics::new();
        let loc = Loc::root().field("inputs").index(0).field("axes").index(0);
        let axis = parse_axis(&raw, &loc, role, &ParseOptions::default(), &mut diag);
        (axis, diag)
    }

    fn error_locs(diag: &Diagnostics) -> Vec<String> {
        diag.errors().iter().map(|e| e.loc.to_string()).collect()
    }

    #[test]
    fn space_axis_defaults() {
        let (axis, diag) = parse(json!({"type": "space", "size": 10}), TensorRole::Input);
        assert!(!diag.has_errors(), "{:?}", diag.errors());
        let axis = axis.unwrap();
        assert_eq!(axis.name_string(), "x");
        assert_eq!(axis.scale(), 1.0);
        assert_eq!(axis.size(), Some(&AxisSize::Fixed(10)));
    }

    #[test]
    fn unknown_type_is_rejected_at_type() {
        let (axis, diag) = parse(json!({"type": "frequency", "size": 3}), TensorRole::Input);
        assert!(axis.is_none());
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].type"]);
    }

    #[test]
    fn batch_axis_fixed_name_and_size() {
        let (axis, diag) = parse(json!({"type": "batch"}), TensorRole::Input);
        assert!(!diag.has_errors());
        let axis = axis.unwrap();
        assert_eq!(axis.name_string(), "batch");
        assert!(axis.size().is_none());
        assert_eq!(serde_json::to_value(&axis).unwrap(), json!({"type": "batch"}));

        let (_, diag) = parse(
            json!({"type": "batch", "size": {"min": 1, "step": 1, "step_with": "BATCH_AXES"}}),
            TensorRole::Input,
        );
        assert!(!diag.has_errors());

        let (axis, diag) = parse(json!({"type": "batch", "size": 4}), TensorRole::Input);
        assert!(axis.is_none());
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].size"]);

        let (axis, diag) = parse(json!({"type": "batch", "name": "b"}), TensorRole::Input);
        assert!(axis.is_none());
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].name"]);
    }

    #[test]
    fn channel_axis_names_and_size() {
        let (axis, diag) = parse(json!({"type": "channel", "name": ["r", "g", "b"]}), TensorRole::Input);
        assert!(!diag.has_errors());
        let axis = axis.unwrap();
        assert_eq!(axis.name_string(), "r,g,b");
        assert_eq!(axis.size(), Some(&AxisSize::Fixed(3)));
        assert_eq!(axis.channel_count(), Some(3));

        let (axis, diag) = parse(json!({"type": "channel", "size": 3}), TensorRole::Input);
        assert!(!diag.has_errors());
        assert_eq!(axis.unwrap().name_string(), "channel");

        let (axis, diag) = parse(
            json!({"type": "channel", "name": ["a", "b"], "size": 3}),
            TensorRole::Input,
        );
        assert!(axis.is_none());
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].size"]);
    }

    #[test]
    fn size_variants() {
        let (axis, _) = parse(
            json!({"type": "space", "name": "y", "size": {"min": 16, "step": 8, "step_with": "input_1.x"}}),
            TensorRole::Input,
        );
        let Some(AxisSize::Parametrized(p)) = axis.as_ref().and_then(Axis::size) else {
            panic!("expected a parametrized size");
        };
        assert_eq!(p.size(2), 32);

        let (axis, _) = parse(
            json!({"type": "space", "size": {"reference": "input_1.x", "offset": 4}}),
            TensorRole::Output,
        );
        assert!(matches!(
            axis.as_ref().and_then(Axis::size),
            Some(AxisSize::Reference(SizeReference { offset: 4, .. }))
        ));

        let (axis, _) = parse(json!({"type": "index", "size": "x"}), TensorRole::Input);
        assert!(axis.unwrap().is_string_sized());
    }

    #[test]
    fn invalid_sizes() {
        let (_, diag) = parse(json!({"type": "space", "size": 0}), TensorRole::Input);
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].size"]);

        let (_, diag) = parse(
            json!({"type": "space", "size": {"min": 0, "step": 0}}),
            TensorRole::Input,
        );
        assert_eq!(
            error_locs(&diag),
            vec!["inputs[0].axes[0].size.min", "inputs[0].axes[0].size.step"]
        );

        let (_, diag) = parse(json!({"type": "space", "size": [1, 2]}), TensorRole::Input);
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].size"]);
    }

    #[test]
    fn halo_only_on_outputs() {
        let raw = json!({"type": "space", "size": 64, "halo": 8});
        let (axis, diag) = parse(raw.clone(), TensorRole::Output);
        assert!(!diag.has_errors());
        assert_eq!(axis.unwrap().halo(), 8);

        let (_, diag) = parse(raw, TensorRole::Input);
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].halo"]);
        assert_eq!(diag.errors()[0].msg, "extra fields not permitted");
    }

    #[test]
    fn halo_too_large_for_fixed_size() {
        let (axis, diag) = parse(json!({"type": "space", "size": 15, "halo": 999}), TensorRole::Output);
        assert!(axis.is_some());
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].halo"]);
        assert!(diag.errors()[0].msg.contains("too large"));

        let (_, diag) = parse(json!({"type": "time", "size": 16, "halo": 8}), TensorRole::Output);
        assert!(!diag.has_errors());
    }

    #[test]
    fn unknown_unit_warns() {
        let (axis, diag) = parse(json!({"type": "space", "size": 5, "unit": "parsecs"}), TensorRole::Input);
        assert!(axis.is_some());
        assert!(!diag.has_errors());
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(diag.warnings()[0].loc.to_string(), "inputs[0].axes[0].unit");

        let (_, diag) = parse(json!({"type": "time", "size": 5, "unit": "millisecond"}), TensorRole::Input);
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn scale_must_be_positive() {
        let (axis, diag) = parse(json!({"type": "space", "size": 5, "scale": 0.0}), TensorRole::Input);
        assert!(axis.is_none());
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].scale"]);
    }

    #[test]
    fn description_length_limit() {
        let long = "d".repeat(DESCRIPTION_MAX_LEN + 1);
        let (axis, diag) = parse(json!({"type": "index", "size": 5, "description": long}), TensorRole::Input);
        assert!(axis.is_none());
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[0].description"]);
    }
}
