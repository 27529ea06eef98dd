//! # Tensor Value Descriptions
//!
//! What the elements of a tensor mean: enumerated categories
//! (`nominal`/`ordinal`) or numbers on an `interval`/`ratio` scale with a
//! declared element data type. A tensor carries either one description or
//! one per channel.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use rdfkit_core::raw::type_name;
use rdfkit_core::{expect_mapping, parse_list, Diagnostics, FromRaw, Loc, MappingReader};

use crate::axis::read_description;

/// Element data type of an interval or ratio tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float32,
    Float64,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
}

impl DataType {
    /// All data types, in declaration order.
    pub const ALL: [DataType; 10] = [
        Self::Float32,
        Self::Float64,
        Self::Uint8,
        Self::Int8,
        Self::Uint16,
        Self::Int16,
        Self::Uint32,
        Self::Int32,
        Self::Uint64,
        Self::Int64,
    ];

    /// The spelling used in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Uint8 => "uint8",
            Self::Int8 => "int8",
            Self::Uint16 => "uint16",
            Self::Int16 => "int16",
            Self::Uint32 => "uint32",
            Self::Int32 => "int32",
            Self::Uint64 => "uint64",
            Self::Int64 => "int64",
        }
    }

    /// Look up a data type by its spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromRaw for DataType {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let name = String::from_raw(value, loc, diag)?;
        let found = Self::from_name(&name);
        if found.is_none() {
            let known: Vec<&str> = Self::ALL.iter().map(DataType::as_str).collect();
            diag.error(
                loc,
                format!("unknown data type '{name}'; expected one of {}", known.join(", ")),
            );
        }
        found
    }
}

/// Enumerated values of a nominal or ordinal tensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumeratedValues {
    /// Free-text description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// The categories; for ordinal values in ascending order.
    pub values: Vec<Value>,
}

/// `(min, max)` of the data; `None` means the data type's own limit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DataRange(pub Option<f64>, pub Option<f64>);

impl DataRange {
    fn is_unbounded(&self) -> bool {
        self.0.is_none() && self.1.is_none()
    }
}

/// Numeric values on an interval scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalValues {
    /// Free-text description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Unit of the values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Multiplier applied to stored values.
    #[serde(skip_serializing_if = "is_one")]
    pub factor: f64,
    /// Element data type.
    pub data_type: DataType,
    /// Allowed range of the data.
    #[serde(skip_serializing_if = "DataRange::is_unbounded")]
    pub data_range: DataRange,
}

/// Numeric values on a ratio scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioValues {
    #[serde(flatten)]
    pub interval: IntervalValues,
    /// Offset of the true zero.
    #[serde(skip_serializing_if = "is_zero")]
    pub offset: f64,
}

/// One value description, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TensorValue {
    /// Unordered categories.
    Nominal(EnumeratedValues),
    /// Ordered categories.
    Ordinal(EnumeratedValues),
    /// Numbers on an interval scale.
    Interval(IntervalValues),
    /// Numbers on a ratio scale.
    Ratio(RatioValues),
}

impl TensorValue {
    /// The data type of numeric value descriptions.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Interval(v) => Some(v.data_type),
            Self::Ratio(v) => Some(v.interval.data_type),
            Self::Nominal(_) | Self::Ordinal(_) => None,
        }
    }
}

impl FromRaw for TensorValue {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        let mut reader = expect_mapping(value, loc, diag)?;
        let type_loc = reader.field_loc("type");
        let kind: String = reader.required("type", diag)?;
        let parsed = match kind.as_str() {
            "nominal" => read_enumerated(&mut reader, diag).map(Self::Nominal),
            "ordinal" => read_enumerated(&mut reader, diag).map(Self::Ordinal),
            "interval" => read_interval(&mut reader, diag).map(Self::Interval),
            "ratio" => {
                let interval = read_interval(&mut reader, diag);
                let offset = reader.defaulted("offset", diag, 0.0_f64);
                interval.zip(offset).map(|(interval, offset)| {
                    Self::Ratio(RatioValues { interval, offset })
                })
            }
            other => {
                diag.error(
                    &type_loc,
                    format!(
                        "unknown value type '{other}'; expected one of nominal, ordinal, interval, ratio"
                    ),
                );
                return None;
            }
        };
        reader.finish(diag);
        parsed
    }
}

fn read_enumerated(reader: &mut MappingReader<'_>, diag: &mut Diagnostics) -> Option<EnumeratedValues> {
    let description = read_description(reader, diag);
    let values = reader.required_with("values", diag, parse_enumerated);
    Some(EnumeratedValues {
        description: description?,
        values: values?,
    })
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum ScalarKind {
    Bool,
    Number,
    String,
}

fn parse_enumerated(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Vec<Value>> {
    let kinds = parse_list(value, loc, diag, |item, item_loc, diag| match item {
        Value::Bool(_) => Some(ScalarKind::Bool),
        Value::Number(_) => Some(ScalarKind::Number),
        Value::String(_) => Some(ScalarKind::String),
        other => {
            diag.error(
                item_loc,
                format!("expected a string, number or boolean, got {}", type_name(other)),
            );
            None
        }
    })?;
    let Some(first) = kinds.first() else {
        diag.error(loc, "at least one value is required");
        return None;
    };
    if kinds.iter().any(|k| k != first) {
        diag.error(loc, "values must all be strings, all numbers or all booleans");
        return None;
    }
    value.as_array().cloned()
}

fn read_interval(reader: &mut MappingReader<'_>, diag: &mut Diagnostics) -> Option<IntervalValues> {
    let description = read_description(reader, diag);
    let unit = reader.optional::<String>("unit", diag);
    let factor = reader.defaulted("factor", diag, 1.0_f64);
    let data_type = reader.required::<DataType>("data_type", diag);
    let data_range = reader
        .optional_with("data_range", diag, parse_data_range)
        .map(Option::unwrap_or_default);
    Some(IntervalValues {
        description: description?,
        unit: unit?,
        factor: factor?,
        data_type: data_type?,
        data_range: data_range?,
    })
}

fn parse_data_range(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<DataRange> {
    let bounds = parse_list(value, loc, diag, |item, item_loc, diag| match item {
        Value::Null => Some(None),
        other => f64::from_raw(other, item_loc, diag).map(Some),
    })?;
    let &[min, max] = bounds.as_slice() else {
        diag.error(loc, format!("expected [min, max], got {} items", bounds.len()));
        return None;
    };
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            diag.error(loc, format!("data_range minimum {lo} exceeds maximum {hi}"));
            return None;
        }
    }
    Some(DataRange(min, max))
}

/// A tensor's value description: one for the whole tensor or one per channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TensorValues {
    /// Applies to all elements.
    Single(TensorValue),
    /// One entry per channel.
    PerChannel(Vec<TensorValue>),
}

impl TensorValues {
    /// Number of per-channel entries, if given per channel.
    pub fn per_channel_count(&self) -> Option<usize> {
        match self {
            Self::Single(_) => None,
            Self::PerChannel(v) => Some(v.len()),
        }
    }
}

impl FromRaw for TensorValues {
    fn from_raw(value: &Value, loc: &Loc, diag: &mut Diagnostics) -> Option<Self> {
        if !value.is_array() {
            return TensorValue::from_raw(value, loc, diag).map(Self::Single);
        }
        let entries: Vec<TensorValue> = Vec::from_raw(value, loc, diag)?;
        if entries.is_empty() {
            diag.error(loc, "at least one value description is required");
            return None;
        }
        let mut data_types = entries.iter().filter_map(TensorValue::data_type);
        if let Some(first) = data_types.next() {
            if data_types.any(|d| d != first) {
                diag.error(
                    loc,
                    "data_type must match across channels for interval and ratio values",
                );
                return None;
            }
        }
        Some(Self::PerChannel(entries))
    }
}

fn is_one(x: &f64) -> bool {
    *x == 1.0
}

fn is_zero(x: &f64) -> bool {
    *x == 0.0
}
