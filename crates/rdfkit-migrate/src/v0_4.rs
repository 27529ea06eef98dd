//! # 0.4 → 0.5.0
//!
//! Format 0.4 describes tensor axes as a letter string (`"bcyx"`) plus a
//! parallel `shape` and output `halo`; 0.5 describes each axis as its own
//! mapping. Test and sample tensors move from top-level lists onto the
//! tensors, element types move into `values`, and the state-dict
//! architecture fields are grouped.
//!
//! Every rewrite checks the old shape is still present first, so running
//! the step on an already converted document changes nothing.

use std::collections::BTreeMap;

use serde_json::{json, Map, Number, Value};

use rdfkit_core::{FormatVersion, RawMapping};

use crate::chain::MigrationStep;

/// The 0.4.x → 0.5.0 step.
pub const STEP: MigrationStep = MigrationStep {
    name: "0.4 to 0.5.0",
    source: FormatVersion::new_const(0, 4, 0),
    target: FormatVersion::new_const(0, 5, 0),
    transform: to_0_5_0,
};

const PROCESSING_KEYS: [&str; 2] = ["preprocessing", "postprocessing"];

/// Rewrite a 0.4 document into the 0.5.0 shape.
pub fn to_0_5_0(doc: &mut RawMapping) {
    let letters = axis_letters(doc);
    for key in ["inputs", "outputs"] {
        if let Some(Value::Array(tensors)) = doc.get_mut(key) {
            for tensor in tensors.iter_mut().filter_map(Value::as_object_mut) {
                convert_tensor(tensor, &letters);
            }
        }
    }
    redistribute(doc, "inputs", "test_inputs", "test_tensor");
    redistribute(doc, "inputs", "sample_inputs", "sample_tensor");
    redistribute(doc, "outputs", "test_outputs", "test_tensor");
    redistribute(doc, "outputs", "sample_outputs", "sample_tensor");
    convert_architecture(doc);
}

/// The 0.5 name of the axis a 0.4 letter stands for.
pub fn axis_name(letter: char) -> String {
    match letter {
        'b' => "batch".to_string(),
        'c' => "channel".to_string(),
        'i' => "index".to_string(),
        't' => "time".to_string(),
        other => other.to_string(),
    }
}

fn axis_type(letter: char) -> String {
    match letter {
        'x' | 'y' | 'z' => "space".to_string(),
        other => axis_name(other),
    }
}

/// Letter strings of every tensor that still has them, by tensor name.
fn axis_letters(doc: &RawMapping) -> BTreeMap<String, String> {
    ["inputs", "outputs"]
        .iter()
        .filter_map(|key| doc.get(*key)?.as_array())
        .flatten()
        .filter_map(|tensor| {
            let name = tensor.get("name")?.as_str()?;
            let axes = tensor.get("axes")?.as_str()?;
            Some((name.to_string(), axes.to_string()))
        })
        .collect()
}

fn convert_tensor(tensor: &mut RawMapping, letters: &BTreeMap<String, String>) {
    if let Some(Value::String(axes)) = tensor.get("axes").cloned() {
        let shape = tensor.remove("shape");
        let halo = tensor.remove("halo");
        let converted = axes
            .chars()
            .enumerate()
            .map(|(i, letter)| convert_axis(letter, i, shape.as_ref(), halo.as_ref(), letters))
            .collect();
        tensor.insert("axes".to_string(), Value::Array(converted));
    }

    if !tensor.contains_key("values") {
        if let Some(data_type) = tensor.remove("data_type") {
            let mut values = Map::new();
            values.insert("type".to_string(), json!("interval"));
            values.insert("data_type".to_string(), data_type);
            if let Some(range) = tensor.remove("data_range") {
                values.insert("data_range".to_string(), range);
            }
            tensor.insert("values".to_string(), Value::Object(values));
        }
    }

    for key in PROCESSING_KEYS {
        let Some(Value::Array(steps)) = tensor.get_mut(key) else {
            continue;
        };
        for kwargs in steps
            .iter_mut()
            .filter_map(|s| s.get_mut("kwargs")?.as_object_mut())
        {
            if let Some(Value::String(axes)) = kwargs.get("axes") {
                let names = axes.chars().map(|c| Value::String(axis_name(c))).collect();
                kwargs.insert("axes".to_string(), Value::Array(names));
            }
        }
    }
}

fn convert_axis(
    letter: char,
    index: usize,
    shape: Option<&Value>,
    halo: Option<&Value>,
    letters: &BTreeMap<String, String>,
) -> Value {
    let kind = axis_type(letter);
    let physical = matches!(kind.as_str(), "space" | "time");
    let mut axis = Map::new();
    axis.insert("type".to_string(), Value::String(kind.clone()));
    if kind == "space" {
        axis.insert("name".to_string(), Value::String(letter.to_string()));
    }
    if kind == "batch" {
        return Value::Object(axis);
    }

    match shape {
        Some(Value::Array(dims)) => {
            if let Some(n) = dims.get(index) {
                axis.insert("size".to_string(), n.clone());
            }
        }
        Some(Value::Object(spec)) if spec.contains_key("reference_tensor") => {
            let scale = nth(spec, "scale", index);
            let offset = nth(spec, "offset", index).and_then(Value::as_f64).unwrap_or(0.0);
            match (spec.get("reference_tensor").and_then(Value::as_str), scale) {
                (Some(tensor), Some(scale)) if !scale.is_null() => {
                    let target = letters
                        .get(tensor)
                        .and_then(|l| l.chars().nth(index))
                        .unwrap_or(letter);
                    let mut size = Map::new();
                    size.insert(
                        "reference".to_string(),
                        Value::String(format!("{tensor}.{}", axis_name(target))),
                    );
                    if offset != 0.0 {
                        size.insert("offset".to_string(), number(2.0 * offset));
                    }
                    axis.insert("size".to_string(), Value::Object(size));
                    if physical && scale.as_f64().is_some_and(|s| s != 1.0) {
                        axis.insert("scale".to_string(), scale.clone());
                    }
                }
                // A new axis without a reference: its size is the padding alone.
                _ => {
                    axis.insert("size".to_string(), number(2.0 * offset));
                }
            }
        }
        Some(Value::Object(spec)) => {
            let min = nth(spec, "min", index);
            let step = nth(spec, "step", index);
            if let (Some(min), Some(step)) = (min, step) {
                let size = if step.as_u64() == Some(0) {
                    min.clone()
                } else {
                    json!({"min": min, "step": step})
                };
                axis.insert("size".to_string(), size);
            }
        }
        _ => {}
    }

    if physical {
        if let Some(h) = halo.and_then(|h| h.get(index)).filter(|h| h.as_u64() != Some(0)) {
            axis.insert("halo".to_string(), h.clone());
        }
    }
    Value::Object(axis)
}

fn nth<'a>(spec: &'a RawMapping, key: &str, index: usize) -> Option<&'a Value> {
    spec.get(key)?.as_array()?.get(index)
}

/// Integral values become integers, anything else stays a float.
///
/// Negative results are kept as they are; the 0.5 parser rejects them at
/// the axis they ended up on.
fn number(x: f64) -> Value {
    if x.fract() == 0.0 && x >= 0.0 && x < u64::MAX as f64 {
        json!(x as u64)
    } else if x.fract() == 0.0 && x < 0.0 && x >= i64::MIN as f64 {
        json!(x as i64)
    } else {
        Number::from_f64(x).map_or(Value::Null, Value::Number)
    }
}

/// Move `list_key[i]` onto `tensors_key[i].field`, if the lengths match.
fn redistribute(doc: &mut RawMapping, tensors_key: &str, list_key: &str, field: &str) {
    let Some(Value::Array(items)) = doc.get(list_key).cloned() else {
        return;
    };
    let Some(Value::Array(tensors)) = doc.get_mut(tensors_key) else {
        return;
    };
    if tensors.len() != items.len() {
        return;
    }
    for (tensor, item) in tensors.iter_mut().zip(items) {
        if let Some(tensor) = tensor.as_object_mut() {
            tensor.entry(field).or_insert(item);
        }
    }
    doc.remove(list_key);
}

fn convert_architecture(doc: &mut RawMapping) {
    let Some(entry) = doc
        .get_mut("weights")
        .and_then(|w| w.get_mut("pytorch_state_dict"))
        .and_then(Value::as_object_mut)
    else {
        return;
    };
    let Some(Value::String(callable)) = entry.get("architecture").cloned() else {
        return;
    };
    let mut architecture = Map::new();
    architecture.insert("callable".to_string(), Value::String(callable));
    if let Some(sha256) = entry.remove("architecture_sha256") {
        architecture.insert("sha256".to_string(), sha256);
    }
    match entry.remove("kwargs") {
        Some(Value::Object(kwargs)) if kwargs.is_empty() => {}
        Some(kwargs) => {
            architecture.insert("kwargs".to_string(), kwargs);
        }
        None => {}
    }
    entry.insert("architecture".to_string(), Value::Object(architecture));
}
