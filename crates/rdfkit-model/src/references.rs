//! # Cross-Tensor Reference Pass
//!
//! Second validation pass over the axis lists of all tensors. It runs after
//! every tensor has been parsed because a reference may point at any axis of
//! any earlier-described tensor.
//!
//! ## Valid references
//!
//! For an axis of tensor `T`, a size token (`size: "<ref>"`,
//! `size: {reference: "<ref>"}` or `size.step_with`) is valid if it is
//!
//! 1. an axis name of `T` itself whose size is not a bare token, or
//! 2. `<tensor>.<axis>` for another tensor's axis whose size is not a bare
//!    token, where inputs may only name other inputs and outputs may name
//!    inputs and other outputs.
//!
//! Excluding string-sized axes prevents reference chains. An axis may not
//! name itself.
//!
//! ## Partial documents
//!
//! Axes that failed to parse are absent from their tensor's outline. A
//! reference that could have pointed at such an axis is not reported, so one
//! malformed axis never produces a second, cascading error.
//!
//! Once references are known to be valid, size references are also checked
//! for matching units, and halos of referenced sizes are checked against the
//! resolved minimum size.

use std::collections::BTreeSet;

use rdfkit_core::{AxisRef, Diagnostics, Loc, TensorId};

use crate::axis::{halo_too_large, Axis, AxisSize, TensorRole};
use crate::tensor::TensorOutline;

/// The parts of a document the reference pass needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentOutline {
    /// Input tensors, if `inputs` was a list.
    pub inputs: Option<Vec<TensorOutline>>,
    /// Output tensors, if `outputs` was a list.
    pub outputs: Option<Vec<TensorOutline>>,
}

/// Run the reference pass, recording cross-reference errors in `diag`.
pub fn check_document(outline: &DocumentOutline, diag: &mut Diagnostics) {
    let inputs = outline.inputs.as_deref().unwrap_or_default();
    let outputs = outline.outputs.as_deref().unwrap_or_default();
    let table = AxisTable {
        entries: entries(TensorRole::Input, inputs)
            .chain(entries(TensorRole::Output, outputs))
            .collect(),
        inputs_unknown: outline.inputs.is_none(),
    };
    for (position, entry) in table.entries.iter().enumerate() {
        check_tensor(&table, position, entry, diag);
    }
}

/// One tensor as seen by the pass.
struct Entry<'a> {
    role: TensorRole,
    /// Index within its role's list.
    index: usize,
    outline: &'a TensorOutline,
}

fn entries(role: TensorRole, outlines: &[TensorOutline]) -> impl Iterator<Item = Entry<'_>> {
    outlines
        .iter()
        .enumerate()
        .map(move |(index, outline)| Entry {
            role,
            index,
            outline,
        })
}

impl Entry<'_> {
    fn name(&self) -> Option<&TensorId> {
        self.outline.name.as_ref()
    }

    fn parsed_axes(&self) -> impl Iterator<Item = &Axis> + '_ {
        self.outline.axes.iter().flatten().flatten()
    }

    fn axis(&self, name: &str) -> Option<&Axis> {
        self.parsed_axes().find(|a| a.name_string() == name)
    }

    /// Axis names that may be referenced.
    fn addressable(&self) -> impl Iterator<Item = String> + '_ {
        self.parsed_axes()
            .filter(|a| !a.is_string_sized())
            .map(Axis::name_string)
    }
}

/// All tensors, inputs first.
struct AxisTable<'a> {
    entries: Vec<Entry<'a>>,
    /// `inputs` was not a list, so any qualified reference may target it.
    inputs_unknown: bool,
}

impl<'a> AxisTable<'a> {
    /// Tensors that the tensor at `position` may reference.
    fn pool(&self, position: usize) -> impl Iterator<Item = &Entry<'a>> + '_ {
        let role = self.entries[position].role;
        self.entries
            .iter()
            .enumerate()
            .filter(move |(p, e)| {
                *p != position && (role == TensorRole::Output || e.role == TensorRole::Input)
            })
            .map(|(_, e)| e)
    }

    /// Resolve `reference` as seen from the tensor at `position`.
    fn lookup(&self, position: usize, reference: &AxisRef) -> Option<(usize, &Axis)> {
        match reference.parts() {
            (None, axis) => Some((position, self.entries[position].axis(axis)?)),
            (Some(tensor), axis) => self
                .entries
                .iter()
                .enumerate()
                .find(|(_, e)| e.name().is_some_and(|n| n.as_str() == tensor))
                .and_then(|(p, e)| Some((p, e.axis(axis)?))),
        }
    }

    /// Smallest size the axis can take, following references. `None` when
    /// a reference cannot be resolved or loops back.
    fn min_size(&self, position: usize, axis: &Axis, visiting: &mut Vec<(usize, String)>) -> Option<u64> {
        let Some(size) = axis.size() else {
            return Some(1);
        };
        match size {
            AxisSize::Fixed(n) => Some(*n),
            AxisSize::Parametrized(p) => Some(p.min),
            AxisSize::Same(reference) => self.follow(position, axis, reference, visiting).map(|(min, _)| min),
            AxisSize::Reference(r) => {
                let (target_min, target_scale) = self.follow(position, axis, &r.reference, visiting)?;
                let scaled = (target_min as f64 / target_scale * axis.scale()).floor();
                Some((scaled.max(0.0) as u64).saturating_add(r.offset))
            }
        }
    }

    /// Minimum size and scale of the axis `reference` names.
    fn follow(
        &self,
        position: usize,
        axis: &Axis,
        reference: &AxisRef,
        visiting: &mut Vec<(usize, String)>,
    ) -> Option<(u64, f64)> {
        let key = (position, axis.name_string());
        if visiting.contains(&key) {
            return None;
        }
        visiting.push(key);
        let (target_pos, target) = self.lookup(position, reference)?;
        let min = self.min_size(target_pos, target, visiting)?;
        visiting.pop();
        Some((min, target.scale()))
    }
}

fn check_tensor(table: &AxisTable<'_>, position: usize, entry: &Entry<'_>, diag: &mut Diagnostics) {
    let Some(axes) = entry.outline.axes.as_deref() else {
        return;
    };
    let tensor_loc = Loc::root().field(entry.role.as_str()).index(entry.index);

    let mut valid: BTreeSet<String> = entry.addressable().collect();
    let mut unknown_names = table.inputs_unknown;
    let mut incomplete: BTreeSet<&str> = BTreeSet::new();
    for other in table.pool(position) {
        match other.name() {
            Some(name) => {
                valid.extend(other.addressable().map(|a| format!("{name}.{a}")));
                if !other.outline.is_complete() {
                    incomplete.insert(name.as_str());
                }
            }
            None => unknown_names = true,
        }
    }
    let local_incomplete = axes.iter().any(Option::is_none);

    for (a, axis) in axes.iter().enumerate() {
        let Some(axis) = axis else {
            continue;
        };
        let Some(size) = axis.size() else {
            continue;
        };
        let axis_loc = tensor_loc.field("axes").index(a);
        let Some(reference) = size.referenced_axis() else {
            continue;
        };
        let loc = match size {
            AxisSize::Parametrized(_) => axis_loc.field("size").field("step_with"),
            _ => axis_loc.field("size"),
        };

        let own_name = axis.name_string();
        if reference.parts() == (None, own_name.as_str()) {
            diag.cross_reference_error(
                &loc,
                format!("axis '{own_name}' cannot reference itself"),
            );
            continue;
        }
        if !valid.contains(reference.as_str()) {
            let undecidable = match reference.parts() {
                (None, _) => local_incomplete,
                (Some(tensor), _) => unknown_names || incomplete.contains(tensor),
            };
            if !undecidable {
                diag.cross_reference_error(
                    &loc,
                    format!("invalid tensor axis reference '{reference}'"),
                );
            }
            continue;
        }

        if let AxisSize::Reference(_) = size {
            if let Some((_, target)) = table.lookup(position, reference) {
                if axis.unit() != target.unit() {
                    diag.error(
                        &axis_loc.field("size"),
                        format!(
                            "unit {} does not match the unit {} of referenced axis '{reference}'",
                            unit_label(axis.unit()),
                            unit_label(target.unit())
                        ),
                    );
                    continue;
                }
            }
        }

        let halo = axis.halo();
        if halo > 0 && matches!(size, AxisSize::Reference(_) | AxisSize::Same(_)) {
            if let Some(min) = table.min_size(position, axis, &mut Vec::new()) {
                if min < halo.saturating_mul(2) {
                    diag.error(&axis_loc.field("halo"), halo_too_large(halo, min));
                }
            }
        }
    }
}

fn unit_label(unit: Option<&str>) -> String {
    unit.map_or_else(|| "(none)".to_string(), |u| format!("'{u}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::parse_axis;
    use crate::options::ParseOptions;
    use rdfkit_core::Loc;
    use serde_json::{json, Value};

    fn outline(name: &str, role: TensorRole, axes: Value) -> TensorOutline {
        let mut diag = Diagnostics::new();
        let axes = axes
            .as_array()
            .unwrap()
            .iter()
            .map(|raw| parse_axis(raw, &Loc::root(), role, &ParseOptions::default(), &mut diag))
            .collect();
        TensorOutline {
            name: TensorId::new(name).ok(),
            axes: Some(axes),
        }
    }

    fn input_1() -> TensorOutline {
        outline(
            "input_1",
            TensorRole::Input,
            json!([
                {"type": "space", "name": "x", "size": 10},
                {"type": "space", "name": "y", "size": 20},
                {"type": "channel", "size": 3},
            ]),
        )
    }

    fn check(inputs: Vec<TensorOutline>, outputs: Vec<TensorOutline>) -> Diagnostics {
        let mut diag = Diagnostics::new();
        check_document(
            &DocumentOutline {
                inputs: Some(inputs),
                outputs: Some(outputs),
            },
            &mut diag,
        );
        diag
    }

    fn error_locs(diag: &Diagnostics) -> Vec<String> {
        diag.errors().iter().map(|e| e.loc.to_string()).collect()
    }

    #[test]
    fn output_references_input_axis() {
        let out = outline(
            "output_1",
            TensorRole::Output,
            json!([{"type": "space", "name": "x", "size": {"reference": "input_1.x"}, "halo": 2}]),
        );
        let diag = check(vec![input_1()], vec![out]);
        assert!(!diag.has_errors(), "{:?}", diag.errors());
    }

    #[test]
    fn reference_to_missing_axis() {
        let out = outline(
            "output_1",
            TensorRole::Output,
            json!([{"type": "space", "name": "x", "size": {"reference": "input_1.z"}, "halo": 2}]),
        );
        let diag = check(vec![input_1()], vec![out]);
        assert_eq!(error_locs(&diag), vec!["outputs[0].axes[0].size"]);
        assert_eq!(diag.errors()[0].kind, rdfkit_core::ErrorKind::CrossReference);
    }

    #[test]
    fn halo_checked_against_resolved_size() {
        let out = outline(
            "output_1",
            TensorRole::Output,
            json!([{"type": "space", "name": "x", "size": {"reference": "input_1.x"}, "halo": 999}]),
        );
        let diag = check(vec![input_1()], vec![out]);
        assert_eq!(error_locs(&diag), vec!["outputs[0].axes[0].halo"]);
    }

    #[test]
    fn resolved_size_uses_scale_and_offset() {
        // 20 / 1 * 0.5 + 3 = 13 >= 2*6
        let out = outline(
            "output_1",
            TensorRole::Output,
            json!([{"type": "space", "name": "y", "scale": 0.5, "size": {"reference": "input_1.y", "offset": 3}, "halo": 6}]),
        );
        assert!(!check(vec![input_1()], vec![out]).has_errors());

        let out = outline(
            "output_1",
            TensorRole::Output,
            json!([{"type": "space", "name": "y", "scale": 0.5, "size": {"reference": "input_1.y", "offset": 3}, "halo": 7}]),
        );
        assert_eq!(error_locs(&check(vec![input_1()], vec![out])), vec!["outputs[0].axes[0].halo"]);
    }

    #[test]
    fn inputs_cannot_reference_outputs() {
        let input_2 = outline(
            "input_2",
            TensorRole::Input,
            json!([{"type": "index", "size": "output_1.x"}]),
        );
        let out = outline("output_1", TensorRole::Output, json!([{"type": "space", "name": "x", "size": 5}]));
        let diag = check(vec![input_1(), input_2], vec![out]);
        assert_eq!(error_locs(&diag), vec!["inputs[1].axes[0].size"]);
    }

    #[test]
    fn outputs_may_reference_sibling_outputs() {
        let out_1 = outline("output_1", TensorRole::Output, json!([{"type": "space", "name": "x", "size": 5}]));
        let out_2 = outline("output_2", TensorRole::Output, json!([{"type": "index", "size": "output_1.x"}]));
        assert!(!check(vec![input_1()], vec![out_1, out_2]).has_errors());
    }

    #[test]
    fn step_with_location() {
        let input_2 = outline(
            "input_2",
            TensorRole::Input,
            json!([
                {"type": "space", "name": "x", "size": {"min": 16, "step": 16, "step_with": "input_1.x"}},
                {"type": "space", "name": "y", "size": {"min": 16, "step": 16, "step_with": "input_1.w"}},
                {"type": "space", "name": "z", "size": {"min": 16, "step": 16, "step_with": "BATCH_AXES"}},
            ]),
        );
        let diag = check(vec![input_1(), input_2], vec![]);
        assert_eq!(error_locs(&diag), vec!["inputs[1].axes[1].size.step_with"]);
    }

    #[test]
    fn string_sized_axes_are_not_addressable() {
        let input_2 = outline(
            "input_2",
            TensorRole::Input,
            json!([
                {"type": "space", "name": "x", "size": "input_1.x"},
                {"type": "space", "name": "y", "size": "x"},
            ]),
        );
        let diag = check(vec![input_1(), input_2], vec![]);
        assert_eq!(error_locs(&diag), vec!["inputs[1].axes[1].size"]);
    }

    #[test]
    fn local_reference_and_self_reference() {
        let t = outline(
            "input_2",
            TensorRole::Input,
            json!([
                {"type": "space", "name": "x", "size": 32},
                {"type": "space", "name": "y", "size": "x"},
                {"type": "space", "name": "z", "size": {"reference": "z"}},
            ]),
        );
        let diag = check(vec![t], vec![]);
        assert_eq!(error_locs(&diag), vec!["inputs[0].axes[2].size"]);
    }

    #[test]
    fn unit_mismatch_is_an_error() {
        let input = outline(
            "input_1",
            TensorRole::Input,
            json!([{"type": "space", "name": "x", "size": 64, "unit": "micrometer"}]),
        );
        let out = outline(
            "output_1",
            TensorRole::Output,
            json!([{"type": "space", "name": "x", "size": {"reference": "input_1.x"}, "unit": "millimeter"}]),
        );
        let diag = check(vec![input], vec![out]);
        assert_eq!(error_locs(&diag), vec!["outputs[0].axes[0].size"]);
        assert_eq!(diag.errors()[0].kind, rdfkit_core::ErrorKind::Structural);
    }

    #[test]
    fn malformed_target_axis_does_not_cascade() {
        let input = outline(
            "input_1",
            TensorRole::Input,
            json!([{"type": "space", "name": "x", "size": 10}, {"type": "bogus"}]),
        );
        let out = outline(
            "output_1",
            TensorRole::Output,
            json!([{"type": "space", "name": "x", "size": {"reference": "input_1.w"}}]),
        );
        assert!(!check(vec![input], vec![out]).has_errors());
    }

    #[test]
    fn reference_cycle_terminates() {
        let out = outline(
            "output_1",
            TensorRole::Output,
            json!([
                {"type": "space", "name": "x", "size": {"reference": "output_2.x"}, "halo": 1},
            ]),
        );
        let out_2 = outline(
            "output_2",
            TensorRole::Output,
            json!([{"type": "space", "name": "x", "size": {"reference": "output_1.x"}, "halo": 1}]),
        );
        // Both references are valid tokens; the cycle only means the halo cannot be resolved.
        assert!(!check(vec![input_1()], vec![out, out_2]).has_errors());
    }

    #[test]
    fn channel_reference_to_input_channel() {
        let out = outline(
            "output_1",
            TensorRole::Output,
            json!([{"type": "channel", "size": {"reference": "input_1.channel"}}]),
        );
        assert!(!check(vec![input_1()], vec![out]).has_errors());
    }
}
