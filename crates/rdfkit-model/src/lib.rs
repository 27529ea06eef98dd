//! # rdfkit-model: Typed Model Resource Descriptions
//!
//! The typed document model for format 0.5 model descriptions, built on the
//! primitives of `rdfkit-core`.
//!
//! - [`axis`]: the five axis kinds and their size rules.
//! - [`values`]: what a tensor's element values mean.
//! - [`processing`]: pre- and postprocessing steps.
//! - [`tensor`]: input and output tensors.
//! - [`weights`]: the weights map and its per-format entries.
//! - [`metadata`]: authors, citations, provenance.
//! - [`model`]: the root document, its parser and its dump.
//! - [`references`]: the cross-tensor axis reference pass.
//!
//! ## Crate Policy
//!
//! - Parsing never returns early on the first violation. Every parser
//!   takes a [`Diagnostics`](rdfkit_core::Diagnostics) and returns `None`
//!   only after recording why.
//! - Documents are parsed from raw trees only; no type here implements
//!   `Deserialize`.
//! - Configuration is passed in through [`ParseOptions`]. This crate reads
//!   no files and no environment.

pub mod axis;
pub mod metadata;
pub mod model;
pub mod options;
pub mod processing;
pub mod references;
pub mod tensor;
pub mod values;
pub mod weights;

pub use axis::{Axis, AxisSize, ParametrizedSize, SizeReference, TensorRole};
pub use model::{parse_raw, Model, ParsedDocument, ResourceType};
pub use options::ParseOptions;
pub use references::{check_document, DocumentOutline};
pub use tensor::{InputTensor, OutputTensor, TensorDescr, TensorOutline};
pub use values::{DataType, TensorValue, TensorValues};
pub use weights::{Architecture, Weights, WeightsEntry, WeightsFormat};
