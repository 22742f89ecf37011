//! # Compiler for COVESA VSS signal catalogs
//!
//! The pipeline is a single-shot transformation: load the root vspec (and its
//! `#include` closure) into a flat model, apply overlays, materialize the
//! tree, expand instance templates, validate, then hand the tree to an
//! exporter. Every stage is synchronous and deterministic; registries are
//! built once and read-only afterwards.
//!
//! ## Usage
//!
//! The `vspec` binary drives the pipeline:
//!
//! ```bash
//! vspec export json spec/VehicleSignalSpecification.vspec \
//!     -u spec/units.yaml -q spec/quantities.yaml \
//!     -l overlays/fleet.vspec -o vss.json
//! ```
//!
//! `vspec export id` stamps static UIDs instead (and can validate against a
//! previously stamped vspec).
//!
//! ## Modules
//!
//! - [`loader`] - YAML reading and `#include` resolution
//! - [`overlay`] - overlay application on the flat model
//! - [`tree_build`] - flat model to tree materialization
//! - [`expand`] - instance template expansion
//! - [`validate`] - the semantic gatekeeper between the tree and exporters
//! - [`export`] - exporter contract and the built-in back-ends
//! - [`pipeline`] - the whole run, front to back
//! - [`cli`] - argument surface of the `vspec` binary

pub mod cli;
pub mod error;
pub mod expand;
pub mod export;
pub mod loader;
pub mod overlay;
pub mod pipeline;
pub mod tree_build;
pub mod validate;

pub use error::{CompileError, Result};
pub use pipeline::{CompileOptions, Compiled, compile};
