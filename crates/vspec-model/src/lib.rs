//! # Data model for the vspec VSS compiler
//!
//! This crate holds the representations every pipeline stage shares:
//!
//! - [`flat`] - the flat model, an insertion-ordered map from FQN to raw node
//! - [`node`] - the materialized signal tree
//! - [`datatype`] - built-in datatypes and struct references
//! - [`scalar`] - authored scalar values (min/max/default/allowed entries)
//! - [`units`] - unit and quantity registries
//! - [`types`] - the user-defined struct/property registry
//! - [`profile`] - typed declarations for extended attributes
//!
//! The flat model is the first representation after loading and the substrate
//! for overlay merging; the tree is what expansion, validation, and every
//! exporter consume. Registries are constructed once and read-only afterwards.

pub mod datatype;
pub mod error;
pub mod flat;
pub mod node;
pub mod profile;
pub mod scalar;
pub mod types;
pub mod units;

pub use datatype::{Datatype, Primitive};
pub use error::{ModelError, Result};
pub use flat::{FlatModel, RawNode};
pub use node::{InstanceDim, Instances, Node, NodeKind, Payload, SignalData};
pub use profile::{AttributeSpec, Profile};
pub use scalar::ScalarValue;
pub use types::{PropertyDef, StructDef, TypeRegistry};
pub use units::{Quantity, QuantityRegistry, Unit, UnitRegistry};
