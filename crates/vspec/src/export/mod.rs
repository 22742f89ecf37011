//! Exporter contract and the built-in back-ends
//!
//! An exporter is a pure consumer: it receives the expanded, validated tree
//! plus the registries and returns artifacts (path + bytes). It never
//! mutates the tree. The built-in back-ends are `json`, `yaml`, `csv`,
//! `tree` (terminal rendering), `ddsidl`, `franca`, `graphql`, `jsonschema`,
//! `protobuf`, `binary` (the length-prefixed codec), and `id` (static-UID
//! stamping).

pub mod binary;
pub mod csv;
pub mod ddsidl;
pub mod franca;
pub mod graphql;
pub mod id;
pub mod json;
pub mod jsonschema;
pub mod protobuf;
pub mod tree;
pub mod yaml;

use crate::error::{CompileError, Result};
use crate::pipeline::Compiled;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use vspec_model::{Node, QuantityRegistry, TypeRegistry, UnitRegistry};

/// Everything an exporter may look at
pub struct ExporterContext<'a> {
    pub tree: &'a Node,
    pub types_tree: Option<&'a Node>,
    pub units: &'a UnitRegistry,
    pub quantities: &'a QuantityRegistry,
    pub types: &'a TypeRegistry,
    pub extended_attributes: &'a [String],
}

impl<'a> ExporterContext<'a> {
    pub fn from_compiled(compiled: &'a Compiled) -> Self {
        Self {
            tree: &compiled.tree,
            types_tree: compiled.types_tree.as_ref(),
            units: &compiled.units,
            quantities: &compiled.quantities,
            types: &compiled.types,
            extended_attributes: &compiled.extended_attributes,
        }
    }
}

/// One output file of an export run
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    /// Write this artifact to its path
    pub fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|source| CompileError::io(source, parent))?;
            }
        }
        fs::write(&self.path, &self.bytes)
            .map_err(|source| CompileError::io(source, &self.path))?;
        info!(path = %self.path.display(), bytes = self.bytes.len(), "wrote artifact");
        Ok(())
    }
}

/// A back-end: turns a compiled tree into output artifacts
pub trait Exporter {
    /// Short format name, as spelled on the command line
    fn format(&self) -> &'static str;

    /// Produce the artifacts for `output`
    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>>;
}
