//! Static-UID back-end: identifier-stamped vspec
//!
//! Stamps every node, optionally validates against a previously stamped
//! vspec (reporting added, deleted, breaking, non-breaking, and renamed
//! nodes), and writes the stamped tree back out as flat vspec YAML. In
//! validate-only mode the diagnostics are the whole point and no artifact
//! is produced.

use super::{Artifact, Exporter, ExporterContext};
use super::yaml::render_flat;
use crate::error::{CompileError, Result};
use crate::loader::Loader;
use crate::tree_build::build_tree;
use std::path::{Path, PathBuf};
use tracing::info;
use vspec_id::{ChangeKind, IdOptions, stamp_tree, validate_against};

/// Stamp static UIDs, with optional validation against a prior run
#[derive(Debug, Clone, Default)]
pub struct IdExporter {
    pub id_options: IdOptions,
    /// Previously stamped vspec to validate against
    pub prior: Option<PathBuf>,
    /// Report diagnostics without writing an artifact
    pub validate_only: bool,
    /// Include roots for loading the prior vspec
    pub include_dirs: Vec<PathBuf>,
}

impl Exporter for IdExporter {
    fn format(&self) -> &'static str {
        "id"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let mut stamped = context.tree.clone();
        stamp_tree(&mut stamped, &self.id_options)?;

        if let Some(prior_path) = &self.prior {
            let loader = Loader::new(self.include_dirs.clone());
            let prior_flat = loader.load_file(prior_path)?;
            let prior_tree = build_tree(&prior_flat, prior_path)?;
            let diagnostics = validate_against(&mut stamped, &prior_tree, &self.id_options);

            let breaking = diagnostics
                .iter()
                .filter(|d| d.kind == ChangeKind::BreakingChange)
                .count();
            info!(
                total = diagnostics.len(),
                breaking, "validated against prior stamped vspec"
            );
            for diagnostic in &diagnostics {
                // The human-facing report; tracing carries the structured copy.
                eprintln!("{}", diagnostic);
            }
        }

        if self.validate_only {
            return Ok(Vec::new());
        }

        let text = render_flat(&stamped)
            .map_err(|e| CompileError::io(std::io::Error::other(e), output))?;
        Ok(vec![Artifact::new(output, text.into_bytes())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vspec_model::{
        Datatype, Node, Payload, QuantityRegistry, SignalData, TypeRegistry, UnitRegistry,
    };

    #[test]
    fn stamped_output_carries_uids() {
        let mut data = SignalData::default();
        data.datatype = Some(Datatype::parse("float", None).unwrap());
        let mut leaf = Node::new("Speed", Payload::Sensor(data));
        leaf.description = Some("Speed".to_string());
        let mut root = Node::new("Vehicle", Payload::Branch { instances: None });
        root.description = Some("Root".to_string());
        root.children.push(leaf);

        let units = UnitRegistry::new();
        let quantities = QuantityRegistry::new();
        let types = TypeRegistry::new();
        let context = ExporterContext {
            tree: &root,
            types_tree: None,
            units: &units,
            quantities: &quantities,
            types: &types,
            extended_attributes: &[],
        };

        let artifacts = IdExporter::default()
            .export(&context, Path::new("stamped.vspec"))
            .unwrap();
        let text = String::from_utf8(artifacts[0].bytes.clone()).unwrap();
        assert!(text.contains("staticUID"));
        // The input tree is untouched.
        assert!(root.children[0].static_uid.is_none());
    }
}
