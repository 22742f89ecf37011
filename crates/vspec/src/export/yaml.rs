//! YAML back-end: flat FQN-keyed rendering
//!
//! The output is valid vspec input again, which is what the load-then-dump
//! round trip relies on. The static-UID stamping back-end reuses this
//! rendering for its output.

use super::{Artifact, Exporter, ExporterContext};
use crate::error::{CompileError, Result};
use std::path::Path;
use vspec_model::Node;

/// Render the tree as a flat FQN-keyed vspec document
#[derive(Debug, Clone, Default)]
pub struct YamlExporter;

impl Exporter for YamlExporter {
    fn format(&self) -> &'static str {
        "yaml"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let text = render_flat(context.tree)
            .map_err(|e| CompileError::io(std::io::Error::other(e), output))?;
        Ok(vec![Artifact::new(output, text.into_bytes())])
    }
}

/// Flat rendering shared with the id back-end
pub(crate) fn render_flat(root: &Node) -> std::result::Result<String, serde_yaml::Error> {
    let mut document = serde_yaml::Mapping::new();
    for (fqn, _, node) in root.preorder() {
        document.insert(
            serde_yaml::Value::String(fqn),
            serde_yaml::Value::Mapping(node.to_raw().to_mapping()),
        );
    }
    serde_yaml::to_string(&document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vspec_model::{Datatype, Payload, SignalData};

    #[test]
    fn flat_keys_in_preorder() {
        let mut data = SignalData::default();
        data.datatype = Some(Datatype::parse("float", None).unwrap());
        let mut leaf = Node::new("Speed", Payload::Sensor(data));
        leaf.description = Some("Speed".to_string());
        let mut root = Node::new("Vehicle", Payload::Branch { instances: None });
        root.description = Some("Root".to_string());
        root.children.push(leaf);

        let text = render_flat(&root).unwrap();
        let vehicle = text.find("Vehicle:").unwrap();
        let speed = text.find("Vehicle.Speed:").unwrap();
        assert!(vehicle < speed);
    }
}
