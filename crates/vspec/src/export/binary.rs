//! Binary back-end: the length-prefixed tree codec

use super::{Artifact, Exporter, ExporterContext};
use crate::error::Result;
use std::path::Path;
use vspec_binary::BinaryNode;

/// Serialize the tree in the binary wire format
#[derive(Debug, Clone, Default)]
pub struct BinaryExporter;

impl Exporter for BinaryExporter {
    fn format(&self) -> &'static str {
        "binary"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let wire_tree = BinaryNode::from_model(context.tree);
        let bytes = vspec_binary::encode(&wire_tree)?;
        Ok(vec![Artifact::new(output, bytes)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vspec_model::{
        Datatype, Node, Payload, QuantityRegistry, SignalData, TypeRegistry, UnitRegistry,
    };

    #[test]
    fn exported_bytes_decode_back() {
        let mut data = SignalData::default();
        data.datatype = Some(Datatype::parse("float", None).unwrap());
        let mut leaf = Node::new("Speed", Payload::Sensor(data));
        leaf.description = Some("Speed".to_string());
        leaf.static_uid = Some(0xDEAD_BEEF);
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

        let artifacts = BinaryExporter
            .export(&context, Path::new("out.bin"))
            .unwrap();
        assert_eq!(artifacts.len(), 1);
        let (decoded, metadata) = vspec_binary::decode(&artifacts[0].bytes).unwrap();
        assert_eq!(metadata.node_count, 2);
        assert_eq!(decoded.children[0].uuid, "deadbeef");
    }
}
