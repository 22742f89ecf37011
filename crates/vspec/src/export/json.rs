//! JSON back-end: nested-object rendering of the tree

use super::{Artifact, Exporter, ExporterContext};
use crate::error::{CompileError, Result};
use std::path::Path;
use vspec_model::Node;

/// Render the tree as one nested JSON object
#[derive(Debug, Clone, Default)]
pub struct JsonExporter {
    /// Pretty-print with indentation
    pub pretty: bool,
}

impl Exporter for JsonExporter {
    fn format(&self) -> &'static str {
        "json"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let mut root = serde_json::Map::new();
        root.insert(context.tree.name.to_string(), node_to_json(context.tree));
        let doc = serde_json::Value::Object(root);
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&doc)
        } else {
            serde_json::to_vec(&doc)
        }
        .map_err(|e| CompileError::io(std::io::Error::other(e), output))?;
        Ok(vec![Artifact::new(output, bytes)])
    }
}

fn node_to_json(node: &Node) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for (key, value) in node.to_raw().iter() {
        object.insert(key.to_string(), yaml_to_json(value));
    }
    if !node.children.is_empty() {
        let mut children = serde_json::Map::new();
        for child in &node.children {
            children.insert(child.name.to_string(), node_to_json(child));
        }
        object.insert("children".to_string(), serde_json::Value::Object(children));
    }
    serde_json::Value::Object(object)
}

fn yaml_to_json(value: &serde_yaml::Value) -> serde_json::Value {
    match value {
        serde_yaml::Value::Null => serde_json::Value::Null,
        serde_yaml::Value::Bool(b) => serde_json::Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::from(u)
            } else {
                n.as_f64().map(serde_json::Value::from).unwrap_or(serde_json::Value::Null)
            }
        }
        serde_yaml::Value::String(s) => serde_json::Value::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            serde_json::Value::Array(seq.iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = serde_json::Map::new();
            for (key, value) in mapping {
                if let Some(key) = key.as_str() {
                    object.insert(key.to_string(), yaml_to_json(value));
                }
            }
            serde_json::Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vspec_model::{Datatype, Payload, SignalData};

    #[test]
    fn nested_rendering() {
        let mut data = SignalData::default();
        data.datatype = Some(Datatype::parse("float", None).unwrap());
        let mut leaf = Node::new("Speed", Payload::Sensor(data));
        leaf.description = Some("Speed".to_string());
        let mut root = Node::new("Vehicle", Payload::Branch { instances: None });
        root.description = Some("Root".to_string());
        root.children.push(leaf);

        let doc = node_to_json(&root);
        assert_eq!(doc["type"], "branch");
        assert_eq!(doc["children"]["Speed"]["datatype"], "float");
        assert_eq!(doc["children"]["Speed"]["type"], "sensor");
    }
}
