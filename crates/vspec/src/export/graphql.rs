//! GraphQL back-end: SDL with one object type per branch
//!
//! Type names join the FQN segments with underscores (`Vehicle_Cabin_Door`);
//! leaves map to the GraphQL scalars, with the 64-bit integers widened to
//! `Float` because GraphQL's `Int` is 32-bit signed. Descriptions render as
//! block strings.

use super::{Artifact, Exporter, ExporterContext};
use crate::error::Result;
use std::path::Path;
use vspec_model::{Datatype, Node, Primitive};

/// Render the tree as a GraphQL schema (SDL)
#[derive(Debug, Clone, Default)]
pub struct GraphqlExporter;

impl Exporter for GraphqlExporter {
    fn format(&self) -> &'static str {
        "graphql"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let mut out = String::with_capacity(4096);
        out.push_str(&format!(
            "schema {{\n  query: {}\n}}\n",
            type_name(&context.tree.name)
        ));
        emit_type(context.tree, &context.tree.name, &mut out);
        Ok(vec![Artifact::new(output, out.into_bytes())])
    }
}

fn emit_type(node: &Node, path: &str, out: &mut String) {
    out.push('\n');
    if let Some(description) = &node.description {
        out.push_str(&format!("\"\"\"{}\"\"\"\n", description));
    }
    out.push_str(&format!("type {} {{\n", type_name(path)));
    for child in &node.children {
        if let Some(description) = &child.description {
            out.push_str(&format!("  \"\"\"{}\"\"\"\n", description));
        }
        let child_path = format!("{}.{}", path, child.name);
        let rendered = match child.signal().and_then(|s| s.datatype.as_ref()) {
            Some(datatype) => field_type(datatype),
            None => type_name(&child_path),
        };
        out.push_str(&format!("  {}: {}\n", field_name(&child.name), rendered));
    }
    out.push_str("}\n");

    for child in &node.children {
        if child.kind().is_grouping() {
            emit_type(child, &format!("{}.{}", path, child.name), out);
        }
    }
}

fn field_type(datatype: &Datatype) -> String {
    let base = match datatype.primitive() {
        Some(primitive) => scalar(primitive).to_string(),
        None => type_name(datatype.struct_fqn().unwrap_or_default()),
    };
    if datatype.is_array() {
        format!("[{}]", base)
    } else {
        base
    }
}

/// GraphQL `Int` is 32-bit signed; everything wider degrades to `Float`
fn scalar(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Int8
        | Primitive::Int16
        | Primitive::Int32
        | Primitive::UInt8
        | Primitive::UInt16 => "Int",
        Primitive::Int64 | Primitive::UInt32 | Primitive::UInt64 => "Float",
        Primitive::Float | Primitive::Double => "Float",
        Primitive::Boolean => "Boolean",
        Primitive::String => "String",
    }
}

/// `Vehicle.Cabin.Door` -> `Vehicle_Cabin_Door`
fn type_name(path: &str) -> String {
    path.replace('.', "_")
}

/// `IsOpen` -> `isOpen`
fn field_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vspec_model::{Payload, SignalData};

    #[test]
    fn sdl_types_and_fields() {
        let mut data = SignalData::default();
        data.datatype = Some(Datatype::parse("uint8", None).unwrap());
        let mut leaf = Node::new("AmbientLight", Payload::Sensor(data));
        leaf.description = Some("Light level".to_string());

        let mut cabin = Node::new("Cabin", Payload::Branch { instances: None });
        cabin.children.push(leaf);
        let mut root = Node::new("Vehicle", Payload::Branch { instances: None });
        root.description = Some("Root".to_string());
        root.children.push(cabin);

        let mut out = String::new();
        emit_type(&root, "Vehicle", &mut out);
        assert!(out.contains("type Vehicle {"));
        assert!(out.contains("  cabin: Vehicle_Cabin"));
        assert!(out.contains("type Vehicle_Cabin {"));
        assert!(out.contains("  ambientLight: Int"));
        assert!(out.contains("\"\"\"Light level\"\"\""));
    }

    #[test]
    fn wide_integers_degrade_to_float() {
        assert_eq!(scalar(Primitive::UInt32), "Float");
        assert_eq!(scalar(Primitive::Int64), "Float");
        assert_eq!(scalar(Primitive::Int32), "Int");
    }
}
