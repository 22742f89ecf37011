//! Franca IDL back-end
//!
//! Emits one `typeCollection` with a struct per branch, fields typed by the
//! Franca primitive names. Descriptions become `<** @description: .. **>`
//! annotations. Struct type names join FQN segments without separators.

use super::{Artifact, Exporter, ExporterContext};
use crate::error::Result;
use std::path::Path;
use vspec_model::{Datatype, Node, Primitive};

/// Render the tree as a Franca `.fidl` type collection
#[derive(Debug, Clone, Default)]
pub struct FrancaExporter;

impl Exporter for FrancaExporter {
    fn format(&self) -> &'static str {
        "franca"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let mut out = String::with_capacity(4096);
        out.push_str("package vss\n\ntypeCollection VssTypes {\n");
        emit_struct(context.tree, &context.tree.name, &mut out);
        out.push_str("}\n");
        Ok(vec![Artifact::new(output, out.into_bytes())])
    }
}

fn emit_struct(node: &Node, path: &str, out: &mut String) {
    out.push('\n');
    if let Some(description) = &node.description {
        out.push_str(&format!(
            "  <** @description: {} **>\n",
            description.replace('\n', " ")
        ));
    }
    out.push_str(&format!("  struct {} {{\n", type_name(path)));
    for child in &node.children {
        let child_path = format!("{}.{}", path, child.name);
        let rendered = match child.signal().and_then(|s| s.datatype.as_ref()) {
            Some(datatype) => field_type(datatype),
            None => type_name(&child_path),
        };
        out.push_str(&format!("    {} {}\n", rendered, child.name));
    }
    out.push_str("  }\n");

    for child in &node.children {
        if child.kind().is_grouping() {
            emit_struct(child, &format!("{}.{}", path, child.name), out);
        }
    }
}

fn field_type(datatype: &Datatype) -> String {
    let base = match datatype.primitive() {
        Some(primitive) => scalar(primitive).to_string(),
        None => type_name(datatype.struct_fqn().unwrap_or_default()),
    };
    if datatype.is_array() {
        format!("{}[]", base)
    } else {
        base
    }
}

fn scalar(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Int8 => "Int8",
        Primitive::Int16 => "Int16",
        Primitive::Int32 => "Int32",
        Primitive::Int64 => "Int64",
        Primitive::UInt8 => "UInt8",
        Primitive::UInt16 => "UInt16",
        Primitive::UInt32 => "UInt32",
        Primitive::UInt64 => "UInt64",
        Primitive::Float => "Float",
        Primitive::Double => "Double",
        Primitive::Boolean => "Boolean",
        Primitive::String => "String",
    }
}

/// `Vehicle.Cabin.Door` -> `VehicleCabinDoor`
fn type_name(path: &str) -> String {
    path.split('.').collect()
}
