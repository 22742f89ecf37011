//! Protobuf back-end: one proto3 message per branch
//!
//! Branch nesting maps to message nesting by name path: `Vehicle.Cabin`
//! becomes `message VehicleCabin`. Leaves become scalar fields with the
//! narrow integer types widened to proto's 32-bit minimum; arrays become
//! `repeated` fields. User-defined structs emit as messages ahead of the
//! signal messages.

use super::{Artifact, Exporter, ExporterContext};
use crate::error::Result;
use std::path::Path;
use vspec_model::{Datatype, Node, Primitive, StructDef};

/// Render the tree as a proto3 schema
#[derive(Debug, Clone, Default)]
pub struct ProtobufExporter;

impl Exporter for ProtobufExporter {
    fn format(&self) -> &'static str {
        "protobuf"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let mut out = String::with_capacity(4096);
        out.push_str("syntax = \"proto3\";\n\npackage vss;\n");

        for def in context.types.iter() {
            out.push('\n');
            emit_struct(def, &mut out);
        }

        emit_branch(context.tree, &context.tree.name, &mut out);
        Ok(vec![Artifact::new(output, out.into_bytes())])
    }
}

fn emit_struct(def: &StructDef, out: &mut String) {
    out.push_str(&format!("message {} {{\n", type_name(&def.fqn)));
    for (index, property) in def.properties.iter().enumerate() {
        out.push_str(&format!(
            "  {} {} = {};\n",
            field_type(&property.datatype),
            snake(&property.name),
            index + 1
        ));
    }
    out.push_str("}\n");
}

fn emit_branch(node: &Node, path: &str, out: &mut String) {
    out.push('\n');
    if let Some(description) = &node.description {
        out.push_str(&format!("// {}\n", description.replace('\n', " ")));
    }
    out.push_str(&format!("message {} {{\n", type_name(path)));
    for (index, child) in node.children.iter().enumerate() {
        let number = index + 1;
        let child_path = format!("{}.{}", path, child.name);
        match child.signal().and_then(|s| s.datatype.as_ref()) {
            Some(datatype) => {
                out.push_str(&format!(
                    "  {} {} = {};\n",
                    field_type(datatype),
                    snake(&child.name),
                    number
                ));
            }
            None => {
                // A nested branch refers to its own message type.
                out.push_str(&format!(
                    "  {} {} = {};\n",
                    type_name(&child_path),
                    snake(&child.name),
                    number
                ));
            }
        }
    }
    out.push_str("}\n");

    for child in &node.children {
        if child.kind().is_grouping() {
            emit_branch(child, &format!("{}.{}", path, child.name), out);
        }
    }
}

fn field_type(datatype: &Datatype) -> String {
    let base = match datatype.primitive() {
        Some(primitive) => scalar(primitive).to_string(),
        None => type_name(datatype.struct_fqn().unwrap_or_default()),
    };
    if datatype.is_array() {
        format!("repeated {}", base)
    } else {
        base
    }
}

/// proto3 has no integer narrower than 32 bits
fn scalar(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Int8 | Primitive::Int16 | Primitive::Int32 => "int32",
        Primitive::Int64 => "int64",
        Primitive::UInt8 | Primitive::UInt16 | Primitive::UInt32 => "uint32",
        Primitive::UInt64 => "uint64",
        Primitive::Float => "float",
        Primitive::Double => "double",
        Primitive::Boolean => "bool",
        Primitive::String => "string",
    }
}

/// `Vehicle.Cabin.Door` -> `VehicleCabinDoor`
fn type_name(path: &str) -> String {
    path.split('.').collect()
}

/// `IsOpen` -> `is_open`
fn snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
