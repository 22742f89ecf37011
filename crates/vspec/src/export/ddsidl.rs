//! DDS-IDL back-end
//!
//! Branch nesting maps to IDL module nesting; each leaf emits a struct with
//! a single `value` member of the mapped IDL type, preceded by constants for
//! the unit and the stamped UID when present. User-defined structs emit into
//! a `Types` module ahead of the signal modules.

use super::{Artifact, Exporter, ExporterContext};
use crate::error::Result;
use std::path::Path;
use vspec_model::{Datatype, Node, Primitive, StructDef};

/// Render the tree as OMG IDL for DDS
#[derive(Debug, Clone, Default)]
pub struct DdsIdlExporter;

impl Exporter for DdsIdlExporter {
    fn format(&self) -> &'static str {
        "ddsidl"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let mut out = String::with_capacity(4096);

        if !context.types.is_empty() {
            out.push_str("module Types {\n");
            for def in context.types.iter() {
                emit_struct(def, 1, &mut out);
            }
            out.push_str("};\n\n");
        }

        emit_node(context.tree, 0, &mut out);
        Ok(vec![Artifact::new(output, out.into_bytes())])
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn emit_struct(def: &StructDef, depth: usize, out: &mut String) {
    indent(out, depth);
    out.push_str(&format!("struct {} {{\n", last_segment(&def.fqn)));
    for property in &def.properties {
        indent(out, depth + 1);
        out.push_str(&format!(
            "{} {};\n",
            idl_type(&property.datatype),
            property.name
        ));
    }
    indent(out, depth);
    out.push_str("};\n");
}

fn emit_node(node: &Node, depth: usize, out: &mut String) {
    match node.signal().and_then(|s| s.datatype.as_ref()) {
        Some(datatype) => {
            if let Some(description) = &node.description {
                indent(out, depth);
                out.push_str(&format!("// {}\n", description.replace('\n', " ")));
            }
            indent(out, depth);
            out.push_str(&format!("struct {} {{\n", node.name));
            if let Some(uid) = node.static_uid {
                indent(out, depth + 1);
                out.push_str(&format!("const string uuid = \"{:08x}\";\n", uid));
            }
            if let Some(unit) = node.signal().and_then(|s| s.unit.as_deref()) {
                indent(out, depth + 1);
                out.push_str(&format!("const string unit = \"{}\";\n", unit));
            }
            indent(out, depth + 1);
            out.push_str(&format!("{} value;\n", idl_type(datatype)));
            indent(out, depth);
            out.push_str("};\n");
        }
        None => {
            indent(out, depth);
            out.push_str(&format!("module {} {{\n", node.name));
            for child in &node.children {
                emit_node(child, depth + 1, out);
            }
            indent(out, depth);
            out.push_str("};\n");
        }
    }
}

fn idl_type(datatype: &Datatype) -> String {
    let base = match datatype.primitive() {
        Some(primitive) => scalar(primitive).to_string(),
        None => format!("Types::{}", last_segment(datatype.struct_fqn().unwrap_or_default())),
    };
    match (datatype.is_array(), datatype.arraysize()) {
        (true, Some(size)) => format!("sequence<{}, {}>", base, size),
        (true, None) => format!("sequence<{}>", base),
        (false, _) => base,
    }
}

fn scalar(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Int8 => "int8",
        Primitive::Int16 => "short",
        Primitive::Int32 => "long",
        Primitive::Int64 => "long long",
        Primitive::UInt8 => "octet",
        Primitive::UInt16 => "unsigned short",
        Primitive::UInt32 => "unsigned long",
        Primitive::UInt64 => "unsigned long long",
        Primitive::Float => "float",
        Primitive::Double => "double",
        Primitive::Boolean => "boolean",
        Primitive::String => "string",
    }
}

fn last_segment(fqn: &str) -> &str {
    fqn.rsplit('.').next().unwrap_or(fqn)
}
