//! Binary tree writing
//!
//! Wire format, per node, in pre-order:
//!
//! | field       | prefix | notes                                         |
//! |-------------|--------|-----------------------------------------------|
//! | name        | u8     |                                               |
//! | nodeType    | u8     | textual kind                                  |
//! | uuid        | u8     | static UID as lower-case hex text, or empty   |
//! | description | u16 LE |                                               |
//! | datatype    | u8     | empty for branch/struct                       |
//! | min         | u8     | textual                                       |
//! | max         | u8     | textual                                       |
//! | unit        | u8     |                                               |
//! | allowed     | u16 LE | entries each prefixed by a two-hex-digit length |
//! | default     | u8     |                                               |
//! | validate    | u8     |                                               |
//! | childCount  | u8     |                                               |
//!
//! All strings are UTF-8; a zero length means "absent". Integers are
//! little-endian. These widths are an external contract.

use crate::error::{BinaryError, Result};
use crate::node::BinaryNode;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Encode a tree to bytes
pub fn encode(root: &BinaryNode) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(4096);
    encode_node(root, &mut buffer)?;
    debug!(bytes = buffer.len(), "encoded binary tree");
    Ok(buffer)
}

/// Encode a tree and write it to a file
pub fn write_file(root: &BinaryNode, path: impl AsRef<Path>) -> Result<()> {
    let bytes = encode(root)?;
    fs::write(path, bytes).map_err(BinaryError::io)
}

fn encode_node(node: &BinaryNode, buffer: &mut Vec<u8>) -> Result<()> {
    push_str8(buffer, &node.name, "name")?;
    push_str8(buffer, &node.node_type, "nodeType")?;
    push_str8(buffer, &node.uuid, "uuid")?;
    push_str16(buffer, &node.description, "description")?;
    push_str8(buffer, &node.datatype, "datatype")?;
    push_str8(buffer, &node.min, "min")?;
    push_str8(buffer, &node.max, "max")?;
    push_str8(buffer, &node.unit, "unit")?;
    push_str16(buffer, &pack_allowed(&node.allowed)?, "allowed")?;
    push_str8(buffer, &node.default, "default")?;
    push_str8(buffer, &node.validate, "validate")?;

    let count = u8::try_from(node.children.len())
        .map_err(|_| BinaryError::oversize(format!("node `{}` has too many children", node.name)))?;
    buffer.push(count);

    for child in &node.children {
        encode_node(child, buffer)?;
    }
    Ok(())
}

/// `allowed` entries are catenated, each preceded by its byte length as two
/// hex digits (so entries are capped at 255 bytes).
fn pack_allowed(allowed: &[String]) -> Result<String> {
    let mut packed = String::new();
    for entry in allowed {
        if entry.len() > 0xFF {
            return Err(BinaryError::oversize(format!(
                "allowed value `{}` exceeds 255 bytes",
                entry
            )));
        }
        packed.push_str(&format!("{:02X}", entry.len()));
        packed.push_str(entry);
    }
    Ok(packed)
}

fn push_str8(buffer: &mut Vec<u8>, value: &str, field: &str) -> Result<()> {
    let len = u8::try_from(value.len())
        .map_err(|_| BinaryError::oversize(format!("{} `{}` exceeds 255 bytes", field, value)))?;
    buffer.push(len);
    buffer.extend_from_slice(value.as_bytes());
    Ok(())
}

fn push_str16(buffer: &mut Vec<u8>, value: &str, field: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| BinaryError::oversize(format!("{} exceeds 65535 bytes", field)))?;
    buffer.extend_from_slice(&len.to_le_bytes());
    buffer.extend_from_slice(value.as_bytes());
    Ok(())
}
