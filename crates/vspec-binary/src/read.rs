//! Binary tree reading
//!
//! Symmetric to [`crate::write`]: any length prefix that overruns the input,
//! any non-UTF-8 field, and any trailing bytes after the root subtree fail
//! decoding with a malformed-node error. Node count and maximum depth are
//! tracked during the walk for diagnostics.

use crate::error::{BinaryError, Result};
use crate::node::BinaryNode;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Decoding statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadMetadata {
    pub node_count: usize,
    pub max_depth: usize,
}

/// Decode a tree from bytes
pub fn decode(bytes: &[u8]) -> Result<(BinaryNode, ReadMetadata)> {
    let mut reader = Reader { bytes, pos: 0 };
    let mut metadata = ReadMetadata::default();
    let root = read_node(&mut reader, 1, &mut metadata)?;
    if reader.pos != bytes.len() {
        return Err(BinaryError::malformed(format!(
            "{} trailing byte(s) after the root subtree",
            bytes.len() - reader.pos
        )));
    }
    debug!(nodes = metadata.node_count, depth = metadata.max_depth, "decoded binary tree");
    Ok((root, metadata))
}

/// Read a tree from a file
pub fn read_file(path: impl AsRef<Path>) -> Result<(BinaryNode, ReadMetadata)> {
    let bytes = fs::read(path).map_err(BinaryError::io)?;
    decode(&bytes)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, field: &str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(BinaryError::malformed(format!(
                "{} length overruns input at offset {}",
                field, self.pos
            ))),
        }
    }

    fn read_u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    fn read_u16_le(&mut self, field: &str) -> Result<u16> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_str8(&mut self, field: &str) -> Result<String> {
        let len = self.read_u8(field)? as usize;
        self.read_str(len, field)
    }

    fn read_str16(&mut self, field: &str) -> Result<String> {
        let len = self.read_u16_le(field)? as usize;
        self.read_str(len, field)
    }

    fn read_str(&mut self, len: usize, field: &str) -> Result<String> {
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| BinaryError::malformed(format!("{} is not UTF-8: {}", field, e)))
    }
}

fn read_node(reader: &mut Reader<'_>, depth: usize, metadata: &mut ReadMetadata) -> Result<BinaryNode> {
    let mut node = BinaryNode {
        name: reader.read_str8("name")?,
        node_type: reader.read_str8("nodeType")?,
        uuid: reader.read_str8("uuid")?,
        description: reader.read_str16("description")?,
        datatype: reader.read_str8("datatype")?,
        min: reader.read_str8("min")?,
        max: reader.read_str8("max")?,
        unit: reader.read_str8("unit")?,
        allowed: Vec::new(),
        default: String::new(),
        validate: String::new(),
        children: Vec::new(),
    };
    node.allowed = unpack_allowed(&reader.read_str16("allowed")?)?;
    node.default = reader.read_str8("default")?;
    node.validate = reader.read_str8("validate")?;

    metadata.node_count += 1;
    metadata.max_depth = metadata.max_depth.max(depth);

    let child_count = reader.read_u8("childCount")? as usize;
    node.children.reserve(child_count);
    for _ in 0..child_count {
        node.children.push(read_node(reader, depth + 1, metadata)?);
    }
    Ok(node)
}

/// Inverse of the writer's packing: two hex digits of byte length, then the
/// entry itself, repeated.
fn unpack_allowed(packed: &str) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    let bytes = packed.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if pos + 2 > bytes.len() {
            return Err(BinaryError::malformed(
                "allowed list ends inside a length prefix".to_string(),
            ));
        }
        let digits = std::str::from_utf8(&bytes[pos..pos + 2])
            .map_err(|_| BinaryError::malformed("allowed length prefix is not UTF-8".to_string()))?;
        let len = usize::from_str_radix(digits, 16).map_err(|_| {
            BinaryError::malformed(format!("allowed length prefix `{}` is not hex", digits))
        })?;
        pos += 2;
        if pos + len > bytes.len() {
            return Err(BinaryError::malformed(
                "allowed entry overruns the packed list".to_string(),
            ));
        }
        let entry = std::str::from_utf8(&bytes[pos..pos + len])
            .map_err(|_| BinaryError::malformed("allowed entry is not UTF-8".to_string()))?;
        entries.push(entry.to_string());
        pos += len;
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::encode;

    fn leaf(name: &str) -> BinaryNode {
        BinaryNode {
            name: name.to_string(),
            node_type: "sensor".to_string(),
            uuid: "00112233".to_string(),
            description: format!("{} sensor", name),
            datatype: "uint8".to_string(),
            min: "0".to_string(),
            max: "255".to_string(),
            unit: "km".to_string(),
            allowed: vec!["1".to_string(), "2".to_string()],
            default: "0".to_string(),
            validate: "read-write".to_string(),
            children: Vec::new(),
        }
    }

    fn sample_tree() -> BinaryNode {
        BinaryNode {
            name: "Vehicle".to_string(),
            node_type: "branch".to_string(),
            description: "Root".to_string(),
            children: vec![
                BinaryNode {
                    name: "Cabin".to_string(),
                    node_type: "branch".to_string(),
                    description: "Cabin".to_string(),
                    children: vec![leaf("Temp")],
                    ..BinaryNode::default()
                },
                leaf("Speed"),
            ],
            ..BinaryNode::default()
        }
    }

    #[test]
    fn round_trip() {
        let tree = sample_tree();
        let bytes = encode(&tree).unwrap();
        let (decoded, metadata) = decode(&bytes).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(metadata.node_count, 4);
        assert_eq!(metadata.max_depth, 3);
    }

    #[test]
    fn truncated_input_is_malformed() {
        let bytes = encode(&sample_tree()).unwrap();
        for cut in [1, bytes.len() / 2, bytes.len() - 1] {
            assert!(decode(&bytes[..cut]).is_err(), "cut at {} should fail", cut);
        }
    }

    #[test]
    fn trailing_garbage_is_malformed() {
        let mut bytes = encode(&sample_tree()).unwrap();
        bytes.push(0xFF);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn file_round_trip() {
        let tree = sample_tree();
        let file = tempfile::NamedTempFile::new().unwrap();
        crate::write::write_file(&tree, file.path()).unwrap();
        let (decoded, _) = read_file(file.path()).unwrap();
        assert_eq!(decoded, tree);
    }
}
