//! The decoded node type
//!
//! [`BinaryNode`] mirrors the wire format: every field is the textual form
//! that goes on disk, nothing more. The compiler's typed tree converts into
//! it for encoding; decoding produces it directly. Keeping the two
//! representations separate keeps the codec independent of model changes
//! that do not touch the wire contract.

use vspec_model::{Node, ScalarValue};

/// One node of a decoded binary tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryNode {
    pub name: String,
    /// Textual kind: `branch`, `sensor`, `actuator`, `attribute`, `struct`,
    /// `property`
    pub node_type: String,
    /// The stamped static UID as lower-case hex text, or empty
    pub uuid: String,
    pub description: String,
    /// Empty for `branch` and `struct`
    pub datatype: String,
    pub min: String,
    pub max: String,
    pub unit: String,
    pub allowed: Vec<String>,
    pub default: String,
    /// Access-validation marker: `write-only`/`read-write`, optionally with
    /// `+consent`
    pub validate: String,
    pub children: Vec<BinaryNode>,
}

impl BinaryNode {
    /// Branches and structs group; everything else is a leaf
    pub fn is_leaf(&self) -> bool {
        self.node_type != "branch" && self.node_type != "struct"
    }

    /// Convert a model tree for encoding
    pub fn from_model(node: &Node) -> Self {
        let signal = node.signal();
        Self {
            name: node.name.to_string(),
            node_type: node.kind().as_str().to_string(),
            uuid: node
                .static_uid
                .map(|uid| format!("{:08x}", uid))
                .unwrap_or_default(),
            description: node.description.clone().unwrap_or_default(),
            datatype: signal
                .and_then(|s| s.datatype.as_ref())
                .map(|d| d.canonical())
                .unwrap_or_default(),
            min: signal
                .and_then(|s| s.min.as_ref())
                .map(ToString::to_string)
                .unwrap_or_default(),
            max: signal
                .and_then(|s| s.max.as_ref())
                .map(ToString::to_string)
                .unwrap_or_default(),
            unit: signal
                .and_then(|s| s.unit.as_deref())
                .unwrap_or_default()
                .to_string(),
            allowed: signal
                .map(|s| s.allowed.iter().map(ToString::to_string).collect())
                .unwrap_or_default(),
            default: signal
                .and_then(|s| s.default.as_ref())
                .map(render_default)
                .unwrap_or_default(),
            validate: node
                .extra
                .get("validate")
                .and_then(serde_yaml::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            children: node.children.iter().map(Self::from_model).collect(),
        }
    }
}

/// Defaults may be scalars or (for array datatypes) sequences; both go on
/// the wire as text.
fn render_default(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Sequence(seq) => {
            let parts: Vec<String> = seq
                .iter()
                .filter_map(ScalarValue::from_yaml)
                .map(|s| s.to_string())
                .collect();
            format!("[{}]", parts.join(", "))
        }
        other => ScalarValue::from_yaml(other)
            .map(|s| s.to_string())
            .unwrap_or_default(),
    }
}
