//! The canonical hash input and the FNV-1 hash
//!
//! The hash input is a single line rendering of the node contract:
//!
//! ```text
//! <fqn>: <kind>, datatype: <dt>, unit: <unit>, allowed: <a/b/c>, min: <min>, max: <max>
//! ```
//!
//! with `-` standing in for absent fields and the `allowed` entries joined by
//! `/` in declared order. The separator and field order are part of this
//! project's stable contract; changing either moves every id. When `fka` is
//! present, its first entry replaces the FQN so a semantic rename keeps its
//! identifier.
//!
//! The hash is 32-bit FNV-1 proper (multiply then XOR) - not FNV-1a, which
//! is what the `fnv` crate on crates.io implements.

use vspec_model::Node;

pub const FNV1_OFFSET_BASIS: u32 = 0x811C_9DC5;
pub const FNV1_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1 over `bytes`
pub fn fnv1_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV1_OFFSET_BASIS, |hash, byte| {
        hash.wrapping_mul(FNV1_PRIME) ^ u32::from(*byte)
    })
}

/// Knobs of one stamping run
#[derive(Debug, Clone)]
pub struct IdOptions {
    /// When set, ids carry this layer in the high byte over a 24-bit hash
    pub layer: Option<u8>,
    /// Lowercase the hash input before hashing when `false`
    pub case_sensitive: bool,
}

impl IdOptions {
    pub fn new() -> Self {
        Self {
            layer: None,
            case_sensitive: true,
        }
    }
}

impl Default for IdOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the canonical hash input line for a node
pub fn hash_input(fqn: &str, node: &Node) -> String {
    let signal = node.signal();
    let datatype = signal
        .and_then(|s| s.datatype.as_ref())
        .map(|d| d.canonical())
        .unwrap_or_else(|| "-".to_string());
    let unit = signal
        .and_then(|s| s.unit.as_deref())
        .unwrap_or("-")
        .to_string();
    let allowed = signal
        .map(|s| {
            s.allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("/")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or_else(|| "-".to_string());
    let min = signal
        .and_then(|s| s.min.as_ref())
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    let max = signal
        .and_then(|s| s.max.as_ref())
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());

    // A rename hashes under its former name.
    let hashed_name = node.fka.first().map(String::as_str).unwrap_or(fqn);

    format!(
        "{}: {}, datatype: {}, unit: {}, allowed: {}, min: {}, max: {}",
        hashed_name,
        node.kind(),
        datatype,
        unit,
        allowed,
        min,
        max
    )
}

/// Compute the identifier for one node
pub fn node_id(fqn: &str, node: &Node, options: &IdOptions) -> u32 {
    let input = hash_input(fqn, node);
    let input = if options.case_sensitive {
        input
    } else {
        input.to_lowercase()
    };
    let hash = fnv1_32(input.as_bytes());
    match options.layer {
        Some(layer) => (u32::from(layer) << 24) | (hash & 0x00FF_FFFF),
        None => hash,
    }
}
