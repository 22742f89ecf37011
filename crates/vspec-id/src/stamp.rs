//! Stamping a tree with static UIDs
//!
//! Every node gets an id: computed from its contract hash, or taken verbatim
//! from a `constUID` override. Collisions are detected across the whole tree
//! after stamping and are fatal; the author resolves them by adjusting
//! `constUID` on one of the colliding nodes.

use crate::error::{IdError, Result};
use crate::hash::{IdOptions, node_id};
use std::collections::HashMap;
use tracing::info;
use vspec_model::Node;

/// Stamp every node of the tree, then check for collisions
pub fn stamp_tree(root: &mut Node, options: &IdOptions) -> Result<()> {
    let root_fqn = root.name.to_string();
    stamp_node(root, &root_fqn, options)?;
    check_collisions(root)
}

fn stamp_node(node: &mut Node, fqn: &str, options: &IdOptions) -> Result<()> {
    node.static_uid = Some(match &node.const_uid {
        Some(literal) => {
            let id = parse_const_uid(literal).ok_or_else(|| IdError::MalformedConstUid {
                fqn: fqn.to_string(),
                value: literal.clone(),
            })?;
            info!(%fqn, id = %format_args!("0x{:08X}", id), "constUID override");
            id
        }
        None => node_id(fqn, node, options),
    });

    for index in 0..node.children.len() {
        let child_fqn = format!("{}.{}", fqn, node.children[index].name);
        stamp_node(&mut node.children[index], &child_fqn, options)?;
    }
    Ok(())
}

/// `0x` followed by exactly eight hex digits
fn parse_const_uid(literal: &str) -> Option<u32> {
    let hex = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))?;
    if hex.len() != 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn check_collisions(root: &Node) -> Result<()> {
    let mut seen: HashMap<u32, String> = HashMap::new();
    for (fqn, _, node) in root.preorder() {
        let id = node.static_uid.expect("tree was just stamped");
        if let Some(first) = seen.insert(id, fqn.clone()) {
            return Err(IdError::IdCollision {
                id,
                first,
                second: fqn,
            });
        }
    }
    Ok(())
}
