//! Instance template expansion
//!
//! A branch carrying `instances` is a template. Expansion replaces it with
//! the Cartesian product of its dimensions: each product tuple becomes a
//! chain of synthetic branches under the template (one branch per dimension,
//! in order) and the chain leaf inherits clones of the template's children.
//!
//! Children authored directly against an instance path short-circuit the
//! cloning: a child whose name belongs to dimension 1's label set is an
//! *override* and merges into the generated structure with per-field
//! precedence over the template-derived clone. A child whose name has the
//! shape of a range label but falls outside the declared range (`Row5`
//! against `Row[1,2]`) attaches literally - no cloning, no inheritance.

use indexmap::IndexMap;
use itertools::Itertools;
use serde_yaml::Value;
use smol_str::SmolStr;
use tracing::debug;
use vspec_model::{Node, Payload};

/// Expand every template in the tree, depth-first
pub fn expand_instances(root: &mut Node) {
    expand_node(root, root.name.to_string());
}

fn expand_node(node: &mut Node, fqn: String) {
    let taken = match &mut node.payload {
        Payload::Branch { instances } => instances.take(),
        _ => None,
    };

    if let Some(instances) = taken {
        let dims = instances.dims;
        let meta = TemplateMeta {
            description: node.description.clone(),
            comment: node.comment.clone(),
            extra: node.extra.clone(),
        };

        let mut overrides = Vec::new();
        let mut literals = Vec::new();
        let mut template_children = Vec::new();
        for child in node.children.drain(..) {
            if dims[0].contains(&child.name) {
                overrides.push(child);
            } else if dims[0].is_out_of_range_label(&child.name) {
                literals.push(child);
            } else {
                template_children.push(child);
            }
        }

        // One chain of instance branches per product tuple; chains sharing a
        // prefix share the branch nodes.
        let mut generated: Vec<Node> = Vec::new();
        for tuple in dims
            .iter()
            .map(|dim| dim.labels.iter().cloned())
            .multi_cartesian_product()
        {
            let mut level = &mut generated;
            for (depth, label) in tuple.iter().enumerate() {
                let index = match level.iter().position(|c| c.name == *label) {
                    Some(index) => index,
                    None => {
                        level.push(instance_branch(label.clone(), &meta));
                        level.len() - 1
                    }
                };
                if depth + 1 == tuple.len() {
                    // The chain leaf inherits clones of the template children.
                    level[index].children = template_children.to_vec();
                }
                level = &mut level[index].children;
            }
        }

        for override_node in overrides {
            // Partitioning guarantees a generated sibling with this name.
            if let Some(target) = generated.iter_mut().find(|g| g.name == override_node.name) {
                merge_into(target, override_node);
            }
        }
        generated.extend(literals);

        debug!(
            template = %fqn,
            dims = dims.len(),
            leaves = dims.iter().map(|d| d.labels.len()).product::<usize>(),
            "expanded instances"
        );
        node.children = generated;
    }

    for child in &mut node.children {
        let child_fqn = format!("{}.{}", fqn, child.name);
        expand_node(child, child_fqn);
    }
}

struct TemplateMeta {
    description: Option<String>,
    comment: Option<String>,
    extra: IndexMap<SmolStr, Value>,
}

/// A synthesized branch of the expansion chain, inheriting the template's
/// descriptive attributes
fn instance_branch(label: SmolStr, meta: &TemplateMeta) -> Node {
    let mut branch = Node::new(label, Payload::Branch { instances: None });
    branch.instance_label = true;
    branch.description = meta.description.clone();
    branch.comment = meta.comment.clone();
    branch.extra = meta.extra.clone();
    branch
}

/// Merge an authored override into a generated node.
///
/// Override fields take precedence; absent fields keep the template-derived
/// value; list-valued fields replace wholly. Children merge by name, with
/// override-only children appended after the generated ones.
fn merge_into(generated: &mut Node, override_node: Node) {
    let Node {
        name: _,
        description,
        comment,
        deprecation,
        fka,
        const_uid,
        static_uid,
        extra,
        instance_label: _,
        payload,
        children,
    } = override_node;

    if description.is_some() {
        generated.description = description;
    }
    if comment.is_some() {
        generated.comment = comment;
    }
    if deprecation.is_some() {
        generated.deprecation = deprecation;
    }
    if !fka.is_empty() {
        generated.fka = fka;
    }
    if const_uid.is_some() {
        generated.const_uid = const_uid;
    }
    if static_uid.is_some() {
        generated.static_uid = static_uid;
    }
    for (key, value) in extra {
        generated.extra.insert(key, value);
    }

    merge_payload(generated, payload);

    for child in children {
        match generated.child_mut(&child.name) {
            Some(target) => merge_into(target, child),
            None => generated.children.push(child),
        }
    }
}

fn merge_payload(generated: &mut Node, payload: Payload) {
    use Payload::*;
    match (&mut generated.payload, payload) {
        (Branch { instances }, Branch { instances: other }) => {
            if other.is_some() {
                *instances = other;
            }
        }
        // Same signal shape on both sides: field-wise precedence.
        (Sensor(base), Sensor(over))
        | (Actuator(base), Actuator(over))
        | (Attribute(base), Attribute(over))
        | (Property(base), Property(over)) => {
            if over.datatype.is_some() {
                base.datatype = over.datatype;
            }
            if over.unit.is_some() {
                base.unit = over.unit;
            }
            if over.min.is_some() {
                base.min = over.min;
            }
            if over.max.is_some() {
                base.max = over.max;
            }
            if over.default.is_some() {
                base.default = over.default;
            }
            if !over.allowed.is_empty() {
                base.allowed = over.allowed;
            }
        }
        // A kind change is an explicit redefinition; the override wins whole.
        (slot, over) => *slot = over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_build::build_tree;
    use serde_yaml::Value;
    use std::path::Path;
    use vspec_model::{FlatModel, NodeKind, RawNode};

    fn model(entries: &[(&str, &[(&str, &str)])]) -> FlatModel {
        let mut m = FlatModel::new();
        for (fqn, fields) in entries {
            let mut raw = RawNode::new();
            for (k, v) in *fields {
                // Values are YAML fragments, so `[X, Y]` becomes a sequence.
                let value: Value = serde_yaml::from_str(v)
                    .unwrap_or_else(|_| Value::String((*v).to_string()));
                raw.set(*k, value);
            }
            m.insert(*fqn, raw);
        }
        m
    }

    fn expanded(entries: &[(&str, &[(&str, &str)])]) -> Node {
        let mut tree = build_tree(&model(entries), Path::new("test.vspec")).unwrap();
        expand_instances(&mut tree);
        tree
    }

    #[test]
    fn single_dimension_expansion() {
        let tree = expanded(&[
            ("A", &[("type", "branch"), ("description", "root")]),
            (
                "A.B",
                &[("type", "branch"), ("instances", "[X, Y]"), ("description", "B")],
            ),
            (
                "A.B.S",
                &[("type", "sensor"), ("datatype", "int8"), ("unit", "km"), ("description", "S")],
            ),
        ]);
        let b = tree.child("B").unwrap();
        assert!(b.instances().is_none());
        assert!(b.find("B.X.S").is_some());
        assert!(b.find("B.Y.S").is_some());
        assert!(b.child("S").is_none());
        assert_eq!(
            b.find("B.X.S").unwrap().description.as_deref(),
            Some("S")
        );
    }

    #[test]
    fn product_of_two_dimensions() {
        let tree = expanded(&[
            ("A", &[("type", "branch")]),
            (
                "A.Door",
                &[("type", "branch"), ("instances", r#"["Row[1,2]", [Left, Right]]"#)],
            ),
            (
                "A.Door.IsOpen",
                &[("type", "sensor"), ("datatype", "boolean"), ("description", "open")],
            ),
        ]);
        let door = tree.child("Door").unwrap();
        assert_eq!(door.children.len(), 2);
        let mut leaves = 0;
        for (fqn, _, node) in door.preorder() {
            if node.kind() == NodeKind::Sensor {
                leaves += 1;
                assert!(fqn.ends_with(".IsOpen"));
            }
        }
        // |D1| * |D2| chains, one sensor each
        assert_eq!(leaves, 4);
        assert!(door.find("Door.Row1.Left.IsOpen").is_some());
        assert!(door.find("Door.Row2.Right.IsOpen").is_some());
    }

    #[test]
    fn override_on_expanded_fqn_beats_template() {
        let tree = expanded(&[
            ("A", &[("type", "branch")]),
            ("A.B", &[("type", "branch"), ("instances", "[X, Y]")]),
            (
                "A.B.S",
                &[("type", "sensor"), ("datatype", "int8"), ("unit", "km"), ("description", "S")],
            ),
            (
                "A.B.X.S",
                &[("type", "sensor"), ("datatype", "float"), ("description", "overridden")],
            ),
        ]);
        let x_s = tree.find("A.B.X.S").unwrap();
        assert_eq!(x_s.signal().unwrap().datatype.as_ref().unwrap().canonical(), "float");
        // Absent fields inherit from the template.
        assert_eq!(x_s.signal().unwrap().unit.as_deref(), Some("km"));
        assert_eq!(x_s.description.as_deref(), Some("overridden"));
        // The sibling instance keeps the template values.
        let y_s = tree.find("A.B.Y.S").unwrap();
        assert_eq!(y_s.signal().unwrap().datatype.as_ref().unwrap().canonical(), "int8");
    }

    #[test]
    fn signal_on_single_instance_only() {
        let tree = expanded(&[
            ("A", &[("type", "branch")]),
            ("A.B", &[("type", "branch"), ("instances", "[X, Y]")]),
            (
                "A.B.X.Extra",
                &[("type", "sensor"), ("datatype", "int8"), ("description", "only X")],
            ),
        ]);
        assert!(tree.find("A.B.X.Extra").is_some());
        assert!(tree.find("A.B.Y.Extra").is_none());
    }

    #[test]
    fn unknown_range_label_attaches_literally() {
        let tree = expanded(&[
            ("A", &[("type", "branch")]),
            ("A.B", &[("type", "branch"), ("instances", "Row[1,2]")]),
            (
                "A.B.S",
                &[("type", "sensor"), ("datatype", "int8"), ("description", "S")],
            ),
            (
                "A.B.Row5.S2",
                &[("type", "sensor"), ("datatype", "float"), ("description", "literal")],
            ),
        ]);
        let row5 = tree.find("A.B.Row5").unwrap();
        // Not cloned over the declared instances, no template inheritance.
        assert!(row5.child("S").is_none());
        assert!(row5.child("S2").is_some());
        assert!(tree.find("A.B.Row1.S").is_some());
        assert!(tree.find("A.B.Row1.S2").is_none());
    }

    #[test]
    fn nested_templates_expand_recursively() {
        let tree = expanded(&[
            ("A", &[("type", "branch")]),
            ("A.B", &[("type", "branch"), ("instances", "[X, Y]")]),
            (
                "A.B.C",
                &[("type", "branch"), ("instances", "Row[1,2]"), ("description", "C")],
            ),
            (
                "A.B.C.S",
                &[("type", "sensor"), ("datatype", "int8"), ("description", "S")],
            ),
        ]);
        for path in [
            "A.B.X.C.Row1.S",
            "A.B.X.C.Row2.S",
            "A.B.Y.C.Row1.S",
            "A.B.Y.C.Row2.S",
        ] {
            assert!(tree.find(path).is_some(), "missing {}", path);
        }
    }

    #[test]
    fn no_instances_survive_expansion() {
        let tree = expanded(&[
            ("A", &[("type", "branch")]),
            ("A.B", &[("type", "branch"), ("instances", "[X]")]),
            (
                "A.B.C",
                &[("type", "branch"), ("instances", "[P, Q]")],
            ),
            (
                "A.B.C.S",
                &[("type", "sensor"), ("datatype", "int8"), ("description", "S")],
            ),
        ]);
        for (_, _, node) in tree.preorder() {
            assert!(node.instances().is_none());
        }
    }
}
