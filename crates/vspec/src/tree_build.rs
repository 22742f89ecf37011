//! Tree materialization
//!
//! Turns the merged flat model into a rooted [`Node`] tree. Child order
//! follows the authoring order of each node's first appearance in the flat
//! model. A parent may be declared after its children textually; it is
//! materialized from its own raw entry the moment the walk first needs it.
//!
//! A missing ancestor is an error, with one relaxation: below a branch that
//! carries an `instances` descriptor, missing segments materialize as
//! synthetic branches. That is what lets an overlay address an expanded
//! instance path (`...Door.Row1.Left.NewSignal`) before expansion has run.

use crate::error::{CompileError, Result};
use smol_str::SmolStr;
use std::collections::HashSet;
use vspec_model::{FlatModel, Node, Payload};

/// Build the tree for a merged flat model
pub fn build_tree(model: &FlatModel, source: &std::path::Path) -> Result<Node> {
    let mut roots: Vec<Node> = Vec::new();
    let mut materialized: HashSet<SmolStr> = HashSet::new();

    for (fqn, _) in model.iter() {
        insert_entry(&mut roots, model, fqn, &mut materialized)?;
    }

    match roots.len() {
        1 => Ok(roots.pop().unwrap()),
        0 => Err(CompileError::EmptyModel {
            path: source.to_path_buf(),
        }),
        _ => Err(CompileError::MultipleRoots {
            roots: roots.iter().map(|r| r.name.to_string()).collect(),
        }),
    }
}

fn insert_entry(
    roots: &mut Vec<Node>,
    model: &FlatModel,
    fqn: &str,
    materialized: &mut HashSet<SmolStr>,
) -> Result<()> {
    if materialized.contains(fqn) {
        return Ok(());
    }

    let segments: Vec<&str> = fqn.split('.').collect();
    let mut children = roots;
    let mut path = String::with_capacity(fqn.len());
    let mut under_template = false;

    for segment in &segments {
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(segment);

        let position = children.iter().position(|c| c.name == *segment);
        let index = match position {
            Some(index) => index,
            None => {
                let node = match model.get(&path) {
                    Some(raw) => {
                        materialized.insert(SmolStr::from(path.as_str()));
                        Node::from_raw(segment, &path, raw)?
                    }
                    None if under_template => {
                        // Instance-path segment: a synthetic branch the
                        // expander will reconcile.
                        let mut synthetic =
                            Node::new(*segment, Payload::Branch { instances: None });
                        synthetic.instance_label = true;
                        synthetic
                    }
                    None => {
                        return Err(CompileError::MissingAncestor {
                            fqn: fqn.to_string(),
                            ancestor: path,
                        });
                    }
                };
                children.push(node);
                children.len() - 1
            }
        };

        let node = &mut children[index];
        if node.instances().is_some() {
            under_template = true;
        }
        children = &mut node.children;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;
    use std::path::Path;
    use vspec_model::{NodeKind, RawNode};

    fn entry(fields: &[(&str, &str)]) -> RawNode {
        let mut raw = RawNode::new();
        for (k, v) in fields {
            raw.set(*k, Value::String((*v).to_string()));
        }
        raw
    }

    fn src() -> &'static Path {
        Path::new("test.vspec")
    }

    #[test]
    fn builds_in_authoring_order() {
        let mut model = FlatModel::new();
        model.insert("A", entry(&[("type", "branch"), ("description", "a")]));
        model.insert("A.Z", entry(&[("type", "sensor"), ("datatype", "int8")]));
        model.insert("A.B", entry(&[("type", "branch")]));
        let tree = build_tree(&model, src()).unwrap();
        let names: Vec<_> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Z", "B"]);
    }

    #[test]
    fn parent_declared_after_child() {
        let mut model = FlatModel::new();
        model.insert("A", entry(&[("type", "branch")]));
        model.insert("A.B.S", entry(&[("type", "sensor"), ("datatype", "int8")]));
        model.insert("A.B", entry(&[("type", "branch"), ("description", "late")]));
        let tree = build_tree(&model, src()).unwrap();
        let b = tree.child("B").unwrap();
        assert_eq!(b.description.as_deref(), Some("late"));
        assert!(b.child("S").is_some());
    }

    #[test]
    fn missing_ancestor_is_an_error() {
        let mut model = FlatModel::new();
        model.insert("A", entry(&[("type", "branch")]));
        model.insert("A.B.S", entry(&[("type", "sensor"), ("datatype", "int8")]));
        let err = build_tree(&model, src()).unwrap_err();
        match err {
            CompileError::MissingAncestor { ancestor, .. } => assert_eq!(ancestor, "A.B"),
            other => panic!("expected MissingAncestor, got {:?}", other),
        }
    }

    #[test]
    fn instance_path_below_template_is_allowed() {
        let mut model = FlatModel::new();
        model.insert("A", entry(&[("type", "branch")]));
        model.insert(
            "A.B",
            entry(&[("type", "branch"), ("instances", "Row[1,2]")]),
        );
        model.insert(
            "A.B.Row1.S",
            entry(&[("type", "sensor"), ("datatype", "int8")]),
        );
        let tree = build_tree(&model, src()).unwrap();
        let row1 = tree.child("B").unwrap().child("Row1").unwrap();
        assert_eq!(row1.kind(), NodeKind::Branch);
        assert!(row1.child("S").is_some());
    }

    #[test]
    fn multiple_roots_rejected() {
        let mut model = FlatModel::new();
        model.insert("A", entry(&[("type", "branch")]));
        model.insert("B", entry(&[("type", "branch")]));
        assert!(matches!(
            build_tree(&model, src()),
            Err(CompileError::MultipleRoots { .. })
        ));
    }
}
