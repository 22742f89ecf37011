//! Overlay application
//!
//! An overlay is a delta flat model merged onto the base. Per entry:
//!
//! - `delete: true` removes the node and every descendant
//! - an existing FQN merges per-field (overlay values win, absent fields
//!   keep the base, list-valued fields replace wholly)
//! - a new FQN is inserted
//!
//! Overlays apply in the order given, so conflicts between overlays resolve
//! last-wins. Application happens before expansion; entries addressing
//! already-expanded FQNs simply insert here and are reconciled by the
//! expander's per-instance precedence rules.

use tracing::debug;
use vspec_model::FlatModel;
use vspec_model::flat::keys;

/// Apply one overlay onto `base`
pub fn apply_overlay(base: &mut FlatModel, overlay: &FlatModel) {
    for (fqn, raw) in overlay.iter() {
        if raw.is_delete() {
            let removed = base.remove_subtree(fqn);
            debug!(%fqn, removed, "overlay delete");
            continue;
        }
        match base.get_mut(fqn) {
            Some(existing) => existing.merge_over(raw),
            None => {
                base.insert(fqn.clone(), raw.clone());
            }
        }
        // `delete: false` is control data, not an attribute.
        if let Some(node) = base.get_mut(fqn) {
            node.remove(keys::DELETE);
        }
    }
}

/// Apply an ordered list of overlays
pub fn apply_overlays(base: &mut FlatModel, overlays: &[FlatModel]) {
    for overlay in overlays {
        apply_overlay(base, overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;
    use vspec_model::RawNode;

    fn model(entries: &[(&str, &[(&str, &str)])]) -> FlatModel {
        let mut m = FlatModel::new();
        for (fqn, fields) in entries {
            let mut raw = RawNode::new();
            for (k, v) in *fields {
                raw.set(*k, Value::String((*v).to_string()));
            }
            m.insert(*fqn, raw);
        }
        m
    }

    #[test]
    fn overlay_merges_per_field() {
        let mut base = model(&[(
            "A.S",
            &[("type", "sensor"), ("datatype", "int8"), ("unit", "km")],
        )]);
        let overlay = model(&[("A.S", &[("datatype", "float")])]);
        apply_overlay(&mut base, &overlay);
        let merged = base.get("A.S").unwrap();
        assert_eq!(merged.get_str("datatype"), Some("float"));
        assert_eq!(merged.get_str("unit"), Some("km"));
    }

    #[test]
    fn overlay_inserts_new_entries() {
        let mut base = model(&[("A", &[("type", "branch")])]);
        let overlay = model(&[("A.New", &[("type", "sensor")])]);
        apply_overlay(&mut base, &overlay);
        assert!(base.contains("A.New"));
    }

    #[test]
    fn delete_removes_subtree() {
        let mut base = model(&[
            ("A", &[("type", "branch")]),
            ("A.B", &[("type", "branch")]),
            ("A.B.S", &[("type", "sensor")]),
            ("A.C", &[("type", "sensor")]),
        ]);
        let mut overlay = FlatModel::new();
        let mut del = RawNode::new();
        del.set("type", Value::String("branch".into()));
        del.set("delete", Value::Bool(true));
        overlay.insert("A.B", del);
        apply_overlay(&mut base, &overlay);
        assert!(!base.contains("A.B"));
        assert!(!base.contains("A.B.S"));
        assert!(base.contains("A.C"));
    }

    #[test]
    fn overlays_are_idempotent() {
        let mut once = model(&[("A.S", &[("type", "sensor"), ("unit", "km")])]);
        let overlay = model(&[("A.S", &[("unit", "mi")])]);
        apply_overlay(&mut once, &overlay);
        let mut twice = once.clone();
        apply_overlay(&mut twice, &overlay);
        assert_eq!(once, twice);
    }

    #[test]
    fn later_overlay_wins() {
        let base = model(&[("A.S", &[("type", "sensor"), ("unit", "km")])]);
        let first = model(&[("A.S", &[("unit", "mi")])]);
        let second = model(&[("A.S", &[("unit", "m")])]);

        let mut forward = base.clone();
        apply_overlays(&mut forward, &[first.clone(), second.clone()]);
        assert_eq!(forward.get("A.S").unwrap().get_str("unit"), Some("m"));

        let mut reversed = base;
        apply_overlays(&mut reversed, &[second, first]);
        assert_eq!(reversed.get("A.S").unwrap().get_str("unit"), Some("mi"));
    }
}
