//! The flat model
//!
//! First representation after loading: an insertion-ordered map from FQN to a
//! raw attribute mapping. Insertion order is observable - diagnostics refer to
//! authoring order and the tree builder derives child order from it - so the
//! map is an [`IndexMap`], never a sorted one. No semantic validation happens
//! at this layer.

use indexmap::IndexMap;
use serde_yaml::Value;
use smol_str::SmolStr;

/// Well-known attribute keys
pub mod keys {
    pub const TYPE: &str = "type";
    pub const DATATYPE: &str = "datatype";
    pub const DESCRIPTION: &str = "description";
    pub const COMMENT: &str = "comment";
    pub const DEPRECATION: &str = "deprecation";
    pub const DEFAULT: &str = "default";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const UNIT: &str = "unit";
    pub const ALLOWED: &str = "allowed";
    pub const ARRAYSIZE: &str = "arraysize";
    pub const INSTANCES: &str = "instances";
    pub const FKA: &str = "fka";
    pub const CONST_UID: &str = "constUID";
    pub const STATIC_UID: &str = "staticUID";
    pub const DELETE: &str = "delete";

    /// The base attribute set; anything else is an extended attribute and
    /// subject to the caller's whitelist.
    pub const CORE: [&str; 16] = [
        TYPE, DATATYPE, DESCRIPTION, COMMENT, DEPRECATION, DEFAULT, MIN, MAX, UNIT, ALLOWED,
        ARRAYSIZE, INSTANCES, FKA, CONST_UID, STATIC_UID, DELETE,
    ];
}

/// A raw node: the attribute mapping of one FQN, exactly as authored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNode {
    fields: IndexMap<SmolStr, Value>,
}

impl RawNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a YAML mapping; non-string keys are reported with `context`
    /// naming the offending FQN.
    pub fn from_mapping(
        mapping: &serde_yaml::Mapping,
        context: &str,
    ) -> crate::Result<Self> {
        let mut fields = IndexMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            let key = key
                .as_str()
                .ok_or_else(|| crate::ModelError::NonStringKey {
                    context: context.to_string(),
                })?;
            fields.insert(SmolStr::from(key), value.clone());
        }
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(Value::as_u64)
    }

    pub fn set(&mut self, key: impl Into<SmolStr>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Overlay semantics: `delete: true` requests removal of this node and
    /// its descendants.
    pub fn is_delete(&self) -> bool {
        self.get_bool(keys::DELETE).unwrap_or(false)
    }

    /// Per-field merge: every field present in `overlay` overrides this
    /// node's value. List-valued fields replace wholly, which per-field
    /// assignment already gives us.
    pub fn merge_over(&mut self, overlay: &RawNode) {
        for (key, value) in &overlay.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render back to a YAML mapping, preserving field order
    pub fn to_mapping(&self) -> serde_yaml::Mapping {
        let mut mapping = serde_yaml::Mapping::with_capacity(self.fields.len());
        for (key, value) in &self.fields {
            mapping.insert(Value::String(key.to_string()), value.clone());
        }
        mapping
    }
}

/// The flat model: FQN -> raw node, in authoring order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatModel {
    entries: IndexMap<SmolStr, RawNode>,
}

impl FlatModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the previous raw node if the FQN was
    /// already present.
    pub fn insert(&mut self, fqn: impl Into<SmolStr>, node: RawNode) -> Option<RawNode> {
        self.entries.insert(fqn.into(), node)
    }

    pub fn get(&self, fqn: &str) -> Option<&RawNode> {
        self.entries.get(fqn)
    }

    pub fn get_mut(&mut self, fqn: &str) -> Option<&mut RawNode> {
        self.entries.get_mut(fqn)
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.entries.contains_key(fqn)
    }

    /// Remove one entry, preserving the order of the rest
    pub fn remove(&mut self, fqn: &str) -> Option<RawNode> {
        self.entries.shift_remove(fqn)
    }

    /// Remove `fqn` and every descendant (entries whose FQN starts with
    /// `fqn` + `.`). Returns how many entries were removed.
    pub fn remove_subtree(&mut self, fqn: &str) -> usize {
        let prefix = format!("{}.", fqn);
        let before = self.entries.len();
        self.entries
            .retain(|key, _| key.as_str() != fqn && !key.starts_with(&prefix));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &RawNode)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for FlatModel {
    type Item = (SmolStr, RawNode);
    type IntoIter = indexmap::map::IntoIter<SmolStr, RawNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawNode {
        let mut node = RawNode::new();
        for (k, v) in pairs {
            node.set(*k, Value::String((*v).to_string()));
        }
        node
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut model = FlatModel::new();
        model.insert("B", raw(&[("type", "branch")]));
        model.insert("A", raw(&[("type", "branch")]));
        model.insert("B.S", raw(&[("type", "sensor")]));
        let keys: Vec<_> = model.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["B", "A", "B.S"]);
    }

    #[test]
    fn remove_subtree_spares_siblings() {
        let mut model = FlatModel::new();
        model.insert("A.B", raw(&[]));
        model.insert("A.B.C", raw(&[]));
        model.insert("A.BC", raw(&[]));
        model.insert("A.B.C.D", raw(&[]));
        assert_eq!(model.remove_subtree("A.B"), 3);
        assert!(model.contains("A.BC"));
    }

    #[test]
    fn merge_over_replaces_per_field() {
        let mut base = raw(&[("description", "old"), ("unit", "km")]);
        let overlay = raw(&[("description", "new")]);
        base.merge_over(&overlay);
        assert_eq!(base.get_str("description"), Some("new"));
        assert_eq!(base.get_str("unit"), Some("km"));
    }
}
