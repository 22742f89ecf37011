//! The materialized signal tree
//!
//! [`Node`] is the in-memory tree element every stage downstream of the tree
//! builder works on. The raw attribute mapping is a different representation -
//! see [`crate::flat::RawNode`] - and the conversions between the two live
//! here. Each node exclusively owns its children as an ordered sequence;
//! child order follows authoring order of the merged flat model.

use crate::datatype::Datatype;
use crate::error::ModelError;
use crate::flat::{RawNode, keys};
use crate::scalar::ScalarValue;
use indexmap::IndexMap;
use serde_yaml::Value;
use smol_str::{SmolStr, ToSmolStr};
use std::fmt;

/// The six node kinds of the current model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Branch,
    Sensor,
    Actuator,
    Attribute,
    Struct,
    Property,
}

impl NodeKind {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "branch" => Self::Branch,
            "sensor" => Self::Sensor,
            "actuator" => Self::Actuator,
            "attribute" => Self::Attribute,
            "struct" => Self::Struct,
            "property" => Self::Property,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Sensor => "sensor",
            Self::Actuator => "actuator",
            Self::Attribute => "attribute",
            Self::Struct => "struct",
            Self::Property => "property",
        }
    }

    /// Kinds that carry a datatype
    pub fn is_datatyped(&self) -> bool {
        matches!(
            self,
            Self::Sensor | Self::Actuator | Self::Attribute | Self::Property
        )
    }

    /// Kinds that may have children
    pub fn is_grouping(&self) -> bool {
        matches!(self, Self::Branch | Self::Struct)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value-carrying attributes shared by the four datatyped kinds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalData {
    pub datatype: Option<Datatype>,
    pub unit: Option<SmolStr>,
    pub min: Option<ScalarValue>,
    pub max: Option<ScalarValue>,
    pub default: Option<Value>,
    pub allowed: Vec<ScalarValue>,
}

/// One instance dimension, normalized to its label list.
///
/// Range-form descriptors keep their `(prefix, lo, hi)` so the expander can
/// recognize out-of-range labels like `Row5` against `Row[1,2]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDim {
    pub labels: Vec<SmolStr>,
    pub range: Option<(SmolStr, i64, i64)>,
}

impl InstanceDim {
    pub fn labels(labels: Vec<SmolStr>) -> Self {
        Self {
            labels,
            range: None,
        }
    }

    /// Whether `name` belongs to this dimension's label set
    pub fn contains(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }

    /// Whether `name` has the shape of a range label (`Name<k>`) but falls
    /// outside `[lo, hi]` - the "unknown instance label" case.
    pub fn is_out_of_range_label(&self, name: &str) -> bool {
        let Some((prefix, lo, hi)) = &self.range else {
            return false;
        };
        let Some(rest) = name.strip_prefix(prefix.as_str()) else {
            return false;
        };
        match rest.parse::<i64>() {
            Ok(k) => k < *lo || k > *hi,
            Err(_) => false,
        }
    }
}

/// The `instances` descriptor of a template branch, as ordered dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct Instances {
    pub dims: Vec<InstanceDim>,
}

impl Instances {
    /// Parse the YAML forms of the `instances` attribute.
    ///
    /// Accepted shapes:
    /// - a single range string: `Row[1,2]`
    /// - a list of label strings (one dimension): `[Left, Right]`
    /// - a list of dimension descriptors, each a range string or a label
    ///   list: `["Row[1,2]", [Left, Right]]`
    pub fn parse(value: &Value, fqn: &str) -> Result<Self, ModelError> {
        let invalid = |message: &str| ModelError::InvalidInstances {
            fqn: fqn.to_string(),
            message: message.to_string(),
        };
        match value {
            Value::String(s) => Ok(Self {
                dims: vec![parse_string_descriptor(s, fqn)?],
            }),
            Value::Sequence(seq) => {
                if seq.is_empty() {
                    return Err(invalid("empty instances list"));
                }
                let all_plain_strings = seq.iter().all(|v| {
                    matches!(v, Value::String(s) if parse_range_descriptor(s).is_none())
                });
                if all_plain_strings {
                    // A flat list of labels is one dimension.
                    let labels = seq
                        .iter()
                        .map(|v| v.as_str().unwrap().to_smolstr())
                        .collect();
                    return Ok(Self {
                        dims: vec![InstanceDim::labels(labels)],
                    });
                }
                let mut dims = Vec::with_capacity(seq.len());
                for item in seq {
                    match item {
                        Value::String(s) => dims.push(parse_string_descriptor(s, fqn)?),
                        Value::Sequence(labels) => {
                            let labels = labels
                                .iter()
                                .map(|v| {
                                    v.as_str()
                                        .map(SmolStr::from)
                                        .ok_or_else(|| invalid("labels must be strings"))
                                })
                                .collect::<Result<Vec<_>, _>>()?;
                            if labels.is_empty() {
                                return Err(invalid("empty label list"));
                            }
                            dims.push(InstanceDim::labels(labels));
                        }
                        _ => return Err(invalid("descriptor must be a string or label list")),
                    }
                }
                Ok(Self { dims })
            }
            _ => Err(invalid("instances must be a string or a list")),
        }
    }

    /// Render back to YAML as a list of label lists
    pub fn to_yaml(&self) -> Value {
        Value::Sequence(
            self.dims
                .iter()
                .map(|d| {
                    Value::Sequence(
                        d.labels
                            .iter()
                            .map(|l| Value::String(l.to_string()))
                            .collect(),
                    )
                })
                .collect(),
        )
    }
}

fn parse_string_descriptor(s: &str, fqn: &str) -> Result<InstanceDim, ModelError> {
    match parse_range_descriptor(s) {
        Some(dim) => Ok(dim),
        // A bare string descriptor is a single-label dimension.
        None if !s.trim().is_empty() => Ok(InstanceDim::labels(vec![s.trim().to_smolstr()])),
        None => Err(ModelError::InvalidInstances {
            fqn: fqn.to_string(),
            message: format!("empty descriptor `{}`", s),
        }),
    }
}

/// Parse the `Name[lo,hi]` range form, returning `None` when `s` does not
/// have that shape.
fn parse_range_descriptor(s: &str) -> Option<InstanceDim> {
    let s = s.trim();
    let open = s.find('[')?;
    let inner = s.strip_suffix(']')?.get(open + 1..)?;
    let prefix = &s[..open];
    if prefix.is_empty() {
        return None;
    }
    let (lo, hi) = inner.split_once(',')?;
    let lo: i64 = lo.trim().parse().ok()?;
    let hi: i64 = hi.trim().parse().ok()?;
    if lo > hi {
        return None;
    }
    let labels = (lo..=hi).map(|k| SmolStr::from(format!("{}{}", prefix, k))).collect();
    Some(InstanceDim {
        labels,
        range: Some((SmolStr::from(prefix), lo, hi)),
    })
}

/// Per-kind payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Branch { instances: Option<Instances> },
    Sensor(SignalData),
    Actuator(SignalData),
    Attribute(SignalData),
    Struct,
    Property(SignalData),
}

impl Payload {
    pub fn empty_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Branch => Self::Branch { instances: None },
            NodeKind::Sensor => Self::Sensor(SignalData::default()),
            NodeKind::Actuator => Self::Actuator(SignalData::default()),
            NodeKind::Attribute => Self::Attribute(SignalData::default()),
            NodeKind::Struct => Self::Struct,
            NodeKind::Property => Self::Property(SignalData::default()),
        }
    }
}

/// A tree element
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: SmolStr,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub deprecation: Option<String>,
    /// Former fully-qualified names, most recent first
    pub fka: Vec<String>,
    /// Literal 4-byte hex override for the static-UID engine, unparsed
    pub const_uid: Option<String>,
    /// Identifier stamped by the static-UID engine
    pub static_uid: Option<u32>,
    /// Extended attributes, in authoring order
    pub extra: IndexMap<SmolStr, Value>,
    /// Set by the instance expander on synthesized instance branches; the
    /// naming convention exempts instance labels.
    pub instance_label: bool,
    pub payload: Payload,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<SmolStr>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            description: None,
            comment: None,
            deprecation: None,
            fka: Vec::new(),
            const_uid: None,
            static_uid: None,
            extra: IndexMap::new(),
            instance_label: false,
            payload,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.payload {
            Payload::Branch { .. } => NodeKind::Branch,
            Payload::Sensor(_) => NodeKind::Sensor,
            Payload::Actuator(_) => NodeKind::Actuator,
            Payload::Attribute(_) => NodeKind::Attribute,
            Payload::Struct => NodeKind::Struct,
            Payload::Property(_) => NodeKind::Property,
        }
    }

    pub fn signal(&self) -> Option<&SignalData> {
        match &self.payload {
            Payload::Sensor(s) | Payload::Actuator(s) | Payload::Attribute(s)
            | Payload::Property(s) => Some(s),
            _ => None,
        }
    }

    pub fn signal_mut(&mut self) -> Option<&mut SignalData> {
        match &mut self.payload {
            Payload::Sensor(s) | Payload::Actuator(s) | Payload::Attribute(s)
            | Payload::Property(s) => Some(s),
            _ => None,
        }
    }

    pub fn instances(&self) -> Option<&Instances> {
        match &self.payload {
            Payload::Branch { instances } => instances.as_ref(),
            _ => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Locate a descendant by absolute FQN (the first segment is this node's
    /// own name).
    pub fn find(&self, fqn: &str) -> Option<&Node> {
        let mut segments = fqn.split('.');
        if segments.next() != Some(self.name.as_str()) {
            return None;
        }
        let mut current = self;
        for segment in segments {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Total node count of this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Pre-order walk yielding each node with its FQN and tree depth
    pub fn preorder(&self) -> PreOrder<'_> {
        PreOrder {
            stack: vec![(self.name.to_string(), 0, self)],
        }
    }

    /// Build a typed node from a raw attribute mapping.
    ///
    /// Fails fast on syntactic problems (unknown kind, unparseable datatype
    /// or instances); semantic checks are the validator's job.
    pub fn from_raw(name: &str, fqn: &str, raw: &RawNode) -> Result<Self, ModelError> {
        let kind_str = raw
            .get_str(keys::TYPE)
            .ok_or_else(|| ModelError::InvalidKind {
                value: "(missing)".to_string(),
                fqn: fqn.to_string(),
            })?;
        let kind = NodeKind::parse(kind_str).ok_or_else(|| ModelError::InvalidKind {
            value: kind_str.to_string(),
            fqn: fqn.to_string(),
        })?;

        let mut node = Node::new(name, Payload::empty_for(kind));
        node.description = raw.get_str(keys::DESCRIPTION).map(str::to_string);
        node.comment = raw.get_str(keys::COMMENT).map(str::to_string);
        node.deprecation = raw.get_str(keys::DEPRECATION).map(str::to_string);
        node.fka = string_list(raw.get(keys::FKA));
        node.const_uid = raw.get_str(keys::CONST_UID).map(str::to_string);
        node.static_uid = raw
            .get_str(keys::STATIC_UID)
            .and_then(parse_uid_literal)
            .or_else(|| raw.get_u64(keys::STATIC_UID).map(|v| v as u32));

        // Attributes consumed by this kind. Core attributes left over (a
        // `datatype` on a branch, say) fall through to the extended bag so
        // the validator can flag the misplacement instead of losing it.
        let mut consumed = vec![
            keys::TYPE,
            keys::DESCRIPTION,
            keys::COMMENT,
            keys::DEPRECATION,
            keys::FKA,
            keys::CONST_UID,
            keys::STATIC_UID,
            keys::DELETE,
        ];
        if kind.is_datatyped() {
            consumed.extend([
                keys::DATATYPE,
                keys::ARRAYSIZE,
                keys::UNIT,
                keys::MIN,
                keys::MAX,
                keys::DEFAULT,
                keys::ALLOWED,
            ]);
            let arraysize = raw.get_u64(keys::ARRAYSIZE).map(|v| v as usize);
            let signal = node.signal_mut().unwrap();
            if let Some(dt) = raw.get_str(keys::DATATYPE) {
                signal.datatype = Some(Datatype::parse(dt, arraysize)?);
            }
            signal.unit = raw.get_str(keys::UNIT).map(SmolStr::from);
            signal.min = raw.get(keys::MIN).and_then(ScalarValue::from_yaml);
            signal.max = raw.get(keys::MAX).and_then(ScalarValue::from_yaml);
            signal.default = raw.get(keys::DEFAULT).cloned();
            if let Some(Value::Sequence(seq)) = raw.get(keys::ALLOWED) {
                signal.allowed = seq.iter().filter_map(ScalarValue::from_yaml).collect();
            }
        } else if kind == NodeKind::Branch {
            consumed.push(keys::INSTANCES);
            if let Some(value) = raw.get(keys::INSTANCES) {
                node.payload = Payload::Branch {
                    instances: Some(Instances::parse(value, fqn)?),
                };
            }
        }

        for (key, value) in raw.iter() {
            if !consumed.contains(&key.as_str()) {
                node.extra.insert(key.clone(), value.clone());
            }
        }
        Ok(node)
    }

    /// Render this node's attributes back to a raw mapping (children are not
    /// included; the flat renderings emit one entry per FQN).
    pub fn to_raw(&self) -> RawNode {
        let mut raw = RawNode::new();
        raw.set(keys::TYPE, Value::String(self.kind().as_str().to_string()));
        if let Some(signal) = self.signal() {
            if let Some(dt) = &signal.datatype {
                raw.set(keys::DATATYPE, Value::String(dt.canonical()));
                if let Some(size) = dt.arraysize() {
                    raw.set(keys::ARRAYSIZE, Value::Number((size as u64).into()));
                }
            }
            if let Some(unit) = &signal.unit {
                raw.set(keys::UNIT, Value::String(unit.to_string()));
            }
            if let Some(min) = &signal.min {
                raw.set(keys::MIN, min.to_yaml());
            }
            if let Some(max) = &signal.max {
                raw.set(keys::MAX, max.to_yaml());
            }
            if !signal.allowed.is_empty() {
                raw.set(
                    keys::ALLOWED,
                    Value::Sequence(signal.allowed.iter().map(ScalarValue::to_yaml).collect()),
                );
            }
            if let Some(default) = &signal.default {
                raw.set(keys::DEFAULT, default.clone());
            }
        }
        if let Some(instances) = self.instances() {
            raw.set(keys::INSTANCES, instances.to_yaml());
        }
        if let Some(description) = &self.description {
            raw.set(keys::DESCRIPTION, Value::String(description.clone()));
        }
        if let Some(comment) = &self.comment {
            raw.set(keys::COMMENT, Value::String(comment.clone()));
        }
        if let Some(deprecation) = &self.deprecation {
            raw.set(keys::DEPRECATION, Value::String(deprecation.clone()));
        }
        if !self.fka.is_empty() {
            raw.set(
                keys::FKA,
                Value::Sequence(
                    self.fka
                        .iter()
                        .map(|f| Value::String(f.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(const_uid) = &self.const_uid {
            raw.set(keys::CONST_UID, Value::String(const_uid.clone()));
        }
        if let Some(uid) = self.static_uid {
            raw.set(keys::STATIC_UID, Value::String(format!("0x{:08X}", uid)));
        }
        for (key, value) in &self.extra {
            raw.set(key.clone(), value.clone());
        }
        raw
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Sequence(seq)) => seq
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_uid_literal(s: &str) -> Option<u32> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    u32::from_str_radix(hex, 16).ok()
}

/// One step of a pre-order walk
pub struct PreOrder<'a> {
    stack: Vec<(String, usize, &'a Node)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (String, usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (fqn, depth, node) = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack
                .push((format!("{}.{}", fqn, child.name), depth + 1, child));
        }
        Some((fqn, depth, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_from_yaml(yaml: &str) -> RawNode {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(yaml).unwrap();
        RawNode::from_mapping(&mapping, "test").unwrap()
    }

    #[test]
    fn raw_round_trip_for_sensor() {
        let raw = raw_from_yaml(
            r#"
type: sensor
datatype: uint8
unit: km/h
min: 0
max: 200
description: Speed
"#,
        );
        let node = Node::from_raw("Speed", "Vehicle.Speed", &raw).unwrap();
        assert_eq!(node.kind(), NodeKind::Sensor);
        let signal = node.signal().unwrap();
        assert_eq!(signal.unit.as_deref(), Some("km/h"));
        assert_eq!(signal.min, Some(ScalarValue::Int(0)));

        let back = node.to_raw();
        assert_eq!(back.get_str("datatype"), Some("uint8"));
        assert_eq!(back.get_str("unit"), Some("km/h"));
        assert_eq!(back.get_str("description"), Some("Speed"));
    }

    #[test]
    fn instances_single_range() {
        let value: Value = serde_yaml::from_str(r#""Row[1,3]""#).unwrap();
        let instances = Instances::parse(&value, "A.B").unwrap();
        assert_eq!(instances.dims.len(), 1);
        assert_eq!(
            instances.dims[0].labels,
            vec![SmolStr::from("Row1"), SmolStr::from("Row2"), SmolStr::from("Row3")]
        );
        assert!(instances.dims[0].is_out_of_range_label("Row5"));
        assert!(!instances.dims[0].is_out_of_range_label("Row2"));
        assert!(!instances.dims[0].is_out_of_range_label("Seat5"));
    }

    #[test]
    fn instances_flat_label_list_is_one_dimension() {
        let value: Value = serde_yaml::from_str(r#"[Left, Right]"#).unwrap();
        let instances = Instances::parse(&value, "A.B").unwrap();
        assert_eq!(instances.dims.len(), 1);
        assert_eq!(instances.dims[0].labels.len(), 2);
    }

    #[test]
    fn instances_mixed_descriptors() {
        let value: Value = serde_yaml::from_str(r#"["Row[1,2]", [Left, Right]]"#).unwrap();
        let instances = Instances::parse(&value, "A.B").unwrap();
        assert_eq!(instances.dims.len(), 2);
        assert_eq!(instances.dims[0].labels.len(), 2);
        assert!(instances.dims[0].range.is_some());
        assert_eq!(instances.dims[1].labels.len(), 2);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = raw_from_yaml("type: rbranch\ndescription: obsolete");
        assert!(Node::from_raw("X", "X", &raw).is_err());
    }

    #[test]
    fn preorder_order_and_fqns() {
        let mut root = Node::new("A", Payload::empty_for(NodeKind::Branch));
        let mut b = Node::new("B", Payload::empty_for(NodeKind::Branch));
        b.children
            .push(Node::new("S", Payload::empty_for(NodeKind::Sensor)));
        root.children.push(b);
        root.children
            .push(Node::new("C", Payload::empty_for(NodeKind::Sensor)));
        let fqns: Vec<_> = root.preorder().map(|(fqn, _, _)| fqn).collect();
        assert_eq!(fqns, ["A", "A.B", "A.B.S", "A.C"]);
    }
}
