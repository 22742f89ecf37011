//! Authored scalar values
//!
//! `min`, `max`, `default`, and `allowed` entries arrive from YAML as plain
//! scalars and must round-trip unchanged through overlays and exporters.
//! [`ScalarValue`] keeps them as authored while still allowing numeric
//! comparison across the int/float divide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar literal from a vspec source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// Convert from a YAML value, rejecting mappings and sequences
    pub fn from_yaml(value: &serde_yaml::Value) -> Option<Self> {
        match value {
            serde_yaml::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            serde_yaml::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }

    /// Render back to a YAML value
    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            Self::Bool(b) => serde_yaml::Value::Bool(*b),
            Self::Int(i) => serde_yaml::Value::Number((*i).into()),
            Self::Float(f) => serde_yaml::Value::Number(serde_yaml::Number::from(*f)),
            Self::String(s) => serde_yaml::Value::String(s.clone()),
        }
    }

    /// Numeric view, if this scalar is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view without loss, if this scalar is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 => {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}
