//! Built-in datatypes and struct references
//!
//! A leaf's `datatype` string resolves to one of the built-in primitives, a
//! user-defined struct FQN, or the array form of either (`uint8[]`,
//! `SomeStruct[]`). An optional `arraysize` attribute fixes the array length;
//! it is folded into the parsed [`Datatype`] rather than kept as a separate
//! field.

use crate::error::ModelError;
use crate::scalar::ScalarValue;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// The built-in scalar datatypes of the signal DSL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Boolean,
    String,
}

impl Primitive {
    /// All primitives, in the order the wire formats enumerate them
    pub const ALL: [Primitive; 12] = [
        Primitive::Int8,
        Primitive::Int16,
        Primitive::Int32,
        Primitive::Int64,
        Primitive::UInt8,
        Primitive::UInt16,
        Primitive::UInt32,
        Primitive::UInt64,
        Primitive::Float,
        Primitive::Double,
        Primitive::Boolean,
        Primitive::String,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint8" => Self::UInt8,
            "uint16" => Self::UInt16,
            "uint32" => Self::UInt32,
            "uint64" => Self::UInt64,
            "float" => Self::Float,
            "double" => Self::Double,
            "boolean" => Self::Boolean,
            "string" => Self::String,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Integer and floating types together; the `numeric` shorthand in unit
    /// files expands to exactly this set.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating()
    }

    /// Inclusive integer range for the integer primitives
    fn integer_range(&self) -> Option<(i128, i128)> {
        Some(match self {
            Self::Int8 => (i8::MIN as i128, i8::MAX as i128),
            Self::Int16 => (i16::MIN as i128, i16::MAX as i128),
            Self::Int32 => (i32::MIN as i128, i32::MAX as i128),
            Self::Int64 => (i64::MIN as i128, i64::MAX as i128),
            Self::UInt8 => (0, u8::MAX as i128),
            Self::UInt16 => (0, u16::MAX as i128),
            Self::UInt32 => (0, u32::MAX as i128),
            Self::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }

    /// Whether `value` is representable in this primitive
    pub fn can_represent(&self, value: &ScalarValue) -> bool {
        match self {
            Self::Boolean => matches!(value, ScalarValue::Bool(_)),
            Self::String => matches!(value, ScalarValue::String(_)),
            Self::Float | Self::Double => value.is_numeric(),
            _ => {
                let Some((lo, hi)) = self.integer_range() else {
                    return false;
                };
                match value {
                    ScalarValue::Int(i) => (lo..=hi).contains(&(*i as i128)),
                    ScalarValue::Float(f) => {
                        f.fract() == 0.0 && *f >= lo as f64 && *f <= hi as f64
                    }
                    _ => false,
                }
            }
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `datatype` attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datatype {
    Primitive(Primitive),
    /// Array of a primitive, optionally with a fixed `arraysize`
    PrimitiveArray {
        elem: Primitive,
        size: Option<usize>,
    },
    /// Reference to a user-defined struct by FQN
    Struct(SmolStr),
    /// Array of a user-defined struct
    StructArray {
        fqn: SmolStr,
        size: Option<usize>,
    },
}

impl Datatype {
    /// Parse a `datatype` string, folding in a separate `arraysize` attribute.
    ///
    /// Anything that is not a built-in primitive is taken as a struct
    /// reference; whether the FQN actually exists is the validator's concern.
    pub fn parse(s: &str, arraysize: Option<usize>) -> Result<Self, ModelError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ModelError::InvalidDatatype {
                value: s.to_string(),
            });
        }
        let (base, is_array) = match s.strip_suffix("[]") {
            Some(base) => (base.trim(), true),
            None => (s, false),
        };
        if base.is_empty() || base.contains('[') {
            return Err(ModelError::InvalidDatatype {
                value: s.to_string(),
            });
        }
        Ok(match (Primitive::parse(base), is_array) {
            (Some(p), false) => Self::Primitive(p),
            (Some(p), true) => Self::PrimitiveArray {
                elem: p,
                size: arraysize,
            },
            (None, false) => Self::Struct(SmolStr::from(base)),
            (None, true) => Self::StructArray {
                fqn: SmolStr::from(base),
                size: arraysize,
            },
        })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::PrimitiveArray { .. } | Self::StructArray { .. })
    }

    /// Element primitive for primitive types and arrays of them
    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Self::Primitive(p) | Self::PrimitiveArray { elem: p, .. } => Some(*p),
            _ => None,
        }
    }

    /// Struct FQN for struct references and arrays of them
    pub fn struct_fqn(&self) -> Option<&str> {
        match self {
            Self::Struct(fqn) | Self::StructArray { fqn, .. } => Some(fqn),
            _ => None,
        }
    }

    pub fn arraysize(&self) -> Option<usize> {
        match self {
            Self::PrimitiveArray { size, .. } | Self::StructArray { size, .. } => *size,
            _ => None,
        }
    }

    /// Canonical textual form, including the array suffix.
    ///
    /// This string participates in the static-UID hash input and the binary
    /// wire format, so it is stable: `uint8`, `uint8[]`, `A.B.SomeStruct[]`.
    pub fn canonical(&self) -> String {
        match self {
            Self::Primitive(p) => p.as_str().to_string(),
            Self::PrimitiveArray { elem, .. } => format!("{}[]", elem.as_str()),
            Self::Struct(fqn) => fqn.to_string(),
            Self::StructArray { fqn, .. } => format!("{}[]", fqn),
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
