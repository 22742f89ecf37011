//! Extended-attribute profiles
//!
//! Extended attributes are accepted without interpretation by default. A
//! profile upgrades a chosen set of them to typed attributes: it declares
//! each attribute's name and scalar datatype, the validator then checks the
//! authored values against those declarations, and profile attributes are
//! implicitly whitelisted.
//!
//! Profile file format:
//!
//! ```yaml
//! profile:
//!   name: fleet
//!   attributes:
//!     fleet_id:
//!       datatype: string
//!       description: Operator-assigned fleet identifier
//!     critical:
//!       datatype: boolean
//! ```

use crate::datatype::Primitive;
use crate::error::ModelError;
use indexmap::IndexMap;
use serde_yaml::Value;
use smol_str::SmolStr;
use std::fs;
use std::path::Path;
use tracing::info;

/// One attribute declaration of a profile
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: SmolStr,
    pub datatype: Primitive,
    pub description: Option<String>,
}

/// A declared attribute profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub name: SmolStr,
    attributes: IndexMap<SmolStr, AttributeSpec>,
}

impl Profile {
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
            source,
            path: path.to_path_buf(),
        })?;
        Self::parse_str(&text, path)
    }

    pub fn parse_str(text: &str, path: &Path) -> Result<Self, ModelError> {
        let invalid = |message: &str| ModelError::InvalidRegistryFile {
            kind: "profile",
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        let doc: Value =
            serde_yaml::from_str(text).map_err(|source| ModelError::YamlSyntax {
                source,
                path: path.to_path_buf(),
            })?;
        let profile = doc
            .as_mapping()
            .and_then(|top| top.get("profile"))
            .and_then(Value::as_mapping)
            .ok_or_else(|| invalid("expected a top-level `profile` mapping"))?;
        let name = profile
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("profile requires a `name`"))?;
        let declared = profile
            .get("attributes")
            .and_then(Value::as_mapping)
            .ok_or_else(|| invalid("profile requires an `attributes` mapping"))?;

        let mut attributes = IndexMap::with_capacity(declared.len());
        for (key, value) in declared {
            let attribute = key.as_str().ok_or_else(|| ModelError::NonStringKey {
                context: format!("profile file {}", path.display()),
            })?;
            let datatype = value
                .as_mapping()
                .and_then(|m| m.get("datatype"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    invalid(&format!("attribute `{}` requires a datatype", attribute))
                })?;
            let datatype = Primitive::parse(datatype).ok_or_else(|| {
                ModelError::InvalidDatatype {
                    value: datatype.to_string(),
                }
            })?;
            let description = value
                .as_mapping()
                .and_then(|m| m.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string);
            attributes.insert(
                SmolStr::from(attribute),
                AttributeSpec {
                    name: SmolStr::from(attribute),
                    datatype,
                    description,
                },
            );
        }
        info!(profile = name, attributes = attributes.len(), "loaded attribute profile");
        Ok(Self {
            name: SmolStr::from(name),
            attributes,
        })
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeSpec> {
        self.attributes.get(attribute)
    }

    pub fn declares(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.values()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
