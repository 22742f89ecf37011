//! Unit and quantity registries
//!
//! Units and quantities come from standalone YAML files. Files are merged in
//! the order given; later definitions override earlier ones by id. Two
//! historical unit-file syntaxes are accepted:
//!
//! - modern: entries under a top-level `units:` key with `label`,
//!   `description`, `quantity`, and optional `allowed_datatypes`
//! - legacy: a top-level mapping keyed by unit id with `unit` (the label),
//!   `definition`, and `quantity` - where `domain` is a synonym
//!
//! Quantity files use a top-level `quantities:` mapping. A unit referencing a
//! quantity the quantity registry does not know is a warning, not an error;
//! the cross-check lives here and the validator surfaces the result.

use crate::datatype::Datatype;
use crate::error::ModelError;
use indexmap::IndexMap;
use serde_yaml::Value;
use smol_str::SmolStr;
use std::fs;
use std::path::Path;
use tracing::debug;

/// One unit definition
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: SmolStr,
    /// Display label, e.g. `km/h`
    pub label: String,
    pub description: String,
    pub quantity: Option<SmolStr>,
    /// Datatypes this unit may be combined with; `None` means unrestricted
    pub allowed_datatypes: Option<Vec<String>>,
}

impl Unit {
    /// Whether `datatype` is acceptable for this unit.
    ///
    /// Array types are judged by their element type. The `numeric` shorthand
    /// in an `allowed_datatypes` list matches the union of the integer and
    /// floating types.
    pub fn accepts(&self, datatype: &Datatype) -> bool {
        let Some(allowed) = &self.allowed_datatypes else {
            return true;
        };
        allowed.iter().any(|entry| {
            if entry == "numeric" {
                datatype.primitive().is_some_and(|p| p.is_numeric())
            } else {
                let entry_base = entry.strip_suffix("[]").unwrap_or(entry);
                match datatype.primitive() {
                    Some(p) => p.as_str() == entry_base,
                    None => datatype.struct_fqn() == Some(entry_base),
                }
            }
        })
    }
}

/// One quantity (kind-of-quantity) definition
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub id: SmolStr,
    pub description: String,
    pub remarks: Option<String>,
}

/// Registry of all loaded units, keyed by id
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: IndexMap<SmolStr, Unit>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and merge unit files in order; later definitions win by id
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ModelError> {
        let mut registry = Self::new();
        for path in paths {
            let path = path.as_ref();
            let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
                source,
                path: path.to_path_buf(),
            })?;
            registry.merge_str(&text, path)?;
            debug!(file = %path.display(), total = registry.len(), "merged unit file");
        }
        Ok(registry)
    }

    /// Parse one unit file and merge it over the current contents
    pub fn merge_str(&mut self, text: &str, path: &Path) -> Result<(), ModelError> {
        let doc: Value =
            serde_yaml::from_str(text).map_err(|source| ModelError::YamlSyntax {
                source,
                path: path.to_path_buf(),
            })?;
        let Value::Mapping(top) = doc else {
            return Err(ModelError::InvalidRegistryFile {
                kind: "unit",
                path: path.to_path_buf(),
                message: "top level must be a mapping".to_string(),
            });
        };

        // Modern files nest everything under a `units:` key; legacy files put
        // the unit ids at the top level.
        let (entries, legacy) = match top.get("units") {
            Some(Value::Mapping(inner)) => (inner, false),
            Some(_) => {
                return Err(ModelError::InvalidRegistryFile {
                    kind: "unit",
                    path: path.to_path_buf(),
                    message: "`units` must be a mapping".to_string(),
                });
            }
            None => (&top, true),
        };

        for (key, value) in entries {
            let id = key.as_str().ok_or_else(|| ModelError::NonStringKey {
                context: format!("unit file {}", path.display()),
            })?;
            let Value::Mapping(fields) = value else {
                return Err(ModelError::InvalidRegistryFile {
                    kind: "unit",
                    path: path.to_path_buf(),
                    message: format!("unit `{}` must be a mapping", id),
                });
            };
            let get = |k: &str| fields.get(k).and_then(Value::as_str);
            let label = if legacy {
                get("unit").unwrap_or(id)
            } else {
                get("label").unwrap_or(id)
            };
            let description = if legacy {
                get("definition").or_else(|| get("description")).unwrap_or("")
            } else {
                get("description").unwrap_or("")
            };
            // `domain` is the historical name for `quantity`.
            let quantity = get("quantity").or_else(|| get("domain")).map(SmolStr::from);
            let allowed_datatypes = fields
                .get("allowed_datatypes")
                .and_then(Value::as_sequence)
                .map(|seq| {
                    seq.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                });
            self.units.insert(
                SmolStr::from(id),
                Unit {
                    id: SmolStr::from(id),
                    label: label.to_string(),
                    description: description.to_string(),
                    quantity,
                    allowed_datatypes,
                },
            );
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units whose `quantity` the quantity registry does not know.
    ///
    /// With an empty quantity registry (no quantity file given) this reports
    /// nothing; a missing quantity file downgrades the whole cross-check.
    pub fn unknown_quantities(&self, quantities: &QuantityRegistry) -> Vec<(SmolStr, SmolStr)> {
        if quantities.is_empty() {
            return Vec::new();
        }
        self.units
            .values()
            .filter_map(|unit| {
                let quantity = unit.quantity.as_ref()?;
                (!quantities.contains(quantity))
                    .then(|| (unit.id.clone(), quantity.clone()))
            })
            .collect()
    }
}

/// Registry of all loaded quantities, keyed by id
#[derive(Debug, Clone, Default)]
pub struct QuantityRegistry {
    quantities: IndexMap<SmolStr, Quantity>,
}

impl QuantityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ModelError> {
        let mut registry = Self::new();
        for path in paths {
            let path = path.as_ref();
            let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
                source,
                path: path.to_path_buf(),
            })?;
            registry.merge_str(&text, path)?;
            debug!(file = %path.display(), total = registry.len(), "merged quantity file");
        }
        Ok(registry)
    }

    pub fn merge_str(&mut self, text: &str, path: &Path) -> Result<(), ModelError> {
        let doc: Value =
            serde_yaml::from_str(text).map_err(|source| ModelError::YamlSyntax {
                source,
                path: path.to_path_buf(),
            })?;
        let entries = doc
            .as_mapping()
            .and_then(|top| top.get("quantities"))
            .and_then(Value::as_mapping)
            .ok_or_else(|| ModelError::InvalidRegistryFile {
                kind: "quantity",
                path: path.to_path_buf(),
                message: "expected a top-level `quantities` mapping".to_string(),
            })?;
        for (key, value) in entries {
            let id = key.as_str().ok_or_else(|| ModelError::NonStringKey {
                context: format!("quantity file {}", path.display()),
            })?;
            let get = |k: &str| {
                value
                    .as_mapping()
                    .and_then(|m| m.get(k))
                    .and_then(Value::as_str)
            };
            self.quantities.insert(
                SmolStr::from(id),
                Quantity {
                    id: SmolStr::from(id),
                    description: get("description").unwrap_or("").to_string(),
                    remarks: get("remarks").map(str::to_string),
                },
            );
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Quantity> {
        self.quantities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.quantities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::Primitive;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("test.yaml")
    }

    const MODERN: &str = r#"
units:
  km/h:
    label: km/h
    description: Kilometers per hour
    quantity: speed
    allowed_datatypes: [numeric]
  iso8601:
    label: ISO 8601
    description: Point in time
    quantity: datetime
    allowed_datatypes: [string]
"#;

    const LEGACY: &str = r#"
km/h:
  unit: kilometers per hour
  definition: Speed measured in kilometers per hour
  domain: speed
"#;

    #[test]
    fn modern_syntax() {
        let mut registry = UnitRegistry::new();
        registry.merge_str(MODERN, &path()).unwrap();
        let unit = registry.get("km/h").unwrap();
        assert_eq!(unit.quantity.as_deref(), Some("speed"));
        assert!(unit.accepts(&Datatype::Primitive(Primitive::UInt16)));
        assert!(unit.accepts(&Datatype::Primitive(Primitive::Float)));
        assert!(!unit.accepts(&Datatype::Primitive(Primitive::String)));
    }

    #[test]
    fn legacy_syntax_and_domain_synonym() {
        let mut registry = UnitRegistry::new();
        registry.merge_str(LEGACY, &path()).unwrap();
        let unit = registry.get("km/h").unwrap();
        assert_eq!(unit.label, "kilometers per hour");
        assert_eq!(unit.quantity.as_deref(), Some("speed"));
        assert!(unit.accepts(&Datatype::Primitive(Primitive::String)));
    }

    #[test]
    fn later_file_overrides_by_id() {
        let mut registry = UnitRegistry::new();
        registry.merge_str(MODERN, &path()).unwrap();
        registry.merge_str(LEGACY, &path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("km/h").unwrap().label, "kilometers per hour");
    }

    #[test]
    fn quantity_cross_check() {
        let mut units = UnitRegistry::new();
        units.merge_str(MODERN, &path()).unwrap();

        // No quantity file at all: the cross-check stays quiet.
        assert!(units.unknown_quantities(&QuantityRegistry::new()).is_empty());

        let mut quantities = QuantityRegistry::new();
        quantities
            .merge_str(
                "quantities:\n  speed:\n    description: Speed\n",
                &path(),
            )
            .unwrap();
        let unknown = units.unknown_quantities(&quantities);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].1.as_str(), "datetime");
    }
}
