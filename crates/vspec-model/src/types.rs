//! The user-defined type registry
//!
//! Struct and property definitions live in their own vspec tree (loaded and
//! overlay-merged exactly like signal files). After loading, the registry is
//! a mapping from struct FQN to its ordered property list. A property's
//! datatype may reference another struct, which makes the definitions a
//! directed graph; cycles are an error and are reported with the offending
//! path.

use crate::datatype::Datatype;
use crate::error::ModelError;
use crate::node::{Node, NodeKind};
use indexmap::IndexMap;
use smol_str::SmolStr;

/// One property of a struct
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: SmolStr,
    pub datatype: Datatype,
    pub description: Option<String>,
}

/// One struct definition
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub fqn: SmolStr,
    pub description: Option<String>,
    pub properties: Vec<PropertyDef>,
}

/// Registry of user-defined struct types, keyed by FQN
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    structs: IndexMap<SmolStr, StructDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every struct in a types tree.
    ///
    /// Property children missing a datatype are skipped here; the validator
    /// reports them against the tree itself.
    pub fn from_tree(root: &Node) -> Self {
        let mut registry = Self::new();
        for (fqn, _, node) in root.preorder() {
            if node.kind() != NodeKind::Struct {
                continue;
            }
            let properties = node
                .children
                .iter()
                .filter(|c| c.kind() == NodeKind::Property)
                .filter_map(|c| {
                    let datatype = c.signal()?.datatype.clone()?;
                    Some(PropertyDef {
                        name: c.name.clone(),
                        datatype,
                        description: c.description.clone(),
                    })
                })
                .collect();
            registry.structs.insert(
                SmolStr::from(fqn.as_str()),
                StructDef {
                    fqn: SmolStr::from(fqn.as_str()),
                    description: node.description.clone(),
                    properties,
                },
            );
        }
        registry
    }

    pub fn get(&self, fqn: &str) -> Option<&StructDef> {
        self.structs.get(fqn)
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.structs.contains_key(fqn)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructDef> {
        self.structs.values()
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    /// Whether `datatype` resolves against the built-ins or this registry
    pub fn resolves(&self, datatype: &Datatype) -> bool {
        match datatype.struct_fqn() {
            Some(fqn) => self.contains(fqn),
            None => true,
        }
    }

    /// Detect reference cycles among struct definitions.
    ///
    /// Depth-first walk with a three-color marking; the first cycle found is
    /// returned as the path that closes it.
    pub fn check_cycles(&self) -> Result<(), ModelError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        fn visit(
            registry: &TypeRegistry,
            fqn: &SmolStr,
            marks: &mut IndexMap<SmolStr, Mark>,
            path: &mut Vec<SmolStr>,
        ) -> Result<(), ModelError> {
            match marks.get(fqn).copied().unwrap_or(Mark::White) {
                Mark::Black => return Ok(()),
                Mark::Grey => {
                    let start = path.iter().position(|p| p == fqn).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|p| p.to_string()).collect();
                    cycle.push(fqn.to_string());
                    return Err(ModelError::CyclicType { cycle });
                }
                Mark::White => {}
            }
            marks.insert(fqn.clone(), Mark::Grey);
            path.push(fqn.clone());
            if let Some(def) = registry.get(fqn) {
                for prop in &def.properties {
                    if let Some(target) = prop.datatype.struct_fqn() {
                        let target = SmolStr::from(target);
                        if registry.contains(&target) {
                            visit(registry, &target, marks, path)?;
                        }
                    }
                }
            }
            path.pop();
            marks.insert(fqn.clone(), Mark::Black);
            Ok(())
        }

        let mut marks = IndexMap::new();
        let mut path = Vec::new();
        for fqn in self.structs.keys() {
            visit(self, fqn, &mut marks, &mut path)?;
        }
        Ok(())
    }
}
