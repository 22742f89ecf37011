//! Document loading and `#include` resolution
//!
//! A vspec file is YAML with one extension: lines of the form
//!
//! ```text
//! #include <path> [PREFIX]
//! ```
//!
//! are processed before YAML parsing. The included file is loaded recursively
//! and its entries spliced in at the directive position, with the dotted
//! prefix prepended to every FQN it contributes. Includes resolve against the
//! including file's directory first, then each configured include root in
//! order; the first hit wins.
//!
//! Parsing is strict: mapping keys must be unique within a document
//! (serde_yaml enforces this) and an FQN may appear only once per logical
//! file, includes included.

use crate::error::{CompileError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vspec_model::{FlatModel, RawNode};

/// Loader for one logical vspec file and its include closure
#[derive(Debug, Clone)]
pub struct Loader {
    include_roots: Vec<PathBuf>,
}

impl Loader {
    pub fn new(include_roots: Vec<PathBuf>) -> Self {
        Self { include_roots }
    }

    /// Load `path` and everything it includes into one flat model, in
    /// textual order.
    pub fn load_file(&self, path: &Path) -> Result<FlatModel> {
        let mut model = FlatModel::new();
        let mut chain = Vec::new();
        self.load_into(path, "", &mut model, &mut chain)?;
        info!(file = %path.display(), nodes = model.len(), "loaded vspec");
        Ok(model)
    }

    fn load_into(
        &self,
        path: &Path,
        prefix: &str,
        model: &mut FlatModel,
        chain: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let canonical = path
            .canonicalize()
            .map_err(|source| CompileError::io(source, path))?;
        if chain.contains(&canonical) {
            let mut cycle = chain.clone();
            cycle.push(canonical);
            return Err(CompileError::IncludeCycle { chain: cycle });
        }
        chain.push(canonical);

        let text =
            fs::read_to_string(path).map_err(|source| CompileError::io(source, path))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        // Split the file into YAML segments at include directives so entries
        // land in the model in textual order.
        let mut segment = String::new();
        for line in text.lines() {
            if let Some(directive) = parse_include(line) {
                self.flush_segment(&mut segment, path, prefix, model)?;
                let target = self.resolve_include(&directive.path, base_dir, path)?;
                debug!(include = %target.display(), prefix = directive.prefix.as_deref().unwrap_or(""), "resolved include");
                let child_prefix = match &directive.prefix {
                    Some(p) if prefix.is_empty() => p.clone(),
                    Some(p) => format!("{}.{}", prefix, p),
                    None => prefix.to_string(),
                };
                self.load_into(&target, &child_prefix, model, chain)?;
            } else {
                segment.push_str(line);
                segment.push('\n');
            }
        }
        self.flush_segment(&mut segment, path, prefix, model)?;

        chain.pop();
        Ok(())
    }

    /// Parse one accumulated YAML segment and append its entries
    fn flush_segment(
        &self,
        segment: &mut String,
        path: &Path,
        prefix: &str,
        model: &mut FlatModel,
    ) -> Result<()> {
        let text = std::mem::take(segment);
        if text.trim().is_empty() {
            return Ok(());
        }
        let doc: serde_yaml::Value =
            serde_yaml::from_str(&text).map_err(|source| CompileError::YamlSyntax {
                source,
                path: path.to_path_buf(),
            })?;
        // A run of comment lines parses as null; nothing to splice.
        if doc.is_null() {
            return Ok(());
        }
        let serde_yaml::Value::Mapping(mapping) = doc else {
            return Err(CompileError::NotAMapping {
                path: path.to_path_buf(),
            });
        };
        for (key, value) in &mapping {
            let fqn = key.as_str().ok_or_else(|| CompileError::NotAMapping {
                path: path.to_path_buf(),
            })?;
            let fqn = if prefix.is_empty() {
                fqn.to_string()
            } else {
                format!("{}.{}", prefix, fqn)
            };
            let fields = value
                .as_mapping()
                .ok_or_else(|| CompileError::NotAMapping {
                    path: path.to_path_buf(),
                })?;
            let raw = RawNode::from_mapping(fields, &fqn)?;
            if model.insert(fqn.clone(), raw).is_some() {
                return Err(CompileError::DuplicateKey {
                    fqn,
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Resolve an include path: including file's directory first, then each
    /// include root in order.
    fn resolve_include(&self, include: &str, base_dir: &Path, from: &Path) -> Result<PathBuf> {
        let mut searched = Vec::with_capacity(1 + self.include_roots.len());
        let local = base_dir.join(include);
        if local.is_file() {
            return Ok(local);
        }
        searched.push(local);
        for root in &self.include_roots {
            let candidate = root.join(include);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }
        Err(CompileError::IncludeNotFound {
            include: include.to_string(),
            from: from.to_path_buf(),
            searched,
        })
    }
}

struct IncludeDirective {
    path: String,
    prefix: Option<String>,
}

/// Recognize `#include <path> [PREFIX]`; any other `#`-line is a comment
fn parse_include(line: &str) -> Option<IncludeDirective> {
    let rest = line.trim_start().strip_prefix("#include")?;
    // Require a separator so a key like `#includes` stays a comment.
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let mut parts = rest.split_whitespace();
    let path = parts.next()?.to_string();
    let prefix = parts.next().map(str::to_string);
    Some(IncludeDirective { path, prefix })
}
