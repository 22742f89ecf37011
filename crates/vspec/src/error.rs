use crate::validate::ValidationReport;
use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while compiling a vspec
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    /// IO error while reading a source file or writing an artifact
    #[error("IO error on {}", .path.display())]
    #[diagnostic(code(vspec::io))]
    Io {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// An `#include` directive could not be resolved
    #[error("include `{include}` (from {}) not found", .from.display())]
    #[diagnostic(
        code(vspec::include_not_found),
        help("Includes resolve against the including file's directory first, then each -I root in order")
    )]
    IncludeNotFound {
        include: String,
        from: PathBuf,
        searched: Vec<PathBuf>,
    },

    /// A file transitively includes itself
    #[error("include cycle: {}", .chain.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" -> "))]
    #[diagnostic(code(vspec::include_cycle))]
    IncludeCycle { chain: Vec<PathBuf> },

    /// The same FQN was defined twice within one logical file
    #[error("duplicate key `{fqn}` in {}", .path.display())]
    #[diagnostic(
        code(vspec::duplicate_key),
        help("Each FQN may be defined once per logical file; use an overlay to amend a node")
    )]
    DuplicateKey { fqn: String, path: PathBuf },

    /// A document failed YAML parsing
    #[error("YAML syntax error in {}", .path.display())]
    #[diagnostic(code(vspec::yaml_syntax))]
    YamlSyntax {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },

    /// The top level of a vspec document was not a mapping
    #[error("top level of {} must be a mapping of FQNs", .path.display())]
    #[diagnostic(code(vspec::yaml_syntax))]
    NotAMapping { path: PathBuf },

    /// An FQN references an ancestor the flat model never defines
    #[error("node `{fqn}` references undefined ancestor `{ancestor}`")]
    #[diagnostic(
        code(vspec::missing_ancestor),
        help("Every ancestor of a node must be declared, except below a branch that carries `instances`")
    )]
    MissingAncestor { fqn: String, ancestor: String },

    /// The merged model defines more than one top-level root
    #[error("expected a single root, found: {}", .roots.join(", "))]
    #[diagnostic(code(vspec::multiple_roots))]
    MultipleRoots { roots: Vec<String> },

    /// The merged model was empty
    #[error("no nodes loaded from {}", .path.display())]
    #[diagnostic(code(vspec::empty_model))]
    EmptyModel { path: PathBuf },

    /// Data-model level failure (bad datatype, cyclic struct, registry file)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] vspec_model::ModelError),

    /// The validator rejected the tree
    #[error("validation failed with {} error(s)", .report.error_count())]
    #[diagnostic(code(vspec::validation_failed))]
    ValidationFailed { report: ValidationReport },

    /// Static-UID stage failure
    #[error(transparent)]
    #[diagnostic(transparent)]
    Id(#[from] vspec_id::IdError),

    /// Binary codec failure
    #[error(transparent)]
    #[diagnostic(transparent)]
    Binary(#[from] vspec_binary::BinaryError),
}

impl CompileError {
    pub fn io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    /// Exit code contract of the `vspec` binary: 1 for an invalid catalog,
    /// 3 for IO trouble (2 is usage errors, owned by clap).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { .. } => 3,
            Self::Model(vspec_model::ModelError::Io { .. }) => 3,
            Self::Binary(e) if e.is_io() => 3,
            _ => 1,
        }
    }
}

/// Result type for compile operations
pub type Result<T> = std::result::Result<T, CompileError>;
