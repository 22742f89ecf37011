use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building the shared data model
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    /// IO error when reading unit, quantity, or type files
    #[error("IO error reading {}", .path.display())]
    #[diagnostic(code(vspec::model::io))]
    Io {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// File was not valid YAML
    #[error("YAML syntax error in {}", .path.display())]
    #[diagnostic(
        code(vspec::model::yaml_syntax),
        help("Check the file for malformed YAML; mapping keys must be unique")
    )]
    YamlSyntax {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },

    /// A mapping key was not a string
    #[error("non-string mapping key in {context}")]
    #[diagnostic(code(vspec::model::non_string_key))]
    NonStringKey { context: String },

    /// Datatype string did not parse
    #[error("unrecognized datatype `{value}`")]
    #[diagnostic(
        code(vspec::model::invalid_datatype),
        help("Expected a built-in type such as `uint8` or `float[]`, or a struct FQN")
    )]
    InvalidDatatype { value: String },

    /// Node `type` field was not one of the six kinds
    #[error("unrecognized node type `{value}` on {fqn}")]
    #[diagnostic(
        code(vspec::model::invalid_kind),
        help("Expected one of branch, sensor, actuator, attribute, struct, property")
    )]
    InvalidKind { value: String, fqn: String },

    /// `instances` descriptor did not parse
    #[error("invalid instances descriptor on {fqn}: {message}")]
    #[diagnostic(
        code(vspec::model::invalid_instances),
        help("A dimension is either a label list or a range of the form Name[lo,hi]")
    )]
    InvalidInstances { fqn: String, message: String },

    /// Struct definitions reference each other in a cycle
    #[error("cyclic struct reference: {}", .cycle.join(" -> "))]
    #[diagnostic(
        code(vspec::model::cyclic_type),
        help("A property's datatype may not lead back to its own struct")
    )]
    CyclicType { cycle: Vec<String> },

    /// Unit or quantity file had an unexpected shape
    #[error("invalid {kind} file {}: {message}", .path.display())]
    #[diagnostic(code(vspec::model::invalid_registry_file))]
    InvalidRegistryFile {
        kind: &'static str,
        path: PathBuf,
        message: String,
    },
}

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
