use miette::Diagnostic;
use thiserror::Error;

/// Errors from the static-UID stage
#[derive(Debug, Error, Diagnostic)]
pub enum IdError {
    /// Two nodes hashed (or were overridden) to the same identifier
    #[error("id collision: 0x{id:08X} is shared by `{first}` and `{second}`")]
    #[diagnostic(
        code(vspec::id::collision),
        help("Set `constUID` on one of the colliding nodes to resolve the clash")
    )]
    IdCollision {
        id: u32,
        first: String,
        second: String,
    },

    /// A `constUID` override was not a 4-byte hex literal
    #[error("malformed constUID `{value}` on `{fqn}`")]
    #[diagnostic(
        code(vspec::id::malformed_const_uid),
        help("constUID must be a 4-byte hex literal such as 0x00112233")
    )]
    MalformedConstUid { fqn: String, value: String },
}

/// Result type for static-UID operations
pub type Result<T> = std::result::Result<T, IdError>;
