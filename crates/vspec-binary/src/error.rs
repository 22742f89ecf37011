//! Error types for the binary codec

use std::error::Error;
use std::fmt;

/// Boxed error type for error sources
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, BinaryError>;

/// Codec error with an operation-level kind and optional context
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("{kind}{}", .context.as_ref().map(|c| format!(": {}", c)).unwrap_or_default())]
#[diagnostic(code(vspec::binary))]
pub struct BinaryError {
    kind: BinaryErrorKind,
    #[source]
    source: Option<BoxError>,
    context: Option<String>,
}

/// Error categories for codec operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryErrorKind {
    /// A length prefix overran the input, or a field was not valid UTF-8
    MalformedNode,
    /// A field exceeded what its prefix width can carry
    Oversize,
    /// I/O failure on the underlying stream or sink
    Io,
}

impl fmt::Display for BinaryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MalformedNode => "malformed node",
            Self::Oversize => "field too large for the wire format",
            Self::Io => "I/O error",
        })
    }
}

impl BinaryError {
    pub fn new(kind: BinaryErrorKind, source: Option<BoxError>) -> Self {
        Self {
            kind,
            source,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// A length prefix pointed past the end of input
    pub fn malformed(context: impl Into<String>) -> Self {
        Self::new(BinaryErrorKind::MalformedNode, None).with_context(context)
    }

    /// A value does not fit its length prefix
    pub fn oversize(context: impl Into<String>) -> Self {
        Self::new(BinaryErrorKind::Oversize, None).with_context(context)
    }

    pub fn io(source: std::io::Error) -> Self {
        Self::new(BinaryErrorKind::Io, Some(Box::new(source)))
    }

    pub fn kind(&self) -> BinaryErrorKind {
        self.kind
    }

    pub fn is_io(&self) -> bool {
        self.kind == BinaryErrorKind::Io
    }
}
