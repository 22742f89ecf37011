//! # Binary tree codec and wildcard search
//!
//! The on-disk format is a pre-order traversal of the tree; each node is a
//! run of length-prefixed UTF-8 strings followed by a one-byte child count.
//! Prefix widths and endianness are an external contract and must not
//! change - see [`write`] for the field table.
//!
//! The in-memory representation of a decoded tree is [`BinaryNode`], a
//! deliberately flat all-strings struct distinct from the compiler's typed
//! tree; the conversion lives in [`node`].
//!
//! ## Modules
//!
//! - [`node`] - the decoded node type and conversion from the model tree
//! - [`write`] - encoding to bytes or a file
//! - [`read`] - decoding, with node-count/depth metadata
//! - [`search`] - wildcard path search and the bulk leaf enumerations

pub mod error;
pub mod node;
pub mod read;
pub mod search;
pub mod write;

pub use error::{BinaryError, Result};
pub use node::BinaryNode;
pub use read::{ReadMetadata, decode, read_file};
pub use search::{
    SearchEngine, SearchOptions, SearchState, ValidateLevel, export_leaf_paths,
    export_leaf_uuids, max_validate, search,
};
pub use write::{encode, write_file};
