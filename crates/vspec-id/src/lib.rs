//! # Static-UID generation and validation
//!
//! Every node of a signal tree gets a stable 32-bit identifier hashed from
//! its contract: FQN, kind, datatype, unit, allowed list, min, and max.
//! Anything else - descriptions, comments, deprecation notes - can change
//! without moving the id. A semantic rename stays stable through the `fka`
//! back-reference: the first former name replaces the FQN in the hash input.
//!
//! ## Modules
//!
//! - [`hash`] - the canonical hash input and the FNV-1 hash itself
//! - [`stamp`] - stamping a tree, `constUID` overrides, collision detection
//! - [`diff`] - validation against a previously stamped tree

pub mod diff;
pub mod error;
pub mod hash;
pub mod stamp;

pub use diff::{ChangeKind, IdDiagnostic, validate_against};
pub use error::{IdError, Result};
pub use hash::{IdOptions, node_id};
pub use stamp::stamp_tree;
