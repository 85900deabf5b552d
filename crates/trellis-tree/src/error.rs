//! Tree-mutation errors
//!
//! Structural errors are fatal to the operation and leave the collection
//! untouched. A policy `Cancel` is not an error; it surfaces as an
//! unchanged collection, never through this type.

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Tree operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A node can only ever belong to one element at a time
    #[error("node already has a parent")]
    AlreadyParented,

    /// The owning element refused to accept or release the child
    #[error("owner refused the child")]
    Refused,

    /// Positional access outside the collection
    #[error("index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    /// No node with that id in the tree
    #[error("node not found")]
    NotFound,

    /// The target node does not own children
    #[error("node is not an element")]
    NotAnElement,

    /// The node's kind does not match the typed collection
    #[error("node kind does not match the collection")]
    KindMismatch,
}
