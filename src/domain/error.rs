//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::arena::NodeId;

/// Domain errors represent violations of the tree's structural rules.
/// These are independent of storage and file formats.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The id does not name a live node of this tree.
    #[error("not a node of this tree: {0:?}")]
    NodeNotFound(NodeId),

    #[error("attaching {node:?} under {parent:?} would create a cycle")]
    CycleDetected { node: NodeId, parent: NodeId },

    #[error("the root node cannot be re-parented")]
    RootNotMovable,
}

/// Result type for tree operations.
pub type DomainResult<T> = Result<T, DomainError>;
