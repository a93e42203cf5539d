//! Domain layer: the note tree and its structural edits
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod editor;
pub mod error;
pub mod record;

pub use arena::{Node, NodeId, NoteTree, PreOrderIter};
pub use error::{DomainError, DomainResult};
pub use record::NodeRecord;
