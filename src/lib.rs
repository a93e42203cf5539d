//! treenote: hierarchical notes stored as LTS trees
//!
//! Layers:
//! - `domain`: the arena-backed [`NoteTree`] and its editing operations
//! - `infrastructure`: LTS binary and JSON codecs, legacy importers, I/O traits
//! - `application`: [`DocumentService`] dispatching load/save by file suffix
//! - `cli`: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use application::services::{DocumentKind, DocumentService};
pub use application::{ApplicationError, ApplicationResult};
pub use config::{SaveFormat, Settings};
pub use domain::{DomainError, Node, NodeId, NodeRecord, NoteTree};
pub use infrastructure::{DecodeError, FormatError, ImportError};
