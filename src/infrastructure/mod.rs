//! Infrastructure layer: file formats, importers, I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod di;
pub mod error;
pub mod import;
pub mod json;
pub mod lts;
pub mod traits;

pub use error::{DecodeError, Field, FormatError, ImportError};
