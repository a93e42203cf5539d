//! Application-level errors (wraps domain and format errors)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::{FormatError, ImportError};

/// Application errors wrap lower-layer errors and add the file they concern.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot load {}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("import of {} failed", .path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: ImportError,
    },

    #[error("error serializing tree to JSON for {}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
