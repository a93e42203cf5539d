//! Infrastructure-level errors: file formats and importers

use std::fmt;
use std::io;

use thiserror::Error;

use crate::domain::DomainError;

/// Field of an LTS node record, named in truncation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    NameLength,
    NameData,
    ContentLength,
    ContentData,
    ChildCount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Field::NameLength => "node name length",
            Field::NameData => "node name data",
            Field::ContentLength => "node content length",
            Field::ContentData => "node content data",
            Field::ChildCount => "number of children",
        };
        f.write_str(label)
    }
}

/// Structural violations of a stored document.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("invalid LTS file: incorrect magic number {found:02x?}")]
    BadMagic { found: Vec<u8> },

    #[error("invalid LTS file: unexpected EOF while reading {field} (expected {expected} bytes, got {actual})")]
    Truncated {
        field: Field,
        expected: u64,
        actual: u64,
    },

    #[error("invalid LTS file: {field} is not valid UTF-8")]
    InvalidUtf8 {
        field: Field,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("not custom binary format ({binary}) and not valid JSON ({json})")]
    NeitherBinaryNorJson {
        binary: Box<FormatError>,
        json: serde_json::Error,
    },
}

/// Failure of a binary decode: either the bytes are wrong or the source is.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("read failed")]
    Io(#[from] io::Error),
}

/// Failures translating a legacy document into a note tree.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("invalid XML: {0}")]
    Xml(String),

    #[error("no 'nodes' table found")]
    MissingTable,

    #[error("could not find expected columns in table 'nodes'")]
    MissingColumns(#[source] rusqlite::Error),

    #[error("database is empty")]
    EmptyDatabase,

    #[error("database error")]
    Database(#[from] rusqlite::Error),

    #[error("tree construction failed")]
    Tree(#[from] DomainError),
}
