//! Document service
//!
//! Saves note trees under the canonical `.lts` extension (binary or JSON)
//! and loads them back, dispatching on the file suffix. Legacy CherryTree
//! and NoteCase files are imported through the same entry point.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::{SaveFormat, Settings};
use crate::domain::NoteTree;
use crate::infrastructure::import::{cherrytree, notecase};
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{json, lts, DecodeError, FormatError, ImportError};

/// Extension shared by the binary and the JSON save paths.
pub const CANONICAL_EXTENSION: &str = "lts";

/// File kinds recognised by [`DocumentService::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `.lts`: LTS binary, or JSON written under the same extension
    Lts,
    /// `.ctd`: CherryTree XML
    CherryTree,
    /// `.ncd`: NoteCase SQLite
    NoteCase,
}

impl DocumentKind {
    /// Classifies by suffix only (case-sensitive); the contents are not inspected.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.as_os_str().to_string_lossy();
        if name.ends_with(".lts") {
            Some(Self::Lts)
        } else if name.ends_with(".ctd") {
            Some(Self::CherryTree)
        } else if name.ends_with(".ncd") {
            Some(Self::NoteCase)
        } else {
            None
        }
    }
}

/// Appends `.lts` unless the name already ends with it.
///
/// `notes` becomes `notes.lts`, `notes.txt` becomes `notes.txt.lts`.
pub fn with_canonical_extension(target: &Path) -> PathBuf {
    if DocumentKind::detect(target) == Some(DocumentKind::Lts) {
        return target.to_path_buf();
    }
    let mut name = OsString::from(target.as_os_str());
    name.push(".");
    name.push(CANONICAL_EXTENSION);
    PathBuf::from(name)
}

/// Service for persisting and loading note documents.
pub struct DocumentService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl DocumentService {
    /// Create a new document service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Writes `tree` in LTS binary format. Returns the path written.
    pub fn save(&self, tree: &NoteTree, target: &Path) -> ApplicationResult<PathBuf> {
        self.save_as(tree, target, SaveFormat::Binary)
    }

    /// Writes `tree` as JSON under the canonical extension. Returns the path written.
    pub fn save_json(&self, tree: &NoteTree, target: &Path) -> ApplicationResult<PathBuf> {
        self.save_as(tree, target, SaveFormat::Json)
    }

    /// Writes `tree` in `format`. Returns the path written.
    ///
    /// The document is encoded completely before the file is opened.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn save_as(
        &self,
        tree: &NoteTree,
        target: &Path,
        format: SaveFormat,
    ) -> ApplicationResult<PathBuf> {
        let path = with_canonical_extension(target);
        let bytes = match format {
            SaveFormat::Binary => lts::encode_to_vec(tree).with_path_context("encode", &path)?,
            SaveFormat::Json => json::encode_to_vec(tree, self.settings.pretty_json).map_err(
                |source| ApplicationError::Serialize {
                    path: path.clone(),
                    source,
                },
            )?,
        };

        self.fs
            .write(&path, &bytes)
            .with_path_context("error saving to", &path)?;
        debug!("save_as: wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Loads a document, choosing the decoder from the suffix of `source`.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, source: &Path) -> ApplicationResult<NoteTree> {
        match DocumentKind::detect(source) {
            Some(DocumentKind::Lts) => self.load_lts(source),
            Some(DocumentKind::CherryTree) => self.import_cherrytree(source),
            Some(DocumentKind::NoteCase) => self.import_notecase(source),
            None => Err(ApplicationError::UnsupportedFormat(source.to_path_buf())),
        }
    }

    /// Binary first; JSON only when the bytes are not valid LTS.
    fn load_lts(&self, source: &Path) -> ApplicationResult<NoteTree> {
        let bytes = self
            .fs
            .read(source)
            .with_path_context("error loading from", source)?;

        let binary = match lts::decode_slice(&bytes) {
            Ok(tree) => return Ok(tree),
            Err(DecodeError::Io(e)) => {
                return Err(ApplicationError::io(
                    format!("error loading from '{}'", source.display()),
                    e,
                ));
            }
            Err(DecodeError::Format(e)) => e,
        };
        debug!("load_lts: not LTS binary ({binary}), trying JSON");

        json::decode_slice(&bytes).map_err(|json| ApplicationError::Format {
            path: source.to_path_buf(),
            source: FormatError::NeitherBinaryNorJson {
                binary: Box::new(binary),
                json,
            },
        })
    }

    fn import_cherrytree(&self, source: &Path) -> ApplicationResult<NoteTree> {
        let xml = self
            .fs
            .read_to_string(source)
            .with_path_context("CherryTree file", source)?;
        cherrytree::parse(&xml, &self.settings.import).map_err(|e| import_err(source, e))
    }

    fn import_notecase(&self, source: &Path) -> ApplicationResult<NoteTree> {
        // SQLite would report a missing file as a generic open failure
        if !self.fs.exists(source) {
            return Err(ApplicationError::io(
                format!("NoteCase file '{}'", source.display()),
                io::Error::new(io::ErrorKind::NotFound, "file not found"),
            ));
        }
        notecase::import(source, &self.settings.import).map_err(|e| import_err(source, e))
    }
}

fn import_err(path: &Path, source: ImportError) -> ApplicationError {
    ApplicationError::Import {
        path: path.to_path_buf(),
        source,
    }
}
