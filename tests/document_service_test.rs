//! Integration tests for DocumentService: suffix dispatch, canonical
//! extension and the binary -> JSON load fallback.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rstest::rstest;
use tempfile::TempDir;

use treenote::application::services::DocumentService;
use treenote::application::ApplicationError;
use treenote::config::{SaveFormat, Settings};
use treenote::domain::{NodeRecord, NoteTree};
use treenote::infrastructure::traits::{FileSystem, RealFileSystem};
use treenote::infrastructure::FormatError;
use treenote::util::testing;

fn service() -> DocumentService {
    testing::init_test_setup();
    DocumentService::new(Arc::new(RealFileSystem), Arc::new(Settings::default()))
}

fn sample_tree() -> NoteTree {
    NoteTree::from_record(&NodeRecord::new("Notes", "").with_children(vec![
        NodeRecord::new("Shopping", "milk\neggs"),
        NodeRecord::new("Work", "").with_children(vec![NodeRecord::new("Ümlaut ✓", "\0")]),
    ]))
}

/// In-memory filesystem that can be told to fail writes.
#[derive(Default)]
struct MockFileSystem {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    fail_writes: bool,
}

impl MockFileSystem {
    fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.contents(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }
}

// ============================================================
// save / save_json
// ============================================================

#[rstest]
#[case("notes", "notes.lts")]
#[case("notes.lts", "notes.lts")]
#[case("notes.txt", "notes.txt.lts")]
fn given_target_name_when_saving_then_writes_canonical_extension(
    #[case] target: &str,
    #[case] expected: &str,
) {
    // Arrange
    let temp = TempDir::new().unwrap();
    let service = service();

    // Act
    let written = service
        .save(&sample_tree(), &temp.path().join(target))
        .unwrap();

    // Assert
    assert_eq!(written, temp.path().join(expected));
    assert!(written.exists());
    assert_eq!(&fs::read(&written).unwrap()[..4], b"LTS1");
}

#[test]
fn given_tree_when_saving_then_load_returns_equal_tree() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let service = service();
    let tree = sample_tree();

    // Act
    let written = service.save(&tree, &temp.path().join("notes")).unwrap();
    let loaded = service.load(&written).unwrap();

    // Assert
    assert_eq!(loaded, tree);
}

#[test]
fn given_tree_when_saving_json_then_file_is_json_with_lts_extension() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let service = service();

    // Act
    let written = service
        .save_json(&sample_tree(), &temp.path().join("notes"))
        .unwrap();

    // Assert
    assert_eq!(written.extension().unwrap(), "lts");
    let text = fs::read_to_string(&written).unwrap();
    assert!(text.starts_with('{'));
    assert!(text.contains("\n  \"name\": \"Notes\""), "pretty-printed: {text}");
}

#[test]
fn given_compact_json_setting_when_saving_json_then_single_line() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let settings = Settings {
        pretty_json: false,
        ..Settings::default()
    };
    let service = DocumentService::new(Arc::new(RealFileSystem), Arc::new(settings));

    // Act
    let written = service
        .save_as(&sample_tree(), &temp.path().join("notes"), SaveFormat::Json)
        .unwrap();

    // Assert
    let text = fs::read_to_string(&written).unwrap();
    assert!(!text.contains('\n'));
}

#[test]
fn given_failing_filesystem_when_saving_then_io_error_names_file() {
    // Arrange
    let service = DocumentService::new(
        Arc::new(MockFileSystem::failing_writes()),
        Arc::new(Settings::default()),
    );

    // Act
    let err = service
        .save(&sample_tree(), Path::new("/notes/today"))
        .unwrap_err();

    // Assert
    match err {
        ApplicationError::Io { context, source } => {
            assert!(context.contains("today.lts"), "context: {context}");
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected Io, got {other:?}"),
    }
}

// ============================================================
// load
// ============================================================

#[test]
fn given_json_under_lts_extension_when_loading_then_falls_back_to_json() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.lts");
    fs::write(
        &path,
        r#"{"name": "R", "children": [{"name": "A", "content": "x"}, {"name": "B", "extra": 1}]}"#,
    )
    .unwrap();

    // Act
    let tree = service().load(&path).unwrap();

    // Assert
    assert_eq!(
        tree.to_record(),
        NodeRecord::new("R", "").with_children(vec![
            NodeRecord::new("A", "x"),
            NodeRecord::new("B", ""),
        ])
    );
}

#[test]
fn given_garbage_under_lts_extension_when_loading_then_reports_both_stages() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.lts");
    fs::write(&path, b"LTS0 not a tree").unwrap();

    // Act
    let err = service().load(&path).unwrap_err();

    // Assert
    match err {
        ApplicationError::Format {
            path: reported,
            source: FormatError::NeitherBinaryNorJson { binary, .. },
        } => {
            assert_eq!(reported, path);
            assert!(matches!(*binary, FormatError::BadMagic { .. }));
        }
        other => panic!("expected NeitherBinaryNorJson, got {other:?}"),
    }
}

#[test]
fn given_json_without_name_when_loading_then_format_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nameless.lts");
    fs::write(&path, r#"{"content": "x"}"#).unwrap();

    let err = service().load(&path).unwrap_err();

    assert!(matches!(err, ApplicationError::Format { .. }));
}

#[test]
fn given_missing_file_when_loading_then_io_not_found() {
    let temp = TempDir::new().unwrap();

    let err = service().load(&temp.path().join("absent.lts")).unwrap_err();

    match err {
        ApplicationError::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn given_missing_notecase_file_when_loading_then_io_not_found() {
    let temp = TempDir::new().unwrap();

    let err = service().load(&temp.path().join("absent.ncd")).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Io { ref source, .. } if source.kind() == io::ErrorKind::NotFound
    ));
}

#[rstest]
#[case("notes.txt")]
#[case("notes.LTS")]
#[case("notes")]
#[case("notes.lts.bak")]
fn given_unknown_suffix_when_loading_then_unsupported_format(#[case] name: &str) {
    let err = service().load(Path::new(name)).unwrap_err();

    assert!(matches!(err, ApplicationError::UnsupportedFormat(p) if p == Path::new(name)));
}

#[test]
fn given_cherrytree_file_when_loading_then_imports() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("legacy.ctd");
    fs::write(
        &path,
        r#"<?xml version="1.0"?><cherrytree><node name="Top"><rich_text>hello</rich_text></node></cherrytree>"#,
    )
    .unwrap();

    // Act
    let tree = service().load(&path).unwrap();

    // Assert
    assert_eq!(
        tree.to_record(),
        NodeRecord::new("Imported CherryTree", "")
            .with_children(vec![NodeRecord::new("Top", "hello")])
    );
}

#[test]
fn given_malformed_cherrytree_when_loading_then_import_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.ctd");
    fs::write(&path, "<cherrytree><node name='a'>").unwrap();

    let err = service().load(&path).unwrap_err();

    assert!(matches!(err, ApplicationError::Import { .. }));
}

#[test]
fn given_mock_filesystem_when_round_tripping_then_no_disk_access() {
    // Arrange
    let fs = Arc::new(MockFileSystem::default());
    let service = DocumentService::new(fs.clone(), Arc::new(Settings::default()));
    let tree = sample_tree();

    // Act
    let written = service.save(&tree, Path::new("/virtual/notes")).unwrap();
    let loaded = service.load(&written).unwrap();

    // Assert
    assert_eq!(written, PathBuf::from("/virtual/notes.lts"));
    assert!(fs.contents(&written).is_some());
    assert_eq!(loaded, tree);
}

#[test]
fn given_legacy_lts_with_padding_when_loading_then_loads_binary() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("legacy.lts");
    let mut bytes = treenote::infrastructure::lts::encode_to_vec(&sample_tree()).unwrap();
    bytes.extend([0, 0, 0, 0]);
    fs::write(&path, bytes).unwrap();

    // Act
    let tree = service().load(&path).unwrap();

    // Assert
    assert_eq!(tree, sample_tree());
}

#[test]
fn given_deep_outline_when_saving_json_then_load_returns_equal_tree() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let service = service();
    let mut tree = NoteTree::new("level 0", "");
    let mut tip = tree.root();
    for level in 1..1500 {
        tip = tree.add_node(tip, &format!("level {level}"), "").unwrap();
    }

    // Act
    let written = service.save_json(&tree, &temp.path().join("deep")).unwrap();
    let loaded = service.load(&written).unwrap();

    // Assert
    assert_eq!(loaded.depth(), 1500);
    assert_eq!(loaded, tree);
}
