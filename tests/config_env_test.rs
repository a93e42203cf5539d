//! Environment variable overrides, kept in their own test binary so the
//! process environment is not shared with other config tests.

use std::env;
use std::fs;

use tempfile::TempDir;

use treenote::config::{SaveFormat, Settings};

#[test]
fn given_env_vars_when_loading_then_override_explicit_file() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("treenote.toml");
    fs::write(
        &path,
        r#"
save_format = "binary"

[import]
untitled = "from file"
notecase_root = "kept"
"#,
    )
    .unwrap();
    env::set_var("TREENOTE_SAVE_FORMAT", "json");
    env::set_var("TREENOTE_IMPORT__UNTITLED", "from env");

    // Act
    let result = Settings::load(Some(path.as_path()));
    env::remove_var("TREENOTE_SAVE_FORMAT");
    env::remove_var("TREENOTE_IMPORT__UNTITLED");

    // Assert
    let settings = result.expect("load settings");
    assert_eq!(settings.save_format, SaveFormat::Json);
    assert_eq!(settings.import.untitled, "from env");
    assert_eq!(settings.import.notecase_root, "kept");
}
