//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treenote/treenote.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `TREENOTE_*` prefix

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// On-disk encoding used when saving under the canonical extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// LTS binary
    #[default]
    Binary,
    /// `{name, content, children}` JSON
    Json,
}

impl std::str::FromStr for SaveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "lts" => Ok(Self::Binary),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown save format: {other}")),
        }
    }
}

/// Names given to nodes the importers have to invent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImportConfig {
    /// Synthetic root of a CherryTree import
    pub cherrytree_root: String,
    /// Synthetic root of a NoteCase import
    pub notecase_root: String,
    /// Name for notes without a title
    pub untitled: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            cherrytree_root: "Imported CherryTree".into(),
            notecase_root: "Imported NoteCase".into(),
            untitled: "Untitled".into(),
        }
    }
}

/// Raw import config for intermediate parsing (`None` = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawImportConfig {
    pub cherrytree_root: Option<String>,
    pub notecase_root: Option<String>,
    pub untitled: Option<String>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub save_format: Option<SaveFormat>,
    pub pretty_json: Option<bool>,
    pub import: RawImportConfig,
}

impl ImportConfig {
    /// Overlay wins where it specifies a value.
    pub fn merge(&self, overlay: &RawImportConfig) -> Self {
        Self {
            cherrytree_root: overlay
                .cherrytree_root
                .clone()
                .unwrap_or_else(|| self.cherrytree_root.clone()),
            notecase_root: overlay
                .notecase_root
                .clone()
                .unwrap_or_else(|| self.notecase_root.clone()),
            untitled: overlay
                .untitled
                .clone()
                .unwrap_or_else(|| self.untitled.clone()),
        }
    }
}

/// Unified configuration for treenote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Format written by commands that save (default: binary)
    pub save_format: SaveFormat,
    /// Indent JSON output (default: true)
    pub pretty_json: bool,
    /// Importer naming
    pub import: ImportConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_format: SaveFormat::Binary,
            pretty_json: true,
            import: ImportConfig::default(),
        }
    }
}

/// Get the XDG config directory for treenote.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treenote").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treenote.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay config onto self; scalars in the overlay win if specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            save_format: overlay.save_format.unwrap_or(self.save_format),
            pretty_json: overlay.pretty_json.unwrap_or(self.pretty_json),
            import: self.import.merge(&overlay.import),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file; unlike the global file it must exist
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/treenote/treenote.toml`
    /// 3. Explicit config file
    /// 4. Environment variables: `TREENOTE_*` prefix, `__` as section separator
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = explicit {
            debug!("explicit config: {}", path.display());
            current = current.merge_with(&load_raw_settings(path)?);
        }

        Self::apply_env_overrides(current)
    }

    /// Load from a single TOML file layered over the defaults only.
    pub fn from_file(path: &Path) -> Result<Self, ApplicationError> {
        Ok(Self::default().merge_with(&load_raw_settings(path)?))
    }

    /// Apply TREENOTE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TREENOTE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("save_format") {
            settings.save_format = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_bool("pretty_json") {
            settings.pretty_json = val;
        }
        if let Ok(val) = config.get_string("import.cherrytree_root") {
            settings.import.cherrytree_root = val;
        }
        if let Ok(val) = config.get_string("import.notecase_root") {
            settings.import.notecase_root = val;
        }
        if let Ok(val) = config.get_string("import.untitled") {
            settings.import.untitled = val;
        }

        Ok(settings)
    }

    /// Effective settings rendered as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("render settings: {e}"),
        })
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_partial_overlay_when_merging_then_unspecified_fields_keep_base() {
        let raw: RawSettings = toml::from_str(
            r#"
save_format = "json"

[import]
untitled = "(no title)"
"#,
        )
        .unwrap();

        let merged = Settings::default().merge_with(&raw);

        assert_eq!(merged.save_format, SaveFormat::Json);
        assert!(merged.pretty_json);
        assert_eq!(merged.import.untitled, "(no title)");
        assert_eq!(merged.import.cherrytree_root, "Imported CherryTree");
    }

    #[test]
    fn given_format_names_when_parsing_then_case_is_ignored() {
        assert_eq!("JSON".parse::<SaveFormat>().unwrap(), SaveFormat::Json);
        assert_eq!("lts".parse::<SaveFormat>().unwrap(), SaveFormat::Binary);
        assert!("xml".parse::<SaveFormat>().is_err());
    }
}
