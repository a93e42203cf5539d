//! CLI argument definitions using clap

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use itertools::Itertools;

use crate::config::SaveFormat;

/// Hierarchical notes: view, edit, convert and merge LTS note trees
#[derive(Parser, Debug)]
#[command(name = "treenote")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the note tree
    Show {
        /// Document (.lts, .ctd, .ncd)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Show only the subtree at this position (e.g. 0.2)
        #[arg(long)]
        at: Option<NodePath>,
        /// Include a one-line content preview
        #[arg(short, long)]
        content: bool,
    },

    /// Print the content of one note
    Cat {
        /// Document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Position of the note
        path: NodePath,
    },

    /// Load any supported document and save it as LTS
    Convert {
        /// Source document (.lts, .ctd, .ncd)
        #[arg(value_hint = ValueHint::FilePath)]
        source: PathBuf,
        /// Target file (.lts appended when missing)
        #[arg(value_hint = ValueHint::FilePath)]
        target: PathBuf,
        /// Output encoding (default: configured save_format)
        #[arg(short, long, value_enum)]
        format: Option<SaveFormat>,
    },

    /// Copy the top-level notes of OTHER under a note of BASE
    Merge {
        /// Document receiving the notes
        #[arg(value_hint = ValueHint::FilePath)]
        base: PathBuf,
        /// Document providing the notes (left unchanged)
        #[arg(value_hint = ValueHint::FilePath)]
        other: PathBuf,
        /// Position in BASE to merge under (default: root)
        #[arg(long)]
        at: Option<NodePath>,
        /// Write the result here instead of back to BASE
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Append a new note
    Add {
        /// Document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Name of the new note
        name: String,
        /// Parent position (default: root)
        #[arg(short, long)]
        parent: Option<NodePath>,
        /// Note content
        #[arg(short, long, default_value = "")]
        content: String,
    },

    /// Remove a note and its subtree
    Remove {
        /// Document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Position of the note
        path: NodePath,
    },

    /// Move a note within the tree
    Move {
        /// Document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Position of the note
        path: NodePath,
        /// Direction
        #[arg(value_enum)]
        direction: Direction,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,
}

/// Editor moves exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Swap with the previous sibling
    Up,
    /// Swap with the next sibling
    Down,
    /// Make last child of the previous sibling
    Indent,
    /// Move after the parent
    Outdent,
}

/// Position of a note as child indices from the root, written `0.2.1`.
///
/// `.` or an empty string is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl FromStr for NodePath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "." {
            return Ok(Self::default());
        }
        s.split('.')
            .map(|part| {
                part.parse::<usize>()
                    .map_err(|_| format!("invalid position '{s}': '{part}' is not an index"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            write!(f, "{}", self.0.iter().join("."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_dotted_indices_when_parsing_then_returns_path() {
        assert_eq!("0.2.1".parse::<NodePath>().unwrap(), NodePath(vec![0, 2, 1]));
        assert_eq!("3".parse::<NodePath>().unwrap(), NodePath(vec![3]));
    }

    #[test]
    fn given_root_forms_when_parsing_then_returns_empty_path() {
        assert!(".".parse::<NodePath>().unwrap().is_root());
        assert!("".parse::<NodePath>().unwrap().is_root());
    }

    #[test]
    fn given_garbage_when_parsing_then_fails() {
        assert!("0..1".parse::<NodePath>().is_err());
        assert!("a.1".parse::<NodePath>().is_err());
        assert!("-1".parse::<NodePath>().is_err());
    }

    #[test]
    fn given_path_when_displaying_then_round_trips() {
        assert_eq!(NodePath(vec![1, 0]).to_string(), "1.0");
        assert_eq!(NodePath::default().to_string(), ".");
    }
}
