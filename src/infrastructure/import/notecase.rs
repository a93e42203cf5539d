//! NoteCase (`.ncd`) importer.
//!
//! NoteCase keeps its outline in an SQLite table `nodes` with
//! `(id, parent_id, title, <content>)` rows, where the content column is
//! `html_content` or, in older files, `rtf_content`.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, instrument, warn};

use crate::config::ImportConfig;
use crate::domain::{DomainError, NoteTree};
use crate::infrastructure::error::ImportError;

const CONTENT_COLUMNS: [&str; 2] = ["html_content", "rtf_content"];

#[derive(Debug)]
struct NoteRow {
    id: i64,
    parent_id: Option<i64>,
    title: Option<String>,
    content: Option<String>,
}

/// Opens `path` read-only and imports its outline.
#[instrument(level = "debug", skip(options))]
pub fn import(path: &Path, options: &ImportConfig) -> Result<NoteTree, ImportError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    read(&conn, options)
}

/// Imports the outline stored in an open NoteCase database.
pub fn read(conn: &Connection, options: &ImportConfig) -> Result<NoteTree, ImportError> {
    let has_nodes: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'nodes')",
        [],
        |row| row.get(0),
    )?;
    if !has_nodes {
        return Err(ImportError::MissingTable);
    }

    let rows = fetch_rows(conn)?;
    if rows.is_empty() {
        return Err(ImportError::EmptyDatabase);
    }
    debug!("read {} rows", rows.len());

    build_tree(rows, options)
}

fn fetch_rows(conn: &Connection) -> Result<Vec<NoteRow>, ImportError> {
    let mut last_error = None;
    for column in CONTENT_COLUMNS {
        match fetch_rows_with(conn, column) {
            Ok(rows) => return Ok(rows),
            Err(e) => {
                debug!("content column {column} unusable: {e}");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) => Err(ImportError::MissingColumns(e)),
        None => Err(ImportError::EmptyDatabase),
    }
}

fn fetch_rows_with(conn: &Connection, content_column: &str) -> rusqlite::Result<Vec<NoteRow>> {
    let sql = format!(
        "SELECT id, parent_id, title, {content_column} FROM nodes ORDER BY parent_id, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(NoteRow {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            title: value_to_text(row.get(2)?),
            content: value_to_text(row.get(3)?),
        })
    })?;
    rows.collect()
}

/// Renders any SQLite value as text; NULL stays absent.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    }
}

/// Links rows by `parent_id`; rows without a known parent go under the root.
///
/// When several rows share an id, the last one in query order wins.
fn build_tree(rows: Vec<NoteRow>, options: &ImportConfig) -> Result<NoteTree, ImportError> {
    let mut tree = NoteTree::new(options.notecase_root.as_str(), "");
    let root = tree.root();

    let mut latest = HashMap::with_capacity(rows.len());
    for (position, row) in rows.iter().enumerate() {
        if latest.insert(row.id, position).is_some() {
            warn!("duplicate row id {}, keeping the later row", row.id);
        }
    }

    let mut by_id = HashMap::with_capacity(latest.len());
    let mut pending = Vec::with_capacity(latest.len());
    for (position, row) in rows.into_iter().enumerate() {
        if latest.get(&row.id) != Some(&position) {
            continue;
        }
        let title = row
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| options.untitled.clone());
        let node = tree.create_node(title, row.content.unwrap_or_default());
        by_id.insert(row.id, node);
        pending.push((row.id, row.parent_id, node));
    }

    for (id, parent_id, node) in pending {
        let parent = parent_id
            .and_then(|p| by_id.get(&p).copied())
            .unwrap_or(root);
        match tree.add_child(parent, node) {
            Ok(()) => {}
            Err(DomainError::CycleDetected { .. }) => {
                warn!("row {id} is part of a parent cycle, attaching it to the root");
                tree.add_child(root, node)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(tree)
}
