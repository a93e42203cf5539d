//! CherryTree (`.ctd`) importer.
//!
//! Only the outline is read: every `node` element directly below the
//! document element or below another `node` becomes a note. The note name
//! is the `name` attribute; the content is the `rich_text` attribute or,
//! when that is empty, the text of the first `rich_text` child element.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, instrument};

use crate::config::ImportConfig;
use crate::domain::{NodeId, NoteTree};
use crate::infrastructure::error::ImportError;

/// Open element, innermost last.
enum Frame {
    Document,
    Node { id: NodeId, wants_text: bool },
    RichText { id: NodeId, collecting: bool },
    Other,
}

/// Parses a CherryTree XML document into a tree under a synthetic root.
#[instrument(level = "debug", skip_all)]
pub fn parse(xml: &str, options: &ImportConfig) -> Result<NoteTree, ImportError> {
    let mut reader = Reader::from_str(xml);
    let mut tree = NoteTree::new(options.cherrytree_root.as_str(), "");
    let mut stack: Vec<Frame> = Vec::new();
    let mut seen_document = false;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => {
                let frame = enter(&mut tree, &mut stack, &e, &mut seen_document, options)?;
                stack.push(frame);
            }
            Event::Empty(e) => {
                enter(&mut tree, &mut stack, &e, &mut seen_document, options)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                if let Some(Frame::RichText { id, collecting: true }) = stack.last() {
                    let text = t.unescape().map_err(xml_err)?;
                    tree.node_mut(*id)?.content.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(Frame::RichText { id, collecting: true }) = stack.last() {
                    let raw = c.into_inner();
                    tree.node_mut(*id)?.content.push_str(&String::from_utf8_lossy(&raw));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_document {
        return Err(ImportError::Xml("no root element found".to_string()));
    }
    if !stack.is_empty() {
        return Err(ImportError::Xml("unexpected end of document".to_string()));
    }

    debug!("imported {} nodes", tree.node_count() - 1);
    Ok(tree)
}

/// Classifies a newly opened element, creating a note for `node` elements.
fn enter(
    tree: &mut NoteTree,
    stack: &mut [Frame],
    e: &BytesStart<'_>,
    seen_document: &mut bool,
    options: &ImportConfig,
) -> Result<Frame, ImportError> {
    let Some(top) = stack.last_mut() else {
        if *seen_document {
            return Err(ImportError::Xml("multiple root elements".to_string()));
        }
        *seen_document = true;
        return Ok(Frame::Document);
    };

    let parent = match top {
        Frame::Document => Some(tree.root()),
        Frame::Node { id, .. } => Some(*id),
        Frame::RichText { collecting, .. } => {
            // only the text before the first child element counts
            *collecting = false;
            None
        }
        Frame::Other => None,
    };

    match e.local_name().as_ref() {
        b"node" => {
            let Some(parent) = parent else {
                return Ok(Frame::Other);
            };
            let name = attribute(e, "name")?.unwrap_or_else(|| options.untitled.clone());
            let content = attribute(e, "rich_text")?.unwrap_or_default();
            let wants_text = content.is_empty();
            let id = tree.add_node(parent, &name, &content)?;
            Ok(Frame::Node { id, wants_text })
        }
        b"rich_text" => match top {
            Frame::Node { id, wants_text } if *wants_text => {
                *wants_text = false;
                Ok(Frame::RichText {
                    id: *id,
                    collecting: true,
                })
            }
            _ => Ok(Frame::Other),
        },
        _ => Ok(Frame::Other),
    }
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, ImportError> {
    match e.try_get_attribute(key).map_err(xml_err)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(xml_err)?.into_owned())),
        None => Ok(None),
    }
}

fn xml_err(e: impl std::fmt::Display) -> ImportError {
    ImportError::Xml(e.to_string())
}
