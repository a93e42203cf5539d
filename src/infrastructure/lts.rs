//! LTS binary tree format
//!
//! ```text
//! magic:   "LTS1"
//! record:  name_len u32 | name utf-8 | content_len u32 | content utf-8
//!          | child_count u32 | child_count x record
//! ```
//!
//! Integers are big-endian, lengths count UTF-8 bytes, records are laid out
//! depth-first in pre-order. There are no end markers.
//!
//! Both directions walk the tree with an explicit stack, so nesting depth is
//! bounded by memory rather than by the call stack.

use std::io::{self, Read, Write};

use tracing::{debug, instrument};

use crate::domain::NoteTree;
use crate::infrastructure::error::{DecodeError, Field, FormatError};

pub const MAGIC: &[u8; 4] = b"LTS1";

/// Writes `tree` in LTS format.
#[instrument(level = "debug", skip_all)]
pub fn encode<W: Write>(tree: &NoteTree, out: &mut W) -> io::Result<()> {
    out.write_all(MAGIC)?;

    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let node = tree
            .node(id)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_string(out, &node.name, "node name")?;
        write_string(out, &node.content, "node content")?;
        write_len(out, node.children().len(), "number of children")?;
        // reversed so the first child is written next
        stack.extend(node.children().iter().rev());
    }
    Ok(())
}

pub fn encode_to_vec(tree: &NoteTree) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode(tree, &mut buf)?;
    Ok(buf)
}

fn write_string<W: Write>(out: &mut W, text: &str, what: &str) -> io::Result<()> {
    write_len(out, text.len(), what)?;
    out.write_all(text.as_bytes())
}

fn write_len<W: Write>(out: &mut W, len: usize, what: &str) -> io::Result<()> {
    let len = u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} too large for LTS: {len} exceeds {}", u32::MAX),
        )
    })?;
    out.write_all(&len.to_be_bytes())
}

/// Reads one LTS document.
///
/// Child counts fully determine where the document ends; anything after
/// the root record is drained and ignored. On failure no tree is returned.
#[instrument(level = "debug", skip_all)]
pub fn decode<R: Read>(input: &mut R) -> Result<NoteTree, DecodeError> {
    let mut magic = Vec::with_capacity(MAGIC.len());
    input.by_ref().take(MAGIC.len() as u64).read_to_end(&mut magic)?;
    if magic.as_slice() != &MAGIC[..] {
        return Err(FormatError::BadMagic { found: magic }.into());
    }

    let header = read_header(input)?;
    let mut tree = NoteTree::new(header.name, header.content);

    // (node, children still to read)
    let mut stack = vec![(tree.root(), header.child_count)];
    while let Some((parent, remaining)) = stack.last_mut() {
        if *remaining == 0 {
            stack.pop();
            continue;
        }
        *remaining -= 1;
        let parent = *parent;

        let header = read_header(input)?;
        let child = tree.create_node(header.name, header.content);
        tree.attach_fresh(parent, child);
        stack.push((child, header.child_count));
    }

    let trailing = io::copy(input, &mut io::sink())?;
    if trailing > 0 {
        debug!("ignoring {trailing} bytes after the root record");
    }

    debug!("decoded {} nodes", tree.node_count());
    Ok(tree)
}

pub fn decode_slice(bytes: &[u8]) -> Result<NoteTree, DecodeError> {
    let mut reader = bytes;
    decode(&mut reader)
}

struct RecordHeader {
    name: String,
    content: String,
    child_count: u32,
}

fn read_header<R: Read>(input: &mut R) -> Result<RecordHeader, DecodeError> {
    let name = read_string(input, Field::NameLength, Field::NameData)?;
    let content = read_string(input, Field::ContentLength, Field::ContentData)?;
    let child_count = read_u32(input, Field::ChildCount)?;
    Ok(RecordHeader {
        name,
        content,
        child_count,
    })
}

fn read_u32<R: Read>(input: &mut R, field: Field) -> Result<u32, DecodeError> {
    let mut buf = Vec::with_capacity(4);
    input.by_ref().take(4).read_to_end(&mut buf)?;
    let bytes: [u8; 4] = buf.as_slice().try_into().map_err(|_| FormatError::Truncated {
        field,
        expected: 4,
        actual: buf.len() as u64,
    })?;
    Ok(u32::from_be_bytes(bytes))
}

fn read_string<R: Read>(input: &mut R, len_field: Field, data_field: Field) -> Result<String, DecodeError> {
    let expected = u64::from(read_u32(input, len_field)?);

    // grows with the data actually present, never sized from the prefix
    let mut bytes = Vec::new();
    input.by_ref().take(expected).read_to_end(&mut bytes)?;
    let actual = bytes.len() as u64;
    if actual < expected {
        return Err(FormatError::Truncated {
            field: data_field,
            expected,
            actual,
        }
        .into());
    }

    String::from_utf8(bytes).map_err(|source| {
        FormatError::InvalidUtf8 {
            field: data_field,
            source,
        }
        .into()
    })
}
