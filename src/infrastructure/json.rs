//! JSON document layout: `{"name", "content", "children": [...]}`.
//!
//! Neither direction has a nesting limit: the parser's depth check is off
//! and both directions grow the stack on demand, so any tree
//! [`encode_to_vec`] writes loads back.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{NodeRecord, NoteTree};

#[instrument(level = "debug", skip(tree))]
pub fn encode_to_vec(tree: &NoteTree, pretty: bool) -> serde_json::Result<Vec<u8>> {
    let record = tree.to_record();
    let mut buf = Vec::new();
    if pretty {
        let mut ser = serde_json::Serializer::pretty(&mut buf);
        record.serialize(serde_stacker::Serializer::new(&mut ser))?;
    } else {
        let mut ser = serde_json::Serializer::new(&mut buf);
        record.serialize(serde_stacker::Serializer::new(&mut ser))?;
    }
    Ok(buf)
}

#[instrument(level = "debug", skip_all)]
pub fn decode_slice(bytes: &[u8]) -> serde_json::Result<NoteTree> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    de.disable_recursion_limit();
    let record = NodeRecord::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(NoteTree::from_record(&record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_missing_optional_fields_when_decoding_then_defaults_apply() {
        let tree = decode_slice(br#"{"name": "root", "children": [{"name": "a", "extra": 1}]}"#).unwrap();

        assert_eq!(
            tree.to_record(),
            NodeRecord::new("root", "").with_children(vec![NodeRecord::new("a", "")])
        );
    }

    #[test]
    fn given_text_after_document_when_decoding_then_fails() {
        assert!(decode_slice(br#"{"name": "root"} {"name": "again"}"#).is_err());
    }

    #[test]
    fn given_missing_name_when_decoding_then_fails() {
        assert!(decode_slice(br#"{"content": "x"}"#).is_err());
    }

    #[test]
    fn given_tree_when_pretty_encoding_then_uses_two_space_indent() {
        let tree = NoteTree::new("r", "c");
        let text = String::from_utf8(encode_to_vec(&tree, true).unwrap()).unwrap();
        assert!(text.contains("\n  \"name\": \"r\""));
    }
}
