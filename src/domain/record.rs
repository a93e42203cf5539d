//! Owned, recursive snapshot of a note subtree.

use serde::{Deserialize, Serialize};

/// `{name, content, children}` value tree.
///
/// This is the JSON document layout. Missing `content` and `children`
/// default to empty; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NodeRecord>) -> Self {
        self.children = children;
        self
    }
}

/// Flattens the subtree before freeing it; deep chains would otherwise
/// drop recursively.
impl Drop for NodeRecord {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut record) = pending.pop() {
            pending.append(&mut record.children);
        }
    }
}
