//! Structural edits on a [`NoteTree`].
//!
//! Every operation validates its node arguments before touching the tree,
//! so a rejected call performs no partial mutation. Edits at boundary
//! positions (first/last child, root) are no-ops reported by returning
//! `false`, not errors.

use tracing::{debug, instrument};

use crate::domain::arena::{NodeId, NoteTree};
use crate::domain::error::DomainResult;

impl NoteTree {
    /// Appends a new node as the last child of `parent`.
    #[instrument(level = "debug", skip(self, content))]
    pub fn add_node(&mut self, parent: NodeId, name: &str, content: &str) -> DomainResult<NodeId> {
        self.node(parent)?;
        let id = self.create_node(name, content);
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Detaches `node` and frees its subtree. The root is left in place.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, node: NodeId) -> DomainResult<bool> {
        self.node(node)?;
        if node == self.root() {
            debug!("remove_node: root stays");
            return Ok(false);
        }
        self.detach(node)?;
        self.purge(node);
        Ok(true)
    }

    /// Swaps `node` with its previous sibling.
    #[instrument(level = "debug", skip(self))]
    pub fn move_up(&mut self, node: NodeId) -> DomainResult<bool> {
        let Some((parent, index)) = self.slot(node)? else {
            debug!("move_up: no parent");
            return Ok(false);
        };
        if index == 0 {
            debug!("move_up: already first");
            return Ok(false);
        }
        self.swap_children(parent, index, index - 1)?;
        Ok(true)
    }

    /// Swaps `node` with its next sibling.
    #[instrument(level = "debug", skip(self))]
    pub fn move_down(&mut self, node: NodeId) -> DomainResult<bool> {
        let Some((parent, index)) = self.slot(node)? else {
            debug!("move_down: no parent");
            return Ok(false);
        };
        if index + 1 >= self.children(parent).len() {
            debug!("move_down: already last");
            return Ok(false);
        }
        self.swap_children(parent, index, index + 1)?;
        Ok(true)
    }

    /// Makes `node` the last child of its preceding sibling.
    #[instrument(level = "debug", skip(self))]
    pub fn indent(&mut self, node: NodeId) -> DomainResult<bool> {
        let Some((parent, index)) = self.slot(node)? else {
            debug!("indent: no parent");
            return Ok(false);
        };
        if index == 0 {
            debug!("indent: no preceding sibling");
            return Ok(false);
        }
        let previous = self.children(parent)[index - 1];
        self.add_child(previous, node)?;
        Ok(true)
    }

    /// Moves `node` up one level, right after its former parent.
    #[instrument(level = "debug", skip(self))]
    pub fn outdent(&mut self, node: NodeId) -> DomainResult<bool> {
        let Some((parent, _)) = self.slot(node)? else {
            debug!("outdent: no parent");
            return Ok(false);
        };
        let Some((grandparent, parent_index)) = self.slot(parent)? else {
            debug!("outdent: no grandparent");
            return Ok(false);
        };
        self.insert_child(grandparent, parent_index + 1, node)?;
        Ok(true)
    }

    /// Appends deep copies of every child of `source_root` under `base`.
    ///
    /// `source` is only read; the copies share nothing with it.
    #[instrument(level = "debug", skip(self, source))]
    pub fn merge(
        &mut self,
        base: NodeId,
        source: &NoteTree,
        source_root: NodeId,
    ) -> DomainResult<Vec<NodeId>> {
        self.node(base)?;
        source.node(source_root)?;
        let copies = source
            .children(source_root)
            .iter()
            .map(|&child| self.import_subtree(base, source, child))
            .collect::<DomainResult<Vec<_>>>()?;
        debug!("merge: copied {} subtrees", copies.len());
        Ok(copies)
    }

    /// [`NoteTree::merge`] with a source subtree from this same tree.
    pub fn merge_local(&mut self, base: NodeId, source_root: NodeId) -> DomainResult<Vec<NodeId>> {
        self.node(base)?;
        let snapshot = self.extract(source_root)?;
        self.merge(base, &snapshot, snapshot.root())
    }

    /// Appends a deep copy of `source_node` and its subtree under `parent`.
    pub fn import_subtree(
        &mut self,
        parent: NodeId,
        source: &NoteTree,
        source_node: NodeId,
    ) -> DomainResult<NodeId> {
        self.node(parent)?;
        let top = source.node(source_node)?;
        let copy = self.create_node(top.name.clone(), top.content.clone());
        self.add_child(parent, copy)?;

        let mut stack: Vec<(NodeId, NodeId)> = top
            .children()
            .iter()
            .rev()
            .map(|&c| (c, copy))
            .collect();
        while let Some((src, dest_parent)) = stack.pop() {
            let node = source.node(src)?;
            let id = self.create_node(node.name.clone(), node.content.clone());
            self.add_child(dest_parent, id)?;
            stack.extend(node.children().iter().rev().map(|&c| (c, id)));
        }
        Ok(copy)
    }

    /// Independent tree holding a copy of the subtree rooted at `node`.
    pub fn extract(&self, node: NodeId) -> DomainResult<NoteTree> {
        let top = self.node(node)?;
        let mut tree = NoteTree::new(top.name.clone(), top.content.clone());
        let root = tree.root();
        for &child in top.children() {
            tree.import_subtree(root, self, child)?;
        }
        Ok(tree)
    }

    /// Parent and index of `node`, or None when it has no parent.
    fn slot(&self, node: NodeId) -> DomainResult<Option<(NodeId, usize)>> {
        let Some(parent) = self.node(node)?.parent() else {
            return Ok(None);
        };
        Ok(self.position(node).map(|index| (parent, index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::NodeRecord;

    fn names(tree: &NoteTree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .iter()
            .map(|&c| tree.node(c).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn given_siblings_when_moving_down_then_swaps_with_next() {
        let mut tree = NoteTree::new("root", "");
        let root = tree.root();
        let a = tree.add_node(root, "a", "").unwrap();
        tree.add_node(root, "b", "").unwrap();

        assert!(tree.move_down(a).unwrap());

        assert_eq!(names(&tree, root), ["b", "a"]);
        assert_eq!(tree.position(a), Some(1));
    }

    #[test]
    fn given_subtree_when_extracted_then_copy_matches_record() {
        let tree = NoteTree::from_record(
            &NodeRecord::new("r", "").with_children(vec![
                NodeRecord::new("a", "1").with_children(vec![NodeRecord::new("a1", "2")]),
            ]),
        );
        let a = tree.resolve(&[0]).unwrap();

        let extracted = tree.extract(a).unwrap();

        assert_eq!(
            extracted.to_record(),
            NodeRecord::new("a", "1").with_children(vec![NodeRecord::new("a1", "2")])
        );
    }
}
