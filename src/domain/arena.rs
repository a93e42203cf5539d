use generational_arena::{Arena, Index};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::record::NodeRecord;

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

fn next_tree_id() -> u64 {
    NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle of a node inside its [`NoteTree`].
///
/// Handles are generational: once a node is removed its handle stops
/// resolving, even if the slot is reused. A handle only resolves in the
/// tree that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    tree: u64,
    index: Index,
}

impl NodeId {
    fn rebind(self, tree: u64) -> Self {
        Self { tree, ..self }
    }
}

/// A named, text-bearing note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub content: String,
    /// Non-owning back-reference, None for the root and for detached nodes
    parent: Option<NodeId>,
    /// Owned children in display and serialization order
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Arena-based note tree.
///
/// All nodes of one document live in a single generational arena; links
/// between them are indices, so the parent back-reference never owns
/// anything. A tree always has a root. Nodes created with
/// [`NoteTree::create_node`] stay detached until attached with
/// [`NoteTree::add_child`].
#[derive(Debug)]
pub struct NoteTree {
    /// Stamped into every [`NodeId`] this tree hands out
    id: u64,
    arena: Arena<Node>,
    root: NodeId,
}

impl NoteTree {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let id = next_tree_id();
        let mut arena = Arena::new();
        let root = NodeId {
            tree: id,
            index: arena.insert(Node::new(name, content)),
        };
        Self { id, arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Arena slot of `id`, if the handle was issued by this tree.
    fn slot_of(&self, id: NodeId) -> Option<Index> {
        (id.tree == self.id).then_some(id.index)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slot_of(id).and_then(|index| self.arena.get(index))
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let index = self.slot_of(id)?;
        self.arena.get_mut(index)
    }

    /// Like [`NoteTree::get`], but a missing node is an error.
    pub fn node(&self, id: NodeId) -> DomainResult<&Node> {
        self.get(id).ok_or(DomainError::NodeNotFound(id))
    }

    /// Mutable access to a node's name and content.
    pub fn node_mut(&mut self, id: NodeId) -> DomainResult<&mut Node> {
        self.get_mut(id).ok_or(DomainError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of `id`; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Index of `id` within its parent's children.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Creates a detached node. It is not part of the tree until attached.
    #[instrument(level = "trace", skip(self, name, content))]
    pub fn create_node(&mut self, name: impl Into<String>, content: impl Into<String>) -> NodeId {
        NodeId {
            tree: self.id,
            index: self.arena.insert(Node::new(name, content)),
        }
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// A child that is still attached elsewhere is detached first.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> DomainResult<()> {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Inserts `child` under `parent` at `index` (clamped to the end).
    ///
    /// `child` is detached from its current parent before `index` is
    /// applied. Attaching the root, or attaching a node below itself, is
    /// rejected and leaves the tree untouched.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> DomainResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root {
            return Err(DomainError::RootNotMovable);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(DomainError::CycleDetected {
                node: child,
                parent,
            });
        }

        self.detach(child)?;

        let parent_node = self.node_mut(parent)?;
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Severs the link between `parent` and `child` in both directions.
    ///
    /// Returns `false` when `child` is not a child of `parent`.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomainResult<bool> {
        self.node(child)?;
        let parent_node = self.node_mut(parent)?;
        match parent_node.children.iter().position(|&c| c == child) {
            Some(pos) => {
                parent_node.children.remove(pos);
                self.node_mut(child)?.parent = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Swaps two children of `parent` by index.
    pub(crate) fn swap_children(&mut self, parent: NodeId, a: usize, b: usize) -> DomainResult<()> {
        self.node_mut(parent)?.children.swap(a, b);
        Ok(())
    }

    /// Detaches `id` from its parent, if it has one.
    pub fn detach(&mut self, id: NodeId) -> DomainResult<bool> {
        match self.node(id)?.parent {
            Some(parent) => self.remove_child(parent, id),
            None => Ok(false),
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Frees `id` and its whole subtree from the arena.
    ///
    /// The caller detaches `id` first; handles into the subtree go stale.
    pub(crate) fn purge(&mut self, id: NodeId) {
        let doomed: Vec<NodeId> = self.descendants(id).map(|(idx, _)| idx).collect();
        for idx in doomed {
            self.arena.remove(idx.index);
        }
    }

    /// Number of nodes reachable from the root, root included.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Number of levels, 1 for a lone root.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self.root, 1usize)];
        while let Some((id, level)) = stack.pop() {
            max = max.max(level);
            for &child in self.children(id) {
                stack.push((child, level + 1));
            }
        }
        max
    }

    /// Pre-order traversal from the root.
    pub fn iter(&self) -> PreOrderIter<'_> {
        self.descendants(self.root)
    }

    /// Pre-order traversal of the subtree rooted at `id`, `id` included.
    pub fn descendants(&self, id: NodeId) -> PreOrderIter<'_> {
        PreOrderIter::new(self, id)
    }

    /// Follows child indices from the root.
    pub fn resolve(&self, path: &[usize]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root, |id, &i| self.children(id).get(i).copied())
    }

    /// Child indices leading from the topmost ancestor of `id` down to `id`.
    pub fn path_of(&self, id: NodeId) -> DomainResult<Vec<usize>> {
        self.node(id)?;
        let mut path = Vec::new();
        let mut current = id;
        while let Some(pos) = self.position(current) {
            path.push(pos);
            current = self.parent(current).ok_or(DomainError::NodeNotFound(current))?;
        }
        path.reverse();
        Ok(path)
    }

    /// Owned snapshot of the whole tree.
    pub fn to_record(&self) -> NodeRecord {
        // the root always exists
        self.record_of(self.root).unwrap_or_default()
    }

    /// Owned snapshot of the subtree rooted at `id`.
    pub fn record_of(&self, id: NodeId) -> DomainResult<NodeRecord> {
        let node = self.node(id)?;
        let mut stack = vec![(id, NodeRecord::new(&node.name, &node.content), 0usize)];

        loop {
            let Some((current, _, cursor)) = stack.last_mut() else {
                return Err(DomainError::NodeNotFound(id));
            };
            let next = self.children(*current).get(*cursor).copied();
            *cursor += 1;

            match next {
                Some(child) => {
                    let node = self.node(child)?;
                    stack.push((child, NodeRecord::new(&node.name, &node.content), 0));
                }
                None => {
                    let (_, finished, _) = stack.pop().ok_or(DomainError::NodeNotFound(id))?;
                    match stack.last_mut() {
                        Some((_, parent, _)) => parent.children.push(finished),
                        None => return Ok(finished),
                    }
                }
            }
        }
    }

    /// Builds a tree from an owned snapshot, preserving child order.
    pub fn from_record(record: &NodeRecord) -> Self {
        let mut tree = Self::new(record.name.as_str(), record.content.as_str());
        let root = tree.root;
        tree.graft_children(root, record);
        tree
    }

    /// Appends a copy of `record` under `parent`.
    pub fn graft_record(&mut self, parent: NodeId, record: &NodeRecord) -> DomainResult<NodeId> {
        self.node(parent)?;
        let id = self.create_node(record.name.as_str(), record.content.as_str());
        self.add_child(parent, id)?;
        self.graft_children(id, record);
        Ok(id)
    }

    fn graft_children(&mut self, id: NodeId, record: &NodeRecord) {
        let mut stack: Vec<(&NodeRecord, NodeId)> =
            record.children.iter().rev().map(|c| (c, id)).collect();
        while let Some((rec, parent)) = stack.pop() {
            let child = self.create_node(rec.name.as_str(), rec.content.as_str());
            self.attach_fresh(parent, child);
            stack.extend(rec.children.iter().rev().map(|c| (c, child)));
        }
    }

    /// Links a node that was just created; skips the cycle checks.
    pub(crate) fn attach_fresh(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p) = self.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Compares names, content and child order of two subtrees.
    pub fn subtree_eq(&self, id: NodeId, other: &NoteTree, other_id: NodeId) -> bool {
        let mut stack = vec![(id, other_id)];
        while let Some((a, b)) = stack.pop() {
            let (Some(left), Some(right)) = (self.get(a), other.get(b)) else {
                return false;
            };
            if left.name != right.name
                || left.content != right.content
                || left.children.len() != right.children.len()
            {
                return false;
            }
            stack.extend(left.children.iter().copied().zip(right.children.iter().copied()));
        }
        true
    }
}

/// A clone is a separate tree: handles of the original do not resolve in it.
impl Clone for NoteTree {
    fn clone(&self) -> Self {
        let id = next_tree_id();
        let mut arena = self.arena.clone();
        for (_, node) in arena.iter_mut() {
            node.parent = node.parent.map(|p| p.rebind(id));
            for child in &mut node.children {
                *child = child.rebind(id);
            }
        }
        Self {
            id,
            arena,
            root: self.root.rebind(id),
        }
    }
}

impl PartialEq for NoteTree {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

impl Eq for NoteTree {}

pub struct PreOrderIter<'a> {
    tree: &'a NoteTree,
    stack: Vec<NodeId>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a NoteTree, start: NodeId) -> Self {
        let stack = if tree.contains(start) {
            vec![start]
        } else {
            Vec::new()
        };
        Self { tree, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev());
                return Some((current, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (NoteTree, NodeId, NodeId, NodeId) {
        let mut tree = NoteTree::new("R", "");
        let root = tree.root();
        let a = tree.create_node("A", "x");
        let b = tree.create_node("B", "y");
        let c = tree.create_node("C", "z");
        tree.add_child(root, a).unwrap();
        tree.add_child(root, b).unwrap();
        tree.add_child(a, c).unwrap();
        (tree, a, b, c)
    }

    #[test]
    fn given_attached_nodes_then_parent_links_match_children() {
        let (tree, a, b, c) = sample();
        for (id, node) in tree.iter() {
            for &child in node.children() {
                assert_eq!(tree.parent(child), Some(id));
            }
        }
        assert_eq!(tree.position(b), Some(1));
        assert_eq!(tree.parent(c), Some(a));
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn given_attached_child_when_added_elsewhere_then_detaches_first() {
        let (mut tree, a, b, c) = sample();

        tree.add_child(b, c).unwrap();

        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), &[c]);
        assert_eq!(tree.parent(c), Some(b));
    }

    #[test]
    fn given_node_when_attached_below_itself_then_rejects_cycle() {
        let (mut tree, a, _, c) = sample();

        let err = tree.add_child(c, a).unwrap_err();

        assert_eq!(err, DomainError::CycleDetected { node: a, parent: c });
        assert_eq!(tree.parent(a), Some(tree.root()));
        assert_eq!(tree.parent(c), Some(a));
    }

    #[test]
    fn given_root_when_attached_then_rejects() {
        let (mut tree, _, _, _) = sample();
        let loose = tree.create_node("loose", "");
        let root = tree.root();

        assert_eq!(tree.add_child(loose, root), Err(DomainError::RootNotMovable));
    }

    #[test]
    fn given_child_when_removed_then_both_links_are_severed() {
        let (mut tree, a, _, c) = sample();

        assert!(tree.remove_child(a, c).unwrap());

        assert!(tree.children(a).is_empty());
        assert_eq!(tree.parent(c), None);
        assert!(!tree.remove_child(a, c).unwrap());
    }

    #[test]
    fn given_paths_then_resolve_and_path_of_agree() {
        let (tree, a, b, c) = sample();
        assert_eq!(tree.resolve(&[]), Some(tree.root()));
        assert_eq!(tree.resolve(&[0, 0]), Some(c));
        assert_eq!(tree.resolve(&[1, 0]), None);
        assert_eq!(tree.path_of(b).unwrap(), vec![1]);
        assert_eq!(tree.path_of(c).unwrap(), vec![0, 0]);
        assert_eq!(tree.path_of(a).unwrap(), vec![0]);
    }

    #[test]
    fn given_tree_when_converted_to_record_and_back_then_equal() {
        let (tree, _, _, _) = sample();
        let record = tree.to_record();

        assert_eq!(record.children.len(), 2);
        assert_eq!(record.children[0].children[0].name, "C");
        assert_eq!(NoteTree::from_record(&record), tree);
    }

    #[test]
    fn given_handle_of_fresh_tree_when_used_elsewhere_then_not_found() {
        let (tree, _, _, _) = sample();
        let other = NoteTree::new("other", "");

        assert!(!tree.contains(other.root()));
        assert!(tree.get(other.root()).is_none());
        assert_eq!(tree.children(other.root()), &[] as &[NodeId]);
    }

    #[test]
    fn given_cloned_tree_then_original_handles_do_not_resolve() {
        let (tree, a, _, c) = sample();
        let copy = tree.clone();

        assert_eq!(copy, tree);
        assert!(!copy.contains(a));
        let copied_a = copy.resolve(&[0]).unwrap();
        assert_eq!(copy.children(copied_a), &[copy.resolve(&[0, 0]).unwrap()]);
        assert_eq!(copy.parent(copied_a), Some(copy.root()));
        assert!(tree.contains(c));
    }

    #[test]
    fn given_purged_subtree_then_handles_go_stale() {
        let (mut tree, a, _, c) = sample();
        tree.detach(a).unwrap();
        tree.purge(a);

        assert!(!tree.contains(a));
        assert!(!tree.contains(c));
        assert!(matches!(tree.node(c), Err(DomainError::NodeNotFound(_))));
        assert_eq!(tree.node_count(), 2);
    }
}
