/*
Rendering lives in a trait so the domain types stay free of display concerns.
 */
use std::collections::HashMap;

use termtree::Tree;
use tracing::instrument;

use crate::domain::{NodeId, NoteTree};

const PREVIEW_CHARS: usize = 40;

pub trait TreeNodeConvert {
    /// Labels are node names.
    fn to_tree_string(&self) -> Tree<String>;

    /// Labels are `name: first line of content`, shortened.
    fn to_tree_string_with_content(&self) -> Tree<String>;
}

impl TreeNodeConvert for NoteTree {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        build_tree(self, |tree, id| {
            tree.get(id).map(|n| n.name.clone()).unwrap_or_default()
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn to_tree_string_with_content(&self) -> Tree<String> {
        build_tree(self, |tree, id| match tree.get(id) {
            Some(node) if node.content.is_empty() => node.name.clone(),
            Some(node) => format!("{}: {}", node.name, preview(&node.content)),
            None => String::new(),
        })
    }
}

/// Builds bottom-up from a pre-order listing, so deep trees need no recursion.
fn build_tree(tree: &NoteTree, label: impl Fn(&NoteTree, NodeId) -> String) -> Tree<String> {
    let order: Vec<NodeId> = tree.iter().map(|(id, _)| id).collect();
    let mut built: Vec<Option<Tree<String>>> = Vec::with_capacity(order.len());
    let position: HashMap<NodeId, usize> =
        order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    for id in &order {
        built.push(Some(Tree::new(label(tree, *id))));
    }
    for (i, id) in order.iter().enumerate().rev() {
        let leaves: Vec<Tree<String>> = tree
            .children(*id)
            .iter()
            .filter_map(|child| position.get(child).and_then(|&p| built[p].take()))
            .collect();
        if let Some(node) = built[i].as_mut() {
            node.leaves = leaves;
        }
    }

    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| Tree::new("Empty tree".to_string()))
}

fn preview(content: &str) -> String {
    let line = content.lines().next().unwrap_or_default();
    let mut short: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS || content.lines().nth(1).is_some() {
        short.push_str("...");
    }
    short
}
