//! Depth-first walk over `{..., children: [...]}` trees and its printer.

use std::io::{self, Write};

use beehive_util::{StyleEngine, multi_get_text};
use serde_json::Value;

pub const DEFAULT_CHILDREN_KEY: &str = "children";

/// Styling hints for one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeHint<'a> {
    /// `state`, or else `status`, of the node.
    pub state: Option<&'a str>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeItem<'a> {
    pub depth: usize,
    pub node: &'a Value,
    pub hint: TreeHint<'a>,
}

/// Pre-order iterator over a tree, or a forest when the root is an array.
#[derive(Debug, Clone)]
pub struct TreeWalk<'a> {
    stack: Vec<(usize, &'a Value)>,
    children_key: &'a str,
}

impl<'a> TreeWalk<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self::with_children_key(root, DEFAULT_CHILDREN_KEY)
    }

    pub fn with_children_key(root: &'a Value, children_key: &'a str) -> Self {
        let stack = match root {
            Value::Array(roots) => roots.iter().rev().map(|node| (0, node)).collect(),
            Value::Null => Vec::new(),
            node => vec![(0, node)],
        };
        Self { stack, children_key }
    }
}

impl<'a> Iterator for TreeWalk<'a> {
    type Item = TreeItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        if let Some(Value::Array(children)) = node.get(self.children_key) {
            self.stack.extend(children.iter().rev().map(|child| (depth + 1, child)));
        }
        let state = node
            .get("state")
            .or_else(|| node.get("status"))
            .and_then(Value::as_str);
        Some(TreeItem {
            depth,
            node,
            hint: TreeHint { state },
        })
    }
}

/// Print one line per node: indentation, an arrow below the roots, the label
/// fields and the coloured state.
pub fn emit_tree(walk: TreeWalk<'_>, label_fields: &[&str], style: &StyleEngine, out: &mut dyn Write) -> io::Result<()> {
    for item in walk {
        let indent = "   ".repeat(item.depth.saturating_sub(1));
        let arrow = if item.depth == 0 { "" } else { "└─ " };
        let label = label_fields
            .iter()
            .map(|field| multi_get_text(item.node, field))
            .collect::<Vec<_>>()
            .join(" ");
        match item.hint.state {
            Some(state) => writeln!(out, "{indent}{arrow}{label} ({})", style.color_error(state))?,
            None => writeln!(out, "{indent}{arrow}{label}")?,
        }
    }
    Ok(())
}
