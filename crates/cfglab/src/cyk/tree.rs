//! Index-based storage for parse trees.

use crate::util::{display_fn, write_joined};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeID(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    pub children: Vec<NodeID>,
}

/// Nodes may be shared between trees; the arena owns all of them.
#[derive(Debug, Clone, Default)]
pub struct TreeArena {
    nodes: Vec<TreeNode>,
}

impl TreeArena {
    pub fn leaf(&mut self, label: &str) -> NodeID {
        self.node(label, vec![])
    }

    pub fn node(&mut self, label: &str, children: Vec<NodeID>) -> NodeID {
        let id = NodeID(self.nodes.len());
        self.nodes.push(TreeNode {
            label: label.to_owned(),
            children,
        });
        id
    }

    pub fn get(&self, id: NodeID) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bracket notation: a leaf prints its label, an inner node prints
    /// `(label child...)`.
    pub fn display(&self, id: NodeID) -> impl fmt::Display + '_ {
        display_fn(move |f| self.write_bracketed(f, id))
    }

    fn write_bracketed(&self, f: &mut fmt::Formatter<'_>, id: NodeID) -> fmt::Result {
        let node = self.get(id);
        if node.children.is_empty() {
            return f.write_str(&node.label);
        }
        write!(f, "({} ", node.label)?;
        for (i, child) in node.children.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            self.write_bracketed(f, *child)?;
        }
        f.write_str(")")
    }
}

/// A bounded set of parse trees extracted from a forest.
#[derive(Debug, Clone, Default)]
pub struct ParseTrees {
    pub arena: TreeArena,
    pub roots: Vec<NodeID>,
}

impl ParseTrees {
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn render(&self) -> Vec<String> {
        self.roots
            .iter()
            .map(|root| self.arena.display(*root).to_string())
            .collect()
    }
}

impl fmt::Display for ParseTrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, "\n", self.roots.iter().map(|root| self.arena.display(*root)))
    }
}
