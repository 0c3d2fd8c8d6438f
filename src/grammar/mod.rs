// isacov - Coverage-guided test corpus generation from instruction set templates
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Grammar tree definitions.
//!
//! A [`Grammar`] is an arena of [`Node`]s addressed by [`NodeId`] handles.
//! The handle, not the node's content, is what the coverage strategy
//! tracks: two identical literals cloned from the same variable are two
//! different coverage targets.
//!
//! The arena only describes structure. What a node currently renders as
//! lives in a separate [`Selections`] table, see the [`selection`] module.

mod filter;
mod selection;

pub use filter::{apply_filters, BoundaryValueFilter, Filter};
pub use selection::{EntryId, Selections};

use std::collections::HashMap;
use std::fmt;

use crate::error::{CompileError, ErrorCode, GenerateError, Result, Span};

/// Opaque handle of a node inside a [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in its arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the generative grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Fixed text.
    Literal(String),
    /// An integer sampled from an inclusive range.
    IntRange {
        /// Smallest value.
        low: i128,
        /// Largest value.
        high: i128,
    },
    /// A label placeholder, later rewritten by the label post-processor.
    LabelPlaceholder,
    /// Exactly one child renders. Selectors are 1-based child indices.
    Choice(Vec<NodeId>),
    /// Every child renders, in order.
    Sequence(Vec<NodeId>),
    /// The child renders (selector 2) or nothing does (selector 1).
    Optional(NodeId),
    /// The child renders between `min` and `max` times.
    Repeat {
        /// The repeated body.
        child: NodeId,
        /// Mandatory repetitions.
        min: u32,
        /// Maximum repetitions.
        max: u32,
    },
    /// Transparent reference to another node.
    Indirection(NodeId),
}

impl Node {
    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Node::Literal(_) | Node::IntRange { .. } | Node::LabelPlaceholder
        )
    }

    /// All children of this node, in order.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Choice(children) | Node::Sequence(children) => children,
            Node::Optional(child) | Node::Repeat { child, .. } | Node::Indirection(child) => {
                std::slice::from_ref(child)
            }
            Node::Literal(_) | Node::IntRange { .. } | Node::LabelPlaceholder => &[],
        }
    }

    /// Number of distinct selectors this node accepts.
    pub fn selector_count(&self) -> u32 {
        match self {
            Node::Choice(children) => children.len() as u32,
            Node::Optional(_) => 2,
            Node::Repeat { min, max, .. } => max - min + 1,
            _ => 1,
        }
    }

    /// Children rendered for the given selector, in render order.
    ///
    /// A repeat body appears once per repetition.
    pub fn activated(&self, selector: u32) -> Vec<NodeId> {
        match self {
            Node::Choice(children) => children
                .get((selector as usize).wrapping_sub(1))
                .copied()
                .into_iter()
                .collect(),
            Node::Sequence(children) => children.clone(),
            Node::Optional(child) if selector == 2 => vec![*child],
            Node::Optional(_) => Vec::new(),
            Node::Repeat { child, min, .. } => vec![*child; (min + selector - 1) as usize],
            Node::Indirection(target) => vec![*target],
            Node::Literal(_) | Node::IntRange { .. } | Node::LabelPlaceholder => Vec::new(),
        }
    }
}

fn grammar_error(code: ErrorCode, message: impl Into<String>) -> CompileError {
    CompileError::new(code, message, Span::default())
}

/// An arena of grammar nodes with an optional root.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Grammar {
    /// Create an empty grammar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the arena, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node generation starts from.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Set the node generation starts from.
    pub fn set_root(&mut self, root: NodeId) -> Result<()> {
        self.check(root)?;
        self.root = Some(root);
        Ok(())
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Look up a node that the generator expects to exist.
    pub(crate) fn get(&self, id: NodeId) -> std::result::Result<&Node, GenerateError> {
        self.node(id)
            .ok_or_else(|| GenerateError::Internal(format!("dangling node handle {}", id)))
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(grammar_error(
                ErrorCode::UnknownNode,
                format!("node {} does not exist", id),
            ))
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Validate a node against this arena before it is stored.
    fn validate(&self, node: &Node) -> Result<()> {
        for child in node.children() {
            self.check(*child)?;
        }
        match node {
            Node::Choice(children) if children.is_empty() => Err(grammar_error(
                ErrorCode::EmptyChoice,
                "a choice needs at least one alternative",
            )),
            Node::IntRange { low, high } if low > high => Err(grammar_error(
                ErrorCode::InvalidRange,
                format!("integer range {}..={} is empty", low, high),
            )),
            Node::Repeat { min, max, .. } if min > max || *max == 0 => Err(grammar_error(
                ErrorCode::InvalidRepeatBounds,
                format!("repeat bounds {}..={} are invalid", min, max),
            )),
            _ => Ok(()),
        }
    }

    /// Add an arbitrary node.
    pub fn add(&mut self, node: Node) -> Result<NodeId> {
        self.validate(&node)?;
        Ok(self.push(node))
    }

    /// Add a literal.
    pub fn literal(&mut self, text: impl Into<String>) -> NodeId {
        self.push(Node::Literal(text.into()))
    }

    /// Add an inclusive integer range.
    pub fn int_range(&mut self, low: i128, high: i128) -> Result<NodeId> {
        self.add(Node::IntRange { low, high })
    }

    /// Add a label placeholder.
    pub fn label(&mut self) -> NodeId {
        self.push(Node::LabelPlaceholder)
    }

    /// Add a choice between `children`.
    pub fn choice(&mut self, children: Vec<NodeId>) -> Result<NodeId> {
        self.add(Node::Choice(children))
    }

    /// Add a sequence of `children`.
    pub fn sequence(&mut self, children: Vec<NodeId>) -> Result<NodeId> {
        self.add(Node::Sequence(children))
    }

    /// Add an optional `child`.
    pub fn optional(&mut self, child: NodeId) -> Result<NodeId> {
        self.add(Node::Optional(child))
    }

    /// Add a repetition of `child`.
    pub fn repeat(&mut self, child: NodeId, min: u32, max: u32) -> Result<NodeId> {
        self.add(Node::Repeat { child, min, max })
    }

    /// Add a transparent reference to `target`.
    pub fn indirection(&mut self, target: NodeId) -> Result<NodeId> {
        self.add(Node::Indirection(target))
    }

    /// Point an existing indirection at a new target.
    pub fn retarget(&mut self, indirection: NodeId, target: NodeId) -> Result<()> {
        self.check(target)?;
        match self.nodes.get_mut(indirection.index()) {
            Some(Node::Indirection(current)) => {
                *current = target;
                Ok(())
            }
            _ => Err(grammar_error(
                ErrorCode::UnknownNode,
                format!("node {} is not an indirection", indirection),
            )),
        }
    }

    /// Replace the node behind `id`, keeping its handle.
    pub fn replace(&mut self, id: NodeId, node: Node) -> Result<()> {
        self.check(id)?;
        self.validate(&node)?;
        self.nodes[id.index()] = node;
        Ok(())
    }

    /// All nodes reachable from `from`, in depth-first pre-order.
    pub fn reachable(&self, from: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            order.push(id);
            stack.extend(node.children().iter().rev());
        }

        order
    }

    /// Deep-copy the subtree below `id` into fresh handles.
    ///
    /// Sharing and cycles inside the subtree are preserved in the copy.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId> {
        self.check(id)?;

        let originals = self.reachable(id);
        let base = self.nodes.len() as u32;
        let mapping: HashMap<NodeId, NodeId> = originals
            .iter()
            .enumerate()
            .map(|(offset, original)| (*original, NodeId(base + offset as u32)))
            .collect();
        let remap = |child: &NodeId| mapping[child];

        for original in &originals {
            let copy = match &self.nodes[original.index()] {
                Node::Choice(children) => Node::Choice(children.iter().map(remap).collect()),
                Node::Sequence(children) => Node::Sequence(children.iter().map(remap).collect()),
                Node::Optional(child) => Node::Optional(remap(child)),
                Node::Repeat { child, min, max } => Node::Repeat {
                    child: remap(child),
                    min: *min,
                    max: *max,
                },
                Node::Indirection(target) => Node::Indirection(remap(target)),
                leaf => leaf.clone(),
            };
            self.nodes.push(copy);
        }

        Ok(mapping[&id])
    }

    /// Find a node that lies on a reference cycle reachable from the root.
    pub fn find_cycle(&self) -> Option<NodeId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        fn visit(grammar: &Grammar, id: NodeId, marks: &mut [Mark]) -> Option<NodeId> {
            match marks.get(id.index())? {
                Mark::Active => return Some(id),
                Mark::Done => return None,
                Mark::New => {}
            }
            marks[id.index()] = Mark::Active;
            for child in grammar.nodes[id.index()].children() {
                if let Some(found) = visit(grammar, *child, marks) {
                    return Some(found);
                }
            }
            marks[id.index()] = Mark::Done;
            None
        }

        let root = self.root?;
        let mut marks = vec![Mark::New; self.nodes.len()];
        visit(self, root, &mut marks)
    }

    /// Whether the grammar reachable from the root is free of cycles.
    pub fn is_acyclic(&self) -> bool {
        self.find_cycle().is_none()
    }
}
