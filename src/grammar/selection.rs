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

//! Committed selections of one test.
//!
//! The grammar arena never changes while tests are generated. Everything
//! that varies from one test to the next (which alternative a choice took,
//! how often a repeat ran, the value an integer range sampled) is recorded
//! here as a tree of entries. A repeat body that runs three times gets three
//! entries pointing at the same node handle.

use rand::Rng;

use super::{Grammar, Node, NodeId};
use crate::error::GenerateError;
use crate::lexer::LABEL_MARKER;

/// Index of an entry inside [`Selections`].
pub type EntryId = usize;

#[derive(Debug, Clone)]
struct Entry {
    node: NodeId,
    selector: u32,
    value: Option<i128>,
    children: Vec<EntryId>,
}

/// The per-test selection table.
#[derive(Debug, Clone, Default)]
pub struct Selections {
    entries: Vec<Entry>,
    root: Option<EntryId>,
}

impl Selections {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing is committed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Commit `selector` for `node`, sampling a value for integer ranges.
    ///
    /// The returned entry has no children yet; see [`Selections::attach`].
    pub fn select<R: Rng + ?Sized>(
        &mut self,
        grammar: &Grammar,
        node: NodeId,
        selector: u32,
        rng: &mut R,
    ) -> Result<EntryId, GenerateError> {
        let shape = grammar.get(node)?;
        if selector == 0 || selector > shape.selector_count() {
            return Err(GenerateError::Internal(format!(
                "selector {} out of range for node {} ({} alternatives)",
                selector,
                node,
                shape.selector_count()
            )));
        }

        let value = match shape {
            Node::IntRange { low, high } => Some(rng.gen_range(*low..=*high)),
            _ => None,
        };

        self.entries.push(Entry {
            node,
            selector,
            value,
            children: Vec::new(),
        });
        Ok(self.entries.len() - 1)
    }

    /// Record `child` as the next rendered child of `parent`.
    pub fn attach(&mut self, parent: EntryId, child: EntryId) {
        if let Some(entry) = self.entries.get_mut(parent) {
            entry.children.push(child);
        }
    }

    /// Mark `entry` as the start of rendering.
    pub fn set_root(&mut self, entry: EntryId) {
        self.root = Some(entry);
    }

    /// The selector committed for `entry`.
    pub fn selector(&self, entry: EntryId) -> Option<u32> {
        self.entries.get(entry).map(|e| e.selector)
    }

    /// The value sampled for `entry`, if it is an integer range.
    pub fn value(&self, entry: EntryId) -> Option<i128> {
        self.entries.get(entry).and_then(|e| e.value)
    }

    /// Entries committed for `node`, in commit order.
    pub fn entries_for(&self, node: NodeId) -> Vec<EntryId> {
        (0..self.entries.len())
            .filter(|&i| self.entries[i].node == node)
            .collect()
    }

    /// Forget every selection so the next test starts from scratch.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.root = None;
    }

    /// Render the committed program.
    pub fn render(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.render_into(grammar, root, &mut out);
        }
        out
    }

    fn render_into(&self, grammar: &Grammar, entry: EntryId, out: &mut String) {
        let Some(entry) = self.entries.get(entry) else {
            return;
        };
        match grammar.node(entry.node) {
            Some(Node::Literal(text)) => out.push_str(text),
            Some(Node::IntRange { .. }) => {
                if let Some(value) = entry.value {
                    out.push_str(&value.to_string());
                }
            }
            Some(Node::LabelPlaceholder) => out.push_str(LABEL_MARKER),
            Some(_) => {
                for child in &entry.children {
                    self.render_into(grammar, *child, out);
                }
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_select_rejects_out_of_range_selector() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let choice = g.choice(vec![a]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut s = Selections::new();

        assert!(s.select(&g, choice, 2, &mut rng).is_err());
        assert!(s.select(&g, choice, 0, &mut rng).is_err());
        assert!(s.select(&g, choice, 1, &mut rng).is_ok());
    }

    #[test]
    fn test_int_range_sample_within_bounds() {
        let mut g = Grammar::new();
        let range = g.int_range(-8, 7).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut s = Selections::new();

        for _ in 0..100 {
            let entry = s.select(&g, range, 1, &mut rng).unwrap();
            let value = s.value(entry).unwrap();
            assert!((-8..=7).contains(&value));
        }
    }

    #[test]
    fn test_render_and_reset() {
        let mut g = Grammar::new();
        let add = g.literal("add ");
        let label = g.label();
        let seq = g.sequence(vec![add, label]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut s = Selections::new();

        let root = s.select(&g, seq, 1, &mut rng).unwrap();
        let first = s.select(&g, add, 1, &mut rng).unwrap();
        let second = s.select(&g, label, 1, &mut rng).unwrap();
        s.attach(root, first);
        s.attach(root, second);
        s.set_root(root);

        assert_eq!(s.render(&g), "add $l");
        assert_eq!(s.entries_for(add), vec![first]);

        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.render(&g), "");
    }

    #[test]
    fn test_same_seed_same_samples() {
        let mut g = Grammar::new();
        let range = g.int_range(0, 1 << 40).unwrap();
        let sample = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut s = Selections::new();
            let entry = s.select(&g, range, 1, &mut rng).unwrap();
            s.value(entry)
        };
        assert_eq!(sample(42), sample(42));
    }
}
