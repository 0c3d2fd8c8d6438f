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

//! Coverage bookkeeping and best-path search.
//!
//! A path is the list of selectors, one per visited node in pre-order,
//! that [`Coverage::best_uncovered`] produces and [`Coverage::commit`]
//! consumes. For a repeat the selector comes first, followed by the paths
//! of every body iteration.

use std::collections::{BTreeMap, BTreeSet};
use std::slice;

use rand::Rng;
use tracing::trace;

use crate::error::GenerateError;
use crate::grammar::{EntryId, Grammar, Node, NodeId, Selections};

type SearchResult<T> = std::result::Result<T, GenerateError>;

/// Which covered-set is active while walking the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// The session-wide set.
    Session,
    /// The persistent set of one repeat site.
    Repeat(NodeId),
}

/// Outcome of a search below one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    /// Number of coverage targets this path would newly cover.
    pub count: usize,
    /// Selectors in pre-order.
    pub path: Vec<u32>,
}

impl Candidate {
    fn leaf(covered: bool) -> Self {
        Self {
            count: usize::from(!covered),
            path: vec![1],
        }
    }
}

/// Covered node handles of one generation session.
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    covered: BTreeSet<NodeId>,
    repeat_sites: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Coverage {
    /// Create an empty coverage state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles covered in the session-wide set.
    pub fn covered(&self) -> &BTreeSet<NodeId> {
        &self.covered
    }

    /// Whether `node` is covered in the session-wide set.
    pub fn is_covered(&self, node: NodeId) -> bool {
        self.covered.contains(&node)
    }

    /// The covered-set a repeat site keeps for its body, if it was visited.
    pub fn repeat_site(&self, repeat: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.repeat_sites.get(&repeat)
    }

    /// Total number of covered handles across all sets.
    pub fn total(&self) -> usize {
        self.covered.len() + self.repeat_sites.values().map(BTreeSet::len).sum::<usize>()
    }

    fn set(&self, scope: Scope) -> Option<&BTreeSet<NodeId>> {
        match scope {
            Scope::Session => Some(&self.covered),
            Scope::Repeat(site) => self.repeat_sites.get(&site),
        }
    }

    fn set_mut(&mut self, scope: Scope) -> &mut BTreeSet<NodeId> {
        match scope {
            Scope::Session => &mut self.covered,
            Scope::Repeat(site) => self.repeat_sites.entry(site).or_default(),
        }
    }

    fn contains(&self, scope: Scope, node: NodeId) -> bool {
        self.set(scope).is_some_and(|set| set.contains(&node))
    }

    // ========================================
    // Search
    // ========================================

    /// Find the path below `node` that covers the most new targets.
    ///
    /// Repeat sites commit the coverage of every iteration they decide to
    /// run, so the search itself mutates the per-site sets.
    pub fn best_uncovered(&mut self, grammar: &Grammar, node: NodeId) -> SearchResult<Candidate> {
        self.search(grammar, node, Scope::Session)
    }

    fn search(&mut self, grammar: &Grammar, node: NodeId, scope: Scope) -> SearchResult<Candidate> {
        match grammar.get(node)? {
            Node::Literal(_) | Node::IntRange { .. } | Node::LabelPlaceholder => {
                Ok(Candidate::leaf(self.contains(scope, node)))
            }
            Node::Optional(child) => {
                let inner = self.search(grammar, *child, scope)?;
                if inner.count == 0 {
                    return Ok(Candidate {
                        count: 0,
                        path: vec![1],
                    });
                }
                let mut path = Vec::with_capacity(inner.path.len() + 1);
                path.push(2);
                path.extend(inner.path);
                Ok(Candidate {
                    count: inner.count,
                    path,
                })
            }
            Node::Choice(children) => {
                let mut best: Option<(u32, Candidate)> = None;
                for (index, child) in children.iter().enumerate() {
                    let candidate = self.search(grammar, *child, scope)?;
                    let improves = best
                        .as_ref()
                        .map_or(true, |(_, incumbent)| candidate.count > incumbent.count);
                    if improves {
                        best = Some((index as u32 + 1, candidate));
                    }
                }
                let (selector, chosen) = best.ok_or_else(|| {
                    GenerateError::Internal(format!("choice {} has no alternatives", node))
                })?;
                let mut path = Vec::with_capacity(chosen.path.len() + 1);
                path.push(selector);
                path.extend(chosen.path);
                Ok(Candidate {
                    count: chosen.count,
                    path,
                })
            }
            Node::Sequence(children) => {
                let mut total = Candidate {
                    count: 0,
                    path: vec![1],
                };
                for child in children {
                    let candidate = self.search(grammar, *child, scope)?;
                    total.count += candidate.count;
                    total.path.extend(candidate.path);
                }
                Ok(total)
            }
            Node::Repeat { child, min, max } => self.search_repeat(grammar, node, *child, *min, *max),
            Node::Indirection(target) => {
                let inner = self.search(grammar, *target, scope)?;
                let mut path = Vec::with_capacity(inner.path.len() + 1);
                path.push(1);
                path.extend(inner.path);
                Ok(Candidate {
                    count: inner.count,
                    path,
                })
            }
        }
    }

    fn search_repeat(
        &mut self,
        grammar: &Grammar,
        site: NodeId,
        child: NodeId,
        min: u32,
        max: u32,
    ) -> SearchResult<Candidate> {
        let scope = Scope::Repeat(site);
        self.repeat_sites.entry(site).or_default();

        let mut count = 0;
        let mut body = Vec::new();
        let mut selector = max - min + 1;

        for i in 0..max {
            let iteration = self.search(grammar, child, scope)?;
            if i > min && iteration.count == 0 {
                selector = i - min + 1;
                trace!(repeat = %site, iterations = i, "repeat stopped early");
                break;
            }
            self.mark(grammar, child, &mut iteration.path.iter(), scope)?;
            count += iteration.count;
            body.extend(iteration.path);
        }

        let mut path = Vec::with_capacity(body.len() + 1);
        path.push(selector);
        path.extend(body);
        Ok(Candidate { count, path })
    }

    // ========================================
    // Commit
    // ========================================

    /// Apply `path` below `node`: record every selection in `selections`
    /// and mark every visited node covered.
    ///
    /// Returns the entry of `node`. The whole path must be consumed.
    pub fn commit<R: Rng + ?Sized>(
        &mut self,
        grammar: &Grammar,
        node: NodeId,
        path: &[u32],
        selections: &mut Selections,
        rng: &mut R,
    ) -> SearchResult<EntryId> {
        let mut cursor = path.iter();
        let entry = self.commit_node(grammar, node, &mut cursor, selections, rng, Scope::Session)?;
        if cursor.next().is_some() {
            return Err(GenerateError::Internal(format!(
                "path for node {} was not fully consumed",
                node
            )));
        }
        Ok(entry)
    }

    fn commit_node<R: Rng + ?Sized>(
        &mut self,
        grammar: &Grammar,
        node: NodeId,
        cursor: &mut slice::Iter<'_, u32>,
        selections: &mut Selections,
        rng: &mut R,
        scope: Scope,
    ) -> SearchResult<EntryId> {
        let shape = grammar.get(node)?;
        let selector = next_selector(cursor, node)?;
        let entry = selections.select(grammar, node, selector, rng)?;
        self.set_mut(scope).insert(node);

        let inner = inner_scope(shape, node, scope);
        for child in shape.activated(selector) {
            let child_entry = self.commit_node(grammar, child, cursor, selections, rng, inner)?;
            selections.attach(entry, child_entry);
        }
        Ok(entry)
    }

    /// Mark the nodes along `path` covered without recording selections.
    fn mark(
        &mut self,
        grammar: &Grammar,
        node: NodeId,
        cursor: &mut slice::Iter<'_, u32>,
        scope: Scope,
    ) -> SearchResult<()> {
        let shape = grammar.get(node)?;
        let selector = next_selector(cursor, node)?;
        if selector == 0 || selector > shape.selector_count() {
            return Err(GenerateError::Internal(format!(
                "selector {} out of range for node {}",
                selector, node
            )));
        }
        self.set_mut(scope).insert(node);

        let inner = inner_scope(shape, node, scope);
        for child in shape.activated(selector) {
            self.mark(grammar, child, cursor, inner)?;
        }
        Ok(())
    }
}

fn next_selector(cursor: &mut slice::Iter<'_, u32>, node: NodeId) -> SearchResult<u32> {
    cursor
        .next()
        .copied()
        .ok_or_else(|| GenerateError::Internal(format!("path ended before node {}", node)))
}

fn inner_scope(shape: &Node, node: NodeId, scope: Scope) -> Scope {
    match shape {
        Node::Repeat { .. } => Scope::Repeat(node),
        _ => scope,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn digit(g: &mut Grammar, d: u32) -> NodeId {
        g.literal(d.to_string())
    }

    // ========================================
    // Search
    // ========================================

    #[test]
    fn test_leaf_counts_once() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let mut coverage = Coverage::new();

        let first = coverage.best_uncovered(&g, a).unwrap();
        assert_eq!(first, Candidate { count: 1, path: vec![1] });

        coverage.covered.insert(a);
        let second = coverage.best_uncovered(&g, a).unwrap();
        assert_eq!(second.count, 0);
    }

    #[test]
    fn test_choice_first_child_wins_ties() {
        let mut g = Grammar::new();
        let a = digit(&mut g, 0);
        let b = digit(&mut g, 1);
        let choice = g.choice(vec![a, b]).unwrap();
        let mut coverage = Coverage::new();

        let candidate = coverage.best_uncovered(&g, choice).unwrap();
        assert_eq!(candidate.path, vec![1, 1]);

        coverage.covered.insert(a);
        let candidate = coverage.best_uncovered(&g, choice).unwrap();
        assert_eq!(candidate.path, vec![2, 1]);
        assert_eq!(candidate.count, 1);
    }

    #[test]
    fn test_disabled_optional_has_single_selector() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let optional = g.optional(a).unwrap();
        let mut coverage = Coverage::new();

        assert_eq!(
            coverage.best_uncovered(&g, optional).unwrap().path,
            vec![2, 1]
        );
        coverage.covered.insert(a);
        assert_eq!(coverage.best_uncovered(&g, optional).unwrap().path, vec![1]);
    }

    #[test]
    fn test_sequence_sums_counts() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let b = g.literal("b");
        let seq = g.sequence(vec![a, b]).unwrap();
        let forward = g.indirection(seq).unwrap();
        let mut coverage = Coverage::new();

        let candidate = coverage.best_uncovered(&g, forward).unwrap();
        assert_eq!(candidate.count, 2);
        assert_eq!(candidate.path, vec![1, 1, 1, 1]);
    }

    // ========================================
    // Repeat sites
    // ========================================

    #[test]
    fn test_repeat_stops_once_useless() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let b = g.literal("b");
        let choice = g.choice(vec![a, b]).unwrap();
        let repeat = g.repeat(choice, 1, 5).unwrap();
        let mut coverage = Coverage::new();

        let candidate = coverage.best_uncovered(&g, repeat).unwrap();
        assert_eq!(candidate.count, 2);
        assert_eq!(candidate.path, vec![2, 1, 1, 2, 1]);
    }

    #[test]
    fn test_repeat_coverage_stays_local() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let repeat = g.repeat(a, 1, 2).unwrap();
        let mut coverage = Coverage::new();

        coverage.best_uncovered(&g, repeat).unwrap();
        assert!(!coverage.is_covered(a));
        assert!(coverage.repeat_site(repeat).unwrap().contains(&a));
    }

    #[test]
    fn test_sibling_repeats_track_separately() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let left = g.repeat(a, 1, 1).unwrap();
        let right = g.repeat(a, 1, 1).unwrap();
        let seq = g.sequence(vec![left, right]).unwrap();
        let mut coverage = Coverage::new();

        let candidate = coverage.best_uncovered(&g, seq).unwrap();
        assert_eq!(candidate.count, 2);
    }

    // ========================================
    // Commit
    // ========================================

    #[test]
    fn test_commit_records_and_marks() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let b = g.literal("b");
        let choice = g.choice(vec![a, b]).unwrap();
        let optional = g.optional(choice).unwrap();
        let mut coverage = Coverage::new();
        let mut selections = Selections::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let root = coverage
            .commit(&g, optional, &[2, 2, 1], &mut selections, &mut rng)
            .unwrap();
        selections.set_root(root);

        assert_eq!(selections.render(&g), "b");
        assert!(coverage.is_covered(optional));
        assert!(coverage.is_covered(choice));
        assert!(coverage.is_covered(b));
        assert!(!coverage.is_covered(a));
    }

    #[test]
    fn test_commit_rejects_bad_paths() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let choice = g.choice(vec![a]).unwrap();
        let mut coverage = Coverage::new();
        let mut selections = Selections::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert!(coverage
            .commit(&g, choice, &[1], &mut selections, &mut rng)
            .is_err());
        assert!(coverage
            .commit(&g, choice, &[1, 1, 1], &mut selections, &mut rng)
            .is_err());
        assert!(coverage
            .commit(&g, choice, &[2, 1], &mut selections, &mut rng)
            .is_err());
    }

    #[test]
    fn test_total_counts_all_sets() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let repeat = g.repeat(a, 1, 1).unwrap();
        let mut coverage = Coverage::new();
        let mut selections = Selections::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let candidate = coverage.best_uncovered(&g, repeat).unwrap();
        coverage
            .commit(&g, repeat, &candidate.path, &mut selections, &mut rng)
            .unwrap();
        assert_eq!(coverage.total(), 2);
    }
}
