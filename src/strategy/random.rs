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

//! Uniformly random programs.

use rand::Rng;
use tracing::{debug, warn};

use super::{CancellationToken, Test};
use crate::error::GenerateError;
use crate::grammar::{EntryId, Grammar, NodeId, Selections};

/// Produces one random program per pull, without end.
///
/// Every node picks one of its selectors with equal probability. Stop it
/// with a [`CancellationToken`] or by taking a bounded number of tests.
///
/// ```
/// use isacov::grammar::Grammar;
/// use isacov::strategy::RandomGenerator;
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let mut g = Grammar::new();
/// let a = g.literal("a");
/// let b = g.literal("b");
/// let root = g.choice(vec![a, b]).unwrap();
/// g.set_root(root).unwrap();
///
/// let generator = RandomGenerator::new(g, ChaCha8Rng::seed_from_u64(0)).unwrap();
/// let programs: Vec<String> = generator.take(5).map(|test| test.program).collect();
/// assert_eq!(programs.len(), 5);
/// assert!(programs.iter().all(|p| p == "a" || p == "b"));
/// ```
#[derive(Debug)]
pub struct RandomGenerator<R> {
    grammar: Grammar,
    root: NodeId,
    selections: Selections,
    rng: R,
    cancel: Option<CancellationToken>,
    cancelled: bool,
    delivered: usize,
}

impl<R: Rng> RandomGenerator<R> {
    /// Start producing random programs from `grammar`.
    ///
    /// Fails if the grammar has no root or contains a reference cycle.
    pub fn new(grammar: Grammar, rng: R) -> Result<Self, GenerateError> {
        let root = grammar
            .root()
            .ok_or_else(|| GenerateError::Internal("grammar has no root".to_string()))?;
        if let Some(node) = grammar.find_cycle() {
            return Err(GenerateError::Structural(node));
        }

        Ok(Self {
            grammar,
            root,
            selections: Selections::new(),
            rng,
            cancel: None,
            cancelled: false,
            delivered: 0,
        })
    }

    /// Stop producing tests once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Number of tests delivered so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Produce the next program, or `Ok(None)` once cancelled.
    pub fn try_next(&mut self) -> Result<Option<Test>, GenerateError> {
        if self.cancelled {
            return Ok(None);
        }
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            warn!(delivered = self.delivered, "generation cancelled");
            self.cancelled = true;
            return Ok(None);
        }

        self.selections.reset();
        let entry = pick(&self.grammar, self.root, &mut self.selections, &mut self.rng)?;
        self.selections.set_root(entry);

        let test = Test {
            index: self.delivered,
            program: self.selections.render(&self.grammar),
            new_coverage: 0,
        };
        debug!(index = test.index, "delivering random test");

        self.delivered += 1;
        Ok(Some(test))
    }
}

/// Commit a random selector for `node` and, recursively, its children.
fn pick<R: Rng + ?Sized>(
    grammar: &Grammar,
    node: NodeId,
    selections: &mut Selections,
    rng: &mut R,
) -> Result<EntryId, GenerateError> {
    let shape = grammar.get(node)?;
    let selector = rng.gen_range(1..=shape.selector_count());
    let entry = selections.select(grammar, node, selector, rng)?;

    for child in shape.activated(selector) {
        let child_entry = pick(grammar, child, selections, rng)?;
        selections.attach(entry, child_entry);
    }
    Ok(entry)
}

impl<R: Rng> Iterator for RandomGenerator<R> {
    type Item = Test;

    fn next(&mut self) -> Option<Test> {
        self.try_next().ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn lines(max: u32) -> Grammar {
        let mut g = Grammar::new();
        let add = g.literal("add");
        let sub = g.literal("sub");
        let op = g.choice(vec![add, sub]).unwrap();
        let newline = g.literal("\n");
        let line = g.sequence(vec![op, newline]).unwrap();
        let root = g.repeat(line, 1, max).unwrap();
        g.set_root(root).unwrap();
        g
    }

    #[test]
    fn test_requires_root() {
        let err = RandomGenerator::new(Grammar::new(), rng(0)).unwrap_err();
        assert!(matches!(err, GenerateError::Internal(_)));
    }

    #[test]
    fn test_rejects_cycles() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let forward = g.indirection(a).unwrap();
        let root = g.sequence(vec![a, forward]).unwrap();
        g.retarget(forward, root).unwrap();
        g.set_root(root).unwrap();

        let err = RandomGenerator::new(g, rng(0)).unwrap_err();
        assert!(matches!(err, GenerateError::Structural(_)));
    }

    #[test]
    fn test_programs_respect_repeat_bounds() {
        let generator = RandomGenerator::new(lines(4), rng(9)).unwrap();
        for test in generator.take(50) {
            let count = test.program.lines().count();
            assert!((1..=4).contains(&count), "{:?}", test.program);
            assert!(test
                .program
                .lines()
                .all(|line| line == "add" || line == "sub"));
        }
    }

    #[test]
    fn test_same_seed_same_programs() {
        let first: Vec<String> = RandomGenerator::new(lines(8), rng(5))
            .unwrap()
            .take(10)
            .map(|t| t.program)
            .collect();
        let second: Vec<String> = RandomGenerator::new(lines(8), rng(5))
            .unwrap()
            .take(10)
            .map(|t| t.program)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_optional_takes_both_branches() {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let root = g.optional(a).unwrap();
        g.set_root(root).unwrap();

        let programs: Vec<String> = RandomGenerator::new(g, rng(1))
            .unwrap()
            .take(64)
            .map(|t| t.program)
            .collect();
        assert!(programs.iter().any(|p| p.is_empty()));
        assert!(programs.iter().any(|p| p == "a"));
    }

    #[test]
    fn test_cancellation_stops_delivery() {
        let token = CancellationToken::new();
        let mut generator = RandomGenerator::new(lines(2), rng(0))
            .unwrap()
            .with_cancellation(token.clone());

        assert!(generator.next().is_some());
        assert_eq!(generator.delivered(), 1);
        token.cancel();
        assert!(generator.next().is_none());
        assert!(generator.next().is_none());
    }
}
