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

//! The pull-based generation state machine.

use rand::Rng;
use tracing::{debug, warn};

use super::{CancellationToken, Coverage};
use crate::error::GenerateError;
use crate::grammar::{Grammar, NodeId, Selections};

/// One generated test program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Test {
    /// 0-based position in the corpus.
    pub index: usize,
    /// Rendered program text.
    pub program: String,
    /// Coverage targets this test covered for the first time.
    pub new_coverage: usize,
}

/// Where a [`Generator`] is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Looking for the next path.
    Searching,
    /// A test was handed out; the next pull resets and searches again.
    Delivering,
    /// Nothing uncovered is left.
    Exhausted,
    /// Generation hit an error, see [`Generator::error`].
    Failed,
    /// The cancellation token fired.
    Cancelled,
}

impl GeneratorState {
    /// Whether no further tests will be produced.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            GeneratorState::Exhausted | GeneratorState::Failed | GeneratorState::Cancelled
        )
    }
}

/// Produces the tests of one coverage session, one per pull.
///
/// ```
/// use isacov::grammar::Grammar;
/// use isacov::strategy::Generator;
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let mut g = Grammar::new();
/// let a = g.literal("a");
/// let b = g.literal("b");
/// let root = g.choice(vec![a, b]).unwrap();
/// g.set_root(root).unwrap();
///
/// let generator = Generator::new(g, ChaCha8Rng::seed_from_u64(0)).unwrap();
/// let programs: Vec<String> = generator.map(|test| test.program).collect();
/// assert_eq!(programs, vec!["a", "b"]);
/// ```
#[derive(Debug)]
pub struct Generator<R> {
    grammar: Grammar,
    root: NodeId,
    coverage: Coverage,
    selections: Selections,
    rng: R,
    state: GeneratorState,
    error: Option<GenerateError>,
    cancel: Option<CancellationToken>,
    delivered: usize,
}

impl<R: Rng> Generator<R> {
    /// Start a session over `grammar`.
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
            coverage: Coverage::new(),
            selections: Selections::new(),
            rng,
            state: GeneratorState::Searching,
            error: None,
            cancel: None,
            delivered: 0,
        })
    }

    /// Stop producing tests once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Current state.
    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Coverage accumulated so far.
    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    /// The error that moved the generator into [`GeneratorState::Failed`].
    pub fn error(&self) -> Option<&GenerateError> {
        self.error.as_ref()
    }

    /// The grammar being covered.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Number of tests delivered so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Produce the next test.
    ///
    /// `Ok(None)` means the session is over: exhausted, cancelled, or
    /// failed earlier.
    pub fn try_next(&mut self) -> Result<Option<Test>, GenerateError> {
        if self.state.is_finished() {
            return Ok(None);
        }
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            warn!(delivered = self.delivered, "generation cancelled");
            self.state = GeneratorState::Cancelled;
            return Ok(None);
        }

        if self.state == GeneratorState::Delivering {
            self.selections.reset();
            self.state = GeneratorState::Searching;
        }

        match self.search_and_commit() {
            Ok(test) => Ok(test),
            Err(error) => {
                self.state = GeneratorState::Failed;
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }

    fn search_and_commit(&mut self) -> Result<Option<Test>, GenerateError> {
        let candidate = self.coverage.best_uncovered(&self.grammar, self.root)?;
        if candidate.count == 0 {
            debug!(tests = self.delivered, "coverage exhausted");
            self.state = GeneratorState::Exhausted;
            return Ok(None);
        }

        let entry = self.coverage.commit(
            &self.grammar,
            self.root,
            &candidate.path,
            &mut self.selections,
            &mut self.rng,
        )?;
        self.selections.set_root(entry);

        let test = Test {
            index: self.delivered,
            program: self.selections.render(&self.grammar),
            new_coverage: candidate.count,
        };
        debug!(
            index = test.index,
            new_coverage = test.new_coverage,
            "delivering test"
        );

        self.delivered += 1;
        self.state = GeneratorState::Delivering;
        Ok(Some(test))
    }
}

impl<R: Rng> Iterator for Generator<R> {
    type Item = Test;

    fn next(&mut self) -> Option<Test> {
        self.try_next().ok().flatten()
    }
}

impl<R: Rng> std::iter::FusedIterator for Generator<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(3)
    }

    fn two_way() -> Grammar {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let b = g.literal("b");
        let root = g.choice(vec![a, b]).unwrap();
        g.set_root(root).unwrap();
        g
    }

    // ========================================
    // Construction
    // ========================================

    #[test]
    fn test_requires_root() {
        let err = Generator::new(Grammar::new(), rng()).unwrap_err();
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

        let err = Generator::new(g, rng()).unwrap_err();
        assert!(matches!(err, GenerateError::Structural(_)));
    }

    // ========================================
    // State machine
    // ========================================

    #[test]
    fn test_states_through_session() {
        let mut generator = Generator::new(two_way(), rng()).unwrap();
        assert_eq!(generator.state(), GeneratorState::Searching);

        let first = generator.try_next().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.new_coverage, 1);
        assert_eq!(generator.state(), GeneratorState::Delivering);

        let second = generator.try_next().unwrap().unwrap();
        assert_eq!(second.index, 1);

        assert!(generator.try_next().unwrap().is_none());
        assert_eq!(generator.state(), GeneratorState::Exhausted);
        assert!(generator.try_next().unwrap().is_none());
        assert_eq!(generator.delivered(), 2);
    }

    #[test]
    fn test_cancellation_stops_delivery() {
        let token = CancellationToken::new();
        let mut generator = Generator::new(two_way(), rng())
            .unwrap()
            .with_cancellation(token.clone());

        assert!(generator.next().is_some());
        token.cancel();
        assert!(generator.next().is_none());
        assert_eq!(generator.state(), GeneratorState::Cancelled);
        assert!(generator.error().is_none());
    }

    #[test]
    fn test_coverage_inspection() {
        let mut generator = Generator::new(two_way(), rng()).unwrap();
        let root = generator.grammar().root().unwrap();
        generator.next();
        assert!(generator.coverage().is_covered(root));
    }

    #[test]
    fn test_int_range_renders_sampled_value() {
        let mut g = Grammar::new();
        let op = g.literal("li a0, ");
        let imm = g.int_range(-4, 3).unwrap();
        let root = g.sequence(vec![op, imm]).unwrap();
        g.set_root(root).unwrap();

        let tests: Vec<Test> = Generator::new(g, rng()).unwrap().collect();
        assert_eq!(tests.len(), 1);
        let value: i128 = tests[0].program["li a0, ".len()..].parse().unwrap();
        assert!((-4..=3).contains(&value));
    }
}
