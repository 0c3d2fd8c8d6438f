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

//! Test generation strategies.
//!
//! The coverage strategy produces each test in two steps:
//! [`Coverage::best_uncovered`] finds the path through the grammar that
//! covers the most targets nobody has covered yet, and [`Coverage::commit`]
//! records that path in a [`Selections`](crate::grammar::Selections) table
//! which is then rendered. The session ends as soon as the best path covers
//! nothing new.
//!
//! [`Generator`] drives this loop on the caller's thread,
//! [`BackgroundGenerator`] on a dedicated one. [`RandomGenerator`] renders
//! uniformly random paths instead and never runs out.

mod cancel;
mod coverage;
mod generator;
mod handoff;
mod random;

use std::fmt;

use rand::Rng;

pub use cancel::CancellationToken;
pub use coverage::{Candidate, Coverage};
pub use generator::{Generator, GeneratorState, Test};
pub use handoff::BackgroundGenerator;
pub use random::RandomGenerator;

use crate::error::GenerateError;
use crate::grammar::Grammar;

/// A source of test programs.
pub trait Strategy {
    /// Produce the next test, or `Ok(None)` once the strategy is done.
    fn try_next(&mut self) -> Result<Option<Test>, GenerateError>;
}

impl<R: Rng> Strategy for Generator<R> {
    fn try_next(&mut self) -> Result<Option<Test>, GenerateError> {
        Generator::try_next(self)
    }
}

impl<R: Rng> Strategy for RandomGenerator<R> {
    fn try_next(&mut self) -> Result<Option<Test>, GenerateError> {
        RandomGenerator::try_next(self)
    }
}

/// The strategies selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Fewest programs that cover every alternative.
    #[default]
    Coverage,
    /// Uniformly random programs, until cancelled.
    Random,
}

impl StrategyKind {
    /// Every strategy, default first.
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Coverage, StrategyKind::Random];

    /// The name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Coverage => "coverage",
            StrategyKind::Random => "random",
        }
    }

    /// Whether the strategy stops on its own.
    pub fn is_finite(self) -> bool {
        matches!(self, StrategyKind::Coverage)
    }

    /// Look up a strategy by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Create the strategy over `grammar`, stopping once `token` is cancelled.
    pub fn build<R: Rng + 'static>(
        self,
        grammar: Grammar,
        rng: R,
        token: CancellationToken,
    ) -> Result<Box<dyn Strategy>, GenerateError> {
        Ok(match self {
            StrategyKind::Coverage => {
                Box::new(Generator::new(grammar, rng)?.with_cancellation(token))
            }
            StrategyKind::Random => {
                Box::new(RandomGenerator::new(grammar, rng)?.with_cancellation(token))
            }
        })
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn two_way() -> Grammar {
        let mut g = Grammar::new();
        let a = g.literal("a");
        let b = g.literal("b");
        let root = g.choice(vec![a, b]).unwrap();
        g.set_root(root).unwrap();
        g
    }

    #[test]
    fn test_names_round_trip() {
        for kind in StrategyKind::ALL {
            assert_eq!(StrategyKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.to_string(), kind.name());
        }
        assert_eq!(StrategyKind::from_name("exhaustive"), None);
        assert_eq!(StrategyKind::default(), StrategyKind::Coverage);
    }

    #[test]
    fn test_build_coverage_is_finite() {
        let token = CancellationToken::new();
        let mut strategy = StrategyKind::Coverage
            .build(two_way(), ChaCha8Rng::seed_from_u64(0), token)
            .unwrap();

        assert_eq!(strategy.try_next().unwrap().unwrap().program, "a");
        assert_eq!(strategy.try_next().unwrap().unwrap().program, "b");
        assert!(strategy.try_next().unwrap().is_none());
    }

    #[test]
    fn test_build_random_runs_until_cancelled() {
        let token = CancellationToken::new();
        let mut strategy = StrategyKind::Random
            .build(two_way(), ChaCha8Rng::seed_from_u64(0), token.clone())
            .unwrap();

        for _ in 0..10 {
            assert!(strategy.try_next().unwrap().is_some());
        }
        token.cancel();
        assert!(strategy.try_next().unwrap().is_none());
    }
}
