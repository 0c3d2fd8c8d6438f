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

//! Grammar filters applied once before generation.

use tracing::debug;

use super::{Grammar, Node};
use crate::error::{CompileError, ErrorCode, Result, Span};

/// A transformation of a complete grammar.
///
/// Filters must keep the handles of the nodes they do not rewrite.
pub trait Filter {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Transform the grammar.
    fn apply(&self, grammar: Grammar) -> Result<Grammar>;
}

/// Apply `filters` in order.
pub fn apply_filters(filters: &[Box<dyn Filter>], mut grammar: Grammar) -> Result<Grammar> {
    for filter in filters {
        let before = grammar.len();
        grammar = filter.apply(grammar)?;
        debug!(
            filter = filter.name(),
            added = grammar.len().saturating_sub(before),
            "applied grammar filter"
        );
    }
    Ok(grammar)
}

/// Reduces every integer range to its boundary values.
///
/// `IntRange(low, high)` becomes a choice between the literals `low`,
/// `low + (high - low) / 2` and `high`, stored under the range's handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryValueFilter;

impl BoundaryValueFilter {
    /// The boundary values of an inclusive range, without duplicates.
    ///
    /// The midpoint is computed on the unsigned distance, so the full
    /// `i128` range is accepted.
    pub fn boundaries(low: i128, high: i128) -> Result<Vec<i128>> {
        let mid = (low <= high)
            .then(|| low.checked_add_unsigned(high.abs_diff(low) / 2))
            .flatten()
            .ok_or_else(|| {
                CompileError::new(
                    ErrorCode::FilterFailed,
                    format!("cannot reduce integer range {}..={}", low, high),
                    Span::default(),
                )
            })?;
        let mut values = vec![low, mid, high];
        values.dedup();
        Ok(values)
    }
}

impl Filter for BoundaryValueFilter {
    fn name(&self) -> &'static str {
        "boundary-value"
    }

    fn apply(&self, mut grammar: Grammar) -> Result<Grammar> {
        let Some(root) = grammar.root() else {
            return Ok(grammar);
        };

        for id in grammar.reachable(root) {
            let Some(Node::IntRange { low, high }) = grammar.node(id).cloned() else {
                continue;
            };
            let literals = Self::boundaries(low, high)?
                .into_iter()
                .map(|value| grammar.literal(value.to_string()))
                .collect();
            grammar.replace(id, Node::Choice(literals))?;
        }

        Ok(grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(BoundaryValueFilter::boundaries(-2048, 2047).unwrap(), vec![-2048, -1, 2047]);
        assert_eq!(BoundaryValueFilter::boundaries(0, 31).unwrap(), vec![0, 15, 31]);
        assert_eq!(BoundaryValueFilter::boundaries(0, 1).unwrap(), vec![0, 1]);
        assert_eq!(BoundaryValueFilter::boundaries(5, 5).unwrap(), vec![5]);
        assert_eq!(BoundaryValueFilter::boundaries(-3, 0).unwrap(), vec![-3, -2, 0]);
    }

    #[test]
    fn test_boundaries_at_i128_extremes() {
        assert_eq!(
            BoundaryValueFilter::boundaries(i128::MIN, i128::MAX).unwrap(),
            vec![i128::MIN, -1, i128::MAX]
        );
        assert_eq!(
            BoundaryValueFilter::boundaries(i128::MAX - 1, i128::MAX).unwrap(),
            vec![i128::MAX - 1, i128::MAX]
        );
    }

    #[test]
    fn test_boundaries_reject_inverted_range() {
        let err = BoundaryValueFilter::boundaries(3, -3).unwrap_err();
        assert_eq!(err.code, ErrorCode::FilterFailed);
    }

    #[test]
    fn test_full_i128_range_is_filtered() {
        let mut g = Grammar::new();
        let range = g.int_range(i128::MIN, i128::MAX).unwrap();
        g.set_root(range).unwrap();

        let g = apply_filters(&[Box::new(BoundaryValueFilter)], g).unwrap();
        let Some(Node::Choice(children)) = g.node(range) else {
            panic!("range was not replaced");
        };
        assert_eq!(children.len(), 3);
        assert_eq!(g.node(children[1]), Some(&Node::Literal("-1".into())));
    }

    #[test]
    fn test_ranges_become_choices_in_place() {
        let mut g = Grammar::new();
        let op = g.literal("addi x1, x1, ");
        let imm = g.int_range(-2048, 2047).unwrap();
        let seq = g.sequence(vec![op, imm]).unwrap();
        g.set_root(seq).unwrap();

        let g = apply_filters(&[Box::new(BoundaryValueFilter)], g).unwrap();

        assert_eq!(g.root(), Some(seq));
        assert_eq!(g.node(op), Some(&Node::Literal("addi x1, x1, ".into())));
        let Some(Node::Choice(children)) = g.node(imm) else {
            panic!("range was not replaced");
        };
        let texts: Vec<_> = children.iter().map(|c| g.node(*c).cloned()).collect();
        assert_eq!(
            texts,
            vec![
                Some(Node::Literal("-2048".into())),
                Some(Node::Literal("-1".into())),
                Some(Node::Literal("2047".into())),
            ]
        );
    }

    #[test]
    fn test_grammar_without_root_is_untouched() {
        let mut g = Grammar::new();
        let range = g.int_range(0, 3).unwrap();
        let g = BoundaryValueFilter.apply(g).unwrap();
        assert_eq!(g.node(range), Some(&Node::IntRange { low: 0, high: 3 }));
    }
}
