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

//! ISA variables and their boundary-sampled choice nodes.

use std::collections::BTreeMap;

use crate::error::{CompileError, ErrorCode, Result, Span};
use crate::grammar::{Grammar, NodeId};

/// Reduce a value list to its first, middle and last element.
///
/// The middle element is only taken from lists of three or more values,
/// the last one only from lists of two or more.
pub fn boundary_sample<T: Clone>(values: &[T]) -> Vec<T> {
    let mut sampled = Vec::new();
    if let Some(first) = values.first() {
        sampled.push(first.clone());
        if values.len() >= 3 {
            sampled.push(values[values.len() / 2].clone());
        }
        if values.len() >= 2 {
            sampled.push(values[values.len() - 1].clone());
        }
    }
    sampled
}

/// Variable name to choice-node template.
///
/// Templates live in the grammar arena but are never reachable from the
/// root. Every reference gets its own copy, see [`VariableTable::instantiate`].
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    templates: BTreeMap<String, Option<NodeId>>,
}

impl VariableTable {
    /// Build one choice node per variable from its boundary-sampled values.
    pub fn build(grammar: &mut Grammar, variables: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut templates = BTreeMap::new();

        for (name, values) in variables {
            let literals: Vec<NodeId> = boundary_sample(values)
                .into_iter()
                .map(|value| grammar.literal(value))
                .collect();
            let template = if literals.is_empty() {
                None
            } else {
                Some(grammar.choice(literals)?)
            };
            templates.insert(name.clone(), template);
        }

        Ok(Self { templates })
    }

    /// Whether a variable of this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// The shared template of a variable.
    pub fn template(&self, name: &str) -> Option<NodeId> {
        self.templates.get(name).copied().flatten()
    }

    /// Create an independently coverable copy of a variable.
    ///
    /// Returns an indirection to a fresh clone of the variable's choice.
    pub fn instantiate(&self, grammar: &mut Grammar, name: &str) -> Result<NodeId> {
        match self.templates.get(name) {
            Some(Some(template)) => {
                let copy = grammar.clone_subtree(*template)?;
                grammar.indirection(copy)
            }
            Some(None) => Err(CompileError::new(
                ErrorCode::EmptyVariable,
                format!("variable {} has no values", name),
                Span::default(),
            )),
            None => Err(CompileError::new(
                ErrorCode::UndefinedVariable,
                format!("variable {} not found", name),
                Span::default(),
            )),
        }
    }
}
