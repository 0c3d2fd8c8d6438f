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

//! Template compiler.
//!
//! Turns instruction template files into one [`Grammar`]:
//!
//! ```text
//! Repeat(1, max_repeat,
//!     Sequence(
//!         Choice(file_1, file_2, ...),   // each file: Choice(line_1, line_2, ...)
//!         Literal("\n")))                // each line: Sequence(tokens...)
//! ```

mod variables;

pub use variables::{boundary_sample, VariableTable};

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{CompileError, ErrorCode, Result, SourceLocation, Span};
use crate::grammar::{Grammar, NodeId};
use crate::lexer::{integer_bounds, token_error, Lexer, Token, TokenKind};

/// Default upper bound for instructions per test program.
pub const DEFAULT_MAX_REPEAT: u32 = 300;

/// One instruction template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    /// Name used in error messages.
    pub name: String,
    /// File content.
    pub text: String,
}

impl TemplateSource {
    /// Create a template from a name and its content.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Instruction-line builder for one template file.
struct LineBuilder {
    parts: Vec<NodeId>,
    has_content: bool,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            parts: Vec::new(),
            has_content: false,
        }
    }

    fn push(&mut self, part: NodeId, is_content: bool) {
        self.parts.push(part);
        self.has_content |= is_content;
    }

    /// Finish the line. Blank and comment-only lines produce nothing.
    fn finish(&mut self, grammar: &mut Grammar) -> Result<Option<NodeId>> {
        let parts = std::mem::take(&mut self.parts);
        let has_content = std::mem::replace(&mut self.has_content, false);
        if !has_content {
            return Ok(None);
        }
        grammar.sequence(parts).map(Some)
    }
}

/// Compile a single template file into a choice over its lines.
pub fn compile_template(
    grammar: &mut Grammar,
    template: &TemplateSource,
    variables: &VariableTable,
) -> Result<NodeId> {
    let source = template.text.as_str();
    let located = |error: CompileError, token: &Token| {
        let line = SourceLocation::from_offset(source, token.offset).line;
        error.with_file(template.name.clone()).with_line(line)
    };

    let mut instructions = Vec::new();
    let mut line = LineBuilder::new();

    for token in Lexer::new(source) {
        match &token.kind {
            TokenKind::Text => {
                let is_content = !token.text.trim().is_empty();
                line.push(grammar.literal(token.text.clone()), is_content);
            }
            TokenKind::IntegerSpec { signed, bits } => {
                let (low, high) = integer_bounds(*signed, *bits);
                let range = grammar.int_range(low, high).map_err(|e| located(e, &token))?;
                line.push(range, true);
            }
            TokenKind::Label => line.push(grammar.label(), true),
            TokenKind::VariableKey(name) => {
                let reference = variables.instantiate(grammar, name).map_err(|e| {
                    let mut e = located(e, &token);
                    e.span = token.span();
                    e
                })?;
                line.push(reference, true);
            }
            TokenKind::NewLine | TokenKind::EndOfInput => {
                if let Some(instruction) = line.finish(grammar)? {
                    instructions.push(instruction);
                }
            }
            TokenKind::Error { .. } => {
                let error = token_error(&token, source).unwrap_or_else(|| {
                    CompileError::new(ErrorCode::InvalidEscape, "invalid template", token.span())
                });
                return Err(error.with_file(template.name.clone()));
            }
        }
    }

    if instructions.is_empty() {
        return Err(CompileError::new(
            ErrorCode::EmptyTemplate,
            "template contains no instructions",
            Span::default(),
        )
        .with_file(template.name.clone())
        .with_hint("add at least one instruction line"));
    }

    debug!(
        file = %template.name,
        instructions = instructions.len(),
        "compiled template"
    );
    grammar.choice(instructions)
}

/// Compile a set of template files and variables into a complete grammar.
///
/// `max_repeat` bounds the number of instruction lines per test program.
pub fn compile(
    templates: &[TemplateSource],
    variables: &BTreeMap<String, Vec<String>>,
    max_repeat: u32,
) -> Result<Grammar> {
    if templates.is_empty() {
        return Err(CompileError::new(
            ErrorCode::NoInstructions,
            "no instruction template files given",
            Span::default(),
        )
        .with_hint("list template files under `instructions` in the ISA configuration"));
    }
    if max_repeat == 0 {
        return Err(CompileError::new(
            ErrorCode::InvalidRepeatBounds,
            "the maximum number of instructions per test must be at least 1",
            Span::default(),
        ));
    }

    let mut grammar = Grammar::new();
    let table = VariableTable::build(&mut grammar, variables)?;

    let files = templates
        .iter()
        .map(|template| compile_template(&mut grammar, template, &table))
        .collect::<Result<Vec<_>>>()?;

    let any_file = grammar.choice(files)?;
    let newline = grammar.literal("\n");
    let instruction = grammar.sequence(vec![any_file, newline])?;
    let root = grammar.repeat(instruction, 1, max_repeat)?;
    grammar.set_root(root)?;

    debug!(
        templates = templates.len(),
        variables = variables.len(),
        nodes = grammar.len(),
        "compiled grammar"
    );
    Ok(grammar)
}
