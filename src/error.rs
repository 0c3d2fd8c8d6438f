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

//! Error types for isacov.
//!
//! Two families of errors exist:
//! - [`CompileError`] for everything that happens before generation starts
//!   (lexing templates, resolving variables, reading the ISA configuration)
//! - [`GenerateError`] for problems detected by the coverage strategy

use std::fmt;
use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::grammar::NodeId;

/// A source span representing a range in a template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Get the length of this span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// Error codes for template compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexical errors (E001-E004)
    InvalidEscape,
    MissingIntegerWidth,
    InvalidIntegerWidth,
    MissingVariableName,

    // Template and grammar errors (E100-E108)
    UndefinedVariable,
    EmptyTemplate,
    NoInstructions,
    InvalidRepeatBounds,
    FilterFailed,
    EmptyChoice,
    InvalidRange,
    UnknownNode,
    EmptyVariable,

    // Configuration errors (E150-E151)
    ConfigRead,
    ConfigParse,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl ErrorCode {
    /// Get the string code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidEscape => "E001",
            ErrorCode::MissingIntegerWidth => "E002",
            ErrorCode::InvalidIntegerWidth => "E003",
            ErrorCode::MissingVariableName => "E004",

            ErrorCode::UndefinedVariable => "E100",
            ErrorCode::EmptyTemplate => "E101",
            ErrorCode::NoInstructions => "E102",
            ErrorCode::InvalidRepeatBounds => "E103",
            ErrorCode::FilterFailed => "E104",
            ErrorCode::EmptyChoice => "E105",
            ErrorCode::InvalidRange => "E106",
            ErrorCode::UnknownNode => "E107",
            ErrorCode::EmptyVariable => "E108",

            ErrorCode::ConfigRead => "E150",
            ErrorCode::ConfigParse => "E151",
        }
    }

    /// Whether this code is raised by the lexer.
    pub fn is_lexical(&self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidEscape
                | ErrorCode::MissingIntegerWidth
                | ErrorCode::InvalidIntegerWidth
                | ErrorCode::MissingVariableName
        )
    }
}

/// File and line an error refers to, as far as they are known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Template or configuration file name.
    pub file: Option<String>,
    /// Line number (1-indexed).
    pub line: Option<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}: ", file, line),
            (Some(file), None) => write!(f, "{}: ", file),
            (None, Some(line)) => write!(f, "line {}: ", line),
            (None, None) => Ok(()),
        }
    }
}

/// An error raised while turning templates into a grammar.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {location}{message}")]
pub struct CompileError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// The span inside the template where the error occurred.
    pub span: Span,
    /// File and line of the error.
    pub location: Location,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl CompileError {
    /// Create a new compile error.
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            location: Location::default(),
            hint: None,
        }
    }

    /// Add a hint to this error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach the file this error was found in.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.location.file = Some(file.into());
        self
    }

    /// Attach the 1-based line this error was found on.
    pub fn with_line(mut self, line: usize) -> Self {
        self.location.line = Some(line);
        self
    }

    /// Get the error code string.
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors detected by the coverage strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// The grammar contains a reference cycle; no test can be produced.
    #[error("found endless loop in grammar at node {0}, cannot generate tests")]
    Structural(NodeId),

    /// An invariant of the grammar or of a search path was violated.
    #[error("internal generator error: {0}")]
    Internal(String),
}

/// Any error of the library, for callers that run the whole pipeline.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Compiling or post-processing failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Generation failed.
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Line and column information for a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
}

impl SourceLocation {
    /// Calculate line and column from a byte offset in source code.
    ///
    /// Lines end at `\n`, `\r\n` or a lone `\r`.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];

        let mut line = 1;
        let mut line_start = 0;
        let mut chars = before.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            let ends_line = match c {
                '\n' => true,
                '\r' => match chars.peek() {
                    Some((_, next)) => *next != '\n',
                    None => !source[offset..].starts_with('\n'),
                },
                _ => false,
            };
            if ends_line {
                line += 1;
                line_start = i + c.len_utf8();
            }
        }
        let column = before[line_start..].chars().count() + 1;

        Self { line, column }
    }
}

/// Format an error with source context.
///
/// `filename` overrides the file recorded in the error itself.
pub fn format_error(error: &CompileError, source: &str, filename: Option<&str>) -> String {
    let filename = filename
        .or(error.location.file.as_deref())
        .unwrap_or("<input>");

    let start = error.span.start.min(source.len());
    let end = error.span.end.clamp(start, source.len());

    let mut report = Report::build(ReportKind::Error, filename, start)
        .with_config(Config::default().with_color(false))
        .with_code(error.code_str())
        .with_message(&error.message)
        .with_label(Label::new((filename, start..end)).with_message(&error.message));

    if let Some(hint) = &error.hint {
        report = report.with_help(hint);
    }

    let mut output = Vec::new();
    if report
        .finish()
        .write((filename, Source::from(source)), &mut output)
        .is_err()
    {
        return format!("error[{}]: {}{}\n", error.code_str(), error.location, error.message);
    }

    String::from_utf8_lossy(&output).into_owned()
}
