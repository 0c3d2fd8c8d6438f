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

//! Lexer module for instruction templates.
//!
//! An instruction template is plain text with a handful of escapes:
//! - `$i<bits>` / `$u<bits>` - signed / unsigned integer placeholders
//! - `$l` - label placeholder
//! - `@name` - reference to an ISA variable
//! - `#` - comment until the end of the line
//!
//! The [`Lexer`] is a lazy iterator: every call to `next` scans exactly as
//! far as needed for one token. The stream always ends with either
//! [`TokenKind::EndOfInput`] or a single [`TokenKind::Error`].

mod tokens;

pub use tokens::{
    integer_bounds, Token, TokenKind, COMMENT_MARKER, KEY_MARKER, LABEL_MARKER,
    MAX_INTEGER_WIDTH, SPECIAL_MARKER,
};

use crate::error::{CompileError, ErrorCode, SourceLocation, Span};

/// The lexer state for tokenizing a template.
pub struct Lexer<'source> {
    /// The template being tokenized.
    source: &'source str,
    /// Current byte position in the source.
    position: usize,
    /// Start of the token currently being scanned.
    start: usize,
    /// Set once `EndOfInput` or an error has been produced.
    finished: bool,
}

impl<'source> Lexer<'source> {
    /// Create a new lexer for the given template.
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            position: 0,
            start: 0,
            finished: false,
        }
    }

    /// Get the current position in the source.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Peek at the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    /// Advance to the next character and return it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    /// Emit the source between `start` and the current position.
    fn emit(&mut self, kind: TokenKind) -> Token {
        let token = Token::new(kind, self.start, &self.source[self.start..self.position]);
        self.start = self.position;
        token
    }

    /// Emit an error token and stop scanning.
    fn error(&mut self, code: ErrorCode, message: &str) -> Token {
        self.finished = true;
        Token::new(
            TokenKind::Error {
                code,
                message: message.to_string(),
            },
            self.start,
            &self.source[self.start..self.position],
        )
    }

    /// Scan the next token.
    fn scan(&mut self) -> Token {
        loop {
            let Some(c) = self.peek() else {
                if self.position > self.start {
                    return self.emit(TokenKind::Text);
                }
                self.finished = true;
                return self.emit(TokenKind::EndOfInput);
            };

            match c {
                SPECIAL_MARKER | KEY_MARKER | COMMENT_MARKER | '\r' | '\n'
                    if self.position > self.start =>
                {
                    return self.emit(TokenKind::Text);
                }
                SPECIAL_MARKER => return self.scan_special(),
                KEY_MARKER => return self.scan_key(),
                COMMENT_MARKER => self.skip_comment(),
                '\r' | '\n' => {
                    self.advance();
                    return self.emit(TokenKind::NewLine);
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip a comment up to, but not including, the end of the line.
    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\r' || c == '\n' {
                break;
            }
            self.advance();
        }
        self.start = self.position;
    }

    /// Scan a `$` escape.
    fn scan_special(&mut self) -> Token {
        self.advance(); // consume $

        match self.peek() {
            Some(signedness @ ('i' | 'u')) => {
                self.advance();
                let digits_start = self.position;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
                let digits = &self.source[digits_start..self.position];
                if digits.is_empty() {
                    return self.error(
                        ErrorCode::MissingIntegerWidth,
                        "expected integer size after a $i or $u sequence",
                    );
                }
                match digits.parse::<u32>() {
                    Ok(bits) if (1..=MAX_INTEGER_WIDTH).contains(&bits) => {
                        self.emit(TokenKind::IntegerSpec {
                            signed: signedness == 'i',
                            bits,
                        })
                    }
                    _ => self.error(
                        ErrorCode::InvalidIntegerWidth,
                        "integer size must be between 1 and 64 bits",
                    ),
                }
            }
            Some('l') => {
                self.advance();
                self.emit(TokenKind::Label)
            }
            _ => self.error(
                ErrorCode::InvalidEscape,
                "expected 'i', 'u' or 'l' after $ character",
            ),
        }
    }

    /// Scan a `@name` variable reference.
    fn scan_key(&mut self) -> Token {
        self.advance(); // consume @
        let name_start = self.position;

        while self.peek().is_some_and(char::is_alphabetic) {
            self.advance();
        }

        if self.position == name_start {
            return self.error(
                ErrorCode::MissingVariableName,
                "expected a key string after @ character",
            );
        }

        let name = self.source[name_start..self.position].to_string();
        self.emit(TokenKind::VariableKey(name))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        Some(self.scan())
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

/// Convert an error token into a [`CompileError`] with line information.
pub fn token_error(token: &Token, source: &str) -> Option<CompileError> {
    let TokenKind::Error { code, message } = &token.kind else {
        return None;
    };
    let span = Span::new(token.offset, token.offset + token.text.len().max(1));
    let line = SourceLocation::from_offset(source, token.offset).line;

    let error = CompileError::new(*code, message.clone(), span).with_line(line);
    Some(match code {
        ErrorCode::InvalidEscape | ErrorCode::MissingIntegerWidth => {
            error.with_hint("use $i<bits>, $u<bits> or $l")
        }
        _ => error,
    })
}

/// Tokenize a complete template.
///
/// The returned tokens end with [`TokenKind::EndOfInput`]. A malformed
/// escape is returned as a [`CompileError`] instead.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();

    for token in Lexer::new(source) {
        if let Some(error) = token_error(&token, source) {
            return Err(error);
        }
        tokens.push(token);
    }

    Ok(tokens)
}
