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

//! Token definitions for instruction templates.

use crate::error::{ErrorCode, Span};

/// Marker character introducing integer and label placeholders.
pub const SPECIAL_MARKER: char = '$';

/// Marker character introducing a variable reference.
pub const KEY_MARKER: char = '@';

/// Marker character starting a line comment.
pub const COMMENT_MARKER: char = '#';

/// The text a label placeholder is written as.
pub const LABEL_MARKER: &str = "$l";

/// Largest integer width accepted by `$i<bits>` and `$u<bits>`.
pub const MAX_INTEGER_WIDTH: u32 = 64;

/// The kind of a template token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain instruction text, copied verbatim.
    Text,
    /// `$i<bits>` (signed) or `$u<bits>` (unsigned) integer placeholder.
    IntegerSpec {
        /// `true` for `$i`, `false` for `$u`.
        signed: bool,
        /// Width of the integer in bits.
        bits: u32,
    },
    /// `$l` label placeholder.
    Label,
    /// `@name` variable reference.
    VariableKey(String),
    /// `\n` or `\r`.
    NewLine,
    /// End of the template.
    EndOfInput,
    /// A malformed escape; scanning stops after this token.
    Error {
        /// Error code for the malformed escape.
        code: ErrorCode,
        /// Description of the problem.
        message: String,
    },
}

/// A template token together with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What was scanned.
    pub kind: TokenKind,
    /// Byte offset of the first character of this token.
    pub offset: usize,
    /// The scanned source text.
    pub text: String,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, offset: usize, text: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            text: text.into(),
        }
    }

    /// The source range covered by this token.
    pub fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.text.len())
    }

    /// Whether this token ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, TokenKind::EndOfInput | TokenKind::Error { .. })
    }

    /// Inclusive value bounds of an integer placeholder.
    ///
    /// Signed widths cover `[-2^(n-1), 2^(n-1)-1]`, unsigned widths
    /// `[0, 2^n - 1]`. Returns `None` for every other token kind.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        match self.kind {
            TokenKind::IntegerSpec { signed, bits } => Some(integer_bounds(signed, bits)),
            _ => None,
        }
    }
}

/// Inclusive bounds for an integer of the given signedness and width.
pub fn integer_bounds(signed: bool, bits: u32) -> (i128, i128) {
    if signed {
        let half = 1i128 << (bits - 1);
        (-half, half - 1)
    } else {
        (0, (1i128 << bits) - 1)
    }
}
