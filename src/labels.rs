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

//! Label resolution for rendered programs.
//!
//! Every `$l` marker becomes a use of a fresh label `label<N>`. Definitions
//! are scattered over later line boundaries at random; whatever is still
//! undefined at the end of the program is defined after the last line.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::CompileError;
use crate::lexer::{token_error, Lexer, TokenKind};

/// Prefix of generated label names.
pub const LABEL_PREFIX: &str = "label";

/// One in this many line boundaries receives a pending definition.
const DEFINITION_ODDS: u32 = 8;

/// The random source for label placement belonging to a run `seed`.
///
/// It is independent of the stream used for sampling, so placing labels
/// never changes which values a test samples.
pub fn label_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(1);
    rng
}

fn label_name(index: usize) -> String {
    format!("{}{}", LABEL_PREFIX, index)
}

/// Replace label markers in `text` with numbered labels and their definitions.
///
/// Each label is defined exactly once, on its own line, at or after the
/// line that first uses it.
pub fn post_process<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Result<String, CompileError> {
    let mut out = String::with_capacity(text.len());
    let mut next_label = 0;
    let mut pending = VecDeque::new();

    for token in Lexer::new(text) {
        match &token.kind {
            TokenKind::Text | TokenKind::IntegerSpec { .. } | TokenKind::VariableKey(_) => {
                out.push_str(&token.text);
            }
            TokenKind::Label => {
                out.push_str(&label_name(next_label));
                pending.push_back(next_label);
                next_label += 1;
            }
            TokenKind::NewLine => {
                out.push_str(&token.text);
                if token.text == "\n" && !pending.is_empty() && rng.gen_ratio(1, DEFINITION_ODDS) {
                    if let Some(label) = pending.pop_front() {
                        out.push_str(&label_name(label));
                        out.push_str(":\n");
                    }
                }
            }
            TokenKind::EndOfInput => {}
            TokenKind::Error { .. } => {
                if let Some(error) = token_error(&token, text) {
                    return Err(error);
                }
            }
        }
    }

    if !pending.is_empty() && !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for label in pending {
        out.push_str(&label_name(label));
        out.push_str(":\n");
    }

    Ok(out)
}
