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

//! Fuzz target for the template lexer.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_lexer
//!
//! Run for a specific duration:
//!   cargo +nightly fuzz run fuzz_lexer -- -max_total_time=60

#![no_main]

use isacov::lexer::{Lexer, TokenKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        let _ = isacov::lexer::tokenize(source);

        // The lazy lexer must stop after exactly one terminal token
        let tokens: Vec<_> = Lexer::new(source).collect();
        let terminals = tokens.iter().filter(|t| t.is_terminal()).count();
        assert_eq!(terminals, 1);
        if let Some(last) = tokens.last() {
            assert!(matches!(
                last.kind,
                TokenKind::EndOfInput | TokenKind::Error { .. }
            ));
        }
    }
});
