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

//! Fuzz target for label resolution.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_post_process

#![no_main]

use isacov::labels::{label_rng, post_process};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (u64, &str)| {
    let (seed, text) = data;
    if let Ok(out) = post_process(text, &mut label_rng(seed)) {
        assert!(!out.contains("$l"));
    }
});
