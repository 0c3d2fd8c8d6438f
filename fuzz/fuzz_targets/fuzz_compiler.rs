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

//! Fuzz target for compiling templates and generating their corpus.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_compiler
//!
//! Run for a specific duration:
//!   cargo +nightly fuzz run fuzz_compiler -- -max_total_time=60

#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use isacov::compiler::{compile, TemplateSource};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    template: String,
    values: Vec<String>,
    max_repeat: u8,
    seed: u64,
}

fuzz_target!(|input: Input| {
    let mut variables = BTreeMap::new();
    variables.insert("r".to_string(), input.values);

    let templates = [TemplateSource::new("fuzz.s", input.template)];
    let max_repeat = u32::from(input.max_repeat % 8);

    // Should never panic, only return Ok or Err
    if let Ok(grammar) = compile(&templates, &variables, max_repeat) {
        let corpus = isacov::generate_corpus(grammar, input.seed, false)
            .expect("compiled grammars always generate");
        assert!(!corpus.is_empty());
    }
});
