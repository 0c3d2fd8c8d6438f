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

//! isacov Library
//!
//! Compiles instruction set templates into a generative grammar and
//! produces the smallest corpus of test programs that exercises every
//! alternative of that grammar at least once.
//!
//! # Modules
//!
//! - [`error`] - Error types and error reporting
//! - [`lexer`] - Tokenization of instruction templates
//! - [`compiler`] - Templates and variables to grammar
//! - [`grammar`] - The grammar arena, selections and filters
//! - [`strategy`] - Coverage search, random generation and test delivery
//! - [`labels`] - Label numbering for rendered programs
//! - [`config`] - ISA configuration files
//! - [`output`] - Writing generated programs
//! - [`runner`] - External commands and file watching
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use isacov::compiler::{compile, TemplateSource};
//!
//! let templates = vec![TemplateSource::new("alu.s", "add @r, @r, @r\n")];
//! let mut variables = BTreeMap::new();
//! variables.insert("r".to_string(), vec!["x0".to_string(), "x31".to_string()]);
//!
//! let grammar = compile(&templates, &variables, 8).unwrap();
//! let corpus = isacov::generate_corpus(grammar, 42, true).unwrap();
//!
//! assert_eq!(corpus[0], "add x0, x0, x0\nadd x31, x31, x31\n");
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod grammar;
pub mod labels;
pub mod lexer;
pub mod output;
pub mod runner;
pub mod strategy;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Re-export commonly used types
pub use config::{GeneratorOptions, IsaConfig};
pub use error::{format_error, CompileError, Error, ErrorCode, GenerateError, Result, Span};
pub use grammar::{Grammar, Node, NodeId};
pub use lexer::Token;
pub use strategy::{CancellationToken, Generator, RandomGenerator, Strategy, StrategyKind, Test};

/// The version of isacov.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the tool.
pub const NAME: &str = "isacov";

/// Generate the complete corpus for `grammar`.
///
/// Sampling uses a ChaCha8 stream seeded with `seed`; labels are resolved
/// with [`labels::label_rng`] of the same seed when `post_process` is set.
pub fn generate_corpus(
    grammar: Grammar,
    seed: u64,
    post_process: bool,
) -> std::result::Result<Vec<String>, Error> {
    let mut generator = Generator::new(grammar, ChaCha8Rng::seed_from_u64(seed))?;
    let mut label_rng = labels::label_rng(seed);
    let mut corpus = Vec::new();

    while let Some(test) = generator.try_next()? {
        let program = if post_process {
            labels::post_process(&test.program, &mut label_rng)?
        } else {
            test.program
        };
        corpus.push(program);
    }

    Ok(corpus)
}
