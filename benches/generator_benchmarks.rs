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

//! Performance benchmarks for isacov.
//!
//! Run with: cargo bench
//!
//! Results are saved to target/criterion/ with HTML reports.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use isacov::compiler::{compile, TemplateSource};
use isacov::grammar::{apply_filters, BoundaryValueFilter, Filter, Grammar};
use isacov::labels::{label_rng, post_process};

// ============================================================================
// Benchmark Inputs
// ============================================================================

const MNEMONICS: &[&str] = &[
    "add", "sub", "xor", "or", "and", "sll", "srl", "sra", "slt", "sltu",
];

/// A RISC-V flavoured ISA with `lines` register-register instructions.
fn templates(lines: usize) -> Vec<TemplateSource> {
    let alu: String = (0..lines)
        .map(|i| format!("{} @r, @r, @r\n", MNEMONICS[i % MNEMONICS.len()]))
        .collect();
    vec![
        TemplateSource::new("alu.s", alu),
        TemplateSource::new("imm.s", "addi @r, @r, $i12\nslli @r, @r, $u5\nlui @r, $u20\n"),
        TemplateSource::new("branch.s", "beq @r, @r, $l\nbne @r, @r, $l\njal @r, $l\n"),
    ]
}

fn variables() -> BTreeMap<String, Vec<String>> {
    let mut variables = BTreeMap::new();
    variables.insert(
        "r".to_string(),
        (0..32).map(|i| format!("x{}", i)).collect(),
    );
    variables
}

fn grammar(lines: usize, max_repeat: u32) -> Grammar {
    let grammar = compile(&templates(lines), &variables(), max_repeat).unwrap();
    let filters: Vec<Box<dyn Filter>> = vec![Box::new(BoundaryValueFilter)];
    apply_filters(&filters, grammar).unwrap()
}

const SIZES: &[(&str, usize)] = &[("small", 4), ("medium", 40), ("large", 400)];

// ============================================================================
// Lexer Benchmarks
// ============================================================================

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    for (name, lines) in SIZES {
        let source = templates(*lines).remove(0).text;
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("tokenize", name), &source, |b, src| {
            b.iter(|| isacov::lexer::tokenize(black_box(src)))
        });
    }

    group.finish();
}

// ============================================================================
// Compiler Benchmarks
// ============================================================================

fn bench_compile(c: &mut Criterion) {
    let variables = variables();
    let mut group = c.benchmark_group("compile");

    for (name, lines) in SIZES {
        let templates = templates(*lines);
        group.bench_with_input(BenchmarkId::new("compile", name), &templates, |b, t| {
            b.iter(|| compile(black_box(t), &variables, 300))
        });
    }

    group.finish();
}

// ============================================================================
// Generation Benchmarks
// ============================================================================

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    group.sample_size(10);

    for (name, lines) in SIZES {
        group.bench_function(BenchmarkId::new("corpus", name), |b| {
            b.iter_batched(
                || grammar(*lines, 300),
                |g| isacov::generate_corpus(g, 42, false),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_post_process(c: &mut Criterion) {
    let program = "beq x1, x2, $l\nadd x3, x4, x5\n".repeat(150);

    c.bench_function("post_process", |b| {
        b.iter(|| post_process(black_box(&program), &mut label_rng(7)))
    });
}

criterion_group!(
    benches,
    bench_lexer,
    bench_compile,
    bench_generate,
    bench_post_process
);
criterion_main!(benches);
