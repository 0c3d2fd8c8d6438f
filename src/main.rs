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

//! isacov CLI
//!
//! Generates a coverage-guided corpus of test programs from an ISA
//! configuration.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use isacov::compiler::DEFAULT_MAX_REPEAT;
use isacov::config::LoadedIsa;
use isacov::error::{format_error, CompileError, ErrorCode, GenerateError};
use isacov::grammar::{apply_filters, BoundaryValueFilter, Filter, Grammar};
use isacov::labels::{label_rng, post_process};
use isacov::output::OutputTarget;
use isacov::runner::{ExecRunner, RunnerError, SourceWatcher};
use isacov::strategy::{CancellationToken, StrategyKind};
use isacov::{GeneratorOptions, IsaConfig};

/// isacov - Coverage-guided test corpus generation for instruction sets
#[derive(Parser, Debug)]
#[command(name = "isacov")]
#[command(version)]
#[command(about = "Generate a coverage-guided corpus of test programs from an ISA configuration")]
#[command(long_about = r#"
isacov compiles the instruction templates of an ISA configuration into a
grammar and prints the smallest sequence of test programs that uses every
instruction form and every boundary value at least once.

Template syntax:
  $i<bits> / $u<bits>   signed / unsigned integer of the given width
  $l                    a label, numbered and defined automatically
  @name                 one value of the variable `name`
  # ...                 comment up to the end of the line

Example usage:
  isacov riscv.toml
  isacov riscv.toml --seed 42 -o corpus/
  isacov riscv.toml --exec ./check.sh
  isacov riscv.toml --strategy random --limit 10
  isacov riscv.toml --watch
"#)]
struct Cli {
    /// ISA configuration file (.toml)
    config: PathBuf,

    /// Seed for randomness (defaults to the current time)
    #[arg(long)]
    seed: Option<u64>,

    /// How test programs are chosen
    #[arg(long, value_enum, default_value = "coverage")]
    strategy: StrategyArg,

    /// Maximum number of instructions per test program
    #[arg(long, default_value_t = DEFAULT_MAX_REPEAT)]
    max_instructions: u32,

    /// Write every program to its own file in this directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Execute this command with the test file as argument
    #[arg(long)]
    exec: Option<String>,

    /// Stop after this many programs (the random strategy defaults to 1)
    #[arg(long)]
    limit: Option<usize>,

    /// Keep integer ranges instead of reducing them to boundary values
    #[arg(long)]
    no_filter: bool,

    /// Leave `$l` markers unresolved
    #[arg(long)]
    raw_labels: bool,

    /// Regenerate whenever the configuration or a template changes
    #[arg(short, long)]
    watch: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum StrategyArg {
    /// Fewest programs that cover every alternative
    Coverage,
    /// Uniformly random programs
    Random,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Coverage => StrategyKind::Coverage,
            StrategyArg::Random => StrategyKind::Random,
        }
    }
}

/// Everything that ends a run, by exit code.
#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Config(CompileError),

    #[error("{error}")]
    Compile {
        error: CompileError,
        template: Option<String>,
    },

    #[error("{0}")]
    Filter(CompileError),

    #[error("{0}")]
    Generate(#[from] GenerateError),

    #[error("cannot resolve labels: {0}")]
    Labels(CompileError),

    #[error("{0}")]
    Output(#[from] RunnerError),

    #[error("{0}")]
    Watch(RunnerError),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 2,
            CliError::Compile { .. } => 3,
            CliError::Filter(_) => 4,
            CliError::Generate(_) | CliError::Labels(_) => 5,
            CliError::Output(_) => 6,
            CliError::Watch(_) => 7,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let options = GeneratorOptions {
        max_repeat: cli.max_instructions,
        seed: cli.seed.unwrap_or_else(time_seed),
        strategy: cli.strategy.into(),
    };
    info!(seed = options.seed, strategy = %options.strategy, "isacov v{}", isacov::VERSION);

    match run(&cli, options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&cli, &e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn run(cli: &Cli, options: GeneratorOptions) -> Result<(), CliError> {
    let isa = IsaConfig::load(&cli.config).map_err(CliError::Config)?;
    generate(cli, &isa, options)?;

    if cli.watch {
        watch(cli, isa, options)
    } else {
        Ok(())
    }
}

/// Build the grammar, applying the boundary-value filter unless disabled.
fn prepare_grammar(cli: &Cli, isa: &LoadedIsa, options: GeneratorOptions) -> Result<Grammar, CliError> {
    let grammar = isa.compile(options.max_repeat).map_err(|error| {
        let template = error
            .location
            .file
            .as_deref()
            .and_then(|file| isa.template_source(file))
            .map(str::to_string);
        CliError::Compile { error, template }
    })?;

    if cli.no_filter {
        return Ok(grammar);
    }
    let filters: Vec<Box<dyn Filter>> = vec![Box::new(BoundaryValueFilter)];
    apply_filters(&filters, grammar).map_err(CliError::Filter)
}

/// Generate and emit one corpus. Returns the number of programs.
fn generate(cli: &Cli, isa: &LoadedIsa, options: GeneratorOptions) -> Result<usize, CliError> {
    let grammar = prepare_grammar(cli, isa, options)?;

    let token = CancellationToken::new();
    let rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut strategy = options.strategy.build(grammar, rng, token.clone())?;
    let mut labels = label_rng(options.seed);
    let limit = cli
        .limit
        .or_else(|| (!options.strategy.is_finite()).then_some(1));

    let mut exec = cli.exec.as_deref().map(ExecRunner::new).transpose()?;
    let target = OutputTarget::from_dir(cli.output.clone());
    let emit = exec.is_none() || cli.output.is_some();
    if emit {
        target.prepare().map_err(RunnerError::from)?;
    }

    let mut count = 0;
    while let Some(test) = strategy.try_next()? {
        let program = if cli.raw_labels {
            test.program
        } else {
            post_process(&test.program, &mut labels).map_err(CliError::Labels)?
        };

        if let Some(runner) = exec.as_mut() {
            runner.run(&program)?;
        }
        if emit {
            target.emit(test.index, &program).map_err(RunnerError::from)?;
        }

        count += 1;
        if limit.is_some_and(|limit| count >= limit) {
            token.cancel();
        }
    }

    info!(tests = count, strategy = %options.strategy, "generation finished");
    Ok(count)
}

/// Regenerate on every change until watching itself fails.
fn watch(cli: &Cli, mut isa: LoadedIsa, options: GeneratorOptions) -> Result<(), CliError> {
    let mut watcher = SourceWatcher::new(&isa.watched_paths()).map_err(CliError::Watch)?;
    info!("watching for changes (press Ctrl+C to stop)");

    loop {
        let changed = watcher.wait_for_change().map_err(CliError::Watch)?;
        info!(path = %changed.display(), "change detected, regenerating");

        match IsaConfig::load(&cli.config) {
            Ok(reloaded) => {
                if reloaded.watched_paths() != isa.watched_paths() {
                    watcher = SourceWatcher::new(&reloaded.watched_paths()).map_err(CliError::Watch)?;
                }
                isa = reloaded;
            }
            Err(e) => {
                report(cli, &CliError::Config(e));
                continue;
            }
        }

        if let Err(e) = generate(cli, &isa, options) {
            report(cli, &e);
            error!("fix errors and save to retry");
        }
    }
}

fn report(cli: &Cli, e: &CliError) {
    match e {
        CliError::Compile {
            error,
            template: Some(template),
        } if !error.span.is_empty() => {
            eprint!("{}", format_error(error, template, None));
        }
        CliError::Config(error) if error.code == ErrorCode::ConfigParse => {
            match std::fs::read_to_string(&cli.config) {
                Ok(source) => eprint!("{}", format_error(error, &source, None)),
                Err(_) => eprintln!("Error: {}", e),
            }
        }
        _ => eprintln!("Error: {}", e),
    }
}
