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

//! Runner module for consuming generated programs.
//!
//! This module provides functionality to:
//! - Run an external command on every generated program
//! - Watch the ISA configuration and templates for changes

mod exec;
mod watcher;

pub use exec::{resolve_command, ExecRunner};
pub use watcher::SourceWatcher;

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur during runner operations.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The command given with `--exec` was not found.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// The command ran but reported a failure.
    #[error("error when executing the command `{command}`: {status}")]
    CommandFailed { command: String, status: ExitStatus },

    /// Writing a program or starting the command failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error watching files.
    #[error("File watch error: {0}")]
    WatchError(String),
}
