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

//! Running an external command on every generated program.

use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::NamedTempFile;
use tracing::debug;

use super::RunnerError;

/// Resolve the command to run.
///
/// Anything containing a path separator is taken as a path; bare names are
/// looked up on `PATH`.
pub fn resolve_command(command: &str) -> Result<PathBuf, RunnerError> {
    let path = Path::new(command);
    if path.components().count() > 1 {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(RunnerError::CommandNotFound(command.to_string()));
    }
    which::which(command).map_err(|_| RunnerError::CommandNotFound(command.to_string()))
}

/// Hands every program to an external command through one reused temp file.
///
/// The temp file is removed when the runner is dropped.
pub struct ExecRunner {
    command: PathBuf,
    file: NamedTempFile,
}

impl ExecRunner {
    /// Resolve `command` and create the temp file.
    pub fn new(command: &str) -> Result<Self, RunnerError> {
        let command = resolve_command(command)?;
        let file = tempfile::Builder::new()
            .prefix("isacov-")
            .suffix(".s")
            .tempfile()?;
        debug!(command = %command.display(), file = %file.path().display(), "prepared exec runner");
        Ok(Self { command, file })
    }

    /// The resolved command.
    pub fn command(&self) -> &Path {
        &self.command
    }

    /// The file programs are written to.
    pub fn file_path(&self) -> &Path {
        self.file.path()
    }

    /// Replace the temp file's content with `program` and run the command on it.
    ///
    /// A non-zero exit status is an error.
    pub fn run(&mut self, program: &str) -> Result<(), RunnerError> {
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(program.as_bytes())?;
        file.set_len(program.len() as u64)?;
        file.flush()?;

        let status = Command::new(&self.command)
            .arg(self.file.path())
            .stdin(Stdio::null())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(RunnerError::CommandFailed {
                command: format!("{} {}", self.command.display(), self.file.path().display()),
                status,
            })
        }
    }
}
