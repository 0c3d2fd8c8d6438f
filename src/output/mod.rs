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

//! Output module for generated test programs.
//!
//! Programs either go to a writer (usually stdout), separated by blank
//! lines, or into a directory as one numbered file per program.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File extension of written test programs.
pub const TEST_EXTENSION: &str = "s";

/// The file name of the test program at `index`.
pub fn test_file_name(index: usize) -> String {
    format!("test-{:05}.{}", index, TEST_EXTENSION)
}

/// Whether `name` is a file name produced by [`test_file_name`].
pub fn is_test_file_name(name: &str) -> bool {
    name.strip_prefix("test-")
        .and_then(|rest| rest.strip_suffix(TEST_EXTENSION))
        .and_then(|rest| rest.strip_suffix('.'))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Remove every test program in `dir`. Other files are kept.
fn clear_tests(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_test = entry.file_name().to_str().is_some_and(is_test_file_name);
        if is_test && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Where generated programs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Print every program followed by an empty line.
    Stdout,
    /// Write every program to its own file in this directory.
    Directory(PathBuf),
}

impl OutputTarget {
    /// Pick the target for an optional output directory.
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        dir.map_or(OutputTarget::Stdout, OutputTarget::Directory)
    }

    /// Create the output directory if there is one and remove the test
    /// programs a previous run left in it.
    pub fn prepare(&self) -> io::Result<()> {
        match self {
            OutputTarget::Stdout => Ok(()),
            OutputTarget::Directory(dir) => {
                fs::create_dir_all(dir)?;
                clear_tests(dir)
            }
        }
    }

    /// Emit one program.
    ///
    /// Returns the written file for directory targets.
    pub fn emit(&self, index: usize, program: &str) -> io::Result<Option<PathBuf>> {
        match self {
            OutputTarget::Stdout => {
                let stdout = io::stdout();
                write_program(&mut stdout.lock(), program)?;
                Ok(None)
            }
            OutputTarget::Directory(dir) => write_test(dir, index, program).map(Some),
        }
    }
}

/// Write a program followed by an empty line.
pub fn write_program<W: Write>(out: &mut W, program: &str) -> io::Result<()> {
    out.write_all(program.as_bytes())?;
    if !program.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.write_all(b"\n")?;
    out.flush()
}

/// Write the program at `index` into `dir`.
pub fn write_test(dir: &Path, index: usize, program: &str) -> io::Result<PathBuf> {
    let path = dir.join(test_file_name(index));
    fs::write(&path, program)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_names_sort_by_index() {
        assert_eq!(test_file_name(0), "test-00000.s");
        assert_eq!(test_file_name(42), "test-00042.s");
        assert!(test_file_name(9) < test_file_name(10));
    }

    #[test]
    fn test_write_program_separates_with_blank_line() {
        let mut out = Vec::new();
        write_program(&mut out, "nop\n").unwrap();
        write_program(&mut out, "ret").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "nop\n\nret\n\n");
    }

    #[test]
    fn test_directory_target() {
        let dir = TempDir::new().unwrap();
        let target = OutputTarget::from_dir(Some(dir.path().join("corpus")));
        target.prepare().unwrap();

        let path = target.emit(3, "nop\n").unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "test-00003.s");
        assert_eq!(fs::read_to_string(path).unwrap(), "nop\n");
    }

    #[test]
    fn test_is_test_file_name() {
        assert!(is_test_file_name("test-00000.s"));
        assert!(is_test_file_name("test-123456.s"));
        assert!(!is_test_file_name("test-.s"));
        assert!(!is_test_file_name("test-0001.asm"));
        assert!(!is_test_file_name("test-ab.s"));
        assert!(!is_test_file_name("notes.s"));
    }

    #[test]
    fn test_prepare_removes_stale_programs() {
        let dir = TempDir::new().unwrap();
        let target = OutputTarget::from_dir(Some(dir.path().to_path_buf()));
        target.prepare().unwrap();
        for index in 0..3 {
            target.emit(index, "nop\n").unwrap();
        }
        fs::write(dir.path().join("README"), "keep").unwrap();

        target.prepare().unwrap();
        target.emit(0, "ret\n").unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("test-00000.s")).unwrap(), "ret\n");
        assert!(!dir.path().join("test-00001.s").exists());
        assert!(!dir.path().join("test-00002.s").exists());
        assert!(dir.path().join("README").exists());
    }

    #[test]
    fn test_from_dir_none_is_stdout() {
        assert_eq!(OutputTarget::from_dir(None), OutputTarget::Stdout);
    }
}
