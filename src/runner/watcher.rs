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

//! Watching the ISA configuration and its templates.
//!
//! Editors save either by rewriting a file in place or by writing a temp
//! file and renaming it over the original. Watching the parent directories
//! and filtering by path catches both.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use super::RunnerError;

/// Events arriving within this window after the first one are folded into it.
const DEBOUNCE_DURATION: Duration = Duration::from_millis(100);

/// Watches a fixed set of files for changes.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<Result<Event, notify::Error>>,
    paths: HashSet<PathBuf>,
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

impl SourceWatcher {
    /// Start watching `paths`.
    ///
    /// Every path must exist when the watcher is created.
    pub fn new(paths: &[PathBuf]) -> Result<Self, RunnerError> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)
            .map_err(|e| RunnerError::WatchError(format!("failed to create watcher: {}", e)))?;

        let mut watched = HashSet::new();
        let mut directories = HashSet::new();

        for path in paths {
            let resolved = path.canonicalize().map_err(|e| {
                RunnerError::WatchError(format!("cannot resolve {}: {}", path.display(), e))
            })?;
            if let Some(parent) = resolved.parent() {
                if directories.insert(parent.to_path_buf()) {
                    watcher
                        .watch(parent, RecursiveMode::NonRecursive)
                        .map_err(|e| {
                            RunnerError::WatchError(format!(
                                "failed to watch {}: {}",
                                parent.display(),
                                e
                            ))
                        })?;
                }
            }
            watched.insert(resolved);
        }

        debug!(
            files = watched.len(),
            directories = directories.len(),
            "watching ISA files"
        );

        Ok(Self {
            _watcher: watcher,
            rx,
            paths: watched,
        })
    }

    /// Number of watched files.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no file is watched.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether `path` is one of the watched files.
    pub fn watches(&self, path: &Path) -> bool {
        self.paths.contains(&canonical(path))
    }

    /// Block until a watched file changes and return it.
    ///
    /// Further events within the debounce window are discarded.
    pub fn wait_for_change(&self) -> Result<PathBuf, RunnerError> {
        loop {
            let event = self
                .rx
                .recv()
                .map_err(|e| RunnerError::WatchError(format!("watch channel closed: {}", e)))?
                .map_err(|e| RunnerError::WatchError(format!("watch error: {}", e)))?;

            let Some(changed) = self.relevant_path(&event) else {
                continue;
            };

            std::thread::sleep(DEBOUNCE_DURATION);
            while self.rx.try_recv().is_ok() {}

            debug!(path = %changed.display(), "watched file changed");
            return Ok(changed);
        }
    }

    fn relevant_path(&self, event: &Event) -> Option<PathBuf> {
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return None;
        }
        event
            .paths
            .iter()
            .map(|path| canonical(path))
            .find(|path| self.paths.contains(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_watch_config_and_templates() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("isa.toml");
        let template = dir.path().join("alu.s");
        fs::write(&config, "instructions = [\"alu.s\"]\n").unwrap();
        fs::write(&template, "nop\n").unwrap();

        let watcher = SourceWatcher::new(&[config.clone(), template]).unwrap();
        assert_eq!(watcher.len(), 2);
        assert!(watcher.watches(&config));
        assert!(!watcher.watches(&dir.path().join("other.s")));
    }

    #[test]
    fn test_missing_file_rejected() {
        let result = SourceWatcher::new(&[PathBuf::from("/nonexistent/isa.toml")]);
        assert!(matches!(result, Err(RunnerError::WatchError(_))));
    }

    #[test]
    fn test_detects_rewrite() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("mem.s");
        fs::write(&template, "lw @r, 0(@r)\n").unwrap();

        let watcher = SourceWatcher::new(&[template.clone()]).unwrap();

        let target = template.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            fs::write(&target, "sw @r, 0(@r)\n").unwrap();
        });

        let changed = watcher.wait_for_change().unwrap();
        writer.join().unwrap();
        assert_eq!(changed, template.canonicalize().unwrap());
    }
}
