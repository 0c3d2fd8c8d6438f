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

//! ISA configuration.
//!
//! An ISA is described by a TOML file:
//!
//! ```toml
//! instructions = ["alu.s", "mem.s"]
//!
//! [variables]
//! r = ["x0", "x1", "x2", "x3"]
//! ```
//!
//! Instruction paths are resolved relative to the directory of the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::compiler::{self, TemplateSource, DEFAULT_MAX_REPEAT};
use crate::error::{CompileError, ErrorCode, Result, Span};
use crate::grammar::Grammar;
use crate::strategy::StrategyKind;

/// Options of one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Maximum number of instructions per test program.
    pub max_repeat: u32,
    /// Seed of the random source used for sampling.
    pub seed: u64,
    /// How programs are chosen.
    pub strategy: StrategyKind,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            max_repeat: DEFAULT_MAX_REPEAT,
            seed: 0,
            strategy: StrategyKind::Coverage,
        }
    }
}

/// The ISA configuration as written in the TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsaConfig {
    /// Instruction template files.
    pub instructions: Vec<PathBuf>,

    /// Named value lists referenced as `@name` in templates.
    #[serde(default)]
    pub variables: BTreeMap<String, Vec<String>>,
}

impl IsaConfig {
    /// Parse a configuration document.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            let span = e.span().map(Span::from).unwrap_or_default();
            CompileError::new(ErrorCode::ConfigParse, e.message().to_string(), span)
        })
    }

    /// Read and parse a configuration file, then read all its templates.
    pub fn load(path: &Path) -> Result<LoadedIsa> {
        let name = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| {
            CompileError::new(ErrorCode::ConfigRead, e.to_string(), Span::default())
                .with_file(name.clone())
        })?;
        let config = Self::parse(&text).map_err(|e| e.with_file(name.clone()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let mut templates = Vec::with_capacity(config.instructions.len());
        let mut template_paths = Vec::with_capacity(config.instructions.len());

        for instruction in &config.instructions {
            let resolved = base.join(instruction);
            let text = fs::read_to_string(&resolved).map_err(|e| {
                CompileError::new(
                    ErrorCode::ConfigRead,
                    format!("cannot read template {}: {}", resolved.display(), e),
                    Span::default(),
                )
                .with_file(name.clone())
                .with_hint("template paths are relative to the configuration file")
            })?;
            templates.push(TemplateSource::new(instruction.display().to_string(), text));
            template_paths.push(resolved);
        }

        debug!(
            config = %name,
            templates = templates.len(),
            variables = config.variables.len(),
            "loaded ISA configuration"
        );

        Ok(LoadedIsa {
            config_path: path.to_path_buf(),
            template_paths,
            templates,
            variables: config.variables,
        })
    }
}

/// A configuration with all template files read into memory.
#[derive(Debug, Clone)]
pub struct LoadedIsa {
    /// The configuration file.
    pub config_path: PathBuf,
    /// Resolved template paths, in configuration order.
    pub template_paths: Vec<PathBuf>,
    /// Template contents, in configuration order.
    pub templates: Vec<TemplateSource>,
    /// Variable value lists.
    pub variables: BTreeMap<String, Vec<String>>,
}

impl LoadedIsa {
    /// Compile the templates into a grammar.
    pub fn compile(&self, max_repeat: u32) -> Result<Grammar> {
        compiler::compile(&self.templates, &self.variables, max_repeat)
    }

    /// Every file whose change invalidates this ISA.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(self.template_paths.len() + 1);
        paths.push(self.config_path.clone());
        paths.extend(self.template_paths.iter().cloned());
        paths
    }

    /// The source text of a template, for diagnostics.
    pub fn template_source(&self, name: &str) -> Option<&str> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // ========================================
    // Parsing
    // ========================================

    #[test]
    fn test_parse_full() {
        let config = IsaConfig::parse(
            r#"
instructions = ["alu.s", "sub/mem.s"]

[variables]
r = ["x0", "x1"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.instructions,
            vec![PathBuf::from("alu.s"), PathBuf::from("sub/mem.s")]
        );
        assert_eq!(config.variables["r"], vec!["x0", "x1"]);
    }

    #[test]
    fn test_parse_without_variables() {
        let config = IsaConfig::parse("instructions = [\"a.s\"]").unwrap();
        assert!(config.variables.is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = IsaConfig::parse("instructions = []\nregisters = 32\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParse);
    }

    #[test]
    fn test_parse_rejects_missing_instructions() {
        let err = IsaConfig::parse("[variables]\nr = [\"x0\"]\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParse);
    }

    #[test]
    fn test_parse_error_has_span() {
        let err = IsaConfig::parse("instructions = [\"a.s\"\n").unwrap_err();
        assert!(!err.span.is_empty());
    }

    // ========================================
    // Loading
    // ========================================

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/alu.s"), "add @r, @r, @r\n").unwrap();
        let config_path = dir.path().join("isa.toml");
        fs::write(
            &config_path,
            "instructions = [\"sub/alu.s\"]\n[variables]\nr = [\"x0\"]\n",
        )
        .unwrap();

        let isa = IsaConfig::load(&config_path).unwrap();
        assert_eq!(isa.templates.len(), 1);
        assert_eq!(isa.templates[0].name, "sub/alu.s");
        assert_eq!(isa.template_source("sub/alu.s"), Some("add @r, @r, @r\n"));
        assert_eq!(isa.watched_paths().len(), 2);
        assert!(isa.compile(4).is_ok());
    }

    #[test]
    fn test_load_missing_config() {
        let dir = TempDir::new().unwrap();
        let err = IsaConfig::load(&dir.path().join("none.toml")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigRead);
    }

    #[test]
    fn test_load_missing_template() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("isa.toml");
        fs::write(&config_path, "instructions = [\"gone.s\"]\n").unwrap();

        let err = IsaConfig::load(&config_path).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigRead);
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_default_options() {
        let options = GeneratorOptions::default();
        assert_eq!(options.max_repeat, 300);
        assert_eq!(options.strategy, StrategyKind::Coverage);
    }
}
