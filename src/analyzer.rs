//! Invocation of the external morphological analyzer.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::errors::InvocationError;

/// Something that turns one word-form into the analyzer's raw text report.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, word: &str) -> Result<String, InvocationError>;
}

/// Runs an executable once per word, passing the word as its only argument.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: PathBuf,
    workdir: Option<PathBuf>,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandAnalyzer {
            program: program.into(),
            workdir: None,
        }
    }

    /// Run the analyzer from `dir`; the analyzer looks for its data files
    /// relative to its working directory.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Analyzer for CommandAnalyzer {
    fn analyze(&self, word: &str) -> Result<String, InvocationError> {
        let mut command = Command::new(&self.program);
        command.arg(word);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        debug!(word, program = %self.program.display(), "invoking analyzer");
        let output = command.output().map_err(|source| InvocationError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(InvocationError::NonZeroExit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_standard_output() {
        let analyzer = CommandAnalyzer::new("echo");
        assert_eq!(analyzer.analyze("amo").unwrap(), "amo\n");
    }

    #[test]
    fn runs_in_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("amo"), "").unwrap();
        // the relative name only resolves from inside the directory
        let analyzer = CommandAnalyzer::new("ls").with_workdir(dir.path());
        assert_eq!(analyzer.analyze("amo").unwrap().trim(), "amo");
    }

    #[test]
    fn nonzero_exit_is_an_error() {
        let analyzer = CommandAnalyzer::new("false");
        let err = analyzer.analyze("amo").unwrap_err();
        assert!(matches!(err, InvocationError::NonZeroExit { .. }));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let analyzer = CommandAnalyzer::new("/nonexistent/latin-analyzer");
        let err = analyzer.analyze("amo").unwrap_err();
        assert!(matches!(err, InvocationError::Spawn { .. }));
    }
}
