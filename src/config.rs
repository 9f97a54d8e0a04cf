//! Run configuration: YAML file values overridden by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::errors::ConfigError;

pub const DEFAULT_CONCURRENCY: usize = 20;

/// Settings read from `latin-roots.yaml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootsConfig {
    /// Analyzer executable; relative paths are taken from `analyzer_dir`
    pub analyzer: PathBuf,
    /// Working directory for analyzer processes
    pub analyzer_dir: Option<PathBuf>,
    /// Maximum number of analyzer processes at once
    pub concurrency: usize,
    /// Also print sub-words the analyzer did not recognize
    pub print_unknown: bool,
}

impl Default for RootsConfig {
    fn default() -> Self {
        RootsConfig {
            analyzer: PathBuf::from("./words"),
            analyzer_dir: None,
            concurrency: DEFAULT_CONCURRENCY,
            print_unknown: false,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub analyzer: Option<PathBuf>,
    pub analyzer_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub print_unknown: bool,
}

impl RootsConfig {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_yaml(&contents)
    }

    /// Load `explicit` if given, otherwise the first default location that
    /// exists, otherwise built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match find_config_file() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(analyzer) = overrides.analyzer {
            self.analyzer = analyzer;
        }
        if let Some(dir) = overrides.analyzer_dir {
            self.analyzer_dir = Some(dir);
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        self.print_unknown |= overrides.print_unknown;
        self
    }

    /// Path to execute. A bare program name is left for `PATH` lookup.
    pub fn analyzer_path(&self) -> PathBuf {
        let is_bare_name = self.analyzer.components().count() == 1 && self.analyzer.is_relative();
        match &self.analyzer_dir {
            Some(dir) if self.analyzer.is_relative() && !is_bare_name => dir.join(&self.analyzer),
            _ => self.analyzer.clone(),
        }
    }

    /// Check everything that can be checked before the first word is sent.
    /// The analyzer directory comes back absolute, since analyzer processes
    /// are started from inside it.
    pub fn validate(mut self, word_list: &Path) -> Result<Self, ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if let Some(dir) = &self.analyzer_dir {
            if !dir.is_dir() {
                return Err(ConfigError::NotADirectory(dir.clone()));
            }
            let absolute =
                fs::canonicalize(dir).map_err(|_| ConfigError::NotADirectory(dir.clone()))?;
            self.analyzer_dir = Some(absolute);
        }
        let analyzer = self.analyzer_path();
        let is_bare_name = analyzer.components().count() == 1 && analyzer.is_relative();
        if !is_bare_name && !analyzer.is_file() {
            return Err(ConfigError::MissingAnalyzer(analyzer));
        }
        if !word_list.is_file() {
            return Err(ConfigError::MissingWordList(word_list.to_path_buf()));
        }
        Ok(self)
    }
}

fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("config/latin-roots.yaml"),
        PathBuf::from("latin-roots.yaml"),
    ];
    candidates.into_iter().find(|p| p.exists())
}
