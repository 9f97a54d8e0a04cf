//! Error types for the analyzer pipeline.
//!
//! Configuration problems abort the run before anything is dispatched.
//! Everything that can go wrong for a single word is a [`LookupError`] and
//! stays attached to that word's outcome.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Failure to run the external analyzer or to read what it printed.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("failed to start analyzer {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("analyzer exited with {status}: {stderr}")]
    NonZeroExit { status: ExitStatus, stderr: String },

    #[error("analyzer output is not valid UTF-8: {0}")]
    InvalidOutput(#[from] std::string::FromUtf8Error),
}

/// Analyzer output that the line classifier could not make sense of.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown part of speech: {0}")]
    UnknownPartOfSpeech(String),

    #[error("halted on input '{word}', line: {line}")]
    UnrecognizedLine { word: String, line: String },
}

/// Why a single word produced no result.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cancelled before the analyzer was invoked")]
    Cancelled,

    #[error("failed to start worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("worker thread panicked")]
    WorkerPanicked,
}

/// Invalid settings, detected before any word is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("analyzer not found: {0:?}")]
    MissingAnalyzer(PathBuf),

    #[error("analyzer directory must be a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("word list not found: {0:?}")]
    MissingWordList(PathBuf),

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Failure of the run as a whole.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_word_and_line() {
        let err = ParseError::UnrecognizedLine {
            word: "amo".to_string(),
            line: "???".to_string(),
        };
        assert_eq!(err.to_string(), "halted on input 'amo', line: ???");
    }

    #[test]
    fn lookup_error_is_transparent_over_parse_error() {
        let err: LookupError = ParseError::UnknownPartOfSpeech("VERB".to_string()).into();
        assert_eq!(err.to_string(), "unknown part of speech: VERB");
        assert!(matches!(err, LookupError::Parse(_)));
    }
}
