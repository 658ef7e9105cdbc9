//! Error types for the execution stage.
//!
//! Uses thiserror for derive macros. Every way an invocation can fail is a
//! variant of [`StageError`]; its `Display` output is the human-readable
//! diagnostic handed back inside `ExecutionResult::Failure`.

use crate::exit_codes;
use crate::resolve::ExpandError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which textual expansion pass failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionStage {
    /// Workflow variables (`@{name}`).
    Variable,
    /// Path placeholders (`${NAME}`).
    Placeholder,
}

impl fmt::Display for ExpansionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionStage::Variable => write!(f, "variable"),
            ExpansionStage::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// Main error type for stage operations.
#[derive(Error, Debug)]
pub enum StageError {
    /// A variable or placeholder could not be expanded.
    #[error("{stage} expansion failed: {source}")]
    Expansion {
        stage: ExpansionStage,
        #[source]
        source: ExpandError,
    },

    /// The expanded command line could not be split into arguments.
    #[error(
        "failed to parse command '{command}': {source}\nFix: check for unmatched quotes or invalid escape sequences."
    )]
    Tokenize {
        command: String,
        #[source]
        source: shell_words::ParseError,
    },

    /// The command line was blank after expansion.
    #[error("command is empty after parsing: '{0}'")]
    EmptyCommand(String),

    /// The configured working directory is missing or not a directory.
    #[error("working directory '{}' does not exist or is not a directory", .0.display())]
    WorkingDirectory(PathBuf),

    /// The OS refused to create the process.
    #[error("Failed to execute command: {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran to completion with a non-zero status.
    #[error("{}", render_exit(.code, .stdout, .stderr))]
    NonZeroExit {
        /// Exit code, or `None` when the process was terminated by a signal.
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The process was forcibly terminated by a cancel request.
    #[error("{}", render_cancelled(.stdout, .stderr))]
    Cancelled { stdout: String, stderr: String },

    /// Polling the child for its exit status failed.
    #[error("failed to check process status: {0}")]
    Wait(#[source] std::io::Error),

    /// Invalid stage configuration.
    #[error("{0}")]
    Config(String),

    /// Filesystem problem outside the child process (config file, event log).
    #[error("{0}")]
    Io(String),
}

impl StageError {
    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            StageError::Expansion { .. }
            | StageError::Tokenize { .. }
            | StageError::EmptyCommand(_)
            | StageError::WorkingDirectory(_)
            | StageError::Config(_)
            | StageError::Io(_) => exit_codes::USER_ERROR,
            StageError::NonZeroExit { .. } => exit_codes::COMMAND_FAILURE,
            StageError::Spawn { .. } | StageError::Wait(_) => exit_codes::SPAWN_FAILURE,
            StageError::Cancelled { .. } => exit_codes::CANCELLED,
        }
    }

    /// Short machine-friendly name of the failure kind, used in event logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Expansion { .. } => "expansion",
            StageError::Tokenize { .. } | StageError::EmptyCommand(_) => "tokenize",
            StageError::WorkingDirectory(_) => "working_directory",
            StageError::Spawn { .. } => "spawn",
            StageError::NonZeroExit { .. } => "non_zero_exit",
            StageError::Cancelled { .. } => "cancelled",
            StageError::Wait(_) => "wait",
            StageError::Config(_) => "config",
            StageError::Io(_) => "io",
        }
    }
}

/// Result type alias for stage operations.
pub type Result<T> = std::result::Result<T, StageError>;

fn render_exit(code: &Option<i32>, stdout: &str, stderr: &str) -> String {
    let mut out = match code {
        Some(code) => format!("Exit code: {}", code),
        None => "Process terminated by signal".to_string(),
    };
    append_streams(&mut out, stdout, stderr);
    out
}

fn render_cancelled(stdout: &str, stderr: &str) -> String {
    let mut out = "Process was cancelled".to_string();
    append_streams(&mut out, stdout, stderr);
    out
}

fn append_streams(out: &mut String, stdout: &str, stderr: &str) {
    if !stderr.trim().is_empty() {
        out.push_str("\n\nstderr:\n");
        out.push_str(stderr.trim_end());
    }
    if !stdout.trim().is_empty() {
        out.push_str("\n\nstdout:\n");
        out.push_str(stdout.trim_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_exit_has_correct_exit_code() {
        let err = StageError::NonZeroExit {
            code: Some(2),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), exit_codes::COMMAND_FAILURE);
    }

    #[test]
    fn cancelled_has_correct_exit_code() {
        let err = StageError::Cancelled {
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), exit_codes::CANCELLED);
    }

    #[test]
    fn working_directory_error_is_user_error() {
        let err = StageError::WorkingDirectory(PathBuf::from("/no/such/dir"));
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert_eq!(err.kind(), "working_directory");
        assert!(err.to_string().contains("/no/such/dir"));
    }

    #[test]
    fn spawn_error_has_correct_exit_code() {
        let err = StageError::Spawn {
            command: "missing-tool".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.exit_code(), exit_codes::SPAWN_FAILURE);
        assert_eq!(
            err.to_string(),
            "Failed to execute command: missing-tool: not found"
        );
    }

    #[test]
    fn expansion_error_names_the_stage() {
        let err = StageError::Expansion {
            stage: ExpansionStage::Placeholder,
            source: ExpandError::Unresolved {
                name: "DATA".to_string(),
            },
        };
        assert!(err.to_string().starts_with("placeholder expansion failed"));
        assert!(err.to_string().contains("DATA"));
    }

    #[test]
    fn exit_diagnostic_embeds_code_and_streams() {
        let err = StageError::NonZeroExit {
            code: Some(2),
            stdout: "partial result\n".to_string(),
            stderr: "boom\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Exit code: 2\n\nstderr:\nboom\n\nstdout:\npartial result"
        );
    }

    #[test]
    fn exit_diagnostic_omits_empty_streams() {
        let err = StageError::NonZeroExit {
            code: Some(7),
            stdout: String::new(),
            stderr: "  \n".to_string(),
        };
        assert_eq!(err.to_string(), "Exit code: 7");
    }

    #[test]
    fn cancelled_diagnostic_is_distinct_from_exit() {
        let err = StageError::Cancelled {
            stdout: "tick\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "Process was cancelled\n\nstdout:\ntick");
    }
}
