//! Terminal outcome of one stage invocation.

use crate::error::{Result, StageError};

/// Result of executing a command: silent success or a failure with a diagnostic.
///
/// Produced exactly once per invocation and handed to the caller.
#[must_use]
#[derive(Debug)]
pub enum ExecutionResult {
    Success,
    Failure(StageError),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success)
    }

    /// The failure cause, if any.
    pub fn error(&self) -> Option<&StageError> {
        match self {
            ExecutionResult::Success => None,
            ExecutionResult::Failure(err) => Some(err),
        }
    }

    /// Human-readable failure message, `None` on success.
    pub fn diagnostic(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            ExecutionResult::Success => Ok(()),
            ExecutionResult::Failure(err) => Err(err),
        }
    }
}

impl From<Result<()>> for ExecutionResult {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => ExecutionResult::Success,
            Err(err) => ExecutionResult::Failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_success_has_no_diagnostic() {
        let result = ExecutionResult::Success;
        assert!(result.is_success());
        assert!(result.diagnostic().is_none());
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_failure_diagnostic_is_error_display() {
        let result = ExecutionResult::from(Err(StageError::WorkingDirectory(PathBuf::from(
            "/missing",
        ))));
        assert!(!result.is_success());
        assert_eq!(
            result.diagnostic().unwrap(),
            "working directory '/missing' does not exist or is not a directory"
        );
        assert!(matches!(
            result.into_result(),
            Err(StageError::WorkingDirectory(_))
        ));
    }
}
