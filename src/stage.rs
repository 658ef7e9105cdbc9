//! The execution stage: resolve a command template and run it once.
//!
//! Each call to [`ExecStage::execute`] builds the child environment, resolves
//! the template into an argument vector, expands placeholders in the working
//! directory, validates it and runs the process. The first failing step
//! short-circuits the rest, so a template that does not resolve never spawns
//! anything.
//!
//! The owning workflow supplies the two expanders and may stop a running
//! invocation from another thread through [`ExecStage::cancel_handle`].

use crate::env::{self, EnvOverlay};
use crate::error::Result;
use crate::outcome::ExecutionResult;
use crate::process::{CancelHandle, ProcessController};
use crate::resolve::{CommandTemplate, Expander, resolve, resolve_directory};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Command-execution stage parameterized by its variable and placeholder expanders.
#[derive(Debug)]
pub struct ExecStage<V, P> {
    variables: V,
    placeholders: P,
    controller: ProcessController,
}

impl<V, P> ExecStage<V, P>
where
    V: Expander,
    P: Expander,
{
    pub fn new(variables: V, placeholders: P) -> Self {
        Self {
            variables,
            placeholders,
            controller: ProcessController::new(),
        }
    }

    /// Handle for stopping the current invocation from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.controller.cancel_handle()
    }

    /// Stop the current invocation, if any. A no-op when idle.
    pub fn cancel(&self) {
        self.controller.cancel();
    }

    pub fn variables(&self) -> &V {
        &self.variables
    }

    pub fn placeholders(&self) -> &P {
        &self.placeholders
    }

    /// Resolve a template to its argument vector without running it.
    pub fn resolve(&self, template: &CommandTemplate) -> Result<Vec<String>> {
        resolve(template, &self.variables, &self.placeholders)
    }

    /// Expand placeholders in a working directory path.
    pub fn resolve_working_directory(&self, cwd: Option<&Path>) -> Result<Option<PathBuf>> {
        cwd.map(|dir| resolve_directory(dir, &self.placeholders)).transpose()
    }

    /// Run `template` once and report its outcome.
    ///
    /// Placeholders in `cwd` are expanded before it is checked.
    ///
    /// A cancel request made at any point after this call starts is honored,
    /// including one made while the template is still being resolved.
    pub fn execute(
        &mut self,
        template: &CommandTemplate,
        overlay: &EnvOverlay,
        cwd: Option<&Path>,
    ) -> ExecutionResult {
        let start_time = Instant::now();
        let invocation = self.controller.begin();

        let env = env::build(overlay);
        let argv = match resolve(template, &self.variables, &self.placeholders) {
            Ok(argv) => argv,
            Err(err) => {
                tracing::warn!(
                    command = template.raw(),
                    error = %err,
                    "command resolution failed"
                );
                return ExecutionResult::Failure(err);
            }
        };
        tracing::debug!(?argv, overlay = overlay.len(), "resolved command");

        let cwd = match cwd.map(|dir| resolve_directory(dir, &self.placeholders)) {
            Some(Ok(dir)) => Some(dir),
            None => None,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "working directory resolution failed");
                return ExecutionResult::Failure(err);
            }
        };

        let result = invocation.run(&argv, &env, cwd.as_deref());

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        let command = shell_words::join(&argv);
        match result.error() {
            None => tracing::info!(%command, elapsed_ms, "command succeeded"),
            Some(err) => tracing::warn!(%command, kind = err.kind(), elapsed_ms, "command failed"),
        }
        result
    }
}
