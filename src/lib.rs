//! execstage: run a templated external command once, with cross-thread cancellation.
//!
//! The pieces, leaf-first:
//!
//! - [`env`] merges the inherited environment with ordered overlay pairs
//! - [`resolve`] expands `@{variables}` then `${placeholders}` and tokenizes the result
//! - [`process`] spawns the command, captures its output and supports `cancel()`
//! - [`stage`] sequences the above for each invocation
//!
//! ```no_run
//! use execstage::{CommandTemplate, EnvOverlay, ExecStage, PlaceholderRegistry, VariableStore};
//!
//! let vars: VariableStore = [("input", "data.csv")].into_iter().collect();
//! let mut stage = ExecStage::new(vars, PlaceholderRegistry::with_defaults());
//!
//! let template = CommandTemplate::new("wc -l @{input}").with_variables(true);
//! let result = stage.execute(&template, &EnvOverlay::new(), None);
//! if let Some(diagnostic) = result.diagnostic() {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod outcome;
pub mod process;
pub mod resolve;
pub mod stage;

#[cfg(test)]
mod test_support;

pub use env::EnvOverlay;
pub use error::{Result, StageError};
pub use outcome::ExecutionResult;
pub use process::{CancelHandle, ProcessController};
pub use resolve::{CommandTemplate, ExpandError, Expander, PlaceholderRegistry, VariableStore};
pub use stage::ExecStage;
