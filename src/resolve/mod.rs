//! Command resolution: template expansion and tokenizing.
//!
//! This module provides:
//!
//! - **Expand**: the [`Expander`] trait and the two built-in expanders
//!   (`@{name}` workflow variables, `${NAME}` path placeholders)
//! - **Command**: [`CommandTemplate`] and the [`resolve`] pipeline that turns
//!   a template into an argument vector

mod command;
pub mod expand;

pub use command::{CommandTemplate, resolve, resolve_directory, tokenize};
pub use expand::{ExpandError, Expander, PlaceholderRegistry, VariableStore};
