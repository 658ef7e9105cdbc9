//! Command template resolution.
//!
//! A raw command line goes through up to two expansion passes and is then
//! split into an argument vector:
//!
//! 1. workflow variables (if `resolve_variables`)
//! 2. placeholders (if `resolve_placeholders`), after which every `\` in the
//!    text becomes `/`
//! 3. shell-style tokenizing via `shell-words`
//!
//! The pass order is fixed. A variable may expand to text containing a
//! placeholder; placeholder output is never scanned for variables.

use super::expand::{ExpandError, Expander};
use crate::error::{ExpansionStage, Result, StageError};
use std::path::{Path, PathBuf};

/// Raw command line plus the expansion passes that apply to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
    resolve_variables: bool,
    resolve_placeholders: bool,
}

impl CommandTemplate {
    /// A template with no expansion passes enabled.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            resolve_variables: false,
            resolve_placeholders: false,
        }
    }

    pub fn with_variables(mut self, enabled: bool) -> Self {
        self.resolve_variables = enabled;
        self
    }

    pub fn with_placeholders(mut self, enabled: bool) -> Self {
        self.resolve_placeholders = enabled;
        self
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn resolves_variables(&self) -> bool {
        self.resolve_variables
    }

    pub fn resolves_placeholders(&self) -> bool {
        self.resolve_placeholders
    }

    /// Run the enabled expansion passes, returning the final command line.
    pub fn expand<V, P>(&self, variables: &V, placeholders: &P) -> Result<String>
    where
        V: Expander + ?Sized,
        P: Expander + ?Sized,
    {
        let mut text = self.raw.clone();

        if self.resolve_variables {
            text = variables
                .expand(&text)
                .map_err(|source| StageError::Expansion {
                    stage: ExpansionStage::Variable,
                    source,
                })?;
        }

        if self.resolve_placeholders {
            text = placeholders
                .expand(&text)
                .map_err(placeholder_error)?
                .replace('\\', "/");
        }

        Ok(text)
    }
}

fn placeholder_error(source: ExpandError) -> StageError {
    StageError::Expansion {
        stage: ExpansionStage::Placeholder,
        source,
    }
}

/// Expand `template` and split it into an argument vector.
pub fn resolve<V, P>(
    template: &CommandTemplate,
    variables: &V,
    placeholders: &P,
) -> Result<Vec<String>>
where
    V: Expander + ?Sized,
    P: Expander + ?Sized,
{
    let text = template.expand(variables, placeholders)?;
    tokenize(&text)
}

/// Expand placeholders in a working directory path.
///
/// Placeholders are always expanded here, and `\` becomes `/` as in the
/// command's placeholder pass. An empty path stays empty. A path that is not
/// valid UTF-8 cannot contain placeholders and is returned unchanged.
pub fn resolve_directory<P>(dir: &Path, placeholders: &P) -> Result<PathBuf>
where
    P: Expander + ?Sized,
{
    let Some(text) = dir.to_str() else {
        return Ok(dir.to_path_buf());
    };
    if text.is_empty() {
        return Ok(PathBuf::new());
    }

    let expanded = placeholders
        .expand(text)
        .map_err(placeholder_error)?
        .replace('\\', "/");
    Ok(PathBuf::from(expanded))
}

/// Split a command line into arguments using shell quoting rules.
pub fn tokenize(command: &str) -> Result<Vec<String>> {
    let args = shell_words::split(command).map_err(|source| StageError::Tokenize {
        command: command.to_string(),
        source,
    })?;

    if args.is_empty() {
        return Err(StageError::EmptyCommand(command.to_string()));
    }

    Ok(args)
}
