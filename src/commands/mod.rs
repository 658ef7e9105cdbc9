//! Command implementations for execstage.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, and the shared step that layers command-line options
//! over a stage config file.

mod run;

use crate::cli::{Command, StageArgs};
use execstage::config::Config;
use execstage::error::{Result, StageError};
use execstage::resolve::expand::is_valid_name;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => run::cmd_run(args),
        Command::Resolve(args) => cmd_resolve(&args),
        Command::Config => cmd_config(),
    }
}

/// Print the resolved argument vector, one argument per line.
fn cmd_resolve(args: &StageArgs) -> Result<()> {
    let config = build_config(args)?;
    let stage = run::stage_from(&config);

    for arg in stage.resolve(&config.template())? {
        println!("{}", arg);
    }
    Ok(())
}

/// Print the default config, ready to be saved and edited.
fn cmd_config() -> Result<()> {
    print!("{}", Config::default().to_yaml()?);
    Ok(())
}

/// Load the config file (or defaults) and apply command-line overrides.
///
/// `--cmd` and `--cwd` replace the file's values, `--env` entries are
/// appended after the file's, `--var`/`--placeholder` entries win over the
/// file's, and the resolve flags can only be switched on.
pub(crate) fn build_config(args: &StageArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(command) = &args.command {
        config.command = command.clone();
    }
    if let Some(cwd) = &args.cwd {
        config.working_directory = cwd.clone();
    }
    config.env_vars.extend(args.env_vars.iter().cloned());

    for entry in &args.variables {
        let (name, value) = parse_assignment(entry, "--var")?;
        config.variables.insert(name, value);
    }
    for entry in &args.placeholders {
        let (name, value) = parse_assignment(entry, "--placeholder")?;
        config.placeholders.insert(name, value);
    }

    config.resolve_variables |= args.resolve_variables;
    config.resolve_placeholders |= args.resolve_placeholders;

    config.validate()?;
    Ok(config)
}

/// Split a `NAME=VALUE` option at the first `=`.
fn parse_assignment(entry: &str, flag: &str) -> Result<(String, String)> {
    let (name, value) = entry.split_once('=').ok_or_else(|| {
        StageError::Config(format!("{} expects NAME=VALUE, got '{}'", flag, entry))
    })?;

    if !is_valid_name(name) {
        return Err(StageError::Config(format!(
            "{} has an invalid name '{}'",
            flag, name
        )));
    }

    Ok((name.to_string(), value.to_string()))
}
