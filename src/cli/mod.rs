//! CLI argument parsing for execstage.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// execstage: run a templated external command once and report its outcome.
///
/// The command line may reference workflow variables (`@{name}`) and path
/// placeholders (`${NAME}`), expanded in that order when enabled.
#[derive(Parser, Debug)]
#[command(name = "execstage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for execstage.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve and run the command.
    ///
    /// Exits 0 on success, 2 if the command exits non-zero, 3 if it cannot
    /// be started and 4 if it was cancelled.
    Run(RunArgs),

    /// Resolve the command and print its arguments, one per line.
    ///
    /// Nothing is executed.
    Resolve(StageArgs),

    /// Print the default stage configuration as YAML.
    Config,
}

/// Options describing the stage, layered over an optional config file.
#[derive(Args, Debug, Default, Clone)]
pub struct StageArgs {
    /// Stage configuration file (YAML).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Command template to run (overrides the config file).
    #[arg(long = "cmd", value_name = "COMMAND")]
    pub command: Option<String>,

    /// Working directory for the command (overrides the config file).
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Environment variable to overlay; repeatable, later wins.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env_vars: Vec<String>,

    /// Workflow variable available as `@{NAME}`; repeatable.
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub variables: Vec<String>,

    /// Placeholder available as `${NAME}`; repeatable.
    #[arg(long = "placeholder", value_name = "NAME=VALUE")]
    pub placeholders: Vec<String>,

    /// Expand `@{name}` variables in the command.
    #[arg(long)]
    pub resolve_variables: bool,

    /// Expand `${NAME}` placeholders in the command.
    #[arg(long)]
    pub resolve_placeholders: bool,
}

/// Arguments for the `run` command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub stage: StageArgs,

    /// Cancel the command if it is still running after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub cancel_after: Option<u64>,

    /// Append execution events to this NDJSON file (overrides the config file).
    #[arg(long, value_name = "FILE")]
    pub events: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
