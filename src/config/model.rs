//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default command, matching the stage's out-of-the-box behavior.
pub const DEFAULT_COMMAND: &str = "ls -l .";

/// Configuration for one execution stage.
///
/// This struct represents the contents of a stage YAML file.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Command settings
    // =========================================================================
    /// The external command to run.
    #[serde(default = "default_command")]
    pub command: String,

    /// Whether `@{name}` workflow variables in `command` are expanded.
    #[serde(default)]
    pub resolve_variables: bool,

    /// Whether `${NAME}` placeholders in `command` are expanded.
    #[serde(default)]
    pub resolve_placeholders: bool,

    // =========================================================================
    // Process settings
    // =========================================================================
    /// Working directory for the command; empty inherits the caller's.
    #[serde(default)]
    pub working_directory: String,

    /// Environment variables (`KEY=VALUE`) overlaid on the inherited ones, in order.
    #[serde(default)]
    pub env_vars: Vec<String>,

    // =========================================================================
    // Expansion sources
    // =========================================================================
    /// Workflow variables available to `@{name}` references.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,

    /// Extra placeholders, added to the built-in `HOME`, `TMP` and `CWD`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub placeholders: BTreeMap<String, String>,

    // =========================================================================
    // Audit settings
    // =========================================================================
    /// NDJSON file to append execution events to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: default_command(),
            resolve_variables: false,
            resolve_placeholders: false,
            working_directory: String::new(),
            env_vars: Vec::new(),
            variables: BTreeMap::new(),
            placeholders: BTreeMap::new(),
            events_file: None,
        }
    }
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}
