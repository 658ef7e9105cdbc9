//! Config loading, validation, and conversion into stage inputs.

use super::model::Config;
use crate::env::EnvOverlay;
use crate::error::{Result, StageError};
use crate::resolve::expand::is_valid_name;
use crate::resolve::{CommandTemplate, PlaceholderRegistry, VariableStore};
use std::path::{Path, PathBuf};

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the stage YAML file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(StageError::Io)` - The file could not be read
    /// * `Err(StageError::Config)` - Parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            StageError::Io(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| StageError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| StageError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `command` must not be blank
    /// - `env_vars` entries must be `KEY=VALUE` with a non-empty key
    /// - variable and placeholder names must be identifiers (`[A-Za-z_][A-Za-z0-9_.-]*`)
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(StageError::Config(
                "config validation failed: command must not be empty".to_string(),
            ));
        }

        for entry in &self.env_vars {
            match entry.split_once('=') {
                Some((key, _)) if !key.is_empty() => {}
                Some(_) => {
                    return Err(StageError::Config(format!(
                        "config validation failed: env_vars entry '{}' has an empty key",
                        entry
                    )));
                }
                None => {
                    return Err(StageError::Config(format!(
                        "config validation failed: env_vars entry '{}' must be KEY=VALUE",
                        entry
                    )));
                }
            }
        }

        for name in self.variables.keys() {
            if !is_valid_name(name) {
                return Err(StageError::Config(format!(
                    "config validation failed: invalid variable name '{}'",
                    name
                )));
            }
        }

        for name in self.placeholders.keys() {
            if !is_valid_name(name) {
                return Err(StageError::Config(format!(
                    "config validation failed: invalid placeholder name '{}'",
                    name
                )));
            }
        }

        Ok(())
    }

    /// The command template described by this config.
    pub fn template(&self) -> CommandTemplate {
        CommandTemplate::new(self.command.clone())
            .with_variables(self.resolve_variables)
            .with_placeholders(self.resolve_placeholders)
    }

    /// The environment overlay, in declaration order.
    pub fn overlay(&self) -> Result<EnvOverlay> {
        EnvOverlay::parse(&self.env_vars)
            .map_err(|e| StageError::Config(format!("invalid env_vars entry: {}", e)))
    }

    /// The configured working directory, `None` when empty.
    ///
    /// Placeholders in it are left for the stage to expand.
    pub fn working_directory(&self) -> Option<PathBuf> {
        if self.working_directory.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.working_directory))
        }
    }

    /// Variable store backing `@{name}` references.
    pub fn variable_store(&self) -> VariableStore {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Built-in placeholders plus the configured ones (configured win).
    pub fn placeholder_registry(&self) -> PlaceholderRegistry {
        let mut registry = PlaceholderRegistry::with_defaults();
        for (name, path) in &self.placeholders {
            registry.register(name.clone(), path.clone());
        }
        registry
    }

    /// Path of the NDJSON event log, if one is configured.
    pub fn events_path(&self) -> Option<PathBuf> {
        self.events_file
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }
}
