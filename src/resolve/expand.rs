//! Textual expansion passes applied to command templates.
//!
//! Two reference syntaxes are supported, each handled by its own expander:
//!
//! - `@{name}` - workflow variables ([`VariableStore`])
//! - `${NAME}` - path placeholders ([`PlaceholderRegistry`])
//!
//! Any `Fn(&str) -> Result<String, ExpandError>` is also an [`Expander`], so
//! the owning workflow can inject its own lookups.
//!
//! # Error Handling
//!
//! Unknown names are an error rather than silently expanding to nothing.
//! A sigil that is not followed by `{` is literal text.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Sigil introducing a workflow variable reference.
pub const VARIABLE_SIGIL: char = '@';

/// Sigil introducing a placeholder reference.
pub const PLACEHOLDER_SIGIL: char = '$';

static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("Invalid reference name regex")
});

/// Returns true if `name` is usable as a variable or placeholder name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

/// Error type for expansion failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// A reference named something the lookup does not know.
    #[error("unresolved reference '{name}'")]
    Unresolved { name: String },

    /// A `{` opened a reference that was never closed.
    #[error("unterminated reference starting at position {position}")]
    Unterminated { position: usize },

    /// A reference with nothing between the braces.
    #[error("empty reference name at position {position}")]
    EmptyName { position: usize },

    /// Failure reported by a caller-supplied expander.
    #[error("{0}")]
    Custom(String),
}

/// A single textual expansion pass.
pub trait Expander {
    fn expand(&self, text: &str) -> Result<String, ExpandError>;
}

impl<F> Expander for F
where
    F: Fn(&str) -> Result<String, ExpandError>,
{
    fn expand(&self, text: &str) -> Result<String, ExpandError> {
        self(text)
    }
}

/// Replace every `<sigil>{name}` in `text` with `lookup(name)`.
///
/// Names are trimmed before lookup. Substituted values are not re-scanned.
pub fn substitute<F>(text: &str, sigil: char, lookup: F) -> Result<String, ExpandError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        if ch != sigil || !matches!(chars.peek(), Some((_, '{'))) {
            result.push(ch);
            continue;
        }
        chars.next(); // the '{'

        let mut name = String::new();
        loop {
            match chars.next() {
                Some((_, '}')) => break,
                Some((_, c)) => name.push(c),
                None => return Err(ExpandError::Unterminated { position: pos }),
            }
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(ExpandError::EmptyName { position: pos });
        }

        match lookup(name) {
            Some(value) => result.push_str(&value),
            None => {
                return Err(ExpandError::Unresolved {
                    name: name.to_string(),
                });
            }
        }
    }

    Ok(result)
}

/// Workflow-scoped variable values, expanded from `@{name}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    values: BTreeMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for VariableStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (k, v) in iter {
            store.set(k, v);
        }
        store
    }
}

impl Expander for VariableStore {
    fn expand(&self, text: &str) -> Result<String, ExpandError> {
        substitute(text, VARIABLE_SIGIL, |name| self.values.get(name).cloned())
    }
}

/// Named path macros, expanded from `${NAME}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderRegistry {
    paths: BTreeMap<String, String>,
}

impl PlaceholderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with `HOME`, `TMP` and `CWD`.
    ///
    /// `CWD` is captured once, at construction.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            registry.register("HOME", home.to_string_lossy());
        }
        registry.register("TMP", std::env::temp_dir().to_string_lossy());
        if let Ok(cwd) = std::env::current_dir() {
            registry.register("CWD", cwd.to_string_lossy());
        }
        registry
    }

    /// Register or replace a placeholder.
    pub fn register(&mut self, name: impl Into<String>, path: impl Into<String>) {
        self.paths.insert(name.into(), path.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.paths.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }
}

impl Expander for PlaceholderRegistry {
    fn expand(&self, text: &str) -> Result<String, ExpandError> {
        substitute(text, PLACEHOLDER_SIGIL, |name| self.paths.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "a" => Some("A".to_string()),
            "dir" => Some("/data/in".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_substitute_plain_text() {
        assert_eq!(substitute("ls -l .", '@', lookup).unwrap(), "ls -l .");
        assert_eq!(substitute("", '@', lookup).unwrap(), "");
    }

    #[test]
    fn test_substitute_references() {
        let out = substitute("cp @{dir}/x.csv @{a}", '@', lookup).unwrap();
        assert_eq!(out, "cp /data/in/x.csv A");
    }

    #[test]
    fn test_substitute_trims_names() {
        assert_eq!(substitute("@{ a }", '@', lookup).unwrap(), "A");
    }

    #[test]
    fn test_lone_sigil_is_literal() {
        assert_eq!(
            substitute("mail user@host $HOME @ {a}", '@', lookup).unwrap(),
            "mail user@host $HOME @ {a}"
        );
    }

    #[test]
    fn test_other_sigil_untouched() {
        assert_eq!(substitute("${a} @{a}", '@', lookup).unwrap(), "${a} A");
    }

    #[test]
    fn test_unresolved_reference() {
        let err = substitute("echo @{missing}", '@', lookup).unwrap_err();
        assert_eq!(
            err,
            ExpandError::Unresolved {
                name: "missing".to_string()
            }
        );
        assert_eq!(err.to_string(), "unresolved reference 'missing'");
    }

    #[test]
    fn test_unterminated_reference() {
        let err = substitute("echo @{a", '@', lookup).unwrap_err();
        assert_eq!(err, ExpandError::Unterminated { position: 5 });
    }

    #[test]
    fn test_empty_reference() {
        let err = substitute("echo ${}", '$', lookup).unwrap_err();
        assert_eq!(err, ExpandError::EmptyName { position: 5 });
    }

    #[test]
    fn test_values_not_rescanned() {
        let out = substitute("@{v}", '@', |_| Some("@{v}".to_string())).unwrap();
        assert_eq!(out, "@{v}");
    }

    #[test]
    fn test_variable_store_expands() {
        let store: VariableStore = [("input", "a.csv"), ("count", "3")].into_iter().collect();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.expand("head -n @{count} @{input}").unwrap(),
            "head -n 3 a.csv"
        );
        assert!(store.expand("${input}").is_ok());
    }

    #[test]
    fn test_placeholder_registry_expands() {
        let mut registry = PlaceholderRegistry::new();
        registry.register("DATA", "/srv/data");
        assert_eq!(registry.expand("ls ${DATA}/raw").unwrap(), "ls /srv/data/raw");
        assert!(matches!(
            registry.expand("ls ${NOPE}"),
            Err(ExpandError::Unresolved { .. })
        ));
    }

    #[test]
    fn test_placeholder_defaults() {
        let registry = PlaceholderRegistry::with_defaults();
        let tmp = std::env::temp_dir().to_string_lossy().to_string();
        assert_eq!(registry.get("TMP"), Some(tmp.as_str()));
        assert!(registry.get("CWD").is_some());
        assert!(registry.names().any(|n| n == "TMP"));
    }

    #[test]
    fn test_closure_is_expander() {
        let upper = |text: &str| -> Result<String, ExpandError> { Ok(text.to_uppercase()) };
        assert_eq!(upper.expand("abc").unwrap(), "ABC");
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("HOME"));
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("flow.input-dir_2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("2fast"));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name("a}b"));
    }
}
