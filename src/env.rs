//! Environment composition for spawned commands.
//!
//! The child environment is a full copy of the inherited process environment
//! with an ordered list of overlay pairs applied on top. Later pairs win over
//! earlier ones, and any overlay wins over an inherited value.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;

/// Environment handed to a child process.
///
/// Keys and values are OS strings so inherited variables that are not valid
/// UTF-8 pass through untouched.
pub type EnvMap = BTreeMap<OsString, OsString>;

/// Ordered environment overlay: `(key, value)` pairs applied last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    pairs: Vec<(String, String)>,
}

/// Error returned when a `KEY=VALUE` string has no `=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSeparator(pub String);

impl fmt::Display for MissingSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected KEY=VALUE, got '{}'", self.0)
    }
}

impl std::error::Error for MissingSeparator {}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair. Duplicates are kept; the last one wins at build time.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Append a pair, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Parse a list of `KEY=VALUE` strings, splitting at the first `=`.
    ///
    /// Keys are not validated here; an entry like `=value` yields an empty key.
    pub fn parse<I, S>(entries: I) -> Result<Self, MissingSeparator>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overlay = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| MissingSeparator(entry.to_string()))?;
            overlay.push(key, value);
        }
        Ok(overlay)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

impl<K, V> FromIterator<(K, V)> for EnvOverlay
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Build the child environment from the current process environment.
pub fn build(overlay: &EnvOverlay) -> EnvMap {
    build_from(std::env::vars_os(), overlay)
}

/// Build a child environment from an explicit base.
pub fn build_from<I>(base: I, overlay: &EnvOverlay) -> EnvMap
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut env: EnvMap = base.into_iter().collect();
    for (key, value) in &overlay.pairs {
        env.insert(OsString::from(key), OsString::from(value));
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(pairs: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
        pairs
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }

    fn get<'a>(env: &'a EnvMap, key: &str) -> Option<&'a str> {
        env.get(&OsString::from(key)).and_then(|v| v.to_str())
    }

    #[test]
    fn test_empty_overlay_copies_base() {
        let env = build_from(base(&[("PATH", "/bin"), ("HOME", "/home/a")]), &EnvOverlay::new());
        assert_eq!(env.len(), 2);
        assert_eq!(get(&env, "PATH"), Some("/bin"));
        assert_eq!(get(&env, "HOME"), Some("/home/a"));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let overlay = EnvOverlay::new()
            .with("MODE", "first")
            .with("OTHER", "x")
            .with("MODE", "second")
            .with("MODE", "third");
        let env = build_from(Vec::new(), &overlay);
        assert_eq!(get(&env, "MODE"), Some("third"));
        assert_eq!(get(&env, "OTHER"), Some("x"));
    }

    #[test]
    fn test_overlay_wins_over_inherited() {
        let overlay = EnvOverlay::new().with("PATH", "/opt/tools/bin");
        let env = build_from(base(&[("PATH", "/bin"), ("LANG", "C")]), &overlay);
        assert_eq!(get(&env, "PATH"), Some("/opt/tools/bin"));
        assert_eq!(get(&env, "LANG"), Some("C"));
    }

    #[test]
    fn test_no_validation_of_keys_or_values() {
        let overlay = EnvOverlay::new().with("", "empty key").with("WEIRD KEY", "");
        let env = build_from(Vec::new(), &overlay);
        assert_eq!(get(&env, ""), Some("empty key"));
        assert_eq!(get(&env, "WEIRD KEY"), Some(""));
    }

    #[test]
    fn test_build_is_deterministic() {
        let overlay = EnvOverlay::new().with("A", "1").with("B", "2");
        let first = build_from(base(&[("C", "3")]), &overlay);
        let second = build_from(base(&[("C", "3")]), &overlay);
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_starts_from_process_environment() {
        let env = build(&EnvOverlay::new());
        for (key, value) in std::env::vars_os() {
            assert_eq!(env.get(&key), Some(&value));
        }
    }

    #[test]
    fn test_parse_splits_at_first_equals() {
        let overlay = EnvOverlay::parse(["OPTS=-Dx=1 -Dy=2", "EMPTY="]).unwrap();
        assert_eq!(
            overlay.pairs(),
            &[
                ("OPTS".to_string(), "-Dx=1 -Dy=2".to_string()),
                ("EMPTY".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        let err = EnvOverlay::parse(["GOOD=1", "BAD"]).unwrap_err();
        assert_eq!(err, MissingSeparator("BAD".to_string()));
        assert_eq!(err.to_string(), "expected KEY=VALUE, got 'BAD'");
    }

    #[test]
    fn test_from_iterator_keeps_order() {
        let overlay: EnvOverlay = [("K", "1"), ("K", "2")].into_iter().collect();
        assert_eq!(overlay.len(), 2);
        let env = build_from(Vec::new(), &overlay);
        assert_eq!(get(&env, "K"), Some("2"));
    }
}
