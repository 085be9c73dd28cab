//! Exclusion rules for snapshots.
//!
//! Excluded paths never enter the snapshot graph. A path is excluded when its
//! file name matches a name pattern, or when it lies under one of the
//! excluded roots (the store directory is always one of them). The builder
//! never descends into an excluded directory, so its contents are skipped too.
//!
//! Patterns are matched against the file name: an exact name
//! (`.git`), a suffix (`*.tmp`) or a prefix (`scratch*`).

use std::path::{Path, PathBuf};

/// Built-in patterns applied when configuration names none.
pub const BUILTIN_DEFAULTS: &[&str] = &[".git"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    Suffix(String),
    Prefix(String),
}

impl Pattern {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_end_matches('/');
        if raw.is_empty() || raw.starts_with('#') {
            return None;
        }
        if let Some(suffix) = raw.strip_prefix('*') {
            Some(Pattern::Suffix(suffix.to_string()))
        } else if let Some(prefix) = raw.strip_suffix('*') {
            Some(Pattern::Prefix(prefix.to_string()))
        } else {
            Some(Pattern::Exact(raw.to_string()))
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Exact(exact) => name == exact,
            Pattern::Suffix(suffix) => name.ends_with(suffix.as_str()),
            Pattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    patterns: Vec<Pattern>,
    roots: Vec<PathBuf>,
}

impl ExcludeRules {
    /// Build rules from pattern strings; blank lines and `#` comments are skipped.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .filter_map(|p| Pattern::parse(p.as_ref()))
                .collect(),
            roots: Vec::new(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_DEFAULTS)
    }

    /// Exclude everything at or below `root`.
    pub fn with_excluded_root(mut self, root: PathBuf) -> Self {
        self.roots.push(root);
        self
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.roots.iter().any(|root| path.starts_with(root)) {
            return true;
        }
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.patterns.iter().any(|p| p.matches(name)))
    }
}
