//! Per-entry eligibility rules.
//!
//! [`FilterPolicy::decide`] is a pure function of an entry's root-relative
//! match key, its kind and its detected media type. The walker in the parent
//! module composes the decisions.

use mime_guess::{mime, Mime};
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path};

use crate::config::CrawlConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// Why a path was not indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    UnknownType,
    NotText(String),
    NotRegularFile,
    Denylisted(String),
    PackagedBinary(String),
    /// Directory pruned with everything below it.
    Pruned(String),
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownType => write!(f, "unknown content type"),
            SkipReason::NotText(mime) => write!(f, "not text ({})", mime),
            SkipReason::NotRegularFile => write!(f, "not a regular file"),
            SkipReason::Denylisted(pattern) => write!(f, "path matches '{}'", pattern),
            SkipReason::PackagedBinary(ext) => write!(f, "packaged binary ({})", ext),
            SkipReason::Pruned(pattern) => write!(f, "subtree pruned by '{}'", pattern),
            SkipReason::Unreadable(message) => write!(f, "unreadable: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Descend,
    SkipSubtree(String),
    Include,
    Exclude(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
    prune_patterns: Vec<String>,
    packaged_extensions: Vec<String>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlConfig::default())
    }
}

impl FilterPolicy {
    pub fn new(prune_patterns: Vec<String>, packaged_extensions: Vec<String>) -> Self {
        Self {
            prune_patterns,
            packaged_extensions,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.prune_patterns.clone(), config.packaged_extensions.clone())
    }

    pub fn decide(&self, key: &str, kind: EntryKind, detected: Option<&Mime>) -> Decision {
        if kind == EntryKind::Directory {
            return match self.denylisted(key) {
                Some(pattern) => Decision::SkipSubtree(pattern.to_string()),
                None => Decision::Descend,
            };
        }

        let mime = match detected {
            Some(mime) => mime,
            None => return Decision::Exclude(SkipReason::UnknownType),
        };
        if mime.type_() != mime::TEXT {
            return Decision::Exclude(SkipReason::NotText(mime.essence_str().to_string()));
        }
        if let Some(pattern) = self.denylisted(key) {
            return Decision::Exclude(SkipReason::Denylisted(pattern.to_string()));
        }
        if let Some(ext) = self.packaged_extensions.iter().find(|ext| key.ends_with(ext.as_str())) {
            return Decision::Exclude(SkipReason::PackagedBinary(ext.clone()));
        }
        Decision::Include
    }

    fn denylisted(&self, key: &str) -> Option<&str> {
        self.prune_patterns
            .iter()
            .find(|pattern| key.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

/// Root-relative key the rules are matched against: `/`-separated with a
/// leading `/`, and a trailing `/` for directories (so `/out/` matches a
/// directory named `out`).
/// The root's own location never takes part in matching.
pub fn match_key(root: &Path, path: &Path, kind: EntryKind) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut key = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            key.push('/');
            key.push_str(&part.to_string_lossy());
        }
    }
    if kind == EntryKind::Directory {
        key.push('/');
    }
    key
}
