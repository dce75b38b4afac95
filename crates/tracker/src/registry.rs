use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A status image the user has already seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewedEntry {
    pub source_path: PathBuf,
    pub modified_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Ordered collection of viewed entries, unique by `source_path`.
///
/// The path index answers exactly what a linear scan over `entries` would;
/// both are only ever mutated together through [`Registry::insert`].
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<ViewedEntry>,
    paths: HashSet<PathBuf>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ViewedEntry] {
        &self.entries
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Append `entry` unless its path is already tracked.
    /// Returns false for a duplicate; the existing entry is left as is.
    pub fn insert(&mut self, entry: ViewedEntry) -> bool {
        if !self.paths.insert(entry.source_path.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Most recently modified first. Ties keep insertion order.
    pub fn sort_by_recency(&mut self) {
        self.entries.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
    }
}

impl FromIterator<ViewedEntry> for Registry {
    fn from_iter<I: IntoIterator<Item = ViewedEntry>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for entry in iter {
            registry.insert(entry);
        }
        registry
    }
}
