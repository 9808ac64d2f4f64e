//! Literal path-segment exclusion.

use std::collections::BTreeSet;

/// Directory and file names that are never uploaded, at any depth.
///
/// Matching is by exact segment equality. `node_modules` excludes
/// `a/node_modules/x.js` but not `a/node_modules_old/x.js`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    names: BTreeSet<String>,
}

impl ExclusionSet {
    /// Creates an empty set (nothing excluded).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a segment name. Empty names are ignored.
    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() {
            self.names.insert(name);
        }
    }

    /// Returns true if `name` is a member of the set.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns true if any `/`-separated segment of `relative_path` is excluded.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        relative_path
            .split('/')
            .any(|segment| self.names.contains(segment))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}
