//! Static name → default-tags table used by [`assign_key_tags`](crate::assign_key_tags).
//!
//! Loaded once from the `tags` section of the verifier configuration and
//! read-only thereafter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default tags per key name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagTable {
    entries: HashMap<String, Vec<String>>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add default tags for a key name (appends to existing ones).
    pub fn insert<I, S>(&mut self, name: impl Into<String>, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(name.into())
            .or_default()
            .extend(tags.into_iter().map(Into::into));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<I, S>(mut self, name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(name, tags);
        self
    }

    pub fn tags_for(&self, name: &str) -> &[String] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
