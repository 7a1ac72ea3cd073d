//! # Compiled Pattern Cache
//!
//! Configured regular expressions are compiled when the configuration is
//! checked and reused for every value they are applied to. A
//! [`PatternCache`] is owned by the query or validator that uses it, so
//! each implementation compiles only its own patterns.

use std::collections::HashMap;

use parking_lot::RwLock;
use regex::Regex;

/// Pattern source → compiled regex. Shared across threads.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled form of `pattern`, compiling and storing it on first use.
    pub fn get(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Some(re) = self.compiled.read().get(pattern) {
            return Ok(re.clone());
        }
        let re = Regex::new(pattern)?;
        self.compiled
            .write()
            .entry(pattern.to_string())
            .or_insert_with(|| re.clone());
        Ok(re)
    }

    /// Number of distinct patterns compiled so far.
    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
