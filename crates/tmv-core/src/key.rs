//! # Key: Tagged, Property-Bearing Identifier
//!
//! A [`Key`] names a field in the document model. Tags drive rule
//! applicability and the reference grammar; properties are a side channel
//! for annotations written by the mapping engine and by verification.
//!
//! ## Identity Invariant
//!
//! Equality and hashing use the name only. Two keys with the same name and
//! different tags are equal. Mapping lookups depend on this.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known tag names.
pub mod tags {
    /// Marks the field that names its row.
    pub const ROW_IDENTIFIER: &str = "row-identifier";
    /// Suppresses default tags from the static tag table.
    pub const NO_DEFAULTS: &str = "no-defaults";
    /// Field must carry a value (non-default mandatory mode).
    pub const MANDATORY: &str = "mandatory";
    /// Field may be left empty.
    pub const NOT_MANDATORY: &str = "not-mandatory";
    /// Suffix of data-tags that mark the root of a data section.
    pub const DATA_SUFFIX: &str = "-data";
    /// Prefix of tags that bind a field to configured validators.
    pub const VALIDATE_PREFIX: &str = "validate-";
}

/// Well-known property names.
pub mod props {
    /// Friendly section name declared by a scheme key.
    pub const SECTION: &str = "section";
    /// Column header derived by `remove-header-row`.
    pub const COLNAME: &str = "colname";
    /// Template value that does not itself resolve as a reference.
    pub const TEMPLATE_PRE_APPROVED: &str = "templatePreApproved";
    /// Threat rows that cover an asset, cached on its storage-location key.
    pub const COVERING_THREATS: &str = "covering-threats";
    /// Validator outcomes written by the value-validity rule.
    pub const VALIDATION: &str = "validation";
}

/// A tagged dictionary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, Value>,
}

impl Key {
    /// Create an untagged key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Create a key carrying the given tags (duplicates suppressed).
    pub fn with_tags<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut key = Self::new(name);
        key.add_tags(tags);
        key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Tags that start with `prefix`.
    pub fn tags_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .map(String::as_str)
            .filter(move |t| t.starts_with(prefix))
    }

    /// Data-tags (`*-data`) carried by this key.
    pub fn data_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(String::as_str)
            .filter(|t| t.ends_with(tags::DATA_SUFFIX))
    }

    /// Append a tag. Returns `false` if the key already carried it.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Append several tags, skipping ones already present.
    pub fn add_tags<I, S>(&mut self, tags: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for tag in tags {
            if self.add_tag(tag) {
                added += 1;
            }
        }
        added
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// A property that holds a string.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// Set (or overwrite) a property.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Merge provenance or other string properties onto the key.
    pub fn merge_properties<'a, I>(&mut self, properties: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, value) in properties {
            self.properties
                .insert(name.clone(), Value::String(value.clone()));
        }
    }

    /// Friendly section name, if the scheme declared one.
    pub fn section(&self) -> Option<&str> {
        self.property_str(props::SECTION)
    }

    /// Column header, if `remove-header-row` derived one.
    pub fn column_name(&self) -> Option<&str> {
        self.property_str(props::COLNAME)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equal_names_are_equal_keys_regardless_of_tags() {
        let a = Key::with_tags("asset-name", ["row-identifier"]);
        let b = Key::new("asset-name");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn different_names_differ() {
        assert_ne!(Key::new("a"), Key::new("b"));
    }

    #[test]
    fn add_tag_suppresses_duplicates() {
        let mut key = Key::new("k");
        assert!(key.add_tag("x"));
        assert!(!key.add_tag("x"));
        assert_eq!(key.add_tags(["x", "y", "y"]), 1);
        assert_eq!(key.tags(), &["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn data_tags_filter_on_suffix() {
        let key = Key::with_tags("assets", ["assets-data", "mandatory", "legacy-data"]);
        let data: Vec<_> = key.data_tags().collect();
        assert_eq!(data, vec!["assets-data", "legacy-data"]);
    }

    #[test]
    fn tags_with_prefix() {
        let key = Key::with_tags("k", ["ref/assets-data/asset-name", "unique/a/b", "ref/x/y"]);
        assert_eq!(key.tags_with_prefix("ref/").count(), 2);
    }

    #[test]
    fn properties_round_trip() {
        let mut key = Key::new("assets");
        key.set_property(props::SECTION, "Assets");
        assert_eq!(key.section(), Some("Assets"));
        assert_eq!(key.column_name(), None);
        key.set_property(props::COLNAME, "Asset name");
        assert_eq!(key.column_name(), Some("Asset name"));
    }

    #[test]
    fn display_is_name() {
        assert_eq!(Key::with_tags("threat", ["t"]).to_string(), "threat");
    }
}
