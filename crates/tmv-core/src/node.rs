//! # Document Model: Owned Tree
//!
//! The mapping engine produces an owned [`Node`] tree: ordered mappings
//! keyed by [`Key`], ordered sequences, and [`Text`] leaves. A
//! [`Document`](crate::Document) interns a finished tree into an arena for
//! the verification passes.
//!
//! ## Provenance
//!
//! A [`Text`] may carry provenance properties (e.g. a source locator).
//! Operations that derive new text from old keep the properties via
//! [`Text::map`]. Serialization writes the bare value only, so every model
//! remains plain JSON once provenance is stripped.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::key::Key;

/// Raw-content convention: an object with this member is a text leaf whose
/// remaining string members are provenance properties.
pub const RAW_TEXT_MEMBER: &str = "#text";

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// A string leaf with optional provenance properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text {
    value: String,
    properties: BTreeMap<String, String>,
}

impl Text {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_properties(value: impl Into<String>, properties: BTreeMap<String, String>) -> Self {
        Self {
            value: value.into(),
            properties,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn has_provenance(&self) -> bool {
        !self.properties.is_empty()
    }

    /// Derive new text from this one, keeping the provenance properties.
    pub fn map<F>(&self, f: F) -> Text
    where
        F: FnOnce(&str) -> String,
    {
        Text {
            value: f(&self.value),
            properties: self.properties.clone(),
        }
    }

    /// The same value without provenance.
    pub fn plain(&self) -> Text {
        Text::new(self.value.clone())
    }

    pub fn into_parts(self) -> (String, BTreeMap<String, String>) {
        (self.value, self.properties)
    }

    /// Empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for Text {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// An insertion-ordered mapping from [`Key`] to [`Node`].
///
/// Lookups go by key name. Inserting under an existing name keeps the
/// original key (and its tags) and replaces only the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(Key, Node)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a value. Returns the previous value stored under the name.
    pub fn insert(&mut self, key: Key, value: Node) -> Option<Node> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(k, _)| k.name() == name)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.name() == name)
            .map(|(_, v)| v)
    }

    pub fn get_key(&self, name: &str) -> Option<&Key> {
        self.entries
            .iter()
            .find(|(k, _)| k.name() == name)
            .map(|(k, _)| k)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entry at a column position.
    pub fn get_index(&self, index: usize) -> Option<(&Key, &Node)> {
        self.entries.get(index).map(|(k, v)| (k, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Node)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Mutable access to keys and values. Renaming a key through this
    /// iterator is the caller's responsibility to keep names unique.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&mut Key, &mut Node)> {
        self.entries.iter_mut().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Node> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.entries.iter_mut().map(|(_, v)| v)
    }
}

impl FromIterator<(Key, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Key, Node)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

impl IntoIterator for Mapping {
    type Item = (Key, Node);
    type IntoIter = std::vec::IntoIter<(Key, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k.name(), v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A document model node.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Node {
    /// Absent value.
    #[default]
    Null,
    Text(Text),
    List(Vec<Node>),
    Map(Mapping),
}

impl Node {
    /// Plain text leaf.
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(Text::new(value))
    }

    /// Node kind, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Text(_) => "text",
            Node::List(_) => "list",
            Node::Map(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_text().map(Text::as_str)
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Absent, blank text, or an empty collection.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Node::Null => true,
            Node::Text(t) => t.is_blank(),
            Node::List(items) => items.is_empty(),
            Node::Map(m) => m.is_empty(),
        }
    }

    /// Render the node as a single text leaf.
    ///
    /// Lists and mappings are joined line by line. Provenance survives only
    /// when the rendering comes from exactly one text leaf.
    pub fn render_text(&self) -> Option<Text> {
        match self {
            Node::Null => None,
            Node::Text(t) => Some(t.clone()),
            Node::List(_) | Node::Map(_) => {
                let leaves = self.leaf_texts();
                match leaves.as_slice() {
                    [] => Some(Text::default()),
                    [single] => Some((*single).clone()),
                    many => Some(Text::new(
                        many.iter()
                            .map(|t| t.as_str())
                            .collect::<Vec<_>>()
                            .join("\n"),
                    )),
                }
            }
        }
    }

    /// All text leaves in document order.
    pub fn leaf_texts(&self) -> Vec<&Text> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Text>) {
        match self {
            Node::Null => {}
            Node::Text(t) => out.push(t),
            Node::List(items) => items.iter().for_each(|n| n.collect_leaves(out)),
            Node::Map(m) => m.values().for_each(|n| n.collect_leaves(out)),
        }
    }

    /// Convert extracted JSON content into raw content.
    ///
    /// Scalars become text. An object containing [`RAW_TEXT_MEMBER`] becomes
    /// a text leaf whose other string members are provenance properties.
    pub fn from_json(value: Value) -> Node {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::text(b.to_string()),
            Value::Number(n) => Node::text(n.to_string()),
            Value::String(s) => Node::text(s),
            Value::Array(items) => Node::List(items.into_iter().map(Node::from_json).collect()),
            Value::Object(mut obj) => match obj.remove(RAW_TEXT_MEMBER) {
                Some(Value::String(text)) => {
                    let properties = obj
                        .into_iter()
                        .filter_map(|(k, v)| match v {
                            Value::String(s) => Some((k, s)),
                            _ => None,
                        })
                        .collect();
                    Node::Text(Text::with_properties(text, properties))
                }
                Some(other) => {
                    tracing::warn!(
                        member = RAW_TEXT_MEMBER,
                        "raw text member is not a string; treating object as mapping"
                    );
                    obj.insert(RAW_TEXT_MEMBER.to_string(), other);
                    Node::Map(
                        obj.into_iter()
                            .map(|(k, v)| (Key::new(k), Node::from_json(v)))
                            .collect(),
                    )
                }
                None => Node::Map(
                    obj.into_iter()
                        .map(|(k, v)| (Key::new(k), Node::from_json(v)))
                        .collect(),
                ),
            },
        }
    }

    /// Plain JSON, provenance stripped.
    pub fn to_json(&self) -> Value {
        match self {
            Node::Null => Value::Null,
            Node::Text(t) => Value::String(t.as_str().to_string()),
            Node::List(items) => Value::Array(items.iter().map(Node::to_json).collect()),
            Node::Map(m) => Value::Object(
                m.iter()
                    .map(|(k, v)| (k.name().to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Text> for Node {
    fn from(t: Text) -> Self {
        Node::Text(t)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::text(s)
    }
}

impl From<Mapping> for Node {
    fn from(m: Mapping) -> Self {
        Node::Map(m)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::List(items)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_none(),
            Node::Text(t) => t.serialize(serializer),
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Map(m) => m.serialize(serializer),
        }
    }
}
