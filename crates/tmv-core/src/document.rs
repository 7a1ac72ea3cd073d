//! # Document Arena
//!
//! [`Document`] interns an owned [`Node`] tree into flat tables. Keys and
//! nodes are addressed by [`KeyId`] and [`NodeId`] handles, so back
//! references (parent key, owning row, row identifier) never form
//! reference cycles and the model stays trivially walkable.
//!
//! Interning is a single top-down pass that records, for every key, the
//! mapping node that owns it and its syntactic parent key. Keys directly
//! under the root, or inside a bare top-level list, have no parent.
//!
//! Key ids are assigned in document order, so iterating [`Document::key_ids`]
//! visits keys exactly as a depth-first walk would.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::key::Key;
use crate::node::{Mapping, Node, Text};

/// Handle to a key in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct KeyId(usize);

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl KeyId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Null,
    Text(Text),
    List(Vec<NodeId>),
    Map(Vec<(KeyId, NodeId)>),
}

#[derive(Debug, Clone)]
struct KeySlot {
    key: Key,
    owner: NodeId,
    parent: Option<KeyId>,
    value: NodeId,
}

/// Borrowed view of one arena node.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Null,
    Text(&'a Text),
    List(&'a [NodeId]),
    Map(&'a [(KeyId, NodeId)]),
}

/// An interned document model.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Slot>,
    keys: Vec<KeySlot>,
    root: NodeId,
}

impl Document {
    /// Intern an owned tree.
    pub fn new(root: Node) -> Self {
        let mut doc = Document {
            nodes: Vec::new(),
            keys: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.intern(root, None);
        doc
    }

    fn intern(&mut self, node: Node, parent: Option<KeyId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Slot::Null);
        let slot = match node {
            Node::Null => Slot::Null,
            Node::Text(t) => Slot::Text(t),
            Node::List(items) => Slot::List(
                items
                    .into_iter()
                    .map(|item| self.intern(item, parent))
                    .collect(),
            ),
            Node::Map(mapping) => {
                let mut entries = Vec::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let key_id = KeyId(self.keys.len());
                    self.keys.push(KeySlot {
                        key,
                        owner: id,
                        parent,
                        value: id,
                    });
                    let value_id = self.intern(value, Some(key_id));
                    self.keys[key_id.0].value = value_id;
                    entries.push((key_id, value_id));
                }
                Slot::Map(entries)
            }
        };
        self.nodes[id.0] = slot;
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        match &self.nodes[id.0] {
            Slot::Null => NodeRef::Null,
            Slot::Text(t) => NodeRef::Text(t),
            Slot::List(items) => NodeRef::List(items),
            Slot::Map(entries) => NodeRef::Map(entries),
        }
    }

    pub fn key(&self, id: KeyId) -> &Key {
        &self.keys[id.0].key
    }

    pub fn key_mut(&mut self, id: KeyId) -> &mut Key {
        &mut self.keys[id.0].key
    }

    /// The node stored under `key`. Serves the section `value` lookup.
    pub fn value_of(&self, key: KeyId) -> NodeId {
        self.keys[key.0].value
    }

    /// The mapping node (row) that contains `key`.
    pub fn owner_of(&self, key: KeyId) -> NodeId {
        self.keys[key.0].owner
    }

    /// Syntactic parent key (`parentKey`).
    pub fn parent_of(&self, key: KeyId) -> Option<KeyId> {
        self.keys[key.0].parent
    }

    /// Walk `key` and its ancestors, nearest first.
    pub fn ancestry(&self, key: KeyId) -> impl Iterator<Item = KeyId> + '_ {
        std::iter::successors(Some(key), move |k| self.parent_of(*k))
    }

    /// All key handles in document order.
    pub fn key_ids(&self) -> impl Iterator<Item = KeyId> {
        (0..self.keys.len()).map(KeyId)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Mapping entries of `node`; empty for non-mapping nodes.
    pub fn entries(&self, node: NodeId) -> &[(KeyId, NodeId)] {
        match &self.nodes[node.0] {
            Slot::Map(entries) => entries,
            _ => &[],
        }
    }

    /// Look up a key by name in a mapping node.
    pub fn lookup(&self, mapping: NodeId, name: &str) -> Option<(KeyId, NodeId)> {
        self.entries(mapping)
            .iter()
            .copied()
            .find(|(k, _)| self.key(*k).name() == name)
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0] {
            Slot::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Text of the value stored under `key`.
    pub fn key_text(&self, key: KeyId) -> Option<&str> {
        self.text(self.value_of(key))
    }

    /// Text leaves of a node: the text itself, or the texts of a list's
    /// elements (nested lists included). Mappings contribute nothing.
    pub fn texts(&self, node: NodeId) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_texts(node, &mut out);
        out
    }

    fn collect_texts<'a>(&'a self, node: NodeId, out: &mut Vec<&'a str>) {
        match &self.nodes[node.0] {
            Slot::Text(t) => out.push(t.as_str()),
            Slot::List(items) => {
                for item in items {
                    self.collect_texts(*item, out);
                }
            }
            Slot::Null | Slot::Map(_) => {}
        }
    }

    /// Absent, blank text, or an empty collection.
    pub fn is_empty_value(&self, node: NodeId) -> bool {
        match &self.nodes[node.0] {
            Slot::Null => true,
            Slot::Text(t) => t.is_blank(),
            Slot::List(items) => items.is_empty(),
            Slot::Map(entries) => entries.is_empty(),
        }
    }

    /// Rebuild an owned tree rooted at `node`. Keys carry their current
    /// tags and properties.
    pub fn to_node(&self, node: NodeId) -> Node {
        match &self.nodes[node.0] {
            Slot::Null => Node::Null,
            Slot::Text(t) => Node::Text(t.clone()),
            Slot::List(items) => Node::List(items.iter().map(|n| self.to_node(*n)).collect()),
            Slot::Map(entries) => Node::Map(
                entries
                    .iter()
                    .map(|(k, v)| (self.key(*k).clone(), self.to_node(*v)))
                    .collect::<Mapping>(),
            ),
        }
    }

    /// Serializable view of a subtree.
    pub fn view(&self, node: NodeId) -> NodeView<'_> {
        NodeView { doc: self, node }
    }
}

impl From<Node> for Document {
    fn from(node: Node) -> Self {
        Document::new(node)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.view(self.root).serialize(serializer)
    }
}

/// Plain-JSON serialization of an arena subtree (provenance stripped).
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.doc.node(self.node) {
            NodeRef::Null => serializer.serialize_none(),
            NodeRef::Text(t) => serializer.serialize_str(t.as_str()),
            NodeRef::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.doc.view(*item))?;
                }
                seq.end()
            }
            NodeRef::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(self.doc.key(*k).name(), &self.doc.view(*v))?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Node {
        Node::from_json(json!({
            "assets": [
                {"name": "DB", "storage": "cloud"},
                {"name": "Keys", "storage": "vault"}
            ],
            "title": "Model"
        }))
    }

    #[test]
    fn interning_records_owner_and_parent() {
        let doc = Document::new(sample());
        let (assets, assets_value) = doc.lookup(doc.root(), "assets").unwrap();
        assert_eq!(doc.parent_of(assets), None);
        assert_eq!(doc.owner_of(assets), doc.root());

        let NodeRef::List(rows) = doc.node(assets_value) else {
            panic!("assets should be a list");
        };
        let (name, _) = doc.lookup(rows[1], "name").unwrap();
        assert_eq!(doc.parent_of(name), Some(assets));
        assert_eq!(doc.owner_of(name), rows[1]);
        assert_eq!(doc.key_text(name), Some("Keys"));
    }

    #[test]
    fn bare_top_level_list_has_no_parent() {
        let doc = Document::new(Node::from_json(json!([{"a": "1"}])));
        let first = doc.key_ids().next().unwrap();
        assert_eq!(doc.parent_of(first), None);
    }

    #[test]
    fn key_ids_are_in_document_order() {
        let doc = Document::new(sample());
        let names: Vec<_> = doc.key_ids().map(|k| doc.key(k).name().to_string()).collect();
        assert_eq!(names, vec!["assets", "name", "storage", "name", "storage", "title"]);
    }

    #[test]
    fn ancestry_walks_to_root() {
        let doc = Document::new(sample());
        let storage = doc
            .key_ids()
            .find(|k| doc.key(*k).name() == "storage")
            .unwrap();
        let chain: Vec<_> = doc.ancestry(storage).map(|k| doc.key(k).name()).collect();
        assert_eq!(chain, vec!["storage", "assets"]);
    }

    #[test]
    fn serializes_like_the_tree() {
        let tree = sample();
        let doc = Document::new(tree.clone());
        assert_eq!(serde_json::to_value(&doc).unwrap(), tree.to_json());
        assert_eq!(doc.to_node(doc.root()), tree);
    }

    #[test]
    fn texts_flatten_lists() {
        let doc = Document::new(Node::from_json(json!({"k": ["a", ["b"], {"x": "c"}]})));
        let (_, v) = doc.lookup(doc.root(), "k").unwrap();
        assert_eq!(doc.texts(v), vec!["a", "b"]);
    }
}
