//! # Keymaster: Tag Search, Ancestry and Row Index
//!
//! Traversal utilities over a [`Document`]:
//!
//! - **Search.** [`find_key_with_tag`] and [`find_keys_with_tag`] walk depth
//!   first. At each mapping every key is checked before any value is
//!   descended into; list elements are visited in order.
//! - **Ancestry.** [`get_section_for_key`] and [`get_data_tag_for_key`] follow
//!   the parent chain recorded at interning.
//! - **Annotation passes.** [`assign_key_tags`] appends default tags from a
//!   [`TagTable`] (idempotent). [`RowIndex::build`] assigns row identifiers in
//!   one top-down pass and returns them as an index instead of writing them
//!   back onto the keys.
//!
//! Tag assignment must run before the row index is built, because the
//! `row-identifier` tag usually comes from the tag table.

use std::collections::HashMap;

use regex::Regex;

use crate::document::{Document, KeyId, NodeId, NodeRef};
use crate::key::{tags, Key};
use crate::tags::TagTable;

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// First key under `node` carrying `tag`, with its value.
pub fn find_key_with_tag(doc: &Document, node: NodeId, tag: &str) -> Option<(KeyId, NodeId)> {
    find_first(doc, node, &|key: &Key| key.has_tag(tag))
}

/// Every key under `node` carrying `tag`, with its value.
pub fn find_keys_with_tag(doc: &Document, node: NodeId, tag: &str) -> Vec<(KeyId, NodeId)> {
    let mut out = Vec::new();
    collect_all(doc, node, &|key: &Key| key.has_tag(tag), &mut out);
    out
}

/// Every key under `node` with at least one tag matching `pattern`.
pub fn find_keys_with_tag_matching_regex(
    doc: &Document,
    node: NodeId,
    pattern: &Regex,
) -> Vec<(KeyId, NodeId)> {
    let mut out = Vec::new();
    collect_all(
        doc,
        node,
        &|key: &Key| key.tags().iter().any(|t| pattern.is_match(t)),
        &mut out,
    );
    out
}

fn find_first(doc: &Document, node: NodeId, pred: &dyn Fn(&Key) -> bool) -> Option<(KeyId, NodeId)> {
    match doc.node(node) {
        NodeRef::Map(entries) => {
            if let Some(hit) = entries.iter().find(|(k, _)| pred(doc.key(*k))) {
                return Some(*hit);
            }
            entries
                .iter()
                .find_map(|(_, value)| find_first(doc, *value, pred))
        }
        NodeRef::List(items) => items.iter().find_map(|item| find_first(doc, *item, pred)),
        NodeRef::Null | NodeRef::Text(_) => None,
    }
}

fn collect_all(
    doc: &Document,
    node: NodeId,
    pred: &dyn Fn(&Key) -> bool,
    out: &mut Vec<(KeyId, NodeId)>,
) {
    match doc.node(node) {
        NodeRef::Map(entries) => {
            out.extend(entries.iter().filter(|(k, _)| pred(doc.key(*k))).copied());
            for (_, value) in entries {
                collect_all(doc, *value, pred, out);
            }
        }
        NodeRef::List(items) => {
            for item in items {
                collect_all(doc, *item, pred, out);
            }
        }
        NodeRef::Null | NodeRef::Text(_) => {}
    }
}

// ---------------------------------------------------------------------------
// Ancestry
// ---------------------------------------------------------------------------

/// Nearest key (self included) that declares a friendly section name.
pub fn get_section_for_key(doc: &Document, key: KeyId) -> Option<KeyId> {
    doc.ancestry(key).find(|k| doc.key(*k).section().is_some())
}

/// Data-tag (`*-data`) of the nearest key, self first, that carries one.
pub fn get_data_tag_for_key(doc: &Document, key: KeyId) -> Option<&str> {
    let owner = doc
        .ancestry(key)
        .find(|k| doc.key(*k).data_tags().next().is_some())?;
    let found = doc.key(owner);
    let mut data_tags = found.data_tags();
    let first = data_tags.next();
    if data_tags.next().is_some() {
        tracing::warn!(
            key = found.name(),
            tags = ?found.tags(),
            "key carries more than one data tag; using the first"
        );
    }
    first
}

/// The key that names `key`'s row: `key` itself when tagged
/// `row-identifier`, otherwise its `rowID`.
pub fn get_row_identifier_for_key(doc: &Document, rows: &RowIndex, key: KeyId) -> Option<KeyId> {
    if doc.key(key).has_tag(tags::ROW_IDENTIFIER) {
        Some(key)
    } else {
        rows.row_identifier(key)
    }
}

/// Column header derived for `key`, if any.
pub fn get_column_name_for_key(doc: &Document, key: KeyId) -> Option<&str> {
    doc.key(key).column_name()
}

// ---------------------------------------------------------------------------
// Tag assignment
// ---------------------------------------------------------------------------

/// Append default tags from `table` to every key whose name it lists,
/// unless the key carries `no-defaults`. Returns the number of tags added;
/// a second run adds none.
pub fn assign_key_tags(doc: &mut Document, table: &TagTable) -> usize {
    let ids: Vec<KeyId> = doc.key_ids().collect();
    let mut added = 0;
    for id in ids {
        let key = doc.key_mut(id);
        if key.has_tag(tags::NO_DEFAULTS) {
            continue;
        }
        let defaults = table.tags_for(key.name());
        if !defaults.is_empty() {
            added += key.add_tags(defaults.iter().cloned());
        }
    }
    tracing::debug!(added, "assigned default key tags");
    added
}

// ---------------------------------------------------------------------------
// Row index
// ---------------------------------------------------------------------------

/// Row-identifier relations of a document.
///
/// Built by the `assign_row_identifiers` pass: for each mapping element of
/// a list, the first key tagged `row-identifier` names that row. Every other
/// key in the row (nested values included) points at it. Rows without an
/// identifier inherit the identifier of the enclosing row, if any.
#[derive(Debug, Clone, Default)]
pub struct RowIndex {
    /// `rowID`: key → identifying key of its row.
    row_ids: HashMap<KeyId, KeyId>,
    /// `row`: identifying key → the row mapping it names.
    rows: HashMap<KeyId, NodeId>,
    /// Reverse of `rows`.
    identifiers: HashMap<NodeId, KeyId>,
}

impl RowIndex {
    /// Run the row-identifier pass over the whole document.
    pub fn build(doc: &Document) -> Self {
        let mut index = RowIndex::default();
        index.assign(doc, doc.root(), None, None);
        tracing::debug!(rows = index.rows.len(), "assigned row identifiers");
        index
    }

    /// `table` is the key holding `node`, used to name the table in logs.
    fn assign(&mut self, doc: &Document, node: NodeId, table: Option<KeyId>, inherited: Option<KeyId>) {
        match doc.node(node) {
            NodeRef::List(items) => {
                for (position, item) in items.iter().enumerate() {
                    let own = match doc.node(*item) {
                        NodeRef::Map(_) => {
                            let found =
                                find_key_with_tag(doc, *item, tags::ROW_IDENTIFIER).map(|(k, _)| k);
                            if found.is_none() {
                                tracing::warn!(
                                    table = table.map(|k| doc.key(k).name()).unwrap_or("<root>"),
                                    section = table.and_then(|k| doc.key(k).section()),
                                    row = position,
                                    inherited = inherited.and_then(|k| doc.key_text(k)),
                                    "row has no row-identifier key"
                                );
                            }
                            found
                        }
                        _ => None,
                    };
                    if let Some(identifier) = own {
                        self.rows.insert(identifier, *item);
                        self.identifiers.insert(*item, identifier);
                    }
                    self.assign(doc, *item, table, own.or(inherited));
                }
            }
            NodeRef::Map(entries) => {
                for (key, value) in entries {
                    if let Some(identifier) = inherited {
                        if *key != identifier {
                            self.row_ids.insert(*key, identifier);
                        }
                    }
                    self.assign(doc, *value, Some(*key), inherited);
                }
            }
            NodeRef::Null | NodeRef::Text(_) => {}
        }
    }

    /// `rowID` of `key`.
    pub fn row_identifier(&self, key: KeyId) -> Option<KeyId> {
        self.row_ids.get(&key).copied()
    }

    /// The row mapping named by an identifying key.
    pub fn row(&self, identifier: KeyId) -> Option<NodeId> {
        self.rows.get(&identifier).copied()
    }

    /// The identifying key of a row mapping.
    pub fn identifier_of_row(&self, row: NodeId) -> Option<KeyId> {
        self.identifiers.get(&row).copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Text of the identifier naming `key`'s row, for issue reporting.
    pub fn row_label<'d>(&self, doc: &'d Document, key: KeyId) -> Option<&'d str> {
        get_row_identifier_for_key(doc, self, key).and_then(|id| doc.key_text(id))
    }
}
