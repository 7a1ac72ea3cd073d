//! # Output Post-Processors
//!
//! Post-processors run on the result of a value definition, in the order
//! its `output-data.post-processor` mapping lists them. Most expect a list
//! of row mappings; anything else passes through with a warning.
//!
//! | Name | Config | Effect |
//! |------|--------|--------|
//! | `inherit-row-above-if-empty` | key name or list of names | carry the last non-empty value down into empty cells |
//! | `remove-empty-rows` | list of ignored key names | drop rows whose other string values are all empty |
//! | `value-replace` | list of `{match, replacement}` | exact-match substitution, first match wins |
//! | `remove-header-row` | none | drop the first row and label columns with its values |
//! | `strip-whitespace` | none | trim every string |

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use tmv_core::key::props;
use tmv_core::{ConfigError, ConfigResult, Node, Text};

/// An output post-processor.
pub trait PostProcessor: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn check(&self, _config: &Value) -> ConfigResult<()> {
        Ok(())
    }

    fn apply(&self, config: &Value, output: Node) -> Node;
}

/// Name → post-processor.
#[derive(Debug, Default)]
pub struct PostProcessorRegistry {
    processors: BTreeMap<String, Box<dyn PostProcessor>>,
}

impl PostProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(InheritRowAboveIfEmpty));
        registry.register(Box::new(RemoveEmptyRows));
        registry.register(Box::new(ValueReplace));
        registry.register(Box::new(RemoveHeaderRow));
        registry.register(Box::new(StripWhitespace));
        registry
    }

    pub fn register(&mut self, processor: Box<dyn PostProcessor>) {
        self.processors
            .insert(processor.name().to_string(), processor);
    }

    pub fn get(&self, name: &str) -> Option<&dyn PostProcessor> {
        self.processors.get(name).map(|p| p.as_ref())
    }
}

/// One name or a list of names.
fn names(config: &Value) -> Vec<&str> {
    match config {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn rows_or_warn(processor: &str, output: Node) -> Result<Vec<Node>, Node> {
    match output {
        Node::List(rows) => Ok(rows),
        other => {
            tracing::warn!(processor, got = other.kind(), "post-processor expects a list of rows");
            Err(other)
        }
    }
}

fn map_texts(node: &mut Node, f: &dyn Fn(&str) -> Option<String>) {
    match node {
        Node::Text(t) => {
            if let Some(replaced) = f(t.as_str()) {
                *t = t.map(|_| replaced);
            }
        }
        Node::List(items) => items.iter_mut().for_each(|n| map_texts(n, f)),
        Node::Map(m) => m.values_mut().for_each(|n| map_texts(n, f)),
        Node::Null => {}
    }
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

/// Carry-down fill of empty cells from the row above.
///
/// A cell is empty when its text is empty or whitespace only; such a cell
/// is replaced with the whole value above it, whitespace included.
#[derive(Debug)]
pub struct InheritRowAboveIfEmpty;

impl PostProcessor for InheritRowAboveIfEmpty {
    fn name(&self) -> &'static str {
        "inherit-row-above-if-empty"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        if names(config).is_empty() {
            return Err(ConfigError::Invalid {
                context: self.name().to_string(),
                reason: "expects a key name or a list of key names".to_string(),
            });
        }
        Ok(())
    }

    fn apply(&self, config: &Value, output: Node) -> Node {
        let mut rows = match rows_or_warn(self.name(), output) {
            Ok(rows) => rows,
            Err(other) => return other,
        };
        for key in names(config) {
            let mut last: Option<Node> = None;
            for row in rows.iter_mut() {
                let Some(cell) = row.as_map_mut().and_then(|m| m.get_mut(key)) else {
                    continue;
                };
                match cell.as_text().map(Text::is_blank) {
                    Some(true) => {
                        if let Some(above) = &last {
                            *cell = above.clone();
                        }
                    }
                    Some(false) => last = Some(cell.clone()),
                    None => {}
                }
            }
        }
        Node::List(rows)
    }
}

/// Drop rows whose string values, outside the ignored keys, are all empty.
/// Whitespace-only text counts as empty. Non-text values never keep a row.
#[derive(Debug)]
pub struct RemoveEmptyRows;

impl PostProcessor for RemoveEmptyRows {
    fn name(&self) -> &'static str {
        "remove-empty-rows"
    }

    fn apply(&self, config: &Value, output: Node) -> Node {
        let rows = match rows_or_warn(self.name(), output) {
            Ok(rows) => rows,
            Err(other) => return other,
        };
        let ignore = names(config);
        let before = rows.len();
        let kept: Vec<Node> = rows
            .into_iter()
            .filter(|row| match row {
                Node::Map(m) => m
                    .iter()
                    .filter(|(k, _)| !ignore.contains(&k.name()))
                    .any(|(_, v)| matches!(v, Node::Text(t) if !t.is_blank())),
                _ => true,
            })
            .collect();
        tracing::debug!(removed = before - kept.len(), "removed empty rows");
        Node::List(kept)
    }
}

#[derive(Debug, Deserialize)]
struct Replacement {
    #[serde(rename = "match")]
    pattern: String,
    replacement: String,
}

fn replacements(name: &str, config: &Value) -> ConfigResult<Vec<Replacement>> {
    Vec::<Replacement>::deserialize(config).map_err(|e| ConfigError::Invalid {
        context: name.to_string(),
        reason: e.to_string(),
    })
}

/// Exact-match string substitution.
#[derive(Debug)]
pub struct ValueReplace;

impl PostProcessor for ValueReplace {
    fn name(&self) -> &'static str {
        "value-replace"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        replacements(self.name(), config).map(|_| ())
    }

    fn apply(&self, config: &Value, mut output: Node) -> Node {
        let table = match replacements(self.name(), config) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(error = %e, "value-replace config unusable; output unchanged");
                return output;
            }
        };
        map_texts(&mut output, &|s| {
            table
                .iter()
                .find(|r| r.pattern == s)
                .map(|r| r.replacement.clone())
        });
        output
    }
}

/// Drop the first row and label each column with its header text.
#[derive(Debug)]
pub struct RemoveHeaderRow;

impl RemoveHeaderRow {
    fn set_colname(node: &mut Node, colname: &str) {
        match node {
            Node::Map(m) => {
                for (key, value) in m.iter_mut() {
                    key.set_property(props::COLNAME, colname);
                    Self::set_colname(value, colname);
                }
            }
            Node::List(items) => items.iter_mut().for_each(|n| Self::set_colname(n, colname)),
            Node::Text(_) | Node::Null => {}
        }
    }
}

impl PostProcessor for RemoveHeaderRow {
    fn name(&self) -> &'static str {
        "remove-header-row"
    }

    fn apply(&self, _config: &Value, output: Node) -> Node {
        let mut rows = match rows_or_warn(self.name(), output) {
            Ok(rows) => rows,
            Err(other) => return other,
        };
        if rows.is_empty() {
            return Node::List(rows);
        }
        let header = rows.remove(0);
        let Node::Map(header) = header else {
            return Node::List(rows);
        };
        let colnames: Vec<Option<String>> = header
            .values()
            .map(|v| {
                v.render_text()
                    .and_then(|t| t.as_str().lines().next().map(|l| l.trim().to_string()))
            })
            .collect();

        for row in rows.iter_mut() {
            let Some(m) = row.as_map_mut() else { continue };
            for (position, (key, value)) in m.iter_mut().enumerate() {
                if let Some(Some(colname)) = colnames.get(position) {
                    key.set_property(props::COLNAME, colname.as_str());
                    Self::set_colname(value, colname);
                }
            }
        }
        Node::List(rows)
    }
}

/// Trim every string.
#[derive(Debug)]
pub struct StripWhitespace;

impl PostProcessor for StripWhitespace {
    fn name(&self) -> &'static str {
        "strip-whitespace"
    }

    fn apply(&self, _config: &Value, mut output: Node) -> Node {
        map_texts(&mut output, &|s| {
            let trimmed = s.trim();
            (trimmed.len() != s.len()).then(|| trimmed.to_string())
        });
        output
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use tmv_core::{Key, Mapping};

    fn table(cells: &[String]) -> Node {
        Node::List(
            cells
                .iter()
                .map(|c| {
                    let mut m = Mapping::new();
                    m.insert(Key::new("k"), Node::text(c.as_str()));
                    m.insert(Key::new("other"), Node::text("o"));
                    Node::Map(m)
                })
                .collect(),
        )
    }

    fn column(node: &Node) -> Vec<String> {
        node.as_list()
            .unwrap()
            .iter()
            .map(|r| r.as_map().unwrap().get("k").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    proptest! {
        /// Non-empty cells are never changed; a leading empty run stays empty;
        /// every later empty cell takes the nearest non-empty value above.
        #[test]
        fn inherit_row_above_invariants(cells in prop::collection::vec(prop_oneof![Just(String::new()), "[a-z]{1,4}"], 0..20)) {
            let out = column(&InheritRowAboveIfEmpty.apply(&Value::from("k"), table(&cells)));
            prop_assert_eq!(out.len(), cells.len());
            let mut last: Option<&String> = None;
            for (before, after) in cells.iter().zip(out.iter()) {
                if before.is_empty() {
                    match last {
                        Some(above) => prop_assert_eq!(after, above),
                        None => prop_assert!(after.is_empty()),
                    }
                } else {
                    prop_assert_eq!(after, before);
                    last = Some(before);
                }
            }
        }

        /// N rows in, N-1 rows out, every remaining key labelled.
        #[test]
        fn remove_header_row_counts(cells in prop::collection::vec("[a-z]{1,4}", 1..20)) {
            let out = RemoveHeaderRow.apply(&Value::Null, table(&cells));
            let rows = out.as_list().unwrap();
            prop_assert_eq!(rows.len(), cells.len() - 1);
            for row in rows {
                let m = row.as_map().unwrap();
                prop_assert_eq!(m.get_key("k").unwrap().column_name(), Some(cells[0].as_str()));
                prop_assert_eq!(m.get_key("other").unwrap().column_name(), Some("o"));
            }
        }
    }
}
