//! # Queries: the get-data Dispatch Table
//!
//! Each query type is a [`Query`] implementation registered under a
//! symbolic name in a [`QueryRegistry`]. The registry is populated once at
//! startup; schemes are checked against it before any document is mapped.
//!
//! Queries operate on already-extracted content (text, lists, mappings).
//! A query that receives the wrong node kind logs a warning and returns
//! [`Node::Null`]; it never fails the mapping run.
//!
//! Text-producing queries derive their output with [`Text::map`], so
//! provenance properties survive every step of a query chain.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value;

use tmv_core::{ConfigError, ConfigResult, Key, Mapping, Node, PatternCache, Text};

use crate::scheme::Params;

/// A get-data query implementation.
pub trait Query: Send + Sync + fmt::Debug {
    /// Symbolic name used in scheme `type` fields.
    fn name(&self) -> &'static str;

    /// Validate parameters when the scheme is checked.
    fn check(&self, _params: &Params) -> ConfigResult<()> {
        Ok(())
    }

    /// Apply the query to `input`.
    fn apply(&self, params: &Params, input: Node) -> Node;
}

/// Name → query implementation.
#[derive(Debug, Default)]
pub struct QueryRegistry {
    queries: BTreeMap<String, Box<dyn Query>>,
}

impl QueryRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in query type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TableQuery));
        registry.register(Box::new(ListQuery));
        registry.register(Box::new(TextQuery));
        registry.register(Box::new(AttributeQuery));
        registry.register(Box::new(RegexSplitQuery::default()));
        registry.register(Box::new(RegexMatchQuery::default()));
        registry.register(Box::new(RegexReplaceQuery::default()));
        registry.register(Box::new(UrlDecodeQuery));
        registry.register(Box::new(SplitLinesQuery));
        registry
    }

    /// Register a query, replacing any with the same name.
    pub fn register(&mut self, query: Box<dyn Query>) {
        self.queries.insert(query.name().to_string(), query);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Query> {
        self.queries.get(name).map(|q| q.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

fn param_str<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.get(name).and_then(Value::as_str)
}

fn param_usize(params: &Params, name: &str) -> Option<usize> {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

fn param_bool(params: &Params, name: &str) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn require_str<'a>(query: &str, params: &'a Params, name: &str) -> ConfigResult<&'a str> {
    param_str(params, name).ok_or_else(|| ConfigError::MissingKey {
        context: format!("query {query:?}"),
        key: name.to_string(),
    })
}

/// Compile `pattern` into `patterns`, so `apply` finds it ready.
fn check_pattern(query: &str, patterns: &PatternCache, params: &Params) -> ConfigResult<()> {
    let pattern = require_str(query, params, "pattern")?;
    patterns
        .get(pattern)
        .map(|_| ())
        .map_err(|source| ConfigError::Pattern {
            context: format!("query {query:?}"),
            pattern: pattern.to_string(),
            source,
        })
}

fn compile(query: &str, patterns: &PatternCache, params: &Params) -> Option<Regex> {
    let pattern = param_str(params, "pattern")?;
    match patterns.get(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(query, pattern, error = %e, "invalid pattern; query skipped");
            None
        }
    }
}

fn mismatch(query: &str, expected: &str, got: &Node) -> Node {
    tracing::warn!(query, expected, got = got.kind(), "unexpected input for query");
    Node::Null
}

/// Apply `f` to a text leaf, or to every text leaf of a list.
fn per_text<F>(query: &str, input: Node, f: &F) -> Node
where
    F: Fn(&Text) -> Node,
{
    match input {
        Node::Text(t) => f(&t),
        Node::List(items) => Node::List(items.into_iter().map(|item| per_text(query, item, f)).collect()),
        Node::Null => Node::Null,
        other => mismatch(query, "text or list", &other),
    }
}

// ---------------------------------------------------------------------------
// Built-in queries
// ---------------------------------------------------------------------------

/// `table`: select a table and optionally turn its header row into keys.
///
/// Parameters: `name` (mapping lookup), `index` (list position, default
/// the input itself), `header` (bool).
#[derive(Debug)]
pub struct TableQuery;

impl Query for TableQuery {
    fn name(&self) -> &'static str {
        "table"
    }

    fn apply(&self, params: &Params, input: Node) -> Node {
        let selected = if let Some(name) = param_str(params, "name") {
            match input {
                Node::Map(mut m) => m.get_mut(name).map(std::mem::take).unwrap_or_default(),
                other => return mismatch(self.name(), "mapping", &other),
            }
        } else if let Some(index) = param_usize(params, "index") {
            match input {
                Node::List(mut items) if index < items.len() => items.swap_remove(index),
                Node::List(_) => Node::Null,
                other => return mismatch(self.name(), "list", &other),
            }
        } else {
            input
        };

        let rows = match selected {
            Node::List(rows) => rows,
            Node::Null => {
                tracing::warn!(query = self.name(), "table not found");
                return Node::Null;
            }
            other => return mismatch(self.name(), "list of rows", &other),
        };

        if !param_bool(params, "header") {
            return Node::List(rows);
        }

        let mut rows = rows.into_iter();
        let header: Vec<String> = match rows.next() {
            Some(Node::List(cells)) => cells
                .iter()
                .map(|c| c.render_text().map(|t| t.as_str().trim().to_string()).unwrap_or_default())
                .collect(),
            Some(other) => return mismatch(self.name(), "header row of cells", &other),
            None => return Node::List(Vec::new()),
        };

        Node::List(
            rows.filter_map(|row| match row {
                Node::List(cells) => Some(Node::Map(
                    header
                        .iter()
                        .zip(cells)
                        .map(|(name, cell)| (Key::new(name.as_str()), cell))
                        .collect::<Mapping>(),
                )),
                other => {
                    tracing::warn!(query = "table", got = other.kind(), "skipping non-list row");
                    None
                }
            })
            .collect(),
        )
    }
}

/// `list`: pick one element (`index`) or a slice (`start`/`end`).
#[derive(Debug)]
pub struct ListQuery;

impl Query for ListQuery {
    fn name(&self) -> &'static str {
        "list"
    }

    fn apply(&self, params: &Params, input: Node) -> Node {
        let mut items = match input {
            Node::List(items) => items,
            Node::Null => return Node::Null,
            other => return mismatch(self.name(), "list", &other),
        };
        if let Some(index) = param_usize(params, "index") {
            return if index < items.len() {
                items.swap_remove(index)
            } else {
                Node::Null
            };
        }
        let end = param_usize(params, "end").unwrap_or(items.len()).min(items.len());
        let start = param_usize(params, "start").unwrap_or(0).min(end);
        items.truncate(end);
        Node::List(items.split_off(start))
    }
}

/// `text`: render the node as trimmed text.
#[derive(Debug)]
pub struct TextQuery;

impl Query for TextQuery {
    fn name(&self) -> &'static str {
        "text"
    }

    fn apply(&self, _params: &Params, input: Node) -> Node {
        match input.render_text() {
            Some(t) => Node::Text(t.map(|s| s.trim().to_string())),
            None => Node::Null,
        }
    }
}

/// `attribute`: look up `name` in a mapping.
#[derive(Debug)]
pub struct AttributeQuery;

impl Query for AttributeQuery {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn check(&self, params: &Params) -> ConfigResult<()> {
        require_str(self.name(), params, "name").map(|_| ())
    }

    fn apply(&self, params: &Params, input: Node) -> Node {
        let Some(name) = param_str(params, "name") else {
            return Node::Null;
        };
        match input {
            Node::Map(mut m) => m.get_mut(name).map(std::mem::take).unwrap_or_default(),
            Node::Null => Node::Null,
            other => mismatch(self.name(), "mapping", &other),
        }
    }
}

/// `regex-split`: split text on `pattern` into trimmed, non-empty parts.
#[derive(Debug, Default)]
pub struct RegexSplitQuery {
    patterns: PatternCache,
}

impl Query for RegexSplitQuery {
    fn name(&self) -> &'static str {
        "regex-split"
    }

    fn check(&self, params: &Params) -> ConfigResult<()> {
        check_pattern(self.name(), &self.patterns, params)
    }

    fn apply(&self, params: &Params, input: Node) -> Node {
        let Some(re) = compile(self.name(), &self.patterns, params) else {
            return input;
        };
        let split = |t: &Text| -> Vec<Node> {
            re.split(t.as_str())
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| Node::Text(t.map(|_| part.to_string())))
                .collect()
        };
        match input {
            Node::Text(t) => Node::List(split(&t)),
            Node::List(items) => Node::List(
                items
                    .iter()
                    .flat_map(|item| match item {
                        Node::Text(t) => split(t),
                        other => vec![other.clone()],
                    })
                    .collect(),
            ),
            Node::Null => Node::Null,
            other => mismatch(self.name(), "text or list", &other),
        }
    }
}

/// `regex-match`: capture `group` (default 0) of the first match.
#[derive(Debug, Default)]
pub struct RegexMatchQuery {
    patterns: PatternCache,
}

impl Query for RegexMatchQuery {
    fn name(&self) -> &'static str {
        "regex-match"
    }

    fn check(&self, params: &Params) -> ConfigResult<()> {
        check_pattern(self.name(), &self.patterns, params)
    }

    fn apply(&self, params: &Params, input: Node) -> Node {
        let Some(re) = compile(self.name(), &self.patterns, params) else {
            return input;
        };
        let group = param_usize(params, "group").unwrap_or(0);
        per_text(self.name(), input, &|t: &Text| {
            re.captures(t.as_str())
                .and_then(|caps| caps.get(group))
                .map(|m| Node::Text(t.map(|_| m.as_str().to_string())))
                .unwrap_or(Node::Null)
        })
    }
}

/// `regex-replace`: replace every match of `pattern` with `replacement`.
#[derive(Debug, Default)]
pub struct RegexReplaceQuery {
    patterns: PatternCache,
}

impl Query for RegexReplaceQuery {
    fn name(&self) -> &'static str {
        "regex-replace"
    }

    fn check(&self, params: &Params) -> ConfigResult<()> {
        check_pattern(self.name(), &self.patterns, params)?;
        require_str(self.name(), params, "replacement").map(|_| ())
    }

    fn apply(&self, params: &Params, input: Node) -> Node {
        let Some(re) = compile(self.name(), &self.patterns, params) else {
            return input;
        };
        let replacement = param_str(params, "replacement").unwrap_or_default();
        per_text(self.name(), input, &|t: &Text| {
            Node::Text(t.map(|s| re.replace_all(s, replacement).into_owned()))
        })
    }
}

/// `url-decode`: percent-decode text; `form: true` also decodes `+`.
#[derive(Debug)]
pub struct UrlDecodeQuery;

impl Query for UrlDecodeQuery {
    fn name(&self) -> &'static str {
        "url-decode"
    }

    fn apply(&self, params: &Params, input: Node) -> Node {
        let form = param_bool(params, "form");
        per_text(self.name(), input, &|t: &Text| {
            Node::Text(t.map(|s| {
                let source = if form { s.replace('+', " ") } else { s.to_string() };
                percent_decode_str(&source).decode_utf8_lossy().into_owned()
            }))
        })
    }
}

/// `split-lines`: trimmed, non-empty lines.
#[derive(Debug)]
pub struct SplitLinesQuery;

impl Query for SplitLinesQuery {
    fn name(&self) -> &'static str {
        "split-lines"
    }

    fn apply(&self, _params: &Params, input: Node) -> Node {
        match input.render_text() {
            Some(t) => Node::List(
                t.as_str()
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| Node::Text(t.map(|_| line.to_string())))
                    .collect(),
            ),
            None => Node::Null,
        }
    }
}
