//! # Mapping Engine
//!
//! Interprets a [`ValueDef`] against raw content:
//!
//! 1. **get-data** runs the queries in order, each feeding the next. No
//!    queries means the input passes through.
//! 2. **map-data** builds a mapping from `{key, value}` pairs, once per
//!    element when get-data yielded a list. Each value is a recursive
//!    parse whose input is the element being mapped. An absent get-data
//!    result skips map-data and output-data entirely.
//! 3. **output-data** runs the post-processors in configured order, then
//!    coerces the result to the requested shape.
//!
//! Parsing never fails. Unknown names and shape mismatches are logged and
//! degrade to an empty result for that subtree; [`MappingEngine::check`]
//! catches the former up front.

use std::path::Path;

use tmv_core::{ConfigError, ConfigResult, Mapping, Node, TmvError};

use crate::postprocess::{PostProcessor, PostProcessorRegistry};
use crate::query::{Query, QueryRegistry};
use crate::scheme::{GetData, MapEntry, OutputSpec, OutputType, ValueDef};

/// The scheme interpreter. Holds the query and post-processor registries.
#[derive(Debug, Default)]
pub struct MappingEngine {
    queries: QueryRegistry,
    post_processors: PostProcessorRegistry,
}

impl MappingEngine {
    pub fn new(queries: QueryRegistry, post_processors: PostProcessorRegistry) -> Self {
        Self {
            queries,
            post_processors,
        }
    }

    /// An engine with every built-in query and post-processor.
    pub fn with_builtins() -> Self {
        Self::new(
            QueryRegistry::with_builtins(),
            PostProcessorRegistry::with_builtins(),
        )
    }

    pub fn register_query(&mut self, query: Box<dyn Query>) {
        self.queries.register(query);
    }

    pub fn register_post_processor(&mut self, processor: Box<dyn PostProcessor>) {
        self.post_processors.register(processor);
    }

    // -----------------------------------------------------------------------
    // Eager checking
    // -----------------------------------------------------------------------

    /// Load a scheme file and check it against this engine's registries.
    pub fn load(&self, path: &Path) -> Result<ValueDef, TmvError> {
        let def = crate::scheme::load_scheme(path)?;
        self.check(&def)?;
        tracing::debug!(scheme = %path.display(), "scheme checked");
        Ok(def)
    }

    /// Check every query type, post-processor name, and their parameters
    /// in `def` and all nested definitions.
    pub fn check(&self, def: &ValueDef) -> ConfigResult<()> {
        for spec in def.get_data.queries() {
            let query = self
                .queries
                .get(&spec.query_type)
                .ok_or_else(|| ConfigError::UnknownQuery {
                    query_type: spec.query_type.clone(),
                })?;
            query.check(&spec.params)?;
        }
        if let Some(output) = &def.output_data {
            for (name, config) in &output.post_processor {
                let processor =
                    self.post_processors
                        .get(name)
                        .ok_or_else(|| ConfigError::UnknownPostProcessor {
                            name: name.clone(),
                        })?;
                processor.check(config)?;
            }
        }
        def.map_data
            .iter()
            .flatten()
            .try_for_each(|entry| self.check(&entry.value))
    }

    // -----------------------------------------------------------------------
    // Interpretation
    // -----------------------------------------------------------------------

    /// Build a model node from `input` according to `def`.
    pub fn parse(&self, def: &ValueDef, input: &Node) -> Node {
        let data = self.get_data(&def.get_data, input.clone());
        let Some(entries) = &def.map_data else {
            return self.output_data(def.output_data.as_ref(), data);
        };
        if data.is_null() {
            return data;
        }
        let mapped = match data {
            Node::List(items) => Node::List(
                items
                    .iter()
                    .map(|item| Node::Map(self.map_data(entries, item)))
                    .collect(),
            ),
            other => Node::Map(self.map_data(entries, &other)),
        };
        self.output_data(def.output_data.as_ref(), mapped)
    }

    /// Apply the get-data queries in sequence.
    pub fn get_data(&self, get_data: &GetData, input: Node) -> Node {
        get_data
            .queries()
            .iter()
            .fold(input, |current, spec| match self.queries.get(&spec.query_type) {
                Some(query) => query.apply(&spec.params, current),
                None => {
                    tracing::warn!(query_type = %spec.query_type, "unknown query type; subtree left empty");
                    Node::Null
                }
            })
    }

    /// Build one mapping from `entries`, each value parsed from `input`.
    pub fn map_data(&self, entries: &[MapEntry], input: &Node) -> Mapping {
        let mut mapping = Mapping::new();
        for entry in entries {
            let mut key = entry.key.to_key();
            let value = match self.parse(&entry.value, input) {
                Node::Text(text) if text.has_provenance() => {
                    key.merge_properties(text.properties().iter());
                    Node::Text(text.plain())
                }
                other => other,
            };
            if mapping.insert(key, value).is_some() {
                tracing::warn!(key = entry.key.name(), "duplicate key in map-data; later value wins");
            }
        }
        mapping
    }

    /// Run post-processors, then coerce to the requested output type.
    pub fn output_data(&self, output: Option<&OutputSpec>, data: Node) -> Node {
        let Some(output) = output else {
            return data;
        };
        let processed = output
            .post_processor
            .iter()
            .fold(data, |current, (name, config)| match self.post_processors.get(name) {
                Some(processor) => processor.apply(config, current),
                None => {
                    tracing::warn!(post_processor = %name, "unknown post-processor; skipped");
                    current
                }
            });
        match output.output_type {
            Some(OutputType::Dict) => match processed {
                Node::List(mut items) => {
                    if items.len() > 1 {
                        tracing::warn!(
                            dropped = items.len() - 1,
                            "dict output keeps only the first element"
                        );
                    }
                    if items.is_empty() {
                        Node::Null
                    } else {
                        items.swap_remove(0)
                    }
                }
                other => other,
            },
            Some(OutputType::List) => match processed {
                Node::List(items) => Node::List(items),
                Node::Null => Node::List(Vec::new()),
                other => Node::List(vec![other]),
            },
            None => processed,
        }
    }
}
