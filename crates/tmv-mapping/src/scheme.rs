//! # Scheme Definitions
//!
//! A scheme is a nested [`ValueDef`]:
//!
//! ```yaml
//! get-data:                 # one query or a list, applied in sequence
//!   - {type: table, name: assets, header: true}
//! map-data:                 # per element when get-data yields a list
//!   - key: {name: asset-name, tags: [row-identifier]}
//!     value:
//!       get-data: {type: attribute, name: Name}
//!   - key: storage
//!     value:
//!       get-data: {type: attribute, name: Storage}
//! output-data:
//!   type: list
//!   post-processor:
//!     remove-empty-rows: []
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tmv_core::key::props;
use tmv_core::{ConfigResult, Key};

/// Query parameters, everything in a query object except `type`.
pub type Params = serde_json::Map<String, Value>;

/// One `{get-data?, map-data?, output-data?}` definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ValueDef {
    #[serde(default)]
    pub get_data: GetData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_data: Option<Vec<MapEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<OutputSpec>,
}

/// A single query object or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GetData {
    One(QuerySpec),
    Many(Vec<QuerySpec>),
}

impl Default for GetData {
    fn default() -> Self {
        GetData::Many(Vec::new())
    }
}

impl GetData {
    pub fn queries(&self) -> &[QuerySpec] {
        match self {
            GetData::One(q) => std::slice::from_ref(q),
            GetData::Many(qs) => qs,
        }
    }
}

/// A typed query: `type` selects the implementation, the rest are parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(rename = "type")]
    pub query_type: String,
    #[serde(flatten)]
    pub params: Params,
}

impl QuerySpec {
    pub fn new(query_type: impl Into<String>) -> Self {
        Self {
            query_type: query_type.into(),
            params: Params::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }
}

/// One `{key, value}` pair of `map-data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapEntry {
    pub key: KeySpec,
    #[serde(default)]
    pub value: ValueDef,
}

/// A literal key name or a `{name, section?, tags?}` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    Name(String),
    Object {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        section: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
    },
}

impl KeySpec {
    pub fn name(&self) -> &str {
        match self {
            KeySpec::Name(name) | KeySpec::Object { name, .. } => name,
        }
    }

    /// Build the model key this entry declares.
    pub fn to_key(&self) -> Key {
        match self {
            KeySpec::Name(name) => Key::new(name.as_str()),
            KeySpec::Object {
                name,
                section,
                tags,
            } => {
                let mut key = Key::with_tags(name.as_str(), tags.iter().cloned());
                if let Some(section) = section {
                    key.set_property(props::SECTION, section.as_str());
                }
                key
            }
        }
    }
}

/// Shape of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    List,
    Dict,
}

/// `output-data`: result shape plus ordered post-processors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OutputSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<OutputType>,
    /// Processor name → config, applied in the order given.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub post_processor: IndexMap<String, Value>,
}

/// Load a scheme from a YAML file.
pub fn load_scheme(path: &Path) -> ConfigResult<ValueDef> {
    tmv_core::parser::load_yaml_typed(path)
}
