//! Shared YAML/JSON loading.
//!
//! Scheme definitions and verifier configuration are YAML; raw extracted
//! content is JSON. Every loader reports the offending path in its error.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{ConfigError, ConfigResult};
use crate::node::Node;

fn read(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Load a YAML file into a strongly-typed struct.
pub fn load_yaml_typed<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let content = read(path)?;
    serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a JSON file into a strongly-typed struct.
pub fn load_json_typed<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let content = read(path)?;
    serde_json::from_str(&content).map_err(|e| ConfigError::JsonParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load extracted JSON content as a raw [`Node`].
pub fn load_raw_content(path: &Path) -> ConfigResult<Node> {
    load_json_typed::<serde_json::Value>(path).map(Node::from_json)
}
