//! # Verifier Configuration
//!
//! Loaded once from YAML and read-only thereafter:
//!
//! ```yaml
//! common:                     # shared by every rule
//!   reference-prefix: ref
//!   assets: {data: assets-data, name: asset-name, storage: storage-location}
//! tags:                       # key name → default tags
//!   asset-name: [row-identifier, asset-name]
//! validators:                 # validator tag → validator binding
//!   validate-date: {validator: date, config: {formats: ["%Y-%m-%d"]}}
//! verifiers:                  # rules, run in this order
//!   mandatory: {config: {default: true}}
//!   uniqueness: {}
//! texts:                      # message overrides
//!   missing-mandatory: "Field '{field}' is empty"
//! ```
//!
//! Rule and validator configs stay untyped [`Value`]s here; each
//! implementation deserializes its own shape when checked.

use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tmv_core::{ConfigError, ConfigResult, TagTable};

use crate::localise::Texts;

/// The whole verifier configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct VerifierConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub tags: TagTable,
    #[serde(default)]
    pub validators: IndexMap<String, ValidatorSpec>,
    #[serde(default)]
    pub verifiers: IndexMap<String, RuleSpec>,
    #[serde(default)]
    pub texts: Texts,
}

/// Binding of a validator tag to a registered validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorSpec {
    pub validator: String,
    #[serde(default)]
    pub config: Value,
    /// Human-readable expectation, used in fix descriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One entry of the ordered rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub config: Value,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for RuleSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            config: Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Common section
// ---------------------------------------------------------------------------

/// Tag names and phrases shared across rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CommonConfig {
    /// Prefix of reference tags resolved in the document itself.
    pub reference_prefix: String,
    /// Prefix of reference tags resolved in the template.
    pub template_reference_prefix: String,
    /// Prefix of uniqueness tags.
    pub unique_prefix: String,
    /// Tags exempting a key from the mandatory rule.
    pub mandatory_exceptions: Vec<String>,
    pub assets: AssetTags,
    pub threats: ThreatTags,
    pub grouped: GroupedPhrases,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            reference_prefix: "ref".to_string(),
            template_reference_prefix: "template-ref".to_string(),
            unique_prefix: "unique".to_string(),
            mandatory_exceptions: vec![tmv_core::key::tags::NOT_MANDATORY.to_string()],
            assets: AssetTags::default(),
            threats: ThreatTags::default(),
            grouped: GroupedPhrases::default(),
        }
    }
}

/// Tags locating the asset table and its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AssetTags {
    pub data: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub storage: String,
}

impl Default for AssetTags {
    fn default() -> Self {
        Self {
            data: "assets-data".to_string(),
            name: "asset-name".to_string(),
            asset_type: "asset-type".to_string(),
            storage: "storage-location".to_string(),
        }
    }
}

/// Tags locating the threat table and its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ThreatTags {
    pub data: String,
    pub component: String,
    /// Column listing the assets a threat applies to.
    pub assets: String,
}

impl Default for ThreatTags {
    fn default() -> Self {
        Self {
            data: "threats-data".to_string(),
            component: "threat-component".to_string(),
            assets: "threat-assets".to_string(),
        }
    }
}

/// Phrases a threat uses to refer to a group of assets.
///
/// Matching is case-insensitive and on the start of the referenced value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct GroupedPhrases {
    /// "All assets in <component>".
    pub in_component: Vec<String>,
    /// "All assets stored in <storage>".
    pub stored_in: Vec<String>,
}

impl Default for GroupedPhrases {
    fn default() -> Self {
        Self {
            in_component: vec!["all assets in".to_string()],
            stored_in: vec!["all assets stored in".to_string()],
        }
    }
}

/// Load the verifier configuration from a YAML file.
pub fn load_config(path: &Path) -> ConfigResult<VerifierConfig> {
    tmv_core::parser::load_yaml_typed(path)
}

/// Deserialize an implementation's own config shape. An absent config is
/// read as an empty mapping, so all-default shapes need no entry at all.
pub(crate) fn typed<T: DeserializeOwned>(context: &str, config: &Value) -> ConfigResult<T> {
    let value = match config {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|e| ConfigError::Invalid {
        context: context.to_string(),
        reason: e.to_string(),
    })
}
