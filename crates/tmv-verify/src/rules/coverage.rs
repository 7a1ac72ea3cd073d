//! `asset-coverage`: every stored asset needs a threat.
//!
//! An asset row with a storage location is covered when some threat row
//! matches it in one of four ways:
//!
//! | Scenario | Threat lists | Also requires |
//! |----------|--------------|---------------|
//! | A | the asset's name | threat component = storage location |
//! | B | the asset's type | threat component = storage location |
//! | C | "all assets in <X>" | X = storage location |
//! | D | "all assets stored in <...>" | the listed text ends with the storage location |
//!
//! These are text heuristics; the phrases come from the common config and
//! the enabled scenarios from the rule config. Matches are written to the
//! storage key's `covering-threats` property.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use tmv_core::key::props;
use tmv_core::{find_key_with_tag, ConfigResult, Document, Issue, KeyId, NodeId, NodeRef};

use super::{Verifier, VerifyContext};
use crate::config::{typed, CommonConfig};
use crate::reference::normalise;

pub const KIND: &str = "asset-not-covered";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scenario {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CoverageConfig {
    scenarios: Vec<Scenario>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            scenarios: vec![Scenario::A, Scenario::B, Scenario::C, Scenario::D],
        }
    }
}

/// One asset row, normalised.
#[derive(Debug)]
struct Asset<'d> {
    name: &'d str,
    asset_type: Option<String>,
    storage_key: KeyId,
    storage: String,
}

/// One threat row, normalised.
#[derive(Debug)]
struct Threat {
    label: String,
    components: Vec<String>,
    assets: Vec<String>,
}

/// A threat covering an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Covering {
    pub threat: String,
    pub scenario: Scenario,
}

fn rows(doc: &Document, data_tag: &str) -> Vec<NodeId> {
    let Some((_, section)) = find_key_with_tag(doc, doc.root(), data_tag) else {
        tracing::debug!(data_tag, "section not found");
        return Vec::new();
    };
    match doc.node(section) {
        NodeRef::List(items) => items
            .iter()
            .copied()
            .filter(|item| matches!(doc.node(*item), NodeRef::Map(_)))
            .collect(),
        NodeRef::Map(_) => vec![section],
        _ => Vec::new(),
    }
}

fn column_texts(doc: &Document, row: NodeId, tag: &str) -> Vec<String> {
    find_key_with_tag(doc, row, tag)
        .map(|(_, value)| doc.texts(value).into_iter().map(normalise).collect())
        .unwrap_or_default()
}

fn strip_phrase<'v>(value: &'v str, phrases: &[String]) -> Option<&'v str> {
    phrases.iter().find_map(|phrase| {
        let phrase = normalise(phrase);
        value.strip_prefix(phrase.as_str()).map(str::trim)
    })
}

fn matches(scenario: Scenario, asset: &Asset<'_>, threat: &Threat, common: &CommonConfig) -> bool {
    let in_component = || threat.components.iter().any(|c| *c == asset.storage);
    match scenario {
        Scenario::A => {
            let name = normalise(asset.name);
            threat.assets.iter().any(|a| *a == name) && in_component()
        }
        Scenario::B => match &asset.asset_type {
            Some(asset_type) => threat.assets.iter().any(|a| a == asset_type) && in_component(),
            None => false,
        },
        Scenario::C => threat
            .assets
            .iter()
            .filter_map(|a| strip_phrase(a, &common.grouped.in_component))
            .any(|component| component == asset.storage),
        Scenario::D => threat
            .assets
            .iter()
            .filter(|a| strip_phrase(a, &common.grouped.stored_in).is_some())
            .any(|a| a.ends_with(asset.storage.as_str())),
    }
}

#[derive(Debug)]
pub struct AssetCoverage;

impl Verifier for AssetCoverage {
    fn name(&self) -> &'static str {
        "asset-coverage"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        typed::<CoverageConfig>(self.name(), config).map(|_| ())
    }

    fn verify(
        &self,
        ctx: &VerifyContext<'_>,
        config: &Value,
        model: &mut Document,
        _template: &Document,
    ) -> Vec<Issue> {
        let config = typed::<CoverageConfig>(self.name(), config).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "asset-coverage config unusable; using defaults");
            CoverageConfig::default()
        });
        let common = ctx.common;
        let mut issues = Vec::new();
        let mut coverings: Vec<(KeyId, Vec<Covering>)> = Vec::new();
        {
            let doc: &Document = model;
            let threats: Vec<Threat> = rows(doc, &common.threats.data)
                .into_iter()
                .enumerate()
                .map(|(index, row)| Threat {
                    label: ctx
                        .rows
                        .identifier_of_row(row)
                        .and_then(|k| doc.key_text(k))
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("#{}", index + 1)),
                    components: column_texts(doc, row, &common.threats.component),
                    assets: column_texts(doc, row, &common.threats.assets),
                })
                .collect();

            for row in rows(doc, &common.assets.data) {
                let Some((storage_key, storage_value)) = find_key_with_tag(doc, row, &common.assets.storage)
                else {
                    continue;
                };
                let storage = doc.texts(storage_value).join("\n");
                if storage.trim().is_empty() {
                    continue;
                }
                let asset = Asset {
                    name: find_key_with_tag(doc, row, &common.assets.name)
                        .and_then(|(k, _)| doc.key_text(k))
                        .unwrap_or_default(),
                    asset_type: find_key_with_tag(doc, row, &common.assets.asset_type)
                        .and_then(|(k, _)| doc.key_text(k))
                        .map(normalise)
                        .filter(|t| !t.is_empty()),
                    storage_key,
                    storage: normalise(&storage),
                };

                let covering: Vec<Covering> = threats
                    .iter()
                    .filter_map(|threat| {
                        config
                            .scenarios
                            .iter()
                            .copied()
                            .find(|s| matches(*s, &asset, threat, common))
                            .map(|scenario| Covering {
                                threat: threat.label.clone(),
                                scenario,
                            })
                    })
                    .collect();

                if covering.is_empty() {
                    tracing::debug!(asset = asset.name, storage = %asset.storage, "asset not covered");
                    let context = [("asset", asset.name), ("storage", storage.trim())];
                    let issue = Issue::error(KIND)
                        .with_description(ctx.text(KIND, &context))
                        .with_error_data(json!({"asset": asset.name, "storage": storage.trim()}))
                        .with_fix(ctx.text(&format!("{KIND}-fix"), &context), None);
                    issues.push(ctx.locate(doc, asset.storage_key, issue));
                }
                coverings.push((asset.storage_key, covering));
            }
        }

        for (key, covering) in coverings {
            model
                .key_mut(key)
                .set_property(props::COVERING_THREATS, json!(covering));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::Fixture;
    use tmv_core::{Node, TagTable};

    fn tags() -> TagTable {
        TagTable::new()
            .with("assets", ["assets-data"])
            .with("asset", ["asset-name", "row-identifier"])
            .with("type", ["asset-type"])
            .with("storage", ["storage-location"])
            .with("threats", ["threats-data"])
            .with("id", ["row-identifier"])
            .with("component", ["threat-component"])
            .with("applies-to", ["threat-assets"])
    }

    fn run(assets: Value, threats: Value, config: Value) -> (Vec<Issue>, Fixture) {
        let model = json!({"assets": assets, "threats": threats});
        let mut f = Fixture::new(Node::from_json(model), Node::Null, &tags());
        let issues = f.run(&AssetCoverage, config);
        (issues, f)
    }

    fn covering_of(f: &Fixture, storage: &str) -> Value {
        let id = f
            .model
            .key_ids()
            .find(|id| f.model.key(*id).name() == "storage" && f.model.key_text(*id) == Some(storage))
            .unwrap();
        f.model.key(id).property(props::COVERING_THREATS).cloned().unwrap()
    }

    #[test]
    fn scenario_a_name_and_component() {
        let (issues, f) = run(
            json!([{"asset": "DB credentials", "storage": "Backend"}]),
            json!([{"id": "T1", "component": "backend", "applies-to": ["db credentials"]}]),
            Value::Null,
        );
        assert!(issues.is_empty());
        assert_eq!(covering_of(&f, "Backend"), json!([{"threat": "T1", "scenario": "A"}]));
    }

    #[test]
    fn name_without_component_is_not_enough() {
        let (issues, _) = run(
            json!([{"asset": "DB credentials", "storage": "Backend"}]),
            json!([{"id": "T1", "component": "Frontend", "applies-to": ["DB credentials"]}]),
            Value::Null,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, KIND);
        assert_eq!(issues[0].table_row.as_deref(), Some("DB credentials"));
    }

    #[test]
    fn scenario_b_type_and_component() {
        let (issues, f) = run(
            json!([{"asset": "Session", "type": "Token", "storage": "Browser"}]),
            json!([{"id": "T2", "component": "Browser", "applies-to": ["token"]}]),
            Value::Null,
        );
        assert!(issues.is_empty());
        assert_eq!(covering_of(&f, "Browser")[0]["scenario"], "B");
    }

    #[test]
    fn scenario_c_all_assets_in_component() {
        let (issues, f) = run(
            json!([{"asset": "Logs", "storage": "Log server"}]),
            json!([{"id": "T3", "component": "Network", "applies-to": ["All assets in log server"]}]),
            Value::Null,
        );
        assert!(issues.is_empty());
        assert_eq!(covering_of(&f, "Log server")[0]["scenario"], "C");
    }

    #[test]
    fn scenario_d_grouped_storage_without_component() {
        let (issues, f) = run(
            json!([{"asset": "API key", "storage": "environment variables"}]),
            json!([{"id": "T4", "component": "CI", "applies-to": ["All assets stored in environment variables"]}]),
            Value::Null,
        );
        assert!(issues.is_empty());
        assert_eq!(covering_of(&f, "environment variables")[0]["scenario"], "D");
    }

    #[test]
    fn disabled_scenarios_do_not_cover() {
        let (issues, _) = run(
            json!([{"asset": "API key", "storage": "environment variables"}]),
            json!([{"id": "T4", "applies-to": ["All assets stored in environment variables"]}]),
            json!({"scenarios": ["A", "B", "C"]}),
        );
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn assets_without_storage_are_ignored() {
        let (issues, _) = run(
            json!([{"asset": "Docs", "storage": ""}, {"asset": "Notes"}]),
            json!([]),
            Value::Null,
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn unlabelled_threats_use_their_position() {
        let model = json!({
            "assets": [{"asset": "Logs", "storage": "Log server"}],
            "threats": [{"component": "log server", "applies-to": ["logs"]}]
        });
        let mut f = Fixture::new(Node::from_json(model), Node::Null, &tags());
        assert!(f.run(&AssetCoverage, Value::Null).is_empty());
        assert_eq!(covering_of(&f, "Log server")[0]["threat"], "#1");
    }
}
