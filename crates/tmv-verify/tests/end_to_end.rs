//! End-to-end verification of small threat models through the public
//! [`Verification`] pipeline, configured from YAML the way the CLI does it.

use serde_json::{json, Value};
use tmv_core::{Issue, IssueSummary, IssueType};
use tmv_verify::{load_config, Verification, VerifierConfig};

const TAGS: &str = r#"
tags:
  assets: [assets-data]
  asset-name: [row-identifier, asset-name, unique/assets-data/asset-name]
  asset-type: [asset-type]
  storage: [storage-location]
  threats: [threats-data]
  threat-id: [row-identifier]
  component: [threat-component]
  threat-asset: [threat-assets, ref/assets-data/asset-name]
"#;

fn verification(verifiers: &str) -> Verification {
    let config: VerifierConfig = serde_yaml::from_str(&format!("{TAGS}{verifiers}")).unwrap();
    Verification::new(config).unwrap()
}

fn run(verifiers: &str, model: Value) -> Vec<Issue> {
    verification(verifiers).verify_json(&model, &json!({})).1
}

fn kinds(issues: &[Issue]) -> Vec<&str> {
    issues.iter().map(|i| i.kind.as_str()).collect()
}

#[test]
fn test_conditional_mandatory_fires_on_matching_dependency() {
    let issues = run(
        r#"
verifiers:
  conditional-mandatory:
    config:
      - {tag: tech-stack, depends-on: in-scope, depends-on-value: "Yes"}
"#,
        json!({"name": "A", "in-scope": "Yes", "tech-stack": ""}),
    );
    assert_eq!(kinds(&issues), vec!["missing-conditional-mandatory"]);
    assert_eq!(issues[0].verifier, "conditional-mandatory");
}

#[test]
fn test_mandatory_reports_only_the_empty_field() {
    let issues = run(
        "verifiers: {mandatory: {}}",
        json!({"assets": [
            {"asset-name": "DB", "owner": "ops"},
            {"asset-name": "Keys", "owner": null}
        ]}),
    );
    assert_eq!(kinds(&issues), vec!["missing-mandatory"]);
    assert_eq!(issues[0].table_row.as_deref(), Some("Keys"));
}

#[test]
fn test_uniqueness_reports_each_duplicate_set_once() {
    let two = run(
        "verifiers: {uniqueness: {}}",
        json!({"assets": [{"asset-name": "DB"}, {"asset-name": "db"}]}),
    );
    assert_eq!(kinds(&two), vec!["duplicate-value"]);

    let three = run(
        "verifiers: {uniqueness: {}}",
        json!({"assets": [{"asset-name": "DB"}, {"asset-name": "DB"}, {"asset-name": " DB "}]}),
    );
    assert_eq!(three.len(), 1);
    assert_eq!(three[0].error_data.as_ref().unwrap()["duplicates"].as_array().unwrap().len(), 2);
}

#[test]
fn test_references_resolve_case_insensitively() {
    let issues = run(
        "verifiers: {reference-existence: {}}",
        json!({
            "assets": [{"asset-name": "DB Credentials"}],
            "threats": [{"threat-id": "T1", "threat-asset": " db credentials"}]
        }),
    );
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
}

#[test]
fn test_unresolved_reference_is_located_in_its_row() {
    let issues = run(
        "verifiers: {reference-existence: {}}",
        json!({
            "assets": [{"asset-name": "DB Credentials"}],
            "threats": [{"threat-id": "T1", "threat-asset": "Vault"}]
        }),
    );
    assert_eq!(kinds(&issues), vec!["unresolved-reference"]);
    assert_eq!(issues[0].table_row.as_deref(), Some("T1"));
}

#[test]
fn test_grouped_storage_phrase_covers_asset() {
    let verification = verification("verifiers: {asset-coverage: {}}");
    let (model, issues) = verification.verify_json(
        &json!({
            "assets": [{"asset-name": "API key", "storage": "environment variables"}],
            "threats": [{
                "threat-id": "T4",
                "component": "CI",
                "threat-asset": ["All assets stored in environment variables"]
            }]
        }),
        &json!({}),
    );
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    let storage = model
        .key_ids()
        .find(|id| model.key(*id).name() == "storage")
        .unwrap();
    assert_eq!(
        model.key(storage).property("covering-threats"),
        Some(&json!([{"threat": "T4", "scenario": "D"}]))
    );
}

#[test]
fn test_full_configuration_from_file() {
    use std::io::Write;

    let yaml = format!(
        "{TAGS}{}",
        r#"
validators:
  validate-date: {validator: date, description: "a date like 2024-01-31"}
verifiers:
  mandatory: {config: {default: false}}
  uniqueness: {}
  reference-existence: {}
  value-validity: {}
  asset-coverage: {}
"#
    );
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    let mut config = load_config(file.path()).unwrap();
    config.tags.insert("review-date", ["validate-date"]);
    let verification = Verification::new(config).unwrap();

    let (_, issues) = verification.verify_json(
        &json!({
            "assets": [
                {"asset-name": "DB", "storage": "Backend", "review-date": "2024-02-30"},
                {"asset-name": "Keys", "storage": "Backend", "review-date": "2024-01-31"}
            ],
            "threats": [
                {"threat-id": "T1", "component": "Backend", "threat-asset": ["DB", "Keys"]}
            ]
        }),
        &json!({}),
    );
    assert_eq!(kinds(&issues), vec!["invalid-value"]);
    let summary = IssueSummary::of(&issues);
    assert_eq!(summary.errors, 1);
    assert!(summary.has_errors());
    assert_eq!(issues[0].issue_type, IssueType::Error);
    assert_eq!(issues[0].verifier, "value-validity");
}
