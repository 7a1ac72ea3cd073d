//! Integration tests: run the `map` and `verify` handlers on fixture files.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use tmv_cli::map::map_file;
use tmv_cli::verify::{run_verify, verify_report, VerifyArgs};
use tmv_cli::{EXIT_ISSUES, EXIT_OK};
use tmv_mapping::MappingEngine;

const SCHEME: &str = r#"
get-data: {type: attribute, name: tables}
map-data:
  - key: {name: assets, section: Assets, tags: [assets-data]}
    value:
      get-data: {type: table, name: assets}
      map-data:
        - key: {name: asset-name, tags: [row-identifier]}
          value:
            get-data: [{type: list, index: 0}, {type: text}]
        - key: storage
          value:
            get-data: [{type: list, index: 1}, {type: text}]
      output-data:
        type: list
        post-processor:
          remove-header-row: null
"#;

const CONFIG: &str = r#"
tags:
  asset-name: [asset-name, unique/assets-data/asset-name]
verifiers:
  uniqueness: {}
  mandatory: {}
"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn input(rows: serde_json::Value) -> String {
    json!({"tables": {"assets": rows}}).to_string()
}

fn scheme_args(dir: &TempDir, config: &str, rows: serde_json::Value) -> VerifyArgs {
    VerifyArgs {
        config: write(dir.path(), "config.yaml", config),
        scheme: Some(write(dir.path(), "scheme.yaml", SCHEME)),
        input: Some(write(dir.path(), "input.json", &input(rows))),
        template_input: Some(write(
            dir.path(),
            "template.json",
            &input(json!([["Asset", "Storage"]])),
        )),
        model: None,
        template: None,
        pretty: false,
    }
}

#[test]
fn test_map_produces_rows() {
    let dir = TempDir::new().unwrap();
    let scheme = write(dir.path(), "scheme.yaml", SCHEME);
    let raw = write(
        dir.path(),
        "input.json",
        &input(json!([["Asset", "Storage"], ["DB", "Backend"]])),
    );
    let model = map_file(&MappingEngine::with_builtins(), &scheme, &raw).unwrap();
    assert_eq!(
        model.to_json(),
        json!({"assets": [{"asset-name": "DB", "storage": "Backend"}]})
    );
}

#[test]
fn test_map_rejects_unknown_query() {
    let dir = TempDir::new().unwrap();
    let scheme = write(dir.path(), "scheme.yaml", "get-data: {type: xpath}");
    let raw = write(dir.path(), "input.json", "{}");
    let err = map_file(&MappingEngine::with_builtins(), &scheme, &raw).unwrap_err();
    assert!(format!("{err:#}").contains("xpath"));
}

#[test]
fn test_verify_reports_errors_with_exit_code() {
    let dir = TempDir::new().unwrap();
    let args = scheme_args(
        &dir,
        CONFIG,
        json!([["Asset", "Storage"], ["DB", "Backend"], ["db", "Cloud"]]),
    );
    let report = verify_report(&args).unwrap();
    assert_eq!(report.summary.errors, 1);
    assert_eq!(report.issues[0].kind, "duplicate-value");
    assert_eq!(report.issues[0].table.as_deref(), Some("Assets"));
    assert_eq!(run_verify(&args).unwrap(), EXIT_ISSUES);
}

#[test]
fn test_verify_clean_model_exits_ok() {
    let dir = TempDir::new().unwrap();
    let args = scheme_args(
        &dir,
        CONFIG,
        json!([["Asset", "Storage"], ["DB", "Backend"], ["Keys", "Vault"]]),
    );
    assert_eq!(run_verify(&args).unwrap(), EXIT_OK);
}

#[test]
fn test_verify_premapped_models() {
    let dir = TempDir::new().unwrap();
    let args = VerifyArgs {
        config: write(dir.path(), "config.yaml", "verifiers: {mandatory: {}}"),
        scheme: None,
        input: None,
        template_input: None,
        model: Some(write(
            dir.path(),
            "model.json",
            &json!({"owner": null, "name": "A"}).to_string(),
        )),
        template: Some(write(dir.path(), "template.json", "{}")),
        pretty: true,
    };
    let report = verify_report(&args).unwrap();
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].verifier, "mandatory");
}

#[test]
fn test_verify_rejects_unknown_rule() {
    let dir = TempDir::new().unwrap();
    let args = scheme_args(&dir, "verifiers: {spelling: {}}", json!([]));
    let err = verify_report(&args).unwrap_err();
    assert!(format!("{err:#}").contains("unknown verifier"));
}

#[test]
fn test_verify_missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut args = scheme_args(&dir, CONFIG, json!([]));
    args.config = dir.path().join("absent.yaml");
    assert!(verify_report(&args).is_err());
}
