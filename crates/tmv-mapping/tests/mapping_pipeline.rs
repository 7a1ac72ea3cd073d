//! Integration test: map a realistic extracted threat-model document.
//!
//! The raw content mimics what a document reader produces for a page with
//! an asset table and a threat table, including a source locator on one
//! cell and carried-down component cells.

use serde_json::json;
use tmv_core::{assign_key_tags, find_key_with_tag, Document, Node, TagTable};
use tmv_mapping::{MappingEngine, ValueDef};

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
        - key: storage-location
          value:
            get-data: [{type: list, index: 1}, {type: text}]
      output-data:
        type: list
        post-processor:
          remove-header-row: null
          remove-empty-rows: []
  - key: {name: threats, section: Threats, tags: [threats-data]}
    value:
      get-data: {type: table, name: threats}
      map-data:
        - key: {name: threat-id, tags: [row-identifier]}
          value:
            get-data: [{type: list, index: 0}, {type: text}]
        - key: component
          value:
            get-data: [{type: list, index: 1}, {type: text}]
        - key: assets
          value:
            get-data:
              - {type: list, index: 2}
              - {type: text}
              - {type: regex-split, pattern: '[,;]'}
      output-data:
        type: list
        post-processor:
          remove-header-row: null
          inherit-row-above-if-empty: component
          value-replace:
            - {match: API, replacement: Public API}
"#;

fn raw() -> Node {
    Node::from_json(json!({
        "tables": {
            "assets": [
                ["Asset name\n(unique)", "Storage location"],
                [{"#text": "DB credentials", "sourcelocation": "assets#r1"}, "Environment variables"],
                ["", " "],
                ["Session token", "Browser"]
            ],
            "threats": [
                ["ID", "Component", "Assets"],
                ["T1", "API", "DB credentials; Session token"],
                ["T2", "", "Session token"],
                ["T3", "Database", "DB credentials"]
            ]
        }
    }))
}

fn scheme() -> ValueDef {
    serde_yaml::from_str(SCHEME).unwrap()
}

#[test]
fn test_scheme_passes_eager_check() {
    MappingEngine::with_builtins().check(&scheme()).unwrap();
}

#[test]
fn test_tables_are_mapped_to_rows() {
    let model = MappingEngine::with_builtins().parse(&scheme(), &raw());

    assert_eq!(
        model.to_json(),
        json!({
            "assets": [
                {"asset-name": "DB credentials", "storage-location": "Environment variables"},
                {"asset-name": "Session token", "storage-location": "Browser"}
            ],
            "threats": [
                {"threat-id": "T1", "component": "Public API", "assets": ["DB credentials", "Session token"]},
                {"threat-id": "T2", "component": "Public API", "assets": ["Session token"]},
                {"threat-id": "T3", "component": "Database", "assets": ["DB credentials"]}
            ]
        })
    );
}

#[test]
fn test_column_names_and_provenance_land_on_keys() {
    let model = MappingEngine::with_builtins().parse(&scheme(), &raw());
    let assets = model.as_map().unwrap().get("assets").unwrap().as_list().unwrap();
    let first = assets[0].as_map().unwrap();

    let name_key = first.get_key("asset-name").unwrap();
    assert_eq!(name_key.column_name(), Some("Asset name"));
    assert_eq!(name_key.property_str("sourcelocation"), Some("assets#r1"));
    assert!(name_key.has_tag("row-identifier"));
    assert_eq!(
        first.get_key("storage-location").unwrap().column_name(),
        Some("Storage location")
    );
}

#[test]
fn test_mapped_model_feeds_the_document_arena() {
    let model = MappingEngine::with_builtins().parse(&scheme(), &raw());
    let mut doc = Document::new(model);
    let table = TagTable::new().with("component", ["component-tag"]);
    assert_eq!(assign_key_tags(&mut doc, &table), 3);

    let (assets_key, _) = find_key_with_tag(&doc, doc.root(), "assets-data").unwrap();
    assert_eq!(doc.key(assets_key).section(), Some("Assets"));
    let (component, _) = find_key_with_tag(&doc, doc.root(), "component-tag").unwrap();
    assert_eq!(doc.key_text(component), Some("Public API"));
}
