//! Integration tests for grid configuration and filter persistence
//!
//! These tests validate:
//! - Building a working filter store from a config file
//! - Saving the filter list on every change
//! - Restoring a saved filter list into a fresh store

mod common;

use common::builders::people_table;
use common::field_values;
use datagrid_rs::config::{GridConfig, JsonFilePersistence};
use datagrid_rs::filter::{FilterSpec, OperatorRegistry, PersistKind};
use datagrid_rs::loader::LoadPipeline;
use datagrid_rs::scripting::ScriptEngine;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const GRID_TOML: &str = r#"
[filter]
persistent = true

[ajax]
url = "https://example.com/people"
method = "post"
params = { dept = "eng" }
headers = { "X-Api-Key" = "secret" }

[[columns]]
field = "name"
title = "Name"
header_filter = { editor = "input" }

[[columns]]
field = "dept"
title = "Department"
header_filter = { editor = "select" }

[[filters]]
field = "age"
type = ">="
value = 20

[[filters]]
script = "row.dept == params.dept"
name = "same_dept"
params = { dept = "eng" }
"#;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let state = dir.path().join("state").join("filters.json");
    let content = GRID_TOML.replace(
        "persistent = true",
        &format!("persistent = true\npersistence_path = {:?}", state),
    );
    let path = dir.path().join("grid.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_config_builds_filtering_store() {
    let dir = TempDir::new().unwrap();
    let config = GridConfig::load(write_config(&dir)).unwrap();
    let mut store = config
        .build_store(Arc::new(OperatorRegistry::builtin()), &ScriptEngine::new())
        .unwrap();
    let table = people_table();

    assert_eq!(store.len(), 2);
    assert_eq!(
        field_values(&store.filter(&table.rows()), "name"),
        vec!["Alice", "Carol"]
    );

    store.set_header_filter_value("name", json!("car")).unwrap();
    assert_eq!(field_values(&store.filter(&table.rows()), "name"), vec!["Carol"]);
}

#[test]
fn test_filter_changes_are_persisted() {
    let dir = TempDir::new().unwrap();
    let config = GridConfig::load(write_config(&dir)).unwrap();
    let mut store = config
        .build_store(Arc::new(OperatorRegistry::builtin()), &ScriptEngine::new())
        .unwrap();
    let state = config.filter.persistence_path.clone().unwrap();
    let persistence = JsonFilePersistence::new(&state);

    // The store saved once while applying the configured filters
    let saved = serde_json::to_value(persistence.load_snapshot(PersistKind::Filter).unwrap()).unwrap();
    assert_eq!(saved[0], json!({"field": "age", "type": ">=", "value": 20}));
    assert_eq!(saved[1]["type"], json!("function"));

    store.set_filter([FilterSpec::new("dept", "in", json!(["ops", "sales"]))]);

    let restored = persistence.restore_filters().unwrap();
    assert_eq!(restored, vec![FilterSpec::new("dept", "in", json!(["ops", "sales"]))]);

    // A fresh store picks the list back up
    let mut fresh = GridConfig::default()
        .build_store(Arc::new(OperatorRegistry::builtin()), &ScriptEngine::new())
        .unwrap();
    fresh.set_filter(restored);
    assert_eq!(
        field_values(&fresh.filter(&people_table().rows()), "name"),
        vec!["Bob", "Dave"]
    );
}

#[test]
fn test_restored_function_filters_are_dropped() {
    let dir = TempDir::new().unwrap();
    let config = GridConfig::load(write_config(&dir)).unwrap();
    config
        .build_store(Arc::new(OperatorRegistry::builtin()), &ScriptEngine::new())
        .unwrap();
    let persistence = JsonFilePersistence::new(config.filter.persistence_path.clone().unwrap());

    let mut fresh = GridConfig::default()
        .build_store(Arc::new(OperatorRegistry::builtin()), &ScriptEngine::new())
        .unwrap();
    let ids = fresh.set_filter(persistence.restore_filters().unwrap());

    assert_eq!(ids.len(), 1);
}

#[test]
fn test_ajax_settings_configure_pipeline() {
    let dir = TempDir::new().unwrap();
    let config = GridConfig::load(write_config(&dir)).unwrap();
    let transport = Arc::new(common::mock_helpers::ScriptedTransport::new([]));
    let mut pipeline = LoadPipeline::new(transport);

    config.ajax.apply(&mut pipeline);

    let (url, request) = pipeline.build_request().unwrap();
    assert_eq!(url, "https://example.com/people");
    assert_eq!(request.method, "post");
    assert_eq!(request.headers.get("X-Api-Key").map(String::as_str), Some("secret"));
    assert_eq!(request.body.as_deref(), Some(r#"{"dept":"eng"}"#));
}

#[test]
fn test_json_config_roundtrip() {
    let dir = TempDir::new().unwrap();
    let config = GridConfig::load(write_config(&dir)).unwrap();
    let json_path = dir.path().join("grid.json");

    config.save(&json_path).unwrap();

    assert_eq!(GridConfig::load(&json_path).unwrap(), config);
}
