use std::fs;

use tempfile::tempdir;

use particle_entity_bridge::config::{BridgeConfig, ConfigError};
use particle_entity_bridge::world::BridgeWorld;

#[test]
fn saved_config_loads_back_unchanged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bridge.json");

    let mut config = BridgeConfig::default();
    config.max_entities_to_process_per_frame = 64;
    config.grid_cell_sizes = vec![50.0, 500.0];
    config.zone_query_level = 1;
    config.ground.trace_start_up_offset = 25.0;
    config.save(&path).unwrap();

    let loaded = BridgeConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(BridgeWorld::new(loaded).is_ok());
}

#[test]
fn invalid_file_reports_the_field() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "max_entities_to_destroy_per_frame": 0 }"#).unwrap();

    match BridgeConfig::from_json_file(&path) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "max_entities_to_destroy_per_frame"),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = BridgeConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
    match &err {
        ConfigError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected an i/o error, got {other:?}"),
    }
    assert!(std::error::Error::source(&err).is_some());
}
