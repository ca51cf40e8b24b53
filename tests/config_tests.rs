// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use freehand_camera::Config;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.timing.burst_interval(), Duration::from_millis(100));
    assert_eq!(config.timing.countdown_tick(), Duration::from_secs(1));
    assert_eq!(config.timing.touch_focus_revert(), Duration::from_secs(4));
    assert_eq!((config.max_image_width, config.max_image_height), (1920, 1080));
    assert_eq!(config.focus.metering_weight, 999);
    assert_eq!(config.storage.jpeg_quality, 100);
}

#[test]
fn test_config_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "timing": { "burst_interval_ms": 250 } }"#).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.timing.burst_interval(), Duration::from_millis(250));
    assert_eq!(config.timing.countdown_tick(), Duration::from_secs(1));
    assert_eq!(config.storage, Config::default().storage);
}

#[test]
fn test_config_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.storage.name_prefix = "Hike".to_string();
    config.focus.face_move_threshold = 80;
    config.save(&path).unwrap();

    assert_eq!(Config::load(&path).unwrap(), config);
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_or_default(Some(&dir.path().join("absent.json"))).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Config::load_or_default(Some(&path)).is_err());
}
