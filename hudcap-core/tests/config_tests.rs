//! Integration tests for configuration and errors

use hudcap_core::config::{sample_config, CaptureConfig, ConfigFile};
use hudcap_core::error::{CaptureError, ResultExt};
use hudcap_core::types::{Rect, Resolution};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_file_roundtrip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = ConfigFile::default();
    config.device.index = Some(2);
    config.device.backend = "V4l2".to_string();
    config.video.width = 1280;
    config.video.height = 720;
    config.capture.stop_timeout_ms = 250;

    config
        .save_to(config_path.clone())
        .expect("Failed to save config");
    assert!(config_path.exists());

    let loaded = ConfigFile::load_from(config_path).expect("Failed to load config");
    let runtime = loaded.to_capture_config().unwrap();
    assert_eq!(runtime.device, Some(2));
    assert_eq!(runtime.backend, "V4l2");
    assert_eq!(runtime.main_resolution, Resolution::new(1280, 720));
    assert_eq!(runtime.stop_timeout, Duration::from_millis(250));
}

#[test]
fn test_missing_file_gives_defaults() {
    let loaded = ConfigFile::load_from("/nonexistent/path/config.toml".into()).unwrap();
    assert_eq!(loaded.to_capture_config().unwrap(), CaptureConfig::default());
}

#[test]
fn test_partial_file_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[video]\nwidth = 640\nheight = 480\n").unwrap();

    let runtime = ConfigFile::load_from(path)
        .unwrap()
        .to_capture_config()
        .unwrap();
    assert_eq!(runtime.main_resolution, Resolution::new(640, 480));
    assert_eq!(runtime.max_sources, 10);
    assert_eq!(runtime.device, None);
}

#[test]
fn test_malformed_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[video\nwidth = ").unwrap();

    let err = ConfigFile::load_from(path).unwrap_err();
    assert!(matches!(err, CaptureError::Config(_)));
    assert!(err.is_recoverable());
}

#[test]
fn test_init_writes_sample_once() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("hudcap").join("config.toml");

    assert!(ConfigFile::init_at(path.clone(), false).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), sample_config());

    std::fs::write(&path, "[video]\nwidth = 640\nheight = 480\n").unwrap();
    assert!(!ConfigFile::init_at(path.clone(), false).unwrap());
    assert_eq!(ConfigFile::load_from(path.clone()).unwrap().video.width, 640);

    assert!(ConfigFile::init_at(path.clone(), true).unwrap());
    assert_eq!(ConfigFile::load_from(path).unwrap().video.width, 1920);
}

#[test]
fn test_unwritable_path_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let err = ConfigFile::default()
        .save_to(blocker.join("config.toml"))
        .unwrap_err();
    assert!(matches!(err, CaptureError::Io(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn test_update_from_records_selection() {
    let mut file = ConfigFile::default();
    let runtime = CaptureConfig::default().with_device(3).with_backend("Msmf");
    file.update_from(&runtime);
    assert_eq!(file.device.index, Some(3));
    assert_eq!(file.device.backend, "Msmf");

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    file.save_to(path.clone()).unwrap();
    let saved = ConfigFile::load_from(path).unwrap();
    assert_eq!(saved.device.index, Some(3));
}

#[test]
fn test_sample_config_is_default() {
    let parsed: ConfigFile = toml::from_str(&sample_config()).unwrap();
    assert_eq!(parsed.to_capture_config().unwrap(), CaptureConfig::default());
}

#[test]
fn test_bounds_error_message() {
    let err = CaptureError::bounds(
        Rect::new(40, 40, 30, 30),
        Resolution::new(64, 48).bounds(),
    );
    assert_eq!(
        err.to_string(),
        "illegal boundaries (40,40)-(70,70) outside (0,0)-(64,48)"
    );
}

#[test]
fn test_result_ext_context() {
    let result: Result<(), CaptureError> = Err(CaptureError::device("read failed"));
    let err = result.context("Capturing from CamA").unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("Capturing from CamA"));
    assert!(msg.contains("read failed"));
    assert!(!err.is_recoverable());
}
