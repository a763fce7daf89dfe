//! Integration tests for xover-config.
//!
//! These tests verify end-to-end functionality across modules.

use std::path::PathBuf;

use xover_config::keys::{self, ParamTarget};
use xover_config::{ConfigError, RigConfig, load_parameters};
use xover_core::{OutputMode, Structure};
use tempfile::TempDir;

/// A typical two-way crossover parameter file.
const SAMPLE_PARAMS: &str = r#"{
    "configuration": "stereo",
    "volume": 0.01,
    "low_frequency": 2000,
    "low_order": 8,
    "low_volume": 1.0,
    "low_eq_29Hz": 0.0,
    "low_eq_59Hz": 6.0,
    "low_eq_119Hz": 0.0,
    "high_frequency": 2000,
    "high_order": 8,
    "high_volume": 1.0
}"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn sample_parameter_file_is_fully_known() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "two_way_crossover.json", SAMPLE_PARAMS);

    let params = load_parameters(&path).unwrap();
    for (key, value) in params.iter() {
        let spec = keys::lookup(key).unwrap_or_else(|| panic!("unknown key {key}"));
        assert!(spec.expects.accepts(value), "{key} = {value}");
    }

    let structure = Structure::from_params(&params).unwrap();
    assert_eq!(structure.mode, OutputMode::Stereo);
    assert!(!structure.flags.woofer_protection);
}

#[test]
fn rig_file_points_at_parameter_file() {
    let dir = TempDir::new().unwrap();
    let params = write(&dir, "params.json", SAMPLE_PARAMS);
    let rig_path = write(
        &dir,
        "rig.toml",
        &format!("parameter_file = {:?}\npoll_interval_ms = 250\n", params.display().to_string()),
    );

    let rig = RigConfig::load(&rig_path).unwrap();
    assert_eq!(rig.parameter_file, params);
    assert_eq!(rig.poll_interval().as_millis(), 250);
    assert_eq!(load_parameters(&rig.parameter_file).unwrap().len(), 11);
}

#[test]
fn rig_load_reports_path_on_missing_file() {
    let err = RigConfig::load("/no/such/rig.toml").unwrap_err();
    match err {
        ConfigError::ReadFile { path, .. } => assert_eq!(path, PathBuf::from("/no/such/rig.toml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn eq_keys_route_through_controller() {
    for key in ["low_eq_29Hz", "low_eq_59Hz", "low_eq_119Hz"] {
        assert!(matches!(
            keys::lookup(key).unwrap().target,
            ParamTarget::EqBand(_)
        ));
    }
}
