//! Configuration for the xover control plane.
//!
//! Two files configure a running rig:
//!
//! - the **parameter file** (JSON): the live, hot-reloadable [`ParameterSet`]
//!   (output mode, feature flags, crossover, equalizer, and volume settings)
//! - the **rig file** (TOML): static settings for the process lifetime
//!   (device layout, amplifier line, feedback thresholds), see [`RigConfig`]
//!
//! # Features
//!
//! - **Parameter files**: [`load_parameters`] / [`parse_parameters`]
//! - **Hot reload**: [`ParameterWatcher`] polls the parameter file's
//!   modification time and [`spawn_watcher`] runs it on a thread
//! - **Key table**: [`keys`] maps every parameter key to its target
//! - **Paths**: platform-specific rig file location
//!
//! # Example
//!
//! ```rust
//! use xover_config::{RigConfig, parse_parameters};
//!
//! let params = parse_parameters(r#"{"configuration": "stereo", "low_frequency": 1800}"#).unwrap();
//! assert_eq!(params.len(), 2);
//!
//! let rig = RigConfig::from_toml("[amplifier]\nidle_seconds = 5\n").unwrap();
//! assert_eq!(rig.amplifier.idle_seconds, 5);
//! ```

mod error;
mod params;
mod rig;
mod watcher;

/// Declarative parameter key table.
pub mod keys;

/// Platform-specific paths for the rig file.
pub mod paths;

pub use error::ConfigError;
pub use keys::{ControllerParam, Fanout, KeySpec, ParamTarget, ValueKind};
pub use params::{load_parameters, parse_parameters};
pub use rig::{AmplifierConfig, FeedbackConfig, RigConfig};
pub use watcher::{ParameterWatcher, spawn_watcher};

/// Re-export of the parameter model from `xover-core`.
pub use xover_core::{ParamValue, ParameterSet};
