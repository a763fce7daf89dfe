//! CLI command implementations.

pub mod init;
pub mod keys;
pub mod plan;
pub mod run;

use std::path::Path;

use xover_config::RigConfig;

/// Load the rig file given on the command line, else the first one found in
/// the config directories, else the defaults.
pub fn load_rig(explicit: Option<&Path>) -> anyhow::Result<RigConfig> {
    if let Some(path) = explicit {
        return Ok(RigConfig::load(path)?);
    }
    match xover_config::paths::find_rig_config() {
        Some(path) => {
            tracing::info!(path = %path.display(), "using rig file");
            Ok(RigConfig::load(&path)?)
        }
        None => {
            tracing::info!("no rig file found, using defaults");
            Ok(RigConfig::default())
        }
    }
}
