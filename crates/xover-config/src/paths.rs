//! Platform-specific paths for configuration.
//!
//! - **User config**: `~/.config/xover/` (Linux), `~/Library/Application Support/xover/` (macOS), `%APPDATA%\xover\` (Windows)
//! - **Rig file**: `<user config>/rig.toml`
//! - **System rig file**: `/etc/xover/rig.toml` (Unix)

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "xover";

/// File name of the rig configuration.
pub const RIG_FILE_NAME: &str = "rig.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the system-wide configuration directory.
pub fn system_config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/etc").join(APP_NAME)
    }
    #[cfg(not(unix))]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
    }
}

/// Path of the user rig file (may not exist).
pub fn user_rig_path() -> PathBuf {
    user_config_dir().join(RIG_FILE_NAME)
}

/// Find the rig file to use when none is given explicitly.
///
/// Searches the user config directory, then the system config directory.
pub fn find_rig_config() -> Option<PathBuf> {
    [user_rig_path(), system_config_dir().join(RIG_FILE_NAME)]
        .into_iter()
        .find(|p| p.is_file())
}

/// Ensure the user config directory exists.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }

    Ok(dir)
}
