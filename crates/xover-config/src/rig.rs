//! Rig configuration: static settings for the process lifetime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use xover_core::DeviceLayout;

use crate::error::ConfigError;

/// Amplifier enable line settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmplifierConfig {
    /// Seconds of silence before the amplifier is switched off.
    pub idle_seconds: u32,
    /// Idle ticker period in milliseconds.
    pub tick_ms: u64,
    /// GPIO pin driving the enable line (informational for the log line).
    pub gpio_pin: u32,
    /// The line enables the amplifier when driven low.
    pub active_low: bool,
}

impl Default for AmplifierConfig {
    fn default() -> Self {
        Self {
            idle_seconds: 3,
            tick_ms: 100,
            gpio_pin: 15,
            active_low: true,
        }
    }
}

impl AmplifierConfig {
    /// Ticker period.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Idle period.
    pub fn idle(&self) -> Duration {
        Duration::from_secs(u64::from(self.idle_seconds))
    }
}

/// Feedback loop thresholds, all in dBFS except the gain floor (dB).
///
/// The three loudness/protection thresholds are start values; the
/// `loudness_low`, `loudness_high`, and `protect_threshold` parameter keys
/// override them at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Below this input level loudness compensation is at maximum.
    pub loudness_low_db: f64,
    /// Above this input level loudness compensation is off.
    pub loudness_high_db: f64,
    /// Output level above which the woofer protection attenuates.
    pub protect_threshold_db: f64,
    /// Any peak above this level counts as amplifier activity.
    pub activity_threshold_db: f64,
    /// Lowest gain ever written to an equalizer band.
    pub gain_floor_db: f64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            loudness_low_db: -50.0,
            loudness_high_db: -20.0,
            protect_threshold_db: -6.0,
            activity_threshold_db: -35.0,
            gain_floor_db: -24.0,
        }
    }
}

/// Complete rig configuration.
///
/// # TOML Format
///
/// Every table and field is optional; omitted values take their defaults.
///
/// ```toml
/// parameter_file = "two_way_crossover.json"
/// poll_interval_ms = 1000
///
/// [layout]
/// input_device = "hw:0"
/// devices = ["hw:0", "hw:1"]
/// channel_mask = 3
/// group_shift = 4
///
/// [amplifier]
/// idle_seconds = 3
/// tick_ms = 100
/// gpio_pin = 15
/// active_low = true
///
/// [feedback]
/// loudness_low_db = -50.0
/// loudness_high_db = -20.0
/// protect_threshold_db = -6.0
/// activity_threshold_db = -35.0
/// gain_floor_db = -24.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Parameter file to load and watch.
    pub parameter_file: PathBuf,
    /// Parameter file polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Device and channel assignment.
    pub layout: DeviceLayout,
    /// Amplifier enable line.
    pub amplifier: AmplifierConfig,
    /// Feedback loop thresholds.
    pub feedback: FeedbackConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            parameter_file: PathBuf::from("two_way_crossover.json"),
            poll_interval_ms: 1000,
            layout: DeviceLayout::default(),
            amplifier: AmplifierConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

impl RigConfig {
    /// Load and validate a rig file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a rig configuration from TOML text.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let rig: RigConfig = toml::from_str(toml_str)?;
        rig.validate()?;
        Ok(rig)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Parameter file polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval_ms", "must be positive"));
        }
        if self.layout.channel_mask == 0 {
            return Err(ConfigError::invalid("layout.channel_mask", "must select at least one channel"));
        }
        let Some(second) = self.layout.group_mask(1) else {
            return Err(ConfigError::invalid(
                "layout.group_shift",
                format!(
                    "mask {:#x} shifted by {} bits does not fit in 32 bits",
                    self.layout.channel_mask, self.layout.group_shift
                ),
            ));
        };
        if second & self.layout.channel_mask != 0 {
            return Err(ConfigError::invalid(
                "layout.group_shift",
                format!(
                    "channel groups {:#x} and {second:#x} overlap",
                    self.layout.channel_mask
                ),
            ));
        }
        if self.amplifier.tick_ms == 0 {
            return Err(ConfigError::invalid("amplifier.tick_ms", "must be positive"));
        }
        let fb = &self.feedback;
        let finite = [
            fb.loudness_low_db,
            fb.loudness_high_db,
            fb.protect_threshold_db,
            fb.activity_threshold_db,
            fb.gain_floor_db,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(ConfigError::invalid("feedback", "thresholds must be finite"));
        }
        if fb.loudness_low_db >= fb.loudness_high_db {
            return Err(ConfigError::invalid(
                "feedback.loudness_low_db",
                "must be below loudness_high_db",
            ));
        }
        if fb.gain_floor_db > 0.0 {
            return Err(ConfigError::invalid("feedback.gain_floor_db", "must not be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let rig = RigConfig::from_toml("").unwrap();
        assert_eq!(rig, RigConfig::default());
        assert_eq!(rig.amplifier.idle(), Duration::from_secs(3));
        assert_eq!(rig.amplifier.tick(), Duration::from_millis(100));
    }

    #[test]
    fn partial_tables_keep_defaults() {
        let rig = RigConfig::from_toml(
            r#"
            [layout]
            devices = ["hw:2", "hw:3"]

            [feedback]
            protect_threshold_db = -3.0
            "#,
        )
        .unwrap();
        assert_eq!(rig.layout.devices, ["hw:2".to_string(), "hw:3".to_string()]);
        assert_eq!(rig.layout.channel_mask, 0x3);
        assert_eq!(rig.feedback.protect_threshold_db, -3.0);
        assert_eq!(rig.feedback.gain_floor_db, -24.0);
    }

    #[test]
    fn rejects_overlapping_groups() {
        let err = RigConfig::from_toml("[layout]\nchannel_mask = 15\ngroup_shift = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "layout.group_shift", .. }));
    }

    #[test]
    fn rejects_overflowing_groups() {
        let err = RigConfig::from_toml("[layout]\nchannel_mask = 4026531840\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "layout.group_shift", .. }));
    }

    #[test]
    fn rejects_inverted_loudness_thresholds() {
        let err = RigConfig::from_toml(
            "[feedback]\nloudness_low_db = -10.0\nloudness_high_db = -20.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "feedback.loudness_low_db", .. }));
    }

    #[test]
    fn rejects_zero_tick() {
        let err = RigConfig::from_toml("[amplifier]\ntick_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "amplifier.tick_ms", .. }));
    }

    #[test]
    fn rejects_unknown_toml_syntax() {
        assert!(matches!(
            RigConfig::from_toml("[layout\n"),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rig.toml");
        let mut rig = RigConfig::default();
        rig.amplifier.idle_seconds = 10;
        rig.save(&path).unwrap();
        assert_eq!(RigConfig::load(&path).unwrap(), rig);
    }
}
