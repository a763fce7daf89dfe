//! Output modes, feature flags, and device layout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParamError;
use crate::param::{ParamValue, ParameterSet};

/// Output routing mode.
///
/// Determines how many independent output paths exist and which device and
/// channel group each one drives.
///
/// | mode        | paths | input channels      | outputs                           |
/// |-------------|-------|---------------------|-----------------------------------|
/// | `Left`      | 1     | channel 0           | first device                      |
/// | `Right`     | 1     | channel 1           | first device                      |
/// | `Mono`      | 1     | downmix of both     | first device                      |
/// | `Stereo`    | 2     | channels 0 and 1    | one device per path               |
/// | `Stereo40`  | 2     | channels 0 and 1    | first device, shifted channel mask|
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Left input channel only.
    Left,
    /// Right input channel only.
    Right,
    /// Both input channels mixed to one path.
    Mono,
    /// Two paths on two devices.
    Stereo,
    /// Two paths on one four-channel device (front/rear channel groups).
    #[serde(rename = "stereo_40")]
    Stereo40,
}

impl OutputMode {
    /// All modes, in declaration order.
    pub const ALL: [OutputMode; 5] = [
        OutputMode::Left,
        OutputMode::Right,
        OutputMode::Mono,
        OutputMode::Stereo,
        OutputMode::Stereo40,
    ];

    /// Path indices active in this mode.
    ///
    /// A path index equals the input channel it carries, so a `Right`
    /// rig addresses `equalizer1` just like the right half of a stereo rig.
    pub const fn path_indices(self) -> &'static [usize] {
        match self {
            OutputMode::Left | OutputMode::Mono => &[0],
            OutputMode::Right => &[1],
            OutputMode::Stereo | OutputMode::Stereo40 => &[0, 1],
        }
    }

    /// Number of independent output paths.
    pub const fn path_count(self) -> usize {
        self.path_indices().len()
    }

    /// Lowercase configuration name.
    pub const fn as_str(self) -> &'static str {
        match self {
            OutputMode::Left => "left",
            OutputMode::Right => "right",
            OutputMode::Mono => "mono",
            OutputMode::Stereo => "stereo",
            OutputMode::Stereo40 => "stereo_40",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(OutputMode::Left),
            "right" => Ok(OutputMode::Right),
            "mono" => Ok(OutputMode::Mono),
            "stereo" => Ok(OutputMode::Stereo),
            "stereo_40" | "stereo40" => Ok(OutputMode::Stereo40),
            _ => Err(ParamError::UnknownMode(s.to_string())),
        }
    }
}

/// Default sink buffer time in microseconds.
pub const DEFAULT_BUFFER_TIME_US: u32 = 10;

/// Structural feature switches, orthogonal to the output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Replace the capture source with a synthetic test tone.
    pub test_source: bool,
    /// Add a protection level sensor after each path's master volume.
    pub woofer_protection: bool,
    /// Add a loudness level sensor on the input, before the channel split.
    pub loudness_compensation: bool,
    /// Sink buffer time in microseconds.
    pub buffer_time_us: u32,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            test_source: false,
            woofer_protection: false,
            loudness_compensation: false,
            buffer_time_us: DEFAULT_BUFFER_TIME_US,
        }
    }
}

/// Output device and channel-group assignment.
///
/// In `Stereo40` mode both paths share `devices[0]`; the second path's channel
/// mask is the first one shifted left by `group_shift` bits. With the default
/// shift of one nibble that is the first mask multiplied by 16.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceLayout {
    /// Capture device feeding the graph.
    pub input_device: String,
    /// Output devices. Single-path modes and `Stereo40` use the first entry.
    pub devices: [String; 2],
    /// Channel mask of the first path.
    pub channel_mask: u32,
    /// Bit shift between consecutive channel groups on a shared device.
    pub group_shift: u32,
}

impl Default for DeviceLayout {
    fn default() -> Self {
        Self {
            input_device: "hw:0".to_string(),
            devices: ["hw:0".to_string(), "hw:1".to_string()],
            channel_mask: 0x3,
            group_shift: 4,
        }
    }
}

impl DeviceLayout {
    /// Channel mask for the `slot`-th channel group on a shared device.
    ///
    /// Returns `None` when the shifted mask no longer fits in 32 bits.
    pub fn group_mask(&self, slot: usize) -> Option<u32> {
        let shift = self.group_shift.checked_mul(u32::try_from(slot).ok()?)?;
        let mask = self.channel_mask.checked_shl(shift)?;
        (mask >> shift == self.channel_mask).then_some(mask)
    }
}

/// The structural part of a parameter set: everything that forces a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Structure {
    /// Output mode.
    pub mode: OutputMode,
    /// Feature flags.
    pub flags: FeatureFlags,
}

impl Structure {
    /// Key selecting the [`OutputMode`].
    pub const MODE_KEY: &'static str = "configuration";
    /// Key for [`FeatureFlags::test_source`].
    pub const TEST_SOURCE_KEY: &'static str = "test_source";
    /// Key for [`FeatureFlags::woofer_protection`].
    pub const WOOFER_PROTECTION_KEY: &'static str = "woofer_protection";
    /// Key for [`FeatureFlags::loudness_compensation`].
    pub const LOUDNESS_KEY: &'static str = "loudness_compensation";
    /// Key for [`FeatureFlags::buffer_time_us`].
    pub const BUFFER_TIME_KEY: &'static str = "buffer_time";

    /// All structural keys.
    pub const KEYS: [&'static str; 5] = [
        Self::MODE_KEY,
        Self::TEST_SOURCE_KEY,
        Self::WOOFER_PROTECTION_KEY,
        Self::LOUDNESS_KEY,
        Self::BUFFER_TIME_KEY,
    ];

    /// Returns true if `key` is structural.
    pub fn is_structural(key: &str) -> bool {
        Self::KEYS.contains(&key)
    }

    /// Decode the structural settings from a parameter set.
    ///
    /// `configuration` is required; absent flags take their defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use xover_core::{OutputMode, ParameterSet, Structure};
    ///
    /// let params = ParameterSet::new()
    ///     .with("configuration", "Stereo")
    ///     .with("woofer_protection", true);
    /// let structure = Structure::from_params(&params).unwrap();
    /// assert_eq!(structure.mode, OutputMode::Stereo);
    /// assert!(structure.flags.woofer_protection);
    /// assert!(!structure.flags.test_source);
    /// ```
    pub fn from_params(params: &ParameterSet) -> Result<Self, ParamError> {
        let mode = match params.get(Self::MODE_KEY) {
            Some(ParamValue::Text(s)) => s.parse()?,
            Some(other) => return Err(ParamError::wrong_type(Self::MODE_KEY, "a mode name", other)),
            None => return Err(ParamError::MissingKey(Self::MODE_KEY)),
        };

        let defaults = FeatureFlags::default();
        let flags = FeatureFlags {
            test_source: flag(params, Self::TEST_SOURCE_KEY)?.unwrap_or(defaults.test_source),
            woofer_protection: flag(params, Self::WOOFER_PROTECTION_KEY)?
                .unwrap_or(defaults.woofer_protection),
            loudness_compensation: flag(params, Self::LOUDNESS_KEY)?
                .unwrap_or(defaults.loudness_compensation),
            buffer_time_us: buffer_time(params)?.unwrap_or(defaults.buffer_time_us),
        };

        Ok(Self { mode, flags })
    }
}

fn flag(params: &ParameterSet, key: &'static str) -> Result<Option<bool>, ParamError> {
    params
        .get(key)
        .map(|v| v.as_bool().ok_or_else(|| ParamError::wrong_type(key, "a boolean", v)))
        .transpose()
}

fn buffer_time(params: &ParameterSet) -> Result<Option<u32>, ParamError> {
    let key = Structure::BUFFER_TIME_KEY;
    params
        .get(key)
        .map(|v| {
            v.as_f64()
                .filter(|t| t.fract() == 0.0 && *t >= 0.0 && *t <= f64::from(u32::MAX))
                .map(|t| t as u32)
                .ok_or_else(|| ParamError::wrong_type(key, "a non-negative integer", v))
        })
        .transpose()
}
