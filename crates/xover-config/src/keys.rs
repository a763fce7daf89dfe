//! Declarative parameter key table.
//!
//! Every key the parameter file may contain maps to exactly one
//! [`ParamTarget`]. The reconciler evaluates this table uniformly; adding a
//! key is a table entry, not new control flow.
//!
//! # Example
//!
//! ```rust
//! use xover_config::keys::{self, Fanout, ParamTarget};
//! use xover_core::NodeRole;
//!
//! let spec = keys::lookup("low_frequency").unwrap();
//! assert_eq!(
//!     spec.target,
//!     ParamTarget::Node { role: NodeRole::LowXover, property: "cutoff", fanout: Fanout::PerPath }
//! );
//! assert!(keys::lookup("reverb_mix").is_none());
//! ```

use xover_core::{NodeRole, ParamValue, Structure};

/// How a node-targeted key is distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fanout {
    /// Written to the role's node on every active path.
    PerPath,
    /// Written to the role's single shared node.
    Single,
}

/// Feedback controller setting addressed by a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerParam {
    /// Loudness low threshold (dBFS).
    LoudnessLow,
    /// Loudness high threshold (dBFS).
    LoudnessHigh,
    /// Woofer protection threshold (dBFS).
    ProtectThreshold,
}

/// Where a key's value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamTarget {
    /// Output mode or feature flag: any change forces a rebuild.
    Structural,
    /// A property on one node role.
    Node {
        /// Target node role.
        role: NodeRole,
        /// Engine property name.
        property: &'static str,
        /// Distribution rule.
        fanout: Fanout,
    },
    /// Maximum gain of a low equalizer band, applied through the feedback
    /// controller to `equalizer<p>.band<N>`.
    EqBand(usize),
    /// A feedback controller setting.
    Controller(ControllerParam),
}

/// Value type a key accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Any number.
    Number,
    /// A whole, non-negative number.
    Count,
    /// A string.
    Text,
    /// A boolean (or a number, nonzero meaning `true`).
    Flag,
}

impl ValueKind {
    /// Returns true if `value` is acceptable for this kind.
    pub fn accepts(self, value: &ParamValue) -> bool {
        match (self, value) {
            (ValueKind::Number, ParamValue::Number(v)) => v.is_finite(),
            (ValueKind::Count, ParamValue::Number(v)) => *v >= 0.0 && v.fract() == 0.0,
            (ValueKind::Text, ParamValue::Text(_)) => true,
            (ValueKind::Flag, ParamValue::Bool(_) | ParamValue::Number(_)) => true,
            _ => false,
        }
    }

    /// Human-readable description.
    pub const fn describe(self) -> &'static str {
        match self {
            ValueKind::Number => "a number",
            ValueKind::Count => "a non-negative integer",
            ValueKind::Text => "a string",
            ValueKind::Flag => "a boolean",
        }
    }
}

/// One row of the key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
    /// Parameter key.
    pub key: &'static str,
    /// Target.
    pub target: ParamTarget,
    /// Accepted value type.
    pub expects: ValueKind,
    /// One-line description for `xover keys`.
    pub help: &'static str,
}

const fn node(
    key: &'static str,
    role: NodeRole,
    property: &'static str,
    fanout: Fanout,
    expects: ValueKind,
    help: &'static str,
) -> KeySpec {
    KeySpec {
        key,
        target: ParamTarget::Node {
            role,
            property,
            fanout,
        },
        expects,
        help,
    }
}

/// The key table.
pub static KEY_TABLE: &[KeySpec] = &[
    KeySpec {
        key: Structure::MODE_KEY,
        target: ParamTarget::Structural,
        expects: ValueKind::Text,
        help: "output mode: left, right, mono, stereo, stereo_40",
    },
    KeySpec {
        key: Structure::TEST_SOURCE_KEY,
        target: ParamTarget::Structural,
        expects: ValueKind::Flag,
        help: "replace the capture input with a test tone",
    },
    KeySpec {
        key: Structure::WOOFER_PROTECTION_KEY,
        target: ParamTarget::Structural,
        expects: ValueKind::Flag,
        help: "attenuate bass when the output exceeds the protection threshold",
    },
    KeySpec {
        key: Structure::LOUDNESS_KEY,
        target: ParamTarget::Structural,
        expects: ValueKind::Flag,
        help: "boost bass at low listening levels",
    },
    KeySpec {
        key: Structure::BUFFER_TIME_KEY,
        target: ParamTarget::Structural,
        expects: ValueKind::Count,
        help: "sink buffer time in microseconds (rebuild only)",
    },
    node("volume", NodeRole::MasterVol, "volume", Fanout::PerPath, ValueKind::Number, "master volume (linear); keep above 0.001"),
    node("low_frequency", NodeRole::LowXover, "cutoff", Fanout::PerPath, ValueKind::Number, "bass crossover frequency (Hz)"),
    node("low_order", NodeRole::LowXover, "poles", Fanout::PerPath, ValueKind::Count, "bass crossover filter order"),
    node("low_volume", NodeRole::LowVol, "volume", Fanout::PerPath, ValueKind::Number, "bass trim (linear)"),
    node("high_frequency", NodeRole::HighXover, "cutoff", Fanout::PerPath, ValueKind::Number, "treble crossover frequency (Hz)"),
    node("high_order", NodeRole::HighXover, "poles", Fanout::PerPath, ValueKind::Count, "treble crossover filter order"),
    node("high_volume", NodeRole::HighVol, "volume", Fanout::PerPath, ValueKind::Number, "treble trim (linear)"),
    KeySpec {
        key: "low_eq_29Hz",
        target: ParamTarget::EqBand(0),
        expects: ValueKind::Number,
        help: "29 Hz equalizer band maximum gain (dB)",
    },
    KeySpec {
        key: "low_eq_59Hz",
        target: ParamTarget::EqBand(1),
        expects: ValueKind::Number,
        help: "59 Hz equalizer band maximum gain (dB)",
    },
    KeySpec {
        key: "low_eq_119Hz",
        target: ParamTarget::EqBand(2),
        expects: ValueKind::Number,
        help: "119 Hz equalizer band maximum gain (dB)",
    },
    node("test_frequency", NodeRole::TestTone, "freq", Fanout::Single, ValueKind::Number, "test tone frequency (Hz)"),
    node("test_volume", NodeRole::TestTone, "volume", Fanout::Single, ValueKind::Number, "test tone volume (linear)"),
    node("test_wave", NodeRole::TestTone, "wave", Fanout::Single, ValueKind::Text, "test tone waveform"),
    KeySpec {
        key: "loudness_low",
        target: ParamTarget::Controller(ControllerParam::LoudnessLow),
        expects: ValueKind::Number,
        help: "input level (dBFS) below which loudness compensation is at maximum",
    },
    KeySpec {
        key: "loudness_high",
        target: ParamTarget::Controller(ControllerParam::LoudnessHigh),
        expects: ValueKind::Number,
        help: "input level (dBFS) above which loudness compensation is off",
    },
    KeySpec {
        key: "protect_threshold",
        target: ParamTarget::Controller(ControllerParam::ProtectThreshold),
        expects: ValueKind::Number,
        help: "output level (dBFS) above which woofer protection attenuates",
    },
];

/// Look up a key.
pub fn lookup(key: &str) -> Option<&'static KeySpec> {
    KEY_TABLE.iter().find(|spec| spec.key == key)
}

/// Engine property name of equalizer band `band`.
pub fn eq_band_property(band: usize) -> String {
    format!("band{band}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = KEY_TABLE.iter().map(|s| s.key).collect();
        let before = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }

    #[test]
    fn fanout_agrees_with_role() {
        for spec in KEY_TABLE {
            if let ParamTarget::Node { role, fanout, .. } = spec.target {
                let expected = if role.is_per_path() {
                    Fanout::PerPath
                } else {
                    Fanout::Single
                };
                assert_eq!(fanout, expected, "{}", spec.key);
            }
        }
    }

    #[test]
    fn every_structural_key_is_listed() {
        for key in Structure::KEYS {
            assert_eq!(lookup(key).map(|s| s.target), Some(ParamTarget::Structural), "{key}");
        }
    }

    #[test]
    fn eq_bands_cover_three_bands() {
        let bands: Vec<_> = KEY_TABLE
            .iter()
            .filter_map(|s| match s.target {
                ParamTarget::EqBand(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(bands, vec![0, 1, 2]);
        assert_eq!(eq_band_property(1), "band1");
    }

    #[test]
    fn value_kinds() {
        assert!(ValueKind::Number.accepts(&ParamValue::Number(-3.5)));
        assert!(!ValueKind::Number.accepts(&ParamValue::Number(f64::NAN)));
        assert!(ValueKind::Count.accepts(&ParamValue::Number(8.0)));
        assert!(!ValueKind::Count.accepts(&ParamValue::Number(8.5)));
        assert!(!ValueKind::Count.accepts(&ParamValue::Number(-1.0)));
        assert!(ValueKind::Flag.accepts(&ParamValue::Number(1.0)));
        assert!(ValueKind::Flag.accepts(&ParamValue::Bool(false)));
        assert!(!ValueKind::Text.accepts(&ParamValue::Bool(false)));
    }
}
