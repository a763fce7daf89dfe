//! Node roles, engine element kinds, and node specifications.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::param::ParamValue;

/// Engine element type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Hardware capture source.
    CaptureSource,
    /// Synthetic tone generator.
    ToneSource,
    /// Peak level meter publishing telemetry.
    LevelMeter,
    /// Splits (or downmixes) an interleaved stream into per-channel outputs.
    ChannelSelect,
    /// Copies one input to several branches.
    Tee,
    /// Graphic equalizer; only the three lowest bands are driven.
    Equalizer,
    /// Low-pass crossover filter.
    LowPass,
    /// High-pass crossover filter.
    HighPass,
    /// Gain stage.
    Volume,
    /// Merges the low and high bands into one multi-channel stream.
    Interleave,
    /// Hardware playback sink.
    Sink,
}

/// Functional role of a node within the topology.
///
/// Per-path roles are suffixed with the path index (`equalizer0`,
/// `low_xover1`); shared roles have a bare name (`test_tone`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Capture source.
    Input,
    /// Test tone replacing the capture source.
    TestTone,
    /// Loudness sensor ahead of the channel split.
    LoudnessLevel,
    /// Channel split / downmix.
    Split,
    /// Per-path band splitter.
    Tee,
    /// Per-path low-band equalizer.
    Equalizer,
    /// Per-path low-pass crossover.
    LowXover,
    /// Per-path low-band trim.
    LowVol,
    /// Per-path high-pass crossover.
    HighXover,
    /// Per-path high-band trim.
    HighVol,
    /// Per-path band interleaver.
    Interleave,
    /// Per-path master volume.
    MasterVol,
    /// Per-path protection sensor.
    ProtectLevel,
    /// Per-path output sink.
    Sink,
}

impl NodeRole {
    /// Name prefix for this role.
    pub const fn prefix(self) -> &'static str {
        match self {
            NodeRole::Input => "input",
            NodeRole::TestTone => "test_tone",
            NodeRole::LoudnessLevel => "loudness_level",
            NodeRole::Split => "split",
            NodeRole::Tee => "tee",
            NodeRole::Equalizer => "equalizer",
            NodeRole::LowXover => "low_xover",
            NodeRole::LowVol => "low_vol",
            NodeRole::HighXover => "high_xover",
            NodeRole::HighVol => "high_vol",
            NodeRole::Interleave => "interleave",
            NodeRole::MasterVol => "master_vol",
            NodeRole::ProtectLevel => "protect_level",
            NodeRole::Sink => "sink",
        }
    }

    /// Returns true if one node of this role exists per output path.
    pub const fn is_per_path(self) -> bool {
        !matches!(
            self,
            NodeRole::Input | NodeRole::TestTone | NodeRole::LoudnessLevel | NodeRole::Split
        )
    }

    /// Deterministic node name for this role on `path`.
    ///
    /// Shared roles ignore the path index.
    ///
    /// ```rust
    /// use xover_core::NodeRole;
    ///
    /// assert_eq!(NodeRole::Equalizer.node_name(0), "equalizer0");
    /// assert_eq!(NodeRole::LowXover.node_name(1), "low_xover1");
    /// assert_eq!(NodeRole::TestTone.node_name(1), "test_tone");
    /// ```
    pub fn node_name(self, path: usize) -> String {
        if self.is_per_path() {
            format!("{}{path}", self.prefix())
        } else {
            self.prefix().to_string()
        }
    }

    /// Parse a node name back into its role and path index.
    ///
    /// Shared roles return `None` for the path.
    pub fn parse_name(name: &str) -> Option<(NodeRole, Option<usize>)> {
        const ROLES: [NodeRole; 14] = [
            NodeRole::Input,
            NodeRole::TestTone,
            NodeRole::LoudnessLevel,
            NodeRole::Split,
            NodeRole::Tee,
            NodeRole::Equalizer,
            NodeRole::LowXover,
            NodeRole::LowVol,
            NodeRole::HighXover,
            NodeRole::HighVol,
            NodeRole::Interleave,
            NodeRole::MasterVol,
            NodeRole::ProtectLevel,
            NodeRole::Sink,
        ];
        ROLES.into_iter().find_map(|role| {
            let rest = name.strip_prefix(role.prefix())?;
            if role.is_per_path() {
                let digits_only = !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit());
                digits_only
                    .then(|| rest.parse().ok())
                    .flatten()
                    .map(|p| (role, Some(p)))
            } else {
                rest.is_empty().then_some((role, None))
            }
        })
    }
}

/// One node of a [`GraphDescription`](crate::GraphDescription).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSpec {
    /// Unique, deterministic node name.
    pub name: String,
    /// Functional role.
    pub role: NodeRole,
    /// Path index for per-path roles.
    pub path: Option<usize>,
    /// Engine element type.
    pub kind: NodeKind,
    /// Initial property values, keyed by engine property name.
    pub properties: BTreeMap<String, ParamValue>,
}

impl NodeSpec {
    /// Look up an initial property.
    pub fn property(&self, name: &str) -> Option<&ParamValue> {
        self.properties.get(name)
    }
}
