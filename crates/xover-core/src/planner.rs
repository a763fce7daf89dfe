//! Topology planner: output mode and feature flags to a graph description.
//!
//! Each output path gets the same two-way sub-graph:
//!
//! ```text
//!                   ┌─ equalizer<p> ─ low_xover<p> ─ low_vol<p> ─┐
//! split ─ tee<p> ───┤                                             ├─ interleave<p> ─ master_vol<p> ─ [protect_level<p>] ─ sink<p>
//!                   └─ high_xover<p> ─ high_vol<p> ───────────────┘
//! ```
//!
//! Ahead of the split sits either the capture source (`input`) or the test
//! tone (`test_tone`), optionally followed by the `loudness_level` sensor.
//! Optional nodes are only present when their flag is set.
//!
//! Planning is a total, pure function: the same inputs always produce an
//! identical description.

use std::collections::BTreeMap;

use crate::graph::{Edge, GraphDescription, NodeKind, NodeRole, NodeSpec, PathSpec};
use crate::mode::{DeviceLayout, FeatureFlags, OutputMode};
use crate::param::ParamValue;

/// Default crossover frequency in Hz, shared by both bands.
pub const DEFAULT_CROSSOVER_HZ: f64 = 2000.0;

/// Default crossover filter order.
pub const DEFAULT_CROSSOVER_POLES: f64 = 8.0;

/// Default master volume (linear).
pub const DEFAULT_MASTER_VOLUME: f64 = 0.01;

/// Default equalizer gains for the three driven bands, in dB.
pub const DEFAULT_EQ_BANDS_DB: [f64; 3] = [0.0, 6.0, 0.0];

/// Default test tone frequency in Hz.
pub const DEFAULT_TEST_FREQUENCY_HZ: f64 = 440.0;

/// Plan a topology using the default [`DeviceLayout`].
pub fn plan(mode: OutputMode, flags: &FeatureFlags) -> GraphDescription {
    plan_with_layout(mode, flags, &DeviceLayout::default())
}

/// Plan a topology for an explicit device layout.
///
/// A `Stereo40` channel group whose shifted mask does not fit in 32 bits is
/// planned with an empty mask; configuration loading rejects such layouts
/// before they reach the planner.
///
/// # Example
///
/// ```rust
/// use xover_core::{DeviceLayout, FeatureFlags, OutputMode, plan_with_layout};
///
/// let graph = plan_with_layout(OutputMode::Stereo40, &FeatureFlags::default(), &DeviceLayout::default());
/// assert_eq!(graph.paths[0].channel_mask, 0x3);
/// assert_eq!(graph.paths[1].channel_mask, 0x30);
/// assert_eq!(graph.paths[0].device, graph.paths[1].device);
/// ```
pub fn plan_with_layout(
    mode: OutputMode,
    flags: &FeatureFlags,
    layout: &DeviceLayout,
) -> GraphDescription {
    let mut builder = Builder::default();

    let source = if flags.test_source {
        builder.node(
            NodeRole::TestTone,
            None,
            NodeKind::ToneSource,
            [
                ("freq", ParamValue::Number(DEFAULT_TEST_FREQUENCY_HZ)),
                ("volume", ParamValue::Number(0.1)),
                ("wave", ParamValue::from("sine")),
            ],
        )
    } else {
        builder.node(
            NodeRole::Input,
            None,
            NodeKind::CaptureSource,
            [
                ("device", ParamValue::from(layout.input_device.as_str())),
                ("channels", ParamValue::from(2)),
                ("format", ParamValue::from("F32LE")),
            ],
        )
    };

    let mut head = source;
    if flags.loudness_compensation {
        let sensor = builder.node(NodeRole::LoudnessLevel, None, NodeKind::LevelMeter, meter_props());
        builder.link(&head, &sensor);
        head = sensor;
    }

    let split = builder.node(
        NodeRole::Split,
        None,
        NodeKind::ChannelSelect,
        [("downmix", ParamValue::Bool(mode == OutputMode::Mono))],
    );
    builder.link(&head, &split);

    let paths = path_specs(mode, layout);
    for path in &paths {
        build_path(&mut builder, &split, path, flags);
    }

    GraphDescription {
        mode,
        flags: *flags,
        paths,
        nodes: builder.nodes,
        edges: builder.edges,
    }
}

fn path_specs(mode: OutputMode, layout: &DeviceLayout) -> Vec<PathSpec> {
    mode.path_indices()
        .iter()
        .enumerate()
        .map(|(slot, &index)| {
            let (device, channel_mask) = match mode {
                OutputMode::Stereo => (layout.devices[slot].clone(), layout.channel_mask),
                OutputMode::Stereo40 => (
                    layout.devices[0].clone(),
                    layout.group_mask(slot).unwrap_or(0),
                ),
                OutputMode::Left | OutputMode::Right | OutputMode::Mono => {
                    (layout.devices[0].clone(), layout.channel_mask)
                }
            };
            PathSpec {
                index,
                input_channel: (mode != OutputMode::Mono).then_some(index),
                device,
                channel_mask,
            }
        })
        .collect()
}

fn build_path(builder: &mut Builder, split: &str, path: &PathSpec, flags: &FeatureFlags) {
    let p = Some(path.index);

    let tee = builder.node(NodeRole::Tee, p, NodeKind::Tee, []);
    // A downmix has a single output port.
    builder.link_ports(split, path.input_channel.unwrap_or(0), &tee, 0);

    let [band0, band1, band2] = DEFAULT_EQ_BANDS_DB;
    let equalizer = builder.node(
        NodeRole::Equalizer,
        p,
        NodeKind::Equalizer,
        [
            ("band0", ParamValue::Number(band0)),
            ("band1", ParamValue::Number(band1)),
            ("band2", ParamValue::Number(band2)),
        ],
    );
    let low_xover = builder.node(NodeRole::LowXover, p, NodeKind::LowPass, xover_props("low-pass"));
    let low_vol = builder.node(NodeRole::LowVol, p, NodeKind::Volume, volume_props(1.0));
    let high_xover = builder.node(NodeRole::HighXover, p, NodeKind::HighPass, xover_props("high-pass"));
    let high_vol = builder.node(NodeRole::HighVol, p, NodeKind::Volume, volume_props(1.0));
    let interleave = builder.node(
        NodeRole::Interleave,
        p,
        NodeKind::Interleave,
        [
            ("channels", ParamValue::from(2)),
            ("channel_mask", ParamValue::from(path.channel_mask)),
        ],
    );
    let master_vol = builder.node(
        NodeRole::MasterVol,
        p,
        NodeKind::Volume,
        volume_props(DEFAULT_MASTER_VOLUME),
    );

    builder.link_ports(&tee, 0, &equalizer, 0);
    builder.link(&equalizer, &low_xover);
    builder.link(&low_xover, &low_vol);
    builder.link_ports(&low_vol, 0, &interleave, 0);

    builder.link_ports(&tee, 1, &high_xover, 0);
    builder.link(&high_xover, &high_vol);
    builder.link_ports(&high_vol, 0, &interleave, 1);

    builder.link(&interleave, &master_vol);

    let mut tail = master_vol;
    if flags.woofer_protection {
        let sensor = builder.node(NodeRole::ProtectLevel, p, NodeKind::LevelMeter, meter_props());
        builder.link(&tail, &sensor);
        tail = sensor;
    }

    let sink = builder.node(
        NodeRole::Sink,
        p,
        NodeKind::Sink,
        [
            ("device", ParamValue::from(path.device.as_str())),
            ("channel_mask", ParamValue::from(path.channel_mask)),
            ("buffer_time", ParamValue::from(flags.buffer_time_us)),
            ("sync", ParamValue::Bool(true)),
        ],
    );
    builder.link(&tail, &sink);
}

fn xover_props(mode: &str) -> [(&'static str, ParamValue); 3] {
    [
        ("mode", ParamValue::from(mode)),
        ("poles", ParamValue::Number(DEFAULT_CROSSOVER_POLES)),
        ("cutoff", ParamValue::Number(DEFAULT_CROSSOVER_HZ)),
    ]
}

fn volume_props(volume: f64) -> [(&'static str, ParamValue); 1] {
    [("volume", ParamValue::Number(volume))]
}

fn meter_props() -> [(&'static str, ParamValue); 2] {
    [
        ("post_messages", ParamValue::Bool(true)),
        ("interval_ms", ParamValue::from(100)),
    ]
}

#[derive(Default)]
struct Builder {
    nodes: Vec<NodeSpec>,
    edges: Vec<Edge>,
}

impl Builder {
    /// Add a node and return its name.
    fn node<const N: usize>(
        &mut self,
        role: NodeRole,
        path: Option<usize>,
        kind: NodeKind,
        properties: [(&'static str, ParamValue); N],
    ) -> String {
        let name = role.node_name(path.unwrap_or(0));
        self.nodes.push(NodeSpec {
            name: name.clone(),
            role,
            path: path.filter(|_| role.is_per_path()),
            kind,
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        });
        name
    }

    fn link(&mut self, from: &str, to: &str) {
        self.edges.push(Edge::new(from, to));
    }

    fn link_ports(&mut self, from: &str, from_port: usize, to: &str, to_port: usize) {
        self.edges.push(Edge::with_ports(from, from_port, to, to_port));
    }
}
