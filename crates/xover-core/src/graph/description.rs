//! The complete graph description handed to the engine.

use serde::Serialize;
use std::fmt;

use super::edge::Edge;
use super::node::NodeSpec;
use crate::mode::{FeatureFlags, OutputMode};

/// Output assignment of one path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PathSpec {
    /// Path index (also the suffix of every per-path node name).
    pub index: usize,
    /// Input channel carried by this path (`None` for a mono downmix).
    pub input_channel: Option<usize>,
    /// Output device.
    pub device: String,
    /// Channel mask on the output device.
    pub channel_mask: u32,
}

/// Nodes, edges, and path assignments for one topology.
///
/// Produced solely from an [`OutputMode`] and [`FeatureFlags`] by
/// [`plan`](crate::plan); two descriptions planned from the same inputs
/// compare equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphDescription {
    /// Output mode this graph was planned for.
    pub mode: OutputMode,
    /// Feature flags this graph was planned for.
    pub flags: FeatureFlags,
    /// One entry per active output path, in index order.
    pub paths: Vec<PathSpec>,
    /// Nodes in signal-flow order.
    pub nodes: Vec<NodeSpec>,
    /// Signal-flow edges.
    pub edges: Vec<Edge>,
}

impl GraphDescription {
    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Returns true if a node with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    /// Active path indices, in order.
    pub fn path_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.paths.iter().map(|p| p.index)
    }

    /// Node names, in signal-flow order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// Edges leaving the named node.
    pub fn outgoing<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.from == name)
    }
}

impl fmt::Display for GraphDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mode: {}", self.mode)?;
        writeln!(
            f,
            "flags: test_source={} woofer_protection={} loudness_compensation={} buffer_time={}us",
            self.flags.test_source,
            self.flags.woofer_protection,
            self.flags.loudness_compensation,
            self.flags.buffer_time_us
        )?;
        for path in &self.paths {
            writeln!(
                f,
                "path {}: device={} channel_mask={:#x}",
                path.index, path.device, path.channel_mask
            )?;
        }
        writeln!(f, "nodes:")?;
        for node in &self.nodes {
            let props: Vec<String> = node
                .properties
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            writeln!(f, "  {:<16} {:?} {}", node.name, node.kind, props.join(" "))?;
        }
        writeln!(f, "edges:")?;
        for edge in &self.edges {
            writeln!(f, "  {edge}")?;
        }
        Ok(())
    }
}
