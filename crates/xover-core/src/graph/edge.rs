//! Signal-flow edges between named nodes.

use serde::Serialize;
use std::fmt;

/// A directed connection from one node's output port to another node's input port.
///
/// Most nodes have a single port `0`. Channel splitters expose one output
/// port per input channel, tees one per branch, and interleavers one input
/// port per band (`0` = low, `1` = high).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    /// Source node name.
    pub from: String,
    /// Source output port.
    pub from_port: usize,
    /// Destination node name.
    pub to: String,
    /// Destination input port.
    pub to_port: usize,
}

impl Edge {
    /// Connect port 0 to port 0.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::with_ports(from, 0, to, 0)
    }

    /// Connect explicit ports.
    pub fn with_ports(
        from: impl Into<String>,
        from_port: usize,
        to: impl Into<String>,
        to_port: usize,
    ) -> Self {
        Self {
            from: from.into(),
            from_port,
            to: to.into(),
            to_port,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} → {}.{}",
            self.from, self.from_port, self.to, self.to_port
        )
    }
}
