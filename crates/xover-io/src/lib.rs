//! Processing-graph engine boundary for the xover control plane.
//!
//! The DSP engine that actually filters, mixes, and plays audio is an external
//! collaborator. This crate defines how the control plane talks to it:
//!
//! - [`GraphBackend`] - build, patch, activate, and tear down graph instances,
//!   subscribe to telemetry, and collect fatal engine errors
//! - [`TelemetryMessage`] - raw level/fatal messages from the engine bus
//! - [`SimBackend`] - a deterministic in-process engine used for dry runs and tests
//!
//! ## Quick Start
//!
//! ```rust
//! use xover_core::{FeatureFlags, OutputMode, ParamValue, plan};
//! use xover_io::{GraphBackend, SimBackend};
//!
//! let mut backend = SimBackend::new();
//! let probe = backend.probe();
//!
//! let graph = backend.build(&plan(OutputMode::Mono, &FeatureFlags::default())).unwrap();
//! backend.activate(&graph).unwrap();
//! backend.set_property(&graph, "low_xover0", "cutoff", &ParamValue::Number(1500.0)).unwrap();
//!
//! assert_eq!(probe.property("low_xover0", "cutoff"), Some(ParamValue::Number(1500.0)));
//! ```

mod backend;
mod sim;
mod telemetry;

pub use backend::GraphBackend;
pub use sim::{SimBackend, SimEvent, SimInstance, SimProbe};
pub use telemetry::{FatalError, TelemetryMessage, TelemetryStream};

/// Errors reported by a graph backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine could not instantiate the described graph.
    #[error("graph build failed: {0}")]
    Build(String),

    /// The engine refused to start the graph.
    #[error("graph activation failed: {0}")]
    Activate(String),

    /// The engine reported an unrecoverable error.
    #[error(transparent)]
    Fatal(#[from] FatalError),

    /// The instance handle does not refer to a live graph.
    #[error("graph instance is not live")]
    NoInstance,
}

/// Outcome of a failed property write.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// No node with this name exists in the running graph.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// The node exists but rejected the value.
    #[error("node '{node}' rejected {property}: {reason}")]
    Rejected {
        /// Node name.
        node: String,
        /// Property name.
        property: String,
        /// Engine-provided reason.
        reason: String,
    },
}

/// Convenience result type for backend operations.
pub type Result<T> = std::result::Result<T, Error>;
