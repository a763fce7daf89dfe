//! Error types for the control plane.

use thiserror::Error;

use xover_config::ConfigError;
use xover_core::ParamError;

/// Errors raised by reconciliation and runtime wiring.
///
/// Configuration problems are recoverable once a graph is running: the
/// offending reload is logged and skipped. Graph failures are not: the
/// engine's state is assumed unrecoverable and the process must stop.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The parameter set's structural keys are invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ParamError),

    /// A configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine failed to build or activate a graph, or reported a fatal error.
    #[error(transparent)]
    Graph(#[from] xover_io::Error),

    /// A worker thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        /// Thread name.
        name: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ControlError {
    /// Returns true if this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ControlError::Graph(_) | ControlError::Spawn { .. })
    }

    pub(crate) fn spawn(name: &'static str, source: std::io::Error) -> Self {
        ControlError::Spawn { name, source }
    }
}

/// A telemetry message that cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    /// The message names no source node.
    #[error("level message without a source")]
    MissingSource,

    /// The message carries no peak field.
    #[error("level message from '{0}' without peak values")]
    MissingPeak(String),

    /// The peak field is empty.
    #[error("level message from '{0}' with an empty peak list")]
    EmptyPeak(String),

    /// A peak value is NaN or positive infinity.
    #[error("level message from '{source_name}' with invalid peak {value}")]
    InvalidPeak {
        /// Source node.
        source_name: String,
        /// Offending value.
        value: f64,
    },
}
