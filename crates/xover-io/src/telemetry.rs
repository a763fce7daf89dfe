//! Raw telemetry published on the engine's message bus.

use std::fmt;
use std::sync::mpsc;

/// An unrecoverable engine error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fatal graph error {code}: {message}")]
pub struct FatalError {
    /// Engine error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

impl FatalError {
    /// Create a fatal error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A message from the engine's telemetry bus.
///
/// Level fields mirror what a level meter element posts and are optional: the
/// bus gives no guarantee that a message is well formed, so validation
/// happens on the consuming side.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    /// Peak level report from a level meter.
    Level {
        /// Name of the node that produced the report.
        source: Option<String>,
        /// Per-channel peak levels in dBFS.
        peak_db: Option<Vec<f64>>,
    },
    /// The engine hit an unrecoverable error.
    Fatal(FatalError),
}

impl TelemetryMessage {
    /// Well-formed level report.
    pub fn level(source: impl Into<String>, peak_db: impl Into<Vec<f64>>) -> Self {
        TelemetryMessage::Level {
            source: Some(source.into()),
            peak_db: Some(peak_db.into()),
        }
    }
}

impl fmt::Display for TelemetryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryMessage::Level { source, peak_db } => write!(
                f,
                "level source={} peak={:?}",
                source.as_deref().unwrap_or("<none>"),
                peak_db
            ),
            TelemetryMessage::Fatal(err) => write!(f, "{err}"),
        }
    }
}

/// Receiving end of a telemetry subscription.
///
/// The stream ends (the receiver disconnects) when the instance it was
/// subscribed to is torn down.
pub type TelemetryStream = mpsc::Receiver<TelemetryMessage>;
