//! xover Control - the runtime half of the crossover control plane.
//!
//! # Components
//!
//! - [`ParameterStore`] - owns the applied parameter set and turns each reload
//!   into a rebuild or a set of in-place patches
//! - [`GraphSlot`] - exclusive owner of the running graph instance; every write
//!   and rebuild is serialized through it
//! - [`FeedbackController`] - loudness and woofer-protection loops computing
//!   the low equalizer band gains
//! - [`TelemetryConsumer`] - feeds engine level reports to the controller and
//!   raises amplifier activity
//! - [`ControlPlane`] - starts everything and reports fatal errors
//!
//! # Example
//!
//! ```rust
//! use std::sync::mpsc;
//! use xover_config::FeedbackConfig;
//! use xover_control::{FeedbackController, GraphSlot, ParameterStore, RebuildDecision};
//! use xover_core::{DeviceLayout, ParamValue, ParameterSet};
//! use xover_io::SimBackend;
//!
//! let backend = SimBackend::new();
//! let probe = backend.probe();
//! let (telemetry, _rx) = mpsc::channel();
//! let graph = GraphSlot::new(backend, telemetry).shared();
//! let controller = FeedbackController::new(FeedbackConfig::default()).shared();
//! let mut store = ParameterStore::new(graph, controller, DeviceLayout::default());
//!
//! let params = ParameterSet::new().with("configuration", "mono");
//! store.reload(params.clone()).unwrap();
//!
//! let report = store.reload(params.with("low_frequency", 1500.0)).unwrap();
//! assert_eq!(report.decision, RebuildDecision::Patch);
//! assert_eq!(probe.property("low_xover0", "cutoff"), Some(ParamValue::Number(1500.0)));
//! ```

mod error;
mod feedback;
mod reconcile;
mod runtime;
mod slot;
mod telemetry;

pub use error::{ControlError, TelemetryError};
pub use feedback::{BAND_COUNT, BandGains, FeedbackController, MAX_LOUD, SharedController};
pub use reconcile::{ParameterStore, RebuildDecision, ReloadReport};
pub use runtime::ControlPlane;
pub use slot::{GraphSlot, SharedGraph, WriteOutcome};
pub use telemetry::{LevelEvent, Sensor, TelemetryConsumer};
