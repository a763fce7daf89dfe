//! The processing-graph backend trait.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │   Reconciler / feedback loops    │
//! └──────────────┬───────────────────┘
//!                │ uses GraphBackend trait
//!                ▼
//! ┌──────────────────────────────────┐
//! │        GraphBackend trait        │
//! │ build / set_property / activate  │
//! │ teardown / telemetry / errors    │
//! └──────────────┬───────────────────┘
//!                │ implemented by
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌─────────────┐
//! │ SimBackend  │  │ engine      │
//! │ (dry run,   │  │ bindings    │
//! │  tests)     │  │             │
//! └─────────────┘  └─────────────┘
//! ```
//!
//! Instances are opaque handles owned by the caller. Property writes are
//! idempotent sets, so callers never need to roll anything back.

use xover_core::{GraphDescription, ParamValue};

use crate::telemetry::{FatalError, TelemetryStream};
use crate::{PropertyError, Result};

/// An engine capable of running a [`GraphDescription`].
pub trait GraphBackend: Send {
    /// Handle to one instantiated graph.
    type Instance: Send;

    /// Instantiate a graph. The new instance may start inactive.
    fn build(&mut self, description: &GraphDescription) -> Result<Self::Instance>;

    /// Returns true if the instance is running.
    fn is_active(&self, instance: &Self::Instance) -> bool;

    /// Start the instance.
    fn activate(&mut self, instance: &Self::Instance) -> Result<()>;

    /// Write one property of a named node.
    ///
    /// Returns [`PropertyError::NodeNotFound`] if the node does not exist in
    /// this instance.
    fn set_property(
        &mut self,
        instance: &Self::Instance,
        node: &str,
        property: &str,
        value: &ParamValue,
    ) -> std::result::Result<(), PropertyError>;

    /// Stop and destroy the instance. Telemetry streams subscribed to it end.
    fn teardown(&mut self, instance: Self::Instance);

    /// Subscribe to the instance's telemetry bus.
    fn subscribe_telemetry(&mut self, instance: &Self::Instance) -> Result<TelemetryStream>;

    /// Take the oldest pending fatal error, if any.
    fn pop_fatal_error(&mut self, instance: &Self::Instance) -> Option<FatalError>;
}
