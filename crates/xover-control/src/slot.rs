//! Exclusive owner of the running graph instance.
//!
//! [`GraphSlot`] pairs a [`GraphBackend`] with the instance currently built
//! on it. Every property write and every rebuild goes through the slot, and
//! the slot lives behind one mutex ([`SharedGraph`]), so a rebuild in progress
//! blocks patches and gain writes until the new instance exists.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use xover_core::{GraphDescription, ParamValue};
use xover_io::{GraphBackend, PropertyError, TelemetryMessage};

use crate::error::ControlError;

/// A [`GraphSlot`] shared between the reconciler and the feedback loop.
pub type SharedGraph<B> = Arc<Mutex<GraphSlot<B>>>;

/// Result of a single property write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The property was set.
    Applied,
    /// The node does not exist in the current topology.
    Absent,
    /// The node rejected the value.
    Rejected(String),
    /// No graph is running.
    NoGraph,
}

/// Owner of the backend and its current instance.
pub struct GraphSlot<B: GraphBackend> {
    backend: B,
    instance: Option<B::Instance>,
    description: Option<GraphDescription>,
    telemetry: Option<Sender<TelemetryMessage>>,
}

impl<B: GraphBackend> GraphSlot<B> {
    /// Create an empty slot. Telemetry from every instance built in this
    /// slot is forwarded to `telemetry`.
    pub fn new(backend: B, telemetry: Sender<TelemetryMessage>) -> Self {
        Self {
            backend,
            instance: None,
            description: None,
            telemetry: Some(telemetry),
        }
    }

    /// Wrap the slot for sharing.
    pub fn shared(self) -> SharedGraph<B> {
        Arc::new(Mutex::new(self))
    }

    /// Returns true if a graph instance exists.
    pub fn is_live(&self) -> bool {
        self.instance.is_some()
    }

    /// Description of the running graph.
    pub fn description(&self) -> Option<&GraphDescription> {
        self.description.as_ref()
    }

    /// Active path indices of the running graph (empty if none).
    pub fn path_indices(&self) -> Vec<usize> {
        self.description
            .as_ref()
            .map(|d| d.path_indices().collect())
            .unwrap_or_default()
    }

    /// Tear down the current instance (if any) and build `description`.
    ///
    /// The new instance is subscribed to telemetry, activated if it does not
    /// start running on its own, and checked for an immediate fatal error.
    /// On failure the slot is left empty.
    pub fn rebuild(&mut self, description: GraphDescription) -> Result<(), ControlError> {
        self.teardown();

        let instance = self.backend.build(&description)?;
        tracing::debug!(mode = %description.mode, nodes = description.nodes.len(), "graph built");

        if let Err(e) = self.start(&instance) {
            self.backend.teardown(instance);
            return Err(e);
        }

        self.instance = Some(instance);
        self.description = Some(description);
        Ok(())
    }

    fn start(&mut self, instance: &B::Instance) -> Result<(), ControlError> {
        let stream = self.backend.subscribe_telemetry(instance)?;
        if let Some(tx) = self.telemetry.clone() {
            thread::Builder::new()
                .name("telemetry-fwd".into())
                .spawn(move || {
                    for message in stream {
                        if tx.send(message).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| ControlError::spawn("telemetry-fwd", e))?;
        }

        if !self.backend.is_active(instance) {
            self.backend.activate(instance)?;
            tracing::debug!("graph activated");
        }

        if let Some(err) = self.backend.pop_fatal_error(instance) {
            return Err(xover_io::Error::Fatal(err).into());
        }
        Ok(())
    }

    /// Tear down the current instance, if any.
    pub fn teardown(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.backend.teardown(instance);
            tracing::debug!("graph torn down");
        }
        self.description = None;
    }

    /// Tear down and stop forwarding telemetry for good.
    ///
    /// Once every forwarder has exited, the telemetry receiver disconnects.
    pub fn shutdown(&mut self) {
        self.teardown();
        self.telemetry = None;
    }

    /// Take a pending fatal error from the running instance.
    pub fn pop_fatal_error(&mut self) -> Option<xover_io::FatalError> {
        let instance = self.instance.as_ref()?;
        self.backend.pop_fatal_error(instance)
    }

    /// Write one property on the running graph.
    ///
    /// Absent nodes are not an error: a key may simply not apply to the
    /// current topology.
    pub fn write(&mut self, node: &str, property: &str, value: &ParamValue) -> WriteOutcome {
        let Some(instance) = self.instance.as_ref() else {
            return WriteOutcome::NoGraph;
        };
        match self.backend.set_property(instance, node, property, value) {
            Ok(()) => {
                tracing::debug!(node, property, %value, "property set");
                WriteOutcome::Applied
            }
            Err(PropertyError::NodeNotFound(_)) => {
                tracing::debug!(node, property, "node absent, write skipped");
                WriteOutcome::Absent
            }
            Err(e) => {
                tracing::warn!(error = %e, "property write rejected");
                WriteOutcome::Rejected(e.to_string())
            }
        }
    }
}

impl<B: GraphBackend> Drop for GraphSlot<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;
    use xover_core::{FeatureFlags, OutputMode, plan};
    use xover_io::{FatalError, SimBackend};

    fn slot() -> (GraphSlot<SimBackend>, xover_io::SimProbe, mpsc::Receiver<TelemetryMessage>) {
        let backend = SimBackend::new();
        let probe = backend.probe();
        let (tx, rx) = mpsc::channel();
        (GraphSlot::new(backend, tx), probe, rx)
    }

    #[test]
    fn rebuild_activates_new_graph() {
        let (mut slot, probe, _rx) = slot();
        slot.rebuild(plan(OutputMode::Mono, &FeatureFlags::default())).unwrap();
        assert!(slot.is_live());
        assert!(probe.is_running());
        assert_eq!(slot.path_indices(), vec![0]);
    }

    #[test]
    fn rebuild_tears_down_previous_graph() {
        let (mut slot, probe, _rx) = slot();
        slot.rebuild(plan(OutputMode::Mono, &FeatureFlags::default())).unwrap();
        slot.rebuild(plan(OutputMode::Stereo, &FeatureFlags::default())).unwrap();
        assert_eq!(probe.build_count(), 2);
        assert_eq!(probe.teardown_count(), 1);
        assert_eq!(slot.path_indices(), vec![0, 1]);
    }

    #[test]
    fn write_without_graph_is_no_graph() {
        let (mut slot, _probe, _rx) = slot();
        assert_eq!(
            slot.write("master_vol0", "volume", &ParamValue::Number(0.1)),
            WriteOutcome::NoGraph
        );
    }

    #[test]
    fn write_to_absent_node_is_skipped() {
        let (mut slot, _probe, _rx) = slot();
        slot.rebuild(plan(OutputMode::Mono, &FeatureFlags::default())).unwrap();
        assert_eq!(
            slot.write("test_tone", "freq", &ParamValue::Number(1000.0)),
            WriteOutcome::Absent
        );
    }

    #[test]
    fn failed_build_leaves_slot_empty() {
        let (mut slot, probe, _rx) = slot();
        slot.rebuild(plan(OutputMode::Mono, &FeatureFlags::default())).unwrap();
        probe.fail_next_build("device busy");
        let err = slot
            .rebuild(plan(OutputMode::Stereo, &FeatureFlags::default()))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(!slot.is_live());
    }

    #[test]
    fn fatal_error_after_activation_fails_rebuild() {
        let (mut slot, probe, _rx) = slot();
        probe.fatal_on_next_activate(FatalError::new(3, "stream error"));
        let err = slot
            .rebuild(plan(OutputMode::Mono, &FeatureFlags::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            ControlError::Graph(xover_io::Error::Fatal(FatalError { code: 3, .. }))
        ));
        assert!(!slot.is_live());
        assert_eq!(probe.teardown_count(), 1);
    }

    #[test]
    fn telemetry_is_forwarded_across_rebuilds() {
        let (mut slot, probe, rx) = slot();
        slot.rebuild(plan(OutputMode::Mono, &FeatureFlags::default())).unwrap();
        probe.emit_level("protect_level0", -10.0);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            TelemetryMessage::level("protect_level0", vec![-10.0])
        );

        slot.rebuild(plan(OutputMode::Stereo, &FeatureFlags::default())).unwrap();
        probe.emit_level("protect_level1", -12.0);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            TelemetryMessage::level("protect_level1", vec![-12.0])
        );
    }

    #[test]
    fn shutdown_disconnects_telemetry() {
        let (mut slot, _probe, rx) = slot();
        slot.rebuild(plan(OutputMode::Mono, &FeatureFlags::default())).unwrap();
        slot.shutdown();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(10)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
    }
}
