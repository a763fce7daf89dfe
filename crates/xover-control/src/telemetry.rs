//! Telemetry consumer: level reports in, gain writes and activity out.

use std::sync::mpsc::{Receiver, Sender};

use xover_core::NodeRole;
use xover_io::{GraphBackend, TelemetryMessage};
use xover_platform::{EnableLine, SharedIdleTimeout};

use crate::error::{ControlError, TelemetryError};
use crate::feedback::SharedController;
use crate::slot::SharedGraph;

/// Which loop a level report belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sensor {
    /// The pre-mix loudness meter.
    Loudness,
    /// The output meter of a path.
    Protection(usize),
    /// Any other meter. Still counts for activity.
    Other(String),
}

impl Sensor {
    /// Classify a source node name.
    pub fn from_source(source: &str) -> Self {
        match NodeRole::parse_name(source) {
            Some((NodeRole::LoudnessLevel, _)) => Sensor::Loudness,
            Some((NodeRole::ProtectLevel, Some(path))) => Sensor::Protection(path),
            _ => Sensor::Other(source.to_string()),
        }
    }
}

/// A validated level report.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelEvent {
    /// Source classification.
    pub sensor: Sensor,
    /// Highest peak over all channels, in dBFS. `-inf` is silence.
    pub peak_db: f64,
}

impl LevelEvent {
    /// Validate raw level fields.
    ///
    /// ```rust
    /// use xover_control::{LevelEvent, Sensor};
    ///
    /// let event = LevelEvent::parse(Some("protect_level1"), Some(&[-12.0, -4.5][..])).unwrap();
    /// assert_eq!(event.sensor, Sensor::Protection(1));
    /// assert_eq!(event.peak_db, -4.5);
    ///
    /// assert!(LevelEvent::parse(Some("protect_level1"), None).is_err());
    /// ```
    pub fn parse(source: Option<&str>, peak_db: Option<&[f64]>) -> Result<Self, TelemetryError> {
        let source = source.ok_or(TelemetryError::MissingSource)?;
        let peaks = peak_db.ok_or_else(|| TelemetryError::MissingPeak(source.to_string()))?;
        if peaks.is_empty() {
            return Err(TelemetryError::EmptyPeak(source.to_string()));
        }
        if let Some(&bad) = peaks.iter().find(|v| v.is_nan() || **v == f64::INFINITY) {
            return Err(TelemetryError::InvalidPeak {
                source_name: source.to_string(),
                value: bad,
            });
        }
        let peak_db = peaks.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self {
            sensor: Sensor::from_source(source),
            peak_db,
        })
    }
}

/// Drives the feedback controller and the idle timer from telemetry.
pub struct TelemetryConsumer<B: GraphBackend, L> {
    graph: SharedGraph<B>,
    controller: SharedController,
    idle: SharedIdleTimeout<L>,
    fatal: Sender<ControlError>,
}

impl<B, L> TelemetryConsumer<B, L>
where
    B: GraphBackend,
    L: EnableLine,
{
    /// Create a consumer. Fatal engine errors are sent on `fatal`.
    pub fn new(
        graph: SharedGraph<B>,
        controller: SharedController,
        idle: SharedIdleTimeout<L>,
        fatal: Sender<ControlError>,
    ) -> Self {
        Self {
            graph,
            controller,
            idle,
            fatal,
        }
    }

    /// Handle one message.
    ///
    /// Malformed level reports are logged and dropped. Returns false once a
    /// fatal error has been forwarded.
    pub fn handle(&self, message: TelemetryMessage) -> bool {
        match message {
            TelemetryMessage::Fatal(err) => {
                tracing::error!(code = err.code, message = %err.message, "fatal graph error");
                // The receiver may already be gone during shutdown.
                let _ = self.fatal.send(xover_io::Error::Fatal(err).into());
                false
            }
            TelemetryMessage::Level { source, peak_db } => {
                match LevelEvent::parse(source.as_deref(), peak_db.as_deref()) {
                    Ok(event) => self.on_level(&event),
                    Err(e) => tracing::warn!(error = %e, "malformed telemetry dropped"),
                }
                true
            }
        }
    }

    /// Apply a validated level report.
    pub fn on_level(&self, event: &LevelEvent) {
        let active = {
            let mut graph = self.graph.lock();
            let mut controller = self.controller.lock();
            let changed = match &event.sensor {
                Sensor::Loudness => controller.on_loudness(event.peak_db),
                Sensor::Protection(path) => controller.on_protection(*path, event.peak_db),
                Sensor::Other(source) => {
                    tracing::trace!(source, peak = event.peak_db, "level from unmonitored meter");
                    false
                }
            };
            if changed {
                controller.apply(&mut *graph);
            }
            controller.is_activity(event.peak_db)
        };

        if active {
            self.idle.lock().signal();
        }
    }

    /// Consume `stream` until it disconnects or a fatal error arrives.
    pub fn run(self, stream: Receiver<TelemetryMessage>) {
        for message in stream {
            if !self.handle(message) {
                break;
            }
        }
        tracing::debug!("telemetry consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::mpsc;
    use xover_config::FeedbackConfig;
    use xover_core::{DeviceLayout, FeatureFlags, OutputMode, ParamValue, ParameterSet, plan};
    use xover_io::{FatalError, SimBackend, SimProbe};
    use xover_platform::{IdleTimeout, RecordingLine};

    use crate::feedback::{FeedbackController, MAX_LOUD};
    use crate::reconcile::ParameterStore;
    use crate::slot::GraphSlot;

    struct Rig {
        consumer: TelemetryConsumer<SimBackend, RecordingLine>,
        probe: SimProbe,
        line: RecordingLine,
        fatal: mpsc::Receiver<ControlError>,
    }

    fn rig() -> Rig {
        let backend = SimBackend::new();
        let probe = backend.probe();
        let (tx, _rx) = mpsc::channel();
        let mut slot = GraphSlot::new(backend, tx);
        let flags = FeatureFlags {
            loudness_compensation: true,
            woofer_protection: true,
            ..FeatureFlags::default()
        };
        let desc = plan(OutputMode::Stereo, &flags);
        slot.rebuild(desc.clone()).unwrap();

        let mut controller = FeedbackController::new(FeedbackConfig::default());
        controller.on_rebuild(&desc);

        let line = RecordingLine::new();
        let idle = Arc::new(Mutex::new(IdleTimeout::new(line.clone(), 30)));
        let (fatal_tx, fatal) = mpsc::channel();
        Rig {
            consumer: TelemetryConsumer::new(slot.shared(), controller.shared(), idle, fatal_tx),
            probe,
            line,
            fatal,
        }
    }

    #[test]
    fn sensors_are_classified_by_name() {
        assert_eq!(Sensor::from_source("loudness_level"), Sensor::Loudness);
        assert_eq!(Sensor::from_source("protect_level1"), Sensor::Protection(1));
        assert_eq!(
            Sensor::from_source("spare_meter"),
            Sensor::Other("spare_meter".into())
        );
    }

    #[test]
    fn silence_is_valid() {
        let event = LevelEvent::parse(Some("loudness_level"), Some(&[f64::NEG_INFINITY][..])).unwrap();
        assert_eq!(event.peak_db, f64::NEG_INFINITY);
    }

    #[test]
    fn malformed_levels_are_rejected() {
        assert_eq!(
            LevelEvent::parse(None, Some(&[-3.0][..])),
            Err(TelemetryError::MissingSource)
        );
        assert_eq!(
            LevelEvent::parse(Some("x"), Some(&[][..])),
            Err(TelemetryError::EmptyPeak("x".into()))
        );
        assert!(matches!(
            LevelEvent::parse(Some("x"), Some(&[f64::INFINITY][..])),
            Err(TelemetryError::InvalidPeak { .. })
        ));
    }

    #[test]
    fn loudness_report_updates_both_paths() {
        let rig = rig();
        rig.consumer
            .handle(TelemetryMessage::level("loudness_level", vec![-35.0]));
        for node in ["equalizer0", "equalizer1"] {
            assert_eq!(rig.probe.property(node, "band1"), Some(ParamValue::Number(3.0)));
        }
    }

    #[test]
    fn protection_report_updates_only_its_path() {
        let rig = rig();
        rig.consumer
            .handle(TelemetryMessage::level("protect_level0", vec![-12.0, -3.0]));
        assert_eq!(rig.probe.property("equalizer0", "band1"), Some(ParamValue::Number(3.0)));
        assert_eq!(rig.probe.property("equalizer1", "band1"), Some(ParamValue::Number(6.0)));
    }

    #[test]
    fn audible_level_signals_activity() {
        let rig = rig();
        rig.consumer
            .handle(TelemetryMessage::level("spare_meter", vec![-40.0]));
        assert!(rig.line.history().is_empty());
        rig.consumer
            .handle(TelemetryMessage::level("spare_meter", vec![-30.0]));
        assert_eq!(rig.line.history(), vec![true]);
    }

    #[test]
    fn malformed_message_changes_nothing() {
        let rig = rig();
        rig.probe.clear_events();
        assert!(rig.consumer.handle(TelemetryMessage::Level {
            source: Some("loudness_level".into()),
            peak_db: None,
        }));
        assert!(rig.probe.writes().is_empty());
        assert!(rig.line.history().is_empty());
    }

    #[test]
    fn stale_loudness_report_after_rebuild_is_ignored() {
        let backend = SimBackend::new();
        let probe = backend.probe();
        let (tx, _rx) = mpsc::channel();
        let graph = GraphSlot::new(backend, tx).shared();
        let controller = FeedbackController::new(FeedbackConfig::default()).shared();
        let mut store = ParameterStore::new(
            Arc::clone(&graph),
            Arc::clone(&controller),
            DeviceLayout::default(),
        );
        let idle = Arc::new(Mutex::new(IdleTimeout::new(RecordingLine::new(), 30)));
        let (fatal_tx, _fatal) = mpsc::channel();
        let consumer =
            TelemetryConsumer::new(Arc::clone(&graph), Arc::clone(&controller), idle, fatal_tx);

        let with_loudness = |on: bool| {
            ParameterSet::new()
                .with("configuration", "mono")
                .with("loudness_compensation", on)
        };
        store.reload(with_loudness(true)).unwrap();
        store.reload(with_loudness(false)).unwrap();

        // Queued before the teardown, delivered after the rebuild.
        consumer.handle(TelemetryMessage::level("loudness_level", vec![-10.0]));
        assert_eq!(controller.lock().loud(), MAX_LOUD);
        assert_eq!(probe.property("equalizer0", "band1"), Some(ParamValue::Number(6.0)));
    }

    #[test]
    fn protection_report_for_unprotected_path_is_ignored() {
        let backend = SimBackend::new();
        let probe = backend.probe();
        let (tx, _rx) = mpsc::channel();
        let mut slot = GraphSlot::new(backend, tx);
        let desc = plan(OutputMode::Stereo, &FeatureFlags::default());
        slot.rebuild(desc.clone()).unwrap();
        let mut controller = FeedbackController::new(FeedbackConfig::default());
        controller.on_rebuild(&desc);
        let idle = Arc::new(Mutex::new(IdleTimeout::new(RecordingLine::new(), 30)));
        let (fatal_tx, _fatal) = mpsc::channel();
        let consumer = TelemetryConsumer::new(slot.shared(), controller.shared(), idle, fatal_tx);

        probe.clear_events();
        consumer.handle(TelemetryMessage::level("protect_level1", vec![0.0]));
        assert!(probe.writes().is_empty());
    }

    #[test]
    fn fatal_message_is_forwarded_and_stops() {
        let rig = rig();
        let err = FatalError::new(5, "xrun");
        assert!(!rig.consumer.handle(TelemetryMessage::Fatal(err.clone())));
        assert!(matches!(
            rig.fatal.try_recv().unwrap(),
            ControlError::Graph(xover_io::Error::Fatal(e)) if e == err
        ));
    }
}
