//! Parameter store and reconciler.
//!
//! [`ParameterStore`] owns the last applied [`ParameterSet`] and decides, on
//! every reload, whether the graph must be rebuilt or can be patched in place.
//! Keys are dispatched through the declarative table in
//! [`xover_config::keys`].

use std::fmt;

use xover_config::keys::{self, Fanout, ParamTarget};
use xover_core::{DeviceLayout, ParamValue, ParameterSet, Structure, plan_with_layout};
use xover_io::GraphBackend;

use crate::error::ControlError;
use crate::feedback::{FeedbackController, SharedController};
use crate::slot::{GraphSlot, SharedGraph, WriteOutcome};

/// What a reload did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildDecision {
    /// The graph was torn down and rebuilt, then every key replayed.
    Rebuild,
    /// Changed keys were written to the running graph.
    Patch,
}

impl fmt::Display for RebuildDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RebuildDecision::Rebuild => "rebuild",
            RebuildDecision::Patch => "patch",
        })
    }
}

/// Summary of one reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    /// Rebuild or patch.
    pub decision: RebuildDecision,
    /// Property writes that landed, including equalizer gains.
    pub writes: usize,
    /// Writes skipped because the node is absent from the topology.
    pub skipped: usize,
    /// Keys not in the key table.
    pub unknown: Vec<String>,
    /// Keys whose value was refused, by type check or by the engine.
    pub rejected: Vec<String>,
}

impl ReloadReport {
    fn new(decision: RebuildDecision) -> Self {
        Self {
            decision,
            writes: 0,
            skipped: 0,
            unknown: Vec::new(),
            rejected: Vec::new(),
        }
    }

    fn record(&mut self, key: &str, outcome: &WriteOutcome) {
        match outcome {
            WriteOutcome::Applied => self.writes += 1,
            WriteOutcome::Absent | WriteOutcome::NoGraph => self.skipped += 1,
            WriteOutcome::Rejected(_) => {
                if !self.rejected.iter().any(|k| k == key) {
                    self.rejected.push(key.to_string());
                }
            }
        }
    }
}

/// Owner of the applied parameter set.
pub struct ParameterStore<B: GraphBackend> {
    graph: SharedGraph<B>,
    controller: SharedController,
    layout: DeviceLayout,
    current: ParameterSet,
    structure: Option<Structure>,
}

impl<B: GraphBackend> ParameterStore<B> {
    /// Create an empty store. The first reload always builds.
    pub fn new(graph: SharedGraph<B>, controller: SharedController, layout: DeviceLayout) -> Self {
        Self {
            graph,
            controller,
            layout,
            current: ParameterSet::new(),
            structure: None,
        }
    }

    /// The last successfully applied parameter set.
    pub fn current(&self) -> &ParameterSet {
        &self.current
    }

    /// The structure of the running graph, if one was built.
    pub fn structure(&self) -> Option<Structure> {
        self.structure
    }

    /// Apply a new parameter set.
    ///
    /// A changed structure (or no running graph) rebuilds and replays every
    /// non-structural key in key order. Otherwise only changed keys are
    /// written. Unknown keys, ill-typed values, and keys addressing absent
    /// nodes are logged and skipped. On success `params` replaces the stored
    /// set in full.
    ///
    /// # Errors
    ///
    /// [`ControlError::InvalidConfig`] if the structural keys are invalid;
    /// nothing is applied. [`ControlError::Graph`] if a rebuild fails; the
    /// slot is left empty and the error is fatal.
    pub fn reload(&mut self, params: ParameterSet) -> Result<ReloadReport, ControlError> {
        let structure = Structure::from_params(&params)?;

        let mut graph = self.graph.lock();
        let rebuild = !graph.is_live() || self.structure != Some(structure);

        let mut report = ReloadReport::new(if rebuild {
            RebuildDecision::Rebuild
        } else {
            RebuildDecision::Patch
        });
        let keys: Vec<(&str, &ParamValue)> = if rebuild {
            let description = plan_with_layout(structure.mode, &structure.flags, &self.layout);
            self.structure = None;
            graph.rebuild(description.clone())?;
            self.controller.lock().on_rebuild(&description);
            self.structure = Some(structure);
            tracing::info!(mode = %structure.mode, "graph rebuilt");
            params.iter().collect()
        } else {
            params.changed_from(&self.current).collect()
        };

        let mut controller = self.controller.lock();
        let mut gains_dirty = rebuild;
        for (key, value) in keys {
            gains_dirty |= dispatch(&mut *graph, &mut *controller, key, value, &mut report);
        }
        if gains_dirty {
            report.writes += controller.apply(&mut *graph);
        }
        drop(controller);
        drop(graph);

        tracing::info!(
            decision = %report.decision,
            writes = report.writes,
            skipped = report.skipped,
            unknown = report.unknown.len(),
            rejected = report.rejected.len(),
            "parameters reloaded"
        );
        self.current = params;
        Ok(report)
    }
}

/// Route one key. Returns true if equalizer gains need recomputing.
fn dispatch<B: GraphBackend>(
    graph: &mut GraphSlot<B>,
    controller: &mut FeedbackController,
    key: &str,
    value: &ParamValue,
    report: &mut ReloadReport,
) -> bool {
    let Some(spec) = keys::lookup(key) else {
        tracing::warn!(key, "unknown parameter key ignored");
        report.unknown.push(key.to_string());
        return false;
    };
    if !spec.expects.accepts(value) {
        tracing::warn!(key, %value, expected = spec.expects.describe(), "parameter value ignored");
        report.rejected.push(key.to_string());
        return false;
    }

    match spec.target {
        // Structural keys are applied by rebuilding, never patched.
        ParamTarget::Structural => false,
        ParamTarget::Node {
            role,
            property,
            fanout,
        } => {
            let nodes: Vec<String> = match fanout {
                Fanout::PerPath => graph
                    .path_indices()
                    .into_iter()
                    .map(|p| role.node_name(p))
                    .collect(),
                Fanout::Single => vec![role.node_name(0)],
            };
            for node in nodes {
                let outcome = graph.write(&node, property, value);
                report.record(key, &outcome);
            }
            false
        }
        ParamTarget::EqBand(band) => value
            .as_f64()
            .is_some_and(|db| controller.set_band_max(band, db)),
        ParamTarget::Controller(param) => value
            .as_f64()
            .is_some_and(|db| controller.set_param(param, db)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use xover_config::FeedbackConfig;
    use xover_core::OutputMode;
    use xover_io::{SimBackend, SimEvent, SimProbe};

    fn store() -> (ParameterStore<SimBackend>, SimProbe) {
        let backend = SimBackend::new();
        let probe = backend.probe();
        let (tx, _rx) = mpsc::channel();
        let graph = GraphSlot::new(backend, tx).shared();
        let controller = FeedbackController::new(FeedbackConfig::default()).shared();
        (
            ParameterStore::new(graph, controller, DeviceLayout::default()),
            probe,
        )
    }

    fn mono() -> ParameterSet {
        ParameterSet::new().with("configuration", "mono")
    }

    #[test]
    fn first_reload_builds() {
        let (mut store, probe) = store();
        let report = store.reload(mono()).unwrap();
        assert_eq!(report.decision, RebuildDecision::Rebuild);
        assert_eq!(probe.build_count(), 1);
        assert_eq!(store.structure().map(|s| s.mode), Some(OutputMode::Mono));
    }

    #[test]
    fn same_set_writes_nothing() {
        let (mut store, probe) = store();
        let params = mono().with("low_frequency", 1800.0).with("volume", 0.05);
        store.reload(params.clone()).unwrap();
        probe.clear_events();

        let report = store.reload(params).unwrap();
        assert_eq!(report.decision, RebuildDecision::Patch);
        assert_eq!(report.writes, 0);
        assert!(probe.events().is_empty());
    }

    #[test]
    fn rebuild_replays_non_structural_keys_in_order() {
        let (mut store, probe) = store();
        let params = mono()
            .with("volume", 0.05)
            .with("high_frequency", 2500.0)
            .with("low_frequency", 1800.0);
        store.reload(params).unwrap();
        let nodes: Vec<_> = probe.writes().into_iter().map(|(n, p, _)| format!("{n}.{p}")).collect();
        assert_eq!(
            nodes,
            vec!["high_xover0.cutoff", "low_xover0.cutoff", "master_vol0.volume"]
        );
    }

    #[test]
    fn patch_fans_out_to_every_path() {
        let (mut store, probe) = store();
        let stereo = ParameterSet::new().with("configuration", "stereo");
        store.reload(stereo.clone()).unwrap();
        probe.clear_events();

        let report = store.reload(stereo.with("low_volume", 0.8)).unwrap();
        assert_eq!(report.writes, 2);
        assert_eq!(probe.property("low_vol0", "volume"), Some(ParamValue::Number(0.8)));
        assert_eq!(probe.property("low_vol1", "volume"), Some(ParamValue::Number(0.8)));
    }

    #[test]
    fn flag_change_rebuilds() {
        let (mut store, probe) = store();
        store.reload(mono()).unwrap();
        let report = store.reload(mono().with("woofer_protection", true)).unwrap();
        assert_eq!(report.decision, RebuildDecision::Rebuild);
        assert_eq!(probe.teardown_count(), 1);
        assert!(probe.description().unwrap().contains("protect_level0"));
    }

    #[test]
    fn buffer_time_is_rebuild_only() {
        let (mut store, probe) = store();
        store.reload(mono()).unwrap();
        probe.clear_events();
        store.reload(mono().with("buffer_time", 200.0)).unwrap();
        assert_eq!(probe.build_count(), 1);
        assert_eq!(probe.property("sink0", "buffer_time"), Some(ParamValue::Number(200.0)));
        assert!(probe.writes().is_empty());
    }

    #[test]
    fn absent_node_is_skipped() {
        let (mut store, probe) = store();
        store.reload(mono()).unwrap();
        let report = store.reload(mono().with("test_frequency", 1000.0)).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.writes, 0);
        assert!(probe.property("test_tone", "freq").is_none());
    }

    #[test]
    fn unknown_and_ill_typed_keys_are_reported() {
        let (mut store, _probe) = store();
        let report = store
            .reload(mono().with("reverb_mix", 0.3).with("low_order", 2.5))
            .unwrap();
        assert_eq!(report.unknown, vec!["reverb_mix".to_string()]);
        assert_eq!(report.rejected, vec!["low_order".to_string()]);
    }

    #[test]
    fn removed_key_is_not_reverted() {
        let (mut store, probe) = store();
        store.reload(mono().with("low_frequency", 1500.0)).unwrap();
        probe.clear_events();
        let report = store.reload(mono()).unwrap();
        assert_eq!(report.writes, 0);
        assert_eq!(probe.property("low_xover0", "cutoff"), Some(ParamValue::Number(1500.0)));
        assert!(!store.current().contains_key("low_frequency"));
    }

    #[test]
    fn eq_band_key_writes_gain_on_every_path() {
        let (mut store, probe) = store();
        let stereo = ParameterSet::new().with("configuration", "stereo");
        store.reload(stereo.clone()).unwrap();
        store.reload(stereo.with("low_eq_59Hz", 4.0)).unwrap();
        assert_eq!(probe.property("equalizer0", "band1"), Some(ParamValue::Number(4.0)));
        assert_eq!(probe.property("equalizer1", "band1"), Some(ParamValue::Number(4.0)));
    }

    #[test]
    fn invalid_structure_applies_nothing() {
        let (mut store, probe) = store();
        store.reload(mono()).unwrap();
        probe.clear_events();
        let err = store
            .reload(ParameterSet::new().with("configuration", "surround").with("volume", 0.5))
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(probe.events().is_empty());
        assert_eq!(store.current(), &mono());
    }

    #[test]
    fn failed_rebuild_is_fatal_and_next_reload_rebuilds() {
        let (mut store, probe) = store();
        store.reload(mono()).unwrap();
        probe.fail_next_build("device busy");
        let err = store
            .reload(ParameterSet::new().with("configuration", "stereo"))
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(store.structure(), None);

        let report = store.reload(mono()).unwrap();
        assert_eq!(report.decision, RebuildDecision::Rebuild);
        assert!(probe
            .events()
            .iter()
            .any(|e| matches!(e, SimEvent::Built { mode: OutputMode::Mono, .. })));
    }
}
