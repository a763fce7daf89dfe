//! Process wiring: initial build plus the three long-running tasks.
//!
//! ```text
//!  param-watch ──reload──► ParameterStore ──┐
//!                                           ▼
//!                      GraphSlot (mutex) ◄──┴── telemetry ◄── engine bus
//!                           ▲                      │
//!                           └──── gains ◄── FeedbackController
//!                                                  │ activity
//!  amp-idle ──tick──► IdleTimeout ◄────────────────┘
//! ```
//!
//! Lock order is graph slot, then controller. The idle timer lock is never
//! held together with either.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use xover_config::{ParameterWatcher, RigConfig, load_parameters, spawn_watcher};
use xover_core::ParameterSet;
use xover_io::GraphBackend;
use xover_platform::{EnableLine, IdleTimeout, SharedIdleTimeout, spawn_ticker};

use crate::error::ControlError;
use crate::feedback::{FeedbackController, SharedController};
use crate::reconcile::{ParameterStore, ReloadReport};
use crate::slot::{GraphSlot, SharedGraph};
use crate::telemetry::TelemetryConsumer;

/// A running control plane.
pub struct ControlPlane<B: GraphBackend, L> {
    store: Arc<Mutex<ParameterStore<B>>>,
    graph: SharedGraph<B>,
    controller: SharedController,
    idle: SharedIdleTimeout<L>,
    running: Arc<AtomicBool>,
    fatal: Receiver<ControlError>,
    threads: Vec<JoinHandle<()>>,
}

impl<B, L> ControlPlane<B, L>
where
    B: GraphBackend + 'static,
    L: EnableLine + Send + 'static,
{
    /// Build the initial graph and start the worker threads.
    ///
    /// Every failure here is fatal, including a missing or invalid parameter
    /// file: there is no previous graph to fall back on.
    pub fn start(backend: B, rig: &RigConfig, line: L) -> Result<Self, ControlError> {
        let (telemetry_tx, telemetry_rx) = mpsc::channel();
        let graph = GraphSlot::new(backend, telemetry_tx).shared();
        let controller = FeedbackController::new(rig.feedback.clone()).shared();
        let mut store = ParameterStore::new(
            Arc::clone(&graph),
            Arc::clone(&controller),
            rig.layout.clone(),
        );

        let mut watcher = ParameterWatcher::new(&rig.parameter_file);
        let params = match watcher.poll()? {
            Some(params) => params,
            None => load_parameters(watcher.path())?,
        };
        tracing::info!(path = %watcher.path().display(), keys = params.len(), "parameters loaded");
        store.reload(params)?;
        let store = Arc::new(Mutex::new(store));

        let window = IdleTimeout::<L>::window_ticks(rig.amplifier.idle(), rig.amplifier.tick());
        let mut idle = IdleTimeout::new(line, window);
        idle.park();
        let idle = Arc::new(Mutex::new(idle));

        let running = Arc::new(AtomicBool::new(true));
        let (fatal_tx, fatal) = mpsc::channel();
        let mut threads = Vec::with_capacity(3);

        let consumer = TelemetryConsumer::new(
            Arc::clone(&graph),
            Arc::clone(&controller),
            Arc::clone(&idle),
            fatal_tx.clone(),
        );
        threads.push(
            thread::Builder::new()
                .name("telemetry".into())
                .spawn(move || consumer.run(telemetry_rx))
                .map_err(|e| ControlError::spawn("telemetry", e))?,
        );

        threads.push(
            spawn_ticker(Arc::clone(&idle), rig.amplifier.tick(), Arc::clone(&running))
                .map_err(|e| ControlError::spawn("amp-idle", e))?,
        );

        let watch_store = Arc::clone(&store);
        threads.push(
            spawn_watcher(
                watcher,
                rig.poll_interval(),
                Arc::clone(&running),
                move |params| match watch_store.lock().reload(params) {
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => {
                        tracing::error!(error = %e, "reload failed");
                        let _ = fatal_tx.send(e);
                    }
                    Err(e) => tracing::warn!(error = %e, "reload skipped"),
                },
            )
            .map_err(|e| ControlError::spawn("param-watch", e))?,
        );

        tracing::info!(idle_window = window, "control plane started");
        Ok(Self {
            store,
            graph,
            controller,
            idle,
            running,
            fatal,
            threads,
        })
    }

    /// Apply a parameter set now, as if the watcher had loaded it.
    pub fn reload(&self, params: ParameterSet) -> Result<ReloadReport, ControlError> {
        self.store.lock().reload(params)
    }

    /// Shared graph slot.
    pub fn graph(&self) -> &SharedGraph<B> {
        &self.graph
    }

    /// Shared feedback controller.
    pub fn controller(&self) -> &SharedController {
        &self.controller
    }

    /// Shared idle timer.
    pub fn idle(&self) -> &SharedIdleTimeout<L> {
        &self.idle
    }

    /// Block until a fatal error occurs.
    ///
    /// Returns `None` if every worker exited without one.
    pub fn wait(&self) -> Option<ControlError> {
        self.fatal.recv().ok()
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ControlError> {
        self.fatal.recv_timeout(timeout).ok()
    }

    /// Stop the workers and tear the graph down.
    pub fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        self.graph.lock().shutdown();
        for handle in self.threads {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                tracing::warn!(thread = %name, "worker panicked");
            }
        }
        tracing::info!("control plane stopped");
    }
}
