//! Deterministic in-process engine.
//!
//! [`SimBackend`] keeps a property table per graph instance and records every
//! call in an event log. It performs no audio processing. A [`SimProbe`]
//! (cloned from the backend, usable from any thread) inspects state and
//! injects telemetry or failures, which makes it the engine for dry runs and
//! for tests of everything above the [`GraphBackend`] boundary.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::mpsc;

use xover_core::{GraphDescription, OutputMode, ParamValue};

use crate::backend::GraphBackend;
use crate::telemetry::{FatalError, TelemetryMessage, TelemetryStream};
use crate::{Error, PropertyError, Result};

/// Handle to a simulated graph instance.
#[derive(Debug, PartialEq, Eq)]
pub struct SimInstance {
    id: u64,
}

impl SimInstance {
    /// Numeric instance id (increments with every build).
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A graph was built.
    Built {
        /// Instance id.
        id: u64,
        /// Mode of the built graph.
        mode: OutputMode,
        /// Number of nodes.
        nodes: usize,
    },
    /// A graph was activated.
    Activated {
        /// Instance id.
        id: u64,
    },
    /// A property write landed on an existing node.
    PropertySet {
        /// Instance id.
        id: u64,
        /// Node name.
        node: String,
        /// Property name.
        property: String,
        /// Written value.
        value: ParamValue,
    },
    /// A graph was torn down.
    TornDown {
        /// Instance id.
        id: u64,
    },
}

#[derive(Default)]
struct SimGraph {
    description: Option<GraphDescription>,
    properties: BTreeMap<String, BTreeMap<String, ParamValue>>,
    active: bool,
    subscribers: Vec<mpsc::Sender<TelemetryMessage>>,
    fatal: VecDeque<FatalError>,
}

#[derive(Default)]
struct SimState {
    next_id: u64,
    graphs: HashMap<u64, SimGraph>,
    current: Option<u64>,
    events: Vec<SimEvent>,
    fail_next_build: Option<String>,
    reject_next_activate: Option<String>,
    fatal_on_next_activate: Option<FatalError>,
}

impl SimState {
    fn current_graph(&mut self) -> Option<&mut SimGraph> {
        let id = self.current?;
        self.graphs.get_mut(&id)
    }
}

/// In-process stand-in for the processing engine.
#[derive(Default)]
pub struct SimBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimBackend {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for inspecting and driving this engine from other threads.
    pub fn probe(&self) -> SimProbe {
        SimProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl GraphBackend for SimBackend {
    type Instance = SimInstance;

    fn build(&mut self, description: &GraphDescription) -> Result<SimInstance> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_build.take() {
            return Err(Error::Build(reason));
        }

        state.next_id += 1;
        let id = state.next_id;
        let properties = description
            .nodes
            .iter()
            .map(|node| (node.name.clone(), node.properties.clone()))
            .collect();
        state.graphs.insert(
            id,
            SimGraph {
                description: Some(description.clone()),
                properties,
                ..SimGraph::default()
            },
        );
        state.current = Some(id);
        state.events.push(SimEvent::Built {
            id,
            mode: description.mode,
            nodes: description.nodes.len(),
        });
        tracing::debug!(id, mode = %description.mode, nodes = description.nodes.len(), "sim: built graph");
        Ok(SimInstance { id })
    }

    fn is_active(&self, instance: &SimInstance) -> bool {
        self.state
            .lock()
            .graphs
            .get(&instance.id)
            .is_some_and(|g| g.active)
    }

    fn activate(&mut self, instance: &SimInstance) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(reason) = state.reject_next_activate.take() {
            return Err(Error::Activate(reason));
        }
        let fatal = state.fatal_on_next_activate.take();
        let graph = state.graphs.get_mut(&instance.id).ok_or(Error::NoInstance)?;
        graph.active = true;
        if let Some(err) = fatal {
            graph.fatal.push_back(err);
        }
        state.events.push(SimEvent::Activated { id: instance.id });
        tracing::debug!(id = instance.id, "sim: activated graph");
        Ok(())
    }

    fn set_property(
        &mut self,
        instance: &SimInstance,
        node: &str,
        property: &str,
        value: &ParamValue,
    ) -> std::result::Result<(), PropertyError> {
        let mut state = self.state.lock();
        let props = state
            .graphs
            .get_mut(&instance.id)
            .and_then(|g| g.properties.get_mut(node))
            .ok_or_else(|| PropertyError::NodeNotFound(node.to_string()))?;
        if let Some(existing) = props.get(property)
            && std::mem::discriminant(existing) != std::mem::discriminant(value)
        {
            return Err(PropertyError::Rejected {
                node: node.to_string(),
                property: property.to_string(),
                reason: format!("expected a value like {existing}, got {value}"),
            });
        }
        props.insert(property.to_string(), value.clone());
        state.events.push(SimEvent::PropertySet {
            id: instance.id,
            node: node.to_string(),
            property: property.to_string(),
            value: value.clone(),
        });
        tracing::debug!(node, property, %value, "sim: property set");
        Ok(())
    }

    fn teardown(&mut self, instance: SimInstance) {
        let mut state = self.state.lock();
        // Dropping the graph drops its telemetry senders.
        state.graphs.remove(&instance.id);
        if state.current == Some(instance.id) {
            state.current = None;
        }
        state.events.push(SimEvent::TornDown { id: instance.id });
        tracing::debug!(id = instance.id, "sim: tore down graph");
    }

    fn subscribe_telemetry(&mut self, instance: &SimInstance) -> Result<TelemetryStream> {
        let mut state = self.state.lock();
        let graph = state.graphs.get_mut(&instance.id).ok_or(Error::NoInstance)?;
        let (tx, rx) = mpsc::channel();
        graph.subscribers.push(tx);
        Ok(rx)
    }

    fn pop_fatal_error(&mut self, instance: &SimInstance) -> Option<FatalError> {
        self.state
            .lock()
            .graphs
            .get_mut(&instance.id)
            .and_then(|g| g.fatal.pop_front())
    }
}

/// Thread-safe inspection and injection handle for a [`SimBackend`].
#[derive(Clone)]
pub struct SimProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimProbe {
    /// Publish a message on the current graph's telemetry bus.
    ///
    /// Returns `false` if no graph is live.
    pub fn emit(&self, message: TelemetryMessage) -> bool {
        let mut state = self.state.lock();
        let Some(graph) = state.current_graph() else {
            return false;
        };
        graph
            .subscribers
            .retain(|tx| tx.send(message.clone()).is_ok());
        true
    }

    /// Publish a well-formed level report.
    pub fn emit_level(&self, source: &str, peak_db: f64) -> bool {
        self.emit(TelemetryMessage::level(source, vec![peak_db]))
    }

    /// Raise a fatal error on the current graph: queued for
    /// [`GraphBackend::pop_fatal_error`] and published on the bus.
    pub fn raise_fatal(&self, err: FatalError) -> bool {
        {
            let mut state = self.state.lock();
            let Some(graph) = state.current_graph() else {
                return false;
            };
            graph.fatal.push_back(err.clone());
        }
        self.emit(TelemetryMessage::Fatal(err))
    }

    /// Make the next build fail.
    pub fn fail_next_build(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_build = Some(reason.into());
    }

    /// Make the next activation return an error.
    pub fn reject_next_activate(&self, reason: impl Into<String>) {
        self.state.lock().reject_next_activate = Some(reason.into());
    }

    /// Make the next activation succeed but leave a pending fatal error.
    pub fn fatal_on_next_activate(&self, err: FatalError) {
        self.state.lock().fatal_on_next_activate = Some(err);
    }

    /// Current value of a property on the live graph.
    pub fn property(&self, node: &str, property: &str) -> Option<ParamValue> {
        let mut state = self.state.lock();
        state
            .current_graph()?
            .properties
            .get(node)?
            .get(property)
            .cloned()
    }

    /// Description of the live graph.
    pub fn description(&self) -> Option<GraphDescription> {
        let mut state = self.state.lock();
        state.current_graph()?.description.clone()
    }

    /// Returns true if a graph is live and running.
    pub fn is_running(&self) -> bool {
        let mut state = self.state.lock();
        state.current_graph().is_some_and(|g| g.active)
    }

    /// Snapshot of the event log.
    pub fn events(&self) -> Vec<SimEvent> {
        self.state.lock().events.clone()
    }

    /// Clear the event log.
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Number of builds recorded in the event log.
    pub fn build_count(&self) -> usize {
        self.count(|e| matches!(e, SimEvent::Built { .. }))
    }

    /// Number of teardowns recorded in the event log.
    pub fn teardown_count(&self) -> usize {
        self.count(|e| matches!(e, SimEvent::TornDown { .. }))
    }

    /// Property writes recorded in the event log, as `(node, property, value)`.
    pub fn writes(&self) -> Vec<(String, String, ParamValue)> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                SimEvent::PropertySet {
                    node,
                    property,
                    value,
                    ..
                } => Some((node.clone(), property.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.state.lock().events.iter().filter(|e| pred(e)).count()
    }
}
