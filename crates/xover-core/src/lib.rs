//! Core data model and topology planner for the xover control plane.
//!
//! xover drives a multi-channel, two-way (bass/treble) audio output stage. The
//! signal processing itself lives in an external engine; this crate describes
//! *what* that engine should run:
//!
//! - [`OutputMode`] and [`FeatureFlags`] - the structural settings. Changing
//!   either one requires a full rebuild of the processing graph.
//! - [`ParamValue`] and [`ParameterSet`] - the declarative parameter set read
//!   from the parameter file.
//! - [`GraphDescription`] - named nodes, initial properties, and signal-flow
//!   edges for one topology.
//! - [`plan`] - the pure function from mode and flags to a description.
//!
//! # Example
//!
//! ```rust
//! use xover_core::{FeatureFlags, OutputMode, plan};
//!
//! let graph = plan(OutputMode::Mono, &FeatureFlags::default());
//! assert_eq!(graph.paths.len(), 1);
//! assert!(graph.contains("equalizer0"));
//! assert!(graph.contains("low_xover0"));
//! assert!(!graph.contains("equalizer1"));
//! ```

mod error;
mod mode;
mod param;

/// Graph description types: nodes, edges, and per-path output assignments.
pub mod graph;

/// Topology planner.
pub mod planner;

pub use error::ParamError;
pub use graph::{Edge, GraphDescription, NodeKind, NodeRole, NodeSpec, PathSpec};
pub use mode::{DeviceLayout, FeatureFlags, OutputMode, Structure};
pub use param::{ParamValue, ParameterSet};
pub use planner::{plan, plan_with_layout};
