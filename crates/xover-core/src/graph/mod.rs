//! Abstract processing-graph description.
//!
//! A [`GraphDescription`] is what the topology planner hands to the external
//! engine: an ordered list of [`NodeSpec`]s (name, kind, initial properties),
//! an [`Edge`] list describing signal flow, and one [`PathSpec`] per output
//! path. Node names are a deterministic function of role and path index
//! (see [`NodeRole::node_name`]), so later property patches can address
//! nodes without re-deriving the topology.

mod description;
mod edge;
mod node;

pub use description::{GraphDescription, PathSpec};
pub use edge::Edge;
pub use node::{NodeKind, NodeRole, NodeSpec};
