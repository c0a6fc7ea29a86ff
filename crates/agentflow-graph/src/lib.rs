//! Agentflow Graph
//!
//! This crate provides the editable workflow graph: typed nodes and
//! handle-labelled edges, mutated only through explicit operations.
//!
//! Every mutation keeps the graph structurally valid:
//! - edges always reference existing nodes
//! - edges leaving a branching node carry one of its branch labels
//! - each node has at most one successor per handle
//! - removing a node removes every edge touching it
//!
//! [`WorkflowGraph::graph`] builds an adjacency view for traversal.

mod error;
mod graph;
mod model;

pub use error::GraphError;
pub use graph::{Graph, Successor};
pub use model::{NodePatch, WorkflowGraph};
