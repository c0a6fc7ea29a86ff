//! Agentflow Handler
//!
//! Node execution is pluggable: a [`HandlerRegistry`] maps each node kind to a
//! [`NodeHandler`]. The simulator only ever talks to the registry, so real
//! integrations can replace the simulated handlers without touching traversal,
//! rule evaluation or state recording.
//!
//! [`HandlerRegistry::simulated`] registers a [`SimulatedHandler`] for every kind.
//! It produces a deterministic placeholder output per kind after a configurable
//! latency, and can inject failures for demos.

mod error;
mod handler;
mod registry;
mod simulated;

pub use error::HandlerError;
pub use handler::{HandlerContext, NodeHandler};
pub use registry::HandlerRegistry;
pub use simulated::{SimulatedHandler, SimulationConfig};
