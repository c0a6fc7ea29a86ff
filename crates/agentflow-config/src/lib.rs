//! Agentflow Config
//!
//! This crate contains the serializable workflow configuration types for agentflow.
//! These types describe a workflow as the editor hands it over: typed nodes,
//! handle-labelled edges and the constitution rules evaluated against node outputs.
//!
//! Configuration can be loaded from:
//! - JSON files (via the CLI)
//! - Key-value snapshots (as JSON blobs)
//!
//! Node configuration is a tagged union per node kind. Each variant carries a fixed
//! field set and is validated with [`NodeKind::validate`] when it enters a graph.

mod edge;
mod enums;
mod error;
mod node;
mod rule;
mod workflow;

pub use edge::EdgeDef;
pub use enums::{HttpMethod, NotifierChannel, RuleAction};
pub use error::ConfigError;
pub use node::{NodeDef, NodeKind, NodeKindTag, Position};
pub use rule::{RuleCondition, RuleDef};
pub use workflow::WorkflowDef;
