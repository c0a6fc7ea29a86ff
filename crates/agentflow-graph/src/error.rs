use agentflow_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("edge references unknown node: {node_id}")]
  InvalidEndpoint { node_id: String },

  #[error(
    "handle '{}' is not a valid branch of node '{node_id}'",
    .handle.as_deref().unwrap_or("<none>")
  )]
  InvalidHandle {
    node_id: String,
    handle: Option<String>,
  },

  #[error(
    "node '{node_id}' already has a successor on handle '{}'",
    .handle.as_deref().unwrap_or("<none>")
  )]
  DuplicateSuccessor {
    node_id: String,
    handle: Option<String>,
  },

  #[error("duplicate node id: {node_id}")]
  DuplicateNodeId { node_id: String },

  #[error("duplicate edge id: {edge_id}")]
  DuplicateEdgeId { edge_id: String },

  #[error("invalid configuration for node '{node_id}'")]
  InvalidConfig {
    node_id: String,
    #[source]
    source: ConfigError,
  },
}
