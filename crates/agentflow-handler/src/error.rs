use agentflow_config::NodeKindTag;

/// Errors a node handler can report.
///
/// Every variant halts the run that executed the node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
  /// The node's own processing failed.
  #[error("node '{node_id}' failed: {message}")]
  Failed { node_id: String, message: String },

  /// No handler is registered for the node's kind.
  #[error("no handler registered for node kind '{kind}'")]
  NotRegistered { kind: NodeKindTag },

  /// The handler did not finish within the configured node timeout.
  #[error("node '{node_id}' timed out after {after_ms}ms")]
  Timeout { node_id: String, after_ms: u64 },
}

impl HandlerError {
  pub fn failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Failed {
      node_id: node_id.into(),
      message: message.into(),
    }
  }
}
