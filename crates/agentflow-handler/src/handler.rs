use agentflow_config::NodeDef;
use async_trait::async_trait;

use crate::error::HandlerError;

/// Read-only view of the run a node executes in.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
  pub run_id: &'a str,
  /// Shared context accumulated from the steps completed so far.
  pub context: &'a serde_json::Map<String, serde_json::Value>,
}

/// Executes one kind of node.
///
/// A handler produces exactly one output per call. It may take as long as it
/// needs; the simulator awaits it before starting the next node.
#[async_trait]
pub trait NodeHandler: Send + Sync {
  async fn run(
    &self,
    node: &NodeDef,
    input: &serde_json::Value,
    ctx: HandlerContext<'_>,
  ) -> Result<serde_json::Value, HandlerError>;
}
