use serde::{Deserialize, Serialize};

use crate::session::{ExecutionStep, RunStatus};

/// Why a run stopped before exhausting its order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HaltReason {
  NodeFailure {
    node_id: String,
    message: String,
  },
  BlockingViolation {
    node_id: String,
    rule_id: String,
    message: String,
  },
  Cancelled {
    /// First node that was not started.
    next_node_id: String,
  },
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
  pub run_id: String,
  pub session_id: String,
  pub status: RunStatus,
  /// Order fixed at run start.
  pub order: Vec<String>,
  /// Steps recorded by this run, in append order.
  pub steps: Vec<ExecutionStep>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub halt: Option<HaltReason>,
}

impl RunReport {
  pub fn is_completed(&self) -> bool {
    self.status == RunStatus::Completed
  }

  pub fn executed_nodes(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.node_id.as_str()).collect()
  }
}
