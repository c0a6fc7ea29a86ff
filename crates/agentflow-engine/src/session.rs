use agentflow_constitution::Violation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one recorded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Pending,
  Running,
  Success,
  Failure,
  /// The output matched at least one enabled rule.
  Violation,
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Idle,
  Running,
  Completed,
  /// A node's handler failed.
  Failed,
  /// A blocking rule fired.
  Aborted,
  /// Stopped through the cancellation token.
  Cancelled,
}

impl RunStatus {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, RunStatus::Idle | RunStatus::Running)
  }
}

/// One entry of the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
  pub step_id: String,
  pub run_id: String,
  pub node_id: String,
  pub timestamp: DateTime<Utc>,
  pub status: StepStatus,
  pub input: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
  pub duration_ms: u64,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub violations: Vec<Violation>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Bookkeeping for one run within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
  pub run_id: String,
  pub status: RunStatus,
  pub order: Vec<String>,
  pub started_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub finished_at: Option<DateTime<Utc>>,
}

/// The long-lived record of every run since the last reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSession {
  pub session_id: String,
  /// Steps of every run, in append order.
  pub steps: Vec<ExecutionStep>,
  /// Outputs of completed steps keyed by node id.
  pub context: serde_json::Map<String, serde_json::Value>,
  pub running: bool,
  pub runs: Vec<RunSummary>,
}

impl Default for ExecutionSession {
  fn default() -> Self {
    Self::new()
  }
}

impl ExecutionSession {
  pub fn new() -> Self {
    Self {
      session_id: uuid::Uuid::new_v4().to_string(),
      steps: Vec::new(),
      context: serde_json::Map::new(),
      running: false,
      runs: Vec::new(),
    }
  }

  pub fn steps_for<'a>(&'a self, run_id: &'a str) -> impl Iterator<Item = &'a ExecutionStep> + 'a {
    self.steps.iter().filter(move |s| s.run_id == run_id)
  }

  pub fn last_run(&self) -> Option<&RunSummary> {
    self.runs.last()
  }

  /// Status of a node in the most recent run, if the run reached it.
  pub fn node_status(&self, node_id: &str) -> Option<StepStatus> {
    let run = self.last_run()?;
    self
      .steps
      .iter()
      .rev()
      .find(|s| s.run_id == run.run_id && s.node_id == node_id)
      .map(|s| s.status)
  }

  pub(crate) fn run_mut(&mut self, run_id: &str) -> Option<&mut RunSummary> {
    self.runs.iter_mut().rev().find(|r| r.run_id == run_id)
  }

  pub(crate) fn step_mut(&mut self, step_id: &str) -> Option<&mut ExecutionStep> {
    self.steps.iter_mut().rev().find(|s| s.step_id == step_id)
  }

  /// Close a run that stopped before reaching a terminal status.
  ///
  /// The run is marked `Cancelled` and any step still `Running` becomes a
  /// `Failure`. The session accepts a new run afterwards.
  pub(crate) fn abandon_run(&mut self, run_id: &str) {
    self.running = false;
    if let Some(run) = self.run_mut(run_id).filter(|r| !r.status.is_terminal()) {
      run.status = RunStatus::Cancelled;
      run.finished_at = Some(Utc::now());
    }
    for step in self
      .steps
      .iter_mut()
      .filter(|s| s.run_id == run_id && s.status == StepStatus::Running)
    {
      step.status = StepStatus::Failure;
      step.error = Some("run dropped before the node finished".to_string());
    }
  }

  /// A timestamp strictly later than every step recorded so far.
  pub(crate) fn next_timestamp(&self) -> DateTime<Utc> {
    let now = Utc::now();
    match self.steps.last() {
      Some(last) if now <= last.timestamp => last.timestamp + chrono::Duration::microseconds(1),
      _ => now,
    }
  }
}
