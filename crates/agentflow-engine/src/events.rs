//! Execution events and notifiers.
//!
//! Events are emitted while a run progresses so that a UI can highlight the
//! active node or stream the log without polling the session.

use agentflow_constitution::Violation;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::session::{RunStatus, StepStatus};

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  /// The order is fixed and the first node is about to start.
  RunStarted {
    run_id: String,
    session_id: String,
    order: Vec<String>,
  },

  /// A `running` step was appended for the node.
  NodeStarted { run_id: String, node_id: String },

  /// The node produced an output and its step was finalized.
  NodeCompleted {
    run_id: String,
    node_id: String,
    status: StepStatus,
    output: serde_json::Value,
    violations: Vec<Violation>,
  },

  /// The node's handler failed.
  NodeFailed {
    run_id: String,
    node_id: String,
    error: String,
  },

  /// The run reached a terminal state.
  RunFinished { run_id: String, status: RunStatus },
}

/// Receives execution events.
///
/// The simulator calls `notify` synchronously between steps, so implementations
/// should hand the event off rather than do slow work inline.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an unbounded channel.
///
/// Event volume is a handful per node, so the channel is unbounded to keep a
/// slow consumer from stalling the run.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // The receiver may be gone; the run does not depend on it.
    let _ = self.sender.send(event);
  }
}
