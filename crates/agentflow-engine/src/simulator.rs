use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agentflow_config::{NodeDef, NodeKind, RuleDef};
use agentflow_constitution::{Violation, evaluate};
use agentflow_graph::WorkflowGraph;
use agentflow_handler::{HandlerContext, HandlerError, HandlerRegistry};
use agentflow_resolver::{BranchPolicy, DepthFirstResolver, Resolver};
use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::SimulationError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::report::{HaltReason, RunReport};
use crate::session::{ExecutionSession, ExecutionStep, RunStatus, RunSummary, StepStatus};

/// Configuration for the simulator.
#[derive(Debug, Clone, Default)]
pub struct SimulatorConfig {
  /// Upper bound on a single handler call. Expiry is recorded as a failure.
  pub node_timeout: Option<Duration>,
}

/// What a single node did to the run.
enum NodeOutcome {
  Continue(serde_json::Value),
  Halt(RunStatus, HaltReason),
}

/// Drives workflow runs and owns the session log.
///
/// Generic over `N: ExecutionNotifier` so callers can observe progress. Use
/// [`Simulator::new`] to discard events.
pub struct Simulator<N: ExecutionNotifier = NoopNotifier> {
  resolver: Box<dyn Resolver>,
  handlers: HandlerRegistry,
  config: SimulatorConfig,
  session: Arc<RwLock<ExecutionSession>>,
  notifier: N,
}

/// Closes the session's run if the `run` future is dropped before it finishes.
struct RunGuard {
  session: Arc<RwLock<ExecutionSession>>,
  run_id: String,
  armed: bool,
}

impl RunGuard {
  fn new(session: Arc<RwLock<ExecutionSession>>, run_id: String) -> Self {
    Self {
      session,
      run_id,
      armed: true,
    }
  }

  fn disarm(&mut self) {
    self.armed = false;
  }
}

impl Drop for RunGuard {
  fn drop(&mut self) {
    if !self.armed {
      return;
    }
    warn!(run_id = %self.run_id, "run_dropped");
    if let Ok(mut session) = self.session.try_write() {
      session.abandon_run(&self.run_id);
      return;
    }

    // Someone holds the lock; finish the bookkeeping once it is released.
    let session = Arc::clone(&self.session);
    let run_id = std::mem::take(&mut self.run_id);
    match tokio::runtime::Handle::try_current() {
      Ok(handle) => {
        handle.spawn(async move {
          session.write().await.abandon_run(&run_id);
        });
      }
      Err(_) => warn!(run_id = %run_id, "no runtime to release the dropped run"),
    }
  }
}

impl Simulator<NoopNotifier> {
  pub fn new(handlers: HandlerRegistry) -> Self {
    Self::with_notifier(handlers, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> Simulator<N> {
  /// Create a simulator that reports progress to `notifier`.
  ///
  /// The order is resolved depth-first following only the branch each branching
  /// node selects for simulation.
  pub fn with_notifier(handlers: HandlerRegistry, notifier: N) -> Self {
    Self {
      resolver: Box::new(DepthFirstResolver::new(BranchPolicy::Selected)),
      handlers,
      config: SimulatorConfig::default(),
      session: Arc::new(RwLock::new(ExecutionSession::new())),
      notifier,
    }
  }

  pub fn with_config(mut self, config: SimulatorConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
    self.resolver = Box::new(resolver);
    self
  }

  /// Snapshot of the session.
  pub async fn session(&self) -> ExecutionSession {
    self.session.read().await.clone()
  }

  /// Status of a node in the current or most recent run.
  pub async fn node_status(&self, node_id: &str) -> Option<StepStatus> {
    self.session.read().await.node_status(node_id)
  }

  pub async fn is_running(&self) -> bool {
    self.session.read().await.running
  }

  /// Start a fresh session, discarding steps, context and run history.
  pub async fn reset(&self) -> Result<(), SimulationError> {
    let mut session = self.session.write().await;
    if session.running {
      return Err(SimulationError::AlreadyRunning {
        session_id: session.session_id.clone(),
      });
    }
    *session = ExecutionSession::new();
    info!(session_id = %session.session_id, "session_reset");
    Ok(())
  }

  /// Run the workflow once.
  ///
  /// The order is fixed before the first node starts. Each node is executed to
  /// completion before the next one begins. Cancellation is checked between
  /// nodes; the node in flight is allowed to finish. Dropping the returned
  /// future closes the run as `Cancelled` and frees the session.
  #[instrument(name = "workflow_run", skip_all, fields(run_id = tracing::field::Empty))]
  pub async fn run(
    &self,
    graph: &WorkflowGraph,
    rules: &[RuleDef],
    payload: serde_json::Value,
    cancel: CancellationToken,
  ) -> Result<RunReport, SimulationError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    tracing::Span::current().record("run_id", run_id.as_str());

    let (session_id, order) = {
      let mut session = self.session.write().await;
      if session.running {
        return Err(SimulationError::AlreadyRunning {
          session_id: session.session_id.clone(),
        });
      }
      let order = self.resolver.resolve(graph)?;
      session.running = true;
      session.runs.push(RunSummary {
        run_id: run_id.clone(),
        status: RunStatus::Running,
        order: order.clone(),
        started_at: Utc::now(),
        finished_at: None,
      });
      (session.session_id.clone(), order)
    };
    let mut guard = RunGuard::new(Arc::clone(&self.session), run_id.clone());

    // Later edits to the graph must not leak into this run.
    let nodes: Vec<NodeDef> = order
      .iter()
      .filter_map(|id| graph.node(id).cloned())
      .collect();

    info!(
      session_id = %session_id,
      order = ?order,
      rules = rules.len(),
      "run_started"
    );
    self.notifier.notify(ExecutionEvent::RunStarted {
      run_id: run_id.clone(),
      session_id: session_id.clone(),
      order: order.clone(),
    });

    let (status, halt) = self
      .execute_nodes(&run_id, &nodes, rules, payload, &cancel)
      .await;

    let steps = {
      let mut session = self.session.write().await;
      guard.disarm();
      session.running = false;
      if let Some(run) = session.run_mut(&run_id) {
        run.status = status;
        run.finished_at = Some(Utc::now());
      }
      session.steps_for(&run_id).cloned().collect::<Vec<_>>()
    };

    match &halt {
      None => info!(steps = steps.len(), "run_completed"),
      Some(reason) => warn!(status = ?status, reason = ?reason, steps = steps.len(), "run_halted"),
    }
    self.notifier.notify(ExecutionEvent::RunFinished {
      run_id: run_id.clone(),
      status,
    });

    Ok(RunReport {
      run_id,
      session_id,
      status,
      order,
      steps,
      halt,
    })
  }

  async fn execute_nodes(
    &self,
    run_id: &str,
    nodes: &[NodeDef],
    rules: &[RuleDef],
    payload: serde_json::Value,
    cancel: &CancellationToken,
  ) -> (RunStatus, Option<HaltReason>) {
    let mut input = payload;
    for node in nodes {
      if cancel.is_cancelled() {
        warn!(next_node_id = %node.id, "run_cancelled");
        return (
          RunStatus::Cancelled,
          Some(HaltReason::Cancelled {
            next_node_id: node.id.clone(),
          }),
        );
      }

      match self.execute_node(run_id, node, input, rules).await {
        NodeOutcome::Continue(output) => input = output,
        NodeOutcome::Halt(status, reason) => return (status, Some(reason)),
      }
    }
    (RunStatus::Completed, None)
  }

  #[instrument(
    name = "node_execute",
    skip(self, node, input, rules),
    fields(node_id = %node.id, kind = %node.kind.tag())
  )]
  async fn execute_node(
    &self,
    run_id: &str,
    node: &NodeDef,
    input: serde_json::Value,
    rules: &[RuleDef],
  ) -> NodeOutcome {
    let step_id = uuid::Uuid::new_v4().to_string();
    let context = {
      let mut session = self.session.write().await;
      let timestamp = session.next_timestamp();
      session.steps.push(ExecutionStep {
        step_id: step_id.clone(),
        run_id: run_id.to_string(),
        node_id: node.id.clone(),
        timestamp,
        status: StepStatus::Running,
        input: input.clone(),
        output: None,
        duration_ms: 0,
        violations: Vec::new(),
        error: None,
      });
      session.context.clone()
    };
    self.notifier.notify(ExecutionEvent::NodeStarted {
      run_id: run_id.to_string(),
      node_id: node.id.clone(),
    });

    let started = Instant::now();
    let result = self.invoke(run_id, node, &input, &context).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let output = match result {
      Ok(output) => output,
      Err(e) => {
        let message = e.to_string();
        warn!(error = %e, "node_failed");
        {
          let mut session = self.session.write().await;
          if let Some(step) = session.step_mut(&step_id) {
            step.status = StepStatus::Failure;
            step.duration_ms = duration_ms;
            step.error = Some(message.clone());
          }
        }
        self.notifier.notify(ExecutionEvent::NodeFailed {
          run_id: run_id.to_string(),
          node_id: node.id.clone(),
          error: message.clone(),
        });
        return NodeOutcome::Halt(
          RunStatus::Failed,
          HaltReason::NodeFailure {
            node_id: node.id.clone(),
            message,
          },
        );
      }
    };

    let violations: Vec<Violation> = evaluate(&applicable_rules(node, rules), &output)
      .into_iter()
      .map(|v| v.at_node(&node.id))
      .collect();
    let blocking = violations.iter().find(|v| v.is_blocking()).cloned();
    let status = if violations.is_empty() {
      StepStatus::Success
    } else {
      StepStatus::Violation
    };

    {
      let mut session = self.session.write().await;
      if let Some(step) = session.step_mut(&step_id) {
        step.status = status;
        step.output = Some(output.clone());
        step.duration_ms = duration_ms;
        step.violations = violations.clone();
      }
      if blocking.is_none() {
        session.context.insert(node.id.clone(), output.clone());
      }
    }
    self.notifier.notify(ExecutionEvent::NodeCompleted {
      run_id: run_id.to_string(),
      node_id: node.id.clone(),
      status,
      output: output.clone(),
      violations: violations.clone(),
    });

    if let Some(violation) = blocking {
      warn!(rule_id = %violation.rule_id, "blocking_violation");
      return NodeOutcome::Halt(
        RunStatus::Aborted,
        HaltReason::BlockingViolation {
          node_id: node.id.clone(),
          rule_id: violation.rule_id,
          message: violation.message,
        },
      );
    }

    if !violations.is_empty() {
      warn!(
        rules = ?violations.iter().map(|v| v.rule_id.as_str()).collect::<Vec<_>>(),
        "rule_violations_recorded"
      );
    }
    info!(duration_ms, status = ?status, "node_completed");
    NodeOutcome::Continue(output)
  }

  async fn invoke(
    &self,
    run_id: &str,
    node: &NodeDef,
    input: &serde_json::Value,
    context: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<serde_json::Value, HandlerError> {
    let handler = self.handlers.get(node.kind.tag())?;
    let ctx = HandlerContext { run_id, context };
    let call = handler.run(node, input, ctx);

    match self.config.node_timeout {
      Some(limit) => tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| {
          Err(HandlerError::Timeout {
            node_id: node.id.clone(),
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
          })
        }),
      None => call.await,
    }
  }
}

/// Rules checked against a node's output.
///
/// A `rule_check` node with an explicit rule list narrows the constitution to
/// those rules; every other node is checked against all of them.
fn applicable_rules<'a>(node: &NodeDef, rules: &'a [RuleDef]) -> Cow<'a, [RuleDef]> {
  match &node.kind {
    NodeKind::RuleCheck { rule_ids } if !rule_ids.is_empty() => Cow::Owned(
      rules
        .iter()
        .filter(|r| rule_ids.contains(&r.id))
        .cloned()
        .collect(),
    ),
    _ => Cow::Borrowed(rules),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_config::{RuleAction, RuleCondition};

  #[test]
  fn test_rule_check_narrows_rules() {
    let rules = vec![
      RuleDef::new("a", "A", RuleCondition::Pii, RuleAction::Block),
      RuleDef::new("b", "B", RuleCondition::HarmfulContent, RuleAction::Warn),
    ];
    let scoped = NodeDef::new(
      "check",
      NodeKind::RuleCheck {
        rule_ids: vec!["b".to_string()],
      },
    );
    let open = NodeDef::new("check", NodeKind::RuleCheck { rule_ids: vec![] });

    let narrowed = applicable_rules(&scoped, &rules);
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].id, "b");
    assert_eq!(applicable_rules(&open, &rules).len(), 2);
    assert_eq!(applicable_rules(&NodeDef::new("e", NodeKind::End), &rules).len(), 2);
  }
}
