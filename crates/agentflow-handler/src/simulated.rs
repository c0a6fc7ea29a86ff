use std::sync::Mutex;
use std::time::Duration;

use agentflow_config::{NodeDef, NodeKind};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::HandlerError;
use crate::handler::{HandlerContext, NodeHandler};

/// Tuning for the simulated handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
  /// Lower bound of the per-node latency, in milliseconds.
  #[serde(default = "default_min_latency")]
  pub min_latency_ms: u64,
  #[serde(default = "default_max_latency")]
  pub max_latency_ms: u64,
  /// Probability in `[0, 1]` that a node fails. Zero disables failure injection.
  #[serde(default)]
  pub failure_rate: f64,
  /// Seed for latency and failure draws. `None` seeds from the OS.
  #[serde(default)]
  pub seed: Option<u64>,
}

fn default_min_latency() -> u64 {
  500
}

fn default_max_latency() -> u64 {
  1500
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      min_latency_ms: default_min_latency(),
      max_latency_ms: default_max_latency(),
      failure_rate: 0.0,
      seed: None,
    }
  }
}

impl SimulationConfig {
  /// No latency and no failures. Used by tests and batch runs.
  pub fn instant() -> Self {
    Self {
      min_latency_ms: 0,
      max_latency_ms: 0,
      failure_rate: 0.0,
      seed: Some(0),
    }
  }

  /// Fixed latency for every node.
  pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
    self.min_latency_ms = latency_ms;
    self.max_latency_ms = latency_ms;
    self
  }

  pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
    self.failure_rate = failure_rate.clamp(0.0, 1.0);
    self
  }

  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }
}

/// Stand-in handler for every node kind.
///
/// Outputs depend only on the node configuration and its input, never on the
/// random draws, so two runs over the same graph record the same outputs.
pub struct SimulatedHandler {
  config: SimulationConfig,
  rng: Mutex<StdRng>,
}

impl SimulatedHandler {
  pub fn new(config: SimulationConfig) -> Self {
    let rng = match config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_os_rng(),
    };
    Self {
      config,
      rng: Mutex::new(rng),
    }
  }

  pub fn config(&self) -> &SimulationConfig {
    &self.config
  }

  /// Draw the latency and failure decision for one node execution.
  fn draw(&self) -> (u64, bool) {
    let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let (min, max) = (self.config.min_latency_ms, self.config.max_latency_ms);
    let latency = if max > min {
      rng.random_range(min..=max)
    } else {
      min
    };
    let fail = self.config.failure_rate > 0.0 && rng.random::<f64>() < self.config.failure_rate;
    (latency, fail)
  }
}

#[async_trait]
impl NodeHandler for SimulatedHandler {
  async fn run(
    &self,
    node: &NodeDef,
    input: &serde_json::Value,
    ctx: HandlerContext<'_>,
  ) -> Result<serde_json::Value, HandlerError> {
    let (latency_ms, fail) = self.draw();
    debug!(
      run_id = %ctx.run_id,
      node_id = %node.id,
      kind = %node.kind.tag(),
      latency_ms,
      "simulating node"
    );

    if latency_ms > 0 {
      tokio::time::sleep(Duration::from_millis(latency_ms)).await;
    }

    if fail {
      return Err(HandlerError::failed(
        &node.id,
        format!("simulated {} failure", node.kind.tag()),
      ));
    }

    Ok(simulated_output(node, input, ctx.context))
  }
}

/// Placeholder output for a node. Pure function of its arguments.
pub(crate) fn simulated_output(
  node: &NodeDef,
  input: &serde_json::Value,
  context: &serde_json::Map<String, serde_json::Value>,
) -> serde_json::Value {
  match &node.kind {
    NodeKind::Start => json!({
      "trigger": "manual",
      "payload": input,
    }),
    NodeKind::End => {
      let mut keys: Vec<&str> = context.keys().map(String::as_str).collect();
      keys.sort_unstable();
      json!({
        "completed": true,
        "context_keys": keys,
      })
    }
    NodeKind::Condition { expression, .. } => json!({
      "expression": expression,
      "branch": node.kind.selected_branch(),
    }),
    NodeKind::Switch { cases, .. } => json!({
      "cases": cases,
      "branch": node.kind.selected_branch(),
    }),
    NodeKind::AiCall {
      model,
      prompt,
      temperature,
    } => {
      let subject = if node.label.is_empty() { &node.id } else { &node.label };
      json!({
        "model": model,
        "temperature": decimal_temperature(*temperature),
        "response": format!("Simulated {} reply for {}: {}", model, subject, prompt),
      })
    }
    NodeKind::ApiCall { url, method } => json!({
      "method": method.as_str(),
      "url": url,
      "status": 200,
      "body": { "ok": true },
    }),
    NodeKind::RuleCheck { rule_ids } => json!({
      "subject": node.label,
      "rules": rule_ids,
      "inspected": input,
    }),
    NodeKind::Notifier { channel, target } => json!({
      "channel": channel.as_str(),
      "target": target,
      "delivered": true,
    }),
  }
}

/// Widen an `f32` temperature by its shortest decimal form, so 0.7 stays 0.7
/// instead of becoming 0.699999988079071.
fn decimal_temperature(temperature: f32) -> f64 {
  temperature
    .to_string()
    .parse()
    .unwrap_or_else(|_| f64::from(temperature))
}
