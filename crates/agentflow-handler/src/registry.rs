use std::collections::HashMap;
use std::sync::Arc;

use agentflow_config::NodeKindTag;

use crate::error::HandlerError;
use crate::handler::NodeHandler;
use crate::simulated::{SimulatedHandler, SimulationConfig};

/// Handlers keyed by node kind.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
  handlers: HashMap<NodeKindTag, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
  /// An empty registry. Every node fails with `NotRegistered` until handlers are added.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with one shared [`SimulatedHandler`] for every node kind.
  pub fn simulated(config: SimulationConfig) -> Self {
    let handler: Arc<dyn NodeHandler> = Arc::new(SimulatedHandler::new(config));
    let mut registry = Self::new();
    for kind in NodeKindTag::ALL {
      registry.register(kind, handler.clone());
    }
    registry
  }

  /// Register (or replace) the handler for a node kind.
  pub fn register(&mut self, kind: NodeKindTag, handler: Arc<dyn NodeHandler>) -> &mut Self {
    self.handlers.insert(kind, handler);
    self
  }

  pub fn get(&self, kind: NodeKindTag) -> Result<Arc<dyn NodeHandler>, HandlerError> {
    self
      .handlers
      .get(&kind)
      .cloned()
      .ok_or(HandlerError::NotRegistered { kind })
  }

  pub fn contains(&self, kind: NodeKindTag) -> bool {
    self.handlers.contains_key(&kind)
  }
}

impl std::fmt::Debug for HandlerRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
    kinds.sort_unstable();
    f.debug_struct("HandlerRegistry").field("kinds", &kinds).finish()
  }
}
