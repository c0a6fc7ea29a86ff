use serde::{Deserialize, Serialize};

use crate::edge::EdgeDef;
use crate::node::NodeDef;
use crate::rule::RuleDef;

/// A complete workflow as saved by the editor: the graph plus its constitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub workflow_id: String,
  pub name: String,
  #[serde(default)]
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub edges: Vec<EdgeDef>,
  #[serde(default)]
  pub rules: Vec<RuleDef>,
}

impl WorkflowDef {
  pub fn enabled_rules(&self) -> impl Iterator<Item = &RuleDef> {
    self.rules.iter().filter(|r| r.enabled)
  }
}
