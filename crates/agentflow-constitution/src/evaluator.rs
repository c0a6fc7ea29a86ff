use agentflow_config::{RuleAction, RuleCondition, RuleDef};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::predicate::{contains_harmful_content, contains_pii, exceeds_length};

/// An enabled rule whose condition matched a node's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
  pub rule_id: String,
  pub rule_name: String,
  pub action: RuleAction,
  pub message: String,
  /// Node that produced the output. Filled in by the caller.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_id: Option<String>,
}

impl Violation {
  fn from_rule(rule: &RuleDef) -> Self {
    let message = if rule.description.is_empty() {
      rule.name.clone()
    } else {
      format!("{}: {}", rule.name, rule.description)
    };
    Self {
      rule_id: rule.id.clone(),
      rule_name: rule.name.clone(),
      action: rule.action,
      message,
      node_id: None,
    }
  }

  /// Attribute the violation to the node whose output triggered it.
  pub fn at_node(mut self, node_id: impl Into<String>) -> Self {
    self.node_id = Some(node_id.into());
    self
  }

  pub fn is_blocking(&self) -> bool {
    self.action == RuleAction::Block
  }
}

/// Whether any violation carries the `block` action.
pub fn has_blocking(violations: &[Violation]) -> bool {
  violations.iter().any(Violation::is_blocking)
}

/// Evaluate every enabled rule against a node output.
///
/// Violations are returned in rule order. Rules with an unrecognized condition
/// never fire.
pub fn evaluate(rules: &[RuleDef], output: &serde_json::Value) -> Vec<Violation> {
  evaluate_text(rules, &normalize(output))
}

/// Evaluate every enabled rule against already normalized text.
pub fn evaluate_text(rules: &[RuleDef], text: &str) -> Vec<Violation> {
  rules
    .iter()
    .filter(|rule| rule.enabled)
    .filter(|rule| matches(rule, text))
    .map(Violation::from_rule)
    .collect()
}

fn matches(rule: &RuleDef, text: &str) -> bool {
  match &rule.condition {
    RuleCondition::Pii => contains_pii(text).is_some(),
    RuleCondition::HarmfulContent => contains_harmful_content(text),
    RuleCondition::OutputTooLong => exceeds_length(text),
    RuleCondition::Unrecognized(tag) => {
      warn!(
        rule_id = %rule.id,
        condition = %tag,
        "rule_evaluation_skipped"
      );
      false
    }
  }
}

/// Flatten an output to lower-cased text.
///
/// Strings are taken verbatim, other scalars in their JSON form. Object entries
/// become `key: value`. Parts are joined with single spaces.
pub fn normalize(output: &serde_json::Value) -> String {
  let mut parts = Vec::new();
  flatten(output, &mut parts);
  parts.join(" ").to_lowercase()
}

fn flatten(value: &serde_json::Value, parts: &mut Vec<String>) {
  match value {
    serde_json::Value::Null => {}
    serde_json::Value::String(s) => parts.push(s.clone()),
    serde_json::Value::Bool(_) | serde_json::Value::Number(_) => parts.push(value.to_string()),
    serde_json::Value::Array(items) => {
      for item in items {
        flatten(item, parts);
      }
    }
    serde_json::Value::Object(map) => {
      for (key, item) in map {
        parts.push(format!("{}:", key));
        flatten(item, parts);
      }
    }
  }
}
