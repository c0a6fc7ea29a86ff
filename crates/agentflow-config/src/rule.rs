use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::RuleAction;

/// A single constitution rule.
///
/// Rules are independent of any graph. They are evaluated against each node's
/// output while a workflow runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
  pub id: String,
  pub name: String,
  pub condition: RuleCondition,
  pub action: RuleAction,
  #[serde(default = "default_enabled")]
  pub enabled: bool,
  #[serde(default)]
  pub description: String,
}

fn default_enabled() -> bool {
  true
}

impl RuleDef {
  pub fn new(
    id: impl Into<String>,
    name: impl Into<String>,
    condition: RuleCondition,
    action: RuleAction,
  ) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      condition,
      action,
      enabled: true,
      description: String::new(),
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn disabled(mut self) -> Self {
    self.enabled = false;
    self
  }
}

/// Condition tag of a rule.
///
/// Tags outside the known set are kept verbatim as `Unrecognized` so a
/// definition round-trips unchanged. Such rules never fire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleCondition {
  /// Email addresses, phone-like digit runs, SSNs, address mentions.
  Pii,
  /// Violence, hate or discrimination vocabulary.
  HarmfulContent,
  /// Output text longer than the fixed length threshold.
  OutputTooLong,
  Unrecognized(String),
}

impl RuleCondition {
  pub fn parse(tag: &str) -> Self {
    let normalized = tag.trim().to_lowercase().replace('_', "-");
    match normalized.as_str() {
      "pii" | "pii-like" | "contains-pii" | "contains-pii-like-pattern" => RuleCondition::Pii,
      "harmful" | "harmful-content" | "contains-harmful-pattern" => RuleCondition::HarmfulContent,
      "output-too-long" | "too-long" | "length" | "max-length" => RuleCondition::OutputTooLong,
      _ => RuleCondition::Unrecognized(tag.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      RuleCondition::Pii => "pii",
      RuleCondition::HarmfulContent => "harmful-content",
      RuleCondition::OutputTooLong => "output-too-long",
      RuleCondition::Unrecognized(tag) => tag,
    }
  }
}

impl From<String> for RuleCondition {
  fn from(tag: String) -> Self {
    RuleCondition::parse(&tag)
  }
}

impl From<RuleCondition> for String {
  fn from(condition: RuleCondition) -> Self {
    condition.as_str().to_string()
  }
}

impl fmt::Display for RuleCondition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
