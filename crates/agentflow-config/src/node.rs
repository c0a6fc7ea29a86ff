use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::{HttpMethod, NotifierChannel};
use crate::error::ConfigError;

/// Canvas coordinates. Carried for the editor, ignored by execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

impl Position {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub id: String,
  #[serde(default)]
  pub label: String,
  #[serde(default)]
  pub position: Position,
  #[serde(flatten)]
  pub kind: NodeKind,
}

impl NodeDef {
  pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
    Self {
      id: id.into(),
      label: String::new(),
      position: Position::default(),
      kind,
    }
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  pub fn with_position(mut self, position: Position) -> Self {
    self.position = position;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
  /// Entry point of a run. A runnable graph has exactly one.
  Start,
  End,
  /// Two-way branch on `"true"` / `"false"`.
  Condition {
    expression: String,
    /// Branch taken when the run is simulated.
    #[serde(default = "default_outcome")]
    simulated_outcome: bool,
  },
  /// Multi-way branch, one handle per case.
  Switch {
    cases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    simulated_case: Option<String>,
  },
  AiCall {
    model: String,
    #[serde(default)]
    prompt: String,
    #[serde(default = "default_temperature")]
    temperature: f32,
  },
  ApiCall {
    url: String,
    #[serde(default)]
    method: HttpMethod,
  },
  /// Checks the incoming data against a subset of the constitution.
  /// An empty list means every enabled rule.
  RuleCheck {
    #[serde(default)]
    rule_ids: Vec<String>,
  },
  Notifier {
    channel: NotifierChannel,
    target: String,
  },
}

fn default_outcome() -> bool {
  true
}

fn default_temperature() -> f32 {
  0.7
}

const CONDITION_BRANCHES: [&str; 2] = ["true", "false"];

/// Fieldless mirror of [`NodeKind`], used as a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindTag {
  Start,
  End,
  Condition,
  Switch,
  AiCall,
  ApiCall,
  RuleCheck,
  Notifier,
}

impl NodeKindTag {
  pub const ALL: [NodeKindTag; 8] = [
    NodeKindTag::Start,
    NodeKindTag::End,
    NodeKindTag::Condition,
    NodeKindTag::Switch,
    NodeKindTag::AiCall,
    NodeKindTag::ApiCall,
    NodeKindTag::RuleCheck,
    NodeKindTag::Notifier,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      NodeKindTag::Start => "start",
      NodeKindTag::End => "end",
      NodeKindTag::Condition => "condition",
      NodeKindTag::Switch => "switch",
      NodeKindTag::AiCall => "ai_call",
      NodeKindTag::ApiCall => "api_call",
      NodeKindTag::RuleCheck => "rule_check",
      NodeKindTag::Notifier => "notifier",
    }
  }
}

impl fmt::Display for NodeKindTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl NodeKind {
  pub fn tag(&self) -> NodeKindTag {
    match self {
      NodeKind::Start => NodeKindTag::Start,
      NodeKind::End => NodeKindTag::End,
      NodeKind::Condition { .. } => NodeKindTag::Condition,
      NodeKind::Switch { .. } => NodeKindTag::Switch,
      NodeKind::AiCall { .. } => NodeKindTag::AiCall,
      NodeKind::ApiCall { .. } => NodeKindTag::ApiCall,
      NodeKind::RuleCheck { .. } => NodeKindTag::RuleCheck,
      NodeKind::Notifier { .. } => NodeKindTag::Notifier,
    }
  }

  pub fn is_branching(&self) -> bool {
    matches!(self, NodeKind::Condition { .. } | NodeKind::Switch { .. })
  }

  /// Branch labels a branching node may leave through, in declaration order.
  ///
  /// Returns `None` for non-branching kinds, which take a single unlabelled successor.
  pub fn branch_labels(&self) -> Option<Vec<String>> {
    match self {
      NodeKind::Condition { .. } => Some(CONDITION_BRANCHES.iter().map(|s| s.to_string()).collect()),
      NodeKind::Switch { cases, .. } => Some(cases.clone()),
      _ => None,
    }
  }

  /// Whether `handle` is a valid source handle for an edge leaving this kind.
  pub fn accepts_handle(&self, handle: Option<&str>) -> bool {
    match (self, handle) {
      (NodeKind::Condition { .. }, Some(h)) => CONDITION_BRANCHES.contains(&h),
      (NodeKind::Switch { cases, .. }, Some(h)) => cases.iter().any(|c| c == h),
      (NodeKind::Condition { .. } | NodeKind::Switch { .. }, None) => false,
      (_, None) => true,
      (_, Some(_)) => false,
    }
  }

  /// The branch a branching node takes during simulation.
  pub fn selected_branch(&self) -> Option<&str> {
    match self {
      NodeKind::Condition {
        simulated_outcome, ..
      } => Some(if *simulated_outcome { "true" } else { "false" }),
      NodeKind::Switch {
        cases,
        simulated_case,
      } => simulated_case.as_deref().or(cases.first().map(|c| c.as_str())),
      _ => None,
    }
  }

  /// Validate the kind-specific configuration.
  pub fn validate(&self) -> Result<(), ConfigError> {
    match self {
      NodeKind::Start | NodeKind::End | NodeKind::RuleCheck { .. } => Ok(()),
      NodeKind::Condition { expression, .. } => {
        if expression.trim().is_empty() {
          return Err(ConfigError::EmptyField {
            field: "expression",
          });
        }
        Ok(())
      }
      NodeKind::Switch {
        cases,
        simulated_case,
      } => {
        if cases.is_empty() {
          return Err(ConfigError::NoCases);
        }
        let mut seen = HashSet::new();
        for case in cases {
          if case.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "cases" });
          }
          if !seen.insert(case.as_str()) {
            return Err(ConfigError::DuplicateCase(case.clone()));
          }
        }
        if let Some(selected) = simulated_case {
          if !seen.contains(selected.as_str()) {
            return Err(ConfigError::UnknownCase(selected.clone()));
          }
        }
        Ok(())
      }
      NodeKind::AiCall {
        model, temperature, ..
      } => {
        if model.trim().is_empty() {
          return Err(ConfigError::EmptyField { field: "model" });
        }
        if !(0.0..=2.0).contains(temperature) {
          return Err(ConfigError::TemperatureOutOfRange(*temperature));
        }
        Ok(())
      }
      NodeKind::ApiCall { url, .. } => validate_url(url),
      NodeKind::Notifier { target, .. } => {
        if target.trim().is_empty() {
          return Err(ConfigError::EmptyField { field: "target" });
        }
        Ok(())
      }
    }
  }

  /// Apply a partial configuration on top of this one.
  ///
  /// `patch` is a JSON object whose keys replace the matching fields. The kind tag
  /// cannot be changed this way. The merged configuration is validated before it
  /// is returned.
  pub fn merge_patch(
    &self,
    patch: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<NodeKind, ConfigError> {
    let mut current = match serde_json::to_value(self) {
      Ok(serde_json::Value::Object(map)) => map,
      Ok(_) => return Err(ConfigError::Malformed("node config is not an object".to_string())),
      Err(e) => return Err(ConfigError::Malformed(e.to_string())),
    };

    for (key, value) in patch {
      if key == "kind" {
        continue;
      }
      current.insert(key.clone(), value.clone());
    }

    let merged: NodeKind = serde_json::from_value(serde_json::Value::Object(current))
      .map_err(|e| ConfigError::Malformed(e.to_string()))?;
    merged.validate()?;
    Ok(merged)
  }
}

fn validate_url(raw: &str) -> Result<(), ConfigError> {
  let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
    url: raw.to_string(),
    message: e.to_string(),
  })?;
  match parsed.scheme() {
    "http" | "https" => Ok(()),
    other => Err(ConfigError::InvalidUrl {
      url: raw.to_string(),
      message: format!("unsupported scheme '{}'", other),
    }),
  }
}
