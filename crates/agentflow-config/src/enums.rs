use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
  #[default]
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl HttpMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
      HttpMethod::Put => "PUT",
      HttpMethod::Patch => "PATCH",
      HttpMethod::Delete => "DELETE",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierChannel {
  Email,
  Slack,
  Webhook,
}

impl NotifierChannel {
  pub fn as_str(&self) -> &'static str {
    match self {
      NotifierChannel::Email => "email",
      NotifierChannel::Slack => "slack",
      NotifierChannel::Webhook => "webhook",
    }
  }
}

/// What happens when a rule fires.
///
/// Only `Block` halts a run. `Warn` and `Log` annotate the step and let the run continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
  Block,
  Warn,
  Log,
}

impl fmt::Display for RuleAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      RuleAction::Block => "block",
      RuleAction::Warn => "warn",
      RuleAction::Log => "log",
    };
    f.write_str(s)
  }
}
