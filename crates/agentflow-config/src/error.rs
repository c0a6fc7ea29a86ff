use thiserror::Error;

/// Errors raised while validating kind-specific node configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
  /// A required text field is empty.
  #[error("field '{field}' must not be empty")]
  EmptyField { field: &'static str },

  #[error("temperature {0} is outside 0.0..=2.0")]
  TemperatureOutOfRange(f32),

  #[error("invalid url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  /// A switch node declares no cases.
  #[error("switch node must declare at least one case")]
  NoCases,

  #[error("duplicate switch case: {0}")]
  DuplicateCase(String),

  /// The simulated case is not one of the declared cases.
  #[error("simulated case '{0}' is not a declared case")]
  UnknownCase(String),

  /// A partial update could not be applied to the node's configuration.
  #[error("malformed configuration: {0}")]
  Malformed(String),
}
