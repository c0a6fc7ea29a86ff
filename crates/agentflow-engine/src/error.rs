use agentflow_resolver::ResolveError;

/// Errors that prevent a run from starting.
///
/// Node failures and blocking violations are not errors: they are recorded as
/// the run's last step and reported through [`crate::RunReport::halt`].
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
  /// The execution order could not be resolved.
  #[error("cannot resolve execution order")]
  Resolve(#[from] ResolveError),

  /// The session already has a run in flight.
  #[error("a run is already in progress in session '{session_id}'")]
  AlreadyRunning { session_id: String },
}
