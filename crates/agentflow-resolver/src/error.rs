use thiserror::Error;

/// Errors that can occur while fixing an execution order.
///
/// All of them are structural: the caller corrects the graph and retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  /// The graph has zero or several nodes of kind `start`.
  #[error("expected exactly one start node, found {count}")]
  NoUniqueStartNode { count: usize },
}
