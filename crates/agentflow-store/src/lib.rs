//! Agentflow Store
//!
//! Key-value persistence for workflow definitions. A snapshot is the full
//! [`WorkflowDef`] (nodes, edges and rules) saved under an opaque user-scoped key.
//!
//! Two implementations are provided: [`InMemorySnapshotStore`] for tests and
//! embedding, and [`FsSnapshotStore`] which keeps one JSON file per key.

mod fs;
mod memory;

pub use fs::FsSnapshotStore;
pub use memory::InMemorySnapshotStore;

use agentflow_config::WorkflowDef;
use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// Keys are non-empty and limited to ASCII letters, digits, `.`, `_` and `-`.
  #[error("invalid snapshot key '{0}'")]
  InvalidKey(String),

  #[error("i/o error for snapshot '{key}'")]
  Io {
    key: String,
    #[source]
    source: std::io::Error,
  },

  #[error("snapshot '{key}' is not a valid workflow definition")]
  Serialization {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Storage trait for workflow snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
  /// Save a snapshot, replacing any previous one under the same key.
  async fn save(&self, key: &str, workflow: &WorkflowDef) -> Result<(), StoreError>;

  /// Load a snapshot. Returns `None` when nothing is stored under the key.
  async fn load(&self, key: &str) -> Result<Option<WorkflowDef>, StoreError>;

  /// Delete a snapshot. Returns whether one existed.
  async fn delete(&self, key: &str) -> Result<bool, StoreError>;

  /// All stored keys, sorted.
  async fn list(&self) -> Result<Vec<String>, StoreError>;
}

pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
  let valid = !key.is_empty()
    && key != "."
    && key != ".."
    && key
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
  if valid {
    Ok(())
  } else {
    Err(StoreError::InvalidKey(key.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validate_key() {
    assert!(validate_key("alice.support-flow_v2").is_ok());
    for bad in ["", ".", "..", "a/b", "../etc", "with space", "ümlaut"] {
      assert!(
        matches!(validate_key(bad), Err(StoreError::InvalidKey(_))),
        "accepted {:?}",
        bad
      );
    }
  }
}
