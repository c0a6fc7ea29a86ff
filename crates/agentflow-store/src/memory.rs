use std::collections::BTreeMap;

use agentflow_config::WorkflowDef;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{SnapshotStore, StoreError, validate_key};

/// Snapshots held in process memory.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
  snapshots: RwLock<BTreeMap<String, WorkflowDef>>,
}

impl InMemorySnapshotStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
  async fn save(&self, key: &str, workflow: &WorkflowDef) -> Result<(), StoreError> {
    validate_key(key)?;
    self
      .snapshots
      .write()
      .await
      .insert(key.to_string(), workflow.clone());
    Ok(())
  }

  async fn load(&self, key: &str) -> Result<Option<WorkflowDef>, StoreError> {
    validate_key(key)?;
    Ok(self.snapshots.read().await.get(key).cloned())
  }

  async fn delete(&self, key: &str) -> Result<bool, StoreError> {
    validate_key(key)?;
    Ok(self.snapshots.write().await.remove(key).is_some())
  }

  async fn list(&self) -> Result<Vec<String>, StoreError> {
    Ok(self.snapshots.read().await.keys().cloned().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_config::{NodeDef, NodeKind};

  fn workflow(name: &str) -> WorkflowDef {
    WorkflowDef {
      workflow_id: "wf".to_string(),
      name: name.to_string(),
      nodes: vec![NodeDef::new("start", NodeKind::Start)],
      edges: vec![],
      rules: vec![],
    }
  }

  #[tokio::test]
  async fn test_save_load_replace_delete() {
    let store = InMemorySnapshotStore::new();
    assert_eq!(store.load("draft").await.unwrap(), None);

    store.save("draft", &workflow("first")).await.unwrap();
    store.save("draft", &workflow("second")).await.unwrap();
    assert_eq!(store.load("draft").await.unwrap().unwrap().name, "second");
    assert_eq!(store.list().await.unwrap(), vec!["draft"]);

    assert!(store.delete("draft").await.unwrap());
    assert!(!store.delete("draft").await.unwrap());
    assert!(store.list().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_rejects_invalid_key() {
    let store = InMemorySnapshotStore::new();
    assert!(matches!(
      store.save("a/b", &workflow("x")).await,
      Err(StoreError::InvalidKey(_))
    ));
  }
}
