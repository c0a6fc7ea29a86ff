use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use agentflow_config::WorkflowDef;
use async_trait::async_trait;
use tracing::debug;

use crate::{SnapshotStore, StoreError, validate_key};

const EXTENSION: &str = "json";

/// One pretty-printed JSON file per key under a root directory.
///
/// The directory is created on first save. Writes go to a temporary file that
/// is renamed over the target, so a reader never sees a half-written snapshot.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
  root: PathBuf,
}

impl FsSnapshotStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.root.join(format!("{}.{}", key, EXTENSION))
  }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
  move |source| StoreError::Io {
    key: key.to_string(),
    source,
  }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
  async fn save(&self, key: &str, workflow: &WorkflowDef) -> Result<(), StoreError> {
    validate_key(key)?;
    let json = serde_json::to_vec_pretty(workflow).map_err(|source| StoreError::Serialization {
      key: key.to_string(),
      source,
    })?;

    tokio::fs::create_dir_all(&self.root)
      .await
      .map_err(io_error(key))?;

    let target = self.path_for(key);
    let staging = self.root.join(format!(".{}.{}.tmp", key, EXTENSION));
    tokio::fs::write(&staging, json).await.map_err(io_error(key))?;
    tokio::fs::rename(&staging, &target)
      .await
      .map_err(io_error(key))?;

    debug!(key, path = %target.display(), "snapshot saved");
    Ok(())
  }

  async fn load(&self, key: &str) -> Result<Option<WorkflowDef>, StoreError> {
    validate_key(key)?;
    let bytes = match tokio::fs::read(self.path_for(key)).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(io_error(key)(e)),
    };
    let workflow = serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialization {
      key: key.to_string(),
      source,
    })?;
    Ok(Some(workflow))
  }

  async fn delete(&self, key: &str) -> Result<bool, StoreError> {
    validate_key(key)?;
    match tokio::fs::remove_file(self.path_for(key)).await {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
      Err(e) => Err(io_error(key)(e)),
    }
  }

  async fn list(&self) -> Result<Vec<String>, StoreError> {
    let mut entries = match tokio::fs::read_dir(&self.root).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(io_error("*")(e)),
    };

    let mut keys = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error("*"))? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
        continue;
      }
      let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        continue;
      };
      if validate_key(stem).is_ok() && !stem.starts_with('.') {
        keys.push(stem.to_string());
      }
    }
    keys.sort();
    Ok(keys)
  }
}
