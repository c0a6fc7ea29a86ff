/// Errors raised when reading or writing portable documents.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
  #[error("unsupported document format '{0}'")]
  UnsupportedFormat(String),

  #[error("document version {found} is newer than supported version {supported}")]
  UnsupportedVersion { found: u32, supported: u32 },

  #[error("malformed document")]
  Json(#[from] serde_json::Error),
}
