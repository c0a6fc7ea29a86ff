//! Agentflow Export
//!
//! Converts a workflow definition into a [`PortableWorkflowDocument`]: the
//! nodes, edges and rules verbatim, wrapped with a format marker, a version and
//! some metadata for downstream tooling.

mod document;
mod error;

pub use document::{
  DocumentMetadata, FORMAT, PortableWorkflowDocument, VERSION, export, from_json, import, to_json,
};
pub use error::ExportError;
