use agentflow_config::WorkflowDef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Format marker carried by every document.
pub const FORMAT: &str = "agentflow.workflow";

/// Current document version. Older versions are accepted on import.
pub const VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
  pub node_count: usize,
  pub edge_count: usize,
  pub rule_count: usize,
  pub enabled_rule_count: usize,
}

impl DocumentMetadata {
  fn describe(workflow: &WorkflowDef) -> Self {
    Self {
      node_count: workflow.nodes.len(),
      edge_count: workflow.edges.len(),
      rule_count: workflow.rules.len(),
      enabled_rule_count: workflow.enabled_rules().count(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableWorkflowDocument {
  pub format: String,
  pub version: u32,
  pub exported_at: DateTime<Utc>,
  pub metadata: DocumentMetadata,
  pub workflow: WorkflowDef,
}

/// Wrap a workflow in a portable document stamped with the current time.
pub fn export(workflow: &WorkflowDef) -> PortableWorkflowDocument {
  PortableWorkflowDocument {
    format: FORMAT.to_string(),
    version: VERSION,
    exported_at: Utc::now(),
    metadata: DocumentMetadata::describe(workflow),
    workflow: workflow.clone(),
  }
}

/// Extract the workflow from a document, checking format and version.
///
/// Metadata is informational and is not checked against the payload.
pub fn import(document: PortableWorkflowDocument) -> Result<WorkflowDef, ExportError> {
  if document.format != FORMAT {
    return Err(ExportError::UnsupportedFormat(document.format));
  }
  if document.version > VERSION {
    return Err(ExportError::UnsupportedVersion {
      found: document.version,
      supported: VERSION,
    });
  }
  Ok(document.workflow)
}

pub fn to_json(document: &PortableWorkflowDocument) -> Result<String, ExportError> {
  Ok(serde_json::to_string_pretty(document)?)
}

pub fn from_json(json: &str) -> Result<PortableWorkflowDocument, ExportError> {
  Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_config::{EdgeDef, NodeDef, NodeKind, RuleAction, RuleCondition, RuleDef};

  fn workflow() -> WorkflowDef {
    WorkflowDef {
      workflow_id: "triage".to_string(),
      name: "Ticket triage".to_string(),
      nodes: vec![
        NodeDef::new("start", NodeKind::Start),
        NodeDef::new(
          "summarize",
          NodeKind::AiCall {
            model: "gpt-4o".to_string(),
            prompt: "Summarize".to_string(),
            temperature: 0.3,
          },
        ),
        NodeDef::new("end", NodeKind::End),
      ],
      edges: vec![
        EdgeDef::new("e1", "start", "summarize"),
        EdgeDef::new("e2", "summarize", "end"),
      ],
      rules: vec![
        RuleDef::new("pii", "No PII", RuleCondition::Pii, RuleAction::Block),
        RuleDef::new("len", "Short", RuleCondition::OutputTooLong, RuleAction::Log).disabled(),
      ],
    }
  }

  #[test]
  fn test_export_counts() {
    let doc = export(&workflow());
    assert_eq!(doc.format, FORMAT);
    assert_eq!(doc.version, VERSION);
    assert_eq!(
      doc.metadata,
      DocumentMetadata {
        node_count: 3,
        edge_count: 2,
        rule_count: 2,
        enabled_rule_count: 1,
      }
    );
    assert_eq!(doc.workflow, workflow());
  }

  #[test]
  fn test_json_shape() {
    let json: serde_json::Value = serde_json::from_str(&to_json(&export(&workflow())).unwrap()).unwrap();
    assert_eq!(json["format"], "agentflow.workflow");
    assert_eq!(json["version"], 1);
    assert_eq!(json["workflow"]["nodes"][1]["kind"], "ai_call");
    assert_eq!(json["workflow"]["rules"][0]["condition"], "pii");
    assert!(json["exported_at"].is_string());
  }

  #[test]
  fn test_import_through_json() {
    let json = to_json(&export(&workflow())).unwrap();
    assert_eq!(import(from_json(&json).unwrap()).unwrap(), workflow());
  }

  #[test]
  fn test_import_rejects_foreign_documents() {
    let mut doc = export(&workflow());
    doc.format = "n8n.workflow".to_string();
    assert!(matches!(
      import(doc),
      Err(ExportError::UnsupportedFormat(f)) if f == "n8n.workflow"
    ));

    let mut doc = export(&workflow());
    doc.version = VERSION + 1;
    assert!(matches!(
      import(doc),
      Err(ExportError::UnsupportedVersion { found: 2, supported: 1 })
    ));

    assert!(matches!(from_json("{}"), Err(ExportError::Json(_))));
  }
}
