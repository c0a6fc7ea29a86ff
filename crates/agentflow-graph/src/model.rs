use std::collections::HashSet;

use agentflow_config::{EdgeDef, NodeDef, NodeKind, Position, RuleDef, WorkflowDef};
use tracing::debug;

use crate::error::GraphError;
use crate::graph::Graph;

/// Partial update for a node. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
  pub label: Option<String>,
  pub position: Option<Position>,
  /// Fields merged over the node's current configuration.
  pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

/// The editable workflow graph.
///
/// Owned by the editing surface. Nodes and edges keep insertion order, so a graph
/// exported and loaded again traverses identically.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
  nodes: Vec<NodeDef>,
  edges: Vec<EdgeDef>,
  next_id: u64,
}

impl WorkflowGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a graph from a saved definition, validating every node and edge.
  pub fn from_def(def: &WorkflowDef) -> Result<Self, GraphError> {
    let mut graph = Self::new();
    for node in &def.nodes {
      graph.insert_node(node.clone())?;
    }
    for edge in &def.edges {
      graph.add_edge_with(edge.clone())?;
    }
    Ok(graph)
  }

  /// Snapshot the graph together with a rule set.
  pub fn to_def(
    &self,
    workflow_id: impl Into<String>,
    name: impl Into<String>,
    rules: &[RuleDef],
  ) -> WorkflowDef {
    WorkflowDef {
      workflow_id: workflow_id.into(),
      name: name.into(),
      nodes: self.nodes.clone(),
      edges: self.edges.clone(),
      rules: rules.to_vec(),
    }
  }

  /// Add a node with a generated id.
  pub fn add_node(
    &mut self,
    kind: NodeKind,
    position: Position,
    label: Option<String>,
  ) -> Result<NodeDef, GraphError> {
    let id = self.fresh_id(kind.tag().as_str());
    let node = NodeDef {
      label: label.unwrap_or_else(|| id.clone()),
      id,
      position,
      kind,
    };
    self.insert_node(node.clone())?;
    Ok(node)
  }

  /// Add a node that already carries an id.
  pub fn insert_node(&mut self, node: NodeDef) -> Result<(), GraphError> {
    if self.node(&node.id).is_some() {
      return Err(GraphError::DuplicateNodeId { node_id: node.id });
    }
    node
      .kind
      .validate()
      .map_err(|source| GraphError::InvalidConfig {
        node_id: node.id.clone(),
        source,
      })?;
    self.nodes.push(node);
    Ok(())
  }

  /// Connect two nodes with a generated edge id.
  pub fn add_edge(
    &mut self,
    source: &str,
    target: &str,
    source_handle: Option<&str>,
  ) -> Result<EdgeDef, GraphError> {
    let mut edge = EdgeDef::new(self.fresh_edge_id(), source, target);
    edge.source_handle = source_handle.map(|h| h.to_string());
    self.add_edge_with(edge.clone())?;
    Ok(edge)
  }

  /// Add a fully specified edge.
  pub fn add_edge_with(&mut self, edge: EdgeDef) -> Result<(), GraphError> {
    if self.edges.iter().any(|e| e.id == edge.id) {
      return Err(GraphError::DuplicateEdgeId { edge_id: edge.id });
    }

    let source = self
      .node(&edge.source)
      .ok_or_else(|| GraphError::InvalidEndpoint {
        node_id: edge.source.clone(),
      })?;
    if self.node(&edge.target).is_none() {
      return Err(GraphError::InvalidEndpoint {
        node_id: edge.target.clone(),
      });
    }

    if !source.kind.accepts_handle(edge.source_handle.as_deref()) {
      return Err(GraphError::InvalidHandle {
        node_id: edge.source.clone(),
        handle: edge.source_handle.clone(),
      });
    }

    let taken = self
      .edges
      .iter()
      .any(|e| e.source == edge.source && e.source_handle == edge.source_handle);
    if taken {
      return Err(GraphError::DuplicateSuccessor {
        node_id: edge.source.clone(),
        handle: edge.source_handle.clone(),
      });
    }

    self.edges.push(edge);
    Ok(())
  }

  /// Apply a partial update to a node.
  ///
  /// Unknown ids are ignored. The merged configuration is validated, and an update
  /// that would leave an existing outgoing edge on an undeclared branch is rejected.
  pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<(), GraphError> {
    let Some(index) = self.nodes.iter().position(|n| n.id == id) else {
      debug!(node_id = %id, "update for unknown node ignored");
      return Ok(());
    };

    let kind = match &patch.config {
      Some(config) => Some(self.nodes[index].kind.merge_patch(config).map_err(|source| {
        GraphError::InvalidConfig {
          node_id: id.to_string(),
          source,
        }
      })?),
      None => None,
    };

    if let Some(kind) = &kind {
      if let Some(orphaned) = self
        .edges_from(id)
        .find(|e| !kind.accepts_handle(e.source_handle.as_deref()))
      {
        return Err(GraphError::InvalidHandle {
          node_id: id.to_string(),
          handle: orphaned.source_handle.clone(),
        });
      }
    }

    let node = &mut self.nodes[index];
    if let Some(label) = patch.label {
      node.label = label;
    }
    if let Some(position) = patch.position {
      node.position = position;
    }
    if let Some(kind) = kind {
      node.kind = kind;
    }
    Ok(())
  }

  /// Remove a node and every edge that starts or ends at it.
  pub fn remove_node(&mut self, id: &str) -> Option<NodeDef> {
    let index = self.nodes.iter().position(|n| n.id == id)?;
    let removed = self.nodes.remove(index);
    let before = self.edges.len();
    self.edges.retain(|e| e.source != id && e.target != id);
    debug!(
      node_id = %id,
      edges_removed = before - self.edges.len(),
      "node removed"
    );
    Some(removed)
  }

  pub fn remove_edge(&mut self, id: &str) -> Option<EdgeDef> {
    let index = self.edges.iter().position(|e| e.id == id)?;
    Some(self.edges.remove(index))
  }

  pub fn node(&self, id: &str) -> Option<&NodeDef> {
    self.nodes.iter().find(|n| n.id == id)
  }

  pub fn nodes(&self) -> &[NodeDef] {
    &self.nodes
  }

  pub fn edges(&self) -> &[EdgeDef] {
    &self.edges
  }

  /// Outgoing edges of a node, in insertion order.
  pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeDef> + 'a {
    self.edges.iter().filter(move |e| e.source == id)
  }

  pub fn edges_to<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeDef> + 'a {
    self.edges.iter().filter(move |e| e.target == id)
  }

  /// Ids of all nodes of kind `start`.
  pub fn start_nodes(&self) -> Vec<&str> {
    self
      .nodes
      .iter()
      .filter(|n| matches!(n.kind, NodeKind::Start))
      .map(|n| n.id.as_str())
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.edges)
  }

  fn fresh_id(&mut self, prefix: &str) -> String {
    let taken: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
    loop {
      self.next_id += 1;
      let candidate = format!("{}_{}", prefix, self.next_id);
      if !taken.contains(candidate.as_str()) {
        return candidate;
      }
    }
  }

  fn fresh_edge_id(&mut self) -> String {
    let taken: HashSet<&str> = self.edges.iter().map(|e| e.id.as_str()).collect();
    loop {
      self.next_id += 1;
      let candidate = format!("edge_{}", self.next_id);
      if !taken.contains(candidate.as_str()) {
        return candidate;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_config::{ConfigError, NotifierChannel};
  use serde_json::json;

  fn condition() -> NodeKind {
    NodeKind::Condition {
      expression: "score > 0.5".to_string(),
      simulated_outcome: true,
    }
  }

  fn ai_call() -> NodeKind {
    NodeKind::AiCall {
      model: "gpt-4".to_string(),
      prompt: "Hello".to_string(),
      temperature: 0.7,
    }
  }

  #[test]
  fn test_add_node_generates_unique_ids() {
    let mut graph = WorkflowGraph::new();
    let a = graph.add_node(NodeKind::Start, Position::default(), None).unwrap();
    let b = graph.add_node(ai_call(), Position::new(10.0, 20.0), Some("Ask".to_string())).unwrap();

    assert_ne!(a.id, b.id);
    assert!(a.id.starts_with("start_"));
    assert!(b.id.starts_with("ai_call_"));
    assert_eq!(b.label, "Ask");
    assert_eq!(graph.nodes().len(), 2);
  }

  #[test]
  fn test_add_node_rejects_invalid_config() {
    let mut graph = WorkflowGraph::new();
    let result = graph.add_node(
      NodeKind::Notifier {
        channel: NotifierChannel::Email,
        target: String::new(),
      },
      Position::default(),
      None,
    );

    assert!(matches!(
      result,
      Err(GraphError::InvalidConfig {
        source: ConfigError::EmptyField { field: "target" },
        ..
      })
    ));
    assert!(graph.is_empty());
  }

  #[test]
  fn test_insert_node_rejects_duplicate_id() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("a", NodeKind::Start)).unwrap();
    let result = graph.insert_node(NodeDef::new("a", NodeKind::End));
    assert!(matches!(result, Err(GraphError::DuplicateNodeId { .. })));
  }

  #[test]
  fn test_add_edge_rejects_missing_endpoint() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("a", NodeKind::Start)).unwrap();

    let result = graph.add_edge("a", "ghost", None);
    assert!(matches!(
      result,
      Err(GraphError::InvalidEndpoint { ref node_id }) if node_id == "ghost"
    ));
    assert!(graph.edges().is_empty());
  }

  #[test]
  fn test_add_edge_validates_handles() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("router", condition())).unwrap();
    graph.insert_node(NodeDef::new("yes", NodeKind::End)).unwrap();
    graph.insert_node(NodeDef::new("no", NodeKind::End)).unwrap();

    assert!(matches!(
      graph.add_edge("router", "yes", None),
      Err(GraphError::InvalidHandle { .. })
    ));
    assert!(matches!(
      graph.add_edge("router", "yes", Some("maybe")),
      Err(GraphError::InvalidHandle { .. })
    ));
    graph.add_edge("router", "yes", Some("true")).unwrap();
    graph.add_edge("router", "no", Some("false")).unwrap();

    assert!(matches!(
      graph.add_edge("yes", "no", Some("true")),
      Err(GraphError::InvalidHandle { .. })
    ));
  }

  #[test]
  fn test_add_edge_rejects_second_successor_on_same_handle() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("s", NodeKind::Start)).unwrap();
    graph.insert_node(NodeDef::new("a", NodeKind::End)).unwrap();
    graph.insert_node(NodeDef::new("b", NodeKind::End)).unwrap();

    graph.add_edge("s", "a", None).unwrap();
    assert!(matches!(
      graph.add_edge("s", "b", None),
      Err(GraphError::DuplicateSuccessor { .. })
    ));
  }

  #[test]
  fn test_update_node_merges_config() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("ai", ai_call())).unwrap();

    let patch = NodePatch {
      label: Some("Renamed".to_string()),
      config: json!({ "prompt": "Updated" }).as_object().cloned(),
      ..Default::default()
    };
    graph.update_node("ai", patch).unwrap();

    let node = graph.node("ai").unwrap();
    assert_eq!(node.label, "Renamed");
    match &node.kind {
      NodeKind::AiCall { prompt, model, .. } => {
        assert_eq!(prompt, "Updated");
        assert_eq!(model, "gpt-4");
      }
      other => panic!("unexpected kind {:?}", other),
    }
  }

  #[test]
  fn test_update_unknown_node_is_noop() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("a", NodeKind::Start)).unwrap();

    let patch = NodePatch {
      label: Some("x".to_string()),
      ..Default::default()
    };
    assert!(graph.update_node("missing", patch).is_ok());
    assert_eq!(graph.node("a").unwrap().label, "");
  }

  #[test]
  fn test_update_node_rejects_orphaning_handle() {
    let mut graph = WorkflowGraph::new();
    graph
      .insert_node(NodeDef::new(
        "switch",
        NodeKind::Switch {
          cases: vec!["left".to_string(), "right".to_string()],
          simulated_case: None,
        },
      ))
      .unwrap();
    graph.insert_node(NodeDef::new("r", NodeKind::End)).unwrap();
    graph.add_edge("switch", "r", Some("right")).unwrap();

    let patch = NodePatch {
      config: json!({ "cases": ["left"] }).as_object().cloned(),
      ..Default::default()
    };
    let result = graph.update_node("switch", patch);
    assert!(matches!(result, Err(GraphError::InvalidHandle { .. })));

    match &graph.node("switch").unwrap().kind {
      NodeKind::Switch { cases, .. } => assert_eq!(cases.len(), 2),
      other => panic!("unexpected kind {:?}", other),
    }
  }

  #[test]
  fn test_remove_node_cascades_edges() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("s", NodeKind::Start)).unwrap();
    graph.insert_node(NodeDef::new("router", condition())).unwrap();
    graph.insert_node(NodeDef::new("a", NodeKind::End)).unwrap();
    graph.insert_node(NodeDef::new("b", NodeKind::End)).unwrap();
    graph.add_edge("s", "router", None).unwrap();
    graph.add_edge("router", "a", Some("true")).unwrap();
    graph.add_edge("router", "b", Some("false")).unwrap();

    let removed = graph.remove_node("router").unwrap();
    assert_eq!(removed.id, "router");
    assert!(graph.edges().is_empty());
    assert_eq!(graph.edges_from("s").count(), 0);
    assert_eq!(graph.edges_to("a").count(), 0);
    assert!(graph.remove_node("router").is_none());
  }

  #[test]
  fn test_def_round_trip() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("s", NodeKind::Start)).unwrap();
    graph.insert_node(NodeDef::new("e", NodeKind::End)).unwrap();
    graph.add_edge("s", "e", None).unwrap();

    let def = graph.to_def("wf", "Workflow", &[]);
    let loaded = WorkflowGraph::from_def(&def).unwrap();
    assert_eq!(loaded.nodes(), graph.nodes());
    assert_eq!(loaded.edges(), graph.edges());
  }

  #[test]
  fn test_from_def_rejects_dangling_edge() {
    let def = WorkflowDef {
      workflow_id: "wf".to_string(),
      name: "Broken".to_string(),
      nodes: vec![NodeDef::new("s", NodeKind::Start)],
      edges: vec![EdgeDef::new("e1", "s", "gone")],
      rules: vec![],
    };
    assert!(matches!(
      WorkflowGraph::from_def(&def),
      Err(GraphError::InvalidEndpoint { .. })
    ));
  }
}
