use std::collections::HashMap;

use agentflow_config::{EdgeDef, NodeDef};

/// An outgoing connection as seen from its source node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Successor {
  pub edge_id: String,
  pub handle: Option<String>,
  pub target: String,
}

/// Graph structure for traversal.
///
/// Successor lists keep edge insertion order, which traversal relies on for
/// deterministic results.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: node_id -> outgoing connections.
  adjacency: HashMap<String, Vec<Successor>>,
}

impl Graph {
  /// Build a graph from nodes and edges.
  pub fn new(nodes: &[NodeDef], edges: &[EdgeDef]) -> Self {
    let mut adjacency: HashMap<String, Vec<Successor>> = HashMap::new();

    for node in nodes {
      adjacency.entry(node.id.clone()).or_default();
    }

    for edge in edges {
      adjacency
        .entry(edge.source.clone())
        .or_default()
        .push(Successor {
          edge_id: edge.id.clone(),
          handle: edge.source_handle.clone(),
          target: edge.target.clone(),
        });
    }

    Self { adjacency }
  }

  /// Get outgoing connections for a given node, in edge insertion order.
  pub fn successors(&self, node_id: &str) -> &[Successor] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_config::NodeKind;

  #[test]
  fn test_successors_keep_insertion_order() {
    let nodes = vec![
      NodeDef::new("a", NodeKind::Start),
      NodeDef::new("b", NodeKind::End),
      NodeDef::new("c", NodeKind::End),
    ];
    let edges = vec![
      EdgeDef::new("e2", "a", "c"),
      EdgeDef::new("e1", "a", "b"),
    ];

    let graph = Graph::new(&nodes, &edges);
    let targets: Vec<&str> = graph.successors("a").iter().map(|s| s.target.as_str()).collect();
    assert_eq!(targets, vec!["c", "b"]);
    assert_eq!(graph.successors("a")[0].edge_id, "e2");
    assert!(graph.successors("b").is_empty());
    assert!(graph.successors("missing").is_empty());
  }
}
