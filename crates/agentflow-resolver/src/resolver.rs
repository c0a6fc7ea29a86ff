use std::collections::{HashMap, HashSet};

use agentflow_config::NodeDef;
use agentflow_graph::WorkflowGraph;
use tracing::debug;

use crate::error::ResolveError;

/// How traversal treats branching nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BranchPolicy {
  /// Explore every branch, in edge insertion order.
  #[default]
  AllBranches,
  /// Follow only the branch each branching node selects for simulation.
  Selected,
}

/// Resolver fixes the order in which a graph's nodes are visited.
pub trait Resolver: Send + Sync {
  /// Resolve the execution order of a graph.
  ///
  /// This process:
  /// 1. Locates the unique start node
  /// 2. Walks the graph from the start node, visiting each node once
  ///
  /// Edge endpoints and handles are already guaranteed by [`WorkflowGraph`].
  fn resolve(&self, graph: &WorkflowGraph) -> Result<Vec<String>, ResolveError>;
}

/// Depth-first preorder traversal from the start node.
///
/// Cycles are tolerated: a node already visited is never visited again.
/// Nodes unreachable from the start are left out.
#[derive(Debug, Clone, Default)]
pub struct DepthFirstResolver {
  policy: BranchPolicy,
}

impl DepthFirstResolver {
  pub fn new(policy: BranchPolicy) -> Self {
    Self { policy }
  }

  pub fn policy(&self) -> BranchPolicy {
    self.policy
  }

  /// Find the unique start node.
  fn find_start<'a>(&self, graph: &'a WorkflowGraph) -> Result<&'a str, ResolveError> {
    let starts = graph.start_nodes();
    match starts.as_slice() {
      [only] => Ok(*only),
      _ => Err(ResolveError::NoUniqueStartNode {
        count: starts.len(),
      }),
    }
  }
}

impl Resolver for DepthFirstResolver {
  fn resolve(&self, graph: &WorkflowGraph) -> Result<Vec<String>, ResolveError> {
    if graph.is_empty() {
      return Ok(Vec::new());
    }

    let start = self.find_start(graph)?;

    let nodes: HashMap<&str, &NodeDef> = graph
      .nodes()
      .iter()
      .map(|n| (n.id.as_str(), n))
      .collect();

    let adjacency = graph.graph();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut order = Vec::new();
    let mut stack: Vec<&str> = vec![start];

    while let Some(node_id) = stack.pop() {
      if !visited.insert(node_id) {
        continue;
      }
      order.push(node_id.to_string());

      let selected = match self.policy {
        BranchPolicy::AllBranches => None,
        BranchPolicy::Selected => nodes.get(node_id).and_then(|n| n.kind.selected_branch()),
      };

      // Push in reverse so the first inserted edge is explored first.
      for successor in adjacency.successors(node_id).iter().rev() {
        if let Some(branch) = selected {
          if successor.handle.as_deref() != Some(branch) {
            continue;
          }
        }
        if let Some((target, _)) = nodes.get_key_value(successor.target.as_str()) {
          if !visited.contains(target) {
            stack.push(*target);
          }
        }
      }
    }

    debug!(
      start = %start,
      visited = order.len(),
      total = nodes.len(),
      policy = ?self.policy,
      "resolved execution order"
    );

    Ok(order)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use agentflow_config::NodeKind;

  fn condition(outcome: bool) -> NodeKind {
    NodeKind::Condition {
      expression: "flag".to_string(),
      simulated_outcome: outcome,
    }
  }

  fn action() -> NodeKind {
    NodeKind::AiCall {
      model: "gpt-4".to_string(),
      prompt: "go".to_string(),
      temperature: 0.2,
    }
  }

  fn linear() -> WorkflowGraph {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("start", NodeKind::Start)).unwrap();
    graph.insert_node(NodeDef::new("action", action())).unwrap();
    graph.insert_node(NodeDef::new("end", NodeKind::End)).unwrap();
    graph.add_edge("start", "action", None).unwrap();
    graph.add_edge("action", "end", None).unwrap();
    graph
  }

  fn branching(outcome: bool) -> WorkflowGraph {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("start", NodeKind::Start)).unwrap();
    graph.insert_node(NodeDef::new("router", condition(outcome))).unwrap();
    graph.insert_node(NodeDef::new("path_true", action())).unwrap();
    graph.insert_node(NodeDef::new("path_false", action())).unwrap();
    graph.insert_node(NodeDef::new("end", NodeKind::End)).unwrap();
    graph.add_edge("start", "router", None).unwrap();
    graph.add_edge("router", "path_true", Some("true")).unwrap();
    graph.add_edge("router", "path_false", Some("false")).unwrap();
    graph.add_edge("path_true", "end", None).unwrap();
    graph.add_edge("path_false", "end", None).unwrap();
    graph
  }

  #[test]
  fn test_empty_graph_resolves_to_empty_order() {
    let resolver = DepthFirstResolver::default();
    assert_eq!(resolver.resolve(&WorkflowGraph::new()).unwrap(), Vec::<String>::new());
  }

  #[test]
  fn test_missing_start_node() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("a", action())).unwrap();

    let result = DepthFirstResolver::default().resolve(&graph);
    assert_eq!(result, Err(ResolveError::NoUniqueStartNode { count: 0 }));
  }

  #[test]
  fn test_multiple_start_nodes() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("s1", NodeKind::Start)).unwrap();
    graph.insert_node(NodeDef::new("s2", NodeKind::Start)).unwrap();

    let result = DepthFirstResolver::default().resolve(&graph);
    assert_eq!(result, Err(ResolveError::NoUniqueStartNode { count: 2 }));
  }

  #[test]
  fn test_lone_start_node() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("start", NodeKind::Start)).unwrap();

    let order = DepthFirstResolver::default().resolve(&graph).unwrap();
    assert_eq!(order, vec!["start"]);
  }

  #[test]
  fn test_linear_order() {
    let order = DepthFirstResolver::default().resolve(&linear()).unwrap();
    assert_eq!(order, vec!["start", "action", "end"]);
  }

  #[test]
  fn test_all_branches_in_insertion_order() {
    let order = DepthFirstResolver::new(BranchPolicy::AllBranches)
      .resolve(&branching(true))
      .unwrap();
    assert_eq!(order, vec!["start", "router", "path_true", "end", "path_false"]);
  }

  #[test]
  fn test_selected_branch_only() {
    let resolver = DepthFirstResolver::new(BranchPolicy::Selected);

    let order = resolver.resolve(&branching(true)).unwrap();
    assert_eq!(order, vec!["start", "router", "path_true", "end"]);

    let order = resolver.resolve(&branching(false)).unwrap();
    assert_eq!(order, vec!["start", "router", "path_false", "end"]);
  }

  #[test]
  fn test_cycle_terminates_without_revisiting() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("start", NodeKind::Start)).unwrap();
    graph.insert_node(NodeDef::new("a", action())).unwrap();
    graph.insert_node(NodeDef::new("b", action())).unwrap();
    graph.add_edge("start", "a", None).unwrap();
    graph.add_edge("a", "b", None).unwrap();
    graph.add_edge("b", "a", None).unwrap();

    let order = DepthFirstResolver::default().resolve(&graph).unwrap();
    assert_eq!(order, vec!["start", "a", "b"]);
  }

  #[test]
  fn test_self_loop() {
    let mut graph = WorkflowGraph::new();
    graph.insert_node(NodeDef::new("start", NodeKind::Start)).unwrap();
    graph.add_edge("start", "start", None).unwrap();

    let order = DepthFirstResolver::default().resolve(&graph).unwrap();
    assert_eq!(order, vec!["start"]);
  }

  #[test]
  fn test_unreachable_nodes_are_excluded() {
    let mut graph = linear();
    graph.insert_node(NodeDef::new("decoration", action())).unwrap();

    let order = DepthFirstResolver::default().resolve(&graph).unwrap();
    assert!(!order.contains(&"decoration".to_string()));
    assert_eq!(order.len(), 3);
  }

  #[test]
  fn test_removed_node_leaves_no_dangling_edges() {
    let mut graph = linear();
    graph.remove_node("action").unwrap();
    assert!(graph.edges().is_empty());

    let order = DepthFirstResolver::default().resolve(&graph).unwrap();
    assert_eq!(order, vec!["start"]);
  }

  #[test]
  fn test_each_reachable_node_exactly_once() {
    // Diamond: both branches rejoin at `end`.
    let order = DepthFirstResolver::default().resolve(&branching(true)).unwrap();
    let unique: HashSet<&String> = order.iter().collect();
    assert_eq!(unique.len(), order.len());
    assert_eq!(order.first().map(|s| s.as_str()), Some("start"));
    assert_eq!(order.len(), 5);
  }

  #[test]
  fn test_deterministic() {
    let graph = branching(true);
    let resolver = DepthFirstResolver::default();
    let first = resolver.resolve(&graph).unwrap();
    for _ in 0..10 {
      assert_eq!(resolver.resolve(&graph).unwrap(), first);
    }
  }
}
