use std::collections::BinaryHeap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::algorithms::resolve;
use crate::error::Result;
use crate::network::graph::Edge;
use crate::network::{DirectedGraph, Direction, NodeIndex};
use crate::{Cost, NodeId};

/// One traversed edge: the link it came from and which way it was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    pub stable_index: usize,
    pub direction: Direction,
}

impl From<&Edge> for Hop {
    fn from(edge: &Edge) -> Self {
        Self {
            stable_index: edge.stable_index,
            direction: edge.direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub hops: Vec<Hop>,
    pub total_cost: Cost,
}

impl Path {
    /// Zero-cost path from a node to itself.
    pub fn trivial(node: &str) -> Self {
        Self {
            nodes: vec![node.to_string()],
            hops: Vec::new(),
            total_cost: 0,
        }
    }

    /// `None` only for a path with no nodes, which the engine never builds.
    pub fn source(&self) -> Option<&str> {
        self.nodes.first().map(String::as_str)
    }

    pub fn destination(&self) -> Option<&str> {
        self.nodes.last().map(String::as_str)
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Nodes strictly between source and destination.
    pub fn intermediates(&self) -> &[NodeId] {
        if self.nodes.len() <= 2 {
            &[]
        } else {
            &self.nodes[1..self.nodes.len() - 1]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Maximum number of paths returned.
    pub limit: usize,
    /// Maximum number of edge expansions before the search gives up.
    pub exploration_budget: usize,
    /// Optional ceiling on the number of hops of a reported path.
    pub max_hops: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            exploration_budget: 100_000,
            max_hops: None,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.exploration_budget = budget;
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = Some(max_hops);
        self
    }
}

/// Ranked loop-free paths between one pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSet {
    pub paths: Vec<Path>,
    /// Set when the exploration budget ran out before the search finished.
    pub truncated: bool,
}

impl PathSet {
    pub fn best(&self) -> Option<&Path> {
        self.paths.first()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Enumerates simple paths from `source` to `target`, cheapest first.
pub fn find_paths(
    graph: &DirectedGraph,
    source: &str,
    target: &str,
    options: &SearchOptions,
) -> Result<PathSet> {
    let s = resolve(graph, source)?;
    let t = resolve(graph, target)?;
    Ok(enumerate(graph, s, t, options))
}

struct Frame {
    node: NodeIndex,
    cursor: usize,
}

pub(crate) fn enumerate(
    graph: &DirectedGraph,
    source: NodeIndex,
    target: NodeIndex,
    options: &SearchOptions,
) -> PathSet {
    if options.limit == 0 || source >= graph.node_count() || target >= graph.node_count() {
        return PathSet::default();
    }
    if source == target {
        return PathSet {
            paths: vec![Path::trivial(graph.node_id(source))],
            truncated: false,
        };
    }

    let mut on_path = vec![false; graph.node_count()];
    let mut stack = vec![Frame { node: source, cursor: 0 }];
    let mut taken: Vec<Edge> = Vec::new();
    let mut cost: Cost = 0;
    on_path[source] = true;

    let mut candidates: Vec<Path> = Vec::new();
    // Max-heap over the best `limit` costs found so far; its top bounds the search.
    let mut kept_costs: BinaryHeap<Cost> = BinaryHeap::new();
    let mut expansions = 0usize;
    let mut truncated = false;

    while let Some(frame) = stack.last_mut() {
        let node = frame.node;
        let edges = graph.edges(node);

        if frame.cursor >= edges.len() {
            stack.pop();
            on_path[node] = false;
            if let Some(edge) = taken.pop() {
                cost -= Cost::from(edge.weight);
            }
            continue;
        }

        let edge = edges[frame.cursor];
        frame.cursor += 1;

        if on_path[edge.target] {
            continue;
        }
        let depth = taken.len() + 1;
        if options.max_hops.is_some_and(|max| depth > max) {
            continue;
        }
        let next_cost = cost + Cost::from(edge.weight);
        if kept_costs.len() >= options.limit && kept_costs.peek().is_some_and(|&worst| next_cost > worst) {
            continue;
        }

        if expansions >= options.exploration_budget {
            truncated = true;
            break;
        }
        expansions += 1;

        if edge.target == target {
            let mut nodes: Vec<NodeId> = stack.iter().map(|f| graph.node_id(f.node).to_string()).collect();
            nodes.push(graph.node_id(target).to_string());
            let mut hops: Vec<Hop> = taken.iter().map(Hop::from).collect();
            hops.push(Hop::from(&edge));
            candidates.push(Path {
                nodes,
                hops,
                total_cost: next_cost,
            });

            kept_costs.push(next_cost);
            if kept_costs.len() > options.limit {
                kept_costs.pop();
            }
            continue;
        }

        if options.max_hops.is_some_and(|max| depth >= max) {
            continue;
        }

        on_path[edge.target] = true;
        taken.push(edge);
        cost = next_cost;
        stack.push(Frame {
            node: edge.target,
            cursor: 0,
        });
    }

    if truncated {
        warn!(
            "Path search {} -> {} stopped after {} expansions with {} candidates",
            graph.node_id(source),
            graph.node_id(target),
            expansions,
            candidates.len()
        );
    } else {
        debug!(
            "Path search {} -> {}: {} candidates in {} expansions",
            graph.node_id(source),
            graph.node_id(target),
            candidates.len(),
            expansions
        );
    }

    // Stable sort: equal cost and hop count keep discovery order
    candidates.sort_by(|a, b| {
        a.total_cost
            .cmp(&b.total_cost)
            .then_with(|| a.hops.len().cmp(&b.hops.len()))
    });
    candidates.truncate(options.limit);

    PathSet {
        paths: candidates,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::network::{Link, Node};

    fn diamond() -> DirectedGraph {
        let nodes = ["A", "B", "C", "D"].map(|id| Node::new(id, ""));
        let links = vec![
            Link::new(0, "A", "B", 1, 1),
            Link::new(1, "A", "C", 5, 5),
            Link::new(2, "B", "D", 1, 1),
            Link::new(3, "C", "D", 1, 1),
            Link::new(4, "B", "C", 1, 1),
        ];
        DirectedGraph::build(&nodes, &links).unwrap()
    }

    #[test]
    fn test_enumerates_all_simple_paths_sorted() {
        let graph = diamond();
        let set = find_paths(&graph, "A", "D", &SearchOptions::default()).unwrap();

        assert!(!set.truncated);
        let costs: Vec<Cost> = set.paths.iter().map(|p| p.total_cost).collect();
        // A-B-D 2, A-B-C-D 3, A-C-D 6, A-C-B-D 7
        assert_eq!(costs, vec![2, 3, 6, 7]);
        assert_eq!(set.best().unwrap().nodes, vec!["A", "B", "D"]);
    }

    #[test]
    fn test_endpoints_of_deserialized_empty_path() {
        let path: Path = serde_json::from_str(r#"{"nodes": [], "hops": [], "total_cost": 0}"#).unwrap();
        assert_eq!(path.source(), None);
        assert_eq!(path.destination(), None);
        assert!(path.intermediates().is_empty());

        let trivial = Path::trivial("A");
        assert_eq!((trivial.source(), trivial.destination()), (Some("A"), Some("A")));
    }

    #[test]
    fn test_paths_are_loop_free() {
        let graph = diamond();
        let set = find_paths(&graph, "A", "D", &SearchOptions::default()).unwrap();
        for path in &set.paths {
            let unique: HashSet<&NodeId> = path.nodes.iter().collect();
            assert_eq!(unique.len(), path.nodes.len());
            assert_eq!(path.hops.len() + 1, path.nodes.len());
        }
    }

    #[test]
    fn test_limit_truncates_to_cheapest() {
        let graph = diamond();
        let set = find_paths(&graph, "A", "D", &SearchOptions::default().with_limit(2)).unwrap();
        let costs: Vec<Cost> = set.paths.iter().map(|p| p.total_cost).collect();
        assert_eq!(costs, vec![2, 3]);
        assert!(!set.truncated);
    }

    #[test]
    fn test_max_hops() {
        let graph = diamond();
        let set = find_paths(&graph, "A", "D", &SearchOptions::default().with_max_hops(2)).unwrap();
        let costs: Vec<Cost> = set.paths.iter().map(|p| p.total_cost).collect();
        assert_eq!(costs, vec![2, 6]);
    }

    #[test]
    fn test_budget_exhaustion_flags_truncated() {
        let graph = diamond();
        let set = find_paths(&graph, "A", "D", &SearchOptions::default().with_budget(2)).unwrap();
        assert!(set.truncated);
        assert!(set.paths.len() <= 1);
    }

    #[test]
    fn test_same_node_is_trivial() {
        let graph = diamond();
        let set = find_paths(&graph, "C", "C", &SearchOptions::default()).unwrap();
        assert_eq!(set.paths, vec![Path::trivial("C")]);
    }

    #[test]
    fn test_unreachable_is_empty() {
        let nodes = vec![Node::new("A", ""), Node::new("B", "")];
        let graph = DirectedGraph::build(&nodes, &[]).unwrap();
        let set = find_paths(&graph, "A", "B", &SearchOptions::default()).unwrap();
        assert!(set.is_empty());
        assert!(!set.truncated);
    }

    #[test]
    fn test_respects_direction_costs() {
        let nodes = vec![Node::new("A", ""), Node::new("B", "")];
        let graph = DirectedGraph::build(&nodes, &[Link::new(0, "A", "B", 10, 500)]).unwrap();
        let back = find_paths(&graph, "B", "A", &SearchOptions::default()).unwrap();
        assert_eq!(back.paths[0].total_cost, 500);
        assert_eq!(back.paths[0].hops[0].direction, Direction::Reverse);
    }
}
