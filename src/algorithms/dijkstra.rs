use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::algorithms::{resolve, Hop, Path};
use crate::error::Result;
use crate::network::graph::Edge;
use crate::network::{DirectedGraph, NodeIndex};
use crate::Cost;

/// Outcome of a shortest-cost query. Having no route is a normal answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "cost")]
pub enum Distance {
    Reachable(Cost),
    Unreachable,
}

impl Distance {
    pub fn cost(self) -> Option<Cost> {
        match self {
            Distance::Reachable(cost) => Some(cost),
            Distance::Unreachable => None,
        }
    }

    pub fn is_reachable(self) -> bool {
        matches!(self, Distance::Reachable(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct State {
    cost: Cost,
    node: NodeIndex,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; equal costs pop in node order
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-source Dijkstra result, answering any target from one traversal.
///
/// Relaxation only replaces a predecessor on a strictly lower cost, so among
/// equal-cost routes the one discovered first is kept.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    source: NodeIndex,
    distances: Vec<Option<Cost>>,
    previous: Vec<Option<(NodeIndex, Edge)>>,
}

impl ShortestPathTree {
    pub fn compute(graph: &DirectedGraph, source: NodeIndex) -> Self {
        run(graph, source, None)
    }

    pub fn source(&self) -> NodeIndex {
        self.source
    }

    /// Out-of-range indices are reported as unreachable.
    pub fn distance(&self, target: NodeIndex) -> Distance {
        match self.distances.get(target).copied().flatten() {
            Some(cost) => Distance::Reachable(cost),
            None => Distance::Unreachable,
        }
    }

    pub fn path_to(&self, graph: &DirectedGraph, target: NodeIndex) -> Option<Path> {
        let total_cost = self.distances.get(target).copied().flatten()?;

        let mut nodes = vec![graph.node_id(target).to_string()];
        let mut hops = Vec::new();
        let mut current = target;
        while let Some((prev, edge)) = self.previous[current] {
            nodes.push(graph.node_id(prev).to_string());
            hops.push(Hop::from(&edge));
            current = prev;
        }
        nodes.reverse();
        hops.reverse();

        Some(Path {
            nodes,
            hops,
            total_cost,
        })
    }
}

fn run(graph: &DirectedGraph, source: NodeIndex, stop_at: Option<NodeIndex>) -> ShortestPathTree {
    let n = graph.node_count();
    let mut distances: Vec<Option<Cost>> = vec![None; n];
    let mut previous: Vec<Option<(NodeIndex, Edge)>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut heap = BinaryHeap::new();

    if source >= n {
        return ShortestPathTree {
            source,
            distances,
            previous,
        };
    }
    distances[source] = Some(0);
    heap.push(State { cost: 0, node: source });

    while let Some(State { cost, node }) = heap.pop() {
        if visited[node] {
            continue;
        }
        visited[node] = true;

        if stop_at == Some(node) {
            break;
        }

        for edge in graph.edges(node) {
            if visited[edge.target] {
                continue;
            }
            let new_cost = cost + Cost::from(edge.weight);
            if distances[edge.target].is_none_or(|known| new_cost < known) {
                distances[edge.target] = Some(new_cost);
                previous[edge.target] = Some((node, *edge));
                heap.push(State {
                    cost: new_cost,
                    node: edge.target,
                });
            }
        }
    }

    ShortestPathTree {
        source,
        distances,
        previous,
    }
}

/// Minimal cost from `source` to `target`, stopping as soon as the target is
/// settled.
pub fn shortest_cost(graph: &DirectedGraph, source: &str, target: &str) -> Result<Distance> {
    let s = resolve(graph, source)?;
    let t = resolve(graph, target)?;
    if s == t {
        return Ok(Distance::Reachable(0));
    }
    Ok(run(graph, s, Some(t)).distance(t))
}

/// The single best path under the tie-break rule of [`ShortestPathTree`].
pub fn shortest_path(graph: &DirectedGraph, source: &str, target: &str) -> Result<Option<Path>> {
    let s = resolve(graph, source)?;
    let t = resolve(graph, target)?;
    if s == t {
        return Ok(Some(Path::trivial(source)));
    }
    Ok(run(graph, s, Some(t)).path_to(graph, t))
}
