use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::network::{Link, Node, Snapshot};
use crate::NodeId;

pub type NodeIndex = usize;

/// Which way a link is traversed: forward is a -> b, reverse is b -> a.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub target: NodeIndex,
    pub weight: u32,
    pub stable_index: usize,
    pub direction: Direction,
}

/// Outgoing edge as seen by callers, with the target resolved to its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeView<'a> {
    pub target: &'a str,
    pub weight: u32,
    pub stable_index: usize,
    pub direction: Direction,
}

/// Directed weighted graph derived from a snapshot.
///
/// Node indices follow the snapshot's node order and adjacency lists follow
/// its link order, so every traversal over the graph is reproducible.
#[derive(Debug, Clone)]
pub struct DirectedGraph {
    ids: Vec<NodeId>,
    groups: Vec<String>,
    index: HashMap<NodeId, NodeIndex>,
    adjacency: Vec<Vec<Edge>>,
    edge_count: usize,
}

impl DirectedGraph {
    /// Validates the inputs and builds the graph in one step.
    pub fn build(nodes: &[Node], links: &[Link]) -> Result<Self, TopologyError> {
        let snapshot = Snapshot::new(nodes.to_vec(), links.to_vec())?;
        Ok(Self::from_snapshot(&snapshot))
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let ids: Vec<NodeId> = snapshot.nodes().iter().map(|n| n.id.clone()).collect();
        let groups = snapshot.nodes().iter().map(|n| n.group.clone()).collect();
        let index: HashMap<NodeId, NodeIndex> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut adjacency = vec![Vec::new(); ids.len()];
        let mut edge_count = 0;

        // Down links contribute nothing in either direction.
        for link in snapshot.links().iter().filter(|l| l.is_up()) {
            for direction in [Direction::Forward, Direction::Reverse] {
                let (from, to) = link.endpoints(direction);
                adjacency[index[from]].push(Edge {
                    target: index[to],
                    weight: link.cost(direction),
                    stable_index: link.stable_index,
                    direction,
                });
                edge_count += 1;
            }
        }

        debug!("Graph built: {} nodes, {} directed edges", ids.len(), edge_count);

        Self {
            ids,
            groups,
            index,
            adjacency,
            edge_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node_id(&self, index: NodeIndex) -> &str {
        &self.ids[index]
    }

    pub fn group(&self, index: NodeIndex) -> &str {
        &self.groups[index]
    }

    pub fn group_of(&self, id: &str) -> Option<&str> {
        self.index_of(id).map(|i| self.group(i))
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub(crate) fn edges(&self, index: NodeIndex) -> &[Edge] {
        &self.adjacency[index]
    }

    /// Outgoing edges of `id`; empty for unknown nodes.
    pub fn outgoing(&self, id: &str) -> Vec<EdgeView<'_>> {
        let Some(index) = self.index_of(id) else {
            return Vec::new();
        };
        self.adjacency[index]
            .iter()
            .map(|edge| EdgeView {
                target: &self.ids[edge.target],
                weight: edge.weight,
                stable_index: edge.stable_index,
                direction: edge.direction,
            })
            .collect()
    }
}
