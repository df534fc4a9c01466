use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::network::Direction;
use crate::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Country/region label. Only used for aggregation, never for traversal.
    #[serde(default)]
    pub group: String,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Up,
    Down,
}

/// An undirected physical link with an independent cost per direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub endpoint_a: NodeId,
    pub endpoint_b: NodeId,
    /// Cost of travelling a -> b.
    pub forward_cost: u32,
    /// Cost of travelling b -> a.
    pub reverse_cost: u32,
    pub status: LinkStatus,
    pub stable_index: usize,
}

impl Link {
    pub fn new(
        stable_index: usize,
        endpoint_a: impl Into<NodeId>,
        endpoint_b: impl Into<NodeId>,
        forward_cost: u32,
        reverse_cost: u32,
    ) -> Self {
        Self {
            endpoint_a: endpoint_a.into(),
            endpoint_b: endpoint_b.into(),
            forward_cost,
            reverse_cost,
            status: LinkStatus::Up,
            stable_index,
        }
    }

    pub fn with_status(mut self, status: LinkStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == LinkStatus::Up
    }

    pub fn cost(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Forward => self.forward_cost,
            Direction::Reverse => self.reverse_cost,
        }
    }

    /// (from, to) for the given traversal direction.
    pub fn endpoints(&self, direction: Direction) -> (&str, &str) {
        match direction {
            Direction::Forward => (self.endpoint_a.as_str(), self.endpoint_b.as_str()),
            Direction::Reverse => (self.endpoint_b.as_str(), self.endpoint_a.as_str()),
        }
    }

    pub(crate) fn same_state(&self, other: &Link) -> bool {
        self.forward_cost == other.forward_cost
            && self.reverse_cost == other.reverse_cost
            && self.status == other.status
    }
}

/// Link as it appears in a topology file. Costs are signed so that negative
/// input is reported against the offending link instead of failing the parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    pub endpoint_a: NodeId,
    pub endpoint_b: NodeId,
    pub forward_cost: i64,
    pub reverse_cost: i64,
    #[serde(default)]
    pub status: LinkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_index: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyDocument {
    pub nodes: Vec<Node>,
    pub links: Vec<LinkRecord>,
}

impl TopologyDocument {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn into_snapshot(self) -> Result<Snapshot, TopologyError> {
        let mut links = Vec::with_capacity(self.links.len());
        for (position, record) in self.links.into_iter().enumerate() {
            let stable_index = record.stable_index.unwrap_or(position);
            let forward_cost = checked_cost(record.forward_cost, stable_index, Direction::Forward)?;
            let reverse_cost = checked_cost(record.reverse_cost, stable_index, Direction::Reverse)?;
            links.push(Link {
                endpoint_a: record.endpoint_a,
                endpoint_b: record.endpoint_b,
                forward_cost,
                reverse_cost,
                status: record.status,
                stable_index,
            });
        }
        Snapshot::new(self.nodes, links)
    }
}

pub(crate) fn checked_cost(value: i64, stable_index: usize, direction: Direction) -> Result<u32, TopologyError> {
    match u32::try_from(value) {
        Ok(cost) if cost > 0 => Ok(cost),
        _ => Err(TopologyError::InvalidCost {
            stable_index,
            direction,
            value,
        }),
    }
}

/// Immutable (nodes, links) pair describing the topology at one instant.
/// Edits never mutate a snapshot; they produce a new one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_index: HashMap<NodeId, usize>,
    link_index: HashMap<usize, usize>,
}

impl Snapshot {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Result<Self, TopologyError> {
        let mut node_index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if node.id.is_empty() {
                return Err(TopologyError::EmptyNodeId);
            }
            if node_index.insert(node.id.clone(), position).is_some() {
                return Err(TopologyError::DuplicateNode(node.id.clone()));
            }
        }

        let mut link_index = HashMap::with_capacity(links.len());
        for (position, link) in links.iter().enumerate() {
            for endpoint in [&link.endpoint_a, &link.endpoint_b] {
                if !node_index.contains_key(endpoint) {
                    return Err(TopologyError::DanglingEndpoint {
                        stable_index: link.stable_index,
                        node: endpoint.clone(),
                    });
                }
            }
            if link.endpoint_a == link.endpoint_b {
                return Err(TopologyError::SelfLoop {
                    stable_index: link.stable_index,
                    node: link.endpoint_a.clone(),
                });
            }
            for direction in [Direction::Forward, Direction::Reverse] {
                if link.cost(direction) == 0 {
                    return Err(TopologyError::InvalidCost {
                        stable_index: link.stable_index,
                        direction,
                        value: 0,
                    });
                }
            }
            if link_index.insert(link.stable_index, position).is_some() {
                return Err(TopologyError::DuplicateStableIndex(link.stable_index));
            }
        }

        Ok(Self {
            nodes,
            links,
            node_index,
            link_index,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn link(&self, stable_index: usize) -> Option<&Link> {
        self.link_index.get(&stable_index).map(|&i| &self.links[i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Distinct groups in first-seen order.
    pub fn groups(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .filter(|node| seen.insert(node.group.as_str()))
            .map(|node| node.group.clone())
            .collect()
    }

    pub fn to_document(&self) -> TopologyDocument {
        TopologyDocument {
            nodes: self.nodes.clone(),
            links: self
                .links
                .iter()
                .map(|link| LinkRecord {
                    endpoint_a: link.endpoint_a.clone(),
                    endpoint_b: link.endpoint_b.clone(),
                    forward_cost: i64::from(link.forward_cost),
                    reverse_cost: i64::from(link.reverse_cost),
                    status: link.status,
                    stable_index: Some(link.stable_index),
                })
                .collect(),
        }
    }

    pub(crate) fn with_links(&self, links: Vec<Link>) -> Result<Self, TopologyError> {
        Self::new(self.nodes.clone(), links)
    }
}
