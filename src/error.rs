use thiserror::Error;

use crate::network::Direction;
use crate::NodeId;

/// Rejections raised while validating topology input, before any algorithm runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("node id must not be empty")]
    EmptyNodeId,

    #[error("node '{0}' is declared more than once")]
    DuplicateNode(NodeId),

    #[error("link #{stable_index} references unknown node '{node}'")]
    DanglingEndpoint { stable_index: usize, node: NodeId },

    #[error("link #{stable_index} has invalid {direction} cost {value} (must be a positive 32-bit integer)")]
    InvalidCost {
        stable_index: usize,
        direction: Direction,
        value: i64,
    },

    #[error("link #{stable_index} connects node '{node}' to itself")]
    SelfLoop { stable_index: usize, node: NodeId },

    #[error("stable index {0} is used by more than one link")]
    DuplicateStableIndex(usize),

    #[error("no link with stable index {0}")]
    UnknownLink(usize),
}

/// Errors surfaced by the analysis entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("unknown node '{0}'")]
    UnknownNode(NodeId),

    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    #[error("before and after snapshots disagree on node '{0}'")]
    SnapshotMismatch(NodeId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
