pub mod graph;
pub mod overrides;
pub mod topology;

pub use graph::{DirectedGraph, Direction, EdgeView, NodeIndex};
pub use overrides::{LinkEdit, OverrideSet};
pub use topology::{Link, LinkRecord, LinkStatus, Node, Snapshot, TopologyDocument};
