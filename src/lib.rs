//! Routing and what-if analysis over OSPF-style link-state topologies.
//!
//! A topology is loaded into an immutable [`Snapshot`], turned into a
//! [`DirectedGraph`] (each up link yields one edge per direction with its own
//! cost) and then queried: single-pair shortest cost, ranked alternate paths,
//! cost matrices, before/after impact and transit criticality.

pub mod algorithms;
pub mod analysis;
pub mod config;
pub mod error;
pub mod network;

pub type NodeId = String;
pub type Cost = u64;

pub use algorithms::{
    find_paths, shortest_cost, shortest_path, Distance, Hop, Path, PathCache, PathSet,
    SearchOptions, ShortestPathTree,
};
pub use analysis::{
    analyze_impact, analyze_impact_with, build_matrix, score_transit, CostMatrix,
    CriticalityWeights, Grouping, ImpactReport, MatrixCell, MatrixOptions, PairSelection,
    TransitScore,
};
pub use config::EngineConfig;
pub use error::{AnalysisError, TopologyError};
pub use network::{
    DirectedGraph, Direction, LinkEdit, Link, LinkStatus, Node, OverrideSet, Snapshot,
    TopologyDocument,
};
