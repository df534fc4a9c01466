pub mod cache;
pub mod dijkstra;
pub mod paths;

pub use cache::PathCache;
pub use dijkstra::{shortest_cost, shortest_path, Distance, ShortestPathTree};
pub use paths::{find_paths, Hop, Path, PathSet, SearchOptions};

use crate::error::{AnalysisError, Result};
use crate::network::{DirectedGraph, NodeIndex};

pub(crate) fn resolve(graph: &DirectedGraph, id: &str) -> Result<NodeIndex> {
    graph
        .index_of(id)
        .ok_or_else(|| AnalysisError::UnknownNode(id.to_string()))
}
