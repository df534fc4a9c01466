use std::collections::HashMap;

use log::debug;

use crate::algorithms::dijkstra::{Distance, ShortestPathTree};
use crate::algorithms::paths::{enumerate, Path, PathSet, SearchOptions};
use crate::network::{DirectedGraph, NodeIndex};

/// Memoizes path computations over one graph for the length of one request.
///
/// Matrix, impact and criticality passes all read through the same cache, so
/// each source runs Dijkstra at most once and each pair is enumerated at most
/// once. Drop it when the request is done.
pub struct PathCache<'g> {
    graph: &'g DirectedGraph,
    options: SearchOptions,
    trees: HashMap<NodeIndex, ShortestPathTree>,
    best: HashMap<(NodeIndex, NodeIndex), Option<Path>>,
    alternates: HashMap<(NodeIndex, NodeIndex), PathSet>,
}

impl<'g> PathCache<'g> {
    pub fn new(graph: &'g DirectedGraph) -> Self {
        Self::with_options(graph, SearchOptions::default())
    }

    pub fn with_options(graph: &'g DirectedGraph, options: SearchOptions) -> Self {
        Self {
            graph,
            options,
            trees: HashMap::new(),
            best: HashMap::new(),
            alternates: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &'g DirectedGraph {
        self.graph
    }

    pub fn tree(&mut self, source: NodeIndex) -> &ShortestPathTree {
        let graph = self.graph;
        self.trees.entry(source).or_insert_with(|| {
            debug!(
                "Computing shortest-path tree from {}",
                graph.node_ids().get(source).map_or("<out of range>", String::as_str)
            );
            ShortestPathTree::compute(graph, source)
        })
    }

    pub fn distance(&mut self, source: NodeIndex, target: NodeIndex) -> Distance {
        self.tree(source).distance(target)
    }

    pub fn best_path(&mut self, source: NodeIndex, target: NodeIndex) -> Option<&Path> {
        if !self.best.contains_key(&(source, target)) {
            let graph = self.graph;
            let path = self.tree(source).path_to(graph, target);
            self.best.insert((source, target), path);
        }
        self.best.get(&(source, target)).and_then(Option::as_ref)
    }

    pub fn alternates(&mut self, source: NodeIndex, target: NodeIndex) -> &PathSet {
        let graph = self.graph;
        let options = self.options;
        self.alternates
            .entry((source, target))
            .or_insert_with(|| enumerate(graph, source, target, &options))
    }

    /// Number of Dijkstra traversals run so far.
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Link, Node};

    fn graph() -> DirectedGraph {
        let nodes = ["A", "B", "C"].map(|id| Node::new(id, ""));
        let links = vec![Link::new(0, "A", "B", 100, 500), Link::new(1, "B", "C", 50, 50)];
        DirectedGraph::build(&nodes, &links).unwrap()
    }

    #[test]
    fn test_one_tree_per_source() {
        let graph = graph();
        let mut cache = PathCache::new(&graph);

        for target in 0..graph.node_count() {
            cache.distance(0, target);
            cache.best_path(0, target);
        }
        assert_eq!(cache.tree_count(), 1);

        cache.distance(2, 0);
        assert_eq!(cache.tree_count(), 2);
    }

    #[test]
    fn test_cached_results_match_direct_queries() {
        let graph = graph();
        let mut cache = PathCache::new(&graph);

        assert_eq!(cache.distance(0, 2), Distance::Reachable(150));
        assert_eq!(cache.distance(2, 0), Distance::Reachable(550));
        assert_eq!(cache.best_path(0, 0).map(|p| p.total_cost), Some(0));

        let set = cache.alternates(0, 2).clone();
        assert_eq!(set.best().map(|p| p.total_cost), Some(150));
        assert_eq!(cache.best_path(0, 2).cloned(), set.best().cloned());
    }

    #[test]
    fn test_alternates_follow_search_options() {
        let nodes = ["A", "B", "C"].map(|id| Node::new(id, ""));
        let links = vec![
            Link::new(0, "A", "B", 1, 1),
            Link::new(1, "B", "C", 1, 1),
            Link::new(2, "A", "C", 5, 5),
        ];
        let graph = DirectedGraph::build(&nodes, &links).unwrap();

        let mut wide = PathCache::new(&graph);
        assert_eq!(wide.alternates(0, 2).paths.len(), 2);

        let mut narrow = PathCache::with_options(&graph, SearchOptions::default().with_limit(1));
        let set = narrow.alternates(0, 2);
        assert_eq!(set.paths.len(), 1);
        assert_eq!(set.best().map(|p| p.total_cost), Some(2));

        let mut direct_only = PathCache::with_options(&graph, SearchOptions::default().with_max_hops(1));
        assert_eq!(direct_only.alternates(0, 2).best().map(|p| p.total_cost), Some(5));
    }

    #[test]
    fn test_out_of_range_indices_yield_nothing() {
        let graph = graph();
        let mut cache = PathCache::new(&graph);
        assert_eq!(cache.distance(0, 42), Distance::Unreachable);
        assert!(cache.best_path(0, 42).is_none());
        assert!(cache.alternates(42, 0).is_empty());
    }
}
