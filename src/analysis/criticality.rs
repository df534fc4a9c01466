use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::algorithms::{Path, PathCache};
use crate::error::{AnalysisError, Result};
use crate::network::DirectedGraph;
use crate::NodeId;

/// Weights of the three shares that make up a transit score. They must sum
/// to 100 so the score stays within [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalityWeights {
    pub usage_weight: f64,
    pub coverage_weight: f64,
    pub node_weight: f64,
}

impl Default for CriticalityWeights {
    fn default() -> Self {
        Self {
            usage_weight: 70.0,
            coverage_weight: 20.0,
            node_weight: 10.0,
        }
    }
}

impl CriticalityWeights {
    pub fn validate(&self) -> Result<()> {
        let weights = [self.usage_weight, self.coverage_weight, self.node_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalysisError::InvalidConfig(
                "criticality weights must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = weights.iter().sum();
        if (total - 100.0).abs() > 1e-6 {
            return Err(AnalysisError::InvalidConfig(format!(
                "criticality weights must sum to 100, got {total}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupPair {
    pub source: String,
    pub destination: String,
}

/// How much a group carries traffic between other groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitScore {
    pub group: String,
    /// Paths with at least one intermediate node in this group.
    pub path_count: usize,
    pub served_pairs: Vec<GroupPair>,
    pub transit_nodes: Vec<NodeId>,
    pub usage_share: f64,
    pub coverage_share: f64,
    pub node_share: f64,
    pub score: f64,
}

#[derive(Default)]
struct TransitTally {
    path_count: usize,
    served: BTreeSet<GroupPair>,
    nodes: BTreeSet<NodeId>,
}

/// Scores transit groups over an already computed set of paths.
///
/// An intermediate node is transit for a path when its group differs from
/// both the source's and the destination's group. Groups that never carry
/// transit are left out.
pub fn score_transit<'a>(
    paths: impl IntoIterator<Item = &'a Path>,
    graph: &DirectedGraph,
    weights: &CriticalityWeights,
) -> Vec<TransitScore> {
    let mut tallies: BTreeMap<String, TransitTally> = BTreeMap::new();
    let mut all_pairs: HashSet<GroupPair> = HashSet::new();
    let mut all_nodes: HashSet<&str> = HashSet::new();
    let mut considered = 0usize;

    for path in paths {
        if path.nodes.len() < 2 {
            continue;
        }
        let (Some(src_group), Some(dst_group)) = (
            path.source().and_then(|id| graph.group_of(id)),
            path.destination().and_then(|id| graph.group_of(id)),
        ) else {
            continue;
        };
        considered += 1;
        let pair = GroupPair {
            source: src_group.to_string(),
            destination: dst_group.to_string(),
        };

        let mut groups_on_path: BTreeSet<&str> = BTreeSet::new();
        for node in path.intermediates() {
            let Some(group) = graph.group_of(node) else {
                continue;
            };
            if group == src_group || group == dst_group {
                continue;
            }
            groups_on_path.insert(group);
            all_nodes.insert(node);
            tallies
                .entry(group.to_string())
                .or_default()
                .nodes
                .insert(node.clone());
        }

        for group in groups_on_path {
            let tally = tallies.entry(group.to_string()).or_default();
            tally.path_count += 1;
            tally.served.insert(pair.clone());
        }
        all_pairs.insert(pair);
    }

    debug!(
        "Transit scoring: {} paths, {} transit groups",
        considered,
        tallies.len()
    );

    let mut scores: Vec<TransitScore> = tallies
        .into_iter()
        .map(|(group, tally)| {
            let usage_share = ratio(tally.path_count, considered);
            let coverage_share = ratio(tally.served.len(), all_pairs.len());
            let node_share = ratio(tally.nodes.len(), all_nodes.len());
            let raw = weights.usage_weight * usage_share
                + weights.coverage_weight * coverage_share
                + weights.node_weight * node_share;
            TransitScore {
                group,
                path_count: tally.path_count,
                served_pairs: tally.served.into_iter().collect(),
                transit_nodes: tally.nodes.into_iter().collect(),
                usage_share,
                coverage_share,
                node_share,
                score: round2(raw.clamp(0.0, 100.0)),
            }
        })
        .collect();

    scores.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.group.cmp(&b.group)));
    scores
}

/// Transit scores over the best path of every ordered node pair.
pub fn score_all_pairs(cache: &mut PathCache<'_>, weights: &CriticalityWeights) -> Vec<TransitScore> {
    let graph = cache.graph();
    let mut paths = Vec::new();
    for source in 0..graph.node_count() {
        for target in 0..graph.node_count() {
            if source == target {
                continue;
            }
            if let Some(path) = cache.best_path(source, target) {
                paths.push(path.clone());
            }
        }
    }
    score_transit(&paths, graph, weights)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::shortest_path;
    use crate::network::{Link, Node};

    // FR(par) -- BE(bru) -- DE(ber), plus NL(ams) hanging off BE
    fn graph() -> DirectedGraph {
        let nodes = vec![
            Node::new("par", "FR"),
            Node::new("bru", "BE"),
            Node::new("ber", "DE"),
            Node::new("ams", "NL"),
        ];
        let links = vec![
            Link::new(0, "par", "bru", 10, 10),
            Link::new(1, "bru", "ber", 10, 10),
            Link::new(2, "bru", "ams", 10, 10),
        ];
        DirectedGraph::build(&nodes, &links).unwrap()
    }

    fn path(graph: &DirectedGraph, from: &str, to: &str) -> Path {
        shortest_path(graph, from, to).unwrap().unwrap()
    }

    #[test]
    fn test_transit_group_scored() {
        let graph = graph();
        let paths = vec![
            path(&graph, "par", "ber"),
            path(&graph, "ber", "par"),
            path(&graph, "par", "bru"),
            path(&graph, "ams", "par"),
        ];
        let scores = score_transit(&paths, &graph, &CriticalityWeights::default());

        assert_eq!(scores.len(), 1);
        let be = &scores[0];
        assert_eq!(be.group, "BE");
        assert_eq!(be.path_count, 3);
        assert_eq!(be.transit_nodes, vec!["bru".to_string()]);
        assert_eq!(be.served_pairs.len(), 3);
        // usage 3/4, coverage 3/4, nodes 1/1
        assert_eq!(be.score, 70.0 * 0.75 + 20.0 * 0.75 + 10.0);
    }

    #[test]
    fn test_same_group_intermediate_is_not_transit() {
        let nodes = vec![
            Node::new("par", "FR"),
            Node::new("lyo", "FR"),
            Node::new("ber", "DE"),
        ];
        let links = vec![Link::new(0, "par", "lyo", 1, 1), Link::new(1, "lyo", "ber", 1, 1)];
        let graph = DirectedGraph::build(&nodes, &links).unwrap();
        let paths = vec![path(&graph, "par", "ber")];
        assert!(score_transit(&paths, &graph, &CriticalityWeights::default()).is_empty());
    }

    #[test]
    fn test_all_pairs_scores_within_bounds() {
        let graph = graph();
        let mut cache = PathCache::new(&graph);
        let scores = score_all_pairs(&mut cache, &CriticalityWeights::default());
        assert_eq!(scores.len(), 1);
        assert!(scores.iter().all(|s| (0.0..=100.0).contains(&s.score)));
        assert_eq!(cache.tree_count(), graph.node_count());
    }

    #[test]
    fn test_weights_validation() {
        assert!(CriticalityWeights::default().validate().is_ok());
        let bad = CriticalityWeights {
            usage_weight: 80.0,
            coverage_weight: 20.0,
            node_weight: 10.0,
        };
        assert!(matches!(bad.validate(), Err(AnalysisError::InvalidConfig(_))));
        let negative = CriticalityWeights {
            usage_weight: 120.0,
            coverage_weight: -20.0,
            node_weight: 0.0,
        };
        assert!(negative.validate().is_err());
    }
}
