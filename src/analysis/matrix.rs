use std::collections::{BTreeMap, HashSet};

use log::{info, warn};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::algorithms::{Path, PathCache};
use crate::network::{DirectedGraph, NodeIndex};
use crate::Cost;

/// How rows and columns of a cost matrix are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// One row per node; the diagonal is omitted.
    Node,
    /// One row per node group. Same-group cells aggregate distinct node pairs only.
    #[default]
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixOptions {
    /// Ceiling on ordered node pairs evaluated; further pairs are skipped and
    /// the matrix is flagged as truncated.
    pub max_pairs: usize,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self { max_pairs: 250_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixCell {
    /// Ordered node pairs spanning the two labels.
    pub pairs: usize,
    pub reachable_pairs: usize,
    pub min_cost: Option<Cost>,
    pub max_cost: Option<Cost>,
    pub mean_cost: Option<f64>,
    /// Path of the cheapest pair.
    pub best_path: Option<Path>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostMatrix {
    pub grouping: Grouping,
    pub labels: Vec<String>,
    #[serde(serialize_with = "cells_as_entries")]
    cells: BTreeMap<(String, String), MatrixCell>,
    pub pairs_evaluated: usize,
    pub truncated: bool,
}

impl CostMatrix {
    pub fn get(&self, row: &str, col: &str) -> Option<&MatrixCell> {
        self.cells.get(&(row.to_string(), col.to_string()))
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str, &MatrixCell)> {
        self.cells
            .iter()
            .map(|((row, col), cell)| (row.as_str(), col.as_str(), cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Serialize)]
struct CellEntry<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(flatten)]
    cell: &'a MatrixCell,
}

fn cells_as_entries<S: Serializer>(
    cells: &BTreeMap<(String, String), MatrixCell>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(cells.len()))?;
    for ((from, to), cell) in cells {
        seq.serialize_element(&CellEntry { from, to, cell })?;
    }
    seq.end()
}

#[derive(Default)]
struct CellAccumulator {
    pairs: usize,
    reachable: usize,
    min: Option<Cost>,
    max: Option<Cost>,
    sum: u128,
    best: Option<Path>,
}

impl CellAccumulator {
    fn finish(self) -> MatrixCell {
        let mean_cost = (self.reachable > 0).then(|| self.sum as f64 / self.reachable as f64);
        MatrixCell {
            pairs: self.pairs,
            reachable_pairs: self.reachable,
            min_cost: self.min,
            max_cost: self.max,
            mean_cost,
            best_path: self.best,
        }
    }
}

pub fn build_matrix(graph: &DirectedGraph, grouping: Grouping, options: &MatrixOptions) -> CostMatrix {
    let mut cache = PathCache::new(graph);
    build_matrix_with(&mut cache, grouping, options)
}

/// Folds one shortest-path lookup per ordered node pair into matrix cells.
/// Pairs are visited source by source, so each source is traversed once.
pub fn build_matrix_with(cache: &mut PathCache<'_>, grouping: Grouping, options: &MatrixOptions) -> CostMatrix {
    let graph = cache.graph();
    let label = |index: NodeIndex| match grouping {
        Grouping::Node => graph.node_id(index),
        Grouping::Group => graph.group(index),
    };

    let mut seen = HashSet::new();
    let labels: Vec<String> = (0..graph.node_count())
        .map(&label)
        .filter(|l| seen.insert(*l))
        .map(str::to_string)
        .collect();

    let mut accumulators: BTreeMap<(String, String), CellAccumulator> = BTreeMap::new();
    let mut evaluated = 0usize;
    let mut truncated = false;

    'sources: for source in 0..graph.node_count() {
        for target in 0..graph.node_count() {
            if source == target {
                continue;
            }
            if evaluated >= options.max_pairs {
                truncated = true;
                break 'sources;
            }
            evaluated += 1;

            let key = (label(source).to_string(), label(target).to_string());
            let distance = cache.distance(source, target);
            let acc = accumulators.entry(key).or_default();
            acc.pairs += 1;

            let Some(cost) = distance.cost() else {
                continue;
            };
            acc.reachable += 1;
            acc.sum += u128::from(cost);
            acc.max = Some(acc.max.map_or(cost, |m| m.max(cost)));
            if acc.min.is_none_or(|m| cost < m) {
                acc.min = Some(cost);
                acc.best = cache.best_path(source, target).cloned();
            }
        }
    }

    if truncated {
        warn!(
            "Cost matrix stopped at the {} pair ceiling; cells are partial",
            options.max_pairs
        );
    }
    info!(
        "Cost matrix: {} labels, {} cells, {} pairs evaluated",
        labels.len(),
        accumulators.len(),
        evaluated
    );

    CostMatrix {
        grouping,
        labels,
        cells: accumulators
            .into_iter()
            .map(|(key, acc)| (key, acc.finish()))
            .collect(),
        pairs_evaluated: evaluated,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Link, LinkStatus, Node};

    fn graph() -> DirectedGraph {
        let nodes = vec![
            Node::new("par", "FR"),
            Node::new("lyo", "FR"),
            Node::new("ber", "DE"),
            Node::new("ham", "DE"),
        ];
        let links = vec![
            Link::new(0, "par", "lyo", 10, 10),
            Link::new(1, "par", "ber", 100, 300),
            Link::new(2, "ber", "ham", 20, 20),
            Link::new(3, "lyo", "ham", 5, 5).with_status(LinkStatus::Down),
        ];
        DirectedGraph::build(&nodes, &links).unwrap()
    }

    #[test]
    fn test_group_matrix_aggregates() {
        let graph = graph();
        let matrix = build_matrix(&graph, Grouping::Group, &MatrixOptions::default());

        assert_eq!(matrix.labels, vec!["FR", "DE"]);
        assert!(!matrix.truncated);
        assert_eq!(matrix.pairs_evaluated, 12);

        // par->ber 100, par->ham 120, lyo->ber 110, lyo->ham 130
        let fr_de = matrix.get("FR", "DE").unwrap();
        assert_eq!(fr_de.pairs, 4);
        assert_eq!(fr_de.reachable_pairs, 4);
        assert_eq!(fr_de.min_cost, Some(100));
        assert_eq!(fr_de.max_cost, Some(130));
        assert_eq!(fr_de.mean_cost, Some(115.0));
        assert_eq!(fr_de.best_path.as_ref().unwrap().nodes, vec!["par", "ber"]);

        // asymmetric in the other direction
        let de_fr = matrix.get("DE", "FR").unwrap();
        assert_eq!(de_fr.min_cost, Some(300));
    }

    #[test]
    fn test_same_group_skips_self_pairs() {
        let graph = graph();
        let matrix = build_matrix(&graph, Grouping::Group, &MatrixOptions::default());
        let fr = matrix.get("FR", "FR").unwrap();
        assert_eq!(fr.pairs, 2);
        assert_eq!(fr.min_cost, Some(10));
    }

    #[test]
    fn test_node_matrix_omits_diagonal() {
        let graph = graph();
        let matrix = build_matrix(&graph, Grouping::Node, &MatrixOptions::default());
        assert_eq!(matrix.len(), 12);
        assert!(matrix.get("par", "par").is_none());
        assert_eq!(matrix.get("ham", "lyo").unwrap().min_cost, Some(330));
    }

    #[test]
    fn test_unreachable_pairs_are_counted() {
        let nodes = vec![Node::new("a", "X"), Node::new("b", "Y")];
        let graph = DirectedGraph::build(&nodes, &[]).unwrap();
        let matrix = build_matrix(&graph, Grouping::Group, &MatrixOptions::default());
        let cell = matrix.get("X", "Y").unwrap();
        assert_eq!(cell.pairs, 1);
        assert_eq!(cell.reachable_pairs, 0);
        assert_eq!(cell.min_cost, None);
        assert_eq!(cell.mean_cost, None);
    }

    #[test]
    fn test_pair_ceiling_truncates() {
        let graph = graph();
        let matrix = build_matrix(&graph, Grouping::Node, &MatrixOptions { max_pairs: 5 });
        assert!(matrix.truncated);
        assert_eq!(matrix.pairs_evaluated, 5);
        assert_eq!(matrix.len(), 5);
    }

    #[test]
    fn test_one_traversal_per_source() {
        let graph = graph();
        let mut cache = PathCache::new(&graph);
        build_matrix_with(&mut cache, Grouping::Node, &MatrixOptions::default());
        assert_eq!(cache.tree_count(), graph.node_count());
    }

    #[test]
    fn test_deterministic() {
        let graph = graph();
        let a = build_matrix(&graph, Grouping::Group, &MatrixOptions::default());
        let b = build_matrix(&graph, Grouping::Group, &MatrixOptions::default());
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }
}
