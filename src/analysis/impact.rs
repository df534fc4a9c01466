use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::algorithms::{resolve, Path, PathCache};
use crate::analysis::criticality::{score_transit, CriticalityWeights, TransitScore};
use crate::error::{AnalysisError, Result};
use crate::network::{DirectedGraph, Link, LinkStatus, NodeIndex, Snapshot};
use crate::{Cost, NodeId};

/// Which (source, target) pairs an impact run compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "pairs")]
pub enum PairSelection {
    Nodes(Vec<(NodeId, NodeId)>),
    Groups(Vec<(String, String)>),
    /// Every ordered pair of distinct nodes.
    AllNodes,
    /// Every ordered pair of distinct groups.
    AllGroups,
    /// `AllNodes` followed by `AllGroups`.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope")]
pub enum PairKey {
    Node { source: NodeId, target: NodeId },
    Group { source: String, target: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkState {
    pub forward_cost: u32,
    pub reverse_cost: u32,
    pub status: LinkStatus,
}

impl From<&Link> for LinkState {
    fn from(link: &Link) -> Self {
        Self {
            forward_cost: link.forward_cost,
            reverse_cost: link.reverse_cost,
            status: link.status,
        }
    }
}

/// A link whose cost or status differs between the two snapshots. A `None`
/// side means the link only exists in the other snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkChange {
    pub stable_index: usize,
    pub endpoint_a: NodeId,
    pub endpoint_b: NodeId,
    pub before: Option<LinkState>,
    pub after: Option<LinkState>,
    pub forward_delta: Option<i64>,
    pub reverse_delta: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairImpact {
    pub pair: PairKey,
    pub before_cost: Option<Cost>,
    pub after_cost: Option<Cost>,
    pub cost_delta: Option<i64>,
    pub before_path: Option<Path>,
    pub after_path: Option<Path>,
    pub cost_changed: bool,
    pub path_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    pub changed_links: Vec<LinkChange>,
    /// Endpoints of every changed link.
    pub local_impact: BTreeSet<NodeId>,
    /// Nodes that entered or left a best path.
    pub downstream_impact: BTreeSet<NodeId>,
    /// Affected pairs only, in selection order.
    pub pairs: Vec<PairImpact>,
    pub pairs_analyzed: usize,
    pub pairs_affected: usize,
    pub affected_percent: f64,
    pub transit_before: Vec<TransitScore>,
    pub transit_after: Vec<TransitScore>,
}

impl ImpactReport {
    pub fn is_unaffected(&self) -> bool {
        self.pairs_affected == 0 && self.local_impact.is_empty() && self.downstream_impact.is_empty()
    }
}

pub fn analyze_impact(before: &Snapshot, after: &Snapshot, selection: &PairSelection) -> Result<ImpactReport> {
    analyze_impact_with(before, after, selection, &CriticalityWeights::default())
}

/// Compares best paths for the selected pairs across two snapshots.
///
/// Each side gets its own [`PathCache`], shared by the pair diff and the
/// transit scoring, so no pair is routed twice per side.
pub fn analyze_impact_with(
    before: &Snapshot,
    after: &Snapshot,
    selection: &PairSelection,
    weights: &CriticalityWeights,
) -> Result<ImpactReport> {
    weights.validate()?;
    check_same_nodes(before, after)?;

    let before_graph = DirectedGraph::from_snapshot(before);
    // Pair routes are resolved against the before graph, so the after graph
    // must share its node order.
    let after_graph = if before.nodes() == after.nodes() {
        DirectedGraph::from_snapshot(after)
    } else {
        let aligned = Snapshot::new(before.nodes().to_vec(), after.links().to_vec())?;
        DirectedGraph::from_snapshot(&aligned)
    };
    let pairs = expand_selection(&before_graph, selection)?;

    let changed_links = diff_links(before, after);
    let local_impact: BTreeSet<NodeId> = changed_links
        .iter()
        .flat_map(|c| [c.endpoint_a.clone(), c.endpoint_b.clone()])
        .collect();

    let mut before_cache = PathCache::new(&before_graph);
    let mut after_cache = PathCache::new(&after_graph);
    let mut before_paths = Vec::with_capacity(pairs.len());
    let mut after_paths = Vec::with_capacity(pairs.len());
    let mut before_routed = HashSet::new();
    let mut after_routed = HashSet::new();
    let mut downstream_impact = BTreeSet::new();
    let mut affected = Vec::new();

    for (key, route) in &pairs {
        let old = route.best_path(&mut before_cache);
        let new = route.best_path(&mut after_cache);

        let old_nodes: BTreeSet<&NodeId> = old.iter().flat_map(|p| &p.nodes).collect();
        let new_nodes: BTreeSet<&NodeId> = new.iter().flat_map(|p| &p.nodes).collect();
        downstream_impact.extend(old_nodes.symmetric_difference(&new_nodes).map(|n| (*n).clone()));

        let before_cost = old.as_ref().map(|p| p.total_cost);
        let after_cost = new.as_ref().map(|p| p.total_cost);
        let cost_changed = before_cost != after_cost;
        let path_changed = old.as_ref().map(|p| &p.nodes) != new.as_ref().map(|p| &p.nodes);

        if cost_changed || path_changed {
            affected.push(PairImpact {
                pair: key.clone(),
                before_cost,
                after_cost,
                cost_delta: delta(before_cost, after_cost),
                before_path: old.clone(),
                after_path: new.clone(),
                cost_changed,
                path_changed,
            });
        }

        collect_route(&mut before_paths, &mut before_routed, old);
        collect_route(&mut after_paths, &mut after_routed, new);
    }

    let pairs_analyzed = pairs.len();
    let pairs_affected = affected.len();
    let affected_percent = if pairs_analyzed == 0 {
        0.0
    } else {
        pairs_affected as f64 * 100.0 / pairs_analyzed as f64
    };

    info!(
        "Impact: {} changed links, {}/{} pairs affected ({:.1}%)",
        changed_links.len(),
        pairs_affected,
        pairs_analyzed,
        affected_percent
    );
    debug!(
        "Impact traversals: {} before, {} after",
        before_cache.tree_count(),
        after_cache.tree_count()
    );

    Ok(ImpactReport {
        changed_links,
        local_impact,
        downstream_impact,
        pairs: affected,
        pairs_analyzed,
        pairs_affected,
        affected_percent,
        transit_before: score_transit(&before_paths, &before_graph, weights),
        transit_after: score_transit(&after_paths, &after_graph, weights),
    })
}

/// Keeps one path per routed (source, destination). A group pair resolves to
/// the best path of one of its node pairs, which `All` also selects.
fn collect_route(paths: &mut Vec<Path>, routed: &mut HashSet<(NodeId, NodeId)>, path: Option<Path>) {
    let Some(path) = path else {
        return;
    };
    if let (Some(source), Some(target)) = (path.source(), path.destination()) {
        if !routed.insert((source.to_string(), target.to_string())) {
            return;
        }
    }
    paths.push(path);
}

fn delta(before: Option<Cost>, after: Option<Cost>) -> Option<i64> {
    match (before, after) {
        (Some(b), Some(a)) => Some(a as i64 - b as i64),
        _ => None,
    }
}

fn check_same_nodes(before: &Snapshot, after: &Snapshot) -> Result<()> {
    for node in before.nodes() {
        match after.node(&node.id) {
            Some(other) if other.group == node.group => {}
            _ => return Err(AnalysisError::SnapshotMismatch(node.id.clone())),
        }
    }
    for node in after.nodes() {
        if !before.contains_node(&node.id) {
            return Err(AnalysisError::SnapshotMismatch(node.id.clone()));
        }
    }
    Ok(())
}

/// Correlates links by stable index, never by position.
fn diff_links(before: &Snapshot, after: &Snapshot) -> Vec<LinkChange> {
    let mut changes = Vec::new();

    for old in before.links() {
        match after.link(old.stable_index) {
            Some(new) if old.same_state(new) => {}
            Some(new) => changes.push(LinkChange {
                stable_index: old.stable_index,
                endpoint_a: old.endpoint_a.clone(),
                endpoint_b: old.endpoint_b.clone(),
                before: Some(LinkState::from(old)),
                after: Some(LinkState::from(new)),
                forward_delta: Some(i64::from(new.forward_cost) - i64::from(old.forward_cost)),
                reverse_delta: Some(i64::from(new.reverse_cost) - i64::from(old.reverse_cost)),
            }),
            None => changes.push(LinkChange {
                stable_index: old.stable_index,
                endpoint_a: old.endpoint_a.clone(),
                endpoint_b: old.endpoint_b.clone(),
                before: Some(LinkState::from(old)),
                after: None,
                forward_delta: None,
                reverse_delta: None,
            }),
        }
    }

    for new in after.links() {
        if before.link(new.stable_index).is_none() {
            changes.push(LinkChange {
                stable_index: new.stable_index,
                endpoint_a: new.endpoint_a.clone(),
                endpoint_b: new.endpoint_b.clone(),
                before: None,
                after: Some(LinkState::from(new)),
                forward_delta: None,
                reverse_delta: None,
            });
        }
    }

    changes.sort_by_key(|c| c.stable_index);
    changes
}

/// Resolved form of a pair: concrete node indices on both sides.
enum Route {
    Node(NodeIndex, NodeIndex),
    Group(Vec<NodeIndex>, Vec<NodeIndex>),
}

impl Route {
    /// Best path for the pair. For groups this is the cheapest path over all
    /// spanning node pairs, the first in node order on ties.
    fn best_path(&self, cache: &mut PathCache<'_>) -> Option<Path> {
        match self {
            Route::Node(s, t) => cache.best_path(*s, *t).cloned(),
            Route::Group(sources, targets) => {
                let mut best: Option<(Cost, NodeIndex, NodeIndex)> = None;
                for &s in sources {
                    for &t in targets {
                        if s == t {
                            continue;
                        }
                        if let Some(cost) = cache.distance(s, t).cost() {
                            if best.is_none_or(|(c, _, _)| cost < c) {
                                best = Some((cost, s, t));
                            }
                        }
                    }
                }
                best.and_then(|(_, s, t)| cache.best_path(s, t).cloned())
            }
        }
    }
}

fn expand_selection(graph: &DirectedGraph, selection: &PairSelection) -> Result<Vec<(PairKey, Route)>> {
    let mut members: Vec<(String, Vec<NodeIndex>)> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    for index in 0..graph.node_count() {
        let group = graph.group(index);
        let slot = *position.entry(group.to_string()).or_insert_with(|| {
            members.push((group.to_string(), Vec::new()));
            members.len() - 1
        });
        members[slot].1.push(index);
    }

    let group_route = |source: &str, target: &str| -> Result<(PairKey, Route)> {
        let lookup = |g: &str| {
            position
                .get(g)
                .map(|&slot| members[slot].1.clone())
                .ok_or_else(|| AnalysisError::UnknownGroup(g.to_string()))
        };
        Ok((
            PairKey::Group {
                source: source.to_string(),
                target: target.to_string(),
            },
            Route::Group(lookup(source)?, lookup(target)?),
        ))
    };

    let node_route = |s: NodeIndex, t: NodeIndex| {
        (
            PairKey::Node {
                source: graph.node_id(s).to_string(),
                target: graph.node_id(t).to_string(),
            },
            Route::Node(s, t),
        )
    };

    let all_nodes = || {
        let n = graph.node_count();
        (0..n)
            .flat_map(move |s| (0..n).filter(move |&t| t != s).map(move |t| (s, t)))
            .map(|(s, t)| node_route(s, t))
            .collect::<Vec<_>>()
    };

    let all_groups = || -> Result<Vec<(PairKey, Route)>> {
        let mut routes = Vec::new();
        for (a, _) in &members {
            for (b, _) in &members {
                if a != b {
                    routes.push(group_route(a.as_str(), b.as_str())?);
                }
            }
        }
        Ok(routes)
    };

    match selection {
        PairSelection::Nodes(pairs) => pairs
            .iter()
            .map(|(s, t)| -> Result<(PairKey, Route)> {
                Ok(node_route(resolve(graph, s)?, resolve(graph, t)?))
            })
            .collect(),
        PairSelection::Groups(pairs) => pairs
            .iter()
            .map(|(s, t)| group_route(s.as_str(), t.as_str()))
            .collect(),
        PairSelection::AllNodes => Ok(all_nodes()),
        PairSelection::AllGroups => all_groups(),
        PairSelection::All => {
            let mut routes = all_nodes();
            routes.extend(all_groups()?);
            Ok(routes)
        }
    }
}
