//! Cycle detection: round-trip fund flows of 3 to 5 accounts.
//!
//! Candidate nodes are narrowed twice before any path search runs: nodes
//! with fewer than two transactions cannot lie on a cycle, and Tarjan's
//! SCC decomposition confines the depth-bounded DFS to components where a
//! cycle can actually close. Components above the size cap are skipped
//! outright to bound the worst case.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::graph::{NodeId, TransactionGraph};
use crate::EngineConfig;

/// One simple directed cycle, nodes in first-seen traversal order.
#[derive(Debug, Clone)]
pub struct CycleFinding {
    pub nodes: Vec<NodeId>,
    pub risk_score: u8,
}

/// Enumerate simple directed cycles of length 3..=5.
pub fn detect_cycles(graph: &TransactionGraph, config: &EngineConfig) -> Vec<CycleFinding> {
    let mut digraph: DiGraph<NodeId, ()> = DiGraph::new();
    let mut petgraph_ix: HashMap<NodeId, NodeIndex> = HashMap::new();

    for &node in graph.nodes_by_account_id() {
        if graph.total_transactions(node) >= 2 {
            petgraph_ix.insert(node, digraph.add_node(node));
        }
    }

    let mut pair_seen = HashSet::new();
    for edge in graph.edges() {
        if let (Some(&from), Some(&to)) = (petgraph_ix.get(&edge.from), petgraph_ix.get(&edge.to))
        {
            // Parallel edges collapse for SCC purposes.
            if pair_seen.insert((from, to)) {
                digraph.add_edge(from, to, ());
            }
        }
    }

    let mut findings = Vec::new();
    let mut seen_node_sets: HashSet<Vec<NodeId>> = HashSet::new();

    for scc in tarjan_scc(&digraph) {
        if scc.len() < config.cycle_min_length {
            continue;
        }
        if scc.len() > config.max_scc_size {
            debug!(size = scc.len(), "skipping oversize strongly connected component");
            continue;
        }

        let members: HashSet<NodeId> = scc.iter().map(|&ix| digraph[ix]).collect();

        // Distinct intra-component successors, ordered by account ID so
        // traversal order does not depend on hashing.
        let adjacency: HashMap<NodeId, Vec<NodeId>> = members
            .iter()
            .map(|&node| {
                let successors = graph
                    .distinct_successors(node)
                    .into_iter()
                    .filter(|n| members.contains(n))
                    .collect();
                (node, successors)
            })
            .collect();

        let mut roots: Vec<NodeId> = members.iter().copied().collect();
        roots.sort_by(|&a, &b| graph.account_id(a).cmp(graph.account_id(b)));

        for root in roots {
            let mut path = vec![root];
            let mut on_path: HashSet<NodeId> = path.iter().copied().collect();
            walk(
                root,
                &adjacency,
                &mut path,
                &mut on_path,
                &mut seen_node_sets,
                &mut findings,
                config,
            );
        }
    }

    findings
}

fn walk(
    root: NodeId,
    adjacency: &HashMap<NodeId, Vec<NodeId>>,
    path: &mut Vec<NodeId>,
    on_path: &mut HashSet<NodeId>,
    seen_node_sets: &mut HashSet<Vec<NodeId>>,
    findings: &mut Vec<CycleFinding>,
    config: &EngineConfig,
) {
    let current = *path.last().expect("path never empty");
    for &next in &adjacency[&current] {
        if next == root {
            if path.len() >= config.cycle_min_length {
                let mut node_set = path.clone();
                node_set.sort_unstable();
                if seen_node_sets.insert(node_set) {
                    findings.push(CycleFinding {
                        nodes: path.clone(),
                        risk_score: cycle_risk(path.len()),
                    });
                }
            }
        } else if !on_path.contains(&next) && path.len() < config.cycle_max_length {
            path.push(next);
            on_path.insert(next);
            walk(root, adjacency, path, on_path, seen_node_sets, findings, config);
            path.pop();
            on_path.remove(&next);
        }
    }
}

fn cycle_risk(length: usize) -> u8 {
    (70 + 10 * (length as u32 - 3)).min(100) as u8
}
