//! Shell-account layering detection.
//!
//! Layering interposes thin, barely-used accounts between the source and
//! destination of funds. The detector walks simple paths of 3 or 4 edges
//! where every interior node has at most 3 total transactions; endpoints
//! are unrestricted. Two-hop pass-throughs are explicitly not chains.

use std::collections::{HashMap, HashSet};

use crate::graph::{NodeId, TransactionGraph};
use crate::EngineConfig;

/// One layering chain, nodes in path order from source to destination.
#[derive(Debug, Clone)]
pub struct ShellFinding {
    pub path: Vec<NodeId>,
    pub hops: usize,
    pub risk_score: u8,
}

/// Enumerate layering chains of 3..=4 hops through low-activity nodes.
pub fn detect_shell_chains(graph: &TransactionGraph, config: &EngineConfig) -> Vec<ShellFinding> {
    let low_activity: Vec<bool> = (0..graph.node_count() as NodeId)
        .map(|n| graph.total_transactions(n) <= config.shell_max_intermediate_transactions)
        .collect();

    let mut paths: HashSet<Vec<NodeId>> = HashSet::new();
    for &source in graph.nodes_by_account_id() {
        let mut path = vec![source];
        extend(graph, config, &low_activity, &mut path, &mut paths);
    }

    collapse(graph, paths)
}

fn extend(
    graph: &TransactionGraph,
    config: &EngineConfig,
    low_activity: &[bool],
    path: &mut Vec<NodeId>,
    paths: &mut HashSet<Vec<NodeId>>,
) {
    let current = *path.last().expect("path never empty");
    let hops_after = path.len(); // edges in the path once one more node is appended

    for next in graph.distinct_successors(current) {
        if path.contains(&next) {
            continue;
        }
        if hops_after >= config.shell_min_hops {
            let mut chain = path.clone();
            chain.push(next);
            paths.insert(chain);
        }
        // Only a low-activity node can serve as a further intermediate.
        if hops_after < config.shell_max_hops && low_activity[next as usize] {
            path.push(next);
            extend(graph, config, low_activity, path, paths);
            path.pop();
        }
    }
}

/// Deduplicate by node-set: the shorter path wins; on equal length the
/// lexicographically smallest (source, destination, sequence) is kept.
fn collapse(graph: &TransactionGraph, paths: HashSet<Vec<NodeId>>) -> Vec<ShellFinding> {
    let rank = |path: &[NodeId]| {
        let ids: Vec<&str> = path.iter().map(|&n| graph.account_id(n)).collect();
        (
            path.len(),
            ids[0].to_string(),
            ids[ids.len() - 1].to_string(),
            ids.join("\u{0}"),
        )
    };

    let mut best: HashMap<Vec<NodeId>, Vec<NodeId>> = HashMap::new();
    for path in paths {
        let mut node_set = path.clone();
        node_set.sort_unstable();
        match best.get(&node_set) {
            Some(kept) if rank(kept) <= rank(&path) => {}
            _ => {
                best.insert(node_set, path);
            }
        }
    }

    let mut findings: Vec<ShellFinding> = best
        .into_values()
        .map(|path| {
            let hops = path.len() - 1;
            ShellFinding {
                risk_score: shell_risk(hops),
                hops,
                path,
            }
        })
        .collect();
    findings.sort_by(|a, b| {
        let ids = |f: &ShellFinding| -> Vec<String> {
            f.path
                .iter()
                .map(|&n| graph.account_id(n).to_string())
                .collect()
        };
        ids(a).cmp(&ids(b))
    });
    findings
}

fn shell_risk(hops: usize) -> u8 {
    (60 + 10 * (hops as u32 - 1)).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tx;

    fn account_path(graph: &TransactionGraph, finding: &ShellFinding) -> Vec<String> {
        finding
            .path
            .iter()
            .map(|&n| graph.account_id(n).to_string())
            .collect()
    }

    #[test]
    fn three_hop_chain_found() {
        let graph = TransactionGraph::build(&[
            tx("T1", "A", "I1", 5000.0, "2024-01-15 10:00:00"),
            tx("T2", "I1", "I2", 4900.0, "2024-01-15 11:00:00"),
            tx("T3", "I2", "B", 4800.0, "2024-01-15 12:00:00"),
        ]);

        let findings = detect_shell_chains(&graph, &EngineConfig::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].hops, 3);
        assert_eq!(findings[0].risk_score, 80);
        assert_eq!(account_path(&graph, &findings[0]), vec!["A", "I1", "I2", "B"]);
    }

    #[test]
    fn two_hop_pass_through_is_rejected() {
        let graph = TransactionGraph::build(&[
            tx("T1", "A", "I", 5000.0, "2024-01-15 10:00:00"),
            tx("T2", "I", "B", 4900.0, "2024-01-15 11:00:00"),
        ]);

        assert!(detect_shell_chains(&graph, &EngineConfig::default()).is_empty());
    }

    #[test]
    fn four_hop_chain_scores_ninety() {
        let graph = TransactionGraph::build(&[
            tx("T1", "A", "I1", 5000.0, "2024-01-15 10:00:00"),
            tx("T2", "I1", "I2", 4900.0, "2024-01-15 11:00:00"),
            tx("T3", "I2", "I3", 4800.0, "2024-01-15 12:00:00"),
            tx("T4", "I3", "B", 4700.0, "2024-01-15 13:00:00"),
        ]);

        let findings = detect_shell_chains(&graph, &EngineConfig::default());
        // The 4-hop chain plus embedded 3-hop sub-chains, each a distinct
        // node-set, survive the collapse.
        assert!(findings.iter().any(|f| f.hops == 4 && f.risk_score == 90));
        assert!(findings
            .iter()
            .any(|f| account_path(&graph, f) == vec!["A", "I1", "I2", "I3", "B"]));
    }

    #[test]
    fn busy_intermediate_breaks_the_chain() {
        let mut batch = vec![
            tx("T1", "A", "I1", 5000.0, "2024-01-15 10:00:00"),
            tx("T2", "I1", "I2", 4900.0, "2024-01-15 11:00:00"),
            tx("T3", "I2", "B", 4800.0, "2024-01-15 12:00:00"),
        ];
        // Push I1 over the activity ceiling.
        for i in 0..5 {
            batch.push(tx(
                &format!("N{i}"),
                &format!("P{i}"),
                "I1",
                10.0,
                "2024-01-10 09:00:00",
            ));
        }
        let graph = TransactionGraph::build(&batch);

        let findings = detect_shell_chains(&graph, &EngineConfig::default());
        assert!(findings
            .iter()
            .all(|f| !account_path(&graph, f).contains(&"I1".to_string())));
    }

    #[test]
    fn one_ring_per_node_set() {
        // Back-edge between the intermediates opens extra walks over the
        // same four accounts; only one chain may survive for the set.
        let graph = TransactionGraph::build(&[
            tx("T1", "A", "I1", 100.0, "2024-01-15 10:00:00"),
            tx("T2", "I1", "I2", 100.0, "2024-01-15 11:00:00"),
            tx("T3", "I2", "B", 100.0, "2024-01-15 12:00:00"),
            tx("T4", "I2", "I1", 100.0, "2024-01-15 13:00:00"),
        ]);

        let findings = detect_shell_chains(&graph, &EngineConfig::default());
        let over_abi: Vec<&ShellFinding> = findings
            .iter()
            .filter(|f| {
                let mut ids = account_path(&graph, f);
                ids.sort();
                ids == vec!["A", "B", "I1", "I2"]
            })
            .collect();
        assert_eq!(over_abi.len(), 1);
        assert_eq!(over_abi[0].hops, 3);
    }

    #[test]
    fn terminal_may_be_any_node() {
        // Destination HUB is busy; only intermediates must be quiet.
        let mut batch = vec![
            tx("T1", "A", "I1", 100.0, "2024-01-15 10:00:00"),
            tx("T2", "I1", "I2", 100.0, "2024-01-15 11:00:00"),
            tx("T3", "I2", "HUB", 100.0, "2024-01-15 12:00:00"),
        ];
        for i in 0..10 {
            batch.push(tx(
                &format!("H{i}"),
                &format!("C{i}"),
                "HUB",
                10.0,
                "2024-01-01 09:00:00",
            ));
        }
        let graph = TransactionGraph::build(&batch);

        let findings = detect_shell_chains(&graph, &EngineConfig::default());
        assert!(findings
            .iter()
            .any(|f| account_path(&graph, f) == vec!["A", "I1", "I2", "HUB"]));
    }
}
