//! Smurfing detection: fan-in and fan-out bursts.
//!
//! A 72-hour window slides over each account's timestamp-sorted inbound
//! (then outbound) transactions, tracking how many distinct counterparties
//! are present. Crossing the threshold yields at most one candidate per
//! account and direction; merchant/payroll suppression happens in the
//! aggregator so this detector stays independent of the classifier.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::graph::{NodeId, TransactionGraph};
use crate::EngineConfig;

/// Direction of a smurfing burst relative to the flagged account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmurfDirection {
    FanIn,
    FanOut,
}

/// A threshold crossing, before counter-heuristic suppression.
#[derive(Debug, Clone)]
pub struct SmurfCandidate {
    pub center: NodeId,
    pub direction: SmurfDirection,
    /// Center first, then the counterparties present at the first
    /// crossing, ascending by account ID.
    pub members: Vec<NodeId>,
}

/// Scan every account for fan-in and fan-out bursts.
pub fn detect_smurfing(graph: &TransactionGraph, config: &EngineConfig) -> Vec<SmurfCandidate> {
    let mut candidates = Vec::new();
    let window = Duration::hours(config.smurf_window_hours);

    for &node in graph.nodes_by_account_id() {
        if let Some(members) = scan_direction(graph, config, node, SmurfDirection::FanIn, window) {
            candidates.push(SmurfCandidate {
                center: node,
                direction: SmurfDirection::FanIn,
                members,
            });
        }
        if let Some(members) = scan_direction(graph, config, node, SmurfDirection::FanOut, window)
        {
            candidates.push(SmurfCandidate {
                center: node,
                direction: SmurfDirection::FanOut,
                members,
            });
        }
    }

    candidates
}

/// Slide the window over one direction's edges. Returns the ring member
/// list at the first threshold crossing, or `None`.
fn scan_direction(
    graph: &TransactionGraph,
    config: &EngineConfig,
    center: NodeId,
    direction: SmurfDirection,
    window: Duration,
) -> Option<Vec<NodeId>> {
    let edge_ids = match direction {
        SmurfDirection::FanIn => graph.inbound_edges(center),
        SmurfDirection::FanOut => graph.outbound_edges(center),
    };
    if edge_ids.len() < config.smurf_min_counterparties {
        return None;
    }

    let counterparty = |edge_id: u32| {
        let edge = graph.edge(edge_id);
        match direction {
            SmurfDirection::FanIn => edge.from,
            SmurfDirection::FanOut => edge.to,
        }
    };

    let mut in_window: HashMap<NodeId, usize> = HashMap::new();
    let mut left = 0;

    for right in 0..edge_ids.len() {
        let newest = graph.edge(edge_ids[right]).timestamp;

        // Window is inclusive on both ends: evict strictly older entries.
        while newest.signed_duration_since(graph.edge(edge_ids[left]).timestamp) > window {
            let evicted = counterparty(edge_ids[left]);
            let count = in_window.get_mut(&evicted).expect("tracked counterparty");
            *count -= 1;
            if *count == 0 {
                in_window.remove(&evicted);
            }
            left += 1;
        }

        *in_window.entry(counterparty(edge_ids[right])).or_insert(0) += 1;

        if in_window.len() >= config.smurf_min_counterparties {
            let mut counterparties: Vec<NodeId> = in_window.keys().copied().collect();
            counterparties
                .sort_by(|&a, &b| graph.account_id(a).cmp(graph.account_id(b)));
            let mut members = Vec::with_capacity(counterparties.len() + 1);
            members.push(center);
            members.extend(counterparties.into_iter().filter(|&n| n != center));
            return Some(members);
        }
    }

    None
}
