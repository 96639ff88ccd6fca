//! High-velocity account detection.
//!
//! Counts an account's inbound and outbound transactions together inside
//! a 24-hour sliding window. The detector only produces a flag set; the
//! aggregator turns flags into a score boost for accounts that already
//! tripped another detector.

use chrono::{Duration, NaiveDateTime};

use crate::graph::{NodeId, TransactionGraph};
use crate::EngineConfig;

/// Nodes whose merged transaction sequence crosses the velocity
/// threshold, in ascending account-ID order.
pub fn detect_high_velocity(graph: &TransactionGraph, config: &EngineConfig) -> Vec<NodeId> {
    let window = Duration::hours(config.velocity_window_hours);

    graph
        .nodes_by_account_id()
        .iter()
        .copied()
        .filter(|&node| {
            graph.total_transactions(node) >= config.velocity_min_transactions
                && crosses_threshold(&merged_timestamps(graph, node), window, config)
        })
        .collect()
}

/// Inbound and outbound timestamps merged into one ascending sequence.
/// Both sides are already sorted, so this is a linear merge. A self-loop
/// appears on both sides and therefore counts twice.
fn merged_timestamps(graph: &TransactionGraph, node: NodeId) -> Vec<NaiveDateTime> {
    let inbound = graph.inbound_edges(node);
    let outbound = graph.outbound_edges(node);
    let mut merged = Vec::with_capacity(inbound.len() + outbound.len());

    let (mut i, mut o) = (0, 0);
    while i < inbound.len() && o < outbound.len() {
        let it = graph.edge(inbound[i]).timestamp;
        let ot = graph.edge(outbound[o]).timestamp;
        if it <= ot {
            merged.push(it);
            i += 1;
        } else {
            merged.push(ot);
            o += 1;
        }
    }
    merged.extend(inbound[i..].iter().map(|&e| graph.edge(e).timestamp));
    merged.extend(outbound[o..].iter().map(|&e| graph.edge(e).timestamp));
    merged
}

fn crosses_threshold(
    timestamps: &[NaiveDateTime],
    window: Duration,
    config: &EngineConfig,
) -> bool {
    let mut left = 0;
    for right in 0..timestamps.len() {
        while timestamps[right].signed_duration_since(timestamps[left]) > window {
            left += 1;
        }
        if right - left + 1 >= config.velocity_min_transactions {
            return true;
        }
    }
    false
}
