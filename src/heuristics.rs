//! Merchant and payroll counter-heuristics.
//!
//! Legitimate high-volume accounts look like smurfing targets: a busy
//! merchant has hundreds of inbound payments, a payroll account fans out
//! to many employees. Both profiles have low amount variance over a
//! sustained period, which mule bursts do not. The classifier derives the
//! two predicates once per account; the aggregator uses them to drop
//! smurf candidates.

use chrono::Duration;
use std::collections::HashSet;

use crate::graph::{NodeId, TransactionGraph};
use crate::EngineConfig;

/// Cached classification for one account.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountClass {
    /// Suppresses fan-in smurf candidates.
    pub merchant_like: bool,
    /// Suppresses fan-out smurf candidates.
    pub payroll_like: bool,
}

/// Per-account merchant/payroll classification over a frozen graph.
pub struct AccountClassifier {
    classes: Vec<AccountClass>,
}

impl AccountClassifier {
    pub fn classify(graph: &TransactionGraph, config: &EngineConfig) -> Self {
        let classes = (0..graph.node_count() as NodeId)
            .map(|node| AccountClass {
                merchant_like: is_merchant_like(graph, config, node),
                payroll_like: is_payroll_like(graph, config, node),
            })
            .collect();
        Self { classes }
    }

    pub fn is_merchant_like(&self, node: NodeId) -> bool {
        self.classes[node as usize].merchant_like
    }

    pub fn is_payroll_like(&self, node: NodeId) -> bool {
        self.classes[node as usize].payroll_like
    }
}

fn is_merchant_like(graph: &TransactionGraph, config: &EngineConfig, node: NodeId) -> bool {
    let inbound = graph.inbound_edges(node);
    if inbound.len() < config.merchant_min_inbound {
        return false;
    }

    let amounts: Vec<f64> = inbound.iter().map(|&e| graph.edge(e).amount).collect();
    let cv = match coefficient_of_variation(&amounts) {
        Some(cv) => cv,
        None => return false,
    };
    if cv > config.merchant_max_amount_cv {
        return false;
    }

    // Inbound indices are timestamp-sorted, so span is last minus first.
    let earliest = graph.edge(inbound[0]).timestamp;
    let latest = graph.edge(*inbound.last().expect("non-empty")).timestamp;
    latest.signed_duration_since(earliest) >= Duration::days(config.merchant_min_span_days)
}

fn is_payroll_like(graph: &TransactionGraph, config: &EngineConfig, node: NodeId) -> bool {
    let outbound = graph.outbound_edges(node);
    if outbound.len() < config.payroll_min_outbound {
        return false;
    }

    let amounts: Vec<f64> = outbound.iter().map(|&e| graph.edge(e).amount).collect();
    let cv = match coefficient_of_variation(&amounts) {
        Some(cv) => cv,
        None => return false,
    };
    if cv > config.payroll_max_amount_cv {
        return false;
    }

    let distinct_days: HashSet<_> = outbound
        .iter()
        .map(|&e| graph.edge(e).timestamp.date())
        .collect();
    distinct_days.len() >= config.payroll_min_distinct_days
}

/// Population standard deviation over mean. `None` for an empty set or a
/// zero mean (degenerate statistics report no match rather than failing).
fn coefficient_of_variation(amounts: &[f64]) -> Option<f64> {
    if amounts.is_empty() {
        return None;
    }
    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    if mean == 0.0 {
        return None;
    }
    let variance =
        amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / amounts.len() as f64;
    Some(variance.sqrt() / mean)
}
