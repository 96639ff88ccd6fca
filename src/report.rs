//! Aggregation of detector output into the final analysis report.
//!
//! The aggregator is the only writer of result structures. It numbers
//! rings deterministically, applies counter-heuristic suppression to
//! smurf candidates, sums per-account scores with the high-velocity
//! multi-signal gate, and verifies ring invariants before emission.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cycles::CycleFinding;
use crate::graph::{NodeId, TransactionGraph};
use crate::heuristics::AccountClassifier;
use crate::record::TIMESTAMP_FORMAT;
use crate::shell::ShellFinding;
use crate::smurf::{SmurfCandidate, SmurfDirection};
use crate::AnalysisError;

const CYCLE_MEMBER_POINTS: u32 = 40;
const SMURF_MEMBER_POINTS: u32 = 30;
const SHELL_MEMBER_POINTS: u32 = 35;
const HIGH_VELOCITY_BONUS: u32 = 10;
const SUSPICION_CAP: u32 = 100;
const SMURF_RING_RISK: u8 = 75;

/// Pattern families reported on rings and accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudPattern {
    Cycle,
    SmurfFanIn,
    SmurfFanOut,
    Shell,
    HighVelocity,
}

/// A group of accounts implicated together by one detector finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudRing {
    pub ring_id: String,
    pub pattern_type: FraudPattern,
    pub member_accounts: Vec<String>,
    pub risk_score: u8,
}

/// One account with a positive suspicion score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    pub suspicion_score: u8,
    pub detected_patterns: Vec<FraudPattern>,
    /// First ring the account joined; empty when only high-velocity
    /// contributed (which the gate prevents for emitted accounts).
    pub ring_id: String,
}

/// Qualitative banding of a suspicion score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SuspiciousAccount {
    pub fn risk_level(&self) -> RiskLevel {
        match self.suspicion_score {
            0..=25 => RiskLevel::Low,
            26..=50 => RiskLevel::Medium,
            51..=75 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

/// Batch-level totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
}

/// Full result of one analysis invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: Summary,
}

impl AnalysisReport {
    pub fn has_suspicious_activity(&self) -> bool {
        !self.suspicious_accounts.is_empty() || !self.fraud_rings.is_empty()
    }

    /// Export as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Node entry of the visualization payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadNode {
    pub id: String,
    pub label: String,
    pub suspicion_score: u8,
    pub detected_patterns: Vec<FraudPattern>,
}

/// Edge entry of the visualization payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub amount: f64,
    pub timestamp: String,
}

/// Graph handed to the visualization collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<PayloadNode>,
    pub edges: Vec<PayloadEdge>,
}

impl GraphPayload {
    /// Project the graph and per-account results into the payload shape.
    /// Edge IDs are `E{n}` in input order, stable within an invocation.
    pub fn from_analysis(graph: &TransactionGraph, report: &AnalysisReport) -> Self {
        let by_account: HashMap<&str, &SuspiciousAccount> = report
            .suspicious_accounts
            .iter()
            .map(|a| (a.account_id.as_str(), a))
            .collect();

        let nodes = graph
            .nodes_by_account_id()
            .iter()
            .map(|&node| {
                let id = graph.account_id(node).to_string();
                let flagged = by_account.get(id.as_str());
                PayloadNode {
                    label: id.clone(),
                    suspicion_score: flagged.map_or(0, |a| a.suspicion_score),
                    detected_patterns: flagged
                        .map_or_else(Vec::new, |a| a.detected_patterns.clone()),
                    id,
                }
            })
            .collect();

        let edges = graph
            .edges()
            .iter()
            .enumerate()
            .map(|(i, edge)| PayloadEdge {
                id: format!("E{}", i + 1),
                source: graph.account_id(edge.from).to_string(),
                target: graph.account_id(edge.to).to_string(),
                amount: edge.amount,
                timestamp: edge.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            })
            .collect();

        Self { nodes, edges }
    }
}

struct AccountTally {
    score: u32,
    patterns: Vec<FraudPattern>,
    seen: HashSet<FraudPattern>,
    ring_id: Option<String>,
}

impl AccountTally {
    fn new() -> Self {
        Self {
            score: 0,
            patterns: Vec::new(),
            seen: HashSet::new(),
            ring_id: None,
        }
    }

    fn add(&mut self, pattern: FraudPattern, points: u32, ring_id: &str) {
        if self.seen.insert(pattern) {
            self.score += points;
            self.patterns.push(pattern);
        }
        if self.ring_id.is_none() {
            self.ring_id = Some(ring_id.to_string());
        }
    }
}

/// Combine detector outputs into the final report.
pub(crate) fn aggregate(
    graph: &TransactionGraph,
    classifier: &AccountClassifier,
    cycles: Vec<CycleFinding>,
    smurfs: Vec<SmurfCandidate>,
    shells: Vec<ShellFinding>,
    velocity_flags: Vec<NodeId>,
    elapsed: Duration,
) -> Result<AnalysisReport, AnalysisError> {
    let fraud_rings = number_rings(graph, classifier, cycles, smurfs, shells);
    verify_rings(graph, &fraud_rings)?;

    let mut tallies: HashMap<NodeId, AccountTally> = HashMap::new();
    for ring in &fraud_rings {
        let points = match ring.pattern_type {
            FraudPattern::Cycle => CYCLE_MEMBER_POINTS,
            FraudPattern::SmurfFanIn | FraudPattern::SmurfFanOut => SMURF_MEMBER_POINTS,
            FraudPattern::Shell => SHELL_MEMBER_POINTS,
            FraudPattern::HighVelocity => unreachable!("high velocity emits no rings"),
        };
        for account_id in &ring.member_accounts {
            let node = graph.node(account_id).expect("verified member");
            tallies
                .entry(node)
                .or_insert_with(AccountTally::new)
                .add(ring.pattern_type, points, &ring.ring_id);
        }
    }

    // Multi-signal gate: the boost never creates a suspicious account on
    // its own.
    for node in velocity_flags {
        if let Some(tally) = tallies.get_mut(&node) {
            if tally.score > 0 && tally.seen.insert(FraudPattern::HighVelocity) {
                tally.score += HIGH_VELOCITY_BONUS;
                tally.patterns.push(FraudPattern::HighVelocity);
            }
        } else {
            debug!(
                account = graph.account_id(node),
                "high-velocity flag gated out: no other signal"
            );
        }
    }

    let mut suspicious_accounts: Vec<SuspiciousAccount> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.score > 0)
        .map(|(node, tally)| SuspiciousAccount {
            account_id: graph.account_id(node).to_string(),
            suspicion_score: tally.score.min(SUSPICION_CAP) as u8,
            detected_patterns: tally.patterns,
            ring_id: tally.ring_id.unwrap_or_default(),
        })
        .collect();
    suspicious_accounts.sort_by(|a, b| {
        b.suspicion_score
            .cmp(&a.suspicion_score)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });

    let summary = Summary {
        total_accounts_analyzed: graph.node_count(),
        suspicious_accounts_flagged: suspicious_accounts.len(),
        fraud_rings_detected: fraud_rings.len(),
        processing_time_seconds: (elapsed.as_secs_f64() * 1000.0).round() / 1000.0,
    };

    Ok(AnalysisReport {
        suspicious_accounts,
        fraud_rings,
        summary,
    })
}

/// Order rings cycle → fan-in → fan-out → shell, each detector's rings
/// ascending by minimum member account ID, and assign `R{seq}` IDs.
fn number_rings(
    graph: &TransactionGraph,
    classifier: &AccountClassifier,
    cycles: Vec<CycleFinding>,
    smurfs: Vec<SmurfCandidate>,
    shells: Vec<ShellFinding>,
) -> Vec<FraudRing> {
    let to_ids = |members: &[NodeId]| -> Vec<String> {
        members
            .iter()
            .map(|&n| graph.account_id(n).to_string())
            .collect()
    };

    let mut groups: Vec<(FraudPattern, Vec<(Vec<String>, u8)>)> = Vec::new();

    groups.push((
        FraudPattern::Cycle,
        cycles
            .into_iter()
            .map(|finding| (to_ids(&finding.nodes), finding.risk_score))
            .collect(),
    ));

    for (pattern, direction) in [
        (FraudPattern::SmurfFanIn, SmurfDirection::FanIn),
        (FraudPattern::SmurfFanOut, SmurfDirection::FanOut),
    ] {
        let rings = smurfs
            .iter()
            .filter(|candidate| candidate.direction == direction)
            .filter(|candidate| match direction {
                SmurfDirection::FanIn => !classifier.is_merchant_like(candidate.center),
                SmurfDirection::FanOut => !classifier.is_payroll_like(candidate.center),
            })
            .map(|candidate| (to_ids(&candidate.members), SMURF_RING_RISK))
            .collect();
        groups.push((pattern, rings));
    }

    groups.push((
        FraudPattern::Shell,
        shells
            .into_iter()
            .map(|finding| (to_ids(&finding.path), finding.risk_score))
            .collect(),
    ));

    let mut fraud_rings = Vec::new();
    let mut seq = 1;
    for (pattern, mut rings) in groups {
        rings.sort_by(|(a, _), (b, _)| {
            let min_a = a.iter().min().expect("rings are non-empty");
            let min_b = b.iter().min().expect("rings are non-empty");
            min_a.cmp(min_b).then_with(|| a.cmp(b))
        });
        for (member_accounts, risk_score) in rings {
            fraud_rings.push(FraudRing {
                ring_id: format!("R{seq}"),
                pattern_type: pattern,
                member_accounts,
                risk_score,
            });
            seq += 1;
        }
    }
    fraud_rings
}

/// Detector output sanity: members must be distinct graph nodes and ring
/// risk must not exceed the cap. A failure is a programming fault.
fn verify_rings(graph: &TransactionGraph, rings: &[FraudRing]) -> Result<(), AnalysisError> {
    for ring in rings {
        let mut seen = HashSet::new();
        for account_id in &ring.member_accounts {
            if graph.node(account_id).is_none() {
                return Err(AnalysisError::InvariantViolation(format!(
                    "ring {} member {} is not a graph node",
                    ring.ring_id, account_id
                )));
            }
            if !seen.insert(account_id) {
                return Err(AnalysisError::InvariantViolation(format!(
                    "ring {} lists member {} twice",
                    ring.ring_id, account_id
                )));
            }
        }
        if u32::from(ring.risk_score) > SUSPICION_CAP {
            return Err(AnalysisError::InvariantViolation(format!(
                "ring {} risk score {} exceeds cap",
                ring.ring_id, ring.risk_score
            )));
        }
    }
    Ok(())
}
