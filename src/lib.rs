//! # Transaction Fraud Detector
//!
//! A transaction-graph analysis engine for money mule detection.
//!
//! ## Features
//!
//! - **Cycle Detection**: round-trip fund flows of 3–5 accounts, found
//!   inside strongly connected components
//! - **Smurfing Detection**: fan-in/fan-out bursts of ≥10 distinct
//!   counterparties within 72 hours
//! - **Shell Layering**: chains of 3–4 hops through barely-used
//!   intermediary accounts
//! - **High-Velocity Accounts**: ≥30 transactions inside any 24-hour
//!   window, boosting accounts other detectors already flagged
//! - **Counter-Heuristics**: merchant- and payroll-like profiles suppress
//!   smurfing false positives
//! - **Deterministic Output**: identical input produces byte-identical
//!   results, ring numbering included
//!
//! ## Usage
//!
//! ```
//! use transaction_fraud_detector::{FraudDetectionEngine, Transaction};
//!
//! let engine = FraudDetectionEngine::new();
//! let batch: Vec<Transaction> = Vec::new();
//! let report = engine.analyze(&batch).unwrap();
//! assert_eq!(report.summary.total_accounts_analyzed, 0);
//! ```

pub mod cycles;
pub mod graph;
pub mod heuristics;
pub mod record;
pub mod report;
pub mod shell;
pub mod smurf;
pub mod velocity;

pub use graph::{AccountStats, GraphStats, TransactionGraph};
pub use heuristics::AccountClassifier;
pub use record::{RawRecord, TIMESTAMP_FORMAT};
pub use report::{
    AnalysisReport, FraudPattern, FraudRing, GraphPayload, RiskLevel, Summary, SuspiciousAccount,
};

use std::time::Instant;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Analysis errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisError {
    #[error("transaction_id must not be empty")]
    EmptyTransactionId,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("duplicate transaction detected: {0}")]
    DuplicateTransaction(String),

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

/// One well-typed transaction between two accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: f64,
    pub timestamp: NaiveDateTime,
}

/// Engine thresholds. Defaults carry the production tuning; individual
/// fields can be overridden for experiments.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Shortest reportable cycle, in accounts.
    pub cycle_min_length: usize,
    /// Longest reportable cycle and the DFS depth bound.
    pub cycle_max_length: usize,
    /// Strongly connected components above this size are skipped.
    pub max_scc_size: usize,
    /// Smurfing window width.
    pub smurf_window_hours: i64,
    /// Distinct counterparties inside the window that trigger a flag.
    pub smurf_min_counterparties: usize,
    /// Shortest reportable layering chain, in edges.
    pub shell_min_hops: usize,
    /// Longest reportable layering chain, in edges.
    pub shell_max_hops: usize,
    /// Activity ceiling for a layering intermediate.
    pub shell_max_intermediate_transactions: usize,
    /// High-velocity window width.
    pub velocity_window_hours: i64,
    /// Transactions (with multiplicity) inside the window that flag.
    pub velocity_min_transactions: usize,
    /// Merchant profile: minimum inbound transactions.
    pub merchant_min_inbound: usize,
    /// Merchant profile: maximum coefficient of variation of amounts.
    pub merchant_max_amount_cv: f64,
    /// Merchant profile: minimum observation span in days.
    pub merchant_min_span_days: i64,
    /// Payroll profile: minimum outbound transactions.
    pub payroll_min_outbound: usize,
    /// Payroll profile: maximum coefficient of variation of amounts.
    pub payroll_max_amount_cv: f64,
    /// Payroll profile: minimum distinct payout dates.
    pub payroll_min_distinct_days: usize,
    /// Reject batches containing a repeated transaction ID.
    pub enforce_unique_ids: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_min_length: 3,
            cycle_max_length: 5,
            max_scc_size: 100,
            smurf_window_hours: 72,
            smurf_min_counterparties: 10,
            shell_min_hops: 3,
            shell_max_hops: 4,
            shell_max_intermediate_transactions: 3,
            velocity_window_hours: 24,
            velocity_min_transactions: 30,
            merchant_min_inbound: 300,
            merchant_max_amount_cv: 0.30,
            merchant_min_span_days: 14,
            payroll_min_outbound: 100,
            payroll_max_amount_cv: 0.20,
            payroll_min_distinct_days: 3,
            enforce_unique_ids: true,
        }
    }
}

/// Single-shot fraud detection engine. Stateless between invocations:
/// every call builds a fresh graph, runs the detectors over it and
/// aggregates their output.
pub struct FraudDetectionEngine {
    config: EngineConfig,
}

struct DetectorOutput {
    classifier: AccountClassifier,
    cycles: Vec<cycles::CycleFinding>,
    smurfs: Vec<smurf::SmurfCandidate>,
    shells: Vec<shell::ShellFinding>,
    velocity_flags: Vec<graph::NodeId>,
}

impl FraudDetectionEngine {
    /// Create an engine with default thresholds.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with custom thresholds.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze a batch of well-typed transactions.
    ///
    /// An empty batch is not an error: the report comes back with zero
    /// accounts analyzed.
    pub fn analyze(&self, transactions: &[Transaction]) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();
        let graph = TransactionGraph::build(transactions);
        self.analyze_graph(&graph, started)
    }

    /// Parse raw records from the upstream feed, then analyze them.
    pub fn analyze_records(&self, records: &[RawRecord]) -> Result<AnalysisReport, AnalysisError> {
        let transactions = record::parse_records(records, self.config.enforce_unique_ids)?;
        self.analyze(&transactions)
    }

    /// Analyze and also return the visualization payload built from the
    /// same graph, with stable edge IDs.
    pub fn analyze_with_payload(
        &self,
        transactions: &[Transaction],
    ) -> Result<(AnalysisReport, GraphPayload), AnalysisError> {
        let started = Instant::now();
        let graph = TransactionGraph::build(transactions);
        let analysis = self.analyze_graph(&graph, started)?;
        let payload = GraphPayload::from_analysis(&graph, &analysis);
        Ok((analysis, payload))
    }

    fn analyze_graph(
        &self,
        graph: &TransactionGraph,
        started: Instant,
    ) -> Result<AnalysisReport, AnalysisError> {
        let output = self.run_detectors(graph);
        let analysis = report::aggregate(
            graph,
            &output.classifier,
            output.cycles,
            output.smurfs,
            output.shells,
            output.velocity_flags,
            started.elapsed(),
        )?;
        info!(
            accounts = analysis.summary.total_accounts_analyzed,
            flagged = analysis.summary.suspicious_accounts_flagged,
            rings = analysis.summary.fraud_rings_detected,
            "analysis complete"
        );
        Ok(analysis)
    }

    /// Fan the classifier and the four detectors out over the frozen
    /// graph. Output does not depend on scheduling: every detector owns
    /// its buffer and the aggregator orders everything deterministically.
    #[cfg(feature = "parallel")]
    fn run_detectors(&self, graph: &TransactionGraph) -> DetectorOutput {
        let config = &self.config;
        let (classifier, (cycles, (smurfs, (shells, velocity_flags)))) = rayon::join(
            || AccountClassifier::classify(graph, config),
            || {
                rayon::join(
                    || cycles::detect_cycles(graph, config),
                    || {
                        rayon::join(
                            || smurf::detect_smurfing(graph, config),
                            || {
                                rayon::join(
                                    || shell::detect_shell_chains(graph, config),
                                    || velocity::detect_high_velocity(graph, config),
                                )
                            },
                        )
                    },
                )
            },
        );
        DetectorOutput {
            classifier,
            cycles,
            smurfs,
            shells,
            velocity_flags,
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_detectors(&self, graph: &TransactionGraph) -> DetectorOutput {
        let config = &self.config;
        DetectorOutput {
            classifier: AccountClassifier::classify(graph, config),
            cycles: cycles::detect_cycles(graph, config),
            smurfs: smurf::detect_smurfing(graph, config),
            shells: shell::detect_shell_chains(graph, config),
            velocity_flags: velocity::detect_high_velocity(graph, config),
        }
    }
}

impl Default for FraudDetectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::record::TIMESTAMP_FORMAT;

    /// Shorthand transaction constructor for detector tests.
    pub fn tx(id: &str, sender: &str, receiver: &str, amount: f64, timestamp: &str) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            amount,
            timestamp: NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
                .expect("test timestamp"),
        }
    }
}
