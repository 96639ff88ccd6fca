//! Input boundary: raw records from the upstream CSV collaborator.
//!
//! The engine proper assumes well-typed transactions; everything
//! string-shaped is rejected or converted here and rejection reasons are
//! surfaced to the caller verbatim.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Transaction};

/// Civil timestamp layout used by the upstream feed and the payload.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One record as delivered by the CSV collaborator, all fields untyped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: String,
    pub timestamp: String,
}

/// Convert raw records into transactions, rejecting malformed fields.
/// Duplicate transaction IDs are rejected when `enforce_unique_ids` is
/// set; otherwise duplicates pass through as distinct edges.
pub fn parse_records(
    records: &[RawRecord],
    enforce_unique_ids: bool,
) -> Result<Vec<Transaction>, AnalysisError> {
    let mut transactions = Vec::with_capacity(records.len());
    let mut seen_ids = HashSet::new();

    for record in records {
        let tx = parse_record(record)?;
        if enforce_unique_ids && !seen_ids.insert(tx.transaction_id.clone()) {
            return Err(AnalysisError::DuplicateTransaction(
                tx.transaction_id.clone(),
            ));
        }
        transactions.push(tx);
    }

    Ok(transactions)
}

fn parse_record(record: &RawRecord) -> Result<Transaction, AnalysisError> {
    if record.transaction_id.is_empty() {
        return Err(AnalysisError::EmptyTransactionId);
    }

    let amount: f64 = record
        .amount
        .trim()
        .parse()
        .map_err(|_| AnalysisError::InvalidAmount(record.amount.clone()))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AnalysisError::InvalidAmount(record.amount.clone()));
    }

    let timestamp = NaiveDateTime::parse_from_str(record.timestamp.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| AnalysisError::InvalidTimestamp(record.timestamp.clone()))?;

    Ok(Transaction {
        transaction_id: record.transaction_id.clone(),
        sender_id: record.sender_id.clone(),
        receiver_id: record.receiver_id.clone(),
        amount,
        timestamp,
    })
}
