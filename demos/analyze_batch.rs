//! Batch analysis example
//!
//! This example demonstrates fraud ring detection over a small batch
//! containing a transaction cycle, a smurfing burst and a shell chain.

use chrono::NaiveDateTime;
use transaction_fraud_detector::{FraudDetectionEngine, Transaction, TIMESTAMP_FORMAT};

fn tx(id: &str, sender: &str, receiver: &str, amount: f64, timestamp: &str) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        sender_id: sender.to_string(),
        receiver_id: receiver.to_string(),
        amount,
        timestamp: NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .expect("valid timestamp"),
    }
}

fn main() {
    println!("=== Transaction Fraud Detector ===\n");

    let mut batch = Vec::new();

    // A 3-account cycle: funds return to their origin.
    batch.push(tx("C1", "ACC001", "ACC002", 15000.0, "2024-01-15 10:00:00"));
    batch.push(tx("C2", "ACC002", "ACC003", 14800.0, "2024-01-15 14:30:00"));
    batch.push(tx("C3", "ACC003", "ACC001", 14500.0, "2024-01-16 09:15:00"));

    // A fan-in burst: ten senders hitting one collector in a day.
    for i in 1..=10 {
        batch.push(tx(
            &format!("S{i}"),
            &format!("MULE{:02}", i),
            "COLLECTOR",
            9000.0,
            &format!("2024-01-20 {:02}:00:00", 8 + i % 12),
        ));
    }

    // A layering chain through two thin intermediaries.
    batch.push(tx("L1", "ORIGIN", "PASS1", 48000.0, "2024-02-01 09:00:00"));
    batch.push(tx("L2", "PASS1", "PASS2", 47500.0, "2024-02-01 11:00:00"));
    batch.push(tx("L3", "PASS2", "EXIT", 47000.0, "2024-02-01 13:00:00"));

    // Background activity that should stay clean.
    batch.push(tx("N1", "ALICE", "BOB", 120.0, "2024-01-05 12:00:00"));
    batch.push(tx("N2", "BOB", "CAROL", 60.0, "2024-01-06 12:00:00"));

    let engine = FraudDetectionEngine::new();
    let (report, payload) = engine
        .analyze_with_payload(&batch)
        .expect("analysis should succeed");

    println!("1. Summary");
    println!(
        "   Accounts analyzed: {}",
        report.summary.total_accounts_analyzed
    );
    println!(
        "   Suspicious accounts: {}",
        report.summary.suspicious_accounts_flagged
    );
    println!("   Fraud rings: {}", report.summary.fraud_rings_detected);
    println!();

    println!("2. Fraud Rings");
    for ring in &report.fraud_rings {
        println!(
            "   {} [{}] risk {} members {:?}",
            ring.ring_id,
            serde_json::to_string(&ring.pattern_type).unwrap(),
            ring.risk_score,
            ring.member_accounts
        );
    }
    println!();

    println!("3. Suspicious Accounts");
    for account in &report.suspicious_accounts {
        println!(
            "   {} score {}/100 ({:?}) via {}",
            account.account_id,
            account.suspicion_score,
            account.risk_level(),
            account.ring_id
        );
    }
    println!();

    println!("4. Visualization payload");
    println!(
        "   {} nodes, {} edges",
        payload.nodes.len(),
        payload.edges.len()
    );
    println!();

    println!("5. Full report JSON");
    println!("{}", report.to_json().expect("serializable report"));
}
