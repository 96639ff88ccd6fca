//! End-to-end scenarios over the full engine.

use chrono::NaiveDateTime;
use transaction_fraud_detector::{
    AnalysisReport, FraudDetectionEngine, FraudPattern, Transaction, TIMESTAMP_FORMAT,
};

fn tx(id: &str, sender: &str, receiver: &str, amount: f64, timestamp: &str) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        sender_id: sender.to_string(),
        receiver_id: receiver.to_string(),
        amount,
        timestamp: NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .expect("test timestamp"),
    }
}

fn analyze(batch: &[Transaction]) -> AnalysisReport {
    FraudDetectionEngine::new().analyze(batch).expect("analysis")
}

/// Ten distinct senders paying one receiver on the same day.
fn fan_in_batch(receiver: &str) -> Vec<Transaction> {
    (1..=10)
        .map(|i| {
            tx(
                &format!("FI{i}"),
                &format!("S{i}"),
                receiver,
                9000.0,
                &format!("2024-01-20 {:02}:15:00", i),
            )
        })
        .collect()
}

#[test]
fn minimal_three_cycle() {
    let report = analyze(&[
        tx("T1", "A", "B", 1000.0, "2024-01-15 10:00:00"),
        tx("T2", "B", "C", 1000.0, "2024-01-15 11:00:00"),
        tx("T3", "C", "A", 1000.0, "2024-01-15 12:00:00"),
    ]);

    assert_eq!(report.fraud_rings.len(), 1);
    let ring = &report.fraud_rings[0];
    assert_eq!(ring.pattern_type, FraudPattern::Cycle);
    assert_eq!(ring.risk_score, 70);
    let mut members = ring.member_accounts.clone();
    members.sort();
    assert_eq!(members, vec!["A", "B", "C"]);

    assert_eq!(report.suspicious_accounts.len(), 3);
    for account in &report.suspicious_accounts {
        assert_eq!(account.suspicion_score, 40);
        assert_eq!(account.detected_patterns, vec![FraudPattern::Cycle]);
        assert_eq!(account.ring_id, ring.ring_id);
    }
}

#[test]
fn fan_in_smurf() {
    let report = analyze(&fan_in_batch("R"));

    assert_eq!(report.fraud_rings.len(), 1);
    let ring = &report.fraud_rings[0];
    assert_eq!(ring.pattern_type, FraudPattern::SmurfFanIn);
    assert_eq!(ring.risk_score, 75);
    assert_eq!(ring.member_accounts.len(), 11);
    assert_eq!(ring.member_accounts[0], "R");

    let r = report
        .suspicious_accounts
        .iter()
        .find(|a| a.account_id == "R")
        .expect("receiver flagged");
    assert_eq!(r.suspicion_score, 30);
    assert_eq!(r.detected_patterns, vec![FraudPattern::SmurfFanIn]);
}

#[test]
fn merchant_suppression() {
    // The same burst, but the receiver also has 300 steady inbound
    // payments of similar size across a month: a merchant profile.
    let mut batch = fan_in_batch("R");
    for i in 0..300usize {
        let day = 1 + (i / 10) as u32;
        let amount = if i % 2 == 0 { 8500.0 } else { 9500.0 };
        batch.push(tx(
            &format!("M{i}"),
            &format!("CUST{:03}", i),
            "R",
            amount,
            &format!("2024-01-{:02} {:02}:30:00", day, i % 10),
        ));
    }

    let report = analyze(&batch);
    assert!(report.fraud_rings.is_empty());
    assert!(report.suspicious_accounts.is_empty());
}

#[test]
fn shell_chain() {
    let report = analyze(&[
        tx("T1", "A", "I1", 5000.0, "2024-02-01 09:00:00"),
        tx("T2", "I1", "I2", 4900.0, "2024-02-01 10:00:00"),
        tx("T3", "I2", "B", 4800.0, "2024-02-01 11:00:00"),
    ]);

    assert_eq!(report.fraud_rings.len(), 1);
    let ring = &report.fraud_rings[0];
    assert_eq!(ring.pattern_type, FraudPattern::Shell);
    assert_eq!(ring.risk_score, 80);
    assert_eq!(ring.member_accounts, vec!["A", "I1", "I2", "B"]);
}

#[test]
fn high_velocity_alone_is_gated_out() {
    // Forty transactions in twelve hours, but spread over six repeat
    // recipients so no other detector fires.
    let batch: Vec<Transaction> = (0..40usize)
        .map(|i| {
            tx(
                &format!("V{i}"),
                "X",
                &format!("D{}", i % 6),
                150.0,
                &format!("2024-03-01 {:02}:{:02}:00", 8 + i / 5, (i % 5) * 11),
            )
        })
        .collect();

    let report = analyze(&batch);
    assert!(report.fraud_rings.is_empty());
    assert!(report
        .suspicious_accounts
        .iter()
        .all(|a| a.account_id != "X"));
    assert!(report.suspicious_accounts.is_empty());
}

#[test]
fn cycle_plus_high_velocity_combines() {
    // A sits on a 3-cycle and also churns 30 transactions in one morning.
    let mut batch = vec![
        tx("T1", "A", "B", 1000.0, "2024-01-15 10:00:00"),
        tx("T2", "B", "C", 1000.0, "2024-01-15 11:00:00"),
        tx("T3", "C", "A", 1000.0, "2024-01-15 12:00:00"),
    ];
    for i in 0..30usize {
        batch.push(tx(
            &format!("V{i}"),
            "A",
            &format!("D{}", i % 4),
            20.0,
            &format!("2024-01-15 {:02}:{:02}:00", 6 + i / 10, (i % 10) * 6),
        ));
    }

    let report = analyze(&batch);
    let a = report
        .suspicious_accounts
        .iter()
        .find(|acct| acct.account_id == "A")
        .expect("A flagged");
    assert_eq!(a.suspicion_score, 50);
    assert_eq!(
        a.detected_patterns,
        vec![FraudPattern::Cycle, FraudPattern::HighVelocity]
    );
}

#[test]
fn empty_input_is_not_an_error() {
    let report = analyze(&[]);
    assert_eq!(report.summary.total_accounts_analyzed, 0);
    assert_eq!(report.summary.suspicious_accounts_flagged, 0);
    assert_eq!(report.summary.fraud_rings_detected, 0);
}

fn mixed_batch() -> Vec<Transaction> {
    let mut batch = vec![
        // Cycle.
        tx("C1", "ACC001", "ACC002", 1000.0, "2024-01-15 10:00:00"),
        tx("C2", "ACC002", "ACC003", 1000.0, "2024-01-15 11:00:00"),
        tx("C3", "ACC003", "ACC001", 1000.0, "2024-01-15 12:00:00"),
        // Shell chain.
        tx("L1", "SRC", "TH1", 5000.0, "2024-02-01 09:00:00"),
        tx("L2", "TH1", "TH2", 4900.0, "2024-02-01 10:00:00"),
        tx("L3", "TH2", "DST", 4800.0, "2024-02-01 11:00:00"),
        // Background noise.
        tx("N1", "ALICE", "BOB", 42.0, "2024-01-02 12:00:00"),
        tx("N2", "BOB", "ALICE", 13.0, "2024-01-03 12:00:00"),
    ];
    batch.extend(fan_in_batch("HUB"));
    for i in 0..35usize {
        batch.push(tx(
            &format!("V{i}"),
            "ACC001",
            &format!("OUT{}", i % 5),
            10.0,
            &format!("2024-01-15 {:02}:{:02}:00", 6 + i / 10, (i % 10) * 6),
        ));
    }
    batch
}

#[test]
fn reported_ring_ids_resolve_and_scores_stay_in_range() {
    let report = analyze(&mixed_batch());

    assert_eq!(
        report.summary.fraud_rings_detected,
        report.fraud_rings.len()
    );
    assert_eq!(
        report.summary.suspicious_accounts_flagged,
        report.suspicious_accounts.len()
    );

    // Rings numbered R1..Rn in order.
    for (i, ring) in report.fraud_rings.iter().enumerate() {
        assert_eq!(ring.ring_id, format!("R{}", i + 1));
        assert!(ring.risk_score <= 100);
        let mut members = ring.member_accounts.clone();
        members.sort();
        members.dedup();
        assert_eq!(members.len(), ring.member_accounts.len(), "duplicate member");
    }

    for account in &report.suspicious_accounts {
        assert!((1..=100).contains(&account.suspicion_score));
        assert!(!account.ring_id.is_empty());
        assert!(report
            .fraud_rings
            .iter()
            .any(|r| r.ring_id == account.ring_id));
        assert!(!account.detected_patterns.is_empty());
    }

    // Sorted by descending score, ties by ascending account ID.
    for pair in report.suspicious_accounts.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.suspicion_score > b.suspicion_score
                || (a.suspicion_score == b.suspicion_score && a.account_id < b.account_id)
        );
    }

    // Detector ordering of ring IDs.
    let order = |p: &FraudPattern| match p {
        FraudPattern::Cycle => 0,
        FraudPattern::SmurfFanIn => 1,
        FraudPattern::SmurfFanOut => 2,
        FraudPattern::Shell => 3,
        FraudPattern::HighVelocity => unreachable!("no velocity rings"),
    };
    for pair in report.fraud_rings.windows(2) {
        assert!(order(&pair[0].pattern_type) <= order(&pair[1].pattern_type));
    }
}

#[test]
fn output_is_deterministic() {
    let batch = mixed_batch();
    let mut first = analyze(&batch);
    let mut second = analyze(&batch);

    first.summary.processing_time_seconds = 0.0;
    second.summary.processing_time_seconds = 0.0;
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn cycle_membership_closed_under_rotation() {
    let base = [
        ("T1", "A", "B"),
        ("T2", "B", "C"),
        ("T3", "C", "A"),
    ];

    let mut memberships = Vec::new();
    for start in 0..base.len() {
        let batch: Vec<Transaction> = (0..base.len())
            .map(|i| {
                let (id, from, to) = base[(start + i) % base.len()];
                tx(id, from, to, 500.0, "2024-01-15 10:00:00")
            })
            .collect();
        let report = analyze(&batch);
        assert_eq!(report.fraud_rings.len(), 1);
        let mut members = report.fraud_rings[0].member_accounts.clone();
        members.sort();
        memberships.push(members);
    }

    assert!(memberships.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn report_serializes_with_contract_field_names() {
    let report = analyze(&[
        tx("T1", "A", "B", 1000.0, "2024-01-15 10:00:00"),
        tx("T2", "B", "C", 1000.0, "2024-01-15 11:00:00"),
        tx("T3", "C", "A", 1000.0, "2024-01-15 12:00:00"),
    ]);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert!(json["suspicious_accounts"][0]["account_id"].is_string());
    assert_eq!(json["suspicious_accounts"][0]["suspicion_score"], 40);
    assert_eq!(json["suspicious_accounts"][0]["detected_patterns"][0], "cycle");
    assert_eq!(json["fraud_rings"][0]["ring_id"], "R1");
    assert_eq!(json["fraud_rings"][0]["pattern_type"], "cycle");
    assert_eq!(json["summary"]["total_accounts_analyzed"], 3);
    assert!(json["summary"]["processing_time_seconds"].is_number());
}
