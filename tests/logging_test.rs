//! Journal capture across the pipeline phases

mod common;

use common::*;
use csc_transactor::*;
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("trace")
        .with_test_writer()
        .try_init();
}

fn arbitrary_log_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
    ]
}

#[test]
fn test_phase_lines_are_tagged_with_the_transaction() {
    init_tracing();
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    let bob = keys(2).account_id();
    ledger.fund(alice.account_id(), drops(10_000));
    ledger.fund(bob, drops(10_000));

    let tx = payment(&alice, bob, 1, BASE_FEE, 1_000_000);
    let journal = Journal::capturing("Test");
    let outcome = apply(&app, &mut ledger, &tx, ApplyFlags::NONE, journal.clone());
    assert_eq!(outcome.result, Ter::TecUnfundedPayment);

    assert!(journal.contains(&format!("apply: Payment {}", tx.hash)));
    assert!(journal.contains("claim_fee: tecUNFUNDED_PAYMENT"));

    let entries = journal.entries();
    assert!(!entries.is_empty());
    assert_eq!(journal.filter_by_transaction(&tx.hash).len(), entries.len());
    assert!(entries.iter().any(|e| e.partition == "Transactor"));
}

#[test]
fn test_no_capture_by_default() {
    let journal = Journal::new("Test");
    journal.error("forwarded to tracing only");
    assert!(journal.entries().is_empty());
    assert!(!journal.contains("forwarded"));
}

#[test]
fn test_clones_share_the_buffer() {
    let journal = Journal::capturing("Test");
    let tagged = journal.with_tx(Hash256([7u8; 32]));
    let renamed = journal.partition("Other");

    journal.info("one");
    tagged.info("two");
    renamed.info("three");

    let entries = journal.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1].tx_hash, Some(Hash256([7u8; 32])));
    assert_eq!(entries[2].partition, "Other");

    renamed.clear();
    assert!(journal.entries().is_empty());
}

#[test]
fn test_rejected_transaction_explains_itself() {
    let app = app();
    let ledger = ledger_for(app.config());
    let stranger = keys(9);
    let tx = payment(&stranger, keys(2).account_id(), 1, BASE_FEE, 100);

    let journal = Journal::capturing("Test").with_min_level(LogLevel::Info);
    let pf = preflight(
        &app,
        Rules::from_view(&ledger),
        &tx,
        ApplyFlags::NONE,
        journal.clone(),
    );
    let pc = preclaim(&pf, &app, &ledger);
    assert_eq!(pc.ter, Ter::TerNoAccount);
    assert!(journal
        .entries()
        .iter()
        .all(|e| e.level >= LogLevel::Info));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Only lines at or above the minimum level are captured, in order.
    #[test]
    fn property_min_level_filter(
        min in arbitrary_log_level(),
        lines in prop::collection::vec((arbitrary_log_level(), "[a-z ]{1,20}"), 0..30),
    ) {
        let journal = Journal::capturing("Test").with_min_level(min);
        for (level, message) in &lines {
            journal.log(*level, message.clone());
        }

        let expected: Vec<&String> = lines
            .iter()
            .filter(|(level, _)| *level >= min)
            .map(|(_, message)| message)
            .collect();
        let captured = journal.entries();
        prop_assert_eq!(captured.len(), expected.len());
        for (entry, message) in captured.iter().zip(expected) {
            prop_assert_eq!(&entry.message, message);
            prop_assert!(entry.level >= min);
        }
    }
}
