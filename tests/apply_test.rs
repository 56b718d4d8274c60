//! The apply state machine: fee charging, sequence bumps, claimable failures
//! and full rollback on unclaimable ones

mod common;

use common::*;
use csc_transactor::transactor::apply_transactor;
use csc_transactor::*;
use proptest::prelude::*;

#[test]
fn test_fee_policy_offered_charges_offered_fee() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    let bob = keys(2).account_id();
    fund_at(&mut ledger, alice.account_id(), 10_000, 5);
    ledger.fund(bob, drops(1_000));

    let outcome = run(&app, &mut ledger, &payment(&alice, bob, 5, 15, 100));

    assert_eq!(outcome.result, Ter::TesSuccess);
    assert!(outcome.applied);
    assert_eq!(sequence(&ledger, &alice.account_id()), 6);
    assert_eq!(balance(&ledger, &alice.account_id()), drops(10_000 - 15 - 100));
    assert_eq!(balance(&ledger, &bob), drops(1_100));
}

#[test]
fn test_fee_policy_base_charges_base_fee() {
    let app = app_with(Config {
        fee_policy: FeePolicy::Base,
        ..small_fees_config()
    });
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    let bob = keys(2).account_id();
    fund_at(&mut ledger, alice.account_id(), 10_000, 5);
    ledger.fund(bob, drops(1_000));

    let outcome = run(&app, &mut ledger, &payment(&alice, bob, 5, 15, 100));

    assert_eq!(outcome.result, Ter::TesSuccess);
    assert_eq!(sequence(&ledger, &alice.account_id()), 6);
    assert_eq!(
        balance(&ledger, &alice.account_id()),
        drops(10_000 - BASE_FEE - 100)
    );
}

#[test]
fn test_claimable_failure_charges_fee_only() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    let bob = keys(2).account_id();
    ledger.fund(alice.account_id(), drops(1_000));
    ledger.fund(bob, drops(1_000));

    let outcome = run(&app, &mut ledger, &payment(&alice, bob, 1, BASE_FEE, 5_000));

    assert_eq!(outcome.result, Ter::TecUnfundedPayment);
    assert!(outcome.applied);
    assert_eq!(outcome.result.category(), TerCategory::Claimable);
    assert_eq!(balance(&ledger, &alice.account_id()), drops(1_000 - BASE_FEE));
    assert_eq!(sequence(&ledger, &alice.account_id()), 2);
    assert_eq!(balance(&ledger, &bob), drops(1_000));
}

#[test]
fn test_claimable_failure_is_not_claimed_with_retry_or_fail_hard() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    let bob = keys(2).account_id();
    ledger.fund(alice.account_id(), drops(1_000));
    ledger.fund(bob, drops(1_000));
    let before = ledger.clone();
    let tx = payment(&alice, bob, 1, BASE_FEE, 5_000);

    for flags in [ApplyFlags::RETRY, ApplyFlags::FAIL_HARD] {
        let outcome = apply(&app, &mut ledger, &tx, flags, Journal::new("Test"));
        assert_eq!(outcome.result, Ter::TecUnfundedPayment);
        assert!(!outcome.applied);
        assert_eq!(ledger, before);
    }
}

#[test]
fn test_payment_creates_destination() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    let carol = keys(3).account_id();
    ledger.fund(alice.account_id(), drops(10_000));

    let outcome = run(&app, &mut ledger, &payment(&alice, carol, 1, BASE_FEE, RESERVE_BASE - 1));
    assert_eq!(outcome.result, Ter::TecNoDstInsufCsc);
    assert!(outcome.applied);
    assert!(ledger.account(&carol).is_none());

    let outcome = run(&app, &mut ledger, &payment(&alice, carol, 2, BASE_FEE, RESERVE_BASE));
    assert_eq!(outcome.result, Ter::TesSuccess);
    let created = ledger.account(&carol).unwrap();
    assert_eq!(created.balance, drops(RESERVE_BASE));
    assert_eq!(created.sequence, 1);
}

#[test]
fn test_destination_tag_required() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    let bob = keys(2);
    ledger.fund(alice.account_id(), drops(10_000));
    ledger.fund(bob.account_id(), drops(10_000));

    let set_flag = TransactionBuilder::new(
        bob.account_id(),
        1,
        drops(BASE_FEE),
        TxPayload::AccountSet {
            set_flag: Some(AccountFlag::RequireDestTag),
            clear_flag: None,
        },
    )
    .sign(&bob)
    .unwrap();
    assert_eq!(run(&app, &mut ledger, &set_flag).result, Ter::TesSuccess);

    let untagged = payment(&alice, bob.account_id(), 1, BASE_FEE, 100);
    assert_eq!(run(&app, &mut ledger, &untagged).result, Ter::TecDstTagNeeded);

    let tagged = TransactionBuilder::new(
        alice.account_id(),
        2,
        drops(BASE_FEE),
        TxPayload::Payment {
            destination: bob.account_id(),
            amount: Amount::Native(drops(100)),
            destination_tag: Some(42),
        },
    )
    .sign(&alice)
    .unwrap();
    assert_eq!(run(&app, &mut ledger, &tagged).result, Ter::TesSuccess);
}

#[test]
fn test_regular_key_lifecycle() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    let regular = keys(30);
    ledger.fund(alice.account_id(), drops(10_000));

    let set_key = |seq: u32, fee: i64, key: Option<AccountId>, signer: &KeyPair| {
        TransactionBuilder::new(
            alice.account_id(),
            seq,
            drops(fee),
            TxPayload::SetRegularKey { regular_key: key },
        )
        .sign(signer)
        .unwrap()
    };

    // First key change with the master key is free and spends the password
    let outcome = run(&app, &mut ledger, &set_key(1, 0, Some(regular.account_id()), &alice));
    assert_eq!(outcome.result, Ter::TesSuccess);
    let root = ledger.account(&alice.account_id()).unwrap();
    assert!(root.has_flag(view::LSF_PASSWORD_SPENT));
    assert_eq!(root.regular_key, Some(regular.account_id()));
    assert_eq!(root.balance, drops(10_000));

    let outcome = run(&app, &mut ledger, &set_key(2, 0, None, &alice));
    assert_eq!(outcome.result, Ter::TelInsufFeeP);

    // Disable the master key; the regular key now signs alone
    let disable = TransactionBuilder::new(
        alice.account_id(),
        2,
        drops(BASE_FEE),
        TxPayload::AccountSet {
            set_flag: Some(AccountFlag::DisableMaster),
            clear_flag: None,
        },
    )
    .sign(&regular)
    .unwrap();
    assert_eq!(run(&app, &mut ledger, &disable).result, Ter::TesSuccess);

    let outcome = run(&app, &mut ledger, &set_key(3, BASE_FEE, None, &alice));
    assert_eq!(outcome.result, Ter::TefMasterDisabled);

    // Removing the only alternative key is refused but the fee is claimed
    let outcome = run(&app, &mut ledger, &set_key(3, BASE_FEE, None, &regular));
    assert_eq!(outcome.result, Ter::TecNoAlternativeKey);
    assert!(outcome.applied);
    let root = ledger.account(&alice.account_id()).unwrap();
    assert_eq!(root.regular_key, Some(regular.account_id()));
    assert_eq!(root.sequence, 4);
}

#[test]
fn test_disable_master_needs_alternative() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    ledger.fund(alice.account_id(), drops(10_000));

    let tx = TransactionBuilder::new(
        alice.account_id(),
        1,
        drops(BASE_FEE),
        TxPayload::AccountSet {
            set_flag: Some(AccountFlag::DisableMaster),
            clear_flag: None,
        },
    )
    .sign(&alice)
    .unwrap();

    let outcome = run(&app, &mut ledger, &tx);
    assert_eq!(outcome.result, Ter::TecNoAlternativeKey);
    assert!(outcome.applied);
    assert!(!ledger.account(&alice.account_id()).unwrap().master_disabled());
}

#[derive(Debug, Default)]
struct Exploding;

impl Transactor for Exploding {
    const TX_TYPE: TxType = TxType::Payment;

    fn preflight(_ctx: &PreflightContext<'_>) -> Ter {
        Ter::TesSuccess
    }

    fn do_apply(&mut self, _core: &mut TransactorCore<'_, '_>) -> Ter {
        panic!("exploding transactor")
    }
}

/// Credits the source with CSC from nowhere
#[derive(Debug, Default)]
struct Minting {
    drops: i64,
}

impl Transactor for Minting {
    const TX_TYPE: TxType = TxType::Payment;

    fn preflight(_ctx: &PreflightContext<'_>) -> Ter {
        Ter::TesSuccess
    }

    fn do_apply(&mut self, core: &mut TransactorCore<'_, '_>) -> Ter {
        let account = core.account();
        let mut root = core.view().account(&account).unwrap();
        root.balance = root.balance.checked_add(drops(self.drops.max(1))).unwrap();
        core.view_mut().update(root.into());
        Ter::TesSuccess
    }
}

fn apply_with<T: Transactor>(app: &Application, ledger: &MemoryLedger, tx: &Transaction) -> (Ter, bool, usize) {
    let mut ctx = ApplyContext::new(
        app,
        ledger,
        tx,
        Ter::TesSuccess,
        drops(BASE_FEE),
        ApplyFlags::NONE,
        Journal::new("Test"),
    );
    let (ter, applied) = apply_transactor::<T>(&mut ctx);
    (ter, applied, ctx.into_changes().len())
}

#[test]
fn test_panic_becomes_unclaimable_exception() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    ledger.fund(alice.account_id(), drops(10_000));
    let tx = payment(&alice, keys(2).account_id(), 1, BASE_FEE, 100);

    let (ter, applied, changes) = apply_with::<Exploding>(&app, &ledger, &tx);
    assert_eq!(ter, Ter::TefException);
    assert_eq!(ter.category(), TerCategory::Unclaimable);
    assert!(!applied);
    assert_eq!(changes, 0);
}

/// Changes nothing beyond the sequence and fee
#[derive(Debug, Default)]
struct Inert;

impl Transactor for Inert {
    const TX_TYPE: TxType = TxType::AccountSet;

    fn preflight(_ctx: &PreflightContext<'_>) -> Ter {
        Ter::TesSuccess
    }

    fn do_apply(&mut self, _core: &mut TransactorCore<'_, '_>) -> Ter {
        Ter::TesSuccess
    }
}

#[test]
fn test_exhausted_sequence_is_never_replayed() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    let bob = keys(2).account_id();
    fund_at(&mut ledger, alice.account_id(), 10_000, u32::MAX);
    ledger.fund(bob, drops(1_000));
    let before = ledger.clone();

    let tx = payment(&alice, bob, u32::MAX, BASE_FEE, 100);
    for _ in 0..3 {
        let outcome = run(&app, &mut ledger, &tx);
        assert_eq!(outcome.result, Ter::TemBadSequence);
        assert!(!outcome.applied);
    }
    assert_eq!(ledger, before);
    assert_eq!(balance(&ledger, &bob), drops(1_000));
}

#[test]
fn test_sequence_overflow_in_apply_is_internal_error() {
    let app = app();
    let mut ledger = ledger_for(app.config());
    let alice = keys(1);
    fund_at(&mut ledger, alice.account_id(), 10_000, u32::MAX);
    let tx = payment(&alice, keys(2).account_id(), u32::MAX, BASE_FEE, 100);

    let (ter, applied, changes) = apply_with::<Inert>(&app, &ledger, &tx);
    assert_eq!(ter, Ter::TefInternal);
    assert!(!applied);
    assert_eq!(changes, 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// An apply that breaks an invariant is rolled back completely: no fee,
    /// no sequence bump, nothing reaches the ledger.
    #[test]
    fn property_invariant_failure_rolls_back(minted in 1i64..1_000_000, balance_drops in 1_000i64..1_000_000) {
        let app = app();
        let mut ledger = ledger_for(app.config());
        let alice = keys(1);
        ledger.fund(alice.account_id(), drops(balance_drops));
        let tx = payment(&alice, keys(2).account_id(), 1, BASE_FEE, 100);

        let mut ctx = ApplyContext::new(
            &app,
            &ledger,
            &tx,
            Ter::TesSuccess,
            drops(BASE_FEE),
            ApplyFlags::NONE,
            Journal::new("Test"),
        );
        let mut minting = Minting { drops: minted };
        let (ter, applied) = TransactorCore::new(&mut ctx, tx.fee).run(&mut minting);

        prop_assert_eq!(ter, Ter::TefInvariantFailed);
        prop_assert!(!applied);
        prop_assert!(ctx.into_changes().is_empty());
    }

    /// The same transactions against the same ledger give the same results
    /// and the same ledger hash, every time.
    #[test]
    fn property_apply_is_deterministic(
        payments in prop::collection::vec((0u8..3, 0u8..3, 1i64..3_000, 5i64..30), 1..20)
    ) {
        let accounts: Vec<KeyPair> = (1..=3).map(keys).collect();

        let replay = || {
            let app = app();
            let mut ledger = ledger_for(app.config());
            for k in &accounts {
                ledger.fund(k.account_id(), drops(5_000));
            }
            let mut outcomes = Vec::new();
            for (from, to, amount, fee) in &payments {
                let sender = &accounts[*from as usize];
                let seq = sequence(&ledger, &sender.account_id());
                let tx = payment(sender, accounts[*to as usize].account_id(), seq, *fee, *amount);
                outcomes.push(run(&app, &mut ledger, &tx));
            }
            (outcomes, ledger.state_hash().unwrap(), ledger.total_native())
        };

        let (first, hash_a, total_a) = replay();
        let (second, hash_b, total_b) = replay();
        prop_assert_eq!(first, second);
        prop_assert_eq!(hash_a, hash_b);
        prop_assert_eq!(total_a, total_b);
    }

    /// Whatever a payment's fate, CSC only leaves the ledger as fees.
    #[test]
    fn property_csc_is_conserved(amount in 1i64..20_000, fee in 10i64..100) {
        let app = app();
        let mut ledger = ledger_for(app.config());
        let alice = keys(1);
        let bob = keys(2).account_id();
        ledger.fund(alice.account_id(), drops(10_000));
        ledger.fund(bob, drops(1_000));
        let total_before = ledger.total_native().unwrap();

        let outcome = run(&app, &mut ledger, &payment(&alice, bob, 1, fee, amount));
        let burned = if outcome.applied { fee } else { 0 };
        prop_assert_eq!(
            ledger.total_native().unwrap(),
            total_before.checked_sub(drops(burned)).unwrap()
        );
    }
}
