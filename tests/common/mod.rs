//! Shared fixtures for the integration tests

#![allow(dead_code)]

use csc_transactor::*;

/// Base fee of a small single-signed transaction under `small_fees_config`
pub const BASE_FEE: i64 = 10;
pub const RESERVE_BASE: i64 = 200;
pub const RESERVE_INC: i64 = 50;

/// Fees small enough to reason about by hand: a reference transaction costs
/// 10 drops, the account reserve is 200 drops plus 50 per owned object
pub fn small_fees_config() -> Config {
    Config {
        fee_default: BASE_FEE,
        reference_fee_units: 10,
        account_reserve: RESERVE_BASE,
        owner_reserve: RESERVE_INC,
        ..Config::default()
    }
}

pub fn app_with(config: Config) -> Application {
    Application::new(config).expect("valid config")
}

pub fn app() -> Application {
    app_with(small_fees_config())
}

/// Ledger whose fee schedule comes from `config`
pub fn ledger_for(config: &Config) -> MemoryLedger {
    MemoryLedger::with_info(MemoryLedger::default_info(config))
}

pub fn keys(seed: u64) -> KeyPair {
    KeyPair::from_u64(seed)
}

pub fn drops(n: i64) -> CscAmount {
    CscAmount::from_drops(n)
}

pub fn wlt() -> Currency {
    Currency::from_code("WLT").expect("valid currency")
}

pub fn payment_builder(from: &KeyPair, to: AccountId, seq: u32, fee: i64, amount: i64) -> TransactionBuilder {
    TransactionBuilder::new(
        from.account_id(),
        seq,
        drops(fee),
        TxPayload::Payment {
            destination: to,
            amount: Amount::Native(drops(amount)),
            destination_tag: None,
        },
    )
}

pub fn payment(from: &KeyPair, to: AccountId, seq: u32, fee: i64, amount: i64) -> Transaction {
    payment_builder(from, to, seq, fee, amount)
        .sign(from)
        .expect("signing succeeds")
}

pub fn balance(view: &dyn ReadView, account: &AccountId) -> CscAmount {
    view.account(account)
        .map(|root| root.balance)
        .unwrap_or(CscAmount::ZERO)
}

pub fn sequence(view: &dyn ReadView, account: &AccountId) -> u32 {
    view.account(account).map(|root| root.sequence).unwrap_or(0)
}

/// Run all three phases with a fresh journal
pub fn run(app: &Application, ledger: &mut MemoryLedger, tx: &Transaction) -> ApplyOutcome {
    apply(app, ledger, tx, ApplyFlags::NONE, Journal::new("Test"))
}

/// Preflight and preclaim only; the ledger is never touched
pub fn check(app: &Application, ledger: &MemoryLedger, tx: &Transaction) -> Ter {
    let pf = preflight(
        app,
        Rules::from_view(ledger),
        tx,
        ApplyFlags::NONE,
        Journal::new("Test"),
    );
    preclaim(&pf, app, ledger).ter
}

/// Put an account at an explicit sequence
pub fn fund_at(ledger: &mut MemoryLedger, account: AccountId, balance: i64, seq: u32) {
    ledger.insert(AccountRoot::new(account, drops(balance), seq).into());
}

/// Config with one enabled token, WLT issued by `issuer`, two decimals
pub fn token_config(issuer: &AccountId) -> Config {
    Config {
        tokens: vec![config::TokenSpec {
            currency: "WLT".to_string(),
            issuer: issuer.to_string(),
            total_supply: 1_000_000,
            decimals: 2,
            enabled: true,
        }],
        ..small_fees_config()
    }
}

pub fn wlt_amount(issuer: &AccountId, value: i64, scale: u8) -> Amount {
    Amount::Token(TokenAmount::new(wlt(), *issuer, value, scale))
}
