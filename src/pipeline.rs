//! Preflight, preclaim and apply tied together
//!
//! Each phase hands a result struct to the next. A failed phase is carried
//! forward unchanged, so `do_apply` on a rejected transaction is a no-op that
//! still reports the original code.

use crate::amount::CscAmount;
use crate::application::Application;
use crate::context::{ApplyContext, ApplyFlags, PreclaimContext, PreflightContext};
use crate::error::Ter;
use crate::hasher::extend_chain;
use crate::logging::Journal;
use crate::rules::Rules;
use crate::transaction::Transaction;
use crate::tx;
use crate::types::{ApplyTrace, TxRecord};
use crate::view::{ApplyView, ReadView};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Outcome of the stateless phase
#[derive(Debug, Clone)]
pub struct PreflightResult<'a> {
    pub tx: &'a Transaction,
    pub rules: Rules,
    pub flags: ApplyFlags,
    pub journal: Journal,
    pub ter: Ter,
}

/// Outcome of the read-only phase
#[derive(Debug, Clone)]
pub struct PreclaimResult<'a> {
    pub tx: &'a Transaction,
    pub flags: ApplyFlags,
    pub journal: Journal,
    pub ter: Ter,
    /// Load-scaled base fee, zero if preclaim stopped before the fee check
    pub base_fee: CscAmount,
    /// Applying would at least charge the fee
    pub likely_to_claim_fee: bool,
    /// Sequence of the ledger preclaim ran against
    pub ledger_seq: u32,
}

/// The `{result, applied}` pair a node reports for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub result: Ter,
    pub applied: bool,
}

impl ApplyOutcome {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "engine_result": self.result.token(),
            "engine_result_code": self.result.code(),
            "engine_result_message": self.result.message(),
            "applied": self.applied,
        })
    }
}

impl From<(Ter, bool)> for ApplyOutcome {
    fn from((result, applied): (Ter, bool)) -> Self {
        Self { result, applied }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsequenceCategory {
    Normal,
    /// Can change who may sign later transactions from the same account
    Blocker,
}

/// What a queued transaction could do to its account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxConsequences {
    pub category: ConsequenceCategory,
    pub fee: CscAmount,
    pub potential_spend: CscAmount,
    pub sequence: u32,
}

pub fn preflight<'a>(
    app: &Application,
    rules: Rules,
    tx: &'a Transaction,
    flags: ApplyFlags,
    journal: Journal,
) -> PreflightResult<'a> {
    let ctx = PreflightContext::new(app, tx, rules, flags, journal);

    let ter = catch_unwind(AssertUnwindSafe(|| tx::invoke_preflight(&ctx))).unwrap_or_else(|_| {
        ctx.journal.error("preflight: caught panic");
        Ter::TefException
    });

    PreflightResult {
        tx,
        rules: ctx.rules,
        flags,
        journal: ctx.journal,
        ter,
    }
}

/// Preflight many transactions in parallel; results keep the input order
pub fn preflight_batch<'a>(
    app: &Application,
    rules: &Rules,
    txs: &'a [Transaction],
    flags: ApplyFlags,
    journal: &Journal,
) -> Vec<PreflightResult<'a>> {
    txs.par_iter()
        .map(|tx| preflight(app, rules.clone(), tx, flags, journal.clone()))
        .collect()
}

pub fn preclaim<'a>(
    preflight_result: &PreflightResult<'a>,
    app: &Application,
    view: &dyn ReadView,
) -> PreclaimResult<'a> {
    let tx = preflight_result.tx;

    // Amendments changed since preflight; its verdict may no longer hold
    let rules = Rules::from_view(view);
    let refreshed;
    let preflight_result = if preflight_result.rules != rules {
        preflight_result
            .journal
            .debug("preclaim: rules changed, running preflight again");
        refreshed = preflight(
            app,
            rules,
            tx,
            preflight_result.flags,
            preflight_result.journal.clone(),
        );
        &refreshed
    } else {
        preflight_result
    };

    let ctx = PreclaimContext::new(
        app,
        view,
        preflight_result.ter,
        tx,
        preflight_result.flags,
        preflight_result.journal.clone(),
    );

    let (ter, base_fee) = if ctx.preflight_result.is_tes() {
        catch_unwind(AssertUnwindSafe(|| tx::invoke_preclaim(&ctx))).unwrap_or_else(|_| {
            ctx.journal.error("preclaim: caught panic");
            (Ter::TefException, CscAmount::ZERO)
        })
    } else {
        (ctx.preflight_result, CscAmount::ZERO)
    };

    PreclaimResult {
        tx,
        flags: ctx.flags,
        journal: ctx.journal,
        ter,
        base_fee,
        likely_to_claim_fee: ter.is_tes() || ter.is_tec(),
        ledger_seq: view.seq(),
    }
}

/// Apply against `view`. Changes reach the view only when applied.
pub fn do_apply<V: ApplyView>(
    preclaim_result: &PreclaimResult<'_>,
    app: &Application,
    view: &mut V,
) -> (Ter, bool) {
    if preclaim_result.ledger_seq != view.seq() {
        // Preclaim ran against another ledger; check again against this one
        let pf = preflight(
            app,
            Rules::from_view(&*view),
            preclaim_result.tx,
            preclaim_result.flags,
            preclaim_result.journal.clone(),
        );
        let pc = preclaim(&pf, app, &*view);
        return do_apply(&pc, app, view);
    }

    if !preclaim_result.likely_to_claim_fee {
        return (preclaim_result.ter, false);
    }

    let (ter, applied, changes) = {
        let mut ctx = ApplyContext::new(
            app,
            &*view,
            preclaim_result.tx,
            preclaim_result.ter,
            preclaim_result.base_fee,
            preclaim_result.flags,
            preclaim_result.journal.clone(),
        );
        let (ter, applied) = tx::invoke_apply(&mut ctx);
        (ter, applied, ctx.into_changes())
    };

    if applied {
        changes.apply_to(view);
    }
    (ter, applied)
}

/// All three phases against one view
pub fn apply<V: ApplyView>(
    app: &Application,
    view: &mut V,
    tx: &Transaction,
    flags: ApplyFlags,
    journal: Journal,
) -> ApplyOutcome {
    let pf = preflight(app, Rules::from_view(&*view), tx, flags, journal);
    let pc = preclaim(&pf, app, &*view);
    do_apply(&pc, app, view).into()
}

pub fn calculate_consequences(preflight_result: &PreflightResult<'_>) -> TxConsequences {
    let tx = preflight_result.tx;
    if !preflight_result.ter.is_tes() {
        return TxConsequences {
            category: ConsequenceCategory::Normal,
            fee: CscAmount::ZERO,
            potential_spend: CscAmount::ZERO,
            sequence: tx.sequence,
        };
    }

    let category = if tx::invoke_affects_subsequent_transaction_auth(tx) {
        ConsequenceCategory::Blocker
    } else {
        ConsequenceCategory::Normal
    };

    TxConsequences {
        category,
        fee: tx::invoke_calculate_fee_paid(tx),
        potential_spend: tx::invoke_calculate_max_spend(tx),
        sequence: tx.sequence,
    }
}

/// Passes over a batch; every pass but the last sets `RETRY`
pub const LEDGER_TOTAL_PASSES: usize = 3;

/// Applies transactions to a ledger in canonical order and keeps an audit trace
#[derive(Debug)]
pub struct LedgerApplier<'a, V: ApplyView> {
    app: &'a Application,
    view: V,
    trace: ApplyTrace,
    journal: Journal,
}

impl<'a, V: ApplyView> LedgerApplier<'a, V> {
    pub fn new(app: &'a Application, view: V) -> Self {
        Self {
            journal: app.journal("LedgerApplier"),
            app,
            view,
            trace: ApplyTrace::default(),
        }
    }

    /// Apply one transaction immediately
    pub fn apply_transaction(&mut self, tx: &Transaction, flags: ApplyFlags) -> ApplyOutcome {
        let outcome = apply(self.app, &mut self.view, tx, flags, self.journal.clone());
        self.record(tx, outcome, 1);
        outcome
    }

    /// Apply a batch in canonical order `(account, sequence, id)`.
    ///
    /// Transactions that fail with a retry code, or with a claimable code
    /// while `RETRY` is set, are tried again on the next pass so that a
    /// later sequence can follow an earlier one that was out of order.
    /// Returns outcomes in the input order.
    pub fn apply_batch(&mut self, txs: &[Transaction], flags: ApplyFlags) -> Vec<ApplyOutcome> {
        let rules = Rules::from_view(&self.view);
        let preflights = preflight_batch(self.app, &rules, txs, flags, &self.journal);

        let mut order: Vec<usize> = (0..txs.len()).collect();
        order.sort_by(|&a, &b| {
            let (ta, tb) = (&txs[a], &txs[b]);
            (ta.account, ta.sequence, ta.hash).cmp(&(tb.account, tb.sequence, tb.hash))
        });

        let mut outcomes: Vec<Option<ApplyOutcome>> = vec![None; txs.len()];
        let mut pending = order;
        let mut pass = 0;

        while !pending.is_empty() && pass < LEDGER_TOTAL_PASSES {
            let last = pass + 1 == LEDGER_TOTAL_PASSES;
            let pass_flags = if last { flags } else { flags | ApplyFlags::RETRY };
            let mut retry = Vec::new();
            let mut changed = false;

            for index in pending {
                let mut pf = preflights[index].clone();
                pf.flags = pass_flags;
                let pc = preclaim(&pf, self.app, &self.view);
                let outcome: ApplyOutcome = do_apply(&pc, self.app, &mut self.view).into();

                let retryable = !outcome.applied
                    && (outcome.result.is_ter() || (outcome.result.is_tec() && !last));
                if retryable && !last {
                    retry.push(index);
                    continue;
                }

                changed |= outcome.applied;
                self.record(&txs[index], outcome, pass + 1);
                outcomes[index] = Some(outcome);
            }

            self.journal.debug(format!(
                "apply_batch: pass {} left {} to retry",
                pass + 1,
                retry.len()
            ));

            pending = retry;
            pass += 1;
            // Nothing moved; jump to the final pass so claimable codes settle
            if !changed && pass + 1 < LEDGER_TOTAL_PASSES {
                pass = LEDGER_TOTAL_PASSES - 1;
            }
        }

        outcomes
            .into_iter()
            .map(|o| {
                o.unwrap_or(ApplyOutcome {
                    result: Ter::TefInternal,
                    applied: false,
                })
            })
            .collect()
    }

    fn record(&mut self, tx: &Transaction, outcome: ApplyOutcome, pass: usize) {
        self.trace.transactions_processed += 1;
        if outcome.applied {
            self.trace.transactions_applied += 1;
            self.trace.chain_hash = extend_chain(&self.trace.chain_hash, &tx.hash);
        }
        self.trace.records.push(TxRecord {
            tx_hash: tx.hash,
            result: outcome.result,
            applied: outcome.applied,
            pass,
        });
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn trace(&self) -> &ApplyTrace {
        &self.trace
    }

    /// Consume the applier and return the ledger and its trace
    pub fn into_result(self) -> (V, ApplyTrace) {
        (self.view, self.trace)
    }
}
