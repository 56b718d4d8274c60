//! The transactor: per-type extension points and the apply state machine
//!
//! Check functions are associated functions with default bodies. A type
//! overrides one by defining it in its own `impl Transactor`, which replaces
//! the base behavior for that type and only that type. Dispatch is static:
//! `tx::invoke_*` matches on the transaction type and calls the monomorphised
//! functions directly.

use crate::amount::{CscAmount, FeeUnits};
use crate::application::Application;
use crate::checks;
use crate::context::{ApplyContext, ApplyFlags, PreclaimContext, PreflightContext};
use crate::error::Ter;
use crate::fee::fee_to_charge;
use crate::logging::Journal;
use crate::transaction::Transaction;
use crate::types::{AccountId, TxType};
use crate::view::{erase_offer, AccountRoot, ApplyView, LedgerEntryType, Offer, ReadView, Sandbox};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub trait Transactor: Default {
    const TX_TYPE: TxType;

    /// Stateless checks; most types end by running `preflight2`
    fn preflight(ctx: &PreflightContext<'_>) -> Ter;

    fn check_seq(ctx: &PreclaimContext<'_>) -> Ter {
        checks::check_seq(ctx)
    }

    fn check_fee(ctx: &PreclaimContext<'_>, base_units: FeeUnits) -> Ter {
        checks::check_fee(ctx, base_units)
    }

    fn check_sign(ctx: &PreclaimContext<'_>) -> Ter {
        checks::check_sign(ctx)
    }

    fn check_wlt(ctx: &PreclaimContext<'_>) -> Ter {
        checks::check_wlt(ctx)
    }

    fn check_blacklist(ctx: &PreclaimContext<'_>) -> Ter {
        checks::check_blacklist(ctx)
    }

    fn check_whitelist(ctx: &PreclaimContext<'_>) -> Ter {
        checks::check_whitelist(ctx)
    }

    fn check_memo_size(ctx: &PreclaimContext<'_>) -> Ter {
        checks::check_memo_size(ctx)
    }

    /// Fee units owed, not scaled for load
    fn calculate_base_fee(ctx: &PreclaimContext<'_>) -> FeeUnits {
        checks::calculate_base_fee(ctx)
    }

    /// Whether applying this can change who may sign later transactions
    fn affects_subsequent_transaction_auth(_tx: &Transaction) -> bool {
        false
    }

    fn calculate_fee_paid(tx: &Transaction) -> CscAmount {
        crate::fee::calculate_fee_paid(tx)
    }

    /// CSC the transaction could move out of the account, excluding the fee
    fn calculate_max_spend(_tx: &Transaction) -> CscAmount {
        CscAmount::ZERO
    }

    /// Type-specific checks against the read-only view
    fn preclaim(_ctx: &PreclaimContext<'_>) -> Ter {
        Ter::TesSuccess
    }

    /// Runs before the sequence bump and fee
    fn pre_compute(&mut self, _core: &mut TransactorCore<'_, '_>) {}

    /// The type's effect. Sees the account after its sequence bump and fee.
    fn do_apply(&mut self, core: &mut TransactorCore<'_, '_>) -> Ter;
}

/// Working state of one apply
pub struct TransactorCore<'c, 'a> {
    ctx: &'c mut ApplyContext<'a>,
    journal: Journal,
    account: AccountId,
    fee_due: CscAmount,
    fee_charged: CscAmount,
    prior_balance: CscAmount,
    source_balance: CscAmount,
}

impl<'c, 'a> TransactorCore<'c, 'a> {
    pub fn new(ctx: &'c mut ApplyContext<'a>, fee_paid: CscAmount) -> Self {
        let fee_due = fee_to_charge(ctx.app.config().fee_policy, fee_paid, ctx.base_fee);
        Self {
            journal: ctx.journal.partition("Transactor"),
            account: ctx.tx.account,
            fee_due,
            fee_charged: CscAmount::ZERO,
            prior_balance: CscAmount::ZERO,
            source_balance: CscAmount::ZERO,
            ctx,
        }
    }

    pub fn app(&self) -> &'a Application {
        self.ctx.app
    }

    pub fn tx(&self) -> &'a Transaction {
        self.ctx.tx
    }

    pub fn flags(&self) -> ApplyFlags {
        self.ctx.flags
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn view(&self) -> &Sandbox<'a> {
        self.ctx.view()
    }

    pub fn view_mut(&mut self) -> &mut Sandbox<'a> {
        self.ctx.view_mut()
    }

    /// Source account
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Fee this transaction is charged under the configured policy
    pub fn fee_due(&self) -> CscAmount {
        self.fee_due
    }

    /// Balance before the fee
    pub fn prior_balance(&self) -> CscAmount {
        self.prior_balance
    }

    /// Balance after the fee
    pub fn source_balance(&self) -> CscAmount {
        self.source_balance
    }

    /// Remove an offer as a side effect; it stays removed even if the
    /// transaction fails with a claimable code
    pub fn remove_offer(&mut self, offer: &Offer) {
        erase_offer(self.ctx.view_mut(), offer);
        self.ctx.record_removed_offer(offer.clone());
    }

    /// Run the whole apply and return `(result, applied)`
    pub fn run<T: Transactor>(&mut self, transactor: &mut T) -> (Ter, bool) {
        self.journal
            .trace(format!("apply: {} {}", T::TX_TYPE, self.tx().hash));

        let mut result = self.ctx.preclaim_result;
        if result.is_tes() {
            let outcome = catch_unwind(AssertUnwindSafe(|| self.apply(transactor)));
            result = outcome.unwrap_or_else(|panic| {
                self.journal
                    .error(format!("apply: caught panic: {}", panic_message(&*panic)));
                Ter::TefException
            });
        }

        let mut applied = result.is_tes();
        let may_claim = !self.flags().contains(ApplyFlags::RETRY)
            && !self.flags().contains(ApplyFlags::FAIL_HARD);

        if result.is_tec() && may_claim {
            // Only the fee and sequence survive a claimable failure
            self.ctx.discard();
            applied = self.claim_fee(result);
        } else if !applied {
            self.ctx.discard();
        }

        if applied {
            if let Err(reason) = self.check_invariants() {
                self.journal
                    .error(format!("Transaction has failed one or more invariants: {}", reason));
                self.ctx.discard();
                result = Ter::TefInvariantFailed;
                applied = false;
            }
        }

        self.journal
            .debug(format!("apply: {} applied={}", result.token(), applied));
        (result, applied)
    }

    fn apply<T: Transactor>(&mut self, transactor: &mut T) -> Ter {
        transactor.pre_compute(self);

        let Some(mut root) = self.view().account(&self.account) else {
            return Ter::TerNoAccount;
        };

        self.prior_balance = root.balance;
        self.source_balance = root.balance;

        let result = self.set_seq(&mut root);
        if !result.is_tes() {
            return result;
        }

        let result = self.pay_fee(&mut root);
        if !result.is_tes() {
            return result;
        }

        self.view_mut().update(root.into());

        transactor.do_apply(self)
    }

    fn set_seq(&self, root: &mut AccountRoot) -> Ter {
        match self.tx().sequence.checked_add(1) {
            Some(next) => {
                root.sequence = next;
                Ter::TesSuccess
            }
            None => {
                self.journal.error("set_seq: sequence overflow");
                Ter::TefInternal
            }
        }
    }

    fn pay_fee(&mut self, root: &mut AccountRoot) -> Ter {
        let fee = self.fee_due;

        if fee.is_negative() || !fee.is_legal() {
            return Ter::TemBadFee;
        }

        if fee.is_zero() {
            return Ter::TesSuccess;
        }

        // Preclaim ran against the same base view, so this only trips when
        // a caller skipped it
        let Some(remaining) = self
            .source_balance
            .checked_sub(fee)
            .filter(|b| !b.is_negative())
        else {
            self.journal.trace(format!(
                "Insufficient balance: balance={} paid={}",
                self.source_balance, fee
            ));
            return Ter::TerInsufFeeB;
        };

        self.source_balance = remaining;
        self.fee_charged = fee;
        root.balance = remaining;
        Ter::TesSuccess
    }

    /// Charge sequence and fee only, then re-delete removed offers
    fn claim_fee(&mut self, result: Ter) -> bool {
        let Some(mut root) = self.view().account(&self.account) else {
            return false;
        };

        let fee = std::cmp::min(
            self.fee_due.max(CscAmount::ZERO),
            root.balance.max(CscAmount::ZERO),
        );
        if !self.set_seq(&mut root).is_tes() {
            return false;
        }
        root.balance = root.balance.checked_sub(fee).unwrap_or(root.balance);
        self.fee_charged = fee;
        self.view_mut().update(root.into());

        let removed = self.ctx.take_removed_offers();
        for offer in &removed {
            if self.view().offer(&offer.owner, offer.sequence).is_some() {
                erase_offer(self.ctx.view_mut(), offer);
            }
        }

        self.journal.debug(format!(
            "claim_fee: {} charged {} and removed {} offers",
            result.token(),
            fee,
            removed.len()
        ));
        true
    }

    /// CSC is never created and the source account advanced exactly one sequence
    fn check_invariants(&self) -> Result<(), String> {
        let base = self.ctx.base();
        let mut delta: i128 = 0;

        for (keylet, change) in self.view().changes().iter() {
            if keylet.entry_type != LedgerEntryType::AccountRoot {
                continue;
            }
            let before = base
                .read(keylet)
                .map(|e| e.native_balance())
                .unwrap_or(CscAmount::ZERO);
            let after = change
                .as_ref()
                .map(|e| e.native_balance())
                .unwrap_or(CscAmount::ZERO);
            if after.is_negative() {
                return Err(format!("negative balance {}", after));
            }
            delta += i128::from(after.drops()) - i128::from(before.drops());
        }

        if delta != -i128::from(self.fee_charged.drops()) {
            return Err(format!(
                "CSC changed by {} drops, fee charged {}",
                delta, self.fee_charged
            ));
        }

        match self.view().account(&self.account) {
            Some(root) if self.tx().sequence.checked_add(1) == Some(root.sequence) => Ok(()),
            _ => Err("source account sequence did not advance by one".to_string()),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Apply one transaction of type `T` inside `ctx`
pub fn apply_transactor<T: Transactor>(ctx: &mut ApplyContext<'_>) -> (Ter, bool) {
    let fee_paid = T::calculate_fee_paid(ctx.tx);
    let mut transactor = T::default();
    TransactorCore::new(ctx, fee_paid).run(&mut transactor)
}
