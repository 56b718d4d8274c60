//! Transaction types and the static dispatch registry
//!
//! Every `invoke_*` function matches the transaction type once and calls the
//! type's monomorphised [`Transactor`] functions. Adding a type means adding
//! one arm to `dispatch!`.

pub mod account_set;
pub mod offer;
pub mod payment;
pub mod set_regular_key;
pub mod signer_list_set;

pub use account_set::AccountSet;
pub use offer::{OfferCancel, OfferCreate};
pub use payment::Payment;
pub use set_regular_key::SetRegularKey;
pub use signer_list_set::SignerListSet;

use crate::amount::CscAmount;
use crate::checks::scaled_base_fee;
use crate::context::{ApplyContext, PreclaimContext, PreflightContext};
use crate::error::Ter;
use crate::transaction::Transaction;
use crate::transactor::{apply_transactor, Transactor};
use crate::types::TxType;

macro_rules! dispatch {
    ($tx_type:expr, $func:ident($($arg:expr),*)) => {
        match $tx_type {
            TxType::Payment => $func::<Payment>($($arg),*),
            TxType::AccountSet => $func::<AccountSet>($($arg),*),
            TxType::SetRegularKey => $func::<SetRegularKey>($($arg),*),
            TxType::SignerListSet => $func::<SignerListSet>($($arg),*),
            TxType::OfferCreate => $func::<OfferCreate>($($arg),*),
            TxType::OfferCancel => $func::<OfferCancel>($($arg),*),
        }
    };
}

pub fn invoke_preflight(ctx: &PreflightContext<'_>) -> Ter {
    match ctx.tx.tx_type() {
        Some(tx_type) => dispatch!(tx_type, preflight_for(ctx)),
        None => {
            ctx.journal.warn("invoke_preflight: unknown transaction type");
            Ter::TemUnknown
        }
    }
}

/// Run the preclaim checks; returns the result and the load-scaled base fee
pub fn invoke_preclaim(ctx: &PreclaimContext<'_>) -> (Ter, CscAmount) {
    match ctx.tx.tx_type() {
        Some(tx_type) => dispatch!(tx_type, preclaim_for(ctx)),
        None => (Ter::TemUnknown, CscAmount::ZERO),
    }
}

pub fn invoke_apply(ctx: &mut ApplyContext<'_>) -> (Ter, bool) {
    match ctx.tx.tx_type() {
        Some(tx_type) => dispatch!(tx_type, apply_transactor(ctx)),
        None => (Ter::TemUnknown, false),
    }
}

pub fn invoke_affects_subsequent_transaction_auth(tx: &Transaction) -> bool {
    match tx.tx_type() {
        Some(tx_type) => dispatch!(tx_type, affects_auth_for(tx)),
        None => false,
    }
}

pub fn invoke_calculate_fee_paid(tx: &Transaction) -> CscAmount {
    match tx.tx_type() {
        Some(tx_type) => dispatch!(tx_type, fee_paid_for(tx)),
        None => CscAmount::ZERO,
    }
}

pub fn invoke_calculate_max_spend(tx: &Transaction) -> CscAmount {
    match tx.tx_type() {
        Some(tx_type) => dispatch!(tx_type, max_spend_for(tx)),
        None => CscAmount::ZERO,
    }
}

fn preflight_for<T: Transactor>(ctx: &PreflightContext<'_>) -> Ter {
    T::preflight(ctx)
}

/// Fixed check order. Memo size is a pure function of the transaction and
/// config, so it goes first; sequence and fee are the common cheap rejections;
/// compliance lookups and signer-list walks come after them.
fn preclaim_for<T: Transactor>(ctx: &PreclaimContext<'_>) -> (Ter, CscAmount) {
    let ret = T::check_memo_size(ctx);
    if !ret.is_tes() {
        return (ret, CscAmount::ZERO);
    }

    let ret = T::check_seq(ctx);
    if !ret.is_tes() {
        return (ret, CscAmount::ZERO);
    }

    let base_units = T::calculate_base_fee(ctx);
    let ret = T::check_fee(ctx, base_units);
    if !ret.is_tes() {
        return (ret, CscAmount::ZERO);
    }
    let base_fee = scaled_base_fee(ctx, base_units).unwrap_or(CscAmount::ZERO);

    let checks: [fn(&PreclaimContext<'_>) -> Ter; 5] = [
        T::check_blacklist,
        T::check_whitelist,
        T::check_wlt,
        T::check_sign,
        T::preclaim,
    ];
    for check in checks {
        let ret = check(ctx);
        if !ret.is_tes() {
            return (ret, base_fee);
        }
    }

    (Ter::TesSuccess, base_fee)
}

fn affects_auth_for<T: Transactor>(tx: &Transaction) -> bool {
    T::affects_subsequent_transaction_auth(tx)
}

fn fee_paid_for<T: Transactor>(tx: &Transaction) -> CscAmount {
    T::calculate_fee_paid(tx)
}

fn max_spend_for<T: Transactor>(tx: &Transaction) -> CscAmount {
    T::calculate_max_spend(tx)
}
