//! Base preclaim checks
//!
//! These are the default bodies of the [`Transactor`](crate::transactor::Transactor)
//! check functions. A transaction type that overrides a check replaces the
//! base behavior completely; it may still call the function here itself.

use crate::amount::{CscAmount, FeeUnits};
use crate::compliance::is_wlt_compliant;
use crate::context::{ApplyFlags, PreclaimContext};
use crate::error::Ter;
use crate::fee::{base_fee_units, fee_to_charge, scale_fee_load};
use crate::rules::Feature;

/// Sequence must match the account exactly; last ledger must not have passed
pub fn check_seq(ctx: &PreclaimContext<'_>) -> Ter {
    let tx = ctx.tx;

    let Some(root) = ctx.view.account(&tx.account) else {
        ctx.journal.trace(format!(
            "applyTransaction: delay: source account {} does not exist",
            tx.account
        ));
        return Ter::TerNoAccount;
    };

    if tx.sequence != root.sequence {
        if tx.sequence < root.sequence {
            ctx.journal.trace(format!(
                "applyTransaction: has past sequence number a_seq={} t_seq={}",
                root.sequence, tx.sequence
            ));
            return Ter::TefPastSeq;
        }
        ctx.journal.trace(format!(
            "applyTransaction: has future sequence number a_seq={} t_seq={}",
            root.sequence, tx.sequence
        ));
        return Ter::TerPreSeq;
    }

    if let Some(last) = tx.last_ledger_sequence {
        if ctx.view.seq() > last {
            return Ter::TefMaxLedger;
        }
    }

    Ter::TesSuccess
}

/// Base fee in drops, scaled for load unless the submission is admin
pub fn scaled_base_fee(ctx: &PreclaimContext<'_>, base_units: FeeUnits) -> Option<CscAmount> {
    scale_fee_load(
        base_units,
        ctx.view.fees(),
        ctx.app.fee_track().load_factor(),
        ctx.flags.contains(ApplyFlags::ADMIN),
    )
}

/// Offered fee covers the load-scaled base fee; balance covers the fee that
/// will be charged plus the reserve
pub fn check_fee(ctx: &PreclaimContext<'_>, base_units: FeeUnits) -> Ter {
    let offered = ctx.tx.fee;

    if offered.is_negative() || !offered.is_legal() {
        return Ter::TemBadFee;
    }

    let Some(required) = scaled_base_fee(ctx, base_units) else {
        ctx.journal.warn("check_fee: base fee overflows");
        return Ter::TelInsufFeeP;
    };

    if offered < required {
        ctx.journal
            .trace(format!("Insufficient fee paid: {} / {}", offered, required));
        return Ter::TelInsufFeeP;
    }

    // Only a zero fee may be waived here; it already cleared the base fee
    if offered.is_zero() {
        return Ter::TesSuccess;
    }

    let Some(root) = ctx.view.account(&ctx.tx.account) else {
        return Ter::TerNoAccount;
    };

    let due = fee_to_charge(ctx.app.config().fee_policy, offered, required);
    let needed = ctx
        .view
        .fees()
        .account_reserve(root.owner_count)
        .and_then(|reserve| reserve.checked_add(due));

    match needed {
        Some(needed) if root.balance >= needed => Ter::TesSuccess,
        _ => {
            ctx.journal.trace(format!(
                "Insufficient balance: balance={} paid={}",
                root.balance, due
            ));
            Ter::TerInsufFeeB
        }
    }
}

/// Dispatch on whether the transaction carries a signer array
pub fn check_sign(ctx: &PreclaimContext<'_>) -> Ter {
    if ctx.flags.contains(ApplyFlags::NO_CHECK_SIGN) {
        return Ter::TesSuccess;
    }
    if ctx.tx.is_multi_signed() {
        check_multi_sign(ctx)
    } else {
        check_single_sign(ctx)
    }
}

/// The signing key must be the account's enabled master key or its regular key
pub fn check_single_sign(ctx: &PreclaimContext<'_>) -> Ter {
    let tx = ctx.tx;

    let Some(key) = &tx.signing_pub_key else {
        return Ter::TefBadAuth;
    };
    let Some(root) = ctx.view.account(&tx.account) else {
        return Ter::TerNoAccount;
    };

    let signer = key.account_id();

    if signer == tx.account {
        if root.master_disabled() {
            return Ter::TefMasterDisabled;
        }
        return Ter::TesSuccess;
    }

    match root.regular_key {
        Some(regular) if regular == signer => Ter::TesSuccess,
        Some(_) => {
            ctx.journal.trace("applyTransaction: delay: not authorized to use account");
            Ter::TefBadAuth
        }
        None => {
            ctx.journal.trace("applyTransaction: invalid: not authorized to use account");
            Ter::TefBadAuthMaster
        }
    }
}

/// Every signer must be listed and authorized; weights must reach quorum
pub fn check_multi_sign(ctx: &PreclaimContext<'_>) -> Ter {
    let tx = ctx.tx;

    let Some(list) = ctx.view.signer_list(&tx.account) else {
        ctx.journal.trace("applyTransaction: invalid: not a multi-signing account");
        return Ter::TefNotMultiSigning;
    };

    let mut weight_sum: u32 = 0;
    for signer in &tx.signers {
        let Some(weight) = list.weight_of(&signer.account) else {
            ctx.journal.trace(format!(
                "applyTransaction: invalid signer {} not in signer list",
                signer.account
            ));
            return Ter::TefBadSignature;
        };

        let signing_id = signer.signing_pub_key.account_id();
        let signer_root = ctx.view.account(&signer.account);

        if signing_id == signer.account {
            // Master key of the signer; a phantom signer account may sign
            // with its master key
            if signer_root.as_ref().is_some_and(|r| r.master_disabled()) {
                ctx.journal.trace("applyTransaction: signer: master key disabled");
                return Ter::TefMasterDisabled;
            }
        } else {
            let authorized = signer_root
                .as_ref()
                .and_then(|r| r.regular_key)
                .is_some_and(|regular| regular == signing_id);
            if !authorized {
                ctx.journal.trace(format!(
                    "applyTransaction: signer {} used an unauthorized key",
                    signer.account
                ));
                return Ter::TefBadSignature;
            }
        }

        weight_sum += u32::from(weight);
    }

    if weight_sum < list.quorum {
        ctx.journal.trace(format!(
            "applyTransaction: signers failed to meet quorum {} < {}",
            weight_sum, list.quorum
        ));
        return Ter::TefBadQuorum;
    }

    Ter::TesSuccess
}

pub fn check_blacklist(ctx: &PreclaimContext<'_>) -> Ter {
    let snapshot = ctx.app.compliance().snapshot();
    if snapshot.is_blacklisted(&ctx.tx.account) {
        ctx.journal.info(format!("Account {} is blacklisted", ctx.tx.account));
        return Ter::TefBlacklisted;
    }
    Ter::TesSuccess
}

/// Only enforced while allow-list mode is active
pub fn check_whitelist(ctx: &PreclaimContext<'_>) -> Ter {
    let snapshot = ctx.app.compliance().snapshot();
    if !snapshot.is_whitelisted(&ctx.tx.account) {
        ctx.journal.info(format!("Account {} is not whitelisted", ctx.tx.account));
        return Ter::TefNotWhitelisted;
    }
    Ter::TesSuccess
}

/// Every token amount in the payload must be a configured, compliant token
pub fn check_wlt(ctx: &PreclaimContext<'_>) -> Ter {
    let amounts = ctx.tx.payload.token_amounts();
    if amounts.is_empty() {
        return Ter::TesSuccess;
    }

    if !ctx.view.rules().enabled(Feature::WltTokens) {
        return Ter::TemDisabled;
    }

    let snapshot = ctx.app.compliance().snapshot();
    for amount in amounts {
        if amount.currency.is_bad() {
            return Ter::TemBadCurrency;
        }
        let Some(token) = snapshot.token(&amount.currency) else {
            ctx.journal.debug(format!("Token {} is not configured", amount.currency));
            return Ter::TefWltNonCompliant;
        };
        let ret = is_wlt_compliant(amount, token, &ctx.journal);
        if !ret.is_tes() {
            return ret;
        }
    }
    Ter::TesSuccess
}

pub fn check_memo_size(ctx: &PreclaimContext<'_>) -> Ter {
    let size = ctx.tx.memo_size();
    let max = ctx.app.config().max_memo_size;
    if size > max {
        ctx.journal.debug(format!("Memo size {} exceeds maximum {}", size, max));
        return Ter::TelMemoTooLarge;
    }
    Ter::TesSuccess
}

/// Default fee units, not scaled for load
pub fn calculate_base_fee(ctx: &PreclaimContext<'_>) -> FeeUnits {
    base_fee_units(ctx.tx, ctx.view.fees())
}
