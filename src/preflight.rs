//! Stateless transaction checks
//!
//! Pure functions of a [`PreflightContext`]: no ledger access, no side effects
//! other than journal lines. A type's preflight runs `preflight1` (which runs
//! `preflight0`), then its own field checks, then `preflight2` last because
//! signature verification is the expensive part.

use crate::context::{ApplyFlags, PreflightContext};
use crate::crypto::verify_signature;
use crate::error::Ter;
use crate::rules::Feature;
use crate::serialization::{multi_signing_bytes, signing_bytes};
use crate::transaction::{Transaction, MAX_MULTI_SIGNERS, TF_UNIVERSAL_MASK};

/// Transaction id and type
pub fn preflight0(ctx: &PreflightContext<'_>) -> Ter {
    let tx = ctx.tx;

    if tx.hash.is_zero() {
        ctx.journal.warn("applyTransaction: invalid transaction id");
        return Ter::TemInvalid;
    }

    match tx.compute_hash() {
        Ok(id) if id == tx.hash => {}
        Ok(_) => {
            ctx.journal.warn("applyTransaction: transaction id does not match content");
            return Ter::TemInvalid;
        }
        Err(e) => {
            ctx.journal.warn(format!("applyTransaction: cannot encode transaction: {}", e));
            return Ter::TemMalformed;
        }
    }

    if tx.tx_type().is_none() {
        ctx.journal.warn("applyTransaction: unknown transaction type");
        return Ter::TemUnknown;
    }

    Ter::TesSuccess
}

/// Account, fee, network, sequence, memo and flag fields
pub fn preflight1(ctx: &PreflightContext<'_>) -> Ter {
    let ret = preflight0(ctx);
    if !ret.is_tes() {
        return ret;
    }

    let tx = ctx.tx;
    let config = ctx.app.config();

    if tx.account.is_zero() {
        ctx.journal.warn("preflight1: bad account");
        return Ter::TemBadSrcAccount;
    }

    match tx.network_id {
        Some(id) if id != config.network_id => {
            ctx.journal.warn(format!(
                "preflight1: network id {} does not match node network {}",
                id, config.network_id
            ));
            return Ter::TelWrongNetwork;
        }
        None if config.require_network_id => {
            ctx.journal.warn("preflight1: network id required");
            return Ter::TelRequiresNetworkId;
        }
        _ => {}
    }

    if tx.fee.is_negative() || !tx.fee.is_legal() {
        ctx.journal.debug(format!("preflight1: invalid fee {}", tx.fee));
        return Ter::TemBadFee;
    }

    if tx.sequence == 0 {
        ctx.journal.debug("preflight1: zero sequence");
        return Ter::TemBadSequence;
    }

    // The account could never advance past it
    if tx.sequence == u32::MAX {
        ctx.journal.debug("preflight1: sequence exhausted");
        return Ter::TemBadSequence;
    }

    if !tx.memos.iter().all(|m| m.is_well_formed()) {
        ctx.journal.debug("preflight1: malformed memo");
        return Ter::TemInvalid;
    }

    if tx.flags & !TF_UNIVERSAL_MASK != 0 {
        ctx.journal.debug(format!("preflight1: invalid flags {:#x}", tx.flags));
        return Ter::TemInvalidFlag;
    }

    if tx.is_multi_signed() && !ctx.rules.enabled(Feature::MultiSign) {
        ctx.journal.debug("preflight1: multi-signing is not enabled");
        return Ter::TemDisabled;
    }

    Ter::TesSuccess
}

/// Cryptographic signature verification
pub fn preflight2(ctx: &PreflightContext<'_>) -> Ter {
    if ctx.flags.contains(ApplyFlags::NO_CHECK_SIGN) {
        return Ter::TesSuccess;
    }

    let ret = if ctx.tx.is_multi_signed() {
        check_multi_signatures(ctx)
    } else {
        check_single_signature(ctx.tx)
    };
    if !ret.is_tes() {
        ctx.journal.debug(format!("preflight2: signature check failed: {}", ret.token()));
    }
    ret
}

fn check_single_signature(tx: &Transaction) -> Ter {
    let Some(key) = &tx.signing_pub_key else {
        return Ter::TemBadSignature;
    };
    let Ok(payload) = signing_bytes(tx) else {
        return Ter::TemMalformed;
    };
    if verify_signature(key, &payload, &tx.signature) {
        Ter::TesSuccess
    } else {
        Ter::TemBadSignature
    }
}

/// Every signer is verified; one bad signature anywhere fails the transaction
fn check_multi_signatures(ctx: &PreflightContext<'_>) -> Ter {
    let tx = ctx.tx;

    if tx.signing_pub_key.is_some() || !tx.signature.is_empty() {
        return Ter::TemBadSignature;
    }

    if tx.signers.is_empty() || tx.signers.len() > MAX_MULTI_SIGNERS {
        return Ter::TemBadSigner;
    }

    let strictly_sorted = tx
        .signers
        .windows(2)
        .all(|pair| pair[0].account < pair[1].account);
    if !strictly_sorted {
        return Ter::TemBadSigner;
    }

    if tx.signers.iter().any(|s| s.account == tx.account) {
        return Ter::TemBadSigner;
    }

    let mut failures = 0usize;
    for signer in &tx.signers {
        let Ok(payload) = multi_signing_bytes(tx, &signer.account) else {
            return Ter::TemMalformed;
        };
        if !verify_signature(&signer.signing_pub_key, &payload, &signer.signature) {
            ctx.journal
                .trace(format!("preflight2: bad signature from signer {}", signer.account));
            failures += 1;
        }
    }

    if failures > 0 {
        Ter::TemBadSignature
    } else {
        Ter::TesSuccess
    }
}
