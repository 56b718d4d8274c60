//! Offer placement and cancellation
//!
//! Offers rest on the ledger as owned objects; there is no crossing engine.
//! `OfferCreate` sweeps the owner's expired offers before placing a new one,
//! and those removals survive a claimable failure.

use crate::amount::{Amount, CscAmount};
use crate::context::{PreclaimContext, PreflightContext};
use crate::error::Ter;
use crate::preflight::{preflight1, preflight2};
use crate::transaction::{Transaction, TxPayload};
use crate::transactor::{Transactor, TransactorCore};
use crate::types::TxType;
use crate::view::{erase_offer, ApplyView, Offer, ReadView};
use chrono::{DateTime, Utc};

#[derive(Debug, Default)]
pub struct OfferCreate;

#[derive(Debug, Default)]
pub struct OfferCancel;

struct OfferFields<'t> {
    taker_pays: &'t Amount,
    taker_gets: &'t Amount,
    expiration: Option<DateTime<Utc>>,
}

fn offer_fields(tx: &Transaction) -> Option<OfferFields<'_>> {
    match &tx.payload {
        TxPayload::OfferCreate {
            taker_pays,
            taker_gets,
            expiration,
        } => Some(OfferFields {
            taker_pays,
            taker_gets,
            expiration: *expiration,
        }),
        _ => None,
    }
}

fn check_amount(amount: &Amount) -> Ter {
    match amount {
        Amount::Native(drops) if !drops.is_legal() => Ter::TemBadAmount,
        Amount::Token(token) if token.currency.is_bad() => Ter::TemBadCurrency,
        Amount::Token(token) if token.issuer.is_zero() => Ter::TemBadIssuer,
        _ => Ter::TesSuccess,
    }
}

impl Transactor for OfferCreate {
    const TX_TYPE: TxType = TxType::OfferCreate;

    fn preflight(ctx: &PreflightContext<'_>) -> Ter {
        let ret = preflight1(ctx);
        if !ret.is_tes() {
            return ret;
        }

        let Some(offer) = offer_fields(ctx.tx) else {
            return Ter::TemMalformed;
        };

        if !offer.taker_pays.is_positive() || !offer.taker_gets.is_positive() {
            ctx.journal.debug("Malformed offer: bad amount");
            return Ter::TemBadOffer;
        }

        if offer.taker_pays.is_native() && offer.taker_gets.is_native() {
            ctx.journal.debug("Malformed offer: CSC for CSC");
            return Ter::TemBadOffer;
        }

        for amount in [offer.taker_pays, offer.taker_gets] {
            let ret = check_amount(amount);
            if !ret.is_tes() {
                return ret;
            }
        }

        preflight2(ctx)
    }

    fn calculate_max_spend(tx: &Transaction) -> CscAmount {
        offer_fields(tx)
            .and_then(|o| o.taker_gets.native())
            .unwrap_or(CscAmount::ZERO)
    }

    fn preclaim(ctx: &PreclaimContext<'_>) -> Ter {
        let Some(offer) = offer_fields(ctx.tx) else {
            return Ter::TemMalformed;
        };

        if let Some(expiration) = offer.expiration {
            if expiration <= ctx.view.info().parent_close_time {
                ctx.journal.trace("Expired transaction: offer expired");
                return Ter::TecExpired;
            }
        }

        Ter::TesSuccess
    }

    fn do_apply(&mut self, core: &mut TransactorCore<'_, '_>) -> Ter {
        let Some(fields) = offer_fields(core.tx()) else {
            return Ter::TefInternal;
        };
        let account = core.account();

        sweep_expired(core);

        let Some(mut root) = core.view().account(&account) else {
            return Ter::TefInternal;
        };

        if !is_funded(core, fields.taker_gets, root.owner_count) {
            core.journal().debug("delay: Offers must be at least partially funded.");
            return Ter::TecUnfundedOffer;
        }

        let reserve = core.view().fees().account_reserve(root.owner_count.saturating_add(1));
        match reserve {
            Some(reserve) if core.prior_balance() >= reserve => {}
            _ => {
                core.journal().debug(format!(
                    "Insufficient reserve to create offer: balance={}",
                    core.prior_balance()
                ));
                return Ter::TecInsufReserveOffer;
            }
        }

        let offer = Offer {
            owner: account,
            sequence: core.tx().sequence,
            taker_pays: fields.taker_pays.clone(),
            taker_gets: fields.taker_gets.clone(),
            expiration: fields.expiration,
        };
        root.offers.push(offer.sequence);
        root.owner_count = root.owner_count.saturating_add(1);

        core.journal()
            .trace(format!("Placed offer {} for {}", offer.sequence, account));
        core.view_mut().update(offer.into());
        core.view_mut().update(root.into());
        Ter::TesSuccess
    }
}

/// Remove the owner's offers that expired as of the parent close
fn sweep_expired(core: &mut TransactorCore<'_, '_>) {
    let account = core.account();
    let close_time = core.view().info().parent_close_time;
    let Some(root) = core.view().account(&account) else {
        return;
    };

    for sequence in root.offers {
        if let Some(offer) = core.view().offer(&account, sequence) {
            if offer.is_expired(close_time) {
                core.journal()
                    .trace(format!("Removing expired offer {}", sequence));
                core.remove_offer(&offer);
            }
        }
    }
}

/// Native offers need balance above the current reserve; token offers need
/// a positive line unless the account issues the token
fn is_funded(core: &TransactorCore<'_, '_>, taker_gets: &Amount, owner_count: u32) -> bool {
    let account = core.account();
    match taker_gets {
        Amount::Native(_) => core
            .view()
            .fees()
            .account_reserve(owner_count)
            .is_some_and(|reserve| core.source_balance() > reserve),
        Amount::Token(token) => {
            token.issuer == account
                || core
                    .view()
                    .trust_line(&account, &token.issuer, &token.currency)
                    .is_some_and(|line| line.balance > 0)
        }
    }
}

fn offer_sequence(tx: &Transaction) -> Option<u32> {
    match &tx.payload {
        TxPayload::OfferCancel { offer_sequence } => Some(*offer_sequence),
        _ => None,
    }
}

impl Transactor for OfferCancel {
    const TX_TYPE: TxType = TxType::OfferCancel;

    fn preflight(ctx: &PreflightContext<'_>) -> Ter {
        let ret = preflight1(ctx);
        if !ret.is_tes() {
            return ret;
        }

        if offer_sequence(ctx.tx).unwrap_or(0) == 0 {
            ctx.journal.trace("OfferCancel: missing sequence");
            return Ter::TemBadSequence;
        }

        preflight2(ctx)
    }

    /// Cancelling an offer that could not exist yet is malformed
    fn preclaim(ctx: &PreclaimContext<'_>) -> Ter {
        let Some(sequence) = offer_sequence(ctx.tx) else {
            return Ter::TemMalformed;
        };
        let Some(root) = ctx.view.account(&ctx.tx.account) else {
            return Ter::TerNoAccount;
        };
        if sequence >= root.sequence {
            ctx.journal.trace(format!(
                "OfferCancel: offer sequence {} is not before account sequence {}",
                sequence, root.sequence
            ));
            return Ter::TemBadSequence;
        }
        Ter::TesSuccess
    }

    fn do_apply(&mut self, core: &mut TransactorCore<'_, '_>) -> Ter {
        let Some(sequence) = offer_sequence(core.tx()) else {
            return Ter::TefInternal;
        };
        let account = core.account();

        match core.view().offer(&account, sequence) {
            Some(offer) => {
                core.journal().debug(format!("Trying to cancel offer #{}", sequence));
                erase_offer(core.view_mut(), &offer);
            }
            None => {
                core.journal().debug(format!("Offer #{} can't be found.", sequence));
            }
        }

        Ter::TesSuccess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::TokenAmount;
    use crate::crypto::KeyPair;
    use crate::transaction::TransactionBuilder;
    use crate::types::{AccountId, Currency};

    #[test]
    fn test_max_spend_counts_native_taker_gets() {
        let keys = KeyPair::from_u64(5);
        let token = TokenAmount::new(
            Currency::from_code("WLT").unwrap(),
            AccountId::from_bytes([9u8; 20]),
            10,
            0,
        );
        let tx = TransactionBuilder::new(
            keys.account_id(),
            1,
            CscAmount::from_drops(10),
            TxPayload::OfferCreate {
                taker_pays: Amount::Token(token),
                taker_gets: Amount::Native(CscAmount::from_drops(700)),
                expiration: None,
            },
        )
        .sign(&keys)
        .unwrap();
        assert_eq!(OfferCreate::calculate_max_spend(&tx), CscAmount::from_drops(700));
        assert_eq!(OfferCancel::calculate_max_spend(&tx), CscAmount::ZERO);
    }

    #[test]
    fn test_check_amount() {
        assert_eq!(
            check_amount(&Amount::Native(CscAmount::from_drops(i64::MAX))),
            Ter::TemBadAmount
        );
        assert_eq!(
            check_amount(&Amount::Native(CscAmount::from_drops(5))),
            Ter::TesSuccess
        );
    }
}
