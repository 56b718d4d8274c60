//! Native CSC and configured-token payments

use crate::amount::{Amount, CscAmount, TokenAmount};
use crate::checks;
use crate::context::{PreclaimContext, PreflightContext};
use crate::error::Ter;
use crate::preflight::{preflight1, preflight2};
use crate::transaction::{Transaction, TxPayload};
use crate::transactor::{Transactor, TransactorCore};
use crate::types::{AccountId, TxType};
use crate::view::{AccountRoot, ApplyView, ReadView, LSF_REQUIRE_DEST_TAG};

#[derive(Debug, Default)]
pub struct Payment;

struct PaymentFields<'t> {
    destination: AccountId,
    amount: &'t Amount,
    destination_tag: Option<u32>,
}

fn fields(tx: &Transaction) -> Option<PaymentFields<'_>> {
    match &tx.payload {
        TxPayload::Payment {
            destination,
            amount,
            destination_tag,
        } => Some(PaymentFields {
            destination: *destination,
            amount,
            destination_tag: *destination_tag,
        }),
        _ => None,
    }
}

impl Transactor for Payment {
    const TX_TYPE: TxType = TxType::Payment;

    fn preflight(ctx: &PreflightContext<'_>) -> Ter {
        let ret = preflight1(ctx);
        if !ret.is_tes() {
            return ret;
        }

        let Some(payment) = fields(ctx.tx) else {
            return Ter::TemMalformed;
        };

        if payment.destination.is_zero() {
            ctx.journal.trace("Payment destination account not specified");
            return Ter::TemDstNeeded;
        }

        if payment.destination == ctx.tx.account {
            ctx.journal.trace("Payment to self");
            return Ter::TemDstIsSrc;
        }

        match payment.amount {
            Amount::Native(amount) => {
                if !amount.is_positive() || !amount.is_legal() {
                    ctx.journal.trace(format!("bad amount: {}", amount));
                    return Ter::TemBadAmount;
                }
            }
            Amount::Token(token) => {
                if !token.is_positive() {
                    return Ter::TemBadAmount;
                }
                if token.currency.is_bad() {
                    return Ter::TemBadCurrency;
                }
                if token.issuer.is_zero() {
                    return Ter::TemBadIssuer;
                }
            }
        }

        preflight2(ctx)
    }

    /// A blacklisted destination is refused too
    fn check_blacklist(ctx: &PreclaimContext<'_>) -> Ter {
        let ret = checks::check_blacklist(ctx);
        if !ret.is_tes() {
            return ret;
        }

        if let Some(payment) = fields(ctx.tx) {
            if ctx
                .app
                .compliance()
                .snapshot()
                .is_blacklisted(&payment.destination)
            {
                ctx.journal
                    .info(format!("Destination {} is blacklisted", payment.destination));
                return Ter::TefBlacklisted;
            }
        }
        Ter::TesSuccess
    }

    fn calculate_max_spend(tx: &Transaction) -> CscAmount {
        fields(tx)
            .and_then(|p| p.amount.native())
            .unwrap_or(CscAmount::ZERO)
    }

    fn preclaim(ctx: &PreclaimContext<'_>) -> Ter {
        let Some(payment) = fields(ctx.tx) else {
            return Ter::TemMalformed;
        };

        match ctx.view.account(&payment.destination) {
            None => match payment.amount {
                Amount::Native(amount) => {
                    if *amount < ctx.view.fees().reserve_base {
                        ctx.journal.trace(
                            "Delay transaction: Destination account does not exist. \
                             Insufficient payment to create account.",
                        );
                        return Ter::TecNoDstInsufCsc;
                    }
                }
                Amount::Token(_) => {
                    ctx.journal
                        .trace("Delay transaction: Destination account does not exist.");
                    return Ter::TecNoDst;
                }
            },
            Some(dest) => {
                if dest.has_flag(LSF_REQUIRE_DEST_TAG) && payment.destination_tag.is_none() {
                    ctx.journal.trace("Malformed transaction: DestinationTag required.");
                    return Ter::TecDstTagNeeded;
                }
            }
        }

        Ter::TesSuccess
    }

    fn do_apply(&mut self, core: &mut TransactorCore<'_, '_>) -> Ter {
        let Some(payment) = fields(core.tx()) else {
            return Ter::TefInternal;
        };

        match payment.amount {
            Amount::Native(amount) => pay_native(core, payment.destination, *amount),
            Amount::Token(token) => pay_token(core, payment.destination, token),
        }
    }
}

fn pay_native(core: &mut TransactorCore<'_, '_>, destination: AccountId, amount: CscAmount) -> Ter {
    let Some(mut source) = core.view().account(&core.account()) else {
        return Ter::TefInternal;
    };

    // The reserve, or the fee if larger, stays behind; checked against the
    // balance before the fee was taken
    let reserve = core.view().fees().account_reserve(source.owner_count);
    let needed = reserve
        .map(|r| std::cmp::max(r, core.fee_due()))
        .and_then(|r| r.checked_add(amount));
    match needed {
        Some(needed) if core.prior_balance() >= needed => {}
        _ => {
            core.journal().trace(format!(
                "Delay transaction: Insufficient funds: {} / {}",
                core.prior_balance(),
                amount
            ));
            return Ter::TecUnfundedPayment;
        }
    }

    let Some(remaining) = source.balance.checked_sub(amount) else {
        return Ter::TefInternal;
    };
    source.balance = remaining;

    let dest = match core.view().account(&destination) {
        Some(mut dest) => {
            let Some(balance) = dest.balance.checked_add(amount) else {
                return Ter::TefInternal;
            };
            dest.balance = balance;
            dest
        }
        None => {
            core.journal()
                .debug(format!("Creating account {}", destination));
            AccountRoot::new(destination, amount, 1)
        }
    };

    core.view_mut().update(source.into());
    core.view_mut().update(dest.into());
    Ter::TesSuccess
}

fn pay_token(core: &mut TransactorCore<'_, '_>, destination: AccountId, token: &TokenAmount) -> Ter {
    let snapshot = core.app().compliance().snapshot();
    let Some(config) = snapshot.token(&token.currency) else {
        return Ter::TefWltNonCompliant;
    };
    let Some(units) = token.to_units(config.decimals) else {
        return Ter::TemBadPrecision;
    };

    let source = core.account();
    let issuer = token.issuer;
    let view = core.view();

    // Issuing: only the holder's line moves
    if source == issuer {
        let Some(mut line) = view.trust_line(&destination, &issuer, &token.currency) else {
            return Ter::TecNoLine;
        };
        let Some(balance) = line.balance.checked_add(units) else {
            return Ter::TecUnfundedPayment;
        };
        line.balance = balance;
        core.view_mut().update(line.into());
        return Ter::TesSuccess;
    }

    let Some(mut from) = view.trust_line(&source, &issuer, &token.currency) else {
        return Ter::TecUnfundedPayment;
    };
    if from.balance < units {
        core.journal().trace(format!(
            "Insufficient token balance: {} < {}",
            from.balance, units
        ));
        return Ter::TecUnfundedPayment;
    }
    from.balance -= units;

    // Redeeming to the issuer only burns the holder's balance
    if destination == issuer {
        core.view_mut().update(from.into());
        return Ter::TesSuccess;
    }

    let Some(mut to) = view.trust_line(&destination, &issuer, &token.currency) else {
        return Ter::TecNoLine;
    };
    let Some(balance) = to.balance.checked_add(units) else {
        return Ter::TefInternal;
    };
    to.balance = balance;

    core.view_mut().update(from.into());
    core.view_mut().update(to.into());
    Ter::TesSuccess
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::transaction::TransactionBuilder;

    #[test]
    fn test_max_spend_is_native_amount() {
        let keys = KeyPair::from_u64(1);
        let tx = TransactionBuilder::new(
            keys.account_id(),
            1,
            CscAmount::from_drops(10),
            TxPayload::Payment {
                destination: AccountId::from_bytes([2u8; 20]),
                amount: Amount::Native(CscAmount::from_drops(250)),
                destination_tag: None,
            },
        )
        .sign(&keys)
        .unwrap();
        assert_eq!(Payment::calculate_max_spend(&tx), CscAmount::from_drops(250));
        assert_eq!(Payment::calculate_fee_paid(&tx), CscAmount::from_drops(10));
    }
}
