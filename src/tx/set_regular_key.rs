use crate::amount::FeeUnits;
use crate::checks;
use crate::context::{PreclaimContext, PreflightContext};
use crate::error::Ter;
use crate::preflight::{preflight1, preflight2};
use crate::transaction::{Transaction, TxPayload};
use crate::transactor::{Transactor, TransactorCore};
use crate::types::{AccountId, TxType};
use crate::view::{ApplyView, ReadView, LSF_PASSWORD_SPENT};

/// Assigns or removes the account's regular key
#[derive(Debug, Default)]
pub struct SetRegularKey;

fn regular_key(tx: &Transaction) -> Option<AccountId> {
    match &tx.payload {
        TxPayload::SetRegularKey { regular_key } => *regular_key,
        _ => None,
    }
}

impl Transactor for SetRegularKey {
    const TX_TYPE: TxType = TxType::SetRegularKey;

    fn preflight(ctx: &PreflightContext<'_>) -> Ter {
        let ret = preflight1(ctx);
        if !ret.is_tes() {
            return ret;
        }

        if regular_key(ctx.tx) == Some(ctx.tx.account) {
            ctx.journal.trace("Malformed transaction: regular key is the master key.");
            return Ter::TemBadRegkey;
        }

        preflight2(ctx)
    }

    /// The first key change signed by the master key is free
    fn calculate_base_fee(ctx: &PreclaimContext<'_>) -> FeeUnits {
        let tx = ctx.tx;
        let signed_by_master = tx
            .signing_pub_key
            .as_ref()
            .is_some_and(|key| key.account_id() == tx.account);

        if signed_by_master {
            if let Some(root) = ctx.view.account(&tx.account) {
                if !root.has_flag(LSF_PASSWORD_SPENT) {
                    return FeeUnits::ZERO;
                }
            }
        }

        checks::calculate_base_fee(ctx)
    }

    fn affects_subsequent_transaction_auth(_tx: &Transaction) -> bool {
        true
    }

    fn do_apply(&mut self, core: &mut TransactorCore<'_, '_>) -> Ter {
        let account = core.account();
        let Some(mut root) = core.view().account(&account) else {
            return Ter::TefInternal;
        };

        if core.fee_due().is_zero() {
            root.set_flag(LSF_PASSWORD_SPENT);
        }

        match regular_key(core.tx()) {
            Some(key) => {
                root.regular_key = Some(key);
            }
            None => {
                if root.master_disabled() && core.view().signer_list(&account).is_none() {
                    core.journal()
                        .trace("Can't remove regular key with disabled master key");
                    return Ter::TecNoAlternativeKey;
                }
                root.regular_key = None;
            }
        }

        core.view_mut().update(root.into());
        Ter::TesSuccess
    }
}
