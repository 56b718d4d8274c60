use crate::context::PreflightContext;
use crate::error::Ter;
use crate::preflight::{preflight1, preflight2};
use crate::transaction::{Transaction, TxPayload};
use crate::transactor::{Transactor, TransactorCore};
use crate::types::{AccountFlag, TxType};
use crate::view::{ApplyView, ReadView, LSF_DISABLE_MASTER, LSF_REQUIRE_DEST_TAG};

/// Sets or clears account flags
#[derive(Debug, Default)]
pub struct AccountSet;

fn flag_bits(flag: AccountFlag) -> u32 {
    match flag {
        AccountFlag::RequireDestTag => LSF_REQUIRE_DEST_TAG,
        AccountFlag::DisableMaster => LSF_DISABLE_MASTER,
    }
}

fn flags_of(tx: &Transaction) -> (Option<AccountFlag>, Option<AccountFlag>) {
    match &tx.payload {
        TxPayload::AccountSet {
            set_flag,
            clear_flag,
        } => (*set_flag, *clear_flag),
        _ => (None, None),
    }
}

impl Transactor for AccountSet {
    const TX_TYPE: TxType = TxType::AccountSet;

    fn preflight(ctx: &PreflightContext<'_>) -> Ter {
        let ret = preflight1(ctx);
        if !ret.is_tes() {
            return ret;
        }

        let (set_flag, clear_flag) = flags_of(ctx.tx);
        if set_flag.is_some() && set_flag == clear_flag {
            ctx.journal.trace("Malformed transaction: Set and clear same flag.");
            return Ter::TemInvalidFlag;
        }

        preflight2(ctx)
    }

    /// Disabling the master key changes which keys may sign
    fn affects_subsequent_transaction_auth(tx: &Transaction) -> bool {
        let (set_flag, clear_flag) = flags_of(tx);
        set_flag == Some(AccountFlag::DisableMaster)
            || clear_flag == Some(AccountFlag::DisableMaster)
    }

    fn do_apply(&mut self, core: &mut TransactorCore<'_, '_>) -> Ter {
        let (set_flag, clear_flag) = flags_of(core.tx());
        let account = core.account();
        let Some(mut root) = core.view().account(&account) else {
            return Ter::TefInternal;
        };

        if set_flag == Some(AccountFlag::DisableMaster) {
            let has_alternative =
                root.regular_key.is_some() || core.view().signer_list(&account).is_some();
            if !has_alternative {
                core.journal()
                    .trace("Can't use master disable without an alternative key.");
                return Ter::TecNoAlternativeKey;
            }
        }

        if let Some(flag) = set_flag {
            core.journal().trace(format!("Set {:?}", flag));
            root.set_flag(flag_bits(flag));
        }
        if let Some(flag) = clear_flag {
            core.journal().trace(format!("Clear {:?}", flag));
            root.clear_flag(flag_bits(flag));
        }

        core.view_mut().update(root.into());
        Ter::TesSuccess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::CscAmount;
    use crate::crypto::KeyPair;
    use crate::transaction::TransactionBuilder;

    fn account_set(set_flag: Option<AccountFlag>, clear_flag: Option<AccountFlag>) -> Transaction {
        let keys = KeyPair::from_u64(3);
        TransactionBuilder::new(
            keys.account_id(),
            1,
            CscAmount::from_drops(10),
            TxPayload::AccountSet {
                set_flag,
                clear_flag,
            },
        )
        .sign(&keys)
        .unwrap()
    }

    #[test]
    fn test_affects_auth_only_for_master_flag() {
        assert!(AccountSet::affects_subsequent_transaction_auth(&account_set(
            Some(AccountFlag::DisableMaster),
            None
        )));
        assert!(AccountSet::affects_subsequent_transaction_auth(&account_set(
            None,
            Some(AccountFlag::DisableMaster)
        )));
        assert!(!AccountSet::affects_subsequent_transaction_auth(&account_set(
            Some(AccountFlag::RequireDestTag),
            None
        )));
    }

    #[test]
    fn test_flag_bits() {
        assert_eq!(flag_bits(AccountFlag::DisableMaster), LSF_DISABLE_MASTER);
        assert_eq!(flag_bits(AccountFlag::RequireDestTag), LSF_REQUIRE_DEST_TAG);
    }
}
