use crate::context::PreflightContext;
use crate::error::Ter;
use crate::preflight::{preflight1, preflight2};
use crate::rules::Feature;
use crate::transaction::{SignerEntry, Transaction, TxPayload, MAX_MULTI_SIGNERS};
use crate::transactor::{Transactor, TransactorCore};
use crate::types::{AccountId, TxType};
use crate::view::{ApplyView, Keylet, ReadView, SignerList};

/// Creates, replaces or deletes the account's signer list
#[derive(Debug, Default)]
pub struct SignerListSet;

fn list_of(tx: &Transaction) -> Option<(u32, &[SignerEntry])> {
    match &tx.payload {
        TxPayload::SignerListSet { quorum, entries } => Some((*quorum, entries.as_slice())),
        _ => None,
    }
}

/// Quorum zero with no entries removes the list
fn is_delete(quorum: u32, entries: &[SignerEntry]) -> bool {
    quorum == 0 && entries.is_empty()
}

fn validate_entries(account: &AccountId, quorum: u32, entries: &[SignerEntry]) -> Ter {
    if entries.is_empty() || entries.len() > MAX_MULTI_SIGNERS {
        return Ter::TemMalformed;
    }

    let mut sorted: Vec<&SignerEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.account);
    if sorted.windows(2).any(|pair| pair[0].account == pair[1].account) {
        return Ter::TemBadSigner;
    }

    let mut total: u64 = 0;
    for entry in entries {
        if entry.account == *account {
            return Ter::TemBadSigner;
        }
        if entry.weight == 0 {
            return Ter::TemBadWeight;
        }
        total += u64::from(entry.weight);
    }

    if quorum == 0 || u64::from(quorum) > total {
        return Ter::TemBadQuorum;
    }

    Ter::TesSuccess
}

impl Transactor for SignerListSet {
    const TX_TYPE: TxType = TxType::SignerListSet;

    fn preflight(ctx: &PreflightContext<'_>) -> Ter {
        if !ctx.rules.enabled(Feature::MultiSign) {
            return Ter::TemDisabled;
        }

        let ret = preflight1(ctx);
        if !ret.is_tes() {
            return ret;
        }

        let Some((quorum, entries)) = list_of(ctx.tx) else {
            return Ter::TemMalformed;
        };

        if !is_delete(quorum, entries) {
            let ret = validate_entries(&ctx.tx.account, quorum, entries);
            if !ret.is_tes() {
                ctx.journal
                    .trace(format!("Invalid signer list: {}", ret.token()));
                return ret;
            }
        }

        preflight2(ctx)
    }

    fn affects_subsequent_transaction_auth(_tx: &Transaction) -> bool {
        true
    }

    fn do_apply(&mut self, core: &mut TransactorCore<'_, '_>) -> Ter {
        let Some((quorum, entries)) = list_of(core.tx()) else {
            return Ter::TefInternal;
        };
        let account = core.account();
        let Some(mut root) = core.view().account(&account) else {
            return Ter::TefInternal;
        };
        let existing = core.view().signer_list(&account);

        if is_delete(quorum, entries) {
            if existing.is_none() {
                return Ter::TesSuccess;
            }
            if root.master_disabled() && root.regular_key.is_none() {
                core.journal()
                    .trace("Can't remove signer list without an alternative key.");
                return Ter::TecNoAlternativeKey;
            }
            core.view_mut().erase(&Keylet::signer_list(&account));
            root.owner_count = root.owner_count.saturating_sub(1);
            core.view_mut().update(root.into());
            return Ter::TesSuccess;
        }

        // A replacement reuses the existing owner slot
        let owner_count = if existing.is_some() {
            root.owner_count
        } else {
            root.owner_count.saturating_add(1)
        };
        let reserve = core.view().fees().account_reserve(owner_count);
        match reserve {
            Some(reserve) if core.prior_balance() >= reserve => {}
            _ => {
                core.journal().trace(format!(
                    "Insufficient reserve for signer list: balance={}",
                    core.prior_balance()
                ));
                return Ter::TecInsufficientReserve;
            }
        }

        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|e| e.account);

        core.view_mut().update(
            SignerList {
                owner: account,
                quorum,
                entries: sorted,
            }
            .into(),
        );
        root.owner_count = owner_count;
        core.view_mut().update(root.into());

        core.journal()
            .debug(format!("Signer list set: quorum {} with {} entries", quorum, entries.len()));
        Ter::TesSuccess
    }
}
