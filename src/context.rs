//! Per-phase contexts handed to every check and transactor
//!
//! Each context borrows what its phase may touch and nothing more: preflight
//! gets no ledger at all, preclaim a read-only view, apply a sandbox over the
//! ledger whose changes are only committed by the pipeline.

use crate::amount::CscAmount;
use crate::application::Application;
use crate::error::Ter;
use crate::logging::Journal;
use crate::rules::Rules;
use crate::transaction::Transaction;
use crate::view::{ChangeSet, Offer, ReadView, Sandbox};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Execution hints passed by value through every phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ApplyFlags(u32);

impl ApplyFlags {
    pub const NONE: ApplyFlags = ApplyFlags(0);
    /// Signatures were verified by a trusted source; skip signature checks
    pub const NO_CHECK_SIGN: ApplyFlags = ApplyFlags(0x01);
    /// This is a retry pass; claimable failures are not committed
    pub const RETRY: ApplyFlags = ApplyFlags(0x20);
    /// Speculative apply to the open ledger
    pub const OPEN_LEDGER: ApplyFlags = ApplyFlags(0x100);
    /// Admin submission: fee is not scaled for load
    pub const ADMIN: ApplyFlags = ApplyFlags(0x400);
    /// Only a success may be committed
    pub const FAIL_HARD: ApplyFlags = ApplyFlags(0x10);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: ApplyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: ApplyFlags) -> ApplyFlags {
        ApplyFlags(self.0 | other.0)
    }

    pub const fn without(self, other: ApplyFlags) -> ApplyFlags {
        ApplyFlags(self.0 & !other.0)
    }
}

impl BitOr for ApplyFlags {
    type Output = ApplyFlags;

    fn bitor(self, rhs: ApplyFlags) -> ApplyFlags {
        self.union(rhs)
    }
}

impl BitOrAssign for ApplyFlags {
    fn bitor_assign(&mut self, rhs: ApplyFlags) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for ApplyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Stateless checks: no ledger view
#[derive(Debug, Clone)]
pub struct PreflightContext<'a> {
    pub app: &'a Application,
    pub tx: &'a Transaction,
    pub rules: Rules,
    pub flags: ApplyFlags,
    pub journal: Journal,
}

impl<'a> PreflightContext<'a> {
    pub fn new(
        app: &'a Application,
        tx: &'a Transaction,
        rules: Rules,
        flags: ApplyFlags,
        journal: Journal,
    ) -> Self {
        Self {
            app,
            tx,
            rules,
            flags,
            journal: journal.with_tx(tx.hash),
        }
    }
}

/// Predicts success against a read-only view
pub struct PreclaimContext<'a> {
    pub app: &'a Application,
    pub view: &'a dyn ReadView,
    /// Carried forward from preflight; preclaim never overrides a failure
    pub preflight_result: Ter,
    pub tx: &'a Transaction,
    pub flags: ApplyFlags,
    pub journal: Journal,
}

impl<'a> PreclaimContext<'a> {
    pub fn new(
        app: &'a Application,
        view: &'a dyn ReadView,
        preflight_result: Ter,
        tx: &'a Transaction,
        flags: ApplyFlags,
        journal: Journal,
    ) -> Self {
        Self {
            app,
            view,
            preflight_result,
            tx,
            flags,
            journal: journal.with_tx(tx.hash),
        }
    }
}

/// Mutable state of one apply: a sandbox over the ledger plus fee side effects
pub struct ApplyContext<'a> {
    pub app: &'a Application,
    pub tx: &'a Transaction,
    pub preclaim_result: Ter,
    /// Load-scaled base fee computed during preclaim
    pub base_fee: CscAmount,
    pub flags: ApplyFlags,
    pub journal: Journal,
    view: Sandbox<'a>,
    removed_offers: Vec<Offer>,
}

impl<'a> ApplyContext<'a> {
    pub fn new(
        app: &'a Application,
        base: &'a dyn ReadView,
        tx: &'a Transaction,
        preclaim_result: Ter,
        base_fee: CscAmount,
        flags: ApplyFlags,
        journal: Journal,
    ) -> Self {
        Self {
            app,
            tx,
            preclaim_result,
            base_fee,
            flags,
            journal: journal.with_tx(tx.hash),
            view: Sandbox::new(base),
            removed_offers: Vec::new(),
        }
    }

    pub fn view(&self) -> &Sandbox<'a> {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut Sandbox<'a> {
        &mut self.view
    }

    /// The ledger as it was before this transaction
    pub fn base(&self) -> &'a dyn ReadView {
        self.view.base()
    }

    /// Throw away every buffered change. Removed offers are kept.
    pub fn discard(&mut self) {
        self.view.discard();
    }

    /// Offers swept as a side effect; they stay removed even on a claimable failure
    pub fn record_removed_offer(&mut self, offer: Offer) {
        self.removed_offers.push(offer);
    }

    pub fn removed_offers(&self) -> &[Offer] {
        &self.removed_offers
    }

    pub fn take_removed_offers(&mut self) -> Vec<Offer> {
        std::mem::take(&mut self.removed_offers)
    }

    pub fn into_changes(self) -> ChangeSet {
        self.view.into_changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let flags = ApplyFlags::RETRY | ApplyFlags::ADMIN;
        assert!(flags.contains(ApplyFlags::RETRY));
        assert!(flags.contains(ApplyFlags::ADMIN));
        assert!(!flags.contains(ApplyFlags::NO_CHECK_SIGN));
        assert!(flags.contains(ApplyFlags::NONE));
        assert!(!flags.without(ApplyFlags::RETRY).contains(ApplyFlags::RETRY));

        let mut flags = ApplyFlags::NONE;
        flags |= ApplyFlags::OPEN_LEDGER;
        assert_eq!(flags.bits(), 0x100);
    }
}
