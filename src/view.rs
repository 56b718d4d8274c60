//! Ledger objects and the read / apply view abstractions
//!
//! Preclaim sees a [`ReadView`]. Apply writes into a [`Sandbox`], a buffered
//! [`ApplyView`] layered over the base ledger; its [`ChangeSet`] reaches the
//! base only when the pipeline commits it.

use crate::amount::{Amount, CscAmount};
use crate::fee::FeeSettings;
use crate::hasher::{hash_parts, HashPrefix};
use crate::rules::{Feature, Rules};
use crate::transaction::SignerEntry;
use crate::types::{AccountId, Currency, Hash256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// Master key may not sign; set by `AccountSet`
pub const LSF_DISABLE_MASTER: u32 = 0x0010_0000;
/// The one free `SetRegularKey` has been used
pub const LSF_PASSWORD_SPENT: u32 = 0x0001_0000;
/// Incoming payments must carry a destination tag
pub const LSF_REQUIRE_DEST_TAG: u32 = 0x0002_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LedgerEntryType {
    AccountRoot,
    SignerList,
    Offer,
    TrustLine,
}

impl LedgerEntryType {
    fn space(self) -> u8 {
        match self {
            LedgerEntryType::AccountRoot => b'a',
            LedgerEntryType::SignerList => b'S',
            LedgerEntryType::Offer => b'o',
            LedgerEntryType::TrustLine => b'r',
        }
    }
}

/// Typed key of a ledger object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Keylet {
    pub entry_type: LedgerEntryType,
    pub key: Hash256,
}

impl Keylet {
    fn new(entry_type: LedgerEntryType, parts: &[&[u8]]) -> Self {
        let space = [entry_type.space()];
        let mut all: Vec<&[u8]> = Vec::with_capacity(parts.len() + 1);
        all.push(&space);
        all.extend_from_slice(parts);
        Self {
            entry_type,
            key: hash_parts(HashPrefix::LedgerKey, &all),
        }
    }

    pub fn account(account: &AccountId) -> Self {
        Self::new(LedgerEntryType::AccountRoot, &[account.as_bytes()])
    }

    pub fn signer_list(owner: &AccountId) -> Self {
        Self::new(LedgerEntryType::SignerList, &[owner.as_bytes()])
    }

    pub fn offer(owner: &AccountId, sequence: u32) -> Self {
        Self::new(LedgerEntryType::Offer, &[owner.as_bytes(), &sequence.to_be_bytes()])
    }

    pub fn trust_line(holder: &AccountId, issuer: &AccountId, currency: &Currency) -> Self {
        Self::new(
            LedgerEntryType::TrustLine,
            &[holder.as_bytes(), issuer.as_bytes(), currency.code().as_bytes()],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRoot {
    pub account: AccountId,
    pub balance: CscAmount,
    /// Next sequence this account must use
    pub sequence: u32,
    /// Objects owned, each costing an owner reserve
    pub owner_count: u32,
    pub flags: u32,
    pub regular_key: Option<AccountId>,
    /// Sequences of the account's live offers
    pub offers: Vec<u32>,
}

impl AccountRoot {
    pub fn new(account: AccountId, balance: CscAmount, sequence: u32) -> Self {
        Self {
            account,
            balance,
            sequence,
            owner_count: 0,
            flags: 0,
            regular_key: None,
            offers: Vec::new(),
        }
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u32) {
        self.flags |= flag;
    }

    pub fn clear_flag(&mut self, flag: u32) {
        self.flags &= !flag;
    }

    pub fn master_disabled(&self) -> bool {
        self.has_flag(LSF_DISABLE_MASTER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerList {
    pub owner: AccountId,
    pub quorum: u32,
    /// Sorted by account
    pub entries: Vec<SignerEntry>,
}

impl SignerList {
    pub fn weight_of(&self, account: &AccountId) -> Option<u16> {
        self.entries
            .binary_search_by(|e| e.account.cmp(account))
            .ok()
            .map(|i| self.entries[i].weight)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub owner: AccountId,
    pub sequence: u32,
    pub taker_pays: Amount,
    pub taker_gets: Amount,
    pub expiration: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn keylet(&self) -> Keylet {
        Keylet::offer(&self.owner, self.sequence)
    }

    pub fn is_expired(&self, close_time: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|exp| exp <= close_time)
    }
}

/// Holding of a configured token, in the token's smallest unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustLine {
    pub holder: AccountId,
    pub issuer: AccountId,
    pub currency: Currency,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntry {
    AccountRoot(AccountRoot),
    SignerList(SignerList),
    Offer(Offer),
    TrustLine(TrustLine),
}

impl LedgerEntry {
    pub fn keylet(&self) -> Keylet {
        match self {
            LedgerEntry::AccountRoot(a) => Keylet::account(&a.account),
            LedgerEntry::SignerList(s) => Keylet::signer_list(&s.owner),
            LedgerEntry::Offer(o) => o.keylet(),
            LedgerEntry::TrustLine(t) => Keylet::trust_line(&t.holder, &t.issuer, &t.currency),
        }
    }

    /// Native balance held, zero for anything but an account root
    pub fn native_balance(&self) -> CscAmount {
        match self {
            LedgerEntry::AccountRoot(a) => a.balance,
            _ => CscAmount::ZERO,
        }
    }
}

impl From<AccountRoot> for LedgerEntry {
    fn from(entry: AccountRoot) -> Self {
        LedgerEntry::AccountRoot(entry)
    }
}

impl From<SignerList> for LedgerEntry {
    fn from(entry: SignerList) -> Self {
        LedgerEntry::SignerList(entry)
    }
}

impl From<Offer> for LedgerEntry {
    fn from(entry: Offer) -> Self {
        LedgerEntry::Offer(entry)
    }
}

impl From<TrustLine> for LedgerEntry {
    fn from(entry: TrustLine) -> Self {
        LedgerEntry::TrustLine(entry)
    }
}

/// Header facts of the ledger being built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfo {
    pub sequence: u32,
    pub parent_close_time: DateTime<Utc>,
    pub network_id: u32,
    pub fees: FeeSettings,
    pub amendments: BTreeSet<Feature>,
}

/// Read-only access to ledger state
pub trait ReadView {
    fn info(&self) -> &LedgerInfo;

    fn read(&self, keylet: &Keylet) -> Option<LedgerEntry>;

    fn exists(&self, keylet: &Keylet) -> bool {
        self.read(keylet).is_some()
    }

    fn seq(&self) -> u32 {
        self.info().sequence
    }

    fn fees(&self) -> &FeeSettings {
        &self.info().fees
    }

    fn rules(&self) -> Rules {
        Rules::new(self.info().amendments.iter().copied())
    }

    fn account(&self, account: &AccountId) -> Option<AccountRoot> {
        match self.read(&Keylet::account(account))? {
            LedgerEntry::AccountRoot(root) => Some(root),
            _ => None,
        }
    }

    fn signer_list(&self, owner: &AccountId) -> Option<SignerList> {
        match self.read(&Keylet::signer_list(owner))? {
            LedgerEntry::SignerList(list) => Some(list),
            _ => None,
        }
    }

    fn offer(&self, owner: &AccountId, sequence: u32) -> Option<Offer> {
        match self.read(&Keylet::offer(owner, sequence))? {
            LedgerEntry::Offer(offer) => Some(offer),
            _ => None,
        }
    }

    fn trust_line(
        &self,
        holder: &AccountId,
        issuer: &AccountId,
        currency: &Currency,
    ) -> Option<TrustLine> {
        match self.read(&Keylet::trust_line(holder, issuer, currency))? {
            LedgerEntry::TrustLine(line) => Some(line),
            _ => None,
        }
    }
}

/// Mutable ledger state
pub trait ApplyView: ReadView {
    /// Create or overwrite an object
    fn insert(&mut self, entry: LedgerEntry);

    fn erase(&mut self, keylet: &Keylet);

    fn update(&mut self, entry: LedgerEntry) {
        self.insert(entry);
    }
}

/// Buffered writes: `Some` is a write, `None` an erase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: BTreeMap<Keylet, Option<LedgerEntry>>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, keylet: &Keylet) -> Option<&Option<LedgerEntry>> {
        self.entries.get(keylet)
    }

    pub fn insert(&mut self, entry: LedgerEntry) {
        self.entries.insert(entry.keylet(), Some(entry));
    }

    pub fn erase(&mut self, keylet: &Keylet) {
        self.entries.insert(*keylet, None);
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Keylet, Option<LedgerEntry>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Write every change into `view`, in key order
    pub fn apply_to<V: ApplyView + ?Sized>(self, view: &mut V) {
        for (keylet, change) in self.entries {
            match change {
                Some(entry) => view.insert(entry),
                None => view.erase(&keylet),
            }
        }
    }
}

/// Buffered apply view over a read-only base
pub struct Sandbox<'a> {
    base: &'a dyn ReadView,
    changes: ChangeSet,
}

impl<'a> Sandbox<'a> {
    pub fn new(base: &'a dyn ReadView) -> Self {
        Self {
            base,
            changes: ChangeSet::new(),
        }
    }

    pub fn base(&self) -> &'a dyn ReadView {
        self.base
    }

    /// Drop every buffered change
    pub fn discard(&mut self) {
        self.changes.clear();
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }
}

impl ReadView for Sandbox<'_> {
    fn info(&self) -> &LedgerInfo {
        self.base.info()
    }

    fn read(&self, keylet: &Keylet) -> Option<LedgerEntry> {
        match self.changes.get(keylet) {
            Some(change) => change.clone(),
            None => self.base.read(keylet),
        }
    }
}

impl ApplyView for Sandbox<'_> {
    fn insert(&mut self, entry: LedgerEntry) {
        self.changes.insert(entry);
    }

    fn erase(&mut self, keylet: &Keylet) {
        self.changes.erase(keylet);
    }
}

/// Remove an offer and release its owner's reserve
pub fn erase_offer<V: ApplyView + ?Sized>(view: &mut V, offer: &Offer) {
    view.erase(&offer.keylet());
    if let Some(mut owner) = view.account(&offer.owner) {
        owner.offers.retain(|seq| *seq != offer.sequence);
        owner.owner_count = owner.owner_count.saturating_sub(1);
        view.update(owner.into());
    }
}
