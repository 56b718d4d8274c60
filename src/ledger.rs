//! In-memory ledger: the reference implementation of the view traits

use crate::amount::CscAmount;
use crate::config::Config;
use crate::error::Result;
use crate::hasher::{hash_serialized, HashPrefix};
use crate::rules::Feature;
use crate::types::{AccountId, Currency, Hash256};
use crate::view::{
    AccountRoot, ApplyView, Keylet, LedgerEntry, LedgerInfo, ReadView, SignerList, TrustLine,
};
use crate::transaction::SignerEntry;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Saved ledger state to roll back to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub info: LedgerInfo,
    entries: BTreeMap<Keylet, LedgerEntry>,
    pub hash: Hash256,
}

/// Ledger state held entirely in memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLedger {
    info: LedgerInfo,
    entries: BTreeMap<Keylet, LedgerEntry>,
}

impl MemoryLedger {
    /// Open ledger 2 with default fees and every amendment enabled
    pub fn new() -> Self {
        Self::with_info(Self::default_info(&Config::default()))
    }

    pub fn with_info(info: LedgerInfo) -> Self {
        Self {
            info,
            entries: BTreeMap::new(),
        }
    }

    /// Header for a fresh ledger under `config`
    pub fn default_info(config: &Config) -> LedgerInfo {
        LedgerInfo {
            sequence: 2,
            parent_close_time: genesis_close_time(),
            network_id: config.network_id,
            fees: config.fee_settings(),
            amendments: Feature::ALL.into_iter().collect(),
        }
    }

    pub fn info_mut(&mut self) -> &mut LedgerInfo {
        &mut self.info
    }

    /// Create or top up a native account. New accounts start at sequence 1.
    pub fn fund(&mut self, account: AccountId, balance: CscAmount) -> &mut Self {
        let root = match self.account(&account) {
            Some(mut root) => {
                root.balance = balance;
                root
            }
            None => AccountRoot::new(account, balance, 1),
        };
        self.insert(root.into());
        self
    }

    /// Attach a signer list to an existing account
    pub fn set_signer_list(
        &mut self,
        owner: AccountId,
        quorum: u32,
        mut entries: Vec<SignerEntry>,
    ) -> &mut Self {
        entries.sort_by_key(|e| e.account);
        if let Some(mut root) = self.account(&owner) {
            root.owner_count += 1;
            self.insert(root.into());
        }
        self.insert(
            SignerList {
                owner,
                quorum,
                entries,
            }
            .into(),
        );
        self
    }

    /// Open a token trust line for `holder`
    pub fn set_trust_line(
        &mut self,
        holder: AccountId,
        issuer: AccountId,
        currency: Currency,
        balance: i64,
    ) -> &mut Self {
        self.insert(
            TrustLine {
                holder,
                issuer,
                currency,
                balance,
            }
            .into(),
        );
        self
    }

    /// Start the next ledger: sequence advances, close time moves forward
    pub fn advance(&mut self, close_time: DateTime<Utc>) {
        self.info.sequence += 1;
        self.info.parent_close_time = close_time;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Sum of native balances over every account
    pub fn total_native(&self) -> Option<CscAmount> {
        self.entries
            .values()
            .try_fold(CscAmount::ZERO, |acc, e| acc.checked_add(e.native_balance()))
    }

    /// Digest of header and every entry in key order
    pub fn state_hash(&self) -> Result<Hash256> {
        hash_serialized(HashPrefix::LedgerState, &(&self.info, &self.entries))
    }

    pub fn checkpoint(&self) -> Result<Checkpoint> {
        Ok(Checkpoint {
            info: self.info.clone(),
            entries: self.entries.clone(),
            hash: self.state_hash()?,
        })
    }

    pub fn restore(&mut self, checkpoint: &Checkpoint) {
        self.info = checkpoint.info.clone();
        self.entries = checkpoint.entries.clone();
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadView for MemoryLedger {
    fn info(&self) -> &LedgerInfo {
        &self.info
    }

    fn read(&self, keylet: &Keylet) -> Option<LedgerEntry> {
        self.entries.get(keylet).cloned()
    }

    fn exists(&self, keylet: &Keylet) -> bool {
        self.entries.contains_key(keylet)
    }
}

impl ApplyView for MemoryLedger {
    fn insert(&mut self, entry: LedgerEntry) {
        self.entries.insert(entry.keylet(), entry);
    }

    fn erase(&mut self, keylet: &Keylet) {
        self.entries.remove(keylet);
    }
}

/// Fixed close time of the first ledger, so fixtures hash identically everywhere
pub fn genesis_close_time() -> DateTime<Utc> {
    Utc.timestamp_opt(946_684_800, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::from_bytes([1u8; 20])
    }

    #[test]
    fn test_fund_and_read() {
        let mut ledger = MemoryLedger::new();
        ledger.fund(alice(), CscAmount::from_drops(500));

        let root = ledger.account(&alice()).unwrap();
        assert_eq!(root.sequence, 1);
        assert_eq!(root.balance.drops(), 500);
        assert_eq!(ledger.total_native(), Some(CscAmount::from_drops(500)));
    }

    #[test]
    fn test_state_hash_tracks_content() {
        let mut a = MemoryLedger::new();
        let mut b = MemoryLedger::new();
        a.fund(alice(), CscAmount::from_drops(500));
        b.fund(alice(), CscAmount::from_drops(500));
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());

        b.fund(alice(), CscAmount::from_drops(501));
        assert_ne!(a.state_hash().unwrap(), b.state_hash().unwrap());
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut ledger = MemoryLedger::new();
        ledger.fund(alice(), CscAmount::from_drops(500));
        let checkpoint = ledger.checkpoint().unwrap();

        ledger.fund(AccountId::from_bytes([2u8; 20]), CscAmount::from_drops(1));
        ledger.advance(genesis_close_time() + chrono::Duration::seconds(10));
        assert_ne!(ledger.state_hash().unwrap(), checkpoint.hash);

        ledger.restore(&checkpoint);
        assert_eq!(ledger.state_hash().unwrap(), checkpoint.hash);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_signer_list_sorted_and_counted() {
        let mut ledger = MemoryLedger::new();
        ledger.fund(alice(), CscAmount::from_drops(500));
        ledger.set_signer_list(
            alice(),
            2,
            vec![
                SignerEntry {
                    account: AccountId::from_bytes([9u8; 20]),
                    weight: 1,
                },
                SignerEntry {
                    account: AccountId::from_bytes([3u8; 20]),
                    weight: 1,
                },
            ],
        );
        let list = ledger.signer_list(&alice()).unwrap();
        assert!(list.entries[0].account < list.entries[1].account);
        assert_eq!(ledger.account(&alice()).unwrap().owner_count, 1);
    }
}
