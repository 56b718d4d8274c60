//! Prefixed Blake3 hashing for transaction ids, ledger keys and state digests
//!
//! Every hash is domain separated by a four byte prefix so that a transaction
//! id can never collide with a signing digest or a ledger key.

use crate::error::Result;
use crate::types::Hash256;
use blake3::Hasher as Blake3Hasher;
use serde::Serialize;

/// Domain separation prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashPrefix {
    /// Transaction id over the full signed encoding
    TransactionId,
    /// Single-signature signing payload
    TxSign,
    /// Multi-signature signing payload
    TxMultiSign,
    /// Ledger entry key
    LedgerKey,
    /// Whole ledger state digest
    LedgerState,
    /// Public key to account id
    AccountId,
}

impl HashPrefix {
    pub fn bytes(self) -> &'static [u8; 4] {
        match self {
            HashPrefix::TransactionId => b"TXN\0",
            HashPrefix::TxSign => b"STX\0",
            HashPrefix::TxMultiSign => b"SMT\0",
            HashPrefix::LedgerKey => b"LKY\0",
            HashPrefix::LedgerState => b"LST\0",
            HashPrefix::AccountId => b"ACT\0",
        }
    }
}

/// Hash raw parts under a prefix
pub fn hash_parts(prefix: HashPrefix, parts: &[&[u8]]) -> Hash256 {
    let mut hasher = Blake3Hasher::new();
    hasher.update(prefix.bytes());
    for part in parts {
        hasher.update(part);
    }
    Hash256(*hasher.finalize().as_bytes())
}

/// Hash the bincode encoding of a value under a prefix
pub fn hash_serialized<T: Serialize + ?Sized>(prefix: HashPrefix, value: &T) -> Result<Hash256> {
    let bytes = bincode::serialize(value)?;
    Ok(hash_parts(prefix, &[&bytes]))
}

/// Extend a running chain hash with one more hash
///
/// Used to fingerprint the exact order in which transactions were applied.
pub fn extend_chain(previous: &Hash256, next: &Hash256) -> Hash256 {
    let mut hasher = Blake3Hasher::new();
    hasher.update(&previous.0);
    hasher.update(&next.0);
    Hash256(*hasher.finalize().as_bytes())
}

/// Collapse a sequence of hashes into one
pub fn hash_chain(hashes: &[Hash256]) -> Hash256 {
    hashes
        .iter()
        .fold(Hash256::zero(), |acc, hash| extend_chain(&acc, hash))
}
