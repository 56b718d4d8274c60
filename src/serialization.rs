//! Canonical transaction encoding and pluggable wire codecs
//!
//! Canonical bytes are what every node hashes and signs, so they must never
//! depend on anything but the transaction's own fields.

use crate::amount::CscAmount;
use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use crate::hasher::{hash_parts, HashPrefix};
use crate::transaction::{Memo, Signer, Transaction, TxPayload};
use crate::types::{AccountId, Hash256};
use serde::Serialize;

/// Fields covered by signatures. Signatures and the id are excluded.
#[derive(Serialize)]
struct SigningFields<'a> {
    account: &'a AccountId,
    sequence: u32,
    fee: CscAmount,
    flags: u32,
    last_ledger_sequence: Option<u32>,
    network_id: Option<u32>,
    signing_pub_key: &'a Option<PublicKey>,
    memos: &'a [Memo],
    payload: &'a TxPayload,
}

/// Fields covered by the transaction id: everything but the id itself
#[derive(Serialize)]
struct CanonicalFields<'a> {
    body: SigningFields<'a>,
    signature: &'a [u8],
    signers: &'a [Signer],
}

fn signing_fields(tx: &Transaction) -> SigningFields<'_> {
    SigningFields {
        account: &tx.account,
        sequence: tx.sequence,
        fee: tx.fee,
        flags: tx.flags,
        last_ledger_sequence: tx.last_ledger_sequence,
        network_id: tx.network_id,
        signing_pub_key: &tx.signing_pub_key,
        memos: &tx.memos,
        payload: &tx.payload,
    }
}

/// Payload signed by a single signer
pub fn signing_bytes(tx: &Transaction) -> Result<Vec<u8>> {
    let mut bytes = HashPrefix::TxSign.bytes().to_vec();
    bytes.extend(bincode::serialize(&signing_fields(tx))?);
    Ok(bytes)
}

/// Payload signed by one member of a multi-signature
pub fn multi_signing_bytes(tx: &Transaction, signer: &AccountId) -> Result<Vec<u8>> {
    let mut bytes = HashPrefix::TxMultiSign.bytes().to_vec();
    bytes.extend(bincode::serialize(&signing_fields(tx))?);
    bytes.extend_from_slice(signer.as_bytes());
    Ok(bytes)
}

/// Full signed encoding, used for the id and for size-based fees
pub fn canonical_bytes(tx: &Transaction) -> Result<Vec<u8>> {
    let fields = CanonicalFields {
        body: signing_fields(tx),
        signature: &tx.signature,
        signers: &tx.signers,
    };
    Ok(bincode::serialize(&fields)?)
}

pub fn transaction_id(tx: &Transaction) -> Result<Hash256> {
    Ok(hash_parts(HashPrefix::TransactionId, &[&canonical_bytes(tx)?]))
}

/// Wire codec for submitted transactions
pub trait TxCodec: Send + Sync {
    fn encode(&self, tx: &Transaction) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Transaction>;

    fn name(&self) -> &str;
}

/// Compact binary blobs
#[derive(Debug, Clone, Default)]
pub struct BincodeCodec;

impl TxCodec for BincodeCodec {
    fn encode(&self, tx: &Transaction) -> Result<Vec<u8>> {
        Ok(bincode::serialize(tx)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Transaction> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn name(&self) -> &str {
        "bincode"
    }
}

/// JSON as submitted over RPC
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl TxCodec for JsonCodec {
    fn encode(&self, tx: &Transaction) -> Result<Vec<u8>> {
        let result = if self.pretty {
            serde_json::to_vec_pretty(tx)
        } else {
            serde_json::to_vec(tx)
        };
        result.map_err(|e| Error::Serialization {
            reason: format!("JSON encoding failed: {}", e),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Transaction> {
        serde_json::from_slice(bytes).map_err(|e| Error::Serialization {
            reason: format!("JSON decoding failed: {}", e),
        })
    }

    fn name(&self) -> &str {
        "json"
    }
}
