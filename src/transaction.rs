//! Immutable transaction records and their builder

use crate::amount::{Amount, CscAmount, TokenAmount};
use crate::crypto::{KeyPair, PublicKey};
use crate::error::{Error, Result};
use crate::serialization;
use crate::types::{AccountFlag, AccountId, Hash256, TxType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Universal transaction flag, accepted on every type
pub const TF_FULLY_CANONICAL_SIG: u32 = 0x8000_0000;

/// Bits a transaction may set
pub const TF_UNIVERSAL_MASK: u32 = TF_FULLY_CANONICAL_SIG;

/// Most signers a multi-signed transaction or signer list may carry
pub const MAX_MULTI_SIGNERS: usize = 8;

/// Characters permitted in memo type and format fields
const MEMO_CHARSET: &[u8] =
    b"0123456789-._~:/?#[]@!$&'()*+,;=%ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Memo {
    pub memo_type: Vec<u8>,
    pub memo_data: Vec<u8>,
    pub memo_format: Vec<u8>,
}

impl Memo {
    pub fn text(memo_type: &str, data: &[u8]) -> Self {
        Self {
            memo_type: memo_type.as_bytes().to_vec(),
            memo_data: data.to_vec(),
            memo_format: Vec::new(),
        }
    }

    /// Bytes counted against the memo size limit
    pub fn size(&self) -> usize {
        self.memo_type.len() + self.memo_data.len() + self.memo_format.len()
    }

    /// Type and format must be URL-safe characters; data is opaque
    pub fn is_well_formed(&self) -> bool {
        if self.size() == 0 {
            return false;
        }
        self.memo_type
            .iter()
            .chain(self.memo_format.iter())
            .all(|b| MEMO_CHARSET.contains(b))
    }
}

/// One signature of a multi-signed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub account: AccountId,
    pub signing_pub_key: PublicKey,
    pub signature: Vec<u8>,
}

/// Member of an account's signer list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerEntry {
    pub account: AccountId,
    pub weight: u16,
}

/// Type-specific fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxPayload {
    Payment {
        destination: AccountId,
        amount: Amount,
        destination_tag: Option<u32>,
    },
    AccountSet {
        set_flag: Option<AccountFlag>,
        clear_flag: Option<AccountFlag>,
    },
    SetRegularKey {
        regular_key: Option<AccountId>,
    },
    SignerListSet {
        quorum: u32,
        entries: Vec<SignerEntry>,
    },
    OfferCreate {
        taker_pays: Amount,
        taker_gets: Amount,
        expiration: Option<DateTime<Utc>>,
    },
    OfferCancel {
        offer_sequence: u32,
    },
    /// A type this node does not implement
    Unknown {
        type_code: u16,
    },
}

impl TxPayload {
    pub fn tx_type(&self) -> Option<TxType> {
        match self {
            TxPayload::Payment { .. } => Some(TxType::Payment),
            TxPayload::AccountSet { .. } => Some(TxType::AccountSet),
            TxPayload::SetRegularKey { .. } => Some(TxType::SetRegularKey),
            TxPayload::SignerListSet { .. } => Some(TxType::SignerListSet),
            TxPayload::OfferCreate { .. } => Some(TxType::OfferCreate),
            TxPayload::OfferCancel { .. } => Some(TxType::OfferCancel),
            TxPayload::Unknown { .. } => None,
        }
    }

    /// Every token amount the payload names
    pub fn token_amounts(&self) -> Vec<&TokenAmount> {
        match self {
            TxPayload::Payment { amount, .. } => amount.token().into_iter().collect(),
            TxPayload::OfferCreate {
                taker_pays,
                taker_gets,
                ..
            } => taker_pays.token().into_iter().chain(taker_gets.token()).collect(),
            _ => Vec::new(),
        }
    }
}

/// An already-deserialized transaction. The pipeline only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub account: AccountId,
    pub sequence: u32,
    pub fee: CscAmount,
    pub flags: u32,
    pub last_ledger_sequence: Option<u32>,
    pub network_id: Option<u32>,
    /// Absent on multi-signed transactions
    pub signing_pub_key: Option<PublicKey>,
    pub signature: Vec<u8>,
    pub signers: Vec<Signer>,
    pub memos: Vec<Memo>,
    pub payload: TxPayload,
    /// Transaction id as received; preflight checks it against the content
    pub hash: Hash256,
}

impl Transaction {
    pub fn tx_type(&self) -> Option<TxType> {
        self.payload.tx_type()
    }

    pub fn is_multi_signed(&self) -> bool {
        !self.signers.is_empty()
    }

    /// Total bytes of memo payload
    pub fn memo_size(&self) -> usize {
        self.memos.iter().map(Memo::size).sum()
    }

    /// Recompute the id from the content
    pub fn compute_hash(&self) -> Result<Hash256> {
        serialization::transaction_id(self)
    }

    /// Size of the canonical signed encoding
    pub fn serialized_size(&self) -> Result<usize> {
        Ok(serialization::canonical_bytes(self)?.len())
    }
}

/// Fluent construction of signed transactions
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    tx: Transaction,
}

impl TransactionBuilder {
    pub fn new(account: AccountId, sequence: u32, fee: CscAmount, payload: TxPayload) -> Self {
        Self {
            tx: Transaction {
                account,
                sequence,
                fee,
                flags: 0,
                last_ledger_sequence: None,
                network_id: None,
                signing_pub_key: None,
                signature: Vec::new(),
                signers: Vec::new(),
                memos: Vec::new(),
                payload,
                hash: Hash256::zero(),
            },
        }
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.tx.flags = flags;
        self
    }

    pub fn memo(mut self, memo: Memo) -> Self {
        self.tx.memos.push(memo);
        self
    }

    pub fn network_id(mut self, network_id: u32) -> Self {
        self.tx.network_id = Some(network_id);
        self
    }

    pub fn last_ledger_sequence(mut self, sequence: u32) -> Self {
        self.tx.last_ledger_sequence = Some(sequence);
        self
    }

    /// Sign with a single key (master or regular)
    pub fn sign(mut self, keys: &KeyPair) -> Result<Transaction> {
        self.tx.signing_pub_key = Some(keys.public_key());
        self.tx.signers.clear();
        let payload = serialization::signing_bytes(&self.tx)?;
        self.tx.signature = keys.sign(&payload);
        self.finish()
    }

    /// Sign with several `(signer account, key)` pairs. Signers are sorted by account.
    pub fn multi_sign(mut self, signers: &[(AccountId, &KeyPair)]) -> Result<Transaction> {
        if signers.is_empty() {
            return Err(Error::Build {
                reason: "multi-sign requires at least one signer".to_string(),
            });
        }
        self.tx.signing_pub_key = None;
        self.tx.signature.clear();
        self.tx.signers.clear();

        let mut sorted: Vec<&(AccountId, &KeyPair)> = signers.iter().collect();
        sorted.sort_by_key(|(account, _)| *account);
        for (account, keys) in sorted {
            let payload = serialization::multi_signing_bytes(&self.tx, account)?;
            self.tx.signers.push(Signer {
                account: *account,
                signing_pub_key: keys.public_key(),
                signature: keys.sign(&payload),
            });
        }
        self.finish()
    }

    /// Finish without signatures; only useful with `ApplyFlags::NO_CHECK_SIGN`
    pub fn build_unsigned(self) -> Result<Transaction> {
        self.finish()
    }

    fn finish(mut self) -> Result<Transaction> {
        self.tx.hash = self.tx.compute_hash()?;
        Ok(self.tx)
    }
}
