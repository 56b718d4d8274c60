//! Core data types shared across the pipeline

use crate::error::{Error, Ter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 160-bit account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn zero() -> Self {
        Self([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse the hex form produced by `Display`
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s.trim()).map_err(|e| Error::InvalidAccount {
            reason: format!("{}: {}", s, e),
        })?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|_| Error::InvalidAccount {
            reason: format!("{}: expected 20 bytes", s),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

/// 256-bit hash used for transaction ids, ledger keys and state hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

/// Three letter currency code for configured tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Currency([u8; 3]);

impl Currency {
    /// Accepts three ASCII alphanumerics
    pub fn from_code(code: &str) -> Option<Self> {
        let bytes: [u8; 3] = code.as_bytes().try_into().ok()?;
        if bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
            Some(Self(bytes))
        } else {
            None
        }
    }

    pub fn code(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("???")
    }

    /// The native code may never name an issued token
    pub fn is_bad(&self) -> bool {
        self.0.eq_ignore_ascii_case(b"CSC")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Known transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxType {
    Payment,
    AccountSet,
    SetRegularKey,
    SignerListSet,
    OfferCreate,
    OfferCancel,
}

impl TxType {
    pub fn name(self) -> &'static str {
        match self {
            TxType::Payment => "Payment",
            TxType::AccountSet => "AccountSet",
            TxType::SetRegularKey => "SetRegularKey",
            TxType::SignerListSet => "SignerListSet",
            TxType::OfferCreate => "OfferCreate",
            TxType::OfferCancel => "OfferCancel",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Account settings toggled by `AccountSet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountFlag {
    RequireDestTag,
    DisableMaster,
}

/// Record of one transaction passing through a ledger applier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx_hash: Hash256,
    pub result: Ter,
    pub applied: bool,
    pub pass: usize,
}

/// Trace of a batch application for audit purposes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyTrace {
    pub transactions_processed: usize,
    pub transactions_applied: usize,
    pub records: Vec<TxRecord>,
    /// Running hash over the ids of applied transactions, in apply order
    pub chain_hash: Hash256,
}
