//! CSC Transactor
//!
//! The transaction-gating pipeline of a ripple-style ledger node: every candidate
//! transaction runs preflight (stateless), preclaim (read-only ledger view) and
//! apply (buffered mutable view), producing a deterministic `{result, applied}` pair.

pub mod amount;
pub mod application;
pub mod checks;
pub mod compliance;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod fee;
pub mod hasher;
pub mod ledger;
pub mod logging;
pub mod pipeline;
pub mod preflight;
pub mod rules;
pub mod serialization;
pub mod transaction;
pub mod transactor;
pub mod tx;
pub mod types;
pub mod view;

// Re-export core types and traits
pub use amount::{Amount, CscAmount, FeeUnits, TokenAmount};
pub use application::{Application, FeeTrack, JobQueue, JobType, Role};
pub use compliance::{ComplianceRegistry, ComplianceSnapshot, TokenConfig};
pub use config::{Config, FeePolicy};
pub use context::{ApplyContext, ApplyFlags, PreclaimContext, PreflightContext};
pub use crypto::{KeyPair, PublicKey};
pub use error::{Error, Result, Ter, TerCategory};
pub use fee::FeeSettings;
pub use ledger::MemoryLedger;
pub use logging::{Journal, JournalEntry, LogLevel};
pub use pipeline::{
    apply, calculate_consequences, do_apply, preclaim, preflight, preflight_batch, ApplyOutcome,
    ConsequenceCategory, LedgerApplier, PreclaimResult, PreflightResult, TxConsequences,
    LEDGER_TOTAL_PASSES,
};
pub use preflight::{preflight0, preflight1, preflight2};
pub use rules::{Feature, Rules};
pub use serialization::{BincodeCodec, JsonCodec, TxCodec};
pub use transaction::{Memo, Signer, SignerEntry, Transaction, TransactionBuilder, TxPayload};
pub use transactor::{Transactor, TransactorCore};
pub use types::{AccountFlag, AccountId, ApplyTrace, Currency, Hash256, TxRecord, TxType};
pub use view::{
    AccountRoot, ApplyView, ChangeSet, Keylet, LedgerEntry, LedgerInfo, Offer, ReadView, Sandbox,
    SignerList, TrustLine,
};
