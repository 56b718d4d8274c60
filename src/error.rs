//! Result codes and error types for the transactor pipeline
//!
//! Expected rejections are never Rust errors: every phase returns a [`Ter`].
//! [`Error`] is reserved for the ambient failures around the pipeline
//! (configuration, encoding, key material).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for fallible non-pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Invalid key material: {reason}")]
    InvalidKey { reason: String },

    #[error("Invalid account id: {reason}")]
    InvalidAccount { reason: String },

    #[error("Transaction build failed: {reason}")]
    Build { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Coarse grouping of result codes used by relay/retry/drop decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerCategory {
    /// Applied as intended
    Success,
    /// Structurally invalid, never retry
    Malformed,
    /// Signature did not verify, never retry without re-signing
    BadSignature,
    /// May succeed once ledger state changes
    Retry,
    /// Never succeeds as submitted
    Permanent,
    /// Effect failed but fee and sequence were committed
    Claimable,
    /// Nothing committed, including the fee
    Unclaimable,
}

/// Transaction engine result code.
///
/// Numeric ranges follow the ledger's historical layout:
/// `tel` -399..-300, `tem` -299..-200, `tef` -199..-100, `ter` -99..-1,
/// `tes` 0, `tec` 100 and up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Ter {
    TelLocalError = -399,
    TelInsufFeeP,
    TelWrongNetwork,
    TelRequiresNetworkId,
    TelMemoTooLarge,

    TemMalformed = -299,
    TemBadAmount,
    TemBadCurrency,
    TemBadFee,
    TemBadIssuer,
    TemBadOffer,
    TemBadPrecision,
    TemBadQuorum,
    TemBadRegkey,
    TemBadSequence,
    TemBadSignature,
    TemBadSigner,
    TemBadSrcAccount,
    TemBadWeight,
    TemDisabled,
    TemDstIsSrc,
    TemDstNeeded,
    TemInvalid,
    TemInvalidFlag,
    TemUnknown,

    TefFailure = -199,
    TefBadAuth,
    TefBadAuthMaster,
    TefBadQuorum,
    TefBadSignature,
    TefBlacklisted,
    TefException,
    TefInternal,
    TefInvariantFailed,
    TefMasterDisabled,
    TefMaxLedger,
    TefNotMultiSigning,
    TefNotWhitelisted,
    TefPastSeq,
    TefWltNonCompliant,

    TerRetry = -99,
    TerInsufFeeB,
    TerNoAccount,
    TerPreSeq,

    TesSuccess = 0,

    TecClaim = 100,
    TecDstTagNeeded,
    TecExpired,
    TecInsufReserveOffer,
    TecInsufficientReserve,
    TecNoAlternativeKey,
    TecNoDst,
    TecNoDstInsufCsc,
    TecNoLine,
    TecUnfundedOffer,
    TecUnfundedPayment,
    TecWltNonCompliant,
}

impl Ter {
    /// Numeric code
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_tel(self) -> bool {
        (-399..=-300).contains(&self.code())
    }

    pub fn is_tem(self) -> bool {
        (-299..=-200).contains(&self.code())
    }

    pub fn is_tef(self) -> bool {
        (-199..=-100).contains(&self.code())
    }

    pub fn is_ter(self) -> bool {
        (-99..=-1).contains(&self.code())
    }

    pub fn is_tes(self) -> bool {
        self == Ter::TesSuccess
    }

    pub fn is_tec(self) -> bool {
        self.code() >= 100
    }

    /// True when the code commits the fee and sequence (`tes` or `tec`)
    pub fn claims_fee(self) -> bool {
        self.is_tes() || self.is_tec()
    }

    pub fn category(self) -> TerCategory {
        match self {
            Ter::TesSuccess => TerCategory::Success,
            Ter::TemBadSignature | Ter::TemBadSigner => TerCategory::BadSignature,
            Ter::TefInternal | Ter::TefException | Ter::TefInvariantFailed => {
                TerCategory::Unclaimable
            }
            t if t.is_tem() => TerCategory::Malformed,
            t if t.is_ter() => TerCategory::Retry,
            t if t.is_tec() => TerCategory::Claimable,
            _ => TerCategory::Permanent,
        }
    }

    /// Short token, e.g. `tesSUCCESS`
    pub fn token(self) -> &'static str {
        self.describe().0
    }

    /// Human readable explanation
    pub fn message(self) -> &'static str {
        self.describe().1
    }

    fn describe(self) -> (&'static str, &'static str) {
        match self {
            Ter::TelLocalError => ("telLOCAL_ERROR", "Local failure."),
            Ter::TelInsufFeeP => ("telINSUF_FEE_P", "Fee insufficient."),
            Ter::TelWrongNetwork => (
                "telWRONG_NETWORK",
                "Transaction specifies a network id that does not match this node.",
            ),
            Ter::TelRequiresNetworkId => (
                "telREQUIRES_NETWORK_ID",
                "Transactions submitted to this network must specify the network id.",
            ),
            Ter::TelMemoTooLarge => ("telMEMO_TOO_LARGE", "Memo payload exceeds the configured maximum."),

            Ter::TemMalformed => ("temMALFORMED", "Malformed transaction."),
            Ter::TemBadAmount => ("temBAD_AMOUNT", "Can only send positive amounts."),
            Ter::TemBadCurrency => ("temBAD_CURRENCY", "Malformed: Bad currency."),
            Ter::TemBadFee => ("temBAD_FEE", "Invalid fee, negative or not CSC."),
            Ter::TemBadIssuer => ("temBAD_ISSUER", "Malformed: Bad issuer."),
            Ter::TemBadOffer => ("temBAD_OFFER", "Malformed: Bad offer."),
            Ter::TemBadPrecision => ("temBAD_PRECISION", "Amount exceeds the token's allowed precision."),
            Ter::TemBadQuorum => ("temBAD_QUORUM", "Malformed: Quorum is unreachable."),
            Ter::TemBadRegkey => ("temBAD_REGKEY", "Malformed: Regular key cannot be same as master key."),
            Ter::TemBadSequence => ("temBAD_SEQUENCE", "Malformed: Sequence is not in the past."),
            Ter::TemBadSignature => ("temBAD_SIGNATURE", "Malformed: Bad signature."),
            Ter::TemBadSigner => ("temBAD_SIGNER", "Malformed: No signer may duplicate account or other signers."),
            Ter::TemBadSrcAccount => ("temBAD_SRC_ACCOUNT", "Malformed: Bad source account."),
            Ter::TemBadWeight => ("temBAD_WEIGHT", "Malformed: Weight must be a positive value."),
            Ter::TemDisabled => ("temDISABLED", "The transaction requires logic that is currently disabled."),
            Ter::TemDstIsSrc => ("temDST_IS_SRC", "Destination may not be source."),
            Ter::TemDstNeeded => ("temDST_NEEDED", "Destination not specified."),
            Ter::TemInvalid => ("temINVALID", "The transaction is ill-formed."),
            Ter::TemInvalidFlag => ("temINVALID_FLAG", "The transaction has an invalid flag."),
            Ter::TemUnknown => ("temUNKNOWN", "The transaction requires logic that is not implemented yet."),

            Ter::TefFailure => ("tefFAILURE", "Failed to apply."),
            Ter::TefBadAuth => ("tefBAD_AUTH", "Transaction's public key is not authorized."),
            Ter::TefBadAuthMaster => ("tefBAD_AUTH_MASTER", "Auth for unclaimed account needs correct master key."),
            Ter::TefBadQuorum => ("tefBAD_QUORUM", "Signatures provided do not meet the quorum."),
            Ter::TefBadSignature => ("tefBAD_SIGNATURE", "A signature is provided for a non-signer."),
            Ter::TefBlacklisted => ("tefBLACKLISTED", "Account is blacklisted."),
            Ter::TefException => ("tefEXCEPTION", "Unexpected program state."),
            Ter::TefInternal => ("tefINTERNAL", "Internal error."),
            Ter::TefInvariantFailed => ("tefINVARIANT_FAILED", "Fee claim violated invariants for the transaction."),
            Ter::TefMasterDisabled => ("tefMASTER_DISABLED", "Master key is disabled."),
            Ter::TefMaxLedger => ("tefMAX_LEDGER", "Ledger sequence too high."),
            Ter::TefNotMultiSigning => ("tefNOT_MULTI_SIGNING", "Account has no appropriate list of multi-signers."),
            Ter::TefNotWhitelisted => ("tefNOT_WHITELISTED", "Account is not on the whitelist."),
            Ter::TefPastSeq => ("tefPAST_SEQ", "This sequence number has already passed."),
            Ter::TefWltNonCompliant => ("tefWLT_NON_COMPLIANT", "Token amount violates the token's compliance rules."),

            Ter::TerRetry => ("terRETRY", "Retry transaction."),
            Ter::TerInsufFeeB => ("terINSUF_FEE_B", "Account balance can't pay fee."),
            Ter::TerNoAccount => ("terNO_ACCOUNT", "The source account does not exist."),
            Ter::TerPreSeq => ("terPRE_SEQ", "Missing/inapplicable prior transaction."),

            Ter::TesSuccess => ("tesSUCCESS", "The transaction was applied."),

            Ter::TecClaim => ("tecCLAIM", "Fee claimed. Sequence used. No action."),
            Ter::TecDstTagNeeded => ("tecDST_TAG_NEEDED", "A destination tag is required."),
            Ter::TecExpired => ("tecEXPIRED", "Expiration time is passed."),
            Ter::TecInsufReserveOffer => ("tecINSUF_RESERVE_OFFER", "Insufficient reserve to create offer."),
            Ter::TecInsufficientReserve => ("tecINSUFFICIENT_RESERVE", "Insufficient reserve to complete requested operation."),
            Ter::TecNoAlternativeKey => ("tecNO_ALTERNATIVE_KEY", "The operation would remove the ability to sign transactions with the account."),
            Ter::TecNoDst => ("tecNO_DST", "Destination does not exist. Send CSC to create it."),
            Ter::TecNoDstInsufCsc => ("tecNO_DST_INSUF_CSC", "Destination does not exist. Too little CSC sent to create it."),
            Ter::TecNoLine => ("tecNO_LINE", "No such line."),
            Ter::TecUnfundedOffer => ("tecUNFUNDED_OFFER", "Insufficient balance to fund created offer."),
            Ter::TecUnfundedPayment => ("tecUNFUNDED_PAYMENT", "Insufficient CSC balance to send."),
            Ter::TecWltNonCompliant => ("tecWLT_NON_COMPLIANT", "Token transfer violates the token's compliance rules."),
        }
    }
}

impl fmt::Display for Ter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert!(Ter::TelMemoTooLarge.is_tel());
        assert!(Ter::TemUnknown.is_tem());
        assert!(Ter::TefWltNonCompliant.is_tef());
        assert!(Ter::TerPreSeq.is_ter());
        assert!(Ter::TecWltNonCompliant.is_tec());
        assert_eq!(Ter::TerPreSeq.code(), -96);
        assert_eq!(Ter::TesSuccess.code(), 0);
    }

    #[test]
    fn test_categories() {
        assert_eq!(Ter::TesSuccess.category(), TerCategory::Success);
        assert_eq!(Ter::TemBadFee.category(), TerCategory::Malformed);
        assert_eq!(Ter::TemBadSignature.category(), TerCategory::BadSignature);
        assert_eq!(Ter::TerPreSeq.category(), TerCategory::Retry);
        assert_eq!(Ter::TerInsufFeeB.category(), TerCategory::Retry);
        assert_eq!(Ter::TefPastSeq.category(), TerCategory::Permanent);
        assert_eq!(Ter::TefBlacklisted.category(), TerCategory::Permanent);
        assert_eq!(Ter::TelInsufFeeP.category(), TerCategory::Permanent);
        assert_eq!(Ter::TecUnfundedPayment.category(), TerCategory::Claimable);
        assert_eq!(Ter::TefException.category(), TerCategory::Unclaimable);
        assert_eq!(Ter::TefInvariantFailed.category(), TerCategory::Unclaimable);
    }

    #[test]
    fn test_tokens() {
        assert_eq!(Ter::TesSuccess.to_string(), "tesSUCCESS");
        assert_eq!(Ter::TefPastSeq.token(), "tefPAST_SEQ");
        assert!(Ter::TecClaim.claims_fee());
        assert!(!Ter::TefInternal.claims_fee());
    }
}
