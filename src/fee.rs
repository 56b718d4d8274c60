//! Fee engine: base fee units, load scaling, reserves and the fee actually charged

use crate::amount::{CscAmount, FeeUnits};
use crate::config::FeePolicy;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Serialized bytes covered by the base fee; each started KiB beyond costs extra
pub const FREE_SIZE_ALLOWANCE: usize = 1024;

/// Load factor representing an unloaded server
pub const LOAD_BASE: u32 = 256;

/// Fee and reserve parameters recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSettings {
    /// Cost in drops of a reference transaction
    pub base_fee: CscAmount,
    /// Fee units of a reference transaction
    pub reference_fee_units: u64,
    /// Minimum balance of any account
    pub reserve_base: CscAmount,
    /// Extra reserve per owned ledger object
    pub reserve_increment: CscAmount,
}

impl FeeSettings {
    /// Reserve required of an account owning `owner_count` objects
    pub fn account_reserve(&self, owner_count: u32) -> Option<CscAmount> {
        self.reserve_increment
            .checked_mul(i64::from(owner_count))?
            .checked_add(self.reserve_base)
    }

    /// Convert fee units to drops at the ledger's reference rate
    pub fn units_to_drops(&self, units: FeeUnits) -> Option<CscAmount> {
        self.base_fee.mul_div(units.0, self.reference_fee_units)
    }
}

/// Default base fee: one reference charge per signature, plus one per
/// started KiB of serialized size above the free allowance.
pub fn base_fee_units(tx: &Transaction, fees: &FeeSettings) -> FeeUnits {
    let reference = FeeUnits(fees.reference_fee_units);
    let signatures = if tx.is_multi_signed() {
        tx.signers.len() as u64
    } else {
        0
    };
    // An encoding failure prices the transaction out instead of letting it through
    let size = tx.serialized_size().unwrap_or(usize::MAX);
    let extra_kib = size.saturating_sub(FREE_SIZE_ALLOWANCE).div_ceil(1024) as u64;

    reference
        .saturating_add(reference.saturating_mul(signatures))
        .saturating_add(reference.saturating_mul(extra_kib))
}

/// Scale a base fee for current server load. Admin submissions are not scaled.
pub fn scale_fee_load(
    units: FeeUnits,
    fees: &FeeSettings,
    load_factor: u32,
    admin: bool,
) -> Option<CscAmount> {
    let base = fees.units_to_drops(units)?;
    if admin || load_factor <= LOAD_BASE {
        return Some(base);
    }
    base.mul_div(u64::from(load_factor), u64::from(LOAD_BASE))
}

/// Fee the submitter offered
pub fn calculate_fee_paid(tx: &Transaction) -> CscAmount {
    tx.fee
}

/// The fee taken from the account once apply is entered
pub fn fee_to_charge(policy: FeePolicy, offered: CscAmount, base_fee: CscAmount) -> CscAmount {
    match policy {
        FeePolicy::Offered => offered,
        FeePolicy::Base => std::cmp::min(offered, base_fee),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::crypto::KeyPair;
    use crate::transaction::{Memo, TransactionBuilder, TxPayload};
    use crate::types::AccountId;

    fn settings() -> FeeSettings {
        FeeSettings {
            base_fee: CscAmount::from_drops(10),
            reference_fee_units: 10,
            reserve_base: CscAmount::from_drops(200),
            reserve_increment: CscAmount::from_drops(50),
        }
    }

    fn payment(memo_bytes: usize) -> Transaction {
        let keys = KeyPair::from_u64(1);
        let mut builder = TransactionBuilder::new(
            keys.account_id(),
            1,
            CscAmount::from_drops(10),
            TxPayload::Payment {
                destination: AccountId::from_bytes([4u8; 20]),
                amount: Amount::Native(CscAmount::from_drops(77)),
                destination_tag: None,
            },
        );
        if memo_bytes > 0 {
            builder = builder.memo(Memo::text("blob", &vec![0u8; memo_bytes]));
        }
        builder.sign(&keys).unwrap()
    }

    #[test]
    fn test_reference_transaction_costs_base_fee() {
        let fees = settings();
        let units = base_fee_units(&payment(0), &fees);
        assert_eq!(units, FeeUnits(10));
        assert_eq!(fees.units_to_drops(units), Some(CscAmount::from_drops(10)));
    }

    #[test]
    fn test_size_surcharge() {
        let fees = settings();
        let units = base_fee_units(&payment(2048), &fees);
        assert!(units >= FeeUnits(30));
    }

    #[test]
    fn test_load_scaling() {
        let fees = settings();
        let units = FeeUnits(10);
        assert_eq!(scale_fee_load(units, &fees, 512, false), Some(CscAmount::from_drops(20)));
        assert_eq!(scale_fee_load(units, &fees, 512, true), Some(CscAmount::from_drops(10)));
        assert_eq!(scale_fee_load(units, &fees, 128, false), Some(CscAmount::from_drops(10)));
    }

    #[test]
    fn test_reserve() {
        let fees = settings();
        assert_eq!(fees.account_reserve(0), Some(CscAmount::from_drops(200)));
        assert_eq!(fees.account_reserve(2), Some(CscAmount::from_drops(300)));
    }

    #[test]
    fn test_fee_policy() {
        let offered = CscAmount::from_drops(15);
        let base = CscAmount::from_drops(10);
        assert_eq!(fee_to_charge(FeePolicy::Offered, offered, base), offered);
        assert_eq!(fee_to_charge(FeePolicy::Base, offered, base), base);
    }

    #[test]
    fn test_fee_paid() {
        let tx = payment(0);
        assert_eq!(calculate_fee_paid(&tx), CscAmount::from_drops(10));
    }
}
