//! Fixed-point currency amounts with checked arithmetic
//!
//! Native CSC is held as signed drops. Configured tokens carry a decimal
//! mantissa and scale. Every arithmetic operation is checked; overflow yields
//! `None` and callers fail closed.

use crate::types::{AccountId, Currency};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Drops per whole CSC
pub const DROPS_PER_CSC: i64 = 100_000_000;

/// Largest legal amount in whole CSC
pub const MAX_CSC: i64 = 40_000_000_000;

/// Largest legal amount in drops
pub const MAX_DROPS: i64 = MAX_CSC * DROPS_PER_CSC;

/// Native currency amount in drops
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CscAmount(i64);

impl CscAmount {
    pub const ZERO: CscAmount = CscAmount(0);

    pub const fn from_drops(drops: i64) -> Self {
        Self(drops)
    }

    /// Whole CSC to drops, `None` on overflow
    pub fn from_csc(csc: i64) -> Option<Self> {
        csc.checked_mul(DROPS_PER_CSC).map(Self)
    }

    pub const fn drops(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Within the protocol's absolute bound
    pub fn is_legal(self) -> bool {
        self.0.unsigned_abs() <= MAX_DROPS as u64
    }

    pub fn checked_add(self, rhs: CscAmount) -> Option<CscAmount> {
        self.0.checked_add(rhs.0).map(CscAmount)
    }

    pub fn checked_sub(self, rhs: CscAmount) -> Option<CscAmount> {
        self.0.checked_sub(rhs.0).map(CscAmount)
    }

    pub fn checked_mul(self, factor: i64) -> Option<CscAmount> {
        self.0.checked_mul(factor).map(CscAmount)
    }

    pub fn checked_neg(self) -> Option<CscAmount> {
        self.0.checked_neg().map(CscAmount)
    }

    /// Multiply then divide in 128-bit space, rounding down
    pub fn mul_div(self, mul: u64, div: u64) -> Option<CscAmount> {
        if div == 0 {
            return None;
        }
        let value = (self.0 as i128).checked_mul(mul as i128)? / div as i128;
        i64::try_from(value).ok().map(CscAmount)
    }
}

impl fmt::Display for CscAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = DROPS_PER_CSC as u64;
        write!(f, "{}{}.{:08} CSC", sign, abs / per, abs % per)
    }
}

/// Fee units, not yet scaled to drops
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FeeUnits(pub u64);

impl FeeUnits {
    pub const ZERO: FeeUnits = FeeUnits(0);

    pub fn saturating_add(self, rhs: FeeUnits) -> FeeUnits {
        FeeUnits(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_mul(self, factor: u64) -> FeeUnits {
        FeeUnits(self.0.saturating_mul(factor))
    }
}

/// Amount of a configured (WLT) token: `value * 10^-scale`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    pub currency: Currency,
    pub issuer: AccountId,
    pub value: i64,
    pub scale: u8,
}

impl TokenAmount {
    pub fn new(currency: Currency, issuer: AccountId, value: i64, scale: u8) -> Self {
        Self {
            currency,
            issuer,
            value,
            scale,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.value > 0
    }

    /// Strip trailing zeros so `1.50` and `1.5` compare equal
    pub fn normalized(&self) -> TokenAmount {
        let mut value = self.value;
        let mut scale = self.scale;
        while scale > 0 && value != 0 && value % 10 == 0 {
            value /= 10;
            scale -= 1;
        }
        TokenAmount {
            currency: self.currency,
            issuer: self.issuer,
            value,
            scale,
        }
    }

    /// Significant decimal places
    pub fn precision(&self) -> u8 {
        self.normalized().scale
    }

    /// Express in the smallest unit of a token with `decimals` places.
    /// `None` if precision is lost or the result overflows.
    pub fn to_units(&self, decimals: u8) -> Option<i64> {
        let norm = self.normalized();
        if norm.scale > decimals {
            return None;
        }
        let factor = 10i64.checked_pow(u32::from(decimals - norm.scale))?;
        norm.value.checked_mul(factor)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e-{} {}/{}", self.value, self.scale, self.currency, self.issuer)
    }
}

/// Either native CSC or a configured token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Amount {
    Native(CscAmount),
    Token(TokenAmount),
}

impl Amount {
    pub fn is_native(&self) -> bool {
        matches!(self, Amount::Native(_))
    }

    pub fn native(&self) -> Option<CscAmount> {
        match self {
            Amount::Native(amount) => Some(*amount),
            Amount::Token(_) => None,
        }
    }

    pub fn token(&self) -> Option<&TokenAmount> {
        match self {
            Amount::Native(_) => None,
            Amount::Token(token) => Some(token),
        }
    }

    pub fn is_positive(&self) -> bool {
        match self {
            Amount::Native(amount) => amount.is_positive(),
            Amount::Token(token) => token.is_positive(),
        }
    }
}

impl From<CscAmount> for Amount {
    fn from(amount: CscAmount) -> Self {
        Amount::Native(amount)
    }
}

impl From<TokenAmount> for Amount {
    fn from(amount: TokenAmount) -> Self {
        Amount::Token(amount)
    }
}
