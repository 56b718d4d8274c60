//! Compliance lists and configured-token rules
//!
//! Readers take one immutable [`ComplianceSnapshot`] per check; the updater
//! publishes whole replacement snapshots through an `ArcSwap`, so a check
//! never sees a half-applied update.

use crate::amount::TokenAmount;
use crate::config::Config;
use crate::error::{Result, Ter};
use crate::logging::Journal;
use crate::types::{AccountId, Currency};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Issuance rules for one configured token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub currency: Currency,
    pub issuer: AccountId,
    /// Total supply in the token's smallest unit
    pub total_supply: i64,
    /// Decimal places of the smallest unit
    pub decimals: u8,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceSnapshot {
    /// Bumped on every publish
    pub version: u64,
    pub blacklist: BTreeSet<AccountId>,
    /// `None` when allow-list mode is off
    pub whitelist: Option<BTreeSet<AccountId>>,
    pub kyc_trusted: BTreeSet<AccountId>,
    pub tokens: BTreeMap<Currency, TokenConfig>,
}

impl ComplianceSnapshot {
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut tokens = BTreeMap::new();
        for spec in &config.tokens {
            let currency = Currency::from_code(&spec.currency).ok_or_else(|| {
                crate::Error::Config {
                    reason: format!("invalid token currency '{}'", spec.currency),
                }
            })?;
            tokens.insert(
                currency,
                TokenConfig {
                    currency,
                    issuer: AccountId::from_hex(&spec.issuer)?,
                    total_supply: spec.total_supply,
                    decimals: spec.decimals,
                    enabled: spec.enabled,
                },
            );
        }

        Ok(Self {
            version: 0,
            blacklist: config.blacklist()?.into_iter().collect(),
            whitelist: config.whitelist()?.map(|w| w.into_iter().collect()),
            kyc_trusted: config.kyc_trusted()?.into_iter().collect(),
            tokens,
        })
    }

    pub fn is_blacklisted(&self, account: &AccountId) -> bool {
        self.blacklist.contains(account)
    }

    /// Always true when allow-list mode is off. KYC-trusted accounts always pass.
    pub fn is_whitelisted(&self, account: &AccountId) -> bool {
        match &self.whitelist {
            None => true,
            Some(allowed) => allowed.contains(account) || self.kyc_trusted.contains(account),
        }
    }

    pub fn whitelist_active(&self) -> bool {
        self.whitelist.is_some()
    }

    pub fn token(&self, currency: &Currency) -> Option<&TokenConfig> {
        self.tokens.get(currency)
    }
}

/// Holder of the current compliance snapshot
#[derive(Debug)]
pub struct ComplianceRegistry {
    current: ArcSwap<ComplianceSnapshot>,
}

impl ComplianceRegistry {
    pub fn new(snapshot: ComplianceSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The snapshot in force right now
    pub fn snapshot(&self) -> Arc<ComplianceSnapshot> {
        self.current.load_full()
    }

    /// Replace the snapshot wholesale; the version is advanced past the current one
    pub fn publish(&self, snapshot: ComplianceSnapshot) {
        self.current.rcu(|current| {
            let mut next = snapshot.clone();
            next.version = current.version + 1;
            next
        });
    }

    /// Copy, modify and publish the current snapshot atomically
    pub fn update<F>(&self, mut f: F)
    where
        F: FnMut(&mut ComplianceSnapshot),
    {
        self.current.rcu(|current| {
            let mut next = ComplianceSnapshot::clone(current);
            f(&mut next);
            next.version = current.version + 1;
            next
        });
    }
}

impl Default for ComplianceRegistry {
    fn default() -> Self {
        Self::new(ComplianceSnapshot::default())
    }
}

/// Whether a token amount obeys its issuance rules
pub fn is_wlt_compliant(amount: &TokenAmount, token: &TokenConfig, journal: &Journal) -> Ter {
    if amount.currency != token.currency {
        journal.debug(format!(
            "token currency {} does not match configured {}",
            amount.currency, token.currency
        ));
        return Ter::TemBadCurrency;
    }

    if amount.issuer != token.issuer {
        journal.debug(format!("token issuer {} is not the configured issuer", amount.issuer));
        return Ter::TemBadIssuer;
    }

    if !token.enabled {
        journal.debug(format!("token {} is disabled", token.currency));
        return Ter::TefWltNonCompliant;
    }

    if !amount.is_positive() {
        return Ter::TemBadAmount;
    }

    if amount.precision() > token.decimals {
        journal.debug(format!(
            "token amount has {} decimals, {} allowed",
            amount.precision(),
            token.decimals
        ));
        return Ter::TemBadPrecision;
    }

    match amount.to_units(token.decimals) {
        Some(units) if units <= token.total_supply => Ter::TesSuccess,
        _ => {
            journal.debug("token amount exceeds total supply");
            Ter::TefWltNonCompliant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wlt() -> TokenConfig {
        TokenConfig {
            currency: Currency::from_code("WLT").unwrap(),
            issuer: AccountId::from_bytes([9u8; 20]),
            total_supply: 1_000_000,
            decimals: 2,
            enabled: true,
        }
    }

    fn amount(value: i64, scale: u8) -> TokenAmount {
        let token = wlt();
        TokenAmount::new(token.currency, token.issuer, value, scale)
    }

    #[test]
    fn test_wlt_compliance() {
        let token = wlt();
        let journal = Journal::new("Test");
        assert_eq!(is_wlt_compliant(&amount(150, 2), &token, &journal), Ter::TesSuccess);
        assert_eq!(is_wlt_compliant(&amount(1500, 3), &token, &journal), Ter::TesSuccess);
        assert_eq!(is_wlt_compliant(&amount(1501, 3), &token, &journal), Ter::TemBadPrecision);
        assert_eq!(is_wlt_compliant(&amount(0, 0), &token, &journal), Ter::TemBadAmount);
        assert_eq!(
            is_wlt_compliant(&amount(1_000_001, 2), &token, &journal),
            Ter::TefWltNonCompliant
        );

        let mut foreign = amount(1, 0);
        foreign.issuer = AccountId::from_bytes([1u8; 20]);
        assert_eq!(is_wlt_compliant(&foreign, &token, &journal), Ter::TemBadIssuer);

        let disabled = TokenConfig {
            enabled: false,
            ..wlt()
        };
        assert_eq!(is_wlt_compliant(&amount(1, 0), &disabled, &journal), Ter::TefWltNonCompliant);
    }

    #[test]
    fn test_registry_publish_and_update() {
        let registry = ComplianceRegistry::default();
        let before = registry.snapshot();
        let bad = AccountId::from_bytes([3u8; 20]);

        registry.update(|s| {
            s.blacklist.insert(bad);
        });

        // Old readers keep their snapshot
        assert!(!before.is_blacklisted(&bad));
        let after = registry.snapshot();
        assert!(after.is_blacklisted(&bad));
        assert_eq!(after.version, before.version + 1);

        registry.publish(ComplianceSnapshot::default());
        assert!(!registry.snapshot().is_blacklisted(&bad));
        assert_eq!(registry.snapshot().version, 2);
    }

    #[test]
    fn test_concurrent_publishers_get_distinct_versions() {
        use rayon::prelude::*;

        let registry = ComplianceRegistry::default();
        (0..64u8).into_par_iter().for_each(|i| {
            if i % 2 == 0 {
                registry.publish(ComplianceSnapshot::default());
            } else {
                registry.update(|s| {
                    s.blacklist.insert(AccountId::from_bytes([i; 20]));
                });
            }
        });
        assert_eq!(registry.snapshot().version, 64);
    }

    #[test]
    fn test_whitelist_mode() {
        let member = AccountId::from_bytes([1u8; 20]);
        let kyc = AccountId::from_bytes([2u8; 20]);
        let outsider = AccountId::from_bytes([3u8; 20]);

        let mut snapshot = ComplianceSnapshot::default();
        assert!(snapshot.is_whitelisted(&outsider));

        snapshot.whitelist = Some([member].into_iter().collect());
        snapshot.kyc_trusted.insert(kyc);
        assert!(snapshot.is_whitelisted(&member));
        assert!(snapshot.is_whitelisted(&kyc));
        assert!(!snapshot.is_whitelisted(&outsider));
    }

    #[test]
    fn test_from_config() {
        let config = Config::from_toml_str(
            r#"
            whitelist_accounts = ["0101010101010101010101010101010101010101"]

            [[tokens]]
            currency = "WLT"
            issuer = "0909090909090909090909090909090909090909"
            total_supply = 1000000
            decimals = 2
            "#,
        )
        .unwrap();
        let snapshot = ComplianceSnapshot::from_config(&config).unwrap();
        assert!(snapshot.whitelist_active());
        assert_eq!(snapshot.token(&wlt().currency), Some(&wlt()));
    }
}
