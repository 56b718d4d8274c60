//! Node configuration consumed by the transactor pipeline

use crate::amount::{CscAmount, DROPS_PER_CSC};
use crate::error::{Error, Result};
use crate::fee::FeeSettings;
use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Which fee is taken from the account once apply is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeePolicy {
    /// The full fee the submitter offered
    #[default]
    Offered,
    /// Only the computed base fee, never more than offered
    Base,
}

impl FromStr for FeePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "offered" => Ok(FeePolicy::Offered),
            "base" => Ok(FeePolicy::Base),
            other => Err(Error::Config {
                reason: format!("unknown fee policy '{}'", other),
            }),
        }
    }
}

/// A configured token (WLT) as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub currency: String,
    /// Issuer account, hex
    pub issuer: String,
    pub total_supply: i64,
    pub decimals: u8,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Largest total memo payload accepted, in bytes
    pub max_memo_size: usize,

    /// Cost of a reference transaction, in drops
    pub fee_default: i64,

    /// Fee units of a reference transaction
    pub reference_fee_units: u64,

    /// Base reserve, in drops
    pub account_reserve: i64,

    /// Reserve per owned object, in drops
    pub owner_reserve: i64,

    /// Network this node serves
    pub network_id: u32,

    /// Reject transactions that omit the network id
    pub require_network_id: bool,

    pub fee_policy: FeePolicy,

    /// Accounts refused as source or destination (hex)
    pub blacklist_accounts: Vec<String>,

    /// Allow-list mode is active when present (hex)
    pub whitelist_accounts: Option<Vec<String>>,

    /// Accounts trusted to attest KYC; always pass the allow-list (hex)
    pub kyc_trusted_accounts: Vec<String>,

    pub tokens: Vec<TokenSpec>,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memo_size: 1024,
            fee_default: 1_000_000,
            reference_fee_units: 1000,
            account_reserve: 10 * DROPS_PER_CSC,
            owner_reserve: 5 * DROPS_PER_CSC,
            network_id: 0,
            require_network_id: false,
            fee_policy: FeePolicy::Offered,
            blacklist_accounts: Vec::new(),
            whitelist_accounts: None,
            kyc_trusted_accounts: Vec::new(),
            tokens: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config {
            reason: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override fields from `CSC_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("CSC_MAX_MEMO_SIZE") {
            self.max_memo_size = parse_env("CSC_MAX_MEMO_SIZE", &value)?;
        }

        if let Ok(value) = std::env::var("CSC_NETWORK_ID") {
            self.network_id = parse_env("CSC_NETWORK_ID", &value)?;
        }

        if let Ok(value) = std::env::var("CSC_FEE_POLICY") {
            self.fee_policy = value.parse()?;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.reference_fee_units == 0 {
            return Err(Error::Config {
                reason: "reference_fee_units must be positive".to_string(),
            });
        }
        for (name, drops) in [
            ("fee_default", self.fee_default),
            ("account_reserve", self.account_reserve),
            ("owner_reserve", self.owner_reserve),
        ] {
            if !CscAmount::from_drops(drops).is_legal() {
                return Err(Error::Config {
                    reason: format!("{} out of range: {}", name, drops),
                });
            }
        }
        Ok(())
    }

    /// Fee schedule for a fresh ledger built from this config
    pub fn fee_settings(&self) -> FeeSettings {
        FeeSettings {
            base_fee: CscAmount::from_drops(self.fee_default),
            reference_fee_units: self.reference_fee_units,
            reserve_base: CscAmount::from_drops(self.account_reserve),
            reserve_increment: CscAmount::from_drops(self.owner_reserve),
        }
    }

    pub fn blacklist(&self) -> Result<Vec<AccountId>> {
        parse_accounts(&self.blacklist_accounts)
    }

    pub fn whitelist(&self) -> Result<Option<Vec<AccountId>>> {
        self.whitelist_accounts
            .as_deref()
            .map(parse_accounts)
            .transpose()
    }

    pub fn kyc_trusted(&self) -> Result<Vec<AccountId>> {
        parse_accounts(&self.kyc_trusted_accounts)
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::Config {
        reason: format!("{} has invalid value '{}'", name, value),
    })
}

fn parse_accounts(hex_ids: &[String]) -> Result<Vec<AccountId>> {
    hex_ids.iter().map(|s| AccountId::from_hex(s)).collect()
}
