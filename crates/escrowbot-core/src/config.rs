//! Escrow desk configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

use escrowbot_fees::{FeeCalculator, FeeError, DEFAULT_FEE_RATE};
use escrowbot_types::{CryptoSymbol, FiatCurrency, UserId};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error("Crypto catalogue is empty")]
    EmptyCatalogue,

    #[error("Auto-dispute window must be at least one minute")]
    ZeroAutoDispute,
}

/// Business settings for a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Fee withheld from the fiat amount, in [0, 1)
    pub fee_rate: Decimal,
    /// Currency the buyer pays in
    pub fiat_currency: FiatCurrency,
    /// Symbols offered at crypto selection, in display order
    pub catalogue: Vec<CryptoSymbol>,
    /// Escrow deposit address per symbol
    pub deposit_wallets: HashMap<CryptoSymbol, String>,
    /// Users allowed to confirm payments, release funds and resolve disputes
    pub admins: HashSet<UserId>,
    /// Raise a dispute automatically when the buyer stays silent this long
    /// after the goods were sent
    pub auto_dispute_minutes: Option<u64>,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            fee_rate: DEFAULT_FEE_RATE,
            fiat_currency: FiatCurrency::default(),
            catalogue: CryptoSymbol::ALL.to_vec(),
            deposit_wallets: HashMap::new(),
            admins: HashSet::new(),
            auto_dispute_minutes: None,
        }
    }
}

impl EscrowConfig {
    pub fn with_admin(mut self, admin: UserId) -> Self {
        self.admins.insert(admin);
        self
    }

    pub fn with_wallet(mut self, symbol: CryptoSymbol, address: impl Into<String>) -> Self {
        self.deposit_wallets.insert(symbol, address.into());
        self
    }

    pub fn with_auto_dispute_minutes(mut self, minutes: u64) -> Self {
        self.auto_dispute_minutes = Some(minutes);
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        FeeCalculator::new(self.fee_rate)?;
        if self.catalogue.is_empty() {
            return Err(ConfigError::EmptyCatalogue);
        }
        if self.auto_dispute_minutes == Some(0) {
            return Err(ConfigError::ZeroAutoDispute);
        }
        Ok(())
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    pub fn supports(&self, symbol: CryptoSymbol) -> bool {
        self.catalogue.contains(&symbol)
    }

    pub fn deposit_wallet(&self, symbol: CryptoSymbol) -> Option<&str> {
        self.deposit_wallets.get(&symbol).map(String::as_str)
    }

    pub fn auto_dispute_after(&self) -> Option<Duration> {
        self.auto_dispute_minutes
            .map(|minutes| Duration::from_secs(minutes * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = EscrowConfig::default();
        assert_eq!(config.fee_rate, dec!(0.05));
        assert_eq!(config.fiat_currency, FiatCurrency::GBP);
        assert_eq!(config.catalogue.len(), 4);
        assert!(config.validate().is_ok());
        assert!(config.auto_dispute_after().is_none());
    }

    #[test]
    fn test_validation() {
        let bad_fee = EscrowConfig {
            fee_rate: dec!(1),
            ..Default::default()
        };
        assert!(matches!(bad_fee.validate(), Err(ConfigError::Fee(_))));

        let empty = EscrowConfig {
            catalogue: vec![],
            ..Default::default()
        };
        assert!(matches!(empty.validate(), Err(ConfigError::EmptyCatalogue)));

        let zero = EscrowConfig::default().with_auto_dispute_minutes(0);
        assert!(matches!(zero.validate(), Err(ConfigError::ZeroAutoDispute)));
    }

    #[test]
    fn test_lookups() {
        let config = EscrowConfig::default()
            .with_admin(UserId(1))
            .with_wallet(CryptoSymbol::BTC, "bc1qescrow")
            .with_auto_dispute_minutes(90);

        assert!(config.is_admin(UserId(1)));
        assert!(!config.is_admin(UserId(2)));
        assert_eq!(config.deposit_wallet(CryptoSymbol::BTC), Some("bc1qescrow"));
        assert_eq!(config.deposit_wallet(CryptoSymbol::SOL), None);
        assert_eq!(config.auto_dispute_after(), Some(Duration::from_secs(5400)));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EscrowConfig = serde_json::from_str(
            r#"{"fee_rate": "0.1", "admins": [9], "deposit_wallets": {"ETH": "0xabc"}}"#,
        )
        .unwrap();
        assert_eq!(config.fee_rate, dec!(0.1));
        assert!(config.is_admin(UserId(9)));
        assert_eq!(config.deposit_wallet(CryptoSymbol::ETH), Some("0xabc"));
        assert_eq!(config.catalogue, CryptoSymbol::ALL.to_vec());
    }
}
