//! Currency types for the escrow bot
//!
//! The crypto leg is drawn from a small fixed catalogue; the fiat leg is a
//! single configured currency per deployment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cryptocurrencies a trade can settle in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CryptoSymbol {
    /// Bitcoin
    #[serde(alias = "btc")]
    BTC,
    /// Ethereum
    #[serde(alias = "eth")]
    ETH,
    /// Litecoin
    #[serde(alias = "ltc")]
    LTC,
    /// Solana
    #[serde(alias = "sol")]
    SOL,
}

impl CryptoSymbol {
    /// Every symbol the bot knows about, in display order
    pub const ALL: [CryptoSymbol; 4] = [Self::BTC, Self::ETH, Self::LTC, Self::SOL];

    /// Get the ticker symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::BTC => "BTC",
            Self::ETH => "ETH",
            Self::LTC => "LTC",
            Self::SOL => "SOL",
        }
    }

    /// CoinGecko coin identifier used by the price oracle
    pub fn coingecko_id(&self) -> &'static str {
        match self {
            Self::BTC => "bitcoin",
            Self::ETH => "ethereum",
            Self::LTC => "litecoin",
            Self::SOL => "solana",
        }
    }
}

impl fmt::Display for CryptoSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Error returned when a symbol is not in the catalogue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported crypto symbol: {0}")]
pub struct UnknownSymbol(pub String);

impl FromStr for CryptoSymbol {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.symbol() == upper)
            .ok_or_else(|| UnknownSymbol(s.to_string()))
    }
}

/// Fiat currencies the buyer can pay in (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiatCurrency {
    GBP,
    USD,
    EUR,
}

impl FiatCurrency {
    /// Get the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::GBP => "GBP",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }

    /// Lowercase code as expected by price APIs
    pub fn api_code(&self) -> String {
        self.code().to_ascii_lowercase()
    }

    /// Currency sign used in chat messages
    pub fn sign(&self) -> char {
        match self {
            Self::GBP => '£',
            Self::USD => '$',
            Self::EUR => '€',
        }
    }
}

impl Default for FiatCurrency {
    fn default() -> Self {
        Self::GBP
    }
}

impl fmt::Display for FiatCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
