//! Escrow bot price quotes
//!
//! The state machine fixes the crypto leg of a trade from a single quote
//! taken when the buyer enters the fiat amount. Providers implement
//! [`PriceQuotePort`]; a failed quote never mutates a ticket.
//!
//! # Providers
//!
//! - [`CoinGeckoQuotes`]: public CoinGecko `simple/price` endpoint
//! - [`FixedQuotes`]: in-memory price table for development and tests

pub mod coingecko;
pub mod fixed;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

pub use coingecko::{CoinGeckoConfig, CoinGeckoQuotes};
pub use escrowbot_types::{CryptoSymbol, FiatCurrency};
pub use fixed::FixedQuotes;

/// Quote errors
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("No price available for {symbol} in {fiat}")]
    Unavailable { symbol: CryptoSymbol, fiat: FiatCurrency },

    #[error("Price request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed price response: {0}")]
    Malformed(String),
}

/// Result type for quote operations
pub type QuoteResult<T> = Result<T, QuoteError>;

/// Trait for price oracles
///
/// Implementations are idempotent and side-effect free from the caller's
/// point of view. A returned price is always strictly positive.
#[async_trait]
pub trait PriceQuotePort: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Unit price of `symbol` expressed in `fiat`
    async fn quote(&self, symbol: CryptoSymbol, fiat: FiatCurrency) -> QuoteResult<Decimal>;
}
