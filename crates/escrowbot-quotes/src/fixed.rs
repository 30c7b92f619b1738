//! Fixed-price provider
//!
//! Serves prices from an in-memory table. Symbols can be marked unavailable
//! to simulate an oracle outage.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::{CryptoSymbol, FiatCurrency, PriceQuotePort, QuoteError, QuoteResult};

/// In-memory price table
#[derive(Default)]
pub struct FixedQuotes {
    prices: RwLock<HashMap<CryptoSymbol, Decimal>>,
    unavailable: RwLock<HashSet<CryptoSymbol>>,
    requests: AtomicUsize,
}

impl FixedQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(symbol, price)` pairs
    pub fn with_prices(prices: impl IntoIterator<Item = (CryptoSymbol, Decimal)>) -> Self {
        let quotes = Self::new();
        for (symbol, price) in prices {
            quotes.set_price(symbol, price);
        }
        quotes
    }

    pub fn set_price(&self, symbol: CryptoSymbol, price: Decimal) {
        self.prices.write().insert(symbol, price);
    }

    /// Make quotes for `symbol` fail until [`FixedQuotes::restore`] is called
    pub fn set_unavailable(&self, symbol: CryptoSymbol) {
        self.unavailable.write().insert(symbol);
    }

    pub fn restore(&self, symbol: CryptoSymbol) {
        self.unavailable.write().remove(&symbol);
    }

    /// Number of quotes requested so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceQuotePort for FixedQuotes {
    fn name(&self) -> &'static str {
        "Fixed"
    }

    async fn quote(&self, symbol: CryptoSymbol, fiat: FiatCurrency) -> QuoteResult<Decimal> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.read().contains(&symbol) {
            return Err(QuoteError::Unavailable { symbol, fiat });
        }

        match self.prices.read().get(&symbol) {
            Some(price) if *price > Decimal::ZERO => Ok(*price),
            _ => Err(QuoteError::Unavailable { symbol, fiat }),
        }
    }
}
