//! CoinGecko price provider

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::{CryptoSymbol, FiatCurrency, PriceQuotePort, QuoteError, QuoteResult};

/// Configuration for the CoinGecko provider
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("ESCROWBOT_COINGECKO_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
            timeout: Duration::from_secs(10),
        }
    }
}

/// CoinGecko `simple/price` client
pub struct CoinGeckoQuotes {
    config: CoinGeckoConfig,
    client: reqwest::Client,
}

impl CoinGeckoQuotes {
    pub fn new(config: CoinGeckoConfig) -> QuoteResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> QuoteResult<Self> {
        Self::new(CoinGeckoConfig::default())
    }

    fn price_url(&self, symbol: CryptoSymbol, fiat: FiatCurrency) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies={}",
            self.config.base_url.trim_end_matches('/'),
            symbol.coingecko_id(),
            fiat.api_code()
        )
    }
}

/// Response shape: `{"bitcoin": {"gbp": 51234.5}}`
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

/// Extract a positive price from a `simple/price` body
pub(crate) fn parse_price(
    body: &str,
    symbol: CryptoSymbol,
    fiat: FiatCurrency,
) -> QuoteResult<Decimal> {
    let parsed: SimplePriceResponse =
        serde_json::from_str(body).map_err(|e| QuoteError::Malformed(e.to_string()))?;

    let raw = parsed
        .get(symbol.coingecko_id())
        .and_then(|prices| prices.get(&fiat.api_code()))
        .copied()
        .ok_or(QuoteError::Unavailable { symbol, fiat })?;

    match Decimal::from_f64(raw) {
        Some(price) if price > Decimal::ZERO => Ok(price),
        _ => Err(QuoteError::Unavailable { symbol, fiat }),
    }
}

#[async_trait]
impl PriceQuotePort for CoinGeckoQuotes {
    fn name(&self) -> &'static str {
        "CoinGecko"
    }

    async fn quote(&self, symbol: CryptoSymbol, fiat: FiatCurrency) -> QuoteResult<Decimal> {
        let url = self.price_url(symbol, fiat);
        tracing::debug!(%symbol, %fiat, url = %url, "Requesting CoinGecko price");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.text().await?;
        let price = parse_price(&body, symbol, fiat)?;

        tracing::debug!(%symbol, %fiat, %price, "CoinGecko price received");
        Ok(price)
    }
}
