//! Fiat and crypto amounts
//!
//! Amounts are `rust_decimal::Decimal` so that the fee split and the 8-digit
//! crypto rounding are exact and deterministic.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{EscrowError, Result};

/// Fractional digits kept on the crypto leg
pub const CRYPTO_DECIMALS: u32 = 8;

/// Currency signs stripped from free-text amounts
const CURRENCY_SIGNS: [char; 3] = ['£', '$', '€'];

/// Parse a fiat amount typed by the buyer
///
/// Accepts `1000`, `£1000`, `£1,000`, `£1,000.00` and `1000.00`. The result
/// must be strictly positive.
pub fn parse_fiat_amount(text: &str) -> Result<Decimal> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && !CURRENCY_SIGNS.contains(c))
        .collect();

    let amount: Decimal = cleaned
        .trim()
        .parse()
        .map_err(|_| EscrowError::invalid_input("amount", format!("'{}' is not a number", text.trim())))?;

    ensure_positive(amount)
}

/// Reject zero and negative fiat amounts
pub fn ensure_positive(amount: Decimal) -> Result<Decimal> {
    if amount > Decimal::ZERO {
        Ok(amount)
    } else {
        Err(EscrowError::invalid_input("amount", "must be greater than zero"))
    }
}

/// Convert a fiat amount at a quoted unit price into the crypto leg
///
/// `round(fiat / price, 8)` with banker's rounding on the midpoint.
pub fn crypto_amount(fiat: Decimal, price: Decimal) -> Result<Decimal> {
    if price <= Decimal::ZERO {
        return Err(EscrowError::invalid_input("price", "quoted price must be positive"));
    }
    let raw = fiat
        .checked_div(price)
        .ok_or_else(|| EscrowError::invalid_input("amount", "conversion overflow"))?;
    Ok(raw.round_dp_with_strategy(CRYPTO_DECIMALS, RoundingStrategy::MidpointNearestEven))
}

/// Render a crypto amount with all 8 fractional digits
pub fn format_crypto(amount: Decimal) -> String {
    format!("{:.8}", amount)
}
