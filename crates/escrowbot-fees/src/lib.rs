//! Escrow Fee Engine
//!
//! The escrow keeps a fixed percentage of the fiat leg; the seller is owed
//! the rest.
//!
//! | Fiat  | Rate | Fee | Payout |
//! |-------|------|-----|--------|
//! | 100   | 5%   | 5   | 95     |
//! | 1,250 | 5%   | 62.5| 1187.5 |
//!
//! `fee + payout == fiat` holds exactly because all arithmetic is decimal.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use escrowbot_types::Settlement;

/// Default escrow fee rate (5%)
pub const DEFAULT_FEE_RATE: Decimal = dec!(0.05);

/// Fee calculation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error("Invalid fee rate: {0}")]
    InvalidRate(String),
}

pub type FeeResult<T> = Result<T, FeeError>;

/// Split a fiat amount into escrow fee and seller payout
///
/// `fee = fiat * rate`, `payout = fiat - fee`. Pure and total.
pub fn compute_settlement(fiat_amount: Decimal, fee_rate: Decimal) -> Settlement {
    let fee = fiat_amount * fee_rate;
    Settlement {
        fee,
        payout: fiat_amount - fee,
    }
}

/// Fee calculator bound to a validated rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCalculator {
    fee_rate: Decimal,
}

impl FeeCalculator {
    /// Create a calculator; the rate must lie in `[0, 1)`
    pub fn new(fee_rate: Decimal) -> FeeResult<Self> {
        if fee_rate < Decimal::ZERO || fee_rate >= Decimal::ONE {
            return Err(FeeError::InvalidRate(format!(
                "{} is outside [0, 1)",
                fee_rate
            )));
        }
        Ok(Self { fee_rate })
    }

    /// Configured rate
    pub fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }

    /// Rate as a percentage, e.g. `5` for 0.05
    pub fn fee_percent(&self) -> Decimal {
        (self.fee_rate * dec!(100)).normalize()
    }

    /// Split a fiat amount at the configured rate
    pub fn settle(&self, fiat_amount: Decimal) -> Settlement {
        compute_settlement(fiat_amount, self.fee_rate)
    }
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self {
            fee_rate: DEFAULT_FEE_RATE,
        }
    }
}
