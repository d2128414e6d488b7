//! Price quotes shown next to the quantity selector.

use alloy::primitives::utils::format_ether;
use alloy::primitives::U256;
use serde::Serialize;

use clones_core::config::PricePrecision;

/// Total cost of a mint and the share that goes to the prize pool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceQuote {
    /// Tokens in the quote
    pub quantity: u32,
    /// `unit_price * quantity`, rounded to the total precision
    pub total: String,
    /// Half of the total, rounded to the prize precision
    pub towards_prize: String,
}

impl PriceQuote {
    /// Quotes `quantity` tokens at `unit_price` ether each.
    ///
    /// Exact ties round half to even, so a prize share of exactly `0.25`
    /// shown with one digit reads `0.2`, not `0.3`.
    pub fn compute(unit_price: f64, quantity: u32, precision: PricePrecision) -> Self {
        let total = unit_price * f64::from(quantity);
        Self {
            quantity,
            total: format!("{:.*}", precision.total_digits, total),
            towards_prize: format!("{:.*}", precision.prize_digits, total / 2.0),
        }
    }
}

/// Converts wei to ether for display arithmetic.
pub fn wei_to_ether(wei: U256) -> f64 {
    format_ether(wei).parse().unwrap_or(0.0)
}

/// Exact ETH value to attach to a priced mint.
pub fn mint_value(unit_price_wei: U256, quantity: u32) -> U256 {
    unit_price_wei.saturating_mul(U256::from(quantity))
}
