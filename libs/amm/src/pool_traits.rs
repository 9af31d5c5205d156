//! Pool trait definitions for a unified pricing interface

use crate::errors::Result;
use crate::v2_math::{V2Math, V2PoolState};
use rust_decimal::Decimal;

/// Pricing view over a directed pool
pub trait AmmPool {
    /// Calculate output amount for given input
    fn get_amount_out(&self, amount_in: Decimal) -> Result<Decimal>;

    /// Calculate required input for desired output
    fn get_amount_in(&self, amount_out: Decimal) -> Result<Decimal>;

    /// Get current reserves as (in, out)
    fn get_liquidity(&self) -> (Decimal, Decimal);

    /// Get fee tier
    fn get_fee_bps(&self) -> u16;
}

impl AmmPool for V2PoolState {
    fn get_amount_out(&self, amount_in: Decimal) -> Result<Decimal> {
        V2Math::calculate_output_amount(self, amount_in).map(|swap| swap.amount_out)
    }

    fn get_amount_in(&self, amount_out: Decimal) -> Result<Decimal> {
        V2Math::calculate_input_amount(self, amount_out)
    }

    fn get_liquidity(&self) -> (Decimal, Decimal) {
        (self.reserve_in, self.reserve_out)
    }

    fn get_fee_bps(&self) -> u16 {
        self.fee_bps
    }
}
