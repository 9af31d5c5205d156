//! Constant-product (x*y=k) math with exact decimal arithmetic
//!
//! Every intermediate result is truncated toward zero to [`AMOUNT_SCALE`]
//! fractional digits. Truncation always favours the pool: swap outputs,
//! minted shares and withdrawn amounts are never rounded up, so the
//! product of reserves cannot shrink through rounding.

use crate::errors::{ExchangeError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;
use types::PairId;

pub use types::AMOUNT_SCALE;

/// Basis-point denominator (10_000 bps = 100%)
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Fractional digits kept for price impact figures
pub const IMPACT_SCALE: u32 = 2;

/// Truncate toward zero at [`AMOUNT_SCALE`]
#[inline]
pub fn truncate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero)
}

/// Round away from zero at [`AMOUNT_SCALE`] (used when the caller must pay)
#[inline]
pub fn round_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::AwayFromZero)
}

/// Smallest representable amount
#[inline]
pub fn unit() -> Decimal {
    Decimal::new(1, AMOUNT_SCALE)
}

fn mul(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal> {
    a.checked_mul(b).ok_or(ExchangeError::Overflow { operation })
}

fn div(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal> {
    a.checked_div(b).ok_or(ExchangeError::Overflow { operation })
}

fn add(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal> {
    a.checked_add(b).ok_or(ExchangeError::Overflow { operation })
}

/// A pair seen from the side of an incoming asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V2PoolState {
    pub pair: PairId,
    pub reserve_in: Decimal,
    pub reserve_out: Decimal,
    pub fee_bps: u16, // Fee in basis points (30 = 0.3%)
}

/// Breakdown of a single constant-product swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapComputation {
    pub amount_in: Decimal,
    pub fee: Decimal,
    pub amount_in_after_fee: Decimal,
    pub amount_out: Decimal,
}

/// V2 AMM math functions with zero precision loss
pub struct V2Math;

impl V2Math {
    /// Fee charged on `amount_in`: `amount_in * fee_bps / 10_000`
    pub fn fee_amount(amount_in: Decimal, fee_bps: u16) -> Result<Decimal> {
        let scaled = mul(amount_in, Decimal::from(fee_bps), "fee")?;
        Ok(truncate(scaled / Decimal::from(BPS_DENOMINATOR)))
    }

    /// Calculate exact output amount using the x*y=k formula with fee on input
    ///
    /// `amount_out = (amount_in - fee) * reserve_out / (reserve_in + amount_in - fee)`
    pub fn calculate_output_amount(
        pool: &V2PoolState,
        amount_in: Decimal,
    ) -> Result<SwapComputation> {
        if amount_in <= Decimal::ZERO {
            return Err(ExchangeError::InsufficientInputAmount { amount_in });
        }
        if pool.reserve_in <= Decimal::ZERO || pool.reserve_out <= Decimal::ZERO {
            return Err(ExchangeError::NoLiquidity { pair: pool.pair });
        }

        let fee = Self::fee_amount(amount_in, pool.fee_bps)?;
        let amount_in_after_fee = amount_in - fee;

        let numerator = mul(amount_in_after_fee, pool.reserve_out, "swap numerator")?;
        let denominator = add(pool.reserve_in, amount_in_after_fee, "swap denominator")?;
        let amount_out = truncate(div(numerator, denominator, "swap output")?);

        Ok(SwapComputation {
            amount_in,
            fee,
            amount_in_after_fee,
            amount_out,
        })
    }

    /// Calculate required input amount for a desired output (reverse calculation)
    ///
    /// Rounded up so the returned input always buys at least `amount_out`.
    pub fn calculate_input_amount(pool: &V2PoolState, amount_out: Decimal) -> Result<Decimal> {
        if amount_out <= Decimal::ZERO {
            return Err(ExchangeError::InsufficientOutputAmount { amount_out });
        }
        if pool.reserve_in <= Decimal::ZERO || pool.reserve_out <= Decimal::ZERO {
            return Err(ExchangeError::NoLiquidity { pair: pool.pair });
        }
        if amount_out >= pool.reserve_out {
            return Err(ExchangeError::NoLiquidity { pair: pool.pair });
        }

        let bps = Decimal::from(BPS_DENOMINATOR);
        let numerator = mul(
            mul(pool.reserve_in, amount_out, "reverse numerator")?,
            bps,
            "reverse numerator",
        )?;
        let denominator = mul(
            pool.reserve_out - amount_out,
            bps - Decimal::from(pool.fee_bps),
            "reverse denominator",
        )?;
        if denominator <= Decimal::ZERO {
            return Err(ExchangeError::NoLiquidity { pair: pool.pair });
        }

        let mut amount_in = round_up(div(numerator, denominator, "reverse input")?);

        // The fee is truncated on the forward path, so nudge upward until the
        // forward computation actually delivers the requested output
        for _ in 0..4 {
            let forward = Self::calculate_output_amount(pool, amount_in)?;
            if forward.amount_out >= amount_out {
                break;
            }
            amount_in += unit();
        }

        Ok(amount_in)
    }

    /// Amount of the other asset that preserves the current reserve ratio
    ///
    /// `quote = amount * reserve_other / reserve_this`
    pub fn quote(amount: Decimal, reserve_this: Decimal, reserve_other: Decimal) -> Result<Decimal> {
        if reserve_this <= Decimal::ZERO {
            return Err(ExchangeError::InsufficientInputAmount {
                amount_in: reserve_this,
            });
        }
        Ok(truncate(div(
            mul(amount, reserve_other, "ratio quote")?,
            reserve_this,
            "ratio quote",
        )?))
    }

    /// Price impact in basis points of moving the reserves by a trade
    ///
    /// Compares `reserve_out / reserve_in` before and after the trade; the
    /// result is the relative decrease, floored at zero.
    pub fn calculate_price_impact(
        pool: &V2PoolState,
        amount_in: Decimal,
        amount_out: Decimal,
    ) -> Result<Decimal> {
        if pool.reserve_in <= Decimal::ZERO || pool.reserve_out <= Decimal::ZERO {
            return Err(ExchangeError::NoLiquidity { pair: pool.pair });
        }

        let price_before = div(pool.reserve_out, pool.reserve_in, "price before")?;
        let new_reserve_in = add(pool.reserve_in, amount_in, "price after")?;
        let new_reserve_out = pool.reserve_out - amount_out;
        let price_after = div(new_reserve_out, new_reserve_in, "price after")?;

        let relative = div(price_before - price_after, price_before, "price impact")?;
        let impact = mul(relative, Decimal::from(BPS_DENOMINATOR), "price impact")?
            .round_dp_with_strategy(IMPACT_SCALE, RoundingStrategy::ToZero);

        Ok(impact.max(Decimal::ZERO))
    }

    /// Combine per-hop impacts: `1 - Π(1 - impact_i)`, in basis points
    pub fn compound_price_impact(impacts: &[Decimal]) -> Decimal {
        let bps = Decimal::from(BPS_DENOMINATOR);
        let retained = impacts
            .iter()
            .fold(Decimal::ONE, |acc, impact| acc * (bps - *impact) / bps);
        ((Decimal::ONE - retained) * bps)
            .round_dp_with_strategy(IMPACT_SCALE, RoundingStrategy::ToZero)
            .max(Decimal::ZERO)
    }

    /// `reserve_a * reserve_b`, or `None` when the product is not representable
    pub fn constant_product(reserve_a: Decimal, reserve_b: Decimal) -> Option<Decimal> {
        reserve_a.checked_mul(reserve_b)
    }

    /// Shares minted by the first deposit into an empty pair, before the
    /// minimum-liquidity lock is subtracted: `sqrt(amount_a * amount_b)`
    ///
    /// The product is attempted exactly; when it is not representable the
    /// square roots are taken separately instead.
    pub fn initial_liquidity(amount_a: Decimal, amount_b: Decimal) -> Result<Decimal> {
        match amount_a.checked_mul(amount_b) {
            Some(product) => Self::decimal_sqrt(product),
            None => {
                debug!(%amount_a, %amount_b, "Deposit product overflows, taking separate roots");
                let root_a = Self::decimal_sqrt(amount_a)?;
                let root_b = Self::decimal_sqrt(amount_b)?;
                Ok(truncate(mul(root_a, root_b, "initial liquidity")?))
            }
        }
    }

    /// Shares minted for a proportional deposit: the stricter of both ratios
    pub fn proportional_shares(
        amount_a: Decimal,
        amount_b: Decimal,
        reserve_a: Decimal,
        reserve_b: Decimal,
        total_shares: Decimal,
    ) -> Result<Decimal> {
        let by_a = truncate(div(
            mul(amount_a, total_shares, "shares for a")?,
            reserve_a,
            "shares for a",
        )?);
        let by_b = truncate(div(
            mul(amount_b, total_shares, "shares for b")?,
            reserve_b,
            "shares for b",
        )?);
        Ok(by_a.min(by_b))
    }

    /// Assets released by burning `shares`: `shares * reserve / total_shares`
    pub fn amount_for_shares(
        shares: Decimal,
        reserve: Decimal,
        total_shares: Decimal,
    ) -> Result<Decimal> {
        Ok(truncate(div(
            mul(shares, reserve, "withdraw amount")?,
            total_shares,
            "withdraw amount",
        )?))
    }

    /// Square root truncated to [`AMOUNT_SCALE`] using Newton's method
    ///
    /// The result `r` satisfies `r² <= value < (r + unit)²`.
    pub fn decimal_sqrt(value: Decimal) -> Result<Decimal> {
        if value < dec!(0) {
            return Err(ExchangeError::Overflow {
                operation: "square root of negative value",
            });
        }
        if value == dec!(0) {
            return Ok(dec!(0));
        }

        // Start above the root so the iteration decreases monotonically
        let mut x = if value > Decimal::ONE {
            value
        } else {
            Decimal::ONE
        };

        let max_iterations = 200;
        for _ in 0..max_iterations {
            let next_x = (x + value / x) / dec!(2);
            if next_x >= x {
                break;
            }
            x = next_x;
        }

        let mut root = truncate(x);
        let step = unit();
        while root > Decimal::ZERO && mul(root, root, "square root")? > value {
            root -= step;
        }
        loop {
            let candidate = root + step;
            match candidate.checked_mul(candidate) {
                Some(square) if square <= value => root = candidate,
                _ => break,
            }
        }

        Ok(root)
    }
}
