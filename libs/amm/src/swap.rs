//! Swap Engine
//!
//! Single-hop constant-product swaps with the fee taken on input. Execution
//! and quoting share [`apply_swap`]; quotes simply run it against detached
//! snapshots whose effects are discarded.

use crate::errors::{ExchangeError, Result};
use crate::exchange::{ensure_account, ExchangeCore};
use crate::pair_ledger::{PairLedger, PairTransaction};
use crate::pool_traits::AmmPool;
use crate::v2_math::{truncate, V2Math};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use types::{AccountId, AssetId, ExchangeEvent, PairId};

/// Sell exactly `amount_in` of `asset_in` for at least `min_amount_out`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: Decimal,
    pub min_amount_out: Decimal,
    pub sender: AccountId,
    pub recipient: AccountId,
    pub deadline: u64,
}

/// Outcome of one hop, executed or quoted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    pub pair: PairId,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub fee: Decimal,
    /// Price impact in basis points
    pub price_impact_bps: Decimal,
}

/// Whether moving from `before` to `after` kept `reserve_in * reserve_out`
/// from shrinking
fn product_not_decreased(before: (Decimal, Decimal), after: (Decimal, Decimal)) -> bool {
    match (
        V2Math::constant_product(before.0, before.1),
        V2Math::constant_product(after.0, after.1),
    ) {
        (Some(k_before), Some(k_after)) => k_after >= k_before,
        // Not representable: compare growth of one side against shrink of the other
        _ => match (after.0.checked_div(before.0), before.1.checked_div(after.1)) {
            (Some(growth), Some(shrink)) => growth >= shrink,
            _ => false,
        },
    }
}

/// Execute one hop inside a ledger transaction
///
/// Updates reserves and counters and stages the `Swap`/`FeesAccrued`
/// notifications. Funds are not moved here; callers stage the transfers
/// for whatever enters or leaves the exchange.
pub(crate) fn apply_swap(
    txn: &mut PairTransaction<'_>,
    asset_in: AssetId,
    asset_out: AssetId,
    amount_in: Decimal,
    sender: AccountId,
    recipient: Option<AccountId>,
) -> Result<SwapResult> {
    let id = PairLedger::pair_id(asset_in, asset_out)?;
    let now = txn.now();

    let pair = txn.pair_mut(id)?;
    pair.ensure_active()?;

    let pool = pair.directed(asset_in)?;
    let swap = V2Math::calculate_output_amount(&pool, amount_in)?;
    if swap.amount_out <= Decimal::ZERO {
        return Err(ExchangeError::InsufficientOutputAmount {
            amount_out: swap.amount_out,
        });
    }
    if swap.amount_out >= pool.reserve_out {
        return Err(ExchangeError::NoLiquidity { pair: id });
    }
    let price_impact_bps = V2Math::calculate_price_impact(&pool, amount_in, swap.amount_out)?;

    pair.add_to_side(asset_in, amount_in)?;
    pair.remove_from_side(asset_out, swap.amount_out)?;

    let after = pair.directed(asset_in)?;
    if !product_not_decreased(
        (pool.reserve_in, pool.reserve_out),
        (after.reserve_in, after.reserve_out),
    ) {
        return Err(ExchangeError::InvariantViolation { pair: id });
    }

    pair.record_trade(asset_in, amount_in, swap.fee, now)?;
    let (reserve_a, reserve_b) = (pair.reserve_a, pair.reserve_b);

    txn.emit(ExchangeEvent::Swap {
        pair: id,
        sender,
        recipient,
        asset_in,
        asset_out,
        amount_in,
        amount_out: swap.amount_out,
        fee: swap.fee,
        reserve_a,
        reserve_b,
        timestamp: now,
    });
    if swap.fee > Decimal::ZERO {
        txn.emit(ExchangeEvent::FeesAccrued {
            pair: id,
            asset: asset_in,
            amount: swap.fee,
            timestamp: now,
        });
    }

    debug!(
        pair = %id,
        %amount_in,
        amount_out = %swap.amount_out,
        fee = %swap.fee,
        %price_impact_bps,
        "Hop applied"
    );

    Ok(SwapResult {
        pair: id,
        asset_in,
        asset_out,
        amount_in,
        amount_out: swap.amount_out,
        fee: swap.fee,
        price_impact_bps,
    })
}

/// Single-hop swap execution and quoting
pub struct SwapEngine<'a> {
    core: &'a ExchangeCore,
}

impl<'a> SwapEngine<'a> {
    pub(crate) fn new(core: &'a ExchangeCore) -> Self {
        Self { core }
    }

    /// Execute a single-hop swap
    pub fn swap(&self, request: &SwapRequest) -> Result<SwapResult> {
        let now = self.core.check_deadline(request.deadline)?;
        ensure_account(request.sender, "sender")?;
        ensure_account(request.recipient, "recipient")?;
        let id = PairLedger::pair_id(request.asset_in, request.asset_out)?;

        let result = self.core.execute(&[id], now, |txn| {
            let result = apply_swap(
                txn,
                request.asset_in,
                request.asset_out,
                request.amount_in,
                request.sender,
                Some(request.recipient),
            )?;
            if result.amount_out < request.min_amount_out {
                return Err(ExchangeError::SlippageExceeded {
                    amount_out: result.amount_out,
                    min_amount_out: request.min_amount_out,
                });
            }

            txn.debit(request.asset_in, request.sender, request.amount_in);
            txn.credit(request.asset_out, request.recipient, result.amount_out);
            Ok(result)
        })?;

        info!(
            pair = %id,
            sender = %request.sender,
            amount_in = %result.amount_in,
            amount_out = %result.amount_out,
            fee = %result.fee,
            "💱 Swap executed"
        );
        Ok(result)
    }

    /// Expected outcome of selling `amount_in` of `asset_in`
    ///
    /// Reads a snapshot; the figure may be stale by the time a swap runs.
    pub fn quote(&self, asset_in: AssetId, asset_out: AssetId, amount_in: Decimal) -> Result<SwapResult> {
        let id = PairLedger::pair_id(asset_in, asset_out)?;
        let snapshot = self.core.ledger().get_pair(id)?;
        let mut txn = PairTransaction::detached([snapshot], self.core.now());
        apply_swap(&mut txn, asset_in, asset_out, amount_in, AccountId::ZERO, None)
    }

    /// Input needed to receive at least `amount_out`, with the forward outcome
    pub fn quote_exact_output(
        &self,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_out: Decimal,
    ) -> Result<SwapResult> {
        let id = PairLedger::pair_id(asset_in, asset_out)?;
        let snapshot = self.core.ledger().get_pair(id)?;
        snapshot.ensure_active()?;

        let amount_in = snapshot.directed(asset_in)?.get_amount_in(amount_out)?;
        let mut txn = PairTransaction::detached([snapshot], self.core.now());
        apply_swap(&mut txn, asset_in, asset_out, amount_in, AccountId::ZERO, None)
    }

    /// Units of `asset_out` per unit of `asset_in` at current reserves, before fees
    pub fn spot_price(&self, asset_in: AssetId, asset_out: AssetId) -> Result<Decimal> {
        let id = PairLedger::pair_id(asset_in, asset_out)?;
        let pool = self.core.ledger().get_pair(id)?.directed(asset_in)?;
        let (reserve_in, reserve_out) = pool.get_liquidity();
        if reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
            return Err(ExchangeError::NoLiquidity { pair: id });
        }
        reserve_out
            .checked_div(reserve_in)
            .map(truncate)
            .ok_or(ExchangeError::Overflow {
                operation: "spot price",
            })
    }
}
