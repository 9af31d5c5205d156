//! Liquidity Engine
//!
//! Deposits pair the caller's desired amounts to the current reserve ratio
//! and mint LP shares; withdrawals burn shares for a proportional slice of
//! both reserves. The first deposit into a pair sets its price and locks
//! `minimum_liquidity` shares that belong to nobody.

use crate::errors::{ExchangeError, Result};
use crate::exchange::{ensure_account, ExchangeCore};
use crate::pair_ledger::{PairTransaction, TradingPair};
use crate::v2_math::V2Math;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use types::{AccountId, ExchangeEvent, PairId};

/// Add liquidity; amounts are given for the pair's canonical sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub pair: PairId,
    pub desired_a: Decimal,
    pub desired_b: Decimal,
    pub min_a: Decimal,
    pub min_b: Decimal,
    pub provider: AccountId,
    pub recipient: AccountId,
    pub deadline: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositResult {
    pub pair: PairId,
    pub amount_a: Decimal,
    pub amount_b: Decimal,
    pub shares_minted: Decimal,
}

/// Burn `shares` held by `provider`, releasing assets to `recipient`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub pair: PairId,
    pub shares: Decimal,
    pub min_a: Decimal,
    pub min_b: Decimal,
    pub provider: AccountId,
    pub recipient: AccountId,
    pub deadline: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawResult {
    pub pair: PairId,
    pub amount_a: Decimal,
    pub amount_b: Decimal,
    pub shares_burned: Decimal,
}

/// Amounts of each side accepted for a deposit at the current ratio
fn pair_amounts(pair: &TradingPair, desired_a: Decimal, desired_b: Decimal) -> Result<(Decimal, Decimal)> {
    if !pair.has_liquidity() {
        return Ok((desired_a, desired_b));
    }

    let optimal_b = V2Math::quote(desired_a, pair.reserve_a, pair.reserve_b)?;
    if optimal_b <= desired_b {
        return Ok((desired_a, optimal_b));
    }

    let optimal_a = V2Math::quote(desired_b, pair.reserve_b, pair.reserve_a)?;
    Ok((optimal_a.min(desired_a), desired_b))
}

fn ensure_minimum(pair: &TradingPair, side_a: bool, amount: Decimal, minimum: Decimal) -> Result<()> {
    if amount < minimum {
        let asset = if side_a {
            pair.id.asset_a()
        } else {
            pair.id.asset_b()
        };
        return Err(ExchangeError::InsufficientAmount {
            asset,
            amount,
            minimum,
        });
    }
    Ok(())
}

/// Deposit into a pair inside a ledger transaction
///
/// Mints shares to `recipient` and stages `LiquidityAdded`. The caller stages
/// whatever transfers fund the deposit.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_deposit(
    txn: &mut PairTransaction<'_>,
    id: PairId,
    desired_a: Decimal,
    desired_b: Decimal,
    min_a: Decimal,
    min_b: Decimal,
    provider: AccountId,
    recipient: AccountId,
    minimum_liquidity: Decimal,
) -> Result<DepositResult> {
    for desired in [desired_a, desired_b] {
        if desired <= Decimal::ZERO {
            return Err(ExchangeError::InsufficientInputAmount { amount_in: desired });
        }
    }

    let now = txn.now();
    let pair = txn.pair_mut(id)?;
    pair.ensure_active()?;

    let (amount_a, amount_b) = pair_amounts(pair, desired_a, desired_b)?;
    ensure_minimum(pair, true, amount_a, min_a)?;
    ensure_minimum(pair, false, amount_b, min_b)?;

    let shares_minted = if pair.total_shares.is_zero() {
        let root = V2Math::initial_liquidity(amount_a, amount_b)?;
        let minted = root - minimum_liquidity;
        if minted <= Decimal::ZERO {
            return Err(ExchangeError::InsufficientLiquidityMinted { minted });
        }
        // the locked remainder stays in total_shares with no owner
        pair.total_shares = root;
        minted
    } else {
        let minted = V2Math::proportional_shares(
            amount_a,
            amount_b,
            pair.reserve_a,
            pair.reserve_b,
            pair.total_shares,
        )?;
        if minted <= Decimal::ZERO {
            return Err(ExchangeError::InsufficientLiquidityMinted { minted });
        }
        pair.total_shares = pair
            .total_shares
            .checked_add(minted)
            .ok_or(ExchangeError::Overflow {
                operation: "share supply",
            })?;
        minted
    };

    pair.add_to_side(id.asset_a(), amount_a)?;
    pair.add_to_side(id.asset_b(), amount_b)?;
    let (reserve_a, reserve_b, total_shares) = (pair.reserve_a, pair.reserve_b, pair.total_shares);

    let held = txn.position(id, recipient);
    let position = held.checked_add(shares_minted).ok_or(ExchangeError::Overflow {
        operation: "liquidity position",
    })?;
    txn.set_position(id, recipient, position);

    txn.emit(ExchangeEvent::LiquidityAdded {
        pair: id,
        provider,
        recipient,
        amount_a,
        amount_b,
        shares_minted,
        reserve_a,
        reserve_b,
        total_shares,
        timestamp: now,
    });

    Ok(DepositResult {
        pair: id,
        amount_a,
        amount_b,
        shares_minted,
    })
}

/// Burn `provider`'s shares inside a ledger transaction
///
/// Withdrawals are allowed from inactive pairs so providers can always exit.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_withdraw(
    txn: &mut PairTransaction<'_>,
    id: PairId,
    shares: Decimal,
    min_a: Decimal,
    min_b: Decimal,
    provider: AccountId,
    recipient: AccountId,
) -> Result<WithdrawResult> {
    if shares <= Decimal::ZERO {
        return Err(ExchangeError::InsufficientInputAmount { amount_in: shares });
    }

    let held = txn.position(id, provider);
    if shares > held {
        return Err(ExchangeError::InsufficientShares {
            pair: id,
            available: held,
            requested: shares,
        });
    }

    let now = txn.now();
    let pair = txn.pair_mut(id)?;
    if pair.total_shares <= Decimal::ZERO || !pair.has_liquidity() {
        return Err(ExchangeError::NoLiquidity { pair: id });
    }

    let amount_a = V2Math::amount_for_shares(shares, pair.reserve_a, pair.total_shares)?;
    let amount_b = V2Math::amount_for_shares(shares, pair.reserve_b, pair.total_shares)?;
    if amount_a <= Decimal::ZERO || amount_b <= Decimal::ZERO {
        return Err(ExchangeError::InsufficientOutputAmount {
            amount_out: amount_a.min(amount_b),
        });
    }
    ensure_minimum(pair, true, amount_a, min_a)?;
    ensure_minimum(pair, false, amount_b, min_b)?;

    pair.remove_from_side(id.asset_a(), amount_a)?;
    pair.remove_from_side(id.asset_b(), amount_b)?;
    pair.total_shares -= shares;
    let (reserve_a, reserve_b, total_shares) = (pair.reserve_a, pair.reserve_b, pair.total_shares);

    txn.set_position(id, provider, held - shares);

    txn.emit(ExchangeEvent::LiquidityRemoved {
        pair: id,
        provider,
        recipient,
        shares_burned: shares,
        amount_a,
        amount_b,
        reserve_a,
        reserve_b,
        total_shares,
        timestamp: now,
    });

    Ok(WithdrawResult {
        pair: id,
        amount_a,
        amount_b,
        shares_burned: shares,
    })
}

/// Liquidity provisioning against the ledger
pub struct LiquidityEngine<'a> {
    core: &'a ExchangeCore,
}

impl<'a> LiquidityEngine<'a> {
    pub(crate) fn new(core: &'a ExchangeCore) -> Self {
        Self { core }
    }

    pub fn deposit(&self, request: &DepositRequest) -> Result<DepositResult> {
        let now = self.core.check_deadline(request.deadline)?;
        ensure_account(request.provider, "provider")?;
        ensure_account(request.recipient, "recipient")?;
        let minimum_liquidity = self.core.minimum_liquidity();

        let result = self.core.execute(&[request.pair], now, |txn| {
            let result = apply_deposit(
                txn,
                request.pair,
                request.desired_a,
                request.desired_b,
                request.min_a,
                request.min_b,
                request.provider,
                request.recipient,
                minimum_liquidity,
            )?;
            txn.debit(request.pair.asset_a(), request.provider, result.amount_a);
            txn.debit(request.pair.asset_b(), request.provider, result.amount_b);
            Ok(result)
        })?;

        info!(
            pair = %request.pair,
            provider = %request.provider,
            amount_a = %result.amount_a,
            amount_b = %result.amount_b,
            shares = %result.shares_minted,
            "💧 Liquidity added"
        );
        Ok(result)
    }

    pub fn withdraw(&self, request: &WithdrawRequest) -> Result<WithdrawResult> {
        let now = self.core.check_deadline(request.deadline)?;
        ensure_account(request.provider, "provider")?;
        ensure_account(request.recipient, "recipient")?;

        let result = self.core.execute(&[request.pair], now, |txn| {
            let result = apply_withdraw(
                txn,
                request.pair,
                request.shares,
                request.min_a,
                request.min_b,
                request.provider,
                request.recipient,
            )?;
            txn.credit(request.pair.asset_a(), request.recipient, result.amount_a);
            txn.credit(request.pair.asset_b(), request.recipient, result.amount_b);
            Ok(result)
        })?;

        info!(
            pair = %request.pair,
            provider = %request.provider,
            amount_a = %result.amount_a,
            amount_b = %result.amount_b,
            shares = %result.shares_burned,
            "Liquidity removed"
        );
        Ok(result)
    }

    /// Accepted amounts and shares a deposit would produce right now
    pub fn quote_deposit(&self, pair: PairId, desired_a: Decimal, desired_b: Decimal) -> Result<DepositResult> {
        let snapshot = self.core.ledger().get_pair(pair)?;
        let mut txn = PairTransaction::detached([snapshot], self.core.now());
        apply_deposit(
            &mut txn,
            pair,
            desired_a,
            desired_b,
            Decimal::ZERO,
            Decimal::ZERO,
            AccountId::ZERO,
            AccountId::ZERO,
            self.core.minimum_liquidity(),
        )
    }

    /// Assets released by burning `shares` right now
    pub fn quote_withdraw(&self, pair: PairId, shares: Decimal) -> Result<WithdrawResult> {
        let snapshot = self.core.ledger().get_pair(pair)?;
        if snapshot.total_shares <= Decimal::ZERO || shares > snapshot.total_shares {
            return Err(ExchangeError::InsufficientShares {
                pair,
                available: snapshot.total_shares,
                requested: shares,
            });
        }
        Ok(WithdrawResult {
            pair,
            amount_a: V2Math::amount_for_shares(shares, snapshot.reserve_a, snapshot.total_shares)?,
            amount_b: V2Math::amount_for_shares(shares, snapshot.reserve_b, snapshot.total_shares)?,
            shares_burned: shares,
        })
    }
}
