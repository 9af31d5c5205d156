//! Router
//!
//! Composes single-hop swaps into multi-hop paths, batches, arbitrage cycles
//! and single-asset liquidity zaps. Every routed operation runs inside one
//! ledger transaction over all pairs it touches: intermediate hop outputs
//! never leave the exchange, only the first input is debited and only the
//! final output is credited, and any failure leaves every pair unchanged.

use crate::errors::{ExchangeError, Result};
use crate::exchange::{ensure_account, ExchangeCore};
use crate::liquidity::apply_deposit;
use crate::pair_ledger::{PairLedger, PairTransaction, TradingPair};
use crate::swap::{apply_swap, SwapResult};
use crate::v2_math::{truncate, V2Math};
use amm_config::BatchMode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use types::{AccountId, AssetId, PairId};

/// Sell `amount_in` of `path[0]` for at least `min_amount_out` of the last asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSwapRequest {
    pub path: Vec<AssetId>,
    pub amount_in: Decimal,
    pub min_amount_out: Decimal,
    pub sender: AccountId,
    pub recipient: AccountId,
    pub deadline: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSwapResult {
    pub path: Vec<AssetId>,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub hops: Vec<SwapResult>,
    /// Compounded price impact across all hops, in basis points
    pub price_impact_bps: Decimal,
}

/// One independent path of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLeg {
    pub path: Vec<AssetId>,
    pub amount_in: Decimal,
    pub min_amount_out: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSwapRequest {
    pub legs: Vec<BatchLeg>,
    pub sender: AccountId,
    pub recipient: AccountId,
    pub deadline: u64,
    /// Overrides the configured batch mode
    #[serde(default)]
    pub mode: Option<BatchMode>,
}

/// Per-leg outcomes; under `AllOrNothing` every entry is `Ok`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSwapResult {
    pub mode: BatchMode,
    pub legs: Vec<Result<PathSwapResult>>,
}

impl BatchSwapResult {
    pub fn succeeded(&self) -> usize {
        self.legs.iter().filter(|leg| leg.is_ok()).count()
    }
}

/// Run a cycle that starts and ends at the same asset for a profit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrageRequest {
    pub path: Vec<AssetId>,
    pub amount_in: Decimal,
    pub min_profit: Decimal,
    pub trader: AccountId,
    pub deadline: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrageResult {
    pub path: Vec<AssetId>,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub profit: Decimal,
    pub hops: Vec<SwapResult>,
}

/// Best route found by path discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteQuote {
    pub path: Vec<AssetId>,
    pub amount_out: Decimal,
    pub price_impact_bps: Decimal,
}

/// Provide liquidity to `pair` from a single asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZapRequest {
    pub asset_in: AssetId,
    pub amount_in: Decimal,
    pub pair: PairId,
    pub min_shares: Decimal,
    pub sender: AccountId,
    pub recipient: AccountId,
    pub deadline: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZapResult {
    pub pair: PairId,
    pub amount_in: Decimal,
    pub amount_a: Decimal,
    pub amount_b: Decimal,
    pub shares_minted: Decimal,
    /// Unconsumed amounts of each side returned to the sender
    pub refund_a: Decimal,
    pub refund_b: Decimal,
    pub swaps: Vec<SwapResult>,
}

/// Pairs traversed by `path`, in path order
fn path_pairs(path: &[AssetId], max_hops: usize) -> Result<Vec<PairId>> {
    if path.len() < 2 {
        return Err(ExchangeError::invalid_path(format!(
            "path needs at least 2 assets, got {}",
            path.len()
        )));
    }
    let hops = path.len() - 1;
    if hops > max_hops {
        return Err(ExchangeError::invalid_path(format!(
            "{} hops exceeds the limit of {}",
            hops, max_hops
        )));
    }
    if path.iter().any(|asset| asset.is_zero()) {
        return Err(ExchangeError::ZeroAddress { field: "path" });
    }

    path.windows(2)
        .map(|hop| PairLedger::pair_id(hop[0], hop[1]))
        .collect()
}

/// Chain hops through `txn`, feeding each output into the next hop
///
/// Only the last hop names `recipient`; the rest settle internally.
fn run_path(
    txn: &mut PairTransaction<'_>,
    path: &[AssetId],
    amount_in: Decimal,
    sender: AccountId,
    recipient: Option<AccountId>,
) -> Result<PathSwapResult> {
    let mut amount = amount_in;
    let mut hops = Vec::with_capacity(path.len().saturating_sub(1));

    for (index, hop) in path.windows(2).enumerate() {
        let is_last = index + 2 == path.len();
        let result = apply_swap(
            txn,
            hop[0],
            hop[1],
            amount,
            sender,
            if is_last { recipient } else { None },
        )?;
        amount = result.amount_out;
        hops.push(result);
    }

    let impacts: Vec<Decimal> = hops.iter().map(|hop| hop.price_impact_bps).collect();
    Ok(PathSwapResult {
        path: path.to_vec(),
        amount_in,
        amount_out: amount,
        price_impact_bps: V2Math::compound_price_impact(&impacts),
        hops,
    })
}

/// Multi-step trade composition over the ledger
pub struct Router<'a> {
    core: &'a ExchangeCore,
}

impl<'a> Router<'a> {
    pub(crate) fn new(core: &'a ExchangeCore) -> Self {
        Self { core }
    }

    fn validate_path(&self, path: &[AssetId]) -> Result<Vec<PairId>> {
        path_pairs(path, self.core.settings().max_hops)
    }

    /// Snapshots of every distinct pair in `pairs`
    fn snapshots(&self, pairs: &[PairId]) -> Result<Vec<TradingPair>> {
        let distinct: BTreeSet<PairId> = pairs.iter().copied().collect();
        distinct
            .into_iter()
            .map(|id| self.core.ledger().get_pair(id))
            .collect()
    }

    /// Execute a multi-hop swap atomically
    pub fn swap_exact_in_path(&self, request: &PathSwapRequest) -> Result<PathSwapResult> {
        let now = self.core.check_deadline(request.deadline)?;
        ensure_account(request.sender, "sender")?;
        ensure_account(request.recipient, "recipient")?;
        let pairs = self.validate_path(&request.path)?;

        let result = self.core.execute(&pairs, now, |txn| {
            Self::settle_path(
                txn,
                &request.path,
                request.amount_in,
                request.min_amount_out,
                request.sender,
                request.recipient,
            )
        })?;

        info!(
            hops = result.hops.len(),
            amount_in = %result.amount_in,
            amount_out = %result.amount_out,
            impact_bps = %result.price_impact_bps,
            "🔀 Routed swap executed"
        );
        Ok(result)
    }

    fn settle_path(
        txn: &mut PairTransaction<'_>,
        path: &[AssetId],
        amount_in: Decimal,
        min_amount_out: Decimal,
        sender: AccountId,
        recipient: AccountId,
    ) -> Result<PathSwapResult> {
        let result = run_path(txn, path, amount_in, sender, Some(recipient))?;
        if result.amount_out < min_amount_out {
            return Err(ExchangeError::SlippageExceeded {
                amount_out: result.amount_out,
                min_amount_out,
            });
        }

        let first = path[0];
        let last = path[path.len() - 1];
        txn.debit(first, sender, amount_in);
        txn.credit(last, recipient, result.amount_out);
        Ok(result)
    }

    /// Expected outcome of a path without effects
    pub fn quote_path(&self, path: &[AssetId], amount_in: Decimal) -> Result<PathSwapResult> {
        let pairs = self.validate_path(path)?;
        let snapshots = self.snapshots(&pairs)?;
        let mut txn = PairTransaction::detached(snapshots, self.core.now());
        run_path(&mut txn, path, amount_in, AccountId::ZERO, None)
    }

    /// Execute several independent paths
    pub fn batch_swap(&self, request: &BatchSwapRequest) -> Result<BatchSwapResult> {
        let now = self.core.check_deadline(request.deadline)?;
        ensure_account(request.sender, "sender")?;
        ensure_account(request.recipient, "recipient")?;
        if request.legs.is_empty() {
            return Err(ExchangeError::invalid_path("batch contains no legs"));
        }
        let mode = request.mode.unwrap_or(self.core.settings().batch_mode);

        match mode {
            BatchMode::AllOrNothing => {
                let mut pairs = Vec::new();
                for leg in &request.legs {
                    pairs.extend(self.validate_path(&leg.path)?);
                }

                let results = self.core.execute(&pairs, now, |txn| {
                    let mut results = Vec::with_capacity(request.legs.len());
                    for (index, leg) in request.legs.iter().enumerate() {
                        let result = Self::settle_path(
                            txn,
                            &leg.path,
                            leg.amount_in,
                            leg.min_amount_out,
                            request.sender,
                            request.recipient,
                        )
                        .map_err(|e| {
                            warn!(leg = index, error = %e, "Batch leg failed, aborting batch");
                            e
                        })?;
                        results.push(result);
                    }
                    Ok(results)
                })?;

                info!(legs = results.len(), "📦 Batch swap committed");
                Ok(BatchSwapResult {
                    mode,
                    legs: results.into_iter().map(Ok).collect(),
                })
            }
            BatchMode::BestEffort => {
                let legs: Vec<Result<PathSwapResult>> = request
                    .legs
                    .iter()
                    .enumerate()
                    .map(|(index, leg)| {
                        let pairs = self.validate_path(&leg.path)?;
                        self.core
                            .execute(&pairs, now, |txn| {
                                Self::settle_path(
                                    txn,
                                    &leg.path,
                                    leg.amount_in,
                                    leg.min_amount_out,
                                    request.sender,
                                    request.recipient,
                                )
                            })
                            .map_err(|e| {
                                debug!(leg = index, error = %e, "Batch leg skipped");
                                e
                            })
                    })
                    .collect();

                let result = BatchSwapResult { mode, legs };
                info!(
                    legs = result.legs.len(),
                    succeeded = result.succeeded(),
                    "📦 Batch swap settled leg by leg"
                );
                Ok(result)
            }
        }
    }

    /// Execute a profitable cycle or nothing at all
    pub fn arbitrage(&self, request: &ArbitrageRequest) -> Result<ArbitrageResult> {
        let now = self.core.check_deadline(request.deadline)?;
        ensure_account(request.trader, "trader")?;
        let pairs = self.validate_path(&request.path)?;
        if request.path.len() < 3 || request.path.first() != request.path.last() {
            return Err(ExchangeError::invalid_path(
                "arbitrage path must start and end at the same asset",
            ));
        }
        let asset = request.path[0];

        let result = self.core.execute(&pairs, now, |txn| {
            let routed = run_path(
                txn,
                &request.path,
                request.amount_in,
                request.trader,
                Some(request.trader),
            )?;
            if routed.amount_out <= request.amount_in {
                return Err(ExchangeError::NoProfitableArbitrage {
                    amount_in: request.amount_in,
                    amount_out: routed.amount_out,
                });
            }
            let profit = routed.amount_out - request.amount_in;
            if profit < request.min_profit {
                return Err(ExchangeError::InsufficientProfit {
                    profit,
                    min_profit: request.min_profit,
                });
            }

            txn.debit(asset, request.trader, request.amount_in);
            txn.credit(asset, request.trader, routed.amount_out);
            Ok(ArbitrageResult {
                path: routed.path,
                amount_in: routed.amount_in,
                amount_out: routed.amount_out,
                profit,
                hops: routed.hops,
            })
        })?;

        info!(
            hops = result.hops.len(),
            amount_in = %result.amount_in,
            profit = %result.profit,
            "💰 Arbitrage executed"
        );
        Ok(result)
    }

    /// Intermediate assets worth trying between `asset_in` and `asset_out`
    ///
    /// The configured hubs when present, otherwise every asset paired with
    /// both ends.
    fn intermediates(&self, asset_in: AssetId, asset_out: AssetId) -> Vec<AssetId> {
        let hubs = &self.core.settings().hub_assets;
        let candidates: Vec<AssetId> = if hubs.is_empty() {
            let neighbours = |asset: AssetId| -> BTreeSet<AssetId> {
                self.core
                    .ledger()
                    .pairs_for_asset(asset)
                    .into_iter()
                    .filter_map(|pair| pair.counterpart(asset))
                    .collect()
            };
            neighbours(asset_in)
                .intersection(&neighbours(asset_out))
                .copied()
                .collect()
        } else {
            hubs.clone()
        };

        candidates
            .into_iter()
            .filter(|hub| *hub != asset_in && *hub != asset_out)
            .collect()
    }

    /// Best direct or two-hop route for selling `amount_in` of `asset_in`
    ///
    /// Quote only; `None` when no viable route exists.
    pub fn find_optimal_path(
        &self,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: Decimal,
    ) -> Result<Option<RouteQuote>> {
        PairLedger::pair_id(asset_in, asset_out)?;

        let mut candidates = vec![vec![asset_in, asset_out]];
        candidates.extend(
            self.intermediates(asset_in, asset_out)
                .into_iter()
                .map(|hub| vec![asset_in, hub, asset_out]),
        );

        let mut best: Option<RouteQuote> = None;
        for path in candidates {
            match self.quote_path(&path, amount_in) {
                Ok(quote) => {
                    let better = best
                        .as_ref()
                        .map_or(true, |current| quote.amount_out > current.amount_out);
                    if better {
                        best = Some(RouteQuote {
                            path: quote.path,
                            amount_out: quote.amount_out,
                            price_impact_bps: quote.price_impact_bps,
                        });
                    }
                }
                Err(e) => debug!(?path, error = %e, "Route candidate not viable"),
            }
        }

        Ok(best)
    }

    /// Provide liquidity from a single asset
    ///
    /// When `asset_in` is one side of the pair, half of it is swapped to the
    /// other side through the pair itself. Otherwise half is routed to each
    /// side along the best route found by [`Router::find_optimal_path`].
    /// Whatever the deposit does not consume is refunded to the sender.
    pub fn zap(&self, request: &ZapRequest) -> Result<ZapResult> {
        let now = self.core.check_deadline(request.deadline)?;
        ensure_account(request.sender, "sender")?;
        ensure_account(request.recipient, "recipient")?;
        if request.amount_in <= Decimal::ZERO {
            return Err(ExchangeError::InsufficientInputAmount {
                amount_in: request.amount_in,
            });
        }

        let target = self.core.ledger().get_pair(request.pair)?;
        target.ensure_active()?;
        if !target.has_liquidity() {
            return Err(ExchangeError::NoLiquidity { pair: request.pair });
        }

        let (asset_a, asset_b) = (request.pair.asset_a(), request.pair.asset_b());
        let half = truncate(request.amount_in / Decimal::TWO);
        let rest = request.amount_in - half;

        // Route to each side: (path, amount sent along it); an empty path
        // means the amount is already in that asset
        let legs: Vec<(Vec<AssetId>, Decimal)> = match request.pair.counterpart(request.asset_in) {
            Some(other) => vec![(vec![request.asset_in, other], half), (Vec::new(), rest)],
            None => {
                let mut legs = Vec::with_capacity(2);
                for (side, amount) in [(asset_a, half), (asset_b, rest)] {
                    let route = self
                        .find_optimal_path(request.asset_in, side, amount)?
                        .ok_or_else(|| {
                            ExchangeError::invalid_path(format!(
                                "no route from {} to {}",
                                request.asset_in, side
                            ))
                        })?;
                    legs.push((route.path, amount));
                }
                legs
            }
        };

        let mut pairs = vec![request.pair];
        for (path, _) in &legs {
            if !path.is_empty() {
                pairs.extend(self.validate_path(path)?);
            }
        }
        let minimum_liquidity = self.core.minimum_liquidity();

        let result = self.core.execute(&pairs, now, |txn| {
            let mut acquired: BTreeMap<AssetId, Decimal> = BTreeMap::new();
            let mut swaps = Vec::new();

            for (path, amount) in &legs {
                let (asset, received) = if path.is_empty() {
                    (request.asset_in, *amount)
                } else {
                    let routed = run_path(txn, path, *amount, request.sender, None)?;
                    swaps.extend(routed.hops);
                    (path[path.len() - 1], routed.amount_out)
                };
                let held = acquired.entry(asset).or_default();
                *held = held.checked_add(received).ok_or(ExchangeError::Overflow {
                    operation: "zap proceeds",
                })?;
            }

            let got_a = acquired.get(&asset_a).copied().unwrap_or_default();
            let got_b = acquired.get(&asset_b).copied().unwrap_or_default();
            let deposit = apply_deposit(
                txn,
                request.pair,
                got_a,
                got_b,
                Decimal::ZERO,
                Decimal::ZERO,
                request.sender,
                request.recipient,
                minimum_liquidity,
            )?;
            if deposit.shares_minted < request.min_shares {
                return Err(ExchangeError::SlippageExceeded {
                    amount_out: deposit.shares_minted,
                    min_amount_out: request.min_shares,
                });
            }

            let refund_a = got_a - deposit.amount_a;
            let refund_b = got_b - deposit.amount_b;
            txn.debit(request.asset_in, request.sender, request.amount_in);
            txn.credit(asset_a, request.sender, refund_a);
            txn.credit(asset_b, request.sender, refund_b);

            Ok(ZapResult {
                pair: request.pair,
                amount_in: request.amount_in,
                amount_a: deposit.amount_a,
                amount_b: deposit.amount_b,
                shares_minted: deposit.shares_minted,
                refund_a,
                refund_b,
                swaps,
            })
        })?;

        info!(
            pair = %request.pair,
            amount_in = %result.amount_in,
            shares = %result.shares_minted,
            refund_a = %result.refund_a,
            refund_b = %result.refund_b,
            "⚡ Zap executed"
        );
        Ok(result)
    }
}
