//! Structured exchange notifications
//!
//! Every committed liquidity, swap or administrative operation produces one or
//! more [`ExchangeEvent`]s carrying the request parameters and the resulting
//! amounts. Consumers (activity logs, analytics, fee accounting) receive them
//! through an event sink after the ledger transaction has committed.

use crate::common::identifiers::{AccountId, AssetId, PairId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Notification emitted by the exchange core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExchangeEvent {
    /// A pair was registered by the administrative collaborator
    PairCreated {
        pair: PairId,
        fee_rate_bps: u16,
        timestamp: u64,
    },

    /// Fee rate or activation flag of a pair changed
    PairUpdated {
        pair: PairId,
        fee_rate_bps: u16,
        is_active: bool,
        timestamp: u64,
    },

    /// Liquidity was deposited and shares minted
    LiquidityAdded {
        pair: PairId,
        provider: AccountId,
        recipient: AccountId,
        amount_a: Decimal,
        amount_b: Decimal,
        shares_minted: Decimal,
        reserve_a: Decimal,
        reserve_b: Decimal,
        total_shares: Decimal,
        timestamp: u64,
    },

    /// Shares were burned and the underlying assets released
    LiquidityRemoved {
        pair: PairId,
        provider: AccountId,
        recipient: AccountId,
        shares_burned: Decimal,
        amount_a: Decimal,
        amount_b: Decimal,
        reserve_a: Decimal,
        reserve_b: Decimal,
        total_shares: Decimal,
        timestamp: u64,
    },

    /// A single-hop swap executed against a pair
    ///
    /// `recipient` is `None` for intermediate hops of a routed trade whose
    /// output stays inside the exchange and feeds the next hop.
    Swap {
        pair: PairId,
        sender: AccountId,
        recipient: Option<AccountId>,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: Decimal,
        amount_out: Decimal,
        fee: Decimal,
        reserve_a: Decimal,
        reserve_b: Decimal,
        timestamp: u64,
    },

    /// Fee retained by a pair on a swap, denominated in the input asset
    FeesAccrued {
        pair: PairId,
        asset: AssetId,
        amount: Decimal,
        timestamp: u64,
    },
}

impl ExchangeEvent {
    /// Pair the event refers to
    pub fn pair(&self) -> PairId {
        match self {
            ExchangeEvent::PairCreated { pair, .. }
            | ExchangeEvent::PairUpdated { pair, .. }
            | ExchangeEvent::LiquidityAdded { pair, .. }
            | ExchangeEvent::LiquidityRemoved { pair, .. }
            | ExchangeEvent::Swap { pair, .. }
            | ExchangeEvent::FeesAccrued { pair, .. } => *pair,
        }
    }

    /// Short stable name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeEvent::PairCreated { .. } => "pair_created",
            ExchangeEvent::PairUpdated { .. } => "pair_updated",
            ExchangeEvent::LiquidityAdded { .. } => "liquidity_added",
            ExchangeEvent::LiquidityRemoved { .. } => "liquidity_removed",
            ExchangeEvent::Swap { .. } => "swap",
            ExchangeEvent::FeesAccrued { .. } => "fees_accrued",
        }
    }
}
