//! # Torq AMM Library - Constant-Product Exchange Core
//!
//! ## Purpose
//!
//! Computational and bookkeeping core of a constant-product liquidity
//! protocol: a registry of trading pairs and their reserves, liquidity
//! provisioning with LP shares, fee-on-input swaps, and routing across
//! multiple hops. Arithmetic is exact base-10 fixed point so identical inputs
//! always produce identical outputs and the ledger can be replayed.
//!
//! ## Integration Points
//!
//! - **Asset Custody**: [`AssetTransfer`] collaborator debits and credits accounts
//! - **Notifications**: [`EventSink`] receives [`ExchangeEvent`]s after commit
//! - **Time**: [`Clock`] collaborator supplies the timestamp checked against deadlines
//! - **Administration**: pair creation, fee rate and activation entry points on
//!   [`ExchangeCore`]; capability checks belong to the caller
//! - **Quotes**: read-only swap, path and deposit quotes for front ends and bots
//!
//! ## Architecture Role
//!
//! ```text
//! caller ──► Router ──────────┐
//!   │                         ▼
//!   ├──────► SwapEngine ──► PairLedger ──► AssetTransfer
//!   └──────► LiquidityEngine ─┘    │
//!                                  └─────► EventSink
//! ```
//!
//! Every mutating operation runs as one ledger transaction over all pairs it
//! touches. Pairs are locked for the duration, work happens on copies, and
//! state is written back only after transfers settle; a failure at any step
//! leaves every pair exactly as it was.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use torq_amm::{dec, DepositRequest, ExchangeCore, InMemoryBalances, SwapRequest};
//! use types::{AccountId, AssetId};
//!
//! let balances = Arc::new(InMemoryBalances::new());
//! let exchange = ExchangeCore::builder(balances.clone()).build();
//!
//! let (a, b) = (AssetId::from_u64(1), AssetId::from_u64(2));
//! let alice = AccountId::from_u64(7);
//! balances.fund(a, alice, dec!(2100)).unwrap();
//! balances.fund(b, alice, dec!(2000)).unwrap();
//!
//! let pair = exchange.create_pair(a, b, Some(30)).unwrap().id;
//! exchange
//!     .liquidity()
//!     .deposit(&DepositRequest {
//!         pair,
//!         desired_a: dec!(2000),
//!         desired_b: dec!(2000),
//!         min_a: dec!(0),
//!         min_b: dec!(0),
//!         provider: alice,
//!         recipient: alice,
//!         deadline: u64::MAX,
//!     })
//!     .unwrap();
//!
//! let swap = exchange
//!     .swaps()
//!     .swap(&SwapRequest {
//!         asset_in: a,
//!         asset_out: b,
//!         amount_in: dec!(100),
//!         min_amount_out: dec!(90),
//!         sender: alice,
//!         recipient: alice,
//!         deadline: u64::MAX,
//!     })
//!     .unwrap();
//! assert_eq!(swap.fee, dec!(0.3));
//! assert!(swap.amount_out > dec!(94));
//! ```

pub mod collaborators;
pub mod errors;
pub mod exchange;
pub mod liquidity;
pub mod pair_ledger;
pub mod pool_traits;
pub mod router;
pub mod swap;
pub mod v2_math;

pub use collaborators::{
    AssetTransfer, ChannelEventSink, Clock, CollectingEventSink, EventSink, InMemoryBalances,
    ManualClock, SystemClock, TracingEventSink, TransferError,
};
pub use errors::{ExchangeError, Result};
pub use exchange::{ExchangeBuilder, ExchangeCore};
pub use liquidity::{DepositRequest, DepositResult, LiquidityEngine, WithdrawRequest, WithdrawResult};
pub use pair_ledger::{Committed, PairLedger, PairTransaction, TradingPair};
pub use pool_traits::AmmPool;
pub use router::{
    ArbitrageRequest, ArbitrageResult, BatchLeg, BatchSwapRequest, BatchSwapResult,
    PathSwapRequest, PathSwapResult, RouteQuote, Router, ZapRequest, ZapResult,
};
pub use swap::{SwapEngine, SwapRequest, SwapResult};
pub use v2_math::{V2Math, V2PoolState, AMOUNT_SCALE};

/// Common types for AMM calculations
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
pub use types::ExchangeEvent;
