//! Shared fixtures for exchange integration tests

#![allow(dead_code)]

use amm_config::AmmSettings;
use rust_decimal::Decimal;
use std::sync::Arc;
use torq_amm::{
    CollectingEventSink, DepositRequest, ExchangeCore, InMemoryBalances, ManualClock, TradingPair,
};
use types::{AccountId, AssetId, PairId};

/// Clock value every fixture starts at
pub const NOW: u64 = 1_000;

/// Deadline comfortably in the future
pub const DEADLINE: u64 = NOW + 60;

/// Account that seeds pair liquidity
pub const SEEDER: u64 = 900;

pub fn asset(n: u64) -> AssetId {
    AssetId::from_u64(n)
}

pub fn account(n: u64) -> AccountId {
    AccountId::from_u64(n)
}

pub struct TestExchange {
    pub core: Arc<ExchangeCore>,
    pub balances: Arc<InMemoryBalances>,
    pub events: Arc<CollectingEventSink>,
    pub clock: Arc<ManualClock>,
}

impl TestExchange {
    pub fn new() -> Self {
        Self::with_settings(AmmSettings::default())
    }

    pub fn with_settings(settings: AmmSettings) -> Self {
        let balances = Arc::new(InMemoryBalances::new());
        let events = Arc::new(CollectingEventSink::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let core = ExchangeCore::builder(balances.clone())
            .settings(settings)
            .event_sink(events.clone())
            .clock(clock.clone())
            .build();

        Self {
            core: Arc::new(core),
            balances,
            events,
            clock,
        }
    }

    pub fn fund(&self, asset: AssetId, holder: AccountId, amount: Decimal) {
        self.balances.fund(asset, holder, amount).unwrap();
    }

    pub fn balance(&self, asset: AssetId, holder: AccountId) -> Decimal {
        self.balances.balance(asset, holder)
    }

    /// Create the pair `x`/`y` and seed it with `amount_x` and `amount_y`
    pub fn seed_pair(&self, x: AssetId, y: AssetId, amount_x: Decimal, amount_y: Decimal) -> PairId {
        let pair = self.core.create_pair(x, y, Some(30)).unwrap().id;
        let seeder = account(SEEDER);
        self.fund(x, seeder, amount_x);
        self.fund(y, seeder, amount_y);

        let (desired_a, desired_b) = if pair.asset_a() == x {
            (amount_x, amount_y)
        } else {
            (amount_y, amount_x)
        };
        self.core
            .liquidity()
            .deposit(&DepositRequest {
                pair,
                desired_a,
                desired_b,
                min_a: Decimal::ZERO,
                min_b: Decimal::ZERO,
                provider: seeder,
                recipient: seeder,
                deadline: DEADLINE,
            })
            .unwrap();
        self.events.drain();
        pair
    }

    pub fn snapshot(&self, pair: PairId) -> TradingPair {
        self.core.ledger().get_pair(pair).unwrap()
    }

    /// Reserve of `asset` in `pair`
    pub fn reserve(&self, pair: PairId, asset: AssetId) -> Decimal {
        self.snapshot(pair).reserve_of(asset).unwrap()
    }
}
