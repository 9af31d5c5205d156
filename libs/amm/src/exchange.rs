//! Exchange core facade
//!
//! Owns the [`PairLedger`] and the external collaborators, and hands out the
//! engines that operate on them. All mutating paths go through
//! [`ExchangeCore::execute`], which runs a ledger transaction and publishes
//! the staged events only after the pair locks are released.

use crate::collaborators::{AssetTransfer, Clock, EventSink, SystemClock, TracingEventSink};
use crate::errors::{ExchangeError, Result};
use crate::liquidity::LiquidityEngine;
use crate::pair_ledger::{PairLedger, PairTransaction, TradingPair};
use crate::router::Router;
use crate::swap::SwapEngine;
use amm_config::AmmSettings;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};
use types::{AccountId, AssetId, ExchangeEvent, PairId};

/// The exchange core: ledger plus collaborators
pub struct ExchangeCore {
    ledger: PairLedger,
    settings: AmmSettings,
    transfers: Arc<dyn AssetTransfer>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

/// Builder for [`ExchangeCore`]
///
/// Only the transfer collaborator is mandatory; events default to
/// [`TracingEventSink`] and time to [`SystemClock`].
pub struct ExchangeBuilder {
    settings: AmmSettings,
    transfers: Arc<dyn AssetTransfer>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl ExchangeBuilder {
    pub fn settings(mut self, settings: AmmSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> ExchangeCore {
        info!(
            default_fee_bps = self.settings.default_fee_bps,
            max_fee_bps = self.settings.max_fee_bps,
            minimum_liquidity = %self.settings.minimum_liquidity,
            hubs = self.settings.hub_assets.len(),
            batch_mode = ?self.settings.batch_mode,
            "🚀 Exchange core initialized"
        );
        ExchangeCore {
            ledger: PairLedger::new(),
            settings: self.settings,
            transfers: self.transfers,
            events: self.events,
            clock: self.clock,
        }
    }
}

impl ExchangeCore {
    pub fn builder(transfers: Arc<dyn AssetTransfer>) -> ExchangeBuilder {
        ExchangeBuilder {
            settings: AmmSettings::default(),
            transfers,
            events: Arc::new(TracingEventSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn ledger(&self) -> &PairLedger {
        &self.ledger
    }

    pub fn settings(&self) -> &AmmSettings {
        &self.settings
    }

    /// Current time according to the clock collaborator
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn swaps(&self) -> SwapEngine<'_> {
        SwapEngine::new(self)
    }

    pub fn liquidity(&self) -> LiquidityEngine<'_> {
        LiquidityEngine::new(self)
    }

    pub fn router(&self) -> Router<'_> {
        Router::new(self)
    }

    /// Shares locked forever by a pair's first deposit
    pub fn minimum_liquidity(&self) -> Decimal {
        self.settings.minimum_liquidity
    }

    /// Register a pair; `fee_rate_bps` falls back to the configured default
    pub fn create_pair(&self, x: AssetId, y: AssetId, fee_rate_bps: Option<u16>) -> Result<TradingPair> {
        let now = self.now();
        let fee_rate_bps = fee_rate_bps.unwrap_or(self.settings.default_fee_bps);
        let pair = self
            .ledger
            .create_pair(x, y, fee_rate_bps, self.settings.max_fee_bps, now)?;

        self.publish(vec![ExchangeEvent::PairCreated {
            pair: pair.id,
            fee_rate_bps,
            timestamp: now,
        }]);
        Ok(pair)
    }

    pub fn set_fee_rate(&self, id: PairId, fee_rate_bps: u16) -> Result<TradingPair> {
        let pair = self
            .ledger
            .set_fee_rate(id, fee_rate_bps, self.settings.max_fee_bps)?;
        self.publish_update(&pair);
        Ok(pair)
    }

    pub fn set_active(&self, id: PairId, is_active: bool) -> Result<TradingPair> {
        let pair = self.ledger.set_active(id, is_active)?;
        self.publish_update(&pair);
        Ok(pair)
    }

    fn publish_update(&self, pair: &TradingPair) {
        self.publish(vec![ExchangeEvent::PairUpdated {
            pair: pair.id,
            fee_rate_bps: pair.fee_rate_bps,
            is_active: pair.is_active,
            timestamp: self.now(),
        }]);
    }

    /// Reject calls whose deadline has passed, returning the execution time
    pub(crate) fn check_deadline(&self, deadline: u64) -> Result<u64> {
        let now = self.now();
        if now > deadline {
            debug!(deadline, now, "Rejecting expired request");
            return Err(ExchangeError::Expired { deadline, now });
        }
        Ok(now)
    }

    /// Run `f` as one ledger transaction over `pairs` and publish its events
    pub(crate) fn execute<R, F>(&self, pairs: &[PairId], now: u64, f: F) -> Result<R>
    where
        F: FnOnce(&mut PairTransaction<'_>) -> Result<R>,
    {
        let committed = self.ledger.transact(pairs, self.transfers.as_ref(), now, f)?;
        self.publish(committed.events);
        Ok(committed.value)
    }

    fn publish(&self, events: Vec<ExchangeEvent>) {
        for event in events {
            self.events.emit(event);
        }
    }
}

pub(crate) fn ensure_account(account: AccountId, field: &'static str) -> Result<()> {
    if account.is_zero() {
        return Err(ExchangeError::ZeroAddress { field });
    }
    Ok(())
}
