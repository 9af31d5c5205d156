//! Boundary contracts with the collaborators around the exchange core
//!
//! The core never holds custody. It asks an [`AssetTransfer`] to move funds,
//! reports what happened to an [`EventSink`], and reads time from a [`Clock`].
//! Reference implementations live here for tests and the replay tool.

use crossbeam_channel::{Receiver, Sender};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};
use types::{AccountId, AssetId, ExchangeEvent};

/// Failures reported by the asset-transfer collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Account {account} holds {available} of {asset}, needs {requested}")]
    InsufficientBalance {
        asset: AssetId,
        account: AccountId,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Transfer rejected: {reason}")]
    Rejected { reason: String },
}

/// Moves assets between accounts and the exchange
pub trait AssetTransfer: Send + Sync {
    /// Take `amount` of `asset` from `from` into the exchange
    fn debit(&self, asset: AssetId, from: AccountId, amount: Decimal) -> Result<(), TransferError>;

    /// Release `amount` of `asset` from the exchange to `to`
    fn credit(&self, asset: AssetId, to: AccountId, amount: Decimal) -> Result<(), TransferError>;
}

/// Receives notifications after operations commit
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExchangeEvent);
}

/// Source of the current time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// In-memory balance book keyed by (asset, account)
#[derive(Debug, Default)]
pub struct InMemoryBalances {
    balances: DashMap<(AssetId, AccountId), Decimal>,
}

impl InMemoryBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account from outside the exchange (test funding, deposits)
    pub fn fund(&self, asset: AssetId, account: AccountId, amount: Decimal) -> Result<(), TransferError> {
        self.add(asset, account, amount)
    }

    fn add(&self, asset: AssetId, account: AccountId, amount: Decimal) -> Result<(), TransferError> {
        let mut entry = self.balances.entry((asset, account)).or_default();
        *entry = entry.checked_add(amount).ok_or_else(|| TransferError::Rejected {
            reason: format!("balance of {} for {} would overflow", asset, account),
        })?;
        Ok(())
    }

    pub fn balance(&self, asset: AssetId, account: AccountId) -> Decimal {
        self.balances
            .get(&(asset, account))
            .map(|entry| *entry)
            .unwrap_or_default()
    }

    /// Every non-zero balance, ordered by asset then account
    pub fn snapshot(&self) -> Vec<(AssetId, AccountId, Decimal)> {
        let mut entries: Vec<_> = self
            .balances
            .iter()
            .filter(|entry| !entry.value().is_zero())
            .map(|entry| (entry.key().0, entry.key().1, *entry.value()))
            .collect();
        entries.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        entries
    }
}

impl AssetTransfer for InMemoryBalances {
    fn debit(&self, asset: AssetId, from: AccountId, amount: Decimal) -> Result<(), TransferError> {
        let mut entry = self.balances.entry((asset, from)).or_default();
        if *entry < amount {
            return Err(TransferError::InsufficientBalance {
                asset,
                account: from,
                available: *entry,
                requested: amount,
            });
        }
        *entry -= amount;
        Ok(())
    }

    fn credit(&self, asset: AssetId, to: AccountId, amount: Decimal) -> Result<(), TransferError> {
        self.add(asset, to, amount)
    }
}

/// Writes every event as a structured `tracing` line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: ExchangeEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(target: "exchange_events", kind = event.kind(), pair = %event.pair(), %payload),
            Err(e) => warn!(target: "exchange_events", kind = event.kind(), "Failed to encode event: {}", e),
        }
    }
}

/// Keeps events in memory for inspection
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<ExchangeEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ExchangeEvent> {
        self.events.lock().clone()
    }

    pub fn drain(&self) -> Vec<ExchangeEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: ExchangeEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards events to a consumer over a crossbeam channel
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: Sender<ExchangeEvent>,
}

impl ChannelEventSink {
    /// Create a sink together with the receiving end for the consumer
    pub fn unbounded() -> (Self, Receiver<ExchangeEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: ExchangeEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!("Event consumer disconnected, dropping {}", e.0.kind());
        }
    }
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
