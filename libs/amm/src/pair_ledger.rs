//! Pair Ledger
//!
//! Canonical registry of trading pairs, their reserves, share supply and fee
//! configuration, plus the liquidity positions held against them.
//!
//! Pairs live in a `DashMap` of individually locked slots. A mutation takes
//! the slot's write lock for the whole logical operation, works on a copy and
//! writes the copy back only if the operation succeeds, so no partial state
//! is ever observable. Operations spanning several pairs lock all of them up
//! front in canonical order.

use crate::collaborators::AssetTransfer;
use crate::errors::{ExchangeError, Result};
use crate::v2_math::{V2Math, V2PoolState};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use types::{AccountId, AssetId, ExchangeEvent, PairId};

/// Complete state of a single trading pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPair {
    pub id: PairId,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    pub total_shares: Decimal,
    pub fee_rate_bps: u16,
    pub is_active: bool,

    // Cumulative counters, per side, in that side's asset
    pub volume_a: Decimal,
    pub volume_b: Decimal,
    pub fees_a: Decimal,
    pub fees_b: Decimal,

    pub created_at: u64,
    pub last_trade_at: Option<u64>,
}

impl TradingPair {
    /// Create an empty, active pair
    pub fn new(id: PairId, fee_rate_bps: u16, created_at: u64) -> Self {
        Self {
            id,
            reserve_a: Decimal::ZERO,
            reserve_b: Decimal::ZERO,
            total_shares: Decimal::ZERO,
            fee_rate_bps,
            is_active: true,
            volume_a: Decimal::ZERO,
            volume_b: Decimal::ZERO,
            fees_a: Decimal::ZERO,
            fees_b: Decimal::ZERO,
            created_at,
            last_trade_at: None,
        }
    }

    /// Both reserves are positive
    pub fn has_liquidity(&self) -> bool {
        self.reserve_a > Decimal::ZERO && self.reserve_b > Decimal::ZERO
    }

    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(ExchangeError::PairInactive { pair: self.id })
        }
    }

    /// Reserve held for `asset`
    pub fn reserve_of(&self, asset: AssetId) -> Option<Decimal> {
        if asset == self.id.asset_a() {
            Some(self.reserve_a)
        } else if asset == self.id.asset_b() {
            Some(self.reserve_b)
        } else {
            None
        }
    }

    /// The pair seen from the side of `asset_in`
    pub fn directed(&self, asset_in: AssetId) -> Result<V2PoolState> {
        let (reserve_in, reserve_out) = if asset_in == self.id.asset_a() {
            (self.reserve_a, self.reserve_b)
        } else if asset_in == self.id.asset_b() {
            (self.reserve_b, self.reserve_a)
        } else {
            return Err(ExchangeError::invalid_path(format!(
                "{} is not traded in {}",
                asset_in, self.id
            )));
        };

        Ok(V2PoolState {
            pair: self.id,
            reserve_in,
            reserve_out,
            fee_bps: self.fee_rate_bps,
        })
    }

    /// Product of the reserves, `None` if not representable
    pub fn constant_product(&self) -> Option<Decimal> {
        V2Math::constant_product(self.reserve_a, self.reserve_b)
    }

    /// Reserves are both zero or both positive, and shares exist iff reserves do
    pub fn is_consistent(&self) -> bool {
        let empty = self.reserve_a.is_zero() && self.reserve_b.is_zero();
        let funded = self.has_liquidity();
        (empty && self.total_shares.is_zero()) || (funded && self.total_shares > Decimal::ZERO)
    }

    pub(crate) fn add_to_side(&mut self, asset: AssetId, amount: Decimal) -> Result<()> {
        let reserve = self.side_mut(asset)?;
        *reserve = reserve
            .checked_add(amount)
            .ok_or(ExchangeError::Overflow {
                operation: "reserve increase",
            })?;
        Ok(())
    }

    pub(crate) fn remove_from_side(&mut self, asset: AssetId, amount: Decimal) -> Result<()> {
        let pair = self.id;
        let reserve = self.side_mut(asset)?;
        if amount > *reserve {
            return Err(ExchangeError::NoLiquidity { pair });
        }
        *reserve -= amount;
        Ok(())
    }

    pub(crate) fn record_trade(
        &mut self,
        asset_in: AssetId,
        amount_in: Decimal,
        fee: Decimal,
        now: u64,
    ) -> Result<()> {
        let (volume, fees) = if asset_in == self.id.asset_a() {
            (&mut self.volume_a, &mut self.fees_a)
        } else {
            (&mut self.volume_b, &mut self.fees_b)
        };
        *volume = volume.checked_add(amount_in).ok_or(ExchangeError::Overflow {
            operation: "cumulative volume",
        })?;
        *fees = fees.checked_add(fee).ok_or(ExchangeError::Overflow {
            operation: "cumulative fees",
        })?;
        self.last_trade_at = Some(now);
        Ok(())
    }

    fn side_mut(&mut self, asset: AssetId) -> Result<&mut Decimal> {
        if asset == self.id.asset_a() {
            Ok(&mut self.reserve_a)
        } else if asset == self.id.asset_b() {
            Ok(&mut self.reserve_b)
        } else {
            Err(ExchangeError::invalid_path(format!(
                "{} is not traded in {}",
                asset, self.id
            )))
        }
    }
}

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

fn current_thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

/// Lock plus "operation in progress" marker for one pair
#[derive(Debug)]
struct PairSlot {
    state: RwLock<TradingPair>,
    /// Token of the thread currently mutating this pair, 0 when idle
    owner: AtomicU64,
}

impl PairSlot {
    fn new(pair: TradingPair) -> Self {
        Self {
            state: RwLock::new(pair),
            owner: AtomicU64::new(0),
        }
    }

    fn held_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Acquire) == current_thread_token()
    }
}

/// Clears the in-progress marker on drop, including on error paths
struct OwnerClaim<'a> {
    slot: &'a PairSlot,
}

impl<'a> OwnerClaim<'a> {
    fn claim(slot: &'a PairSlot) -> Self {
        slot.owner.store(current_thread_token(), Ordering::Release);
        Self { slot }
    }
}

impl Drop for OwnerClaim<'_> {
    fn drop(&mut self) {
        self.slot.owner.store(0, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferKind {
    Debit,
    Credit,
}

/// A movement of funds staged by a transaction and settled at commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StagedTransfer {
    kind: TransferKind,
    asset: AssetId,
    account: AccountId,
    amount: Decimal,
}

impl StagedTransfer {
    fn apply(&self, transfers: &dyn AssetTransfer) -> Result<()> {
        match self.kind {
            TransferKind::Debit => transfers.debit(self.asset, self.account, self.amount)?,
            TransferKind::Credit => transfers.credit(self.asset, self.account, self.amount)?,
        }
        Ok(())
    }

    fn reverse(&self, transfers: &dyn AssetTransfer) -> Result<()> {
        match self.kind {
            TransferKind::Debit => transfers.credit(self.asset, self.account, self.amount)?,
            TransferKind::Credit => transfers.debit(self.asset, self.account, self.amount)?,
        }
        Ok(())
    }
}

/// Working state of an in-flight ledger operation
///
/// Holds copies of every locked pair, staged position updates, staged
/// transfers and staged events. Nothing becomes visible until the ledger
/// commits the transaction.
pub struct PairTransaction<'a> {
    working: BTreeMap<PairId, TradingPair>,
    positions: Option<&'a DashMap<(PairId, AccountId), Decimal>>,
    staged_positions: HashMap<(PairId, AccountId), Decimal>,
    transfers: Vec<StagedTransfer>,
    events: Vec<ExchangeEvent>,
    now: u64,
}

impl<'a> PairTransaction<'a> {
    fn new(
        working: BTreeMap<PairId, TradingPair>,
        positions: Option<&'a DashMap<(PairId, AccountId), Decimal>>,
        now: u64,
    ) -> Self {
        Self {
            working,
            positions,
            staged_positions: HashMap::new(),
            transfers: Vec::new(),
            events: Vec::new(),
            now,
        }
    }

    /// A transaction over detached snapshots, used for quoting
    ///
    /// Effects accumulate on the copies and are simply dropped.
    pub fn detached(snapshots: impl IntoIterator<Item = TradingPair>, now: u64) -> Self {
        let working = snapshots.into_iter().map(|pair| (pair.id, pair)).collect();
        Self::new(working, None, now)
    }

    /// Time at which the operation executes
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn pair(&self, id: PairId) -> Result<&TradingPair> {
        self.working
            .get(&id)
            .ok_or(ExchangeError::PairNotFound { pair: id })
    }

    pub fn pair_mut(&mut self, id: PairId) -> Result<&mut TradingPair> {
        self.working
            .get_mut(&id)
            .ok_or(ExchangeError::PairNotFound { pair: id })
    }

    /// Shares `holder` owns in `pair`, including staged changes
    pub fn position(&self, pair: PairId, holder: AccountId) -> Decimal {
        if let Some(staged) = self.staged_positions.get(&(pair, holder)) {
            return *staged;
        }
        self.positions
            .and_then(|positions| positions.get(&(pair, holder)).map(|entry| *entry))
            .unwrap_or_default()
    }

    pub fn set_position(&mut self, pair: PairId, holder: AccountId, shares: Decimal) {
        self.staged_positions.insert((pair, holder), shares);
    }

    /// Take `amount` of `asset` from `from` when the transaction commits
    pub fn debit(&mut self, asset: AssetId, from: AccountId, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.transfers.push(StagedTransfer {
                kind: TransferKind::Debit,
                asset,
                account: from,
                amount,
            });
        }
    }

    /// Release `amount` of `asset` to `to` when the transaction commits
    pub fn credit(&mut self, asset: AssetId, to: AccountId, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.transfers.push(StagedTransfer {
                kind: TransferKind::Credit,
                asset,
                account: to,
                amount,
            });
        }
    }

    /// Queue a notification for delivery after commit
    pub fn emit(&mut self, event: ExchangeEvent) {
        self.events.push(event);
    }
}

/// Outcome of a committed transaction
#[derive(Debug)]
pub struct Committed<R> {
    pub value: R,
    pub events: Vec<ExchangeEvent>,
}

/// Registry of all trading pairs and liquidity positions
pub struct PairLedger {
    /// All pairs indexed by canonical identity
    pairs: DashMap<PairId, Arc<PairSlot>>,

    /// Asset index: asset -> pairs it participates in
    asset_index: DashMap<AssetId, Vec<PairId>>,

    /// Liquidity positions: (pair, holder) -> shares
    positions: DashMap<(PairId, AccountId), Decimal>,
}

impl Default for PairLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl PairLedger {
    pub fn new() -> Self {
        Self {
            pairs: DashMap::new(),
            asset_index: DashMap::new(),
            positions: DashMap::new(),
        }
    }

    /// Derive the canonical identity of the pair formed by `x` and `y`
    pub fn pair_id(x: AssetId, y: AssetId) -> Result<PairId> {
        if x.is_zero() || y.is_zero() {
            return Err(ExchangeError::ZeroAddress { field: "asset" });
        }
        if x == y {
            return Err(ExchangeError::IdenticalAssets { asset: x });
        }
        Ok(PairId::new(x, y))
    }

    /// Register a new, empty pair
    pub fn create_pair(
        &self,
        x: AssetId,
        y: AssetId,
        fee_rate_bps: u16,
        max_fee_bps: u16,
        now: u64,
    ) -> Result<TradingPair> {
        let id = Self::pair_id(x, y)?;
        if fee_rate_bps > max_fee_bps {
            return Err(ExchangeError::InvalidFeeRate {
                fee_rate_bps,
                max_fee_bps,
            });
        }

        let pair = TradingPair::new(id, fee_rate_bps, now);
        match self.pairs.entry(id) {
            Entry::Occupied(_) => return Err(ExchangeError::DuplicatePair { pair: id }),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(PairSlot::new(pair.clone())));
            }
        }

        for asset in [id.asset_a(), id.asset_b()] {
            self.asset_index.entry(asset).or_default().push(id);
        }

        info!(pair = %id, fee_rate_bps, "Pair created");
        Ok(pair)
    }

    pub fn contains(&self, id: PairId) -> bool {
        self.pairs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn slot(&self, id: PairId) -> Result<Arc<PairSlot>> {
        self.pairs
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ExchangeError::PairNotFound { pair: id })
    }

    /// Snapshot of a pair's current state
    ///
    /// Takes the read lock only long enough to copy; the result may be stale
    /// by the time a later mutation runs.
    pub fn get_pair(&self, id: PairId) -> Result<TradingPair> {
        let slot = self.slot(id)?;
        if slot.held_by_current_thread() {
            return Err(ExchangeError::Reentrancy { pair: id });
        }
        let snapshot = slot.state.read().clone();
        Ok(snapshot)
    }

    /// Snapshot of the pair formed by two assets, if registered
    pub fn find_pair(&self, x: AssetId, y: AssetId) -> Option<TradingPair> {
        let id = Self::pair_id(x, y).ok()?;
        self.get_pair(id).ok()
    }

    /// Snapshots of every registered pair, in canonical order
    pub fn pairs(&self) -> Vec<TradingPair> {
        let mut ids: Vec<PairId> = self.pairs.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.get_pair(id).ok()).collect()
    }

    /// Pairs `asset` participates in
    pub fn pairs_for_asset(&self, asset: AssetId) -> Vec<PairId> {
        self.asset_index
            .get(&asset)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Shares `holder` owns in `pair`
    pub fn position(&self, pair: PairId, holder: AccountId) -> Decimal {
        self.positions
            .get(&(pair, holder))
            .map(|entry| *entry)
            .unwrap_or_default()
    }

    /// Every non-empty position held against `pair`
    pub fn positions_for_pair(&self, pair: PairId) -> Vec<(AccountId, Decimal)> {
        let mut holders: Vec<(AccountId, Decimal)> = self
            .positions
            .iter()
            .filter(|entry| entry.key().0 == pair)
            .map(|entry| (entry.key().1, *entry.value()))
            .collect();
        holders.sort_by_key(|(holder, _)| *holder);
        holders
    }

    /// Atomic read-modify-write of a single pair's state
    pub fn mutate<R, F>(&self, id: PairId, f: F) -> Result<R>
    where
        F: FnOnce(&mut TradingPair) -> Result<R>,
    {
        let slot = self.slot(id)?;
        if slot.held_by_current_thread() {
            return Err(ExchangeError::Reentrancy { pair: id });
        }

        let mut guard = slot.state.write();
        let _claim = OwnerClaim::claim(&slot);

        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        Ok(value)
    }

    /// Change a pair's fee rate; capability checks belong to the caller
    pub fn set_fee_rate(&self, id: PairId, fee_rate_bps: u16, max_fee_bps: u16) -> Result<TradingPair> {
        if fee_rate_bps > max_fee_bps {
            return Err(ExchangeError::InvalidFeeRate {
                fee_rate_bps,
                max_fee_bps,
            });
        }
        let updated = self.mutate(id, |pair| {
            pair.fee_rate_bps = fee_rate_bps;
            Ok(pair.clone())
        })?;
        info!(pair = %id, fee_rate_bps, "Fee rate updated");
        Ok(updated)
    }

    /// Activate or deactivate a pair; inactive pairs are kept, never deleted
    pub fn set_active(&self, id: PairId, is_active: bool) -> Result<TradingPair> {
        let updated = self.mutate(id, |pair| {
            pair.is_active = is_active;
            Ok(pair.clone())
        })?;
        info!(pair = %id, is_active, "Pair activation changed");
        Ok(updated)
    }

    /// Atomic operation across every pair in `ids`
    ///
    /// All pairs are locked in canonical order before `f` runs. If `f`
    /// succeeds, staged transfers are settled through `transfers` (debits
    /// before credits) and the working copies are written back. If `f` or
    /// settlement fails, every pair is left exactly as it was.
    pub fn transact<R, F>(
        &self,
        ids: &[PairId],
        transfers: &dyn AssetTransfer,
        now: u64,
        f: F,
    ) -> Result<Committed<R>>
    where
        F: FnOnce(&mut PairTransaction<'_>) -> Result<R>,
    {
        let ordered: BTreeSet<PairId> = ids.iter().copied().collect();

        let mut slots = Vec::with_capacity(ordered.len());
        for id in &ordered {
            let slot = self.slot(*id)?;
            if slot.held_by_current_thread() {
                return Err(ExchangeError::Reentrancy { pair: *id });
            }
            slots.push((*id, slot));
        }

        let mut guards: Vec<_> = slots.iter().map(|(_, slot)| slot.state.write()).collect();
        let _claims: Vec<OwnerClaim<'_>> = slots
            .iter()
            .map(|(_, slot)| OwnerClaim::claim(slot))
            .collect();

        let working = slots
            .iter()
            .zip(guards.iter())
            .map(|((id, _), guard)| (*id, (**guard).clone()))
            .collect();

        let mut txn = PairTransaction::new(working, Some(&self.positions), now);
        let value = match f(&mut txn) {
            Ok(value) => value,
            Err(e) => {
                debug!(pairs = ordered.len(), error = %e, "Ledger transaction rolled back");
                return Err(e);
            }
        };

        Self::settle(transfers, &txn.transfers)?;

        let PairTransaction {
            mut working,
            staged_positions,
            events,
            ..
        } = txn;

        for ((id, _), guard) in slots.iter().zip(guards.iter_mut()) {
            if let Some(updated) = working.remove(id) {
                debug_assert!(updated.is_consistent(), "inconsistent pair {}", id);
                **guard = updated;
            }
        }

        for (key, shares) in staged_positions {
            if shares.is_zero() {
                self.positions.remove(&key);
            } else {
                self.positions.insert(key, shares);
            }
        }

        Ok(Committed { value, events })
    }

    /// Execute staged transfers, reversing the applied ones if any fails
    fn settle(transfers: &dyn AssetTransfer, staged: &[StagedTransfer]) -> Result<()> {
        let ordered = staged
            .iter()
            .filter(|t| t.kind == TransferKind::Debit)
            .chain(staged.iter().filter(|t| t.kind == TransferKind::Credit));

        let mut applied: Vec<&StagedTransfer> = Vec::with_capacity(staged.len());
        for transfer in ordered {
            if let Err(e) = transfer.apply(transfers) {
                warn!(
                    asset = %transfer.asset,
                    account = %transfer.account,
                    amount = %transfer.amount,
                    error = %e,
                    "Settlement failed, reversing {} applied transfers",
                    applied.len()
                );
                for done in applied.iter().rev() {
                    if let Err(reversal) = done.reverse(transfers) {
                        error!(
                            asset = %done.asset,
                            account = %done.account,
                            amount = %done.amount,
                            error = %reversal,
                            "Failed to reverse transfer"
                        );
                    }
                }
                return Err(e);
            }
            applied.push(transfer);
        }
        Ok(())
    }
}
