//! Deterministic script execution against an in-memory exchange

use crate::script::{Funding, Script, Step};
use amm_config::AmmSettings;
use anyhow::{bail, Result};
use crossbeam_channel::Receiver;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use torq_amm::{
    ChannelEventSink, Clock, ExchangeCore, ExchangeEvent, InMemoryBalances, ManualClock,
    TradingPair,
};
use tracing::{debug, info, warn};
use types::{AccountId, AssetId};

/// Result of one step: the engine's output or the error it reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceEntry {
    pub asset: AssetId,
    pub account: AccountId,
    pub amount: Decimal,
}

/// Everything a replay produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepOutcome>,
    pub events: Vec<ExchangeEvent>,
    pub pairs: Vec<TradingPair>,
    pub balances: Vec<BalanceEntry>,
}

impl ReplayReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|step| !step.is_ok()).count()
    }
}

/// Runs scripts against a fresh exchange with a manual clock
pub struct Replayer {
    core: ExchangeCore,
    balances: Arc<InMemoryBalances>,
    clock: Arc<ManualClock>,
    events: Receiver<ExchangeEvent>,
    fail_fast: bool,
}

impl Replayer {
    pub fn new(settings: AmmSettings, start_time: u64) -> Self {
        let balances = Arc::new(InMemoryBalances::new());
        let clock = Arc::new(ManualClock::new(start_time));
        let (sink, events) = ChannelEventSink::unbounded();
        let core = ExchangeCore::builder(balances.clone())
            .settings(settings)
            .event_sink(Arc::new(sink))
            .clock(clock.clone())
            .build();

        Self {
            core,
            balances,
            clock,
            events,
            fail_fast: false,
        }
    }

    /// Stop at the first failing step instead of recording it and continuing
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn run(self, script: &Script) -> Result<ReplayReport> {
        self.clock.set(script.start_time);
        for funding in &script.balances {
            self.fund(funding)?;
        }

        let mut steps = Vec::with_capacity(script.steps.len());
        for (index, step) in script.steps.iter().enumerate() {
            let at = self.clock.now();
            let outcome = match self.apply(step) {
                Ok(output) => StepOutcome {
                    index,
                    op: step.name(),
                    at,
                    output,
                    error: None,
                },
                Err(e) => {
                    warn!(index, op = step.name(), error = %e, "Step failed");
                    if self.fail_fast {
                        bail!("step {} ({}) failed: {}", index, step.name(), e);
                    }
                    StepOutcome {
                        index,
                        op: step.name(),
                        at,
                        output: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            steps.push(outcome);
        }

        let report = ReplayReport {
            events: self.events.try_iter().collect(),
            pairs: self.core.ledger().pairs(),
            balances: self
                .balances
                .snapshot()
                .into_iter()
                .map(|(asset, account, amount)| BalanceEntry {
                    asset,
                    account,
                    amount,
                })
                .collect(),
            steps,
        };
        info!(
            steps = report.steps.len(),
            failures = report.failures(),
            events = report.events.len(),
            "✅ Replay complete"
        );
        Ok(report)
    }

    fn fund(&self, funding: &Funding) -> Result<()> {
        debug!(asset = %funding.asset, account = %funding.account, amount = %funding.amount, "Funding account");
        self.balances
            .fund(funding.asset, funding.account, funding.amount)?;
        Ok(())
    }

    fn apply(&self, step: &Step) -> Result<Option<Value>> {
        let core = &self.core;
        let output = match step {
            Step::CreatePair {
                asset_x,
                asset_y,
                fee_rate_bps,
            } => serde_json::to_value(core.create_pair(*asset_x, *asset_y, *fee_rate_bps)?)?,
            Step::SetFeeRate { pair, fee_rate_bps } => {
                serde_json::to_value(core.set_fee_rate(*pair, *fee_rate_bps)?)?
            }
            Step::SetActive { pair, is_active } => {
                serde_json::to_value(core.set_active(*pair, *is_active)?)?
            }
            Step::Fund(funding) => {
                self.fund(funding)?;
                return Ok(None);
            }
            Step::AdvanceClock { seconds } => {
                self.clock.advance(*seconds);
                return Ok(None);
            }
            Step::Deposit(request) => serde_json::to_value(core.liquidity().deposit(request)?)?,
            Step::Withdraw(request) => serde_json::to_value(core.liquidity().withdraw(request)?)?,
            Step::Swap(request) => serde_json::to_value(core.swaps().swap(request)?)?,
            Step::SwapPath(request) => {
                serde_json::to_value(core.router().swap_exact_in_path(request)?)?
            }
            Step::Batch(request) => {
                let result = core.router().batch_swap(request)?;
                // failed legs carry their error message in place of a result
                let legs = result
                    .legs
                    .iter()
                    .map(|leg| match leg {
                        Ok(path) => serde_json::to_value(path),
                        Err(e) => Ok(json!({ "error": e.to_string() })),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                json!({ "mode": result.mode, "legs": legs })
            }
            Step::Arbitrage(request) => serde_json::to_value(core.router().arbitrage(request)?)?,
            Step::Zap(request) => serde_json::to_value(core.router().zap(request)?)?,
            Step::Quote {
                asset_in,
                asset_out,
                amount_in,
            } => serde_json::to_value(core.swaps().quote(*asset_in, *asset_out, *amount_in)?)?,
            Step::FindPath {
                asset_in,
                asset_out,
                amount_in,
            } => {
                let route = core
                    .router()
                    .find_optimal_path(*asset_in, *asset_out, *amount_in)?;
                serde_json::to_value(route)?
            }
        };
        Ok(Some(output))
    }
}
