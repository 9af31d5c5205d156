//! Replay script format
//!
//! A script is a JSON document with optional opening balances and an ordered
//! list of steps, each tagged by `op`:
//!
//! ```json
//! {
//!   "start_time": 1000,
//!   "balances": [{ "asset": "0x…01", "account": "0x…0a", "amount": "5000" }],
//!   "steps": [
//!     { "op": "create_pair", "asset_x": "0x…01", "asset_y": "0x…02" },
//!     { "op": "swap", "asset_in": "0x…01", "asset_out": "0x…02", "amount_in": "10", ... }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use torq_amm::{
    ArbitrageRequest, BatchSwapRequest, DepositRequest, PathSwapRequest, SwapRequest,
    WithdrawRequest, ZapRequest,
};
use types::{AccountId, AssetId, PairId};

/// Opening balance credited before the first step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funding {
    pub asset: AssetId,
    pub account: AccountId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    CreatePair {
        asset_x: AssetId,
        asset_y: AssetId,
        #[serde(default)]
        fee_rate_bps: Option<u16>,
    },
    SetFeeRate {
        pair: PairId,
        fee_rate_bps: u16,
    },
    SetActive {
        pair: PairId,
        is_active: bool,
    },
    Fund(Funding),
    AdvanceClock {
        seconds: u64,
    },
    Deposit(DepositRequest),
    Withdraw(WithdrawRequest),
    Swap(SwapRequest),
    SwapPath(PathSwapRequest),
    Batch(BatchSwapRequest),
    Arbitrage(ArbitrageRequest),
    Zap(ZapRequest),
    Quote {
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: Decimal,
    },
    FindPath {
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: Decimal,
    },
}

impl Step {
    /// Name used in reports and log lines
    pub fn name(&self) -> &'static str {
        match self {
            Step::CreatePair { .. } => "create_pair",
            Step::SetFeeRate { .. } => "set_fee_rate",
            Step::SetActive { .. } => "set_active",
            Step::Fund(_) => "fund",
            Step::AdvanceClock { .. } => "advance_clock",
            Step::Deposit(_) => "deposit",
            Step::Withdraw(_) => "withdraw",
            Step::Swap(_) => "swap",
            Step::SwapPath(_) => "swap_path",
            Step::Batch(_) => "batch",
            Step::Arbitrage(_) => "arbitrage",
            Step::Zap(_) => "zap",
            Step::Quote { .. } => "quote",
            Step::FindPath { .. } => "find_path",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub start_time: u64,
    #[serde(default)]
    pub balances: Vec<Funding>,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Invalid replay script")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::from_json(&contents)
    }
}
