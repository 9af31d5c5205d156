//! Error taxonomy for exchange operations
//!
//! Every error is terminal for the requested operation: nothing is retried and
//! no state from the failed call survives. Variants carry the offending values
//! so a caller can build a corrected request.

use crate::collaborators::TransferError;
use rust_decimal::Decimal;
use thiserror::Error;
use types::{AssetId, PairId};

/// Result alias used throughout the exchange core
pub type Result<T> = std::result::Result<T, ExchangeError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    // Deadline
    #[error("Deadline {deadline} has passed (now {now})")]
    Expired { deadline: u64, now: u64 },

    // Caller-supplied floors
    #[error("Amount {amount} of {asset} is below the minimum {minimum}")]
    InsufficientAmount {
        asset: AssetId,
        amount: Decimal,
        minimum: Decimal,
    },

    #[error("Deposit would mint {minted} shares")]
    InsufficientLiquidityMinted { minted: Decimal },

    #[error("Computed output {amount_out} is not positive")]
    InsufficientOutputAmount { amount_out: Decimal },

    #[error("Input amount {amount_in} must be positive")]
    InsufficientInputAmount { amount_in: Decimal },

    #[error("Output {amount_out} is below the minimum {min_amount_out}")]
    SlippageExceeded {
        amount_out: Decimal,
        min_amount_out: Decimal,
    },

    // Resource state
    #[error("Pair {pair} has no liquidity")]
    NoLiquidity { pair: PairId },

    #[error("Pair {pair} is inactive")]
    PairInactive { pair: PairId },

    #[error("Pair {pair} does not exist")]
    PairNotFound { pair: PairId },

    #[error("Holder owns {available} shares of {pair}, requested {requested}")]
    InsufficientShares {
        pair: PairId,
        available: Decimal,
        requested: Decimal,
    },

    // Input validation
    #[error("Pair {pair} already exists")]
    DuplicatePair { pair: PairId },

    #[error("Pair cannot be formed from {asset} and itself")]
    IdenticalAssets { asset: AssetId },

    #[error("Zero identifier supplied for {field}")]
    ZeroAddress { field: &'static str },

    #[error("Fee rate {fee_rate_bps} bps exceeds maximum {max_fee_bps} bps")]
    InvalidFeeRate { fee_rate_bps: u16, max_fee_bps: u16 },

    #[error("Invalid path: {reason}")]
    InvalidPath { reason: String },

    // Arbitrage
    #[error("Profit {profit} is below the minimum {min_profit}")]
    InsufficientProfit { profit: Decimal, min_profit: Decimal },

    #[error("Cycle returns {amount_out} for {amount_in}; no profit")]
    NoProfitableArbitrage {
        amount_in: Decimal,
        amount_out: Decimal,
    },

    // Execution guards
    #[error("Reentrant mutation of pair {pair}")]
    Reentrancy { pair: PairId },

    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },

    #[error("Constant product of {pair} would decrease")]
    InvariantViolation { pair: PairId },

    #[error("Settlement failed: {0}")]
    Transfer(#[from] TransferError),
}

impl ExchangeError {
    pub(crate) fn invalid_path(reason: impl Into<String>) -> Self {
        ExchangeError::InvalidPath {
            reason: reason.into(),
        }
    }
}
