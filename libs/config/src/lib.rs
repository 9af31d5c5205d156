//! # Exchange Configuration
//!
//! Centralized configuration for the exchange core and its tooling.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use amm_config::ExchangeConfig;
//!
//! let config = ExchangeConfig::load(None).expect("valid configuration");
//! assert!(config.amm.default_fee_bps <= config.amm.max_fee_bps);
//! ```

pub mod exchange_config;

pub use exchange_config::{
    AmmSettings, BatchMode, ExchangeConfig, LoggingConfig, DEFAULT_MINIMUM_LIQUIDITY, ENV_PREFIX,
    FEE_RATE_CEILING_BPS,
};
