//! Exchange Configuration Module
//!
//! Provides configuration loading for the exchange core and its tooling.
//! Built-in defaults are layered under an optional TOML file, which is in turn
//! overridden by `EXCHANGE_`-prefixed environment variables
//! (e.g. `EXCHANGE_AMM__DEFAULT_FEE_BPS=25`).

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use types::{AssetId, AMOUNT_SCALE};

/// Upper bound for any pair fee rate (10%)
pub const FEE_RATE_CEILING_BPS: u16 = 1000;

/// Default first-deposit lock: 1000 of the smallest representable amount
pub const DEFAULT_MINIMUM_LIQUIDITY: Decimal = Decimal::from_parts(1000, 0, 0, false, AMOUNT_SCALE);

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "EXCHANGE";

/// How a batch of independent swap paths is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Any failing leg aborts the whole batch and nothing is applied
    #[default]
    AllOrNothing,
    /// Each leg commits or fails on its own
    BestEffort,
}

/// Complete configuration for the exchange
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExchangeConfig {
    /// Pricing, liquidity and routing parameters
    #[serde(default)]
    pub amm: AmmSettings,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pricing, liquidity and routing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmmSettings {
    /// Fee applied to newly created pairs, in basis points (30 = 0.3%)
    pub default_fee_bps: u16,
    /// Largest fee rate the admin surface may set
    pub max_fee_bps: u16,
    /// Shares permanently locked on a pair's first deposit
    pub minimum_liquidity: Decimal,
    /// Intermediate assets considered by path discovery and zaps
    pub hub_assets: Vec<AssetId>,
    /// Default settlement for batch swaps
    pub batch_mode: BatchMode,
    /// Maximum number of hops accepted in a single path
    pub max_hops: usize,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `torq_amm=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for AmmSettings {
    fn default() -> Self {
        Self {
            default_fee_bps: 30,
            max_fee_bps: FEE_RATE_CEILING_BPS,
            minimum_liquidity: DEFAULT_MINIMUM_LIQUIDITY,
            hub_assets: Vec::new(),
            batch_mode: BatchMode::AllOrNothing,
            max_hops: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ExchangeConfig {
    /// Load configuration from defaults, an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&Self::default()).context("Failed to encode default configuration")?,
        );

        if let Some(path) = path {
            info!("Loading exchange config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("amm.hub_assets")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(?config, "Exchange configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string (no environment layering)
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Invalid TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Render configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let amm = &self.amm;

        if amm.max_fee_bps > FEE_RATE_CEILING_BPS {
            bail!(
                "max_fee_bps must be <= {} (got {})",
                FEE_RATE_CEILING_BPS,
                amm.max_fee_bps
            );
        }

        if amm.default_fee_bps > amm.max_fee_bps {
            bail!(
                "default_fee_bps ({}) exceeds max_fee_bps ({})",
                amm.default_fee_bps,
                amm.max_fee_bps
            );
        }

        if amm.minimum_liquidity <= Decimal::ZERO {
            bail!("minimum_liquidity must be positive");
        }
        if amm.minimum_liquidity.normalize().scale() > AMOUNT_SCALE {
            bail!(
                "minimum_liquidity {} has more than {} fractional digits",
                amm.minimum_liquidity,
                AMOUNT_SCALE
            );
        }

        if amm.max_hops == 0 {
            bail!("max_hops must be at least 1");
        }

        let mut seen = HashSet::new();
        for hub in &amm.hub_assets {
            if hub.is_zero() {
                bail!("hub_assets must not contain the zero identifier");
            }
            if !seen.insert(*hub) {
                bail!("hub_assets contains {} more than once", hub);
            }
        }

        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }

        Ok(())
    }
}
