//! Exchange replay tool - runs an operation script against a fresh in-memory exchange
//!
//! Usage:
//!   amm-replay scripts/session.json
//!   amm-replay scripts/session.json --config config/exchange.toml --fail-fast
//!
//! The report (step outcomes, events, final pairs and balances) is written to
//! stdout as JSON; logs go to stderr.

mod replay;
mod script;

use amm_config::ExchangeConfig;
use anyhow::Result;
use clap::Parser;
use replay::Replayer;
use script::Script;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "amm-replay")]
#[command(about = "Replay exchange operation scripts")]
#[command(version)]
struct Args {
    /// Path to the replay script (JSON)
    script: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Abort on the first failing step
    #[arg(long)]
    fail_fast: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = ExchangeConfig::load(args.config.as_deref())?;
    init_logging(&args, &config)?;

    info!("Starting exchange replay");
    info!("Script: {}", args.script.display());

    let script = Script::from_file(&args.script).map_err(|e| {
        error!("Failed to load script: {}", e);
        e
    })?;
    info!(steps = script.steps.len(), start_time = script.start_time, "Script loaded");

    let report = Replayer::new(config.amm, script.start_time)
        .fail_fast(args.fail_fast)
        .run(&script)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_logging(args: &Args, config: &ExchangeConfig) -> Result<()> {
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&level))?;

    if args.json_logs || config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}
