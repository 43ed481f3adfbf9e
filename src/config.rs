use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::trading::config_store::BotConfig;
use crate::trading::strategy::{StrategyFlags, StrategyKind};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub solana_rpc_url: String,
    pub wallet_private_key: Option<String>, // Absent means no wallet is connected
    pub birdeye_api_key: Option<String>,   // Required unless demo mode is on
    pub jupiter_api_key: Option<String>,

    pub demo_mode: bool,
    pub data_dir: PathBuf,
    pub api_host: Option<String>,
    pub api_port: Option<u16>,

    // Engine timing
    pub tick_interval_secs: u64,
    pub price_throttle_secs: u64,
    pub execution_timeout_secs: u64,

    // Defaults for a fresh bot configuration
    pub default_trade_amount: f64,
    pub default_buy_threshold_percent: f64,
    pub default_sell_threshold_percent: f64,
    pub default_stop_loss_percent: f64,
    pub default_take_profit_percent: f64,
    pub default_max_trades: u32,
    pub default_strategy: StrategyKind,
    pub default_seed_fraction: f64,
    pub default_dca_interval_secs: u64,

    // Swap parameters
    pub default_slippage_bps: u32,
    pub default_priority_fee_micro_lamports: u64,
}

/// Timing knobs the controller needs; split out so tests can build one directly.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub tick_interval: Duration,
    pub price_throttle: Duration,
    pub execution_timeout: Duration,
    pub quote_mint: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            price_throttle: Duration::from_secs(10),
            execution_timeout: Duration::from_secs(30),
            quote_mint: crate::api::jupiter::SOL_MINT.to_string(),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Result<Self> {
        let demo_mode = env::var("DEMO_MODE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true); // Default to demo mode true

        let birdeye_api_key = env::var("BIRDEYE_API_KEY").ok();
        if !demo_mode && birdeye_api_key.is_none() {
            anyhow::bail!("BIRDEYE_API_KEY must be set when DEMO_MODE is false");
        }

        let default_strategy = env::var("DEFAULT_STRATEGY")
            .unwrap_or_else(|_| "simple".to_string())
            .parse::<StrategyKind>()
            .map_err(anyhow::Error::msg)
            .context("Failed to parse DEFAULT_STRATEGY")?;

        Ok(Self {
            solana_rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string()),
            wallet_private_key: env::var("WALLET_PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty()),
            birdeye_api_key,
            jupiter_api_key: env::var("JUPITER_API_KEY").ok(), // Optional

            demo_mode,
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
            api_host: env::var("API_HOST").ok(),
            api_port: env::var("API_PORT").ok().and_then(|p| p.parse().ok()),

            tick_interval_secs: parse_or("TICK_INTERVAL_SECS", 60),
            price_throttle_secs: parse_or("PRICE_THROTTLE_SECS", 10),
            execution_timeout_secs: parse_or("EXECUTION_TIMEOUT_SECS", 30),

            default_trade_amount: parse_or("DEFAULT_TRADE_AMOUNT", 0.01),
            default_buy_threshold_percent: parse_or("DEFAULT_BUY_THRESHOLD_PERCENT", 5.0),
            default_sell_threshold_percent: parse_or("DEFAULT_SELL_THRESHOLD_PERCENT", 10.0),
            default_stop_loss_percent: parse_or("DEFAULT_STOP_LOSS_PERCENT", 10.0),
            default_take_profit_percent: parse_or("DEFAULT_TAKE_PROFIT_PERCENT", 50.0),
            default_max_trades: parse_or("DEFAULT_MAX_TRADES", 10),
            default_strategy,
            default_seed_fraction: parse_or("DEFAULT_SEED_FRACTION", 0.5),
            default_dca_interval_secs: parse_or("DEFAULT_DCA_INTERVAL_SECS", 3600),

            default_slippage_bps: env::var("DEFAULT_SLIPPAGE_BPS")
                .unwrap_or_else(|_| "100".to_string()) // Default 1%
                .parse()
                .context("Failed to parse DEFAULT_SLIPPAGE_BPS")?,
            default_priority_fee_micro_lamports: env::var("DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS")
                .unwrap_or_else(|_| "50000".to_string()) // Default 50k
                .parse()
                .context("Failed to parse DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS")?,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            tick_interval: Duration::from_secs(self.tick_interval_secs.max(1)),
            price_throttle: Duration::from_secs(self.price_throttle_secs),
            execution_timeout: Duration::from_secs(self.execution_timeout_secs.max(1)),
            ..EngineSettings::default()
        }
    }

    /// Initial bot configuration built from the environment defaults.
    pub fn initial_bot_config(&self) -> BotConfig {
        BotConfig {
            selected_token: None,
            trade_amount: self.default_trade_amount,
            buy_threshold: self.default_buy_threshold_percent,
            sell_threshold: self.default_sell_threshold_percent,
            stop_loss: self.default_stop_loss_percent,
            take_profit: self.default_take_profit_percent,
            max_trades: self.default_max_trades,
            strategy: self.default_strategy,
            strategies: StrategyFlags::default(),
            seed_fraction: self.default_seed_fraction,
            dca_interval_secs: self.default_dca_interval_secs,
        }
    }
}
