//! Offline collaborators for DEMO_MODE: a random-walk price oracle, a venue
//! that settles most swaps, and an always-connected wallet.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::api::{ExecutionVenue, OraclePrice, PriceOracle};
use crate::models::TokenBalance;
use crate::solana::WalletSession;

pub const DEMO_WALLET_ADDRESS: &str = "DemoWa11et1111111111111111111111111111111111";

#[derive(Debug, Clone, Copy)]
struct Walk {
    open: f64,
    last: f64,
}

/// Each token starts somewhere in [0.0001, 1.0) and moves up to ±`volatility` percent per call.
pub struct DemoPriceOracle {
    rng: Mutex<StdRng>,
    walks: Mutex<HashMap<String, Walk>>,
    volatility: f64,
}

impl DemoPriceOracle {
    pub fn new(volatility_percent: f64) -> Self {
        Self::with_rng(StdRng::from_entropy(), volatility_percent)
    }

    pub fn seeded(seed: u64, volatility_percent: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), volatility_percent)
    }

    fn with_rng(rng: StdRng, volatility_percent: f64) -> Self {
        Self {
            rng: Mutex::new(rng),
            walks: Mutex::new(HashMap::new()),
            volatility: volatility_percent.abs(),
        }
    }
}

#[async_trait]
impl PriceOracle for DemoPriceOracle {
    async fn get_price(&self, token_address: &str) -> Result<OraclePrice> {
        let mut rng = self.rng.lock().map_err(|_| anyhow!("demo rng poisoned"))?;
        let mut walks = self.walks.lock().map_err(|_| anyhow!("demo walks poisoned"))?;

        let walk = walks.entry(token_address.to_string()).or_insert_with(|| {
            let open = rng.gen_range(0.0001..1.0);
            Walk { open, last: open }
        });
        let step = if self.volatility > 0.0 {
            rng.gen_range(-self.volatility..=self.volatility)
        } else {
            0.0
        };
        walk.last = (walk.last * (1.0 + step / 100.0)).max(f64::MIN_POSITIVE);

        let change_24h = (walk.last - walk.open) / walk.open * 100.0;
        debug!("[DEMO MODE] {} -> {:.8} ({:+.2}%)", token_address, walk.last, change_24h);
        Ok(OraclePrice {
            price: walk.last,
            change_24h,
            symbol: Some(format!("DEMO{}", token_address.chars().take(4).collect::<String>())),
        })
    }
}

/// Settles swaps with probability `success_rate` after a short delay.
pub struct DemoVenue {
    rng: Mutex<StdRng>,
    success_rate: f64,
    latency: Duration,
}

impl DemoVenue {
    pub fn new(success_rate: f64, latency: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            success_rate: success_rate.clamp(0.0, 1.0),
            latency,
        }
    }
}

#[async_trait]
impl ExecutionVenue for DemoVenue {
    async fn swap(&self, from_mint: &str, to_mint: &str, amount: f64, wallet_address: &str) -> Result<bool> {
        info!(
            "[DEMO MODE] Simulating swap {:.9} {} -> {} for {}",
            amount, from_mint, to_mint, wallet_address
        );
        tokio::time::sleep(self.latency).await;
        let roll: f64 = self.rng.lock().map_err(|_| anyhow!("demo rng poisoned"))?.gen();
        Ok(roll < self.success_rate)
    }
}

/// Always connected; balances are whatever was last set.
pub struct DemoWallet {
    balances: RwLock<Vec<TokenBalance>>,
}

impl DemoWallet {
    pub fn new(sol_balance: f64) -> Self {
        Self {
            balances: RwLock::new(vec![TokenBalance {
                mint: crate::api::jupiter::SOL_MINT.to_string(),
                symbol: Some("SOL".to_string()),
                amount_ui: sol_balance,
                decimals: 9,
            }]),
        }
    }
}

#[async_trait]
impl WalletSession for DemoWallet {
    fn is_connected(&self) -> bool {
        true
    }

    fn address(&self) -> Option<String> {
        Some(DEMO_WALLET_ADDRESS.to_string())
    }

    async fn token_balances(&self) -> Vec<TokenBalance> {
        self.balances.read().await.clone()
    }

    async fn refresh(&self) -> Result<()> {
        debug!("[DEMO MODE] Wallet refresh requested");
        Ok(())
    }
}
