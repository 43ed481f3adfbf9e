//! Market-facing collaborators: the price oracle and the execution venue.

pub mod birdeye;
pub mod jupiter;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Price answer from an oracle, quoted in the quote mint (SOL).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OraclePrice {
    pub price: f64,
    pub change_24h: f64,
    pub symbol: Option<String>,
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, token_address: &str) -> Result<OraclePrice>;
}

#[async_trait]
pub trait ExecutionVenue: Send + Sync {
    /// Swaps `amount` UI units of `from_mint` into `to_mint`. `Ok(true)` means settled.
    async fn swap(&self, from_mint: &str, to_mint: &str, amount: f64, wallet_address: &str) -> Result<bool>;
}

/// Venue for a process with no wallet loaded. Every swap fails.
#[derive(Debug, Clone, Default)]
pub struct DisconnectedVenue;

#[async_trait]
impl ExecutionVenue for DisconnectedVenue {
    async fn swap(&self, _from_mint: &str, _to_mint: &str, _amount: f64, _wallet_address: &str) -> Result<bool> {
        anyhow::bail!("No wallet is loaded; cannot execute swaps")
    }
}
