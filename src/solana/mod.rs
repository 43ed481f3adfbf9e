//! Wallet session backed by a Solana keypair.

pub mod client;
pub mod wallet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::TokenBalance;

#[async_trait]
pub trait WalletSession: Send + Sync {
    fn is_connected(&self) -> bool;

    fn address(&self) -> Option<String>;

    /// Last known balances; refreshed by `refresh`.
    async fn token_balances(&self) -> Vec<TokenBalance>;

    /// Re-reads balances from the chain.
    async fn refresh(&self) -> Result<()>;
}

/// Stand-in used when no private key is configured.
#[derive(Debug, Clone, Default)]
pub struct NoWallet;

#[async_trait]
impl WalletSession for NoWallet {
    fn is_connected(&self) -> bool {
        false
    }

    fn address(&self) -> Option<String> {
        None
    }

    async fn token_balances(&self) -> Vec<TokenBalance> {
        Vec::new()
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_wallet_reports_disconnected() {
        let wallet = NoWallet;
        assert!(!wallet.is_connected());
        assert!(wallet.address().is_none());
        assert!(wallet.refresh().await.is_ok());
        assert!(wallet.token_balances().await.is_empty());
    }
}
