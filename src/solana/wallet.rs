use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::client::SolanaClient;
use super::WalletSession;
use crate::api::jupiter::SOL_MINT;
use crate::models::TokenBalance;

/// Decodes a base58 secret key into a keypair.
pub fn parse_keypair(private_key_bs58: &str) -> Result<Keypair> {
    let bytes = bs58::decode(private_key_bs58.trim())
        .into_vec()
        .map_err(|e| anyhow!("Invalid private key format: {}", e))?;
    Keypair::from_bytes(&bytes).map_err(|e| anyhow!("Invalid private key data: {}", e))
}

/// A keypair-backed wallet with a cached view of its balances.
pub struct WalletManager {
    keypair: Arc<Keypair>,
    solana_client: Arc<SolanaClient>,
    balances: RwLock<Vec<TokenBalance>>,
}

impl WalletManager {
    pub fn new(private_key_bs58: &str, solana_client: Arc<SolanaClient>) -> Result<Arc<Self>> {
        let keypair = parse_keypair(private_key_bs58).map_err(|e| {
            error!("Failed to load wallet keypair: {}", e);
            e
        })?;
        info!("WalletManager initialized. Pubkey: {}", keypair.pubkey());
        Ok(Arc::new(Self {
            keypair: Arc::new(keypair),
            solana_client,
            balances: RwLock::new(Vec::new()),
        }))
    }

    pub fn get_public_key(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn solana_client(&self) -> Arc<SolanaClient> {
        self.solana_client.clone()
    }

    /// Signs a transaction built by a third party (e.g. a swap aggregator) and sends it.
    pub async fn sign_and_send_versioned_transaction(&self, transaction: VersionedTransaction) -> Result<Signature> {
        let signed = VersionedTransaction::try_new(transaction.message, &[self.keypair.as_ref()])
            .context("Failed to sign versioned transaction")?;
        debug!("Signed versioned transaction with blockhash: {}", signed.message.recent_blockhash());

        let signature = self
            .solana_client
            .send_versioned_transaction(signed)
            .await
            .context("Failed to send signed versioned transaction")?;
        info!("Transaction sent. Signature: {}, Pubkey: {}", signature, self.get_public_key());
        Ok(signature)
    }
}

#[async_trait]
impl WalletSession for WalletManager {
    fn is_connected(&self) -> bool {
        true
    }

    fn address(&self) -> Option<String> {
        Some(self.get_public_key().to_string())
    }

    async fn token_balances(&self) -> Vec<TokenBalance> {
        self.balances.read().await.clone()
    }

    async fn refresh(&self) -> Result<()> {
        let owner = self.get_public_key();
        let sol = self
            .solana_client
            .get_sol_balance(&owner)
            .await
            .context("Failed to get SOL balance")?;
        let mut balances = vec![TokenBalance {
            mint: SOL_MINT.to_string(),
            symbol: Some("SOL".to_string()),
            amount_ui: sol,
            decimals: 9,
        }];
        balances.extend(
            self.solana_client
                .get_token_balances(&owner)
                .await
                .context("Failed to get token balances")?,
        );
        debug!("Wallet {} refreshed: {} balances", owner, balances.len());
        *self.balances.write().await = balances;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keypair_round_trips_base58() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();
        let parsed = parse_keypair(&format!("  {}\n", encoded)).unwrap();
        assert_eq!(parsed.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_parse_keypair_rejects_garbage() {
        assert!(parse_keypair("not-base58-0OIl").is_err());
        assert!(parse_keypair(&bs58::encode([1u8; 10]).into_string()).is_err());
    }
}
