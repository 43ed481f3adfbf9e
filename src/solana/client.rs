use anyhow::{anyhow, Context, Result};
use solana_account_decoder::UiAccountData;
use solana_client::{
    rpc_client::RpcClient,
    rpc_config::RpcSendTransactionConfig,
    rpc_request::TokenAccountsFilter,
};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;
use spl_token::state::Mint;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use crate::models::TokenBalance;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

#[derive(Clone)]
pub struct SolanaClient {
    rpc_client: Arc<RpcClient>,
}

impl SolanaClient {
    pub async fn new(rpc_url: &str) -> Result<Self> {
        let rpc_client = RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed());
        let client = Self {
            rpc_client: Arc::new(rpc_client),
        };
        match client.run_blocking(|rpc| rpc.get_latest_blockhash()).await {
            Ok(_) => info!("Successfully connected to Solana RPC: {}", rpc_url),
            Err(e) => {
                error!("Failed to connect to Solana RPC {}: {}", rpc_url, e);
                return Err(e.context(format!("Failed to connect to RPC {}", rpc_url)));
            }
        }
        Ok(client)
    }

    // The RPC client is blocking; keep it off the async workers.
    async fn run_blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Arc<RpcClient>) -> solana_client::client_error::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let client = self.rpc_client.clone();
        tokio::task::spawn_blocking(move || f(client))
            .await
            .context("Solana RPC task panicked")?
            .map_err(|e| {
                error!("Solana RPC client error: {:?}", e);
                anyhow!("RPC Client Error: {}", e)
            })
    }

    pub async fn get_sol_balance(&self, pubkey: &Pubkey) -> Result<f64> {
        let pubkey = *pubkey;
        let lamports = self.run_blocking(move |rpc| rpc.get_balance(&pubkey)).await?;
        Ok(lamports as f64 / LAMPORTS_PER_SOL)
    }

    pub async fn get_mint_info(&self, mint: &Pubkey) -> Result<Mint> {
        let mint = *mint;
        let account = self
            .run_blocking(move |rpc| rpc.get_account(&mint))
            .await
            .context(format!("Failed to get mint account {}", mint))?;
        Mint::unpack(&account.data).map_err(|e| anyhow!("Failed to unpack mint account {}: {}", mint, e))
    }

    /// Balances of every SPL token account owned by `owner`, skipping empty ones.
    pub async fn get_token_balances(&self, owner: &Pubkey) -> Result<Vec<TokenBalance>> {
        let owner = *owner;
        let accounts = self
            .run_blocking(move |rpc| rpc.get_token_accounts_by_owner(&owner, TokenAccountsFilter::ProgramId(spl_token::id())))
            .await
            .context("Failed to list token accounts")?;

        let mut balances = Vec::new();
        for keyed in accounts {
            let UiAccountData::Json(parsed) = &keyed.account.data else {
                debug!("Token account {} returned without parsed data; skipping", keyed.pubkey);
                continue;
            };
            let info = &parsed.parsed["info"];
            let (Some(mint), Some(amount_ui), Some(decimals)) = (
                info["mint"].as_str(),
                info["tokenAmount"]["uiAmount"].as_f64(),
                info["tokenAmount"]["decimals"].as_u64(),
            ) else {
                warn!("Unrecognized token account layout for {}", keyed.pubkey);
                continue;
            };
            if amount_ui > 0.0 {
                balances.push(TokenBalance {
                    mint: mint.to_string(),
                    symbol: None,
                    amount_ui,
                    decimals: decimals as u8,
                });
            }
        }
        Ok(balances)
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.run_blocking(|rpc| rpc.get_latest_blockhash()).await
    }

    /// Sends without waiting for confirmation.
    pub async fn send_versioned_transaction(&self, transaction: VersionedTransaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            encoding: Some(UiTransactionEncoding::Base64),
            max_retries: Some(5),
            min_context_slot: None,
        };
        let signature = self
            .run_blocking(move |rpc| rpc.send_transaction_with_config(&transaction, config))
            .await
            .context("Send failed")?;
        debug!("Transaction sent with signature: {}", signature);
        Ok(signature)
    }

    /// Polls the signature status until it lands, fails, or `timeout_secs` elapse.
    pub async fn confirm_transaction(&self, signature: &Signature, timeout_secs: u64) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);
        let signature = *signature;
        loop {
            let statuses = self
                .run_blocking(move |rpc| rpc.get_signature_statuses(&[signature]))
                .await
                .context("Status check failed")?;

            match statuses.value.first().cloned().flatten().map(|s| s.err) {
                Some(None) => {
                    info!("Transaction {} confirmed.", signature);
                    return Ok(());
                }
                Some(Some(e)) => {
                    error!("Transaction {} failed: {:?}", signature, e);
                    return Err(anyhow!("Transaction failed: {:?}", e));
                }
                None => debug!("Transaction {} status not yet available...", signature),
            }

            if tokio::time::Instant::now() >= deadline {
                warn!("Timeout waiting for transaction {} confirmation", signature);
                return Err(anyhow!("Confirmation timeout"));
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }
}
