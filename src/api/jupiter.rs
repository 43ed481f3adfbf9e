use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use super::ExecutionVenue;
use crate::solana::wallet::WalletManager;

const JUPITER_BASE_URL: &str = "https://quote-api.jup.ag/v6";
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
const CONFIRM_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct JupiterClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub input_mint: String,
    pub in_amount: String,
    pub output_mint: String,
    pub out_amount: String,
    pub other_amount_threshold: String,
    pub swap_mode: String,
    pub slippage_bps: u32,
    #[serde(default)]
    pub price_impact_pct: Option<String>,
    pub route_plan: Vec<serde_json::Value>, // Passed back verbatim to /swap
    #[serde(default)]
    pub context_slot: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub quote_response: QuoteResponse,
    pub user_public_key: String,
    pub wrap_and_unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_unit_price_micro_lamports: Option<u64>,
    pub dynamic_compute_unit_limit: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    pub swap_transaction: String,
    pub last_valid_block_height: u64,
}

impl JupiterClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_base_url(api_key, JUPITER_BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client for Jupiter")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u32,
    ) -> Result<QuoteResponse> {
        let url = format!("{}/quote", self.base_url);
        let params = [
            ("inputMint", input_mint.to_string()),
            ("outputMint", output_mint.to_string()),
            ("amount", amount.to_string()),
            ("slippageBps", slippage_bps.to_string()),
        ];
        debug!("Getting quote from Jupiter: {:?}", params);

        let mut request = self.client.get(&url).query(&params);
        if let Some(key) = &self.api_key {
            request = request.header("Jupiter-API-Key", key);
        }
        let response = request
            .send()
            .await
            .context("Failed to send quote request to Jupiter API")?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Jupiter Quote API error: Status {}, Body: {}", status, error_text);
            bail!("Jupiter Quote API failed with status {}: {}", status, error_text);
        }

        let quote: QuoteResponse = response
            .json()
            .await
            .context("Failed to parse Jupiter Quote API response")?;
        if quote.in_amount.parse::<u64>().unwrap_or(0) == 0 || quote.out_amount.parse::<u64>().unwrap_or(0) == 0 {
            warn!("Received quote with zero in/out amount: {:?}", quote);
            bail!("Received invalid quote from Jupiter (zero amount)");
        }
        Ok(quote)
    }

    pub async fn get_swap_transaction(
        &self,
        quote: &QuoteResponse,
        user_public_key: &str,
        priority_fee_micro_lamports: Option<u64>,
    ) -> Result<SwapResponse> {
        let url = format!("{}/swap", self.base_url);
        let body = SwapRequest {
            quote_response: quote.clone(),
            user_public_key: user_public_key.to_string(),
            wrap_and_unwrap_sol: true,
            compute_unit_price_micro_lamports: priority_fee_micro_lamports,
            dynamic_compute_unit_limit: true,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Jupiter-API-Key", key);
        }
        let response = request
            .send()
            .await
            .context("Failed to send swap request to Jupiter API")?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Jupiter Swap API error: Status {}, Body: {}", status, error_text);
            bail!("Jupiter Swap API failed with status {}: {}", status, error_text);
        }
        response
            .json()
            .await
            .context("Failed to parse Jupiter Swap API response")
    }
}

/// Executes swaps through Jupiter, signing with the connected wallet.
pub struct JupiterVenue {
    client: JupiterClient,
    wallet: Arc<WalletManager>,
    slippage_bps: u32,
    priority_fee_micro_lamports: Option<u64>,
}

impl JupiterVenue {
    pub fn new(
        client: JupiterClient,
        wallet: Arc<WalletManager>,
        slippage_bps: u32,
        priority_fee_micro_lamports: u64,
    ) -> Self {
        Self {
            client,
            wallet,
            slippage_bps,
            priority_fee_micro_lamports: Some(priority_fee_micro_lamports).filter(|fee| *fee > 0),
        }
    }

    async fn decimals(&self, mint: &str) -> Result<u8> {
        if mint == SOL_MINT {
            return Ok(9);
        }
        let pubkey = Pubkey::from_str(mint).context(format!("Invalid mint address {}", mint))?;
        Ok(self.wallet.solana_client().get_mint_info(&pubkey).await?.decimals)
    }
}

#[async_trait]
impl ExecutionVenue for JupiterVenue {
    async fn swap(&self, from_mint: &str, to_mint: &str, amount: f64, wallet_address: &str) -> Result<bool> {
        let signer = self.wallet.get_public_key().to_string();
        if signer != wallet_address {
            bail!("Swap requested for {} but the loaded wallet is {}", wallet_address, signer);
        }

        let decimals = self.decimals(from_mint).await?;
        let amount_base = to_base_units(amount, decimals);
        if amount_base == 0 {
            return Err(anyhow!("Input amount {} is too small or zero", amount));
        }

        info!("Initiating swap: {:.9} {} -> {}", amount, from_mint, to_mint);
        let quote = self
            .client
            .get_quote(from_mint, to_mint, amount_base, self.slippage_bps)
            .await
            .context("Failed to get swap quote")?;
        info!(
            "Quote received: {} -> {} (Price Impact: {}%)",
            quote.in_amount,
            quote.out_amount,
            quote.price_impact_pct.as_deref().unwrap_or("0")
        );

        let swap = self
            .client
            .get_swap_transaction(&quote, &signer, self.priority_fee_micro_lamports)
            .await
            .context("Failed to get swap transaction")?;
        let bytes = STANDARD
            .decode(&swap.swap_transaction)
            .context("Failed to decode swap transaction")?;
        let transaction: VersionedTransaction =
            bincode::deserialize(&bytes).context("Failed to deserialize VersionedTransaction")?;

        let signature = self
            .wallet
            .sign_and_send_versioned_transaction(transaction)
            .await
            .context("Failed to sign and send swap transaction")?;

        match self
            .wallet
            .solana_client()
            .confirm_transaction(&signature, CONFIRM_TIMEOUT_SECS)
            .await
        {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Swap {} did not confirm: {:#}", signature, e);
                Ok(false)
            }
        }
    }
}

fn to_base_units(amount_ui: f64, decimals: u8) -> u64 {
    if !amount_ui.is_finite() || amount_ui <= 0.0 {
        return 0;
    }
    (amount_ui * 10f64.powi(decimals as i32)) as u64
}
