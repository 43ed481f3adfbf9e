use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::jupiter::SOL_MINT;
use super::{OraclePrice, PriceOracle};

const BIRDEYE_BASE_URL: &str = "https://public-api.birdeye.so";

#[derive(Debug, Clone)]
pub struct BirdeyeClient {
    api_key: String,
    base_url: String,
    client: Client,
}

// --- Response Structs ---

// /defi/token_overview
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenOverviewResponse {
    pub data: Option<TokenOverviewData>,
    pub success: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenOverviewData {
    pub address: String,
    pub decimals: Option<u8>,
    pub symbol: Option<String>,
    pub name: Option<String>,

    pub price: Option<f64>, // USD
    #[serde(rename = "priceChange24hPercent")]
    pub price_change_24h_percent: Option<f64>,
    pub liquidity: Option<f64>,
    pub v24h_usd: Option<f64>,
}

// /defi/price (used for the SOL/USD rate)
#[derive(Debug, Deserialize)]
struct PriceResponse {
    data: Option<PriceData>,
    success: bool,
}

#[derive(Debug, Deserialize)]
struct PriceData {
    value: f64, // USD
}

impl BirdeyeClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, BIRDEYE_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to create HTTP client for Birdeye")?;
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fetches the token overview (price, 24h change, symbol).
    pub async fn get_token_overview(&self, token_address: &str) -> Result<TokenOverviewData> {
        let url = format!("{}/defi/token_overview", self.base_url);
        debug!("Fetching token overview from Birdeye for {}", token_address);

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .header("x-chain", "solana")
            .query(&[("address", token_address)])
            .send()
            .await
            .context("Failed to send request to Birdeye Token Overview API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Birdeye Token Overview API error for token {}: {} - {}", token_address, status, error_text);
            return Err(anyhow!("Birdeye returned {} for {}", status, token_address));
        }

        let body: TokenOverviewResponse = response
            .json()
            .await
            .context("Failed to parse Birdeye Token Overview API response")?;

        match body.data {
            Some(data) if body.success => Ok(data),
            _ => Err(anyhow!("Birdeye reported no data for token {}", token_address)),
        }
    }

    /// SOL price in USD from the /defi/price endpoint.
    pub async fn get_sol_price_usd(&self) -> Result<f64> {
        let url = format!("{}/defi/price", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .header("x-chain", "solana")
            .query(&[("address", SOL_MINT)])
            .send()
            .await
            .context("Failed to send SOL price request to Birdeye API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Birdeye SOL Price API error: {} - {}", status, error_text);
            return Err(anyhow!("Birdeye returned {} for the SOL price", status));
        }

        let body: PriceResponse = response
            .json()
            .await
            .context("Failed to parse Birdeye SOL Price API response")?;

        match body.data {
            Some(data) if body.success && data.value > 0.0 => Ok(data.value),
            _ => Err(anyhow!("Birdeye reported no usable SOL price")),
        }
    }
}

#[async_trait]
impl PriceOracle for BirdeyeClient {
    async fn get_price(&self, token_address: &str) -> Result<OraclePrice> {
        if token_address == SOL_MINT {
            let overview = self.get_token_overview(token_address).await?;
            return Ok(OraclePrice {
                price: 1.0,
                change_24h: overview.price_change_24h_percent.unwrap_or(0.0),
                symbol: overview.symbol,
            });
        }

        // Overview prices are in USD; trades are sized in SOL
        let (overview, sol_usd) = tokio::try_join!(self.get_token_overview(token_address), self.get_sol_price_usd())?;
        let price_usd = overview
            .price
            .ok_or_else(|| anyhow!("Birdeye overview for {} has no price", token_address))?;
        Ok(OraclePrice {
            price: price_usd / sol_usd,
            change_24h: overview.price_change_24h_percent.unwrap_or(0.0),
            symbol: overview.symbol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Mock, ServerGuard};

    const TOKEN: &str = "TokenMint111111111111111111111111111111111";

    async fn sol_price(server: &mut ServerGuard, usd: f64) -> Mock {
        server
            .mock("GET", "/defi/price")
            .match_query(Matcher::UrlEncoded("address".into(), SOL_MINT.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"success":true,"data":{{"value":{}}}}}"#, usd))
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_get_price_is_quoted_in_sol() {
        let mut server = mockito::Server::new_async().await;
        let overview = server
            .mock("GET", "/defi/token_overview")
            .match_header("X-API-KEY", "test-key")
            .match_query(Matcher::UrlEncoded("address".into(), TOKEN.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"data":{"address":"TokenMint111111111111111111111111111111111",
                "symbol":"TKN","decimals":6,"price":0.5,"priceChange24hPercent":-3.25}}"#,
            )
            .create_async()
            .await;
        let sol = sol_price(&mut server, 125.0).await;

        let client = BirdeyeClient::with_base_url("test-key", &server.url()).unwrap();
        let price = client.get_price(TOKEN).await.unwrap();

        overview.assert_async().await;
        sol.assert_async().await;
        assert!((price.price - 0.004).abs() < 1e-12);
        assert_eq!(price.change_24h, -3.25);
        assert_eq!(price.symbol.as_deref(), Some("TKN"));
    }

    #[tokio::test]
    async fn test_quote_mint_is_priced_at_one() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defi/token_overview")
            .match_query(Matcher::UrlEncoded("address".into(), SOL_MINT.into()))
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"address":"x","symbol":"SOL","price":142.5,"priceChange24hPercent":1.5}}"#)
            .create_async()
            .await;

        let client = BirdeyeClient::with_base_url("test-key", &server.url()).unwrap();
        let price = client.get_price(SOL_MINT).await.unwrap();
        assert_eq!(price.price, 1.0);
        assert_eq!(price.change_24h, 1.5);
    }

    #[tokio::test]
    async fn test_missing_sol_rate_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defi/token_overview")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"address":"X","symbol":"X","price":0.5}}"#)
            .create_async()
            .await;
        sol_price(&mut server, 0.0).await;

        let client = BirdeyeClient::with_base_url("test-key", &server.url()).unwrap();
        assert!(client.get_price(TOKEN).await.is_err());
    }

    #[tokio::test]
    async fn test_http_error_is_a_fetch_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defi/token_overview")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;
        sol_price(&mut server, 125.0).await;

        let client = BirdeyeClient::with_base_url("test-key", &server.url()).unwrap();
        assert!(client.get_price(TOKEN).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_price_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defi/token_overview")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"address":"X","symbol":"X"}}"#)
            .create_async()
            .await;
        sol_price(&mut server, 125.0).await;

        let client = BirdeyeClient::with_base_url("test-key", &server.url()).unwrap();
        let err = client.get_price("X").await.unwrap_err();
        assert!(err.to_string().contains("no price"));
    }
}
