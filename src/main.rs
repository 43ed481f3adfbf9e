use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod demo;
mod error;
mod models;
mod notify;
mod solana;
mod storage;
mod trading;
mod web;

use crate::api::birdeye::BirdeyeClient;
use crate::api::jupiter::{JupiterClient, JupiterVenue};
use crate::api::{DisconnectedVenue, ExecutionVenue, PriceOracle};
use crate::config::Config;
use crate::notify::{BroadcastNotifier, TracingErrorReporter};
use crate::solana::client::SolanaClient;
use crate::solana::wallet::WalletManager;
use crate::solana::{NoWallet, WalletSession};
use crate::storage::SledTransactionRecorder;
use crate::trading::{BotController, Collaborators};
use crate::web::AppState;

async fn live_collaborators(
    config: &Config,
) -> Result<(Arc<dyn WalletSession>, Arc<dyn ExecutionVenue>, Arc<dyn PriceOracle>)> {
    let birdeye_key = config
        .birdeye_api_key
        .as_deref()
        .context("BIRDEYE_API_KEY missing")?;
    let oracle: Arc<dyn PriceOracle> = Arc::new(BirdeyeClient::new(birdeye_key)?);
    info!("Birdeye client initialized");

    let Some(private_key) = config.wallet_private_key.as_deref() else {
        warn!("WALLET_PRIVATE_KEY not set; the bot cannot be started until a wallet is configured");
        let wallet: Arc<dyn WalletSession> = Arc::new(NoWallet);
        let venue: Arc<dyn ExecutionVenue> = Arc::new(DisconnectedVenue);
        return Ok((wallet, venue, oracle));
    };

    let solana_client = Arc::new(SolanaClient::new(&config.solana_rpc_url).await?);
    let wallet = WalletManager::new(private_key, solana_client)?;
    info!("Wallet initialized with address: {}", wallet.get_public_key());
    if let Err(e) = wallet.refresh().await {
        warn!("Initial wallet refresh failed: {:#}", e);
    }

    let venue = JupiterVenue::new(
        JupiterClient::new(config.jupiter_api_key.clone())?,
        wallet.clone(),
        config.default_slippage_bps,
        config.default_priority_fee_micro_lamports,
    );
    let venue: Arc<dyn ExecutionVenue> = Arc::new(venue);
    let wallet: Arc<dyn WalletSession> = wallet;
    Ok((wallet, venue, oracle))
}

fn demo_collaborators() -> (Arc<dyn WalletSession>, Arc<dyn ExecutionVenue>, Arc<dyn PriceOracle>) {
    (
        Arc::new(demo::DemoWallet::new(10.0)),
        Arc::new(demo::DemoVenue::new(0.95, Duration::from_millis(500))),
        Arc::new(demo::DemoPriceOracle::new(3.0)),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    info!("Configuration loaded successfully (demo mode: {})", config.demo_mode);

    let (wallet, venue, oracle) = if config.demo_mode {
        info!("[DEMO MODE] Using simulated price feed, venue and wallet");
        demo_collaborators()
    } else {
        live_collaborators(&config).await?
    };

    let transactions = Arc::new(SledTransactionRecorder::open(&config.data_dir.join("transactions"))?);
    let notifier = Arc::new(BroadcastNotifier::new(100));

    let controller = BotController::new(
        config.initial_bot_config(),
        config.engine_settings(),
        Collaborators {
            wallet: wallet.clone(),
            venue,
            oracle,
            recorder: transactions.clone(),
            notifier: notifier.clone(),
            reporter: Arc::new(TracingErrorReporter),
        },
    );
    info!("Bot controller initialized");

    let state = AppState::new(controller.clone(), wallet, transactions, notifier, config.demo_mode);
    let served = web::server::start_server(state, config.api_host.as_deref(), config.api_port).await;

    // Leave no pending orders behind on shutdown
    if let Err(e) = controller.stop().await {
        warn!("Failed to stop bot on shutdown: {}", e);
    }
    served
}
