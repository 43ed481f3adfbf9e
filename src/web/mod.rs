//! REST API and WebSocket surface over the bot controller.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;
pub mod websocket;

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::notify::{BotEvent, BroadcastNotifier};
use crate::solana::WalletSession;
use crate::storage::SledTransactionRecorder;
use crate::trading::BotController;

/// Shared application state for all API handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: BotController,
    pub wallet: Arc<dyn WalletSession>,
    pub transactions: Arc<SledTransactionRecorder>,
    /// Source of WebSocket events
    pub notifier: Arc<BroadcastNotifier>,
    pub demo_mode: bool,
}

impl AppState {
    pub fn new(
        controller: BotController,
        wallet: Arc<dyn WalletSession>,
        transactions: Arc<SledTransactionRecorder>,
        notifier: Arc<BroadcastNotifier>,
        demo_mode: bool,
    ) -> Self {
        Self {
            controller,
            wallet,
            transactions,
            notifier,
            demo_mode,
        }
    }

    pub fn subscribe_ws(&self) -> broadcast::Receiver<BotEvent> {
        self.notifier.subscribe()
    }
}
