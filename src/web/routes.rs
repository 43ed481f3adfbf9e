//! API route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers;
use super::websocket::ws_handler;
use super::AppState;

/// Create all API routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/wallet", get(handlers::get_wallet))

        // Bot control
        .route("/api/bot/status", get(handlers::get_bot_status))
        .route("/api/bot/start", post(handlers::start_bot))
        .route("/api/bot/stop", post(handlers::stop_bot))
        .route("/api/bot/pause", post(handlers::pause_bot))
        .route("/api/bot/resume", post(handlers::resume_bot))

        // Configuration
        .route("/api/bot/config", get(handlers::get_bot_config).patch(handlers::update_bot_config))
        .route("/api/bot/token", put(handlers::select_token))

        // Orders & market data
        .route("/api/bot/orders", get(handlers::get_orders))
        .route("/api/bot/orders/active", get(handlers::get_active_orders))
        .route("/api/bot/price", get(handlers::get_price))
        .route("/api/transactions", get(handlers::get_transactions))

        // WebSocket
        .route("/ws", get(ws_handler))

        .with_state(state)
}
