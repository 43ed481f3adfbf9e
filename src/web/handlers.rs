//! Request handlers for all API endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::{error, info};

use super::models::*;
use super::AppState;
use crate::error::BotError;
use crate::models::PriceSnapshot;
use crate::trading::{BotConfig, BotConfigPatch};

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn engine_error(action: &str, e: BotError) -> ApiError {
    let status = match e {
        BotError::Config(_) => StatusCode::CONFLICT,
        BotError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Failed to {}: {}", action, e);
    }
    (
        status,
        Json(ErrorResponse {
            error: format!("Failed to {}", action),
            details: Some(e.to_string()),
        }),
    )
}

fn success(message: &str) -> Json<SuccessResponse> {
    Json(SuccessResponse {
        success: true,
        message: message.to_string(),
    })
}

// ============================================================================
// Health & Wallet
// ============================================================================

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

pub async fn get_wallet(State(state): State<AppState>) -> Json<WalletResponse> {
    Json(WalletResponse {
        connected: state.wallet.is_connected(),
        address: state.wallet.address(),
        balances: state.wallet.token_balances().await,
    })
}

// ============================================================================
// Bot control
// ============================================================================

pub async fn get_bot_status(State(state): State<AppState>) -> Json<BotStatusResponse> {
    let status = state.controller.status_report().await;
    Json(BotStatusResponse {
        state: status.state,
        session_id: status.session.as_ref().map(|s| s.id),
        started_at: status.session.as_ref().map(|s| s.started_at),
        selected_token: status.selected_token,
        active_orders: status.active_orders,
        total_orders: status.total_orders,
        last_error: status.last_error,
        demo_mode: state.demo_mode,
    })
}

pub async fn start_bot(State(state): State<AppState>) -> ApiResult<SuccessResponse> {
    state
        .controller
        .start()
        .await
        .map_err(|e| engine_error("start bot", e))?;
    info!("Bot started via API");
    Ok(success("Bot started"))
}

pub async fn stop_bot(State(state): State<AppState>) -> ApiResult<SuccessResponse> {
    state
        .controller
        .stop()
        .await
        .map_err(|e| engine_error("stop bot", e))?;
    info!("Bot stopped via API");
    Ok(success("Bot stopped"))
}

pub async fn pause_bot(State(state): State<AppState>) -> ApiResult<SuccessResponse> {
    state
        .controller
        .pause()
        .await
        .map_err(|e| engine_error("pause bot", e))?;
    Ok(success("Bot paused"))
}

pub async fn resume_bot(State(state): State<AppState>) -> ApiResult<SuccessResponse> {
    state
        .controller
        .resume()
        .await
        .map_err(|e| engine_error("resume bot", e))?;
    Ok(success("Bot resumed"))
}

// ============================================================================
// Configuration
// ============================================================================

pub async fn get_bot_config(State(state): State<AppState>) -> Json<BotConfig> {
    Json(state.controller.get_config().await)
}

pub async fn update_bot_config(
    State(state): State<AppState>,
    Json(patch): Json<BotConfigPatch>,
) -> ApiResult<BotConfig> {
    let updated = state
        .controller
        .update_config(patch)
        .await
        .map_err(|e| engine_error("update config", e))?;
    Ok(Json(updated))
}

pub async fn select_token(
    State(state): State<AppState>,
    Json(request): Json<SelectTokenRequest>,
) -> ApiResult<BotConfig> {
    let token = request.token_address.filter(|t| !t.trim().is_empty());
    let updated = state
        .controller
        .select_token(token)
        .await
        .map_err(|e| engine_error("select token", e))?;
    Ok(Json(updated))
}

// ============================================================================
// Orders, price & transactions
// ============================================================================

pub async fn get_orders(State(state): State<AppState>) -> Json<OrdersListResponse> {
    let orders = state.controller.orders().await;
    let total = orders.len();
    Json(OrdersListResponse { orders, total })
}

pub async fn get_active_orders(State(state): State<AppState>) -> Json<OrdersListResponse> {
    let orders = state.controller.active_orders().await;
    let total = orders.len();
    Json(OrdersListResponse { orders, total })
}

pub async fn get_price(State(state): State<AppState>) -> Json<Option<PriceSnapshot>> {
    Json(state.controller.refresh_price().await)
}

pub async fn get_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<TransactionsListResponse> {
    let listed = match query.session_id {
        Some(session_id) => state.transactions.list_session(session_id),
        None => state.transactions.list(),
    };
    let transactions = listed.map_err(|e| {
        error!("Failed to list transactions: {:#}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to list transactions".to_string(),
                details: Some(e.to_string()),
            }),
        )
    })?;
    let total = transactions.len();
    Ok(Json(TransactionsListResponse { transactions, total }))
}
