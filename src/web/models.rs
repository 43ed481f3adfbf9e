//! Request and Response DTOs for the Web API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BotState, Order, TokenBalance};
use crate::storage::TransactionRecord;

// ============================================================================
// Health & Status
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BotStatusResponse {
    pub state: BotState,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub selected_token: Option<String>,
    pub active_orders: usize,
    pub total_orders: usize,
    pub last_error: Option<String>,
    pub demo_mode: bool,
}

// ============================================================================
// Wallet
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponse {
    pub connected: bool,
    pub address: Option<String>,
    pub balances: Vec<TokenBalance>,
}

// ============================================================================
// Orders & Transactions
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct OrdersListResponse {
    pub orders: Vec<Order>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionsListResponse {
    pub transactions: Vec<TransactionRecord>,
    pub total: usize,
}

// ============================================================================
// Token selection
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectTokenRequest {
    pub token_address: Option<String>,
}

// ============================================================================
// Generic
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}
