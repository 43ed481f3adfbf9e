//! Persistence of executed bot transactions.

pub mod transactions;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Order, OrderSide, OrderStatus};

pub use transactions::SledTransactionRecorder;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    pub session_id: Uuid,
    pub order_id: String,
    pub side: OrderSide,
    pub amount: f64,
    pub token_symbol: String,
    pub price: f64,
    pub status: OrderStatus,
    pub recorded_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn from_order(order: &Order, token_symbol: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: order.session_id,
            order_id: order.id.clone(),
            side: order.side,
            amount: order.amount,
            token_symbol: token_symbol.to_string(),
            price: order.price,
            status: order.status,
            recorded_at: Utc::now(),
        }
    }
}

/// Best-effort external ledger of trades.
#[async_trait]
pub trait TransactionRecorder: Send + Sync {
    async fn record(&self, record: TransactionRecord) -> Result<()>;
}
