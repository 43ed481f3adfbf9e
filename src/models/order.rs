use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl OrderStatus {
    /// Completed, failed and cancelled orders never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What produced a trade intent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderOrigin {
    Seed,
    Strategy,
    StopLoss,
    TakeProfit,
}

impl OrderOrigin {
    /// Protective sells are exempt from the per-session trade cap.
    pub fn is_protective(&self) -> bool {
        matches!(self, Self::StopLoss | Self::TakeProfit)
    }
}

impl std::fmt::Display for OrderOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seed => write!(f, "Seed"),
            Self::Strategy => write!(f, "Strategy"),
            Self::StopLoss => write!(f, "Stop Loss"),
            Self::TakeProfit => write!(f, "Take Profit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub side: OrderSide,
    pub token: String,
    pub amount: f64, // Quote units
    pub price: f64,  // Reference price at evaluation time
    pub origin: OrderOrigin,
}

impl TradeIntent {
    pub fn buy(token: &str, amount: f64, price: f64, origin: OrderOrigin) -> Self {
        Self {
            side: OrderSide::Buy,
            token: token.to_string(),
            amount,
            price,
            origin,
        }
    }

    pub fn sell(token: &str, amount: f64, price: f64, origin: OrderOrigin) -> Self {
        Self {
            side: OrderSide::Sell,
            token: token.to_string(),
            amount,
            price,
            origin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,                          // Unique order ID (UUID)
    pub session_id: Uuid,                    // Session that placed the order
    pub side: OrderSide,
    pub token: String,                       // Token mint address
    pub amount: f64,                         // Requested amount in quote units
    pub price: f64,                          // Requested price
    pub status: OrderStatus,
    pub origin: OrderOrigin,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,   // Set on the first terminal transition
}

impl Order {
    pub fn from_intent(intent: &TradeIntent, session_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id,
            side: intent.side,
            token: intent.token.clone(),
            amount: intent.amount,
            price: intent.price,
            status: OrderStatus::Pending,
            origin: intent.origin,
            created_at: Utc::now(),
            settled_at: None,
        }
    }
}
