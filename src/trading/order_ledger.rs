use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{BotError, BotResult};
use crate::models::{Order, OrderSide, OrderStatus, TradeIntent};

/// Append-only history of the orders the bot has placed.
#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    orders: Vec<Order>, // Creation order
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new pending order for `intent`.
    pub fn place(&mut self, intent: &TradeIntent, session_id: Uuid) -> Order {
        let order = Order::from_intent(intent, session_id);
        info!(
            "Placing {} order {} ({}) | Token: {} | Amount: {:.6} | Price: {:.8}",
            order.side, order.id, order.origin, order.token, order.amount, order.price
        );
        self.orders.push(order.clone());
        order
    }

    /// Moves a pending order to completed or failed.
    /// Terminal orders are returned unchanged.
    pub fn settle(&mut self, order_id: &str, success: bool) -> BotResult<Order> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| BotError::OrderNotFound(order_id.to_string()))?;

        if order.status.is_terminal() {
            warn!(
                "Attempted to settle order {} which is already {}",
                order_id, order.status
            );
            return Ok(order.clone());
        }

        order.status = if success {
            OrderStatus::Completed
        } else {
            OrderStatus::Failed
        };
        order.settled_at = Some(Utc::now());
        info!("Order {} settled as {}", order.id, order.status);
        Ok(order.clone())
    }

    /// Cancels every pending order and returns the ones that changed.
    pub fn cancel_all_pending(&mut self) -> Vec<Order> {
        let now = Utc::now();
        let cancelled: Vec<Order> = self
            .orders
            .iter_mut()
            .filter(|o| o.status == OrderStatus::Pending)
            .map(|o| {
                o.status = OrderStatus::Cancelled;
                o.settled_at = Some(now);
                o.clone()
            })
            .collect();
        if !cancelled.is_empty() {
            info!("Cancelled {} pending orders", cancelled.len());
        }
        cancelled
    }

    /// Mean requested price over completed buys of `token`.
    pub fn average_buy_price(&self, token: &str) -> Option<f64> {
        let (sum, count) = self
            .orders
            .iter()
            .filter(|o| o.token == token && o.side == OrderSide::Buy && o.status == OrderStatus::Completed)
            .fold((0.0, 0usize), |(sum, count), o| (sum + o.price, count + 1));

        if count == 0 {
            return None;
        }
        let avg = sum / count as f64;
        debug!("Average buy price for {} over {} orders: {:.8}", token, count, avg);
        Some(avg)
    }

    // --- Getters ---

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == order_id)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn pending(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn has_pending_sell(&self, token: &str) -> bool {
        self.orders
            .iter()
            .any(|o| o.token == token && o.side == OrderSide::Sell && o.status == OrderStatus::Pending)
    }

    /// Orders placed during `session_id`, excluding the ones that never reached the venue.
    pub fn placed_in_session(&self, session_id: Uuid) -> impl Iterator<Item = &Order> {
        self.orders
            .iter()
            .filter(move |o| o.session_id == session_id && o.status != OrderStatus::Cancelled)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
