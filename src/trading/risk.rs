use tracing::{debug, info};

use crate::models::{OrderOrigin, PriceSnapshot, TradeIntent};
use crate::trading::config_store::BotConfig;
use crate::trading::order_ledger::OrderLedger;

/// Which protective limit was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTrigger {
    StopLoss,
    TakeProfit,
}

/// Price levels derived from the average entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLevels {
    pub average_entry: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
}

impl RiskLevels {
    pub fn from_average(average_entry: f64, config: &BotConfig) -> Self {
        Self {
            average_entry,
            stop_loss_price: average_entry * (1.0 - config.stop_loss / 100.0),
            take_profit_price: average_entry * (1.0 + config.take_profit / 100.0),
        }
    }

    /// Stop-loss is checked first so it wins when the levels overlap.
    pub fn trigger(&self, price: f64) -> Option<RiskTrigger> {
        if price < self.stop_loss_price {
            return Some(RiskTrigger::StopLoss);
        }
        if price > self.take_profit_price {
            return Some(RiskTrigger::TakeProfit);
        }
        None
    }
}

/// Stop-loss / take-profit guard over the ledger's average entry price.
pub struct RiskMonitor;

impl RiskMonitor {
    pub fn levels(config: &BotConfig, snapshot: &PriceSnapshot, ledger: &OrderLedger) -> Option<RiskLevels> {
        ledger
            .average_buy_price(&snapshot.token_address)
            .map(|avg| RiskLevels::from_average(avg, config))
    }

    /// Returns a protective sell when the snapshot price crosses a limit.
    pub fn check(config: &BotConfig, snapshot: &PriceSnapshot, ledger: &OrderLedger) -> Option<TradeIntent> {
        let levels = Self::levels(config, snapshot, ledger)?;

        let trigger = levels.trigger(snapshot.price)?;
        if ledger.has_pending_sell(&snapshot.token_address) {
            debug!(
                "{:?} crossed for {} but a sell is already pending",
                trigger, snapshot.token_address
            );
            return None;
        }

        let origin = match trigger {
            RiskTrigger::StopLoss => {
                info!(
                    "SL hit for {}: Current {:.8} < SL {:.8} (avg entry {:.8})",
                    snapshot.display_symbol(), snapshot.price, levels.stop_loss_price, levels.average_entry
                );
                OrderOrigin::StopLoss
            }
            RiskTrigger::TakeProfit => {
                info!(
                    "TP hit for {}: Current {:.8} > TP {:.8} (avg entry {:.8})",
                    snapshot.display_symbol(), snapshot.price, levels.take_profit_price, levels.average_entry
                );
                OrderOrigin::TakeProfit
            }
        };

        Some(TradeIntent::sell(
            &snapshot.token_address,
            config.trade_amount,
            snapshot.price,
            origin,
        ))
    }
}
