use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::models::{OrderOrigin, OrderSide, PriceSnapshot, TradeIntent};
use crate::trading::config_store::BotConfig;
use crate::trading::order_ledger::OrderLedger;

/// The closed set of strategies the bot can run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Simple,
    Dca,
    Grid,
    Momentum,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [Self::Simple, Self::Dca, Self::Grid, Self::Momentum];

    /// Evaluates this strategy's rule set. Pure: the same inputs always give the same intent.
    pub fn evaluate(
        &self,
        config: &BotConfig,
        snapshot: &PriceSnapshot,
        ledger: &OrderLedger,
    ) -> Option<TradeIntent> {
        match self {
            Self::Simple => simple_rule(config, snapshot),
            Self::Dca => dca_rule(config, snapshot, ledger),
            Self::Grid => grid_rule(config, snapshot),
            Self::Momentum => momentum_rule(config, snapshot),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Dca => write!(f, "dca"),
            Self::Grid => write!(f, "grid"),
            Self::Momentum => write!(f, "momentum"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "dca" => Ok(Self::Dca),
            "grid" => Ok(Self::Grid),
            "momentum" => Ok(Self::Momentum),
            other => Err(format!("Unknown strategy '{}'", other)),
        }
    }
}

/// Per-strategy enable switches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyFlags {
    pub simple: bool,
    pub dca: bool,
    pub grid: bool,
    pub momentum: bool,
}

impl Default for StrategyFlags {
    fn default() -> Self {
        Self {
            simple: true,
            dca: true,
            grid: true,
            momentum: true,
        }
    }
}

impl StrategyFlags {
    pub fn is_enabled(&self, kind: StrategyKind) -> bool {
        match kind {
            StrategyKind::Simple => self.simple,
            StrategyKind::Dca => self.dca,
            StrategyKind::Grid => self.grid,
            StrategyKind::Momentum => self.momentum,
        }
    }
}

/// Runs the active strategy of `config` against the latest snapshot.
pub fn evaluate(
    config: &BotConfig,
    snapshot: &PriceSnapshot,
    ledger: &OrderLedger,
) -> Option<TradeIntent> {
    if !config.strategies.is_enabled(config.strategy) {
        debug!("Strategy '{}' is disabled; no intent", config.strategy);
        return None;
    }
    config.strategy.evaluate(config, snapshot, ledger)
}

// Buy the dip, sell the rip. When both thresholds are crossed the buy wins.
fn simple_rule(config: &BotConfig, snapshot: &PriceSnapshot) -> Option<TradeIntent> {
    if snapshot.change_24h < -config.buy_threshold {
        debug!(
            "Simple: 24h change {:.2}% below -{:.2}%, buying",
            snapshot.change_24h, config.buy_threshold
        );
        return Some(TradeIntent::buy(
            &snapshot.token_address,
            config.trade_amount,
            snapshot.price,
            OrderOrigin::Strategy,
        ));
    }
    if snapshot.change_24h > config.sell_threshold {
        debug!(
            "Simple: 24h change {:.2}% above {:.2}%, selling",
            snapshot.change_24h, config.sell_threshold
        );
        return Some(TradeIntent::sell(
            &snapshot.token_address,
            config.trade_amount,
            snapshot.price,
            OrderOrigin::Strategy,
        ));
    }
    None
}

fn dca_rule(config: &BotConfig, snapshot: &PriceSnapshot, ledger: &OrderLedger) -> Option<TradeIntent> {
    let last_buy = ledger
        .orders()
        .iter()
        .rev()
        .find(|o| o.side == OrderSide::Buy && o.token == snapshot.token_address)
        .map(|o| o.created_at);

    let due = match last_buy {
        None => true,
        // An interval too large for chrono is never due
        Some(at) => i64::try_from(config.dca_interval_secs)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .is_some_and(|interval| snapshot.fetched_at.signed_duration_since(at) >= interval),
    };

    if !due {
        return None;
    }
    Some(TradeIntent::buy(
        &snapshot.token_address,
        config.trade_amount,
        snapshot.price,
        OrderOrigin::Strategy,
    ))
}

// Reserved: no grid rule set yet.
fn grid_rule(_config: &BotConfig, _snapshot: &PriceSnapshot) -> Option<TradeIntent> {
    None
}

// Reserved: no momentum rule set yet.
fn momentum_rule(_config: &BotConfig, _snapshot: &PriceSnapshot) -> Option<TradeIntent> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn config(strategy: StrategyKind) -> BotConfig {
        BotConfig {
            selected_token: Some("Mint1111".to_string()),
            trade_amount: 2.0,
            buy_threshold: 3.0,
            sell_threshold: 5.0,
            strategy,
            dca_interval_secs: 600,
            ..BotConfig::default()
        }
    }

    fn snapshot(change_24h: f64) -> PriceSnapshot {
        PriceSnapshot {
            token_address: "Mint1111".to_string(),
            symbol: Some("MINT".to_string()),
            price: 1.5,
            change_24h,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_simple_buys_below_threshold() {
        let ledger = OrderLedger::new();
        let intent = evaluate(&config(StrategyKind::Simple), &snapshot(-3.1), &ledger)
            .expect("expected a buy intent");
        assert_eq!(intent.side, OrderSide::Buy);
        assert_eq!(intent.amount, 2.0);
        assert_eq!(intent.price, 1.5);
        assert_eq!(intent.origin, OrderOrigin::Strategy);
    }

    #[test]
    fn test_simple_ignores_small_drop() {
        let ledger = OrderLedger::new();
        assert!(evaluate(&config(StrategyKind::Simple), &snapshot(-2.9), &ledger).is_none());
    }

    #[test]
    fn test_simple_sells_above_threshold() {
        let ledger = OrderLedger::new();
        let intent = evaluate(&config(StrategyKind::Simple), &snapshot(5.5), &ledger).unwrap();
        assert_eq!(intent.side, OrderSide::Sell);
        assert_eq!(intent.amount, 2.0);
    }

    #[test]
    fn test_simple_prefers_buy_when_both_thresholds_cross() {
        // Negative thresholds make both conditions true at once
        let mut cfg = config(StrategyKind::Simple);
        cfg.buy_threshold = -10.0;
        cfg.sell_threshold = -10.0;
        let ledger = OrderLedger::new();
        let intent = evaluate(&cfg, &snapshot(0.0), &ledger).unwrap();
        assert_eq!(intent.side, OrderSide::Buy);
    }

    #[test]
    fn test_disabled_strategy_emits_nothing() {
        let mut cfg = config(StrategyKind::Simple);
        cfg.strategies.simple = false;
        let ledger = OrderLedger::new();
        assert!(evaluate(&cfg, &snapshot(-50.0), &ledger).is_none());
    }

    #[test]
    fn test_dca_buys_when_no_previous_buy() {
        let ledger = OrderLedger::new();
        let intent = evaluate(&config(StrategyKind::Dca), &snapshot(20.0), &ledger).unwrap();
        assert_eq!(intent.side, OrderSide::Buy);
        assert_eq!(intent.amount, 2.0);
    }

    #[test]
    fn test_dca_waits_for_interval() {
        let cfg = config(StrategyKind::Dca);
        let mut ledger = OrderLedger::new();
        let snap = snapshot(0.0);
        let intent = TradeIntent::buy(&snap.token_address, 2.0, 1.5, OrderOrigin::Strategy);
        let order = ledger.place(&intent, Uuid::new_v4());
        ledger.settle(&order.id, true).unwrap();

        assert!(evaluate(&cfg, &snap, &ledger).is_none());

        let mut later = snap.clone();
        later.fetched_at = snap.fetched_at + ChronoDuration::seconds(601);
        assert!(evaluate(&cfg, &later, &ledger).is_some());
        assert_eq!(ledger.orders()[0].status, OrderStatus::Completed);
    }

    #[test]
    fn test_dca_huge_interval_is_never_due() {
        let mut ledger = OrderLedger::new();
        let snap = snapshot(0.0);
        let intent = TradeIntent::buy(&snap.token_address, 2.0, 1.5, OrderOrigin::Strategy);
        let order = ledger.place(&intent, Uuid::new_v4());
        ledger.settle(&order.id, true).unwrap();

        let mut later = snap.clone();
        later.fetched_at = snap.fetched_at + ChronoDuration::days(365);
        for secs in [10_000_000_000_000_000, i64::MAX as u64, u64::MAX] {
            let cfg = BotConfig {
                dca_interval_secs: secs,
                ..config(StrategyKind::Dca)
            };
            assert!(evaluate(&cfg, &later, &ledger).is_none(), "interval {} fired", secs);
        }
    }

    #[test]
    fn test_reserved_strategies_are_no_ops() {
        let ledger = OrderLedger::new();
        for kind in [StrategyKind::Grid, StrategyKind::Momentum] {
            assert!(evaluate(&config(kind), &snapshot(-99.0), &ledger).is_none());
            assert!(evaluate(&config(kind), &snapshot(99.0), &ledger).is_none());
        }
    }

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!("DCA".parse::<StrategyKind>().unwrap(), StrategyKind::Dca);
        assert_eq!(" momentum ".parse::<StrategyKind>().unwrap(), StrategyKind::Momentum);
        assert!("martingale".parse::<StrategyKind>().is_err());
        for kind in StrategyKind::ALL {
            assert_eq!(kind.to_string().parse::<StrategyKind>().unwrap(), kind);
        }
    }
}
