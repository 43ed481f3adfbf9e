use serde::{Deserialize, Deserializer, Serialize};

use crate::trading::strategy::{StrategyFlags, StrategyKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    pub selected_token: Option<String>,      // Token mint the bot trades
    pub trade_amount: f64,                   // Order size in quote units
    pub buy_threshold: f64,                  // Percent drop that triggers a buy (simple)
    pub sell_threshold: f64,                 // Percent rise that triggers a sell (simple)
    pub stop_loss: f64,                      // Percent below average entry
    pub take_profit: f64,                    // Percent above average entry
    pub max_trades: u32,                     // Strategy orders allowed per session
    pub strategy: StrategyKind,              // Active strategy
    pub strategies: StrategyFlags,           // Per-strategy enable switches
    pub seed_fraction: f64,                  // Share of trade_amount bought on start (0 disables)
    pub dca_interval_secs: u64,              // DCA schedule
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            selected_token: None,
            trade_amount: 0.01,
            buy_threshold: 5.0,
            sell_threshold: 10.0,
            stop_loss: 10.0,
            take_profit: 50.0,
            max_trades: 10,
            strategy: StrategyKind::Simple,
            strategies: StrategyFlags::default(),
            seed_fraction: 0.5,
            dca_interval_secs: 3600,
        }
    }
}

/// Partial update. Absent fields keep their value; `selected_token: null` clears the token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BotConfigPatch {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub selected_token: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_trades: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategies: Option<StrategyFlagsPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_fraction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dca_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyFlagsPatch {
    #[serde(default)]
    pub simple: Option<bool>,
    #[serde(default)]
    pub dca: Option<bool>,
    #[serde(default)]
    pub grid: Option<bool>,
    #[serde(default)]
    pub momentum: Option<bool>,
}

// A present field (even `null`) becomes Some(..); absence is handled by `default`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl BotConfigPatch {
    pub fn selecting_token(token: Option<String>) -> Self {
        Self {
            selected_token: Some(token),
            ..Self::default()
        }
    }

    pub fn touches_token(&self) -> bool {
        self.selected_token.is_some()
    }
}

/// In-memory owner of the bot configuration. Callers serialize access.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    current: BotConfig,
}

impl ConfigStore {
    pub fn new(initial: BotConfig) -> Self {
        Self { current: initial }
    }

    pub fn get(&self) -> BotConfig {
        self.current.clone()
    }

    /// Merges `patch` field by field and returns the new configuration.
    /// Values are not range-checked.
    pub fn update(&mut self, patch: BotConfigPatch) -> BotConfig {
        let cfg = &mut self.current;
        if let Some(token) = patch.selected_token {
            cfg.selected_token = token;
        }
        if let Some(v) = patch.trade_amount {
            cfg.trade_amount = v;
        }
        if let Some(v) = patch.buy_threshold {
            cfg.buy_threshold = v;
        }
        if let Some(v) = patch.sell_threshold {
            cfg.sell_threshold = v;
        }
        if let Some(v) = patch.stop_loss {
            cfg.stop_loss = v;
        }
        if let Some(v) = patch.take_profit {
            cfg.take_profit = v;
        }
        if let Some(v) = patch.max_trades {
            cfg.max_trades = v;
        }
        if let Some(v) = patch.strategy {
            cfg.strategy = v;
        }
        if let Some(flags) = patch.strategies {
            cfg.strategies.simple = flags.simple.unwrap_or(cfg.strategies.simple);
            cfg.strategies.dca = flags.dca.unwrap_or(cfg.strategies.dca);
            cfg.strategies.grid = flags.grid.unwrap_or(cfg.strategies.grid);
            cfg.strategies.momentum = flags.momentum.unwrap_or(cfg.strategies.momentum);
        }
        if let Some(v) = patch.seed_fraction {
            cfg.seed_fraction = v;
        }
        if let Some(v) = patch.dca_interval_secs {
            cfg.dca_interval_secs = v;
        }
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_merges_only_present_fields() {
        let mut store = ConfigStore::new(BotConfig::default());
        let updated = store.update(BotConfigPatch {
            trade_amount: Some(3.0),
            strategy: Some(StrategyKind::Dca),
            ..BotConfigPatch::default()
        });

        assert_eq!(updated.trade_amount, 3.0);
        assert_eq!(updated.strategy, StrategyKind::Dca);
        assert_eq!(updated.stop_loss, BotConfig::default().stop_loss);
        assert_eq!(store.get(), updated);
    }

    #[test]
    fn test_out_of_range_values_are_accepted() {
        let mut store = ConfigStore::default();
        let updated = store.update(BotConfigPatch {
            trade_amount: Some(-5.0),
            stop_loss: Some(250.0),
            ..BotConfigPatch::default()
        });
        assert_eq!(updated.trade_amount, -5.0);
        assert_eq!(updated.stop_loss, 250.0);
    }

    #[test]
    fn test_patch_distinguishes_null_token_from_absent() {
        let absent: BotConfigPatch = serde_json::from_str(r#"{"trade_amount": 1.0}"#).unwrap();
        assert_eq!(absent.selected_token, None);
        assert!(!absent.touches_token());

        let cleared: BotConfigPatch = serde_json::from_str(r#"{"selected_token": null}"#).unwrap();
        assert_eq!(cleared.selected_token, Some(None));

        let set: BotConfigPatch = serde_json::from_str(r#"{"selected_token": "MintA"}"#).unwrap();
        assert_eq!(set.selected_token, Some(Some("MintA".to_string())));

        let mut store = ConfigStore::default();
        store.update(set);
        assert_eq!(store.get().selected_token.as_deref(), Some("MintA"));
        store.update(cleared);
        assert_eq!(store.get().selected_token, None);
    }

    #[test]
    fn test_strategy_flags_merge_individually() {
        let mut store = ConfigStore::default();
        let patch: BotConfigPatch =
            serde_json::from_str(r#"{"strategies": {"grid": false}}"#).unwrap();
        let updated = store.update(patch);
        assert!(!updated.strategies.grid);
        assert!(updated.strategies.simple);
        assert!(updated.strategies.dca);
    }
}
