use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenBalance {
    pub mint: String,                        // Token mint address
    pub symbol: Option<String>,              // Token symbol, when known
    pub amount_ui: f64,                      // Balance in UI units
    pub decimals: u8,                        // Token decimals (usually 9 for Solana)
}

/// Latest price observation for the selected token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSnapshot {
    pub token_address: String,               // Token mint address
    pub symbol: Option<String>,              // Symbol reported by the oracle
    pub price: f64,                          // Price in quote units (SOL or USD, per oracle)
    pub change_24h: f64,                     // 24h change in percent
    pub fetched_at: DateTime<Utc>,           // When the oracle answered
}

impl PriceSnapshot {
    /// Symbol for display, falling back to a shortened mint address.
    pub fn display_symbol(&self) -> String {
        match &self.symbol {
            Some(symbol) if !symbol.is_empty() => symbol.clone(),
            _ => self.token_address.chars().take(6).collect(),
        }
    }
}
