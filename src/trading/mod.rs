pub mod config_store;
pub mod controller;
pub mod order_ledger;
pub mod price_feed;
pub mod risk;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use config_store::{BotConfig, BotConfigPatch};
pub use controller::{BotController, Collaborators};
