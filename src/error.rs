use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BotError {
    /// Operation refused for the current bot state or configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Price fetch error: {0}")]
    Fetch(String),

    #[error("Execution error: {0}")]
    Execution(String),

    /// Unexpected failure inside a tick. Always ends the running session.
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Wallet error: {0}")]
    Wallet(String),
}

impl BotError {
    /// Short label used in notifications and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "Config",
            Self::Fetch(_) => "Fetch",
            Self::Execution(_) => "Execution",
            Self::Lifecycle(_) => "Lifecycle",
            Self::OrderNotFound(_) => "Order",
            Self::Wallet(_) => "Wallet",
        }
    }
}

pub type BotResult<T> = std::result::Result<T, BotError>;
